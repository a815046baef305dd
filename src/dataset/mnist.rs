use crate::error::IoError;
use crate::math::binarize;
use byteorder::{BigEndian, ReadBytesExt};
use flate2::read::GzDecoder;
use ndarray::{Array1, Array2, Axis, concatenate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::io::Read;
use std::path::{Path, PathBuf};

const IMAGE_MAGIC: i32 = 2_051;
const LABEL_MAGIC: i32 = 2_049;

/// Width and height of an MNIST digit
pub const MNIST_SIDE: usize = 28;
/// Pixels per MNIST digit
pub const MNIST_PIXELS: usize = MNIST_SIDE * MNIST_SIDE;

/// Images and labels of one split.
///
/// # Fields
///
/// - `images` - `(n, 784)` grey levels in [0, 1]
/// - `labels` - `n` digit classes in 0..=9
#[derive(Debug, Clone, PartialEq)]
pub struct MnistSplit {
    pub images: Array2<f32>,
    pub labels: Array1<u8>,
}

impl MnistSplit {
    pub fn len(&self) -> usize {
        self.images.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.images.nrows() == 0
    }

    /// Rows of this split in a new order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            images: self.images.select(Axis(0), indices),
            labels: self.labels.select(Axis(0), indices),
        }
    }
}

/// The MNIST dataset split into training, validation and test sets.
///
/// The last sixth of the training file (10 000 digits for the standard files) is the
/// validation set; the test file is the test set.
#[derive(Debug, Clone, PartialEq)]
pub struct Mnist {
    pub train: MnistSplit,
    pub valid: MnistSplit,
    pub test: MnistSplit,
}

impl Mnist {
    /// Appends the validation set to the training set; the validation set is kept as is
    pub fn merge_valid_into_train(&mut self) -> Result<(), IoError> {
        let images = concatenate(Axis(0), &[self.train.images.view(), self.valid.images.view()])
            .map_err(|e| IoError::invalid_data(format!("Cannot merge MNIST splits: {}", e)))?;
        let labels = concatenate(Axis(0), &[self.train.labels.view(), self.valid.labels.view()])
            .map_err(|e| IoError::invalid_data(format!("Cannot merge MNIST splits: {}", e)))?;
        self.train = MnistSplit { images, labels };
        Ok(())
    }

    /// Shuffles the training set with a generator seeded by `seed`
    pub fn shuffle_train(&mut self, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut indices: Vec<usize> = (0..self.train.len()).collect();
        indices.shuffle(&mut rng);
        self.train = self.train.select(&indices);
    }
}

/// Opens `name` in `dir`, falling back to `name.gz` decompressed on the fly
fn open_idx(dir: &Path, name: &str) -> Result<Box<dyn Read>, IoError> {
    let plain = dir.join(name);
    if plain.exists() {
        return Ok(Box::new(IoError::load_in_buf_reader(plain)?));
    }
    let gz: PathBuf = dir.join(format!("{}.gz", name));
    let reader = IoError::load_in_buf_reader(&gz)?;
    Ok(Box::new(GzDecoder::new(reader)))
}

fn read_header_value<R: Read>(reader: &mut R) -> Result<usize, IoError> {
    let value = reader
        .read_i32::<BigEndian>()
        .map_err(IoError::StdIoError)?;
    usize::try_from(value)
        .map_err(|_| IoError::invalid_data(format!("Negative idx header value {}", value)))
}

/// Reads an idx3 image file
///
/// # Parameters
///
/// * `reader` - Source positioned at the start of the file
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - `(n, rows * cols)` grey levels scaled to [0, 1]
/// - `Err(IoError)` - Wrong magic number or truncated data
pub fn read_idx_images<R: Read>(reader: &mut R) -> Result<Array2<f32>, IoError> {
    let magic = reader
        .read_i32::<BigEndian>()
        .map_err(IoError::StdIoError)?;
    if magic != IMAGE_MAGIC {
        return Err(IoError::invalid_data(format!(
            "Expected idx image magic {}, found {}",
            IMAGE_MAGIC, magic
        )));
    }
    let n = read_header_value(reader)?;
    let rows = read_header_value(reader)?;
    let cols = read_header_value(reader)?;

    let mut data = Vec::with_capacity(n * rows * cols);
    reader
        .read_to_end(&mut data)
        .map_err(IoError::StdIoError)?;
    if data.len() != n * rows * cols {
        return Err(IoError::invalid_data(format!(
            "idx image file holds {} bytes, header announces {}",
            data.len(),
            n * rows * cols
        )));
    }

    let pixels: Vec<f32> = data.iter().map(|&b| b as f32 / 255.0).collect();
    Array2::from_shape_vec((n, rows * cols), pixels)
        .map_err(|e| IoError::invalid_data(e.to_string()))
}

/// Reads an idx1 label file
pub fn read_idx_labels<R: Read>(reader: &mut R) -> Result<Array1<u8>, IoError> {
    let magic = reader
        .read_i32::<BigEndian>()
        .map_err(IoError::StdIoError)?;
    if magic != LABEL_MAGIC {
        return Err(IoError::invalid_data(format!(
            "Expected idx label magic {}, found {}",
            LABEL_MAGIC, magic
        )));
    }
    let n = read_header_value(reader)?;

    let mut data = Vec::with_capacity(n);
    reader
        .read_to_end(&mut data)
        .map_err(IoError::StdIoError)?;
    if data.len() != n {
        return Err(IoError::invalid_data(format!(
            "idx label file holds {} labels, header announces {}",
            data.len(),
            n
        )));
    }
    Ok(Array1::from_vec(data))
}

fn load_split(dir: &Path, images: &str, labels: &str) -> Result<MnistSplit, IoError> {
    let images = read_idx_images(&mut open_idx(dir, images)?)?;
    let labels = read_idx_labels(&mut open_idx(dir, labels)?)?;
    if images.nrows() != labels.len() {
        return Err(IoError::invalid_data(format!(
            "{} images but {} labels",
            images.nrows(),
            labels.len()
        )));
    }
    Ok(MnistSplit { images, labels })
}

/// Loads MNIST from the four idx files in `dir` (plain or `.gz`)
///
/// # Parameters
///
/// - `dir` - Directory holding `train-images-idx3-ubyte`, `train-labels-idx1-ubyte`,
///   `t10k-images-idx3-ubyte` and `t10k-labels-idx1-ubyte`
/// - `binary` - Threshold every pixel at 0.5
///
/// # Returns
///
/// - `Ok(Mnist)` - Training, validation and test splits
/// - `Err(IoError)` - Missing or malformed files
///
/// # Example
/// ```no_run
/// use gsn_inpaint::dataset::mnist::load_mnist;
///
/// let mnist = load_mnist("data/mnist", false).unwrap();
/// assert_eq!(mnist.train.images.dim(), (50_000, 784));
/// assert_eq!(mnist.valid.len(), 10_000);
/// assert_eq!(mnist.test.len(), 10_000);
/// ```
pub fn load_mnist<P: AsRef<Path>>(dir: P, binary: bool) -> Result<Mnist, IoError> {
    let dir = dir.as_ref();
    let full_train = load_split(dir, "train-images-idx3-ubyte", "train-labels-idx1-ubyte")?;
    let mut test = load_split(dir, "t10k-images-idx3-ubyte", "t10k-labels-idx1-ubyte")?;

    let n_valid = full_train.len() / 6;
    let n_train = full_train.len() - n_valid;
    let train_indices: Vec<usize> = (0..n_train).collect();
    let valid_indices: Vec<usize> = (n_train..full_train.len()).collect();
    let mut train = full_train.select(&train_indices);
    let mut valid = full_train.select(&valid_indices);

    if binary {
        for split in [&mut train, &mut valid, &mut test] {
            split.images.par_mapv_inplace(binarize);
        }
    }

    log::info!(
        "loaded MNIST from {}: {} train, {} valid, {} test",
        dir.display(),
        train.len(),
        valid.len(),
        test.len()
    );
    Ok(Mnist { train, valid, test })
}
