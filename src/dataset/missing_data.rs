use crate::error::IoError;
use crate::utility::image_tiler::load_grayscale_png;
use ndarray::{Array1, Array2};
use std::fs;
use std::path::{Path, PathBuf};

/// File listing the corrupted images and their labels
pub const IMAGE_INDEX_FILE: &str = "index.txt";
/// File listing the masks, line by line parallel to [`IMAGE_INDEX_FILE`]
pub const MASK_INDEX_FILE: &str = "index_mask.txt";

/// One image to inpaint as listed by the index files.
///
/// # Fields
///
/// - `image_path` - Path of the corrupted image, relative to the data directory
/// - `label` - Label column of `index.txt`, copied verbatim to the output index
/// - `mask_path` - Path of the mask image, relative to the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingDataEntry {
    pub image_path: String,
    pub label: String,
    pub mask_path: String,
}

impl MissingDataEntry {
    /// Output file name: the input's base name with `corrupted` replaced by `ip`
    pub fn output_name(&self) -> String {
        let base = Path::new(&self.image_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.image_path.clone());
        base.replace("corrupted", "ip")
    }
}

/// A directory of images with missing regions.
///
/// `index.txt` holds `<image path> <label>` per line and `index_mask.txt` holds
/// `<mask path>` (extra columns are ignored) per line; both lists must have the same
/// length. Blank lines are skipped.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingDataSet {
    root: PathBuf,
    entries: Vec<MissingDataEntry>,
}

fn read_index_lines(path: &Path) -> Result<Vec<Vec<String>>, IoError> {
    let content = fs::read_to_string(path).map_err(IoError::StdIoError)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .collect())
}

impl MissingDataSet {
    /// Reads the two index files of `dir`
    ///
    /// # Parameters
    ///
    /// * `dir` - Directory holding `index.txt` and `index_mask.txt`
    ///
    /// # Returns
    ///
    /// - `Ok(MissingDataSet)` - The listed entries, in file order
    /// - `Err(IoError)` - Missing files, malformed lines or lists of different lengths
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, IoError> {
        let root = dir.as_ref().to_path_buf();
        let images = read_index_lines(&root.join(IMAGE_INDEX_FILE))?;
        let masks = read_index_lines(&root.join(MASK_INDEX_FILE))?;

        if images.len() != masks.len() {
            return Err(IoError::invalid_data(format!(
                "{} lists {} images but {} lists {} masks",
                IMAGE_INDEX_FILE,
                images.len(),
                MASK_INDEX_FILE,
                masks.len()
            )));
        }

        let mut entries = Vec::with_capacity(images.len());
        for (line, (image, mask)) in images.into_iter().zip(masks).enumerate() {
            let (image_path, label) = match image.as_slice() {
                [path, label, ..] => (path.clone(), label.clone()),
                _ => {
                    return Err(IoError::invalid_data(format!(
                        "{} line {} needs an image path and a label",
                        IMAGE_INDEX_FILE,
                        line + 1
                    )));
                }
            };
            let mask_path = mask.first().cloned().ok_or_else(|| {
                IoError::invalid_data(format!("{} line {} is empty", MASK_INDEX_FILE, line + 1))
            })?;
            entries.push(MissingDataEntry {
                image_path,
                label,
                mask_path,
            });
        }

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[MissingDataEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the image of `entry` as a `(1, height * width)` row with values in [0, 1]
    pub fn load_digit(&self, entry: &MissingDataEntry) -> Result<Array2<f32>, IoError> {
        let pixels = load_grayscale_png(self.root.join(&entry.image_path))?;
        let n = pixels.len();
        pixels
            .into_shape_with_order((1, n))
            .map_err(|e| IoError::invalid_data(e.to_string()))
    }

    /// Loads the mask of `entry`; `true` marks a missing pixel (mask value above zero)
    pub fn load_mask(&self, entry: &MissingDataEntry) -> Result<Array1<bool>, IoError> {
        let pixels = load_grayscale_png(self.root.join(&entry.mask_path))?;
        Ok(pixels.iter().map(|&v| v > 0.0).collect())
    }
}
