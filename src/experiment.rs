//! End-to-end MNIST experiment: training with periodic diagnostics, test-only restore
//! of the latest checkpoint, and inpainting of a directory of corrupted digits.

use crate::config::{DatasetKind, GsnConfig};
use crate::dataset::{MNIST_PIXELS, MissingDataSet, load_mnist};
use crate::error::{ExperimentError, IoError, ModelError};
use crate::neural_network::checkpoint::{checkpoint_file_name, latest_checkpoint, save_parameters};
use crate::neural_network::noise::salt_and_pepper;
use crate::neural_network::{
    EpochObserver, EpochStats, Gsn, LayerUpdateEngine, ParameterStore, Sampler, TrainingData,
    TrainingHistory, WalkbackPropagator,
};
use crate::utility::image_tiler::{save_grayscale_png, tile_raster_images};
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView2, Axis, concatenate, s};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Seed of the training-set shuffle, independent of the run seed
pub const DATA_SHUFFLE_SEED: u64 = 1;
/// Number of test digits shown in the reconstruction diagnostic
pub const RECONSTRUCTION_DIGITS: usize = 100;

/// Outcome of [`run_experiment`].
///
/// # Fields
///
/// - `history` - Per-epoch statistics, `None` in test-only mode
/// - `restored_epoch` - Epoch of the checkpoint restored in test-only mode
/// - `inpainted` - Number of images written by the inpainting stage
#[derive(Debug, Clone, Default)]
pub struct ExperimentSummary {
    pub history: Option<TrainingHistory>,
    pub restored_epoch: Option<usize>,
    pub inpainted: usize,
}

fn to_model_error(e: IoError) -> ModelError {
    ModelError::ProcessingError(e.to_string())
}

/// Writes checkpoints and diagnostic images every checkpoint epoch.
///
/// The reconstruction picture shows, for 100 fixed test digits, the clean digit, its
/// salt-and-pepper corruption and the noiseless walkback reconstruction of the
/// corruption, 10 digits of each per tile row. The sample picture shows a
/// `sample_steps` long sampling chain started from the first test digit.
pub struct DiagnosticsObserver<'a> {
    config: &'a GsnConfig,
    output_dir: PathBuf,
    digits: Array2<f32>,
    rng: StdRng,
}

impl<'a> DiagnosticsObserver<'a> {
    /// Picks the diagnostic digits from `test` with a generator seeded by `seed`
    pub fn new(
        config: &'a GsnConfig,
        test: ArrayView2<f32>,
        seed: u64,
    ) -> Result<Self, ModelError> {
        if test.nrows() == 0 {
            return Err(ModelError::InputValidationError(
                "Diagnostics need at least one test digit".to_string(),
            ));
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let n = RECONSTRUCTION_DIGITS.min(test.nrows());
        let picked = index::sample(&mut rng, test.nrows(), n).into_vec();
        let digits = test.select(Axis(0), &picked);

        Ok(Self {
            config,
            output_dir: config.experiment.output_dir.clone(),
            digits,
            rng,
        })
    }

    fn engine<'p>(&self, params: &'p ParameterStore) -> LayerUpdateEngine<'p>
    where
        'a: 'p,
    {
        let config: &'a GsnConfig = self.config;
        LayerUpdateEngine::new(params, config.network.activation, &config.noise)
    }

    /// Writes `number_reconstruction<epoch>.png`
    pub fn write_reconstructions(
        &mut self,
        epoch: usize,
        params: &ParameterStore,
    ) -> Result<PathBuf, ModelError> {
        let noisy = salt_and_pepper(
            &self.digits,
            self.config.noise.input_salt_and_pepper,
            &mut self.rng,
        )?
        .corrupted;
        let reconstructed = WalkbackPropagator::new(self.engine(params))
            .reconstruct(noisy.view(), self.config.network.walkbacks)?;

        let n = self.digits.nrows();
        let mut blocks = Vec::with_capacity(3 * n.div_ceil(10));
        for start in (0..n).step_by(10) {
            let end = (start + 10).min(n);
            blocks.push(self.digits.slice(s![start..end, ..]));
            blocks.push(noisy.slice(s![start..end, ..]));
            blocks.push(reconstructed.slice(s![start..end, ..]));
        }
        let stacked = concatenate(Axis(0), &blocks)
            .map_err(|e| ModelError::ProcessingError(e.to_string()))?;

        let side = image_side(params.input_dim())?;
        let tiled = tile_raster_images(stacked.view(), (side, side), (10, 30), (1, 1))?;
        let path = self
            .output_dir
            .join(format!("number_reconstruction{}.png", epoch));
        save_grayscale_png(tiled.view(), &path).map_err(to_model_error)?;
        Ok(path)
    }

    /// Writes `samples_epoch_<epoch>.png`
    pub fn write_samples(
        &mut self,
        epoch: usize,
        params: &ParameterStore,
    ) -> Result<PathBuf, ModelError> {
        let seed = self.digits.slice(s![0..1, ..]).to_owned();
        let trajectory = Sampler::new(self.engine(params)).sample(
            seed.view(),
            self.config.experiment.sample_steps,
            &mut self.rng,
        )?;
        let stacked = trajectory.stacked()?;

        let side = image_side(params.input_dim())?;
        let tiled = tile_raster_images(stacked.view(), (side, side), (20, 20), (1, 1))?;
        let path = self.output_dir.join(format!("samples_epoch_{}.png", epoch));
        save_grayscale_png(tiled.view(), &path).map_err(to_model_error)?;
        Ok(path)
    }
}

impl EpochObserver for DiagnosticsObserver<'_> {
    fn on_checkpoint(&mut self, epoch: usize, params: &ParameterStore) -> Result<(), ModelError> {
        let checkpoint = self.output_dir.join(checkpoint_file_name(epoch));
        save_parameters(params, &checkpoint).map_err(to_model_error)?;

        let reconstructions = self.write_reconstructions(epoch, params)?;
        let samples = self.write_samples(epoch, params)?;
        log::info!(
            "checkpoint {}: wrote {} and {}",
            epoch,
            reconstructions.display(),
            samples.display()
        );
        Ok(())
    }

    fn on_epoch_end(
        &mut self,
        stats: &EpochStats,
        _params: &ParameterStore,
    ) -> Result<(), ModelError> {
        if let (Some(first), Some(last)) =
            (stats.train_batch_costs.first(), stats.train_batch_costs.last())
        {
            log::debug!(
                "epoch {}: first batch cost {:.4}, last batch cost {:.4}",
                stats.epoch,
                first,
                last
            );
        }
        Ok(())
    }
}

/// Side of the square images of width `n_input`
fn image_side(n_input: usize) -> Result<usize, ModelError> {
    let side = (n_input as f64).sqrt().round() as usize;
    if side * side != n_input {
        return Err(ModelError::InputValidationError(format!(
            "Input width {} is not a square image",
            n_input
        )));
    }
    Ok(side)
}

/// Inpaints every image listed in `data_dir` and writes the results to `save_path`
///
/// For every entry the final image of an `n_steps` inpainting trajectory is saved as a
/// grayscale PNG named after the input with `corrupted` replaced by `ip`, and a line
/// `<output name> <label>` is appended to `save_path/index.txt`.
///
/// # Parameters
///
/// - `gsn` - Trained network
/// - `data_dir` - Directory with `index.txt` and `index_mask.txt`
/// - `save_path` - Output directory, created if needed
/// - `n_steps` - Length of every inpainting trajectory
/// - `rng` - Random generator
///
/// # Returns
///
/// - `Ok(usize)` - Number of images written
/// - `Err(ExperimentError)` - Unreadable inputs, shape mismatches or write failures
pub fn inpaint_directory<R: Rng + ?Sized>(
    gsn: &Gsn,
    data_dir: &Path,
    save_path: &Path,
    n_steps: usize,
    rng: &mut R,
) -> Result<usize, ExperimentError> {
    let dataset = MissingDataSet::open(data_dir)?;
    fs::create_dir_all(save_path).map_err(IoError::StdIoError)?;
    let side = image_side(gsn.params().input_dim())?;

    log::info!("inpainting {} images from {}", dataset.len(), data_dir.display());
    let progress_bar = ProgressBar::new(dataset.len() as u64);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let index_file = File::create(save_path.join("index.txt")).map_err(IoError::StdIoError)?;
    let mut index_writer = BufWriter::new(index_file);

    for entry in dataset.entries() {
        let digit = dataset.load_digit(entry)?;
        let missing = dataset.load_mask(entry)?;
        let trajectory = gsn.inpaint(digit.view(), missing.view(), n_steps, rng)?;
        let result = trajectory.final_reconstruction().ok_or_else(|| {
            ModelError::ProcessingError("Inpainting produced no image".to_string())
        })?;

        let image = result
            .to_shape((side, side))
            .map_err(|e| ModelError::ProcessingError(e.to_string()))?;
        let output_name = entry.output_name();
        save_grayscale_png(image.view(), save_path.join(&output_name))?;
        writeln!(index_writer, "{} {}", output_name, entry.label).map_err(IoError::StdIoError)?;

        progress_bar.set_message(output_name);
        progress_bar.inc(1);
    }

    index_writer.flush().map_err(IoError::StdIoError)?;
    progress_bar.finish_with_message("Inpainting completed");
    Ok(dataset.len())
}

/// Runs a full experiment described by `config`
///
/// 1. Writes the effective configuration to `output_dir/config.json` when training, so a
///    test-only run leaves the configuration of its checkpoints in place.
/// 2. Loads MNIST, appends the validation set to the training set and shuffles it.
/// 3. Trains with checkpoints and diagnostics, or, with `test_model`, restores the
///    latest checkpoint of `output_dir` and writes one round of diagnostics.
/// 4. Inpaints `missing_data_dir` when it is set.
///
/// # Returns
///
/// - `Ok(ExperimentSummary)` - What was done
/// - `Err(ExperimentError)` - The first failure
pub fn run_experiment(config: &GsnConfig) -> Result<ExperimentSummary, ExperimentError> {
    config.validate()?;
    let experiment = &config.experiment;

    fs::create_dir_all(&experiment.output_dir).map_err(IoError::StdIoError)?;
    if !experiment.test_model {
        config.save_to_path(experiment.output_dir.join("config.json"))?;
    }

    let binary = experiment.dataset == DatasetKind::MnistBinary;
    let mut mnist = load_mnist(&experiment.data_path, binary)?;
    mnist.merge_valid_into_train()?;
    mnist.shuffle_train(DATA_SHUFFLE_SEED);

    let mut rng = StdRng::seed_from_u64(config.training.seed);
    let mut gsn = Gsn::new(config.clone(), MNIST_PIXELS, &mut rng)?;
    gsn.summary();

    let mut observer =
        DiagnosticsObserver::new(config, mnist.test.images.view(), config.training.seed)?;
    let mut summary = ExperimentSummary::default();

    if experiment.test_model {
        log::info!("testing: skip training");
        let (epoch, path) = latest_checkpoint(&experiment.output_dir)?.ok_or_else(|| {
            IoError::invalid_data(format!(
                "No checkpoint found in {}",
                experiment.output_dir.display()
            ))
        })?;
        gsn.load_checkpoint(&path)?;
        observer.write_reconstructions(epoch, gsn.params())?;
        observer.write_samples(epoch, gsn.params())?;
        summary.restored_epoch = Some(epoch);
    } else {
        let data = TrainingData {
            train: mnist.train.images.view(),
            valid: mnist.valid.images.view(),
            test: mnist.test.images.view(),
        };
        let history = gsn.fit(data, &mut observer, &mut rng)?;
        if let Some(last) = history.last() {
            log::info!(
                "training finished after {} epochs, final train cost {:.6}",
                last.epoch,
                last.train_cost
            );
        }
        summary.history = Some(history);
    }

    if let Some(dir) = &experiment.missing_data_dir {
        summary.inpainted = inpaint_directory(
            &gsn,
            dir,
            &experiment.save_path,
            experiment.inpaint_steps,
            &mut rng,
        )?;
    }

    Ok(summary)
}
