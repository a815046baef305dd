//! Experiment configuration
//!
//! `GsnConfig` is an immutable description of one run: network shape, noise process,
//! optimisation schedule and the file-system locations used by the experiment runner.
//! It is loaded from JSON (every field optional, defaults follow the reference MNIST
//! setup), optionally overridden from the command line, and validated once at startup.

use crate::error::{IoError, ModelError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Nonlinearity applied by every hidden layer. The visible layer is always sigmoid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiddenActivation {
    Sigmoid,
    Rectifier,
    Tanh,
}

impl FromStr for HiddenActivation {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sigmoid" => Ok(HiddenActivation::Sigmoid),
            "rectifier" | "relu" => Ok(HiddenActivation::Rectifier),
            "tanh" => Ok(HiddenActivation::Tanh),
            other => Err(ModelError::InputValidationError(format!(
                "Unknown activation '{}', expected one of sigmoid, rectifier, tanh",
                other
            ))),
        }
    }
}

impl fmt::Display for HiddenActivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HiddenActivation::Sigmoid => "sigmoid",
            HiddenActivation::Rectifier => "rectifier",
            HiddenActivation::Tanh => "tanh",
        };
        write!(f, "{}", name)
    }
}

/// How the per-step cross-entropies of a reconstruction chain are combined into the
/// training objective.
///
/// # Variants
///
/// - `Sum` - add the cost of every chain step (the walkback objective)
/// - `Mean` - average over chain steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainLoss {
    #[default]
    Sum,
    Mean,
}

impl FromStr for ChainLoss {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sum" => Ok(ChainLoss::Sum),
            "mean" => Ok(ChainLoss::Mean),
            other => Err(ModelError::InputValidationError(format!(
                "Unknown chain loss '{}', expected sum or mean",
                other
            ))),
        }
    }
}

/// Dataset the experiment trains on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetKind {
    /// MNIST idx files, grey levels scaled to [0, 1]
    #[default]
    Mnist,
    /// MNIST thresholded at 0.5
    MnistBinary,
}

impl FromStr for DatasetKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mnist" => Ok(DatasetKind::Mnist),
            "mnist_binary" => Ok(DatasetKind::MnistBinary),
            other => Err(ModelError::InputValidationError(format!(
                "Unsupported dataset '{}', expected mnist or mnist_binary",
                other
            ))),
        }
    }
}

/// Shape of the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of hidden layers K
    pub hidden_layers: usize,
    /// Number of walkback sweeps N used to build the training chain
    pub walkbacks: usize,
    /// Width of every hidden layer
    pub hidden_size: usize,
    /// Hidden-layer nonlinearity
    pub activation: HiddenActivation,
    /// Initialise the visible bias to the logit of the mean training pixel
    pub vis_init: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hidden_layers: 2,
            walkbacks: 4,
            hidden_size: 1500,
            activation: HiddenActivation::Tanh,
            vis_init: false,
        }
    }
}

/// Noise process injected during noisy propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Fraction of visible entries replaced by 0/1 after every visible update
    pub input_salt_and_pepper: f32,
    /// Standard deviation of the pre/post-activation Gaussian noise on hidden layers
    pub hidden_add_noise_sigma: f32,
    /// Exempt the first hidden layer from Gaussian noise
    pub noiseless_h1: bool,
    /// Draw a Bernoulli sample from the visible probabilities before corrupting them
    pub input_sampling: bool,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            input_salt_and_pepper: 0.4,
            hidden_add_noise_sigma: 2.0,
            noiseless_h1: true,
            input_sampling: true,
        }
    }
}

/// Optimisation schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learning_rate: f32,
    /// Per-epoch multiplicative learning-rate decay
    pub annealing: f32,
    pub momentum: f32,
    pub batch_size: usize,
    pub n_epoch: usize,
    pub chain_loss: ChainLoss,
    /// Epoch period of checkpoints and diagnostics
    pub checkpoint_interval: usize,
    /// Seed of the run's random generator
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.25,
            annealing: 0.995,
            momentum: 0.5,
            batch_size: 100,
            n_epoch: 1000,
            chain_loss: ChainLoss::Sum,
            checkpoint_interval: 5,
            seed: 1,
        }
    }
}

/// File-system side of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    pub dataset: DatasetKind,
    /// Directory holding the MNIST idx files
    pub data_path: PathBuf,
    /// Skip training and restore the latest checkpoint from `output_dir`
    pub test_model: bool,
    /// Directory with `index.txt` / `index_mask.txt` describing images to inpaint
    pub missing_data_dir: Option<PathBuf>,
    /// Where inpainted images and their index are written
    pub save_path: PathBuf,
    /// Where checkpoints, diagnostics and the effective config are written
    pub output_dir: PathBuf,
    pub inpaint_steps: usize,
    pub sample_steps: usize,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetKind::Mnist,
            data_path: PathBuf::from("data/mnist"),
            test_model: false,
            missing_data_dir: None,
            save_path: PathBuf::from("inpainted"),
            output_dir: PathBuf::from("."),
            inpaint_steps: 50,
            sample_steps: 400,
        }
    }
}

/// Complete configuration of a GSN experiment.
///
/// # Example
/// ```rust
/// use gsn_inpaint::config::GsnConfig;
///
/// let json = r#"{ "network": { "hidden_layers": 3, "activation": "rectifier" } }"#;
/// let config: GsnConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.network.hidden_layers, 3);
/// assert_eq!(config.training.batch_size, 100);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GsnConfig {
    pub network: NetworkConfig,
    pub noise: NoiseConfig,
    pub training: TrainingConfig,
    pub experiment: ExperimentConfig,
}

fn validate_probability(value: f32, name: &str) -> Result<(), ModelError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ModelError::InputValidationError(format!(
            "{} must be between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

fn validate_positive(value: usize, name: &str) -> Result<(), ModelError> {
    if value == 0 {
        return Err(ModelError::InputValidationError(format!(
            "{} must be greater than 0",
            name
        )));
    }
    Ok(())
}

impl GsnConfig {
    /// Checks every field for a usable value
    ///
    /// # Returns
    ///
    /// - `Ok(())` - The configuration can be used
    /// - `Err(ModelError::InputValidationError)` - Describes the first invalid field
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_positive(self.network.hidden_layers, "hidden_layers")?;
        validate_positive(self.network.walkbacks, "walkbacks")?;
        validate_positive(self.network.hidden_size, "hidden_size")?;

        validate_probability(self.noise.input_salt_and_pepper, "input_salt_and_pepper")?;
        if !self.noise.hidden_add_noise_sigma.is_finite() || self.noise.hidden_add_noise_sigma < 0.0
        {
            return Err(ModelError::InputValidationError(format!(
                "hidden_add_noise_sigma must be a non-negative number, got {}",
                self.noise.hidden_add_noise_sigma
            )));
        }

        let training = &self.training;
        if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
            return Err(ModelError::InputValidationError(format!(
                "learning_rate must be positive, got {}",
                training.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&training.annealing) || training.annealing == 0.0 {
            return Err(ModelError::InputValidationError(format!(
                "annealing must be in (0, 1], got {}",
                training.annealing
            )));
        }
        if !(0.0..1.0).contains(&training.momentum) {
            return Err(ModelError::InputValidationError(format!(
                "momentum must be in [0, 1), got {}",
                training.momentum
            )));
        }
        validate_positive(training.batch_size, "batch_size")?;
        validate_positive(training.checkpoint_interval, "checkpoint_interval")?;

        validate_positive(self.experiment.inpaint_steps, "inpaint_steps")?;
        validate_positive(self.experiment.sample_steps, "sample_steps")?;

        Ok(())
    }

    /// Layer widths from the visible layer to the deepest hidden layer
    ///
    /// # Parameters
    ///
    /// * `n_input` - Dimensionality of one input example
    ///
    /// # Returns
    ///
    /// * `Vec<usize>` - `[n_input, hidden_size, ..., hidden_size]` with K hidden entries
    pub fn layer_sizes(&self, n_input: usize) -> Vec<usize> {
        std::iter::once(n_input)
            .chain(std::iter::repeat_n(
                self.network.hidden_size,
                self.network.hidden_layers,
            ))
            .collect()
    }

    /// Writes the configuration as pretty JSON
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        let file = File::create(path).map_err(IoError::StdIoError)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self).map_err(IoError::JsonError)?;
        writer.flush().map_err(IoError::StdIoError)?;
        Ok(())
    }
}

/// Loads a configuration from a JSON file.
///
/// Missing fields take their defaults. The result is not validated; call
/// [`GsnConfig::validate`] once all overrides are applied.
///
/// # Parameters
///
/// * `path` - Path of the JSON document
///
/// # Returns
///
/// - `Ok(GsnConfig)` - The parsed configuration
/// - `Err(IoError)` - The file could not be read or is not valid JSON for this schema
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<GsnConfig, IoError> {
    let reader = IoError::load_in_buf_reader(path)?;
    serde_json::from_reader(reader).map_err(IoError::JsonError)
}
