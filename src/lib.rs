/// Module `error` contains the error types returned throughout the crate.
///
/// - `ModelError` - invalid inputs or configuration, propagation failures and numeric degeneracy
/// - `IoError` - file, JSON, image and checkpoint failures
/// - `ExperimentError` - either of the above, surfaced by the experiment runner
pub mod error;

/// Module `config` contains the experiment configuration.
///
/// `GsnConfig` groups the network shape, the noise process, the optimisation schedule and
/// the file-system locations of a run. It is (de)serialised with serde, every field has
/// a default, and `GsnConfig::validate` rejects unusable values before anything runs.
///
/// # Example
/// ```rust
/// use gsn_inpaint::config::{GsnConfig, HiddenActivation};
///
/// let config = GsnConfig::default();
/// assert_eq!(config.network.activation, HiddenActivation::Tanh);
/// assert_eq!(config.layer_sizes(784), vec![784, 1500, 1500]);
/// ```
pub mod config;

/// Module `math` contains scalar helpers shared by the network code.
///
/// - `sigmoid` - overflow-safe logistic function
/// - `logit` - inverse of the sigmoid
/// - `clip_probability` / `binarize` - probability clamping and thresholding
/// - `mean_binary_cross_entropy` - the reconstruction cost of one chain step
pub mod math;

/// Module `neural_network` implements the Generative Stochastic Network.
///
/// # Core Components
///
/// ## Network
/// - **ParameterStore**: weights `W_0 … W_{K-1}` and biases `b_0 … b_K`
/// - **NetworkState**: activations of every layer for one batch
/// - **LayerUpdateEngine**: recomputes one layer from its neighbours, with optional noise
/// - **WalkbackPropagator**: odd-then-even sweeps producing reconstruction chains
///
/// ## Training
/// - **walkback_cost**: per-step cross-entropy of a chain against the clean input
/// - **backpropagate**: gradients of the chain cost through recorded sweeps
/// - **MomentumSGD**: momentum updates with per-epoch learning-rate annealing
/// - **Trainer**: minibatch loop with validation, test and checkpoint hooks
///
/// ## Generation
/// - **Sampler**: Markov chain of samples from a trained network
/// - **Inpainter**: conditional sampling with known pixels clamped
///
/// # Examples
/// ```rust
/// use gsn_inpaint::config::GsnConfig;
/// use gsn_inpaint::neural_network::Gsn;
/// use ndarray::{Array1, Array2};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut config = GsnConfig::default();
/// config.network.hidden_size = 32;
///
/// let mut rng = StdRng::seed_from_u64(0);
/// let gsn = Gsn::new(config, 64, &mut rng).unwrap();
///
/// let digit = Array2::from_elem((1, 64), 0.0);
/// let missing = Array1::from_shape_fn(64, |i| i >= 32);
/// let trajectory = gsn.inpaint(digit.view(), missing.view(), 5, &mut rng).unwrap();
/// assert_eq!(trajectory.len(), 5);
/// ```
pub mod neural_network;

/// Module `dataset` loads MNIST idx files and directories of images with missing regions.
pub mod dataset;

/// Module `utility` contains image tiling and grayscale PNG input/output.
pub mod utility;

/// Module `experiment` runs the full MNIST workflow: training with diagnostics,
/// test-only restore of a checkpoint and inpainting of a directory.
pub mod experiment;

/// A convenience module that re-exports the most commonly used types of this crate.
///
/// # Examples
/// ```rust
/// use gsn_inpaint::prelude::*;
///
/// let config = GsnConfig::default();
/// assert!(config.validate().is_ok());
/// ```
pub mod prelude;

pub use error::{ExperimentError, IoError, ModelError};
