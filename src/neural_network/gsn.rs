use crate::config::GsnConfig;
use crate::error::{IoError, ModelError};
use crate::neural_network::checkpoint::{load_parameters, save_parameters};
use crate::neural_network::inpainter::{Inpainter, InpaintingTrajectory};
use crate::neural_network::layer_update::LayerUpdateEngine;
use crate::neural_network::parameters::ParameterStore;
use crate::neural_network::sampler::{SampleTrajectory, Sampler};
use crate::neural_network::trainer::{EpochObserver, Trainer, TrainingData, TrainingHistory};
use crate::neural_network::walkback::WalkbackPropagator;
use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::Rng;
use std::path::Path;

/// A Generative Stochastic Network: a configuration and the parameters it trains.
///
/// `Gsn` ties the pieces together: it owns the [`ParameterStore`], builds a
/// [`LayerUpdateEngine`] from the configured activation and noise process, and exposes
/// training, sampling, inpainting, reconstruction and checkpointing.
///
/// # Example
/// ```rust
/// use gsn_inpaint::config::GsnConfig;
/// use gsn_inpaint::neural_network::{Gsn, TrainingData};
/// use ndarray::Array2;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut config = GsnConfig::default();
/// config.network.hidden_size = 16;
/// config.training.batch_size = 4;
/// config.training.n_epoch = 2;
///
/// let mut rng = StdRng::seed_from_u64(42);
/// let train = Array2::from_shape_fn((8, 25), |(i, j)| ((i + j) % 2) as f32);
/// let empty = Array2::<f32>::zeros((0, 25));
///
/// let mut gsn = Gsn::new(config, 25, &mut rng).unwrap();
/// gsn.summary();
///
/// let data = TrainingData { train: train.view(), valid: empty.view(), test: empty.view() };
/// let history = gsn.fit(data, &mut (), &mut rng).unwrap();
/// assert_eq!(history.epochs.len(), 2);
///
/// let samples = gsn.sample(train.slice(ndarray::s![0..1, ..]), 10, &mut rng).unwrap();
/// assert_eq!(samples.len(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct Gsn {
    config: GsnConfig,
    params: ParameterStore,
}

impl Gsn {
    /// Creates a network with freshly initialised parameters
    ///
    /// # Parameters
    ///
    /// - `config` - Configuration, validated here
    /// - `n_input` - Width of the visible layer
    /// - `rng` - Random generator for the weight initialisation
    ///
    /// # Returns
    ///
    /// - `Ok(Gsn)` - The untrained network
    /// - `Err(ModelError::InputValidationError)` - If the configuration is invalid
    pub fn new<R: Rng + ?Sized>(
        config: GsnConfig,
        n_input: usize,
        rng: &mut R,
    ) -> Result<Self, ModelError> {
        config.validate()?;
        let params = ParameterStore::new(&config.layer_sizes(n_input), rng)?;
        Ok(Self { config, params })
    }

    /// Wraps existing parameters, checking that they match the configured depth and width
    pub fn from_parameters(config: GsnConfig, params: ParameterStore) -> Result<Self, ModelError> {
        config.validate()?;
        let expected = config.layer_sizes(params.input_dim());
        if expected != params.layer_sizes() {
            return Err(ModelError::InputValidationError(format!(
                "Parameters have layer sizes {:?}, configuration implies {:?}",
                params.layer_sizes(),
                expected
            )));
        }
        Ok(Self { config, params })
    }

    pub fn config(&self) -> &GsnConfig {
        &self.config
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    /// Layer update engine over the current parameters
    pub fn engine(&self) -> LayerUpdateEngine<'_> {
        LayerUpdateEngine::new(
            &self.params,
            self.config.network.activation,
            &self.config.noise,
        )
    }

    /// Prints the parameter table
    pub fn summary(&self) {
        self.params.summary();
    }

    /// Trains the network for the configured number of epochs
    ///
    /// When `vis_init` is set, the visible bias is first initialised from the training set.
    ///
    /// # Returns
    ///
    /// - `Ok(TrainingHistory)` - Statistics of every epoch
    /// - `Err(ModelError)` - See [`Trainer::fit`]
    pub fn fit<R: Rng + ?Sized, O: EpochObserver + ?Sized>(
        &mut self,
        data: TrainingData<'_>,
        observer: &mut O,
        rng: &mut R,
    ) -> Result<TrainingHistory, ModelError> {
        if self.config.network.vis_init {
            self.params.init_visible_bias(data.train)?;
        }
        let mut trainer = Trainer::new(&self.config)?;
        trainer.fit(&mut self.params, data, observer, rng)
    }

    /// Sampling chain of `n_steps` images starting from `seed`
    pub fn sample<R: Rng + ?Sized>(
        &self,
        seed: ArrayView2<f32>,
        n_steps: usize,
        rng: &mut R,
    ) -> Result<SampleTrajectory, ModelError> {
        Sampler::new(self.engine()).sample(seed, n_steps, rng)
    }

    /// Inpainting trajectory of `n_steps` images for one digit
    pub fn inpaint<R: Rng + ?Sized>(
        &self,
        digit: ArrayView2<f32>,
        missing: ArrayView1<bool>,
        n_steps: usize,
        rng: &mut R,
    ) -> Result<InpaintingTrajectory, ModelError> {
        Inpainter::new(self.engine()).inpaint(digit, missing, n_steps, rng)
    }

    /// Noiseless walkback reconstruction of `input` after `walkbacks` sweeps
    ///
    /// The visible layer is not salt-and-pepper corrupted between sweeps.
    pub fn reconstruct(&self, input: ArrayView2<f32>) -> Result<Array2<f32>, ModelError> {
        WalkbackPropagator::new(self.engine()).reconstruct(input, self.config.network.walkbacks)
    }

    /// Writes the parameters as a JSON checkpoint
    pub fn save_checkpoint<P: AsRef<Path>>(&self, path: P) -> Result<(), IoError> {
        save_parameters(&self.params, path)
    }

    /// Replaces the parameters with the ones stored at `path`
    ///
    /// # Returns
    ///
    /// - `Ok(())` - Parameters restored
    /// - `Err(IoError::CheckpointMismatch)` - The checkpoint was written by a different architecture
    pub fn load_checkpoint<P: AsRef<Path>>(&mut self, path: P) -> Result<(), IoError> {
        let layer_sizes = self.params.layer_sizes().to_vec();
        self.params = load_parameters(path, &layer_sizes)?;
        Ok(())
    }
}
