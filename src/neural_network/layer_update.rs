use crate::config::{HiddenActivation, NoiseConfig};
use crate::error::ModelError;
use crate::neural_network::activation::visible_sigmoid;
use crate::neural_network::noise::{add_gaussian_noise, bernoulli_sample, salt_and_pepper};
use crate::neural_network::parameters::ParameterStore;
use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// Activations of every layer of the network for one batch.
///
/// `layers[0]` is the visible layer, `layers[K]` the deepest hidden layer; each is a
/// `(batch_size, layer_sizes[i])` matrix. A new state is created for every forward
/// pass, sampling run or inpainting run.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkState {
    layers: Vec<Array2<f32>>,
}

impl NetworkState {
    /// Creates a state whose visible layer is `visible` and whose hidden layers are zero
    ///
    /// # Parameters
    ///
    /// - `params` - Parameters the state will be propagated with (for the layer widths)
    /// - `visible` - Initial visible activations, `(batch_size, input_dim)`
    ///
    /// # Returns
    ///
    /// - `Ok(NetworkState)` - The initial state
    /// - `Err(ModelError::InputValidationError)` - If `visible` has the wrong width
    pub fn with_visible(params: &ParameterStore, visible: Array2<f32>) -> Result<Self, ModelError> {
        if visible.ncols() != params.input_dim() {
            return Err(ModelError::InputValidationError(format!(
                "Visible layer has {} units, input has {} columns",
                params.input_dim(),
                visible.ncols()
            )));
        }
        let batch_size = visible.nrows();
        let mut layers = Vec::with_capacity(params.layer_sizes().len());
        layers.push(visible);
        layers.extend(
            params.layer_sizes()[1..]
                .iter()
                .map(|&n| Array2::zeros((batch_size, n))),
        );
        Ok(Self { layers })
    }

    /// Number of layers, K + 1
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn batch_size(&self) -> usize {
        self.layers[0].nrows()
    }

    pub fn layer(&self, index: usize) -> &Array2<f32> {
        &self.layers[index]
    }

    pub fn layers(&self) -> &[Array2<f32>] {
        &self.layers
    }

    pub fn visible(&self) -> &Array2<f32> {
        &self.layers[0]
    }

    pub(crate) fn visible_mut(&mut self) -> &mut Array2<f32> {
        &mut self.layers[0]
    }

    pub(crate) fn replace_layer(&mut self, index: usize, value: Array2<f32>) -> Array2<f32> {
        std::mem::replace(&mut self.layers[index], value)
    }
}

/// Outcome of updating one layer.
///
/// # Fields
///
/// - `value` - The new activation of the layer, noise included
/// - `activation` - The nonlinearity's output before post-activation noise; for the
///   visible layer this is the probability map `p(X | ...)`
/// - `keep_mask` - For the visible layer under noise, 1.0 where the salt-and-pepper
///   corruption kept the entry
/// - `sampled` - For the visible layer, whether `value` is a Bernoulli sample of `activation`
#[derive(Debug, Clone)]
pub struct LayerUpdate {
    pub value: Array2<f32>,
    pub activation: Array2<f32>,
    pub keep_mask: Option<Array2<f32>>,
    pub sampled: bool,
}

/// Computes new layer activations from the current network state.
///
/// For layer `i` the pre-activation is
///
/// - `h_1 · W_0ᵀ + b_0` for the visible layer,
/// - `h_{K-1} · W_{K-1} + b_K` for the deepest layer,
/// - `h_{i+1} · W_iᵀ + h_{i-1} · W_{i-1} + b_i` otherwise.
///
/// The visible layer uses a sigmoid; hidden layers use the configured activation.
#[derive(Debug, Clone, Copy)]
pub struct LayerUpdateEngine<'a> {
    params: &'a ParameterStore,
    activation: HiddenActivation,
    noise: &'a NoiseConfig,
}

impl<'a> LayerUpdateEngine<'a> {
    pub fn new(
        params: &'a ParameterStore,
        activation: HiddenActivation,
        noise: &'a NoiseConfig,
    ) -> Self {
        Self {
            params,
            activation,
            noise,
        }
    }

    pub fn params(&self) -> &'a ParameterStore {
        self.params
    }

    pub fn activation(&self) -> HiddenActivation {
        self.activation
    }

    pub fn noise(&self) -> &'a NoiseConfig {
        self.noise
    }

    /// Number of hidden layers K
    pub fn depth(&self) -> usize {
        self.params.depth()
    }

    /// Whether noisy updates of `layer` receive Gaussian noise
    pub fn layer_is_noisy(&self, layer: usize) -> bool {
        layer != 0 && !(layer == 1 && self.noise.noiseless_h1)
    }

    fn check_shape(&self, input: ArrayView2<f32>, layer: usize) -> Result<(), ModelError> {
        let expected = self.params.layer_sizes()[layer];
        if input.ncols() != expected {
            return Err(ModelError::ProcessingError(format!(
                "Layer {} has {} columns, expected {}",
                layer,
                input.ncols(),
                expected
            )));
        }
        Ok(())
    }

    /// Pre-activation of `layer` from the neighbouring layers of `layers`
    pub fn pre_activation(
        &self,
        layers: &[Array2<f32>],
        layer: usize,
    ) -> Result<Array2<f32>, ModelError> {
        let depth = self.depth();
        if layer > depth || layers.len() != depth + 1 {
            return Err(ModelError::ProcessingError(format!(
                "Cannot update layer {} of a state with {} layers (network depth {})",
                layer,
                layers.len(),
                depth
            )));
        }

        let weights = self.params.weights();
        let bias = &self.params.biases()[layer];

        let mut z = if layer < depth {
            let above = &layers[layer + 1];
            self.check_shape(above.view(), layer + 1)?;
            above.dot(&weights[layer].t())
        } else {
            let below = &layers[layer - 1];
            self.check_shape(below.view(), layer - 1)?;
            below.dot(&weights[layer - 1])
        };

        if layer > 0 && layer < depth {
            let below = &layers[layer - 1];
            self.check_shape(below.view(), layer - 1)?;
            z += &below.dot(&weights[layer - 1]);
        }

        z += bias;
        Ok(z)
    }

    /// Computes the next activation of one layer
    ///
    /// # Parameters
    ///
    /// - `layers` - Current activations of every layer
    /// - `layer` - Index of the layer to update (0 is visible)
    /// - `add_noise` - Inject the configured noise
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(LayerUpdate)` - New value of the layer, shape `(batch_size, layer_sizes[layer])`
    /// - `Err(ModelError)` - If the state does not match the parameters
    pub fn update_layer<R: Rng + ?Sized>(
        &self,
        layers: &[Array2<f32>],
        layer: usize,
        add_noise: bool,
        rng: &mut R,
    ) -> Result<LayerUpdate, ModelError> {
        let z = self.pre_activation(layers, layer)?;

        if layer == 0 {
            return self.update_visible(z, add_noise, rng);
        }

        let noisy = add_noise && self.layer_is_noisy(layer);
        let sigma = self.noise.hidden_add_noise_sigma;

        let z = if noisy {
            add_gaussian_noise(&z, sigma, rng)?
        } else {
            z
        };
        let activation = self.activation.apply(&z);
        let value = if noisy {
            add_gaussian_noise(&activation, sigma, rng)?
        } else {
            activation.clone()
        };

        Ok(LayerUpdate {
            value,
            activation,
            keep_mask: None,
            sampled: false,
        })
    }

    fn update_visible<R: Rng + ?Sized>(
        &self,
        z: Array2<f32>,
        add_noise: bool,
        rng: &mut R,
    ) -> Result<LayerUpdate, ModelError> {
        let probability = visible_sigmoid(&z);

        if !add_noise {
            return Ok(LayerUpdate {
                value: probability.clone(),
                activation: probability,
                keep_mask: None,
                sampled: false,
            });
        }

        let sampled = self.noise.input_sampling;
        let visible = if sampled {
            bernoulli_sample(&probability, rng)
        } else {
            probability.clone()
        };
        let corrupted = salt_and_pepper(&visible, self.noise.input_salt_and_pepper, rng)?;

        Ok(LayerUpdate {
            value: corrupted.corrupted,
            activation: probability,
            keep_mask: Some(corrupted.keep_mask),
            sampled,
        })
    }
}
