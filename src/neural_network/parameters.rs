use crate::error::ModelError;
use crate::math::logit;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand_distr::{Distribution, Uniform};

/// Weights and biases of a GSN.
///
/// A network with K hidden layers has K weight matrices and K+1 bias vectors:
/// `weights[i]` has shape `(layer_sizes[i], layer_sizes[i + 1])` and connects layer `i`
/// to layer `i + 1` (used transposed when propagating downwards), `biases[i]` has
/// length `layer_sizes[i]`.
///
/// # Example
/// ```rust
/// use gsn_inpaint::neural_network::ParameterStore;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(1);
/// let params = ParameterStore::new(&[784, 100, 100], &mut rng).unwrap();
/// assert_eq!(params.depth(), 2);
/// assert_eq!(params.weights()[1].dim(), (100, 100));
/// assert_eq!(params.biases()[0].len(), 784);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterStore {
    layer_sizes: Vec<usize>,
    weights: Vec<Array2<f32>>,
    biases: Vec<Array1<f32>>,
}

impl ParameterStore {
    /// Creates a freshly initialised parameter set
    ///
    /// Weights are drawn uniformly from `±sqrt(6 / (fan_in + fan_out))`, biases are zero.
    ///
    /// # Parameters
    ///
    /// - `layer_sizes` - Widths from the visible layer to the deepest hidden layer
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(ParameterStore)` - The initialised parameters
    /// - `Err(ModelError::InputValidationError)` - Fewer than two layers or a zero width
    pub fn new<R: Rng + ?Sized>(layer_sizes: &[usize], rng: &mut R) -> Result<Self, ModelError> {
        Self::validate_layer_sizes(layer_sizes)?;

        let mut weights = Vec::with_capacity(layer_sizes.len() - 1);
        for pair in layer_sizes.windows(2) {
            let (fan_in, fan_out) = (pair[0], pair[1]);
            let interval = (6.0 / (fan_in + fan_out) as f32).sqrt();
            let uniform = Uniform::new(-interval, interval).map_err(|e| {
                ModelError::ProcessingError(format!("Invalid initialisation interval: {}", e))
            })?;
            weights.push(Array2::from_shape_simple_fn((fan_in, fan_out), || {
                uniform.sample(rng)
            }));
        }

        let biases = layer_sizes.iter().map(|&n| Array1::zeros(n)).collect();

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            weights,
            biases,
        })
    }

    /// Builds a store from explicit tensors, checking every shape against `layer_sizes`
    ///
    /// # Parameters
    ///
    /// - `layer_sizes` - Expected widths
    /// - `weights` - K weight matrices
    /// - `biases` - K+1 bias vectors
    ///
    /// # Returns
    ///
    /// - `Ok(ParameterStore)` - If counts and shapes match
    /// - `Err(ModelError::InputValidationError)` - Describes the first mismatch
    pub fn from_parts(
        layer_sizes: &[usize],
        weights: Vec<Array2<f32>>,
        biases: Vec<Array1<f32>>,
    ) -> Result<Self, ModelError> {
        Self::validate_layer_sizes(layer_sizes)?;
        let depth = layer_sizes.len() - 1;

        if weights.len() != depth || biases.len() != depth + 1 {
            return Err(ModelError::InputValidationError(format!(
                "Expected {} weight matrices and {} bias vectors, got {} and {}",
                depth,
                depth + 1,
                weights.len(),
                biases.len()
            )));
        }

        for (i, w) in weights.iter().enumerate() {
            let expected = (layer_sizes[i], layer_sizes[i + 1]);
            if w.dim() != expected {
                return Err(ModelError::InputValidationError(format!(
                    "Weight {} has shape {:?}, expected {:?}",
                    i,
                    w.dim(),
                    expected
                )));
            }
        }
        for (i, b) in biases.iter().enumerate() {
            if b.len() != layer_sizes[i] {
                return Err(ModelError::InputValidationError(format!(
                    "Bias {} has length {}, expected {}",
                    i,
                    b.len(),
                    layer_sizes[i]
                )));
            }
        }

        Ok(Self {
            layer_sizes: layer_sizes.to_vec(),
            weights,
            biases,
        })
    }

    fn validate_layer_sizes(layer_sizes: &[usize]) -> Result<(), ModelError> {
        if layer_sizes.len() < 2 {
            return Err(ModelError::InputValidationError(format!(
                "A GSN needs a visible layer and at least one hidden layer, got {} layer(s)",
                layer_sizes.len()
            )));
        }
        if layer_sizes.contains(&0) {
            return Err(ModelError::InputValidationError(format!(
                "Layer sizes must be positive, got {:?}",
                layer_sizes
            )));
        }
        Ok(())
    }

    /// Number of hidden layers K
    pub fn depth(&self) -> usize {
        self.weights.len()
    }

    pub fn layer_sizes(&self) -> &[usize] {
        &self.layer_sizes
    }

    pub fn input_dim(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn weights(&self) -> &[Array2<f32>] {
        &self.weights
    }

    pub fn biases(&self) -> &[Array1<f32>] {
        &self.biases
    }

    pub(crate) fn parameters_mut(&mut self) -> (&mut [Array2<f32>], &mut [Array1<f32>]) {
        (self.weights.as_mut_slice(), self.biases.as_mut_slice())
    }

    /// Total number of trainable scalars
    pub fn param_count(&self) -> usize {
        self.weights.iter().map(|w| w.len()).sum::<usize>()
            + self.biases.iter().map(|b| b.len()).sum::<usize>()
    }

    /// Sets the visible bias to the log-odds of the mean intensity of every pixel
    ///
    /// The mean is clipped to [0.001, 0.999] so that always-off or always-on pixels get a
    /// large but finite bias.
    ///
    /// # Parameters
    ///
    /// * `data` - Training examples, one per row
    pub fn init_visible_bias(&mut self, data: ArrayView2<f32>) -> Result<(), ModelError> {
        if data.ncols() != self.input_dim() {
            return Err(ModelError::InputValidationError(format!(
                "Data has {} columns, visible layer has {} units",
                data.ncols(),
                self.input_dim()
            )));
        }
        let mean = data.mean_axis(Axis(0)).ok_or_else(|| {
            ModelError::InputValidationError(
                "Cannot initialise the visible bias from an empty dataset".to_string(),
            )
        })?;
        self.biases[0] = mean.mapv(|m| logit(m.clamp(0.001, 0.999)));
        Ok(())
    }

    /// Mean of the visible bias, logged after every epoch
    pub fn mean_visible_bias(&self) -> f32 {
        self.biases[0].mean().unwrap_or(0.0)
    }

    /// Mean absolute value of every weight matrix, logged after every epoch
    pub fn mean_abs_weights(&self) -> Vec<f32> {
        self.weights
            .iter()
            .map(|w| w.mapv(f32::abs).mean().unwrap_or(0.0))
            .collect()
    }

    /// Prints a summary of the parameter tensors
    ///
    /// Displays each tensor's shape and parameter count in a tabular format
    pub fn summary(&self) {
        let col1_width = 24;
        let col2_width = 24;
        let col3_width = 15;
        println!("Model: \"gsn\"");
        println!(
            "┏{}┳{}┳{}┓",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );
        println!(
            "┃ {:<22} ┃ {:<22} ┃ {:>13} ┃",
            "Parameter", "Shape", "Param #"
        );
        println!(
            "┡{}╇{}╇{}┩",
            "━".repeat(col1_width),
            "━".repeat(col2_width),
            "━".repeat(col3_width)
        );
        for (i, w) in self.weights.iter().enumerate() {
            println!(
                "│ {:<22} │ {:<22} │ {:>13} │",
                format!("W_{}", i),
                format!("{:?}", w.dim()),
                w.len()
            );
        }
        for (i, b) in self.biases.iter().enumerate() {
            println!(
                "│ {:<22} │ {:<22} │ {:>13} │",
                format!("b_{}", i),
                format!("({},)", b.len()),
                b.len()
            );
        }
        println!(
            "└{}┴{}┴{}┘",
            "─".repeat(col1_width),
            "─".repeat(col2_width),
            "─".repeat(col3_width)
        );
        let total = self.param_count();
        println!(" Total params: {} ({} B)", total, total * 4);
    }
}
