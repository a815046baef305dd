use crate::error::ModelError;
use crate::neural_network::backprop::ParameterGradients;
use crate::neural_network::parameters::ParameterStore;
use ndarray::{Array1, Array2, Zip};

/// Stochastic gradient descent with an exponential moving average of gradients and a
/// per-epoch annealed learning rate.
///
/// For every parameter `θ` with gradient `g`:
///
/// ```text
/// buffer ← momentum · buffer + (1 − momentum) · g
/// θ      ← θ − learning_rate · buffer
/// ```
///
/// and `learning_rate ← learning_rate · annealing` once per epoch.
///
/// # Fields
///
/// - `learning_rate` - Current step size
/// - `initial_learning_rate` - Step size before any annealing
/// - `momentum` - Smoothing factor of the gradient buffer
/// - `annealing` - Per-epoch multiplicative decay
/// - `weight_buffers` / `bias_buffers` - Gradient moving averages, created on first use
#[derive(Debug, Clone)]
pub struct MomentumSGD {
    learning_rate: f32,
    initial_learning_rate: f32,
    momentum: f32,
    annealing: f32,
    weight_buffers: Vec<Array2<f32>>,
    bias_buffers: Vec<Array1<f32>>,
}

impl MomentumSGD {
    /// Creates a new optimizer
    ///
    /// # Parameters
    ///
    /// - `learning_rate` - Positive initial step size
    /// - `momentum` - Smoothing factor in [0, 1)
    /// - `annealing` - Per-epoch decay in (0, 1]
    ///
    /// # Returns
    ///
    /// - `Ok(MomentumSGD)` - The optimizer with empty buffers
    /// - `Err(ModelError::InputValidationError)` - If a parameter is out of range
    pub fn new(learning_rate: f32, momentum: f32, annealing: f32) -> Result<Self, ModelError> {
        if !learning_rate.is_finite() || learning_rate <= 0.0 {
            return Err(ModelError::InputValidationError(format!(
                "learning rate must be positive and finite, got {}",
                learning_rate
            )));
        }
        if !(0.0..1.0).contains(&momentum) {
            return Err(ModelError::InputValidationError(format!(
                "momentum must be in [0, 1), got {}",
                momentum
            )));
        }
        if !(0.0..=1.0).contains(&annealing) || annealing == 0.0 {
            return Err(ModelError::InputValidationError(format!(
                "annealing must be in (0, 1], got {}",
                annealing
            )));
        }

        Ok(Self {
            learning_rate,
            initial_learning_rate: learning_rate,
            momentum,
            annealing,
            weight_buffers: Vec::new(),
            bias_buffers: Vec::new(),
        })
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn weight_buffers(&self) -> &[Array2<f32>] {
        &self.weight_buffers
    }

    pub fn bias_buffers(&self) -> &[Array1<f32>] {
        &self.bias_buffers
    }

    fn ensure_buffers(&mut self, params: &ParameterStore) {
        let matches = self.weight_buffers.len() == params.weights().len()
            && self
                .weight_buffers
                .iter()
                .zip(params.weights())
                .all(|(b, w)| b.dim() == w.dim())
            && self.bias_buffers.len() == params.biases().len()
            && self
                .bias_buffers
                .iter()
                .zip(params.biases())
                .all(|(b, p)| b.len() == p.len());

        if !matches {
            self.weight_buffers = params
                .weights()
                .iter()
                .map(|w| Array2::zeros(w.raw_dim()))
                .collect();
            self.bias_buffers = params
                .biases()
                .iter()
                .map(|b| Array1::zeros(b.raw_dim()))
                .collect();
        }
    }

    /// Applies one momentum update to every parameter
    ///
    /// # Parameters
    ///
    /// - `params` - Parameters to update in place
    /// - `grads` - Gradients of the full batch objective, shaped like `params`
    ///
    /// # Returns
    ///
    /// - `Ok(())` - All parameters updated
    /// - `Err(ModelError::InputValidationError)` - If the gradients do not match the parameters
    pub fn step(
        &mut self,
        params: &mut ParameterStore,
        grads: &ParameterGradients,
    ) -> Result<(), ModelError> {
        if grads.weights.len() != params.weights().len()
            || grads.biases.len() != params.biases().len()
        {
            return Err(ModelError::InputValidationError(format!(
                "Gradient count ({} weights, {} biases) does not match parameters ({}, {})",
                grads.weights.len(),
                grads.biases.len(),
                params.weights().len(),
                params.biases().len()
            )));
        }
        for (g, w) in grads.weights.iter().zip(params.weights()) {
            if g.dim() != w.dim() {
                return Err(ModelError::InputValidationError(format!(
                    "Weight gradient shape {:?} does not match parameter shape {:?}",
                    g.dim(),
                    w.dim()
                )));
            }
        }
        for (g, b) in grads.biases.iter().zip(params.biases()) {
            if g.len() != b.len() {
                return Err(ModelError::InputValidationError(format!(
                    "Bias gradient length {} does not match parameter length {}",
                    g.len(),
                    b.len()
                )));
            }
        }

        self.ensure_buffers(params);

        let (lr, momentum) = (self.learning_rate, self.momentum);
        let (weights, biases) = params.parameters_mut();
        let weight_buffers = &mut self.weight_buffers;
        let bias_buffers = &mut self.bias_buffers;

        rayon::join(
            || {
                for ((w, buffer), g) in weights
                    .iter_mut()
                    .zip(weight_buffers.iter_mut())
                    .zip(&grads.weights)
                {
                    Zip::from(w).and(buffer).and(g).par_for_each(|w, m, &g| {
                        *m = momentum * *m + (1.0 - momentum) * g;
                        *w -= lr * *m;
                    });
                }
            },
            || {
                for ((b, buffer), g) in biases
                    .iter_mut()
                    .zip(bias_buffers.iter_mut())
                    .zip(&grads.biases)
                {
                    Zip::from(b).and(buffer).and(g).for_each(|b, m, &g| {
                        *m = momentum * *m + (1.0 - momentum) * g;
                        *b -= lr * *m;
                    });
                }
            },
        );

        Ok(())
    }

    /// Decays the learning rate by the annealing factor; called once per epoch
    pub fn anneal(&mut self) {
        self.learning_rate *= self.annealing;
    }

    /// Restores the initial learning rate and clears the gradient buffers
    pub fn reset(&mut self) {
        self.learning_rate = self.initial_learning_rate;
        self.weight_buffers.clear();
        self.bias_buffers.clear();
    }
}
