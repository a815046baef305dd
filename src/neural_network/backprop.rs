//! Reverse-mode gradients through recorded walkback sweeps.
//!
//! The propagator records one [`UpdateTrace`] per layer update. Walking the tape
//! backwards, the gradient of the current version of every layer is carried in a
//! per-layer accumulator; when the update that produced a layer version is reached,
//! its accumulated gradient is pushed through the nonlinearity into the parameters and
//! into the neighbouring layers that were read by that update, and the accumulator is
//! cleared (the previous version of the layer was not an input of the update).
//!
//! Gaussian noise is additive and transparent to the gradient. Salt-and-pepper
//! replacements and Bernoulli samples are treated as constants.

use crate::config::ChainLoss;
use crate::error::ModelError;
use crate::neural_network::activation::sigmoid_backward_inplace;
use crate::neural_network::layer_update::{LayerUpdate, LayerUpdateEngine, NetworkState};
use crate::neural_network::parameters::ParameterStore;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};

/// How the gradient of the new visible state flows back into the probability map.
///
/// # Variants
///
/// - `Identity` - the state is the probability map itself (noiseless update)
/// - `Masked` - salt-and-pepper kept the entries where the mask is 1.0
/// - `Blocked` - the state is a Bernoulli sample, no gradient reaches the probabilities
#[derive(Debug, Clone)]
pub enum VisiblePath {
    Identity,
    Masked(Array2<f32>),
    Blocked,
}

/// Everything the backward pass needs about one layer update.
#[derive(Debug, Clone)]
pub struct UpdateTrace {
    layer: usize,
    below: Option<Array2<f32>>,
    above: Option<Array2<f32>>,
    activation: Array2<f32>,
    visible_path: VisiblePath,
    chain_step: Option<usize>,
}

impl UpdateTrace {
    /// Captures the inputs of an update before its result replaces the layer in `state`
    pub(crate) fn capture(
        state: &NetworkState,
        layer: usize,
        update: &LayerUpdate,
        chain_step: Option<usize>,
    ) -> Self {
        let depth = state.len() - 1;
        let below = (layer > 0).then(|| state.layer(layer - 1).clone());
        let above = (layer < depth).then(|| state.layer(layer + 1).clone());

        let visible_path = match (update.sampled, &update.keep_mask) {
            (true, _) => VisiblePath::Blocked,
            (false, Some(mask)) => VisiblePath::Masked(mask.clone()),
            (false, None) => VisiblePath::Identity,
        };

        Self {
            layer,
            below,
            above,
            activation: update.activation.clone(),
            visible_path,
            chain_step,
        }
    }

    pub fn layer(&self) -> usize {
        self.layer
    }

    /// Index of the chain entry produced by this update (visible updates only)
    pub fn chain_step(&self) -> Option<usize> {
        self.chain_step
    }

    pub fn visible_path(&self) -> &VisiblePath {
        &self.visible_path
    }
}

/// Ordered record of the layer updates of one traced forward pass.
#[derive(Debug, Clone, Default)]
pub struct GradientTape {
    traces: Vec<UpdateTrace>,
}

impl GradientTape {
    pub fn new() -> Self {
        Self { traces: Vec::new() }
    }

    pub(crate) fn record(&mut self, trace: UpdateTrace) {
        self.traces.push(trace);
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    pub fn traces(&self) -> &[UpdateTrace] {
        &self.traces
    }

    /// Number of chain entries produced while recording
    pub fn chain_len(&self) -> usize {
        self.traces
            .iter()
            .filter(|trace| trace.chain_step.is_some())
            .count()
    }
}

/// Gradients of the training objective, one tensor per parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterGradients {
    pub weights: Vec<Array2<f32>>,
    pub biases: Vec<Array1<f32>>,
}

impl ParameterGradients {
    /// Zero gradients shaped like `params`
    pub fn zeros_like(params: &ParameterStore) -> Self {
        Self {
            weights: params
                .weights()
                .iter()
                .map(|w| Array2::zeros(w.raw_dim()))
                .collect(),
            biases: params
                .biases()
                .iter()
                .map(|b| Array1::zeros(b.raw_dim()))
                .collect(),
        }
    }

    /// Whether every entry is finite
    pub fn is_finite(&self) -> bool {
        self.weights
            .iter()
            .all(|w| w.iter().all(|v| v.is_finite()))
            && self.biases.iter().all(|b| b.iter().all(|v| v.is_finite()))
    }
}

fn accumulate(slot: &mut Option<Array2<f32>>, grad: Array2<f32>) {
    match slot {
        Some(existing) => *existing += &grad,
        None => *slot = Some(grad),
    }
}

/// Computes the gradient of the chain cost w.r.t. every weight and bias.
///
/// The cost is the per-step mean binary cross-entropy between each recorded visible
/// probability map and `target`, combined across steps by `chain_loss`.
///
/// # Parameters
///
/// - `engine` - The engine the tape was recorded with (parameters and activation)
/// - `tape` - Layer updates of one traced forward pass
/// - `target` - Clean input batch the chain is compared against
/// - `chain_loss` - Combination of the per-step costs
///
/// # Returns
///
/// - `Ok(ParameterGradients)` - Gradients shaped like the parameters
/// - `Err(ModelError)` - If the tape does not match the parameters or the target, or a
///   gradient is not finite
pub fn backpropagate(
    engine: &LayerUpdateEngine<'_>,
    tape: &GradientTape,
    target: ArrayView2<f32>,
    chain_loss: ChainLoss,
) -> Result<ParameterGradients, ModelError> {
    let params = engine.params();
    let depth = params.depth();
    let activation = engine.activation();

    let n_steps = tape.chain_len();
    let loss_scale = chain_loss.step_weight(n_steps) / target.len().max(1) as f32;

    let mut grads = ParameterGradients::zeros_like(params);
    let mut layer_grads: Vec<Option<Array2<f32>>> = vec![None; depth + 1];

    for trace in tape.traces().iter().rev() {
        let layer = trace.layer;
        if layer > depth {
            return Err(ModelError::ProcessingError(format!(
                "Tape references layer {} of a network with depth {}",
                layer, depth
            )));
        }
        let upstream = layer_grads[layer].take();

        let grad_z = if layer == 0 {
            let mut grad = match (&trace.visible_path, upstream) {
                (VisiblePath::Identity, Some(g)) => g,
                (VisiblePath::Masked(mask), Some(g)) => g * mask,
                _ => Array2::zeros(trace.activation.raw_dim()),
            };
            sigmoid_backward_inplace(&mut grad, &trace.activation);

            if trace.chain_step.is_some() {
                if trace.activation.dim() != target.dim() {
                    return Err(ModelError::InputValidationError(format!(
                        "Target has shape {:?}, chain entries have shape {:?}",
                        target.dim(),
                        trace.activation.dim()
                    )));
                }
                // d(mean BCE)/dz through the sigmoid is (p - x) / n
                Zip::from(&mut grad)
                    .and(&trace.activation)
                    .and(target)
                    .par_for_each(|g, &p, &x| *g += loss_scale * (p - x));
            }
            grad
        } else {
            match upstream {
                Some(g) => g * &activation.derivative(&trace.activation),
                None => continue,
            }
        };

        grads.biases[layer] += &grad_z.sum_axis(Axis(0));

        if let Some(above) = &trace.above {
            let w = &params.weights()[layer];
            grads.weights[layer] += &grad_z.t().dot(above);
            accumulate(&mut layer_grads[layer + 1], grad_z.dot(w));
        }
        if let Some(below) = &trace.below {
            let w = &params.weights()[layer - 1];
            grads.weights[layer - 1] += &below.t().dot(&grad_z);
            accumulate(&mut layer_grads[layer - 1], grad_z.dot(&w.t()));
        }
    }

    if !grads.is_finite() {
        return Err(ModelError::NumericError(
            "Gradient contains NaN or infinite values".to_string(),
        ));
    }

    Ok(grads)
}
