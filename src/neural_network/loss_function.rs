use crate::config::ChainLoss;
use crate::error::ModelError;
use crate::math::mean_binary_cross_entropy;
use crate::neural_network::walkback::ReconstructionChain;
use ndarray::ArrayView2;

impl ChainLoss {
    /// Weight applied to every step's cost in a chain of `n_steps` entries
    pub fn step_weight(&self, n_steps: usize) -> f32 {
        match self {
            ChainLoss::Sum => 1.0,
            ChainLoss::Mean => 1.0 / n_steps.max(1) as f32,
        }
    }

    /// Combines per-step costs into the objective
    pub fn combine(&self, step_costs: &[f32]) -> f32 {
        let weight = self.step_weight(step_costs.len());
        step_costs.iter().map(|c| c * weight).sum()
    }
}

/// Cost of one reconstruction chain.
///
/// # Fields
///
/// - `step_costs` - Mean binary cross-entropy of every chain entry against the clean input
/// - `total` - The training objective, `step_costs` combined by the configured [`ChainLoss`]
#[derive(Debug, Clone, PartialEq)]
pub struct WalkbackCost {
    pub step_costs: Vec<f32>,
    pub total: f32,
}

impl WalkbackCost {
    /// Cost of the last chain entry, the one closest to convergence
    pub fn final_step(&self) -> f32 {
        self.step_costs.last().copied().unwrap_or(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.total.is_finite() && self.step_costs.iter().all(|c| c.is_finite())
    }
}

/// Evaluates the walkback objective of a chain
///
/// # Parameters
///
/// - `chain` - Visible probability maps of every sweep
/// - `target` - Clean input batch
/// - `chain_loss` - Combination of the per-step costs
///
/// # Returns
///
/// - `Ok(WalkbackCost)` - Per-step and combined cost
/// - `Err(ModelError::InputValidationError)` - If the chain is empty or shapes differ
pub fn walkback_cost(
    chain: &ReconstructionChain,
    target: ArrayView2<f32>,
    chain_loss: ChainLoss,
) -> Result<WalkbackCost, ModelError> {
    if chain.is_empty() {
        return Err(ModelError::InputValidationError(
            "Cannot evaluate the cost of an empty reconstruction chain".to_string(),
        ));
    }

    let mut step_costs = Vec::with_capacity(chain.len());
    for probability in chain {
        if probability.dim() != target.dim() {
            return Err(ModelError::InputValidationError(format!(
                "Chain entry has shape {:?}, target has shape {:?}",
                probability.dim(),
                target.dim()
            )));
        }
        step_costs.push(mean_binary_cross_entropy(probability, &target));
    }

    let total = chain_loss.combine(&step_costs);
    Ok(WalkbackCost { step_costs, total })
}
