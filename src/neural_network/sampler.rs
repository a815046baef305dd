use crate::error::ModelError;
use crate::neural_network::layer_update::{LayerUpdateEngine, NetworkState};
use crate::neural_network::noise::salt_and_pepper;
use crate::neural_network::walkback::{ReconstructionChain, WalkbackPropagator};
use ndarray::{Array2, ArrayView2};
use rand::Rng;

/// Images visited by a sampling run.
///
/// # Fields
///
/// - `visible_chain` - The clean seed followed by the probability map of every sweep
/// - `noisy_states` - The visible layer of the network after every sweep (sampled and corrupted)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTrajectory {
    pub visible_chain: Vec<Array2<f32>>,
    pub noisy_states: Vec<Array2<f32>>,
}

impl SampleTrajectory {
    pub fn len(&self) -> usize {
        self.visible_chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_chain.is_empty()
    }

    /// Stacks the visible chain into one `(len * batch, input_dim)` matrix for tiling
    pub fn stacked(&self) -> Result<Array2<f32>, ModelError> {
        let views: Vec<ArrayView2<f32>> = self.visible_chain.iter().map(|a| a.view()).collect();
        ndarray::concatenate(ndarray::Axis(0), &views).map_err(|e| {
            ModelError::ProcessingError(format!("Cannot stack sampled images: {}", e))
        })
    }
}

/// Generates a Markov chain of samples from a trained network.
///
/// The chain starts from a real example: the network state is initialised with a
/// salt-and-pepper corrupted copy of the seed and then runs one noisy sweep per step,
/// keeping the full state (hidden layers included) across steps.
#[derive(Debug, Clone, Copy)]
pub struct Sampler<'a> {
    propagator: WalkbackPropagator<'a>,
}

impl<'a> Sampler<'a> {
    pub fn new(engine: LayerUpdateEngine<'a>) -> Self {
        Self {
            propagator: WalkbackPropagator::new(engine),
        }
    }

    /// Runs the sampling chain
    ///
    /// # Parameters
    ///
    /// - `seed` - Starting example(s), `(batch, input_dim)`
    /// - `n_steps` - Number of images in the trajectory, the seed included
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(SampleTrajectory)` - `n_steps` images, the first one being `seed`
    /// - `Err(ModelError)` - If `n_steps` is 0 or `seed` does not fit the network
    pub fn sample<R: Rng + ?Sized>(
        &self,
        seed: ArrayView2<f32>,
        n_steps: usize,
        rng: &mut R,
    ) -> Result<SampleTrajectory, ModelError> {
        if n_steps == 0 {
            return Err(ModelError::InputValidationError(
                "Sampling needs at least one step".to_string(),
            ));
        }

        let engine = self.propagator.engine();
        let rate = engine.noise().input_salt_and_pepper;
        let corrupted = salt_and_pepper(&seed.to_owned(), rate, rng)?;
        let mut state = NetworkState::with_visible(engine.params(), corrupted.corrupted)?;

        let mut visible_chain = Vec::with_capacity(n_steps);
        let mut noisy_states = Vec::with_capacity(n_steps);
        visible_chain.push(seed.to_owned());
        noisy_states.push(state.visible().clone());

        let mut chain = ReconstructionChain::new();
        for _ in 1..n_steps {
            self.propagator.propagate(&mut state, &mut chain, true, rng)?;
            let probability = chain.last().cloned().ok_or_else(|| {
                ModelError::ProcessingError("Sweep did not update the visible layer".to_string())
            })?;
            visible_chain.push(probability);
            noisy_states.push(state.visible().clone());
        }

        log::debug!("sampled {} images", visible_chain.len());
        Ok(SampleTrajectory {
            visible_chain,
            noisy_states,
        })
    }
}
