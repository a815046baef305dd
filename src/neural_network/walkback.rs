use crate::error::ModelError;
use crate::neural_network::backprop::{GradientTape, UpdateTrace};
use crate::neural_network::layer_update::{LayerUpdateEngine, NetworkState};
use ndarray::{Array2, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Ordered sequence of visible-layer probability maps, one per sweep.
///
/// Entries are appended by the propagator and cannot be modified afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconstructionChain {
    steps: Vec<Array2<f32>>,
}

impl ReconstructionChain {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub(crate) fn push(&mut self, probability: Array2<f32>) {
        self.steps.push(probability);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Array2<f32>> {
        self.steps.get(index)
    }

    pub fn last(&self) -> Option<&Array2<f32>> {
        self.steps.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Array2<f32>> {
        self.steps.iter()
    }

    pub fn as_slice(&self) -> &[Array2<f32>] {
        &self.steps
    }

    pub fn into_vec(self) -> Vec<Array2<f32>> {
        self.steps
    }
}

impl<'a> IntoIterator for &'a ReconstructionChain {
    type Item = &'a Array2<f32>;
    type IntoIter = std::slice::Iter<'a, Array2<f32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// Runs odd-then-even sweeps over the layers of a network state.
///
/// One sweep updates layers 1, 3, 5, ... and then layers 0, 2, 4, ..., so every
/// even layer (the visible layer included) sees the odd layers refreshed within the
/// same sweep. Every visible update appends its probability map to the chain.
///
/// # Example
/// ```rust
/// use gsn_inpaint::config::{HiddenActivation, NoiseConfig};
/// use gsn_inpaint::neural_network::{LayerUpdateEngine, NetworkState, ParameterStore, WalkbackPropagator};
/// use ndarray::Array2;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(3);
/// let params = ParameterStore::new(&[16, 8, 8], &mut rng).unwrap();
/// let noise = NoiseConfig::default();
/// let propagator = WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));
///
/// let mut state = NetworkState::with_visible(&params, Array2::from_elem((2, 16), 0.5)).unwrap();
/// let chain = propagator.walkback(&mut state, 5, true, &mut rng).unwrap();
/// assert_eq!(chain.len(), 5);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct WalkbackPropagator<'a> {
    engine: LayerUpdateEngine<'a>,
}

impl<'a> WalkbackPropagator<'a> {
    pub fn new(engine: LayerUpdateEngine<'a>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &LayerUpdateEngine<'a> {
        &self.engine
    }

    /// Performs one odd-then-even sweep
    ///
    /// # Parameters
    ///
    /// - `state` - Network state, updated in place
    /// - `chain` - Receives the visible probability map of this sweep
    /// - `noisy` - Inject the configured noise
    /// - `rng` - Random generator
    pub fn propagate<R: Rng + ?Sized>(
        &self,
        state: &mut NetworkState,
        chain: &mut ReconstructionChain,
        noisy: bool,
        rng: &mut R,
    ) -> Result<(), ModelError> {
        self.sweep(state, chain, noisy, rng, None)
    }

    /// Same as [`propagate`](Self::propagate), recording every layer update on `tape`
    pub fn propagate_traced<R: Rng + ?Sized>(
        &self,
        state: &mut NetworkState,
        chain: &mut ReconstructionChain,
        noisy: bool,
        rng: &mut R,
        tape: &mut GradientTape,
    ) -> Result<(), ModelError> {
        self.sweep(state, chain, noisy, rng, Some(tape))
    }

    /// Runs `steps` sweeps and returns the chain they produce
    ///
    /// # Returns
    ///
    /// * `Result<ReconstructionChain, ModelError>` - Exactly `steps` probability maps
    pub fn walkback<R: Rng + ?Sized>(
        &self,
        state: &mut NetworkState,
        steps: usize,
        noisy: bool,
        rng: &mut R,
    ) -> Result<ReconstructionChain, ModelError> {
        let mut chain = ReconstructionChain::new();
        for _ in 0..steps {
            self.sweep(state, &mut chain, noisy, rng, None)?;
        }
        Ok(chain)
    }

    /// Runs `steps` sweeps recording every update on `tape`
    pub fn walkback_traced<R: Rng + ?Sized>(
        &self,
        state: &mut NetworkState,
        steps: usize,
        noisy: bool,
        rng: &mut R,
        tape: &mut GradientTape,
    ) -> Result<ReconstructionChain, ModelError> {
        let mut chain = ReconstructionChain::new();
        for _ in 0..steps {
            self.sweep(state, &mut chain, noisy, rng, Some(&mut *tape))?;
        }
        Ok(chain)
    }

    /// Denoises `input` with `steps` noiseless sweeps and returns the last probability map
    ///
    /// Noiseless means no noise at all: the visible layer is not re-corrupted with
    /// salt-and-pepper between sweeps either, so the reconstruction is a deterministic
    /// function of `input`. Reconstructions that keep re-corrupting the visible layer can be
    /// built from `walkback` with a noise configuration that has `hidden_add_noise_sigma`
    /// at 0.0 and `input_sampling` off.
    ///
    /// # Parameters
    ///
    /// - `input` - Examples to reconstruct, one per row
    /// - `steps` - Number of sweeps, at least 1
    ///
    /// # Returns
    ///
    /// * `Result<Array2<f32>, ModelError>` - `p(X | ...)` after the final sweep
    pub fn reconstruct(
        &self,
        input: ArrayView2<f32>,
        steps: usize,
    ) -> Result<Array2<f32>, ModelError> {
        if steps == 0 {
            return Err(ModelError::InputValidationError(
                "Reconstruction needs at least one walkback step".to_string(),
            ));
        }
        let mut state = NetworkState::with_visible(self.engine.params(), input.to_owned())?;
        // noiseless sweeps draw no random numbers
        let mut rng = StdRng::seed_from_u64(0);
        let chain = self.walkback(&mut state, steps, false, &mut rng)?;
        chain.into_vec().pop().ok_or_else(|| {
            ModelError::ProcessingError("Walkback produced an empty chain".to_string())
        })
    }

    fn sweep<R: Rng + ?Sized>(
        &self,
        state: &mut NetworkState,
        chain: &mut ReconstructionChain,
        noisy: bool,
        rng: &mut R,
        mut tape: Option<&mut GradientTape>,
    ) -> Result<(), ModelError> {
        let depth = self.engine.depth();
        if state.len() != depth + 1 {
            return Err(ModelError::ProcessingError(format!(
                "Network state has {} layers, expected {}",
                state.len(),
                depth + 1
            )));
        }

        let order = (1..=depth).step_by(2).chain((0..=depth).step_by(2));
        for layer in order {
            let update = self
                .engine
                .update_layer(state.layers(), layer, noisy, rng)?;

            let chain_index = if layer == 0 {
                chain.push(update.activation.clone());
                Some(chain.len() - 1)
            } else {
                None
            };

            if let Some(tape) = tape.as_deref_mut() {
                tape.record(UpdateTrace::capture(state, layer, &update, chain_index));
            }

            state.replace_layer(layer, update.value);
        }

        Ok(())
    }
}
