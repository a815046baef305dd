use crate::error::ModelError;
use crate::neural_network::layer_update::{LayerUpdateEngine, NetworkState};
use crate::neural_network::noise::uniform_noise;
use crate::neural_network::walkback::{ReconstructionChain, WalkbackPropagator};
use ndarray::{Array2, ArrayView1, ArrayView2, Zip};
use rand::Rng;

/// Images visited while filling in the missing pixels of a digit.
///
/// Every entry has the known pixels of the digit; the first entry has uniform noise in
/// the missing region.
#[derive(Debug, Clone, PartialEq)]
pub struct InpaintingTrajectory {
    pub images: Vec<Array2<f32>>,
}

impl InpaintingTrajectory {
    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// The last image of the trajectory, the inpainting result
    pub fn final_reconstruction(&self) -> Option<&Array2<f32>> {
        self.images.last()
    }
}

/// Overwrites the known entries (`missing == false`) of every row of `image` with `digit`
fn clamp_known(image: &mut Array2<f32>, digit: ArrayView2<f32>, missing: ArrayView1<bool>) {
    for row in image.rows_mut() {
        Zip::from(row)
            .and(digit.row(0))
            .and(missing)
            .for_each(|value, &known, &is_missing| {
                if !is_missing {
                    *value = known;
                }
            });
    }
}

/// Conditional sampler that keeps the known pixels of an image fixed.
///
/// # Example
/// ```rust
/// use gsn_inpaint::config::{HiddenActivation, NoiseConfig};
/// use gsn_inpaint::neural_network::{Inpainter, LayerUpdateEngine, ParameterStore};
/// use ndarray::{Array1, Array2};
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(5);
/// let params = ParameterStore::new(&[16, 8, 8], &mut rng).unwrap();
/// let noise = NoiseConfig::default();
/// let inpainter = Inpainter::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));
///
/// let digit = Array2::from_elem((1, 16), 1.0);
/// let missing = Array1::from_shape_fn(16, |i| i < 4);
/// let trajectory = inpainter.inpaint(digit.view(), missing.view(), 6, &mut rng).unwrap();
/// assert_eq!(trajectory.len(), 6);
/// assert!(trajectory.images.iter().all(|img| img[[0, 10]] == 1.0));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Inpainter<'a> {
    propagator: WalkbackPropagator<'a>,
}

impl<'a> Inpainter<'a> {
    pub fn new(engine: LayerUpdateEngine<'a>) -> Self {
        Self {
            propagator: WalkbackPropagator::new(engine),
        }
    }

    /// Fills in the missing pixels of `digit`
    ///
    /// # Parameters
    ///
    /// - `digit` - The image, `(1, input_dim)`; values at missing positions are ignored
    /// - `missing` - `true` where the pixel is unknown, length `input_dim`
    /// - `n_steps` - Number of images in the trajectory, the initial one included
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(InpaintingTrajectory)` - `n_steps` images of shape `(1, input_dim)`
    /// - `Err(ModelError::InputValidationError)` - Shape mismatch or `n_steps == 0`
    pub fn inpaint<R: Rng + ?Sized>(
        &self,
        digit: ArrayView2<f32>,
        missing: ArrayView1<bool>,
        n_steps: usize,
        rng: &mut R,
    ) -> Result<InpaintingTrajectory, ModelError> {
        let engine = self.propagator.engine();
        let input_dim = engine.params().input_dim();
        if digit.dim() != (1, input_dim) {
            return Err(ModelError::InputValidationError(format!(
                "Digit has shape {:?}, expected (1, {})",
                digit.dim(),
                input_dim
            )));
        }
        if missing.len() != input_dim {
            return Err(ModelError::InputValidationError(format!(
                "Mask has {} entries, expected {}",
                missing.len(),
                input_dim
            )));
        }
        if n_steps == 0 {
            return Err(ModelError::InputValidationError(
                "Inpainting needs at least one step".to_string(),
            ));
        }

        let mut initial = uniform_noise((1, input_dim), rng);
        clamp_known(&mut initial, digit, missing);
        let mut state = NetworkState::with_visible(engine.params(), initial.clone())?;

        let mut images = Vec::with_capacity(n_steps);
        images.push(initial);

        let mut chain = ReconstructionChain::new();
        for _ in 1..n_steps {
            self.propagator.propagate(&mut state, &mut chain, true, rng)?;
            clamp_known(state.visible_mut(), digit, missing);

            let mut image = chain.last().cloned().ok_or_else(|| {
                ModelError::ProcessingError("Sweep did not update the visible layer".to_string())
            })?;
            clamp_known(&mut image, digit, missing);
            images.push(image);
        }

        Ok(InpaintingTrajectory { images })
    }
}
