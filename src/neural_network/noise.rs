//! Noise injection for the GSN.
//!
//! Every function takes its randomness from an explicit generator so that a seeded
//! run is reproducible. Rates and standard deviations are validated by the caller's
//! configuration; the functions here only guard against values that would make the
//! underlying distributions invalid.

use crate::error::ModelError;
use ndarray::Array2;
use rand::Rng;
use rand::seq::index;
use rand_distr::{Distribution, Normal};

/// Result of a salt-and-pepper corruption.
///
/// # Fields
///
/// - `corrupted` - The input with the selected entries replaced by 0 or 1
/// - `keep_mask` - 1.0 where the input value was kept, 0.0 where it was replaced
#[derive(Debug, Clone)]
pub struct SaltAndPepper {
    pub corrupted: Array2<f32>,
    pub keep_mask: Array2<f32>,
}

/// Replaces a fraction `rate` of the entries of `input` by 0 or 1.
///
/// Exactly `floor(P * rate)` distinct positions are drawn uniformly from the `P`
/// entries; the first half of them (rounded down) is set to 0 ("pepper") and the
/// rest to 1 ("salt"). All other entries are left unchanged.
///
/// # Parameters
///
/// - `input` - Tensor to corrupt
/// - `rate` - Fraction of entries to replace, in [0, 1]
/// - `rng` - Random generator
///
/// # Returns
///
/// - `Ok(SaltAndPepper)` - Corrupted tensor and the mask of untouched entries
/// - `Err(ModelError::InputValidationError)` - If `rate` is outside [0, 1]
///
/// # Example
/// ```rust
/// use gsn_inpaint::neural_network::noise::salt_and_pepper;
/// use ndarray::Array2;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let mut rng = StdRng::seed_from_u64(7);
/// let input = Array2::from_elem((4, 25), 0.5f32);
/// let noisy = salt_and_pepper(&input, 0.2, &mut rng).unwrap();
/// assert_eq!(noisy.corrupted.iter().filter(|&&v| v == 0.0).count(), 10);
/// assert_eq!(noisy.corrupted.iter().filter(|&&v| v == 1.0).count(), 10);
/// ```
pub fn salt_and_pepper<R: Rng + ?Sized>(
    input: &Array2<f32>,
    rate: f32,
    rng: &mut R,
) -> Result<SaltAndPepper, ModelError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(ModelError::InputValidationError(format!(
            "Salt-and-pepper rate must be between 0 and 1, got {}",
            rate
        )));
    }

    let total = input.len();
    let ncols = input.ncols();
    let mut corrupted = input.to_owned();
    let mut keep_mask = Array2::<f32>::ones(input.raw_dim());

    let selected = (total as f64 * rate as f64).floor() as usize;
    if selected == 0 || ncols == 0 {
        return Ok(SaltAndPepper {
            corrupted,
            keep_mask,
        });
    }

    let n_pepper = selected / 2;
    for (k, flat) in index::sample(rng, total, selected).iter().enumerate() {
        let position = [flat / ncols, flat % ncols];
        corrupted[position] = if k < n_pepper { 0.0 } else { 1.0 };
        keep_mask[position] = 0.0;
    }

    Ok(SaltAndPepper {
        corrupted,
        keep_mask,
    })
}

/// Adds independent zero-mean Gaussian noise with standard deviation `std`.
///
/// # Parameters
///
/// - `input` - Tensor to perturb
/// - `std` - Standard deviation, must be finite and non-negative
/// - `rng` - Random generator
///
/// # Returns
///
/// * `Result<Array2<f32>, ModelError>` - `input + noise`
pub fn add_gaussian_noise<R: Rng + ?Sized>(
    input: &Array2<f32>,
    std: f32,
    rng: &mut R,
) -> Result<Array2<f32>, ModelError> {
    if std == 0.0 {
        return Ok(input.to_owned());
    }

    let normal = Normal::new(0.0f32, std).map_err(|e| {
        ModelError::InputValidationError(format!("Invalid Gaussian noise std {}: {}", std, e))
    })?;
    let noise = Array2::from_shape_simple_fn(input.raw_dim(), || normal.sample(rng));

    Ok(input + &noise)
}

/// Draws one Bernoulli sample per entry, using the entry as success probability.
///
/// # Parameters
///
/// - `probabilities` - Success probabilities in [0, 1]
/// - `rng` - Random generator
///
/// # Returns
///
/// * `Array2<f32>` - A tensor of 0.0 / 1.0 values
pub fn bernoulli_sample<R: Rng + ?Sized>(probabilities: &Array2<f32>, rng: &mut R) -> Array2<f32> {
    probabilities.mapv(|p| if rng.random::<f32>() < p { 1.0 } else { 0.0 })
}

/// Bernoulli masking: each entry is kept with probability `keep` and zeroed otherwise.
///
/// # Parameters
///
/// - `input` - Tensor to mask
/// - `keep` - Probability of keeping an entry, in [0, 1]
/// - `rng` - Random generator
///
/// # Returns
///
/// * `Result<Array2<f32>, ModelError>` - The masked tensor
pub fn corrupt_input<R: Rng + ?Sized>(
    input: &Array2<f32>,
    keep: f32,
    rng: &mut R,
) -> Result<Array2<f32>, ModelError> {
    if !(0.0..=1.0).contains(&keep) {
        return Err(ModelError::InputValidationError(format!(
            "Keep probability must be between 0 and 1, got {}",
            keep
        )));
    }
    Ok(input.mapv(|x| if rng.random::<f32>() < keep { x } else { 0.0 }))
}

/// Inverted dropout: entries are kept with probability `keep` and rescaled by `1 / keep`.
///
/// # Parameters
///
/// - `input` - Tensor to drop out
/// - `keep` - Probability of keeping an entry, in (0, 1]
/// - `rng` - Random generator
///
/// # Returns
///
/// * `Result<Array2<f32>, ModelError>` - The dropped-out tensor
pub fn dropout<R: Rng + ?Sized>(
    input: &Array2<f32>,
    keep: f32,
    rng: &mut R,
) -> Result<Array2<f32>, ModelError> {
    if keep <= 0.0 || keep > 1.0 {
        return Err(ModelError::InputValidationError(format!(
            "Dropout keep probability must be in (0, 1], got {}",
            keep
        )));
    }
    let scale = 1.0 / keep;
    Ok(input.mapv(|x| {
        if rng.random::<f32>() < keep {
            x * scale
        } else {
            0.0
        }
    }))
}

/// Uniform noise in [0, 1) with the given shape.
pub fn uniform_noise<R: Rng + ?Sized>(shape: (usize, usize), rng: &mut R) -> Array2<f32> {
    Array2::from_shape_simple_fn(shape, || rng.random::<f32>())
}
