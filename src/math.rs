use ndarray::{ArrayBase, Data, Dimension};

/// Smallest probability used when evaluating logarithms of Bernoulli probabilities.
pub const PROBABILITY_EPSILON: f32 = 1e-7;

/// Calculates the sigmoid function value for a given input.
///
/// The sigmoid function maps any real number to the (0, 1) range and is the
/// activation of the visible layer, whose output is read as a Bernoulli
/// probability per pixel.
///
/// # Parameters
///
/// * `z` - The input value
///
/// # Returns
///
/// * `f32` - The sigmoid of `z`, i.e. `1 / (1 + e^(-z))`
///
/// # Example
/// ```rust
/// use gsn_inpaint::math::sigmoid;
///
/// assert!((sigmoid(0.0) - 0.5).abs() < 1e-7);
/// assert_eq!(sigmoid(100.0), 1.0);
/// ```
pub fn sigmoid(z: f32) -> f32 {
    // exp overflows f32 a little above 88
    const MAX_SIGMOID_INPUT: f32 = 80.0;
    const MIN_SIGMOID_INPUT: f32 = -80.0;

    if z > MAX_SIGMOID_INPUT {
        return 1.0;
    } else if z < MIN_SIGMOID_INPUT {
        return 0.0;
    }

    1.0 / (1.0 + (-z).exp())
}

/// Inverse of the sigmoid, `ln(p / (1 - p))`.
///
/// Used to initialise the visible bias from the mean pixel intensity.
///
/// # Parameters
///
/// * `p` - A probability strictly between 0 and 1
///
/// # Returns
///
/// * `f32` - The log-odds of `p`
pub fn logit(p: f32) -> f32 {
    (p / (1.0 - p)).ln()
}

/// Clamps a probability into `[PROBABILITY_EPSILON, 1 - PROBABILITY_EPSILON]`.
pub fn clip_probability(p: f32) -> f32 {
    p.clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON)
}

/// Maps every value to 1.0 when it is at least 0.5 and to 0.0 otherwise.
pub fn binarize(x: f32) -> f32 {
    if x >= 0.5 { 1.0 } else { 0.0 }
}

/// Mean binary cross-entropy between predicted probabilities and targets.
///
/// Computes `-1/n * Σ[t * ln(p) + (1 - t) * ln(1 - p)]` with `p` clipped away from
/// 0 and 1 so the logarithms stay finite.
///
/// # Parameters
///
/// - `predicted` - Predicted Bernoulli probabilities
/// - `target` - Target values in [0, 1], same shape as `predicted`
///
/// # Returns
///
/// * `f32` - The mean cross-entropy over all entries (0.0 for empty inputs)
pub fn mean_binary_cross_entropy<S1, S2, D>(
    predicted: &ArrayBase<S1, D>,
    target: &ArrayBase<S2, D>,
) -> f32
where
    S1: Data<Elem = f32>,
    S2: Data<Elem = f32>,
    D: Dimension,
{
    let n = predicted.len();
    if n == 0 {
        return 0.0;
    }

    let total: f64 = predicted
        .iter()
        .zip(target.iter())
        .map(|(&p, &t)| {
            let p = clip_probability(p);
            -(t * p.ln() + (1.0 - t) * (1.0 - p).ln()) as f64
        })
        .sum();

    (total / n as f64) as f32
}
