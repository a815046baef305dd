use crate::config::HiddenActivation;
use crate::math::sigmoid;
use ndarray::{Array2, Zip};

impl HiddenActivation {
    /// Forward application of the activation function
    ///
    /// # Parameters
    ///
    /// * `z` - Pre-activation tensor
    ///
    /// # Returns
    /// * `Array2<f32>` - A new tensor with the activation function applied
    pub fn apply(&self, z: &Array2<f32>) -> Array2<f32> {
        let mut result = z.clone();
        match self {
            HiddenActivation::Rectifier => {
                result.par_mapv_inplace(|x| if x > 0.0 { x } else { 0.0 });
            }
            HiddenActivation::Sigmoid => {
                result.par_mapv_inplace(sigmoid);
            }
            HiddenActivation::Tanh => {
                result.par_mapv_inplace(|x| x.tanh());
            }
        }
        result
    }

    /// Computes the derivative of the activation from its output
    ///
    /// # Parameters
    ///
    /// * `activation_output` - The output after the activation function has been applied
    ///
    /// # Returns
    /// * `Array2<f32>` - Element-wise `f'(z)`
    pub fn derivative(&self, activation_output: &Array2<f32>) -> Array2<f32> {
        match self {
            HiddenActivation::Rectifier => {
                activation_output.mapv(|a| if a > 0.0 { 1.0 } else { 0.0 })
            }
            HiddenActivation::Sigmoid => activation_output.mapv(|a| a * (1.0 - a)),
            HiddenActivation::Tanh => activation_output.mapv(|a| 1.0 - a * a),
        }
    }
}

/// Sigmoid of the visible layer's pre-activation.
pub fn visible_sigmoid(z: &Array2<f32>) -> Array2<f32> {
    let mut result = z.clone();
    result.par_mapv_inplace(sigmoid);
    result
}

/// Multiplies an upstream gradient by `p * (1 - p)` in place.
pub(crate) fn sigmoid_backward_inplace(grad: &mut Array2<f32>, probability: &Array2<f32>) {
    Zip::from(grad)
        .and(probability)
        .par_for_each(|g, &p| *g *= p * (1.0 - p));
}
