use approx::assert_abs_diff_eq;
use gsn_inpaint::neural_network::{MomentumSGD, ParameterGradients, ParameterStore};
use ndarray::{Array1, Array2, array};

fn zero_store() -> ParameterStore {
    ParameterStore::from_parts(
        &[2, 1],
        vec![Array2::zeros((2, 1))],
        vec![Array1::zeros(2), Array1::zeros(1)],
    )
    .unwrap()
}

fn unit_gradients(params: &ParameterStore) -> ParameterGradients {
    let mut grads = ParameterGradients::zeros_like(params);
    grads.weights.iter_mut().for_each(|g| g.fill(1.0));
    grads.biases.iter_mut().for_each(|g| g.fill(1.0));
    grads
}

#[test]
fn test_momentum_sgd_new() {
    // Valid parameters
    assert!(MomentumSGD::new(0.25, 0.5, 0.995).is_ok());
    assert!(MomentumSGD::new(0.25, 0.0, 1.0).is_ok());

    // Invalid learning rate
    assert!(MomentumSGD::new(0.0, 0.5, 0.995).is_err());
    assert!(MomentumSGD::new(-0.1, 0.5, 0.995).is_err());
    assert!(MomentumSGD::new(f32::INFINITY, 0.5, 0.995).is_err());

    // Invalid momentum
    assert!(MomentumSGD::new(0.25, 1.0, 0.995).is_err());
    assert!(MomentumSGD::new(0.25, -0.1, 0.995).is_err());

    // Invalid annealing
    assert!(MomentumSGD::new(0.25, 0.5, 0.0).is_err());
    assert!(MomentumSGD::new(0.25, 0.5, 1.01).is_err());
    assert!(MomentumSGD::new(0.25, 0.5, f32::NAN).is_err());
}

#[test]
fn test_momentum_sgd_step_formula() {
    let mut params = zero_store();
    let grads = unit_gradients(&params);
    let mut optimizer = MomentumSGD::new(0.1, 0.5, 1.0).unwrap();

    // buffer = 0.5 * 0 + 0.5 * 1 = 0.5, w = -0.1 * 0.5
    optimizer.step(&mut params, &grads).unwrap();
    assert_abs_diff_eq!(params.weights()[0][[0, 0]], -0.05, epsilon = 1e-6);
    assert_abs_diff_eq!(optimizer.weight_buffers()[0][[1, 0]], 0.5, epsilon = 1e-6);

    // buffer = 0.5 * 0.5 + 0.5 * 1 = 0.75, w = -0.05 - 0.075
    optimizer.step(&mut params, &grads).unwrap();
    assert_abs_diff_eq!(params.weights()[0][[1, 0]], -0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(params.biases()[0][1], -0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(params.biases()[1][0], -0.125, epsilon = 1e-6);
    assert_abs_diff_eq!(optimizer.bias_buffers()[1][0], 0.75, epsilon = 1e-6);
}

#[test]
fn test_zero_momentum_is_plain_sgd() {
    let weights = vec![array![[1.0f32], [2.0]]];
    let biases = vec![array![0.0f32, 0.0], array![0.5f32]];
    let mut params = ParameterStore::from_parts(&[2, 1], weights, biases).unwrap();
    let mut grads = ParameterGradients::zeros_like(&params);
    grads.weights[0] = array![[2.0f32], [-4.0]];

    let mut optimizer = MomentumSGD::new(0.5, 0.0, 1.0).unwrap();
    optimizer.step(&mut params, &grads).unwrap();

    assert_abs_diff_eq!(params.weights()[0][[0, 0]], 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(params.weights()[0][[1, 0]], 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(params.biases()[1][0], 0.5, epsilon = 1e-6);
}

#[test]
fn test_anneal_and_reset() {
    let mut params = zero_store();
    let grads = unit_gradients(&params);
    let mut optimizer = MomentumSGD::new(0.25, 0.5, 0.5).unwrap();

    optimizer.anneal();
    assert_abs_diff_eq!(optimizer.learning_rate(), 0.125, epsilon = 1e-7);
    optimizer.anneal();
    assert_abs_diff_eq!(optimizer.learning_rate(), 0.0625, epsilon = 1e-7);

    optimizer.step(&mut params, &grads).unwrap();
    assert_eq!(optimizer.weight_buffers().len(), 1);
    assert_eq!(optimizer.bias_buffers().len(), 2);

    optimizer.reset();
    assert_abs_diff_eq!(optimizer.learning_rate(), 0.25, epsilon = 1e-7);
    assert!(optimizer.weight_buffers().is_empty());
    assert!(optimizer.bias_buffers().is_empty());
    assert_abs_diff_eq!(optimizer.momentum(), 0.5, epsilon = 1e-7);
}

#[test]
fn test_step_rejects_mismatched_gradients() {
    let mut params = zero_store();
    let mut optimizer = MomentumSGD::new(0.1, 0.5, 1.0).unwrap();

    let mut wrong_shape = ParameterGradients::zeros_like(&params);
    wrong_shape.weights[0] = Array2::zeros((1, 2));
    assert!(optimizer.step(&mut params, &wrong_shape).is_err());

    let mut missing_bias = ParameterGradients::zeros_like(&params);
    missing_bias.biases.pop();
    assert!(optimizer.step(&mut params, &missing_bias).is_err());

    // parameters are untouched by a rejected step
    assert!(params.weights()[0].iter().all(|&w| w == 0.0));
}
