use gsn_inpaint::config::{ChainLoss, HiddenActivation, NoiseConfig};
use gsn_inpaint::neural_network::{
    GradientTape, LayerUpdateEngine, NetworkState, ParameterStore, ReconstructionChain,
    WalkbackPropagator, walkback_cost,
};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn toy_input() -> Array2<f32> {
    Array2::from_shape_fn((4, 12), |(i, j)| ((i + j) % 3 == 0) as u8 as f32)
}

#[test]
fn test_walkback_chain_length() {
    let mut rng = StdRng::seed_from_u64(1);
    let params = ParameterStore::new(&[12, 8, 6, 4], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    for steps in [1, 4, 7] {
        let mut state = NetworkState::with_visible(&params, toy_input()).unwrap();
        let chain = propagator.walkback(&mut state, steps, true, &mut rng).unwrap();
        assert_eq!(chain.len(), steps);
        assert!(chain.iter().all(|p| p.dim() == (4, 12)));
        assert!(
            chain
                .iter()
                .all(|p| p.iter().all(|&v| (0.0..=1.0).contains(&v)))
        );
    }
}

#[test]
fn test_propagate_appends_one_entry_per_sweep() {
    let mut rng = StdRng::seed_from_u64(2);
    let params = ParameterStore::new(&[12, 8, 8], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Sigmoid, &noise));

    let mut state = NetworkState::with_visible(&params, toy_input()).unwrap();
    let mut chain = ReconstructionChain::new();
    for expected in 1..=3 {
        propagator
            .propagate(&mut state, &mut chain, true, &mut rng)
            .unwrap();
        assert_eq!(chain.len(), expected);
    }
    // hidden layers were written by the sweeps
    assert!(state.layer(1).iter().any(|&v| v != 0.0));
    assert!(state.layer(2).iter().any(|&v| v != 0.0));
}

#[test]
fn test_noiseless_walkback_is_bit_identical() {
    let mut rng = StdRng::seed_from_u64(3);
    let params = ParameterStore::new(&[12, 10, 10, 10], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let mut state_a = NetworkState::with_visible(&params, toy_input()).unwrap();
    let mut state_b = NetworkState::with_visible(&params, toy_input()).unwrap();
    let chain_a = propagator
        .walkback(&mut state_a, 5, false, &mut StdRng::seed_from_u64(10))
        .unwrap();
    let chain_b = propagator
        .walkback(&mut state_b, 5, false, &mut StdRng::seed_from_u64(99))
        .unwrap();

    assert_eq!(chain_a, chain_b);
    assert_eq!(state_a, state_b);
}

#[test]
fn test_noisy_walkback_differs_between_seeds() {
    let mut rng = StdRng::seed_from_u64(4);
    let params = ParameterStore::new(&[12, 10, 10], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let mut state_a = NetworkState::with_visible(&params, toy_input()).unwrap();
    let mut state_b = NetworkState::with_visible(&params, toy_input()).unwrap();
    let chain_a = propagator
        .walkback(&mut state_a, 3, true, &mut StdRng::seed_from_u64(10))
        .unwrap();
    let chain_b = propagator
        .walkback(&mut state_b, 3, true, &mut StdRng::seed_from_u64(11))
        .unwrap();

    assert_ne!(chain_a.last(), chain_b.last());
}

#[test]
fn test_traced_walkback_records_every_update() {
    let mut rng = StdRng::seed_from_u64(5);
    let params = ParameterStore::new(&[12, 8, 8, 8], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let mut state = NetworkState::with_visible(&params, toy_input()).unwrap();
    let mut tape = GradientTape::new();
    let chain = propagator
        .walkback_traced(&mut state, 4, true, &mut rng, &mut tape)
        .unwrap();

    // 4 layers updated per sweep: 1, 3, then 0, 2
    assert_eq!(tape.len(), 16);
    assert_eq!(tape.chain_len(), chain.len());
    let order: Vec<usize> = tape.traces()[..4].iter().map(|t| t.layer()).collect();
    assert_eq!(order, vec![1, 3, 0, 2]);
}

#[test]
fn test_reconstruct_returns_last_noiseless_entry() {
    let mut rng = StdRng::seed_from_u64(6);
    let params = ParameterStore::new(&[12, 8, 8], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let input = toy_input();
    let reconstruction = propagator.reconstruct(input.view(), 3).unwrap();

    let mut state = NetworkState::with_visible(&params, input.clone()).unwrap();
    let chain = propagator.walkback(&mut state, 3, false, &mut rng).unwrap();
    assert_eq!(Some(&reconstruction), chain.last());

    // no salt-and-pepper between sweeps even though the noise process uses it
    assert!(noise.input_salt_and_pepper > 0.0);
    assert_eq!(propagator.reconstruct(input.view(), 3).unwrap(), reconstruction);

    assert!(propagator.reconstruct(input.view(), 0).is_err());
}

#[test]
fn test_walkback_cost_sum_and_mean() {
    let mut rng = StdRng::seed_from_u64(7);
    let params = ParameterStore::new(&[12, 8, 8], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let propagator =
        WalkbackPropagator::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let input = toy_input();
    let mut state = NetworkState::with_visible(&params, input.clone()).unwrap();
    let chain = propagator.walkback(&mut state, 4, true, &mut rng).unwrap();

    let sum = walkback_cost(&chain, input.view(), ChainLoss::Sum).unwrap();
    let mean = walkback_cost(&chain, input.view(), ChainLoss::Mean).unwrap();

    assert_eq!(sum.step_costs.len(), 4);
    assert!(sum.is_finite());
    assert!(sum.step_costs.iter().all(|&c| c >= 0.0));
    let total: f32 = sum.step_costs.iter().sum();
    assert!((sum.total - total).abs() < 1e-5);
    assert!((mean.total - total / 4.0).abs() < 1e-5);
    assert_eq!(sum.final_step(), sum.step_costs[3]);

    assert!(walkback_cost(&ReconstructionChain::new(), input.view(), ChainLoss::Sum).is_err());
}
