use gsn_inpaint::config::{HiddenActivation, NoiseConfig};
use gsn_inpaint::neural_network::{LayerUpdateEngine, ParameterStore, Sampler};
use ndarray::Array2;
use rand::SeedableRng;
use rand::rngs::StdRng;

fn seed_digit() -> Array2<f32> {
    Array2::from_shape_fn((1, 36), |(_, j)| (j % 6 > 1 && j % 6 < 4) as u8 as f32)
}

#[test]
fn test_sample_trajectory_length_and_seed() {
    let mut rng = StdRng::seed_from_u64(3);
    let params = ParameterStore::new(&[36, 20, 20], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let sampler = Sampler::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let seed = seed_digit();
    let trajectory = sampler.sample(seed.view(), 10, &mut rng).unwrap();

    assert_eq!(trajectory.len(), 10);
    assert_eq!(trajectory.noisy_states.len(), 10);
    assert_eq!(trajectory.visible_chain[0], seed);
    assert!(trajectory.visible_chain.iter().all(|img| img.dim() == (1, 36)));
    assert!(
        trajectory.visible_chain[1..]
            .iter()
            .all(|img| img.iter().all(|&p| (0.0..=1.0).contains(&p)))
    );
}

#[test]
fn test_sample_chain_keeps_moving() {
    let mut rng = StdRng::seed_from_u64(4);
    let params = ParameterStore::new(&[36, 20, 20], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let sampler = Sampler::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    let trajectory = sampler.sample(seed_digit().view(), 10, &mut rng).unwrap();
    for pair in trajectory.noisy_states.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    // noisy visible states are binary after sampling and salt-and-pepper
    assert!(
        trajectory.noisy_states[1..]
            .iter()
            .all(|img| img.iter().all(|&v| v == 0.0 || v == 1.0))
    );
}

#[test]
fn test_sample_stacked_and_single_step() {
    let mut rng = StdRng::seed_from_u64(5);
    let params = ParameterStore::new(&[36, 12], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let sampler = Sampler::new(LayerUpdateEngine::new(&params, HiddenActivation::Sigmoid, &noise));

    let seeds = Array2::from_elem((2, 36), 0.5f32);
    let trajectory = sampler.sample(seeds.view(), 4, &mut rng).unwrap();
    assert_eq!(trajectory.stacked().unwrap().dim(), (8, 36));

    let single = sampler.sample(seeds.view(), 1, &mut rng).unwrap();
    assert_eq!(single.len(), 1);
    assert_eq!(single.visible_chain[0], seeds);
}

#[test]
fn test_sample_rejects_bad_input() {
    let mut rng = StdRng::seed_from_u64(6);
    let params = ParameterStore::new(&[36, 12], &mut rng).unwrap();
    let noise = NoiseConfig::default();
    let sampler = Sampler::new(LayerUpdateEngine::new(&params, HiddenActivation::Tanh, &noise));

    assert!(sampler.sample(seed_digit().view(), 0, &mut rng).is_err());
    let wrong = Array2::<f32>::zeros((1, 35));
    assert!(sampler.sample(wrong.view(), 5, &mut rng).is_err());
}
