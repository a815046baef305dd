use gsn_inpaint::config::{ChainLoss, DatasetKind, GsnConfig, HiddenActivation, load_config};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_default_config() {
    let config = GsnConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.network.hidden_layers, 2);
    assert_eq!(config.network.walkbacks, 4);
    assert_eq!(config.network.hidden_size, 1500);
    assert_eq!(config.network.activation, HiddenActivation::Tanh);
    assert_eq!(config.noise.input_salt_and_pepper, 0.4);
    assert_eq!(config.noise.hidden_add_noise_sigma, 2.0);
    assert_eq!(config.training.learning_rate, 0.25);
    assert_eq!(config.training.momentum, 0.5);
    assert_eq!(config.training.annealing, 0.995);
    assert_eq!(config.training.batch_size, 100);
    assert_eq!(config.training.chain_loss, ChainLoss::Sum);
    assert_eq!(config.experiment.dataset, DatasetKind::Mnist);

    assert_eq!(config.layer_sizes(784), vec![784, 1500, 1500]);
}

#[test]
fn test_parse_enums() {
    assert_eq!("tanh".parse::<HiddenActivation>().unwrap(), HiddenActivation::Tanh);
    assert_eq!("ReLU".parse::<HiddenActivation>().unwrap(), HiddenActivation::Rectifier);
    assert_eq!("sigmoid".parse::<HiddenActivation>().unwrap(), HiddenActivation::Sigmoid);
    assert!("softmax".parse::<HiddenActivation>().is_err());

    assert_eq!("mean".parse::<ChainLoss>().unwrap(), ChainLoss::Mean);
    assert!("max".parse::<ChainLoss>().is_err());

    assert_eq!("mnist_binary".parse::<DatasetKind>().unwrap(), DatasetKind::MnistBinary);
    assert!("cifar".parse::<DatasetKind>().is_err());

    assert_eq!(HiddenActivation::Rectifier.to_string(), "rectifier");
}

#[test]
fn test_validate_rejects_out_of_range_values() {
    let cases: Vec<Box<dyn Fn(&mut GsnConfig)>> = vec![
        Box::new(|c| c.network.hidden_layers = 0),
        Box::new(|c| c.network.walkbacks = 0),
        Box::new(|c| c.network.hidden_size = 0),
        Box::new(|c| c.noise.input_salt_and_pepper = 1.2),
        Box::new(|c| c.noise.hidden_add_noise_sigma = -0.5),
        Box::new(|c| c.training.learning_rate = 0.0),
        Box::new(|c| c.training.annealing = 0.0),
        Box::new(|c| c.training.momentum = 1.0),
        Box::new(|c| c.training.batch_size = 0),
        Box::new(|c| c.training.checkpoint_interval = 0),
        Box::new(|c| c.experiment.inpaint_steps = 0),
        Box::new(|c| c.experiment.sample_steps = 0),
    ];

    for (i, edit) in cases.iter().enumerate() {
        let mut config = GsnConfig::default();
        edit(&mut config);
        assert!(config.validate().is_err(), "case {} should be rejected", i);
    }
}

#[test]
fn test_partial_json_uses_defaults() {
    let json = r#"{
        "network": { "hidden_layers": 3, "activation": "sigmoid" },
        "training": { "chain_loss": "mean", "n_epoch": 7 },
        "experiment": { "dataset": "mnist_binary", "missing_data_dir": "holes" }
    }"#;
    let config: GsnConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.network.hidden_layers, 3);
    assert_eq!(config.network.activation, HiddenActivation::Sigmoid);
    assert_eq!(config.network.walkbacks, 4);
    assert_eq!(config.training.chain_loss, ChainLoss::Mean);
    assert_eq!(config.training.n_epoch, 7);
    assert_eq!(config.training.batch_size, 100);
    assert_eq!(config.experiment.dataset, DatasetKind::MnistBinary);
    assert_eq!(
        config.experiment.missing_data_dir.as_deref(),
        Some(std::path::Path::new("holes"))
    );
}

#[test]
fn test_save_and_load_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.json");

    let mut config = GsnConfig::default();
    config.network.hidden_size = 400;
    config.training.seed = 42;
    config.save_to_path(&path).unwrap();

    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_config_errors() {
    let dir = tempdir().unwrap();
    assert!(load_config(dir.path().join("absent.json")).is_err());

    let path = dir.path().join("bad.json");
    fs::write(&path, r#"{ "network": { "activation": "softmax" } }"#).unwrap();
    assert!(load_config(&path).is_err());
}
