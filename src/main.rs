use anyhow::{Context, Result};
use clap::Parser;
use gsn_inpaint::config::{ChainLoss, DatasetKind, GsnConfig, HiddenActivation, load_config};
use gsn_inpaint::experiment::run_experiment;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gsn_inpaint")]
#[command(about = "Train a Generative Stochastic Network on MNIST, sample from it and inpaint digits")]
#[command(version)]
struct Cli {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of hidden layers
    #[arg(long)]
    hidden_layers: Option<usize>,
    /// Number of walkback sweeps per training chain
    #[arg(long)]
    walkbacks: Option<usize>,
    /// Width of every hidden layer
    #[arg(long)]
    hidden_size: Option<usize>,
    /// Hidden activation: sigmoid, rectifier or tanh
    #[arg(long)]
    activation: Option<HiddenActivation>,
    /// Initialise the visible bias from the mean training pixel
    #[arg(long)]
    vis_init: bool,

    /// Fraction of visible entries replaced by salt-and-pepper noise
    #[arg(long)]
    input_salt_and_pepper: Option<f32>,
    /// Standard deviation of the hidden Gaussian noise
    #[arg(long)]
    hidden_add_noise_sigma: Option<f32>,
    /// Exempt the first hidden layer from Gaussian noise: true or false
    #[arg(long)]
    noiseless_h1: Option<bool>,
    /// Sample the visible layer before corrupting it: true or false
    #[arg(long)]
    input_sampling: Option<bool>,

    #[arg(long)]
    learning_rate: Option<f32>,
    #[arg(long)]
    annealing: Option<f32>,
    #[arg(long)]
    momentum: Option<f32>,
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long)]
    n_epoch: Option<usize>,
    /// Combination of the per-step chain costs: sum or mean
    #[arg(long)]
    chain_loss: Option<ChainLoss>,
    #[arg(long)]
    seed: Option<u64>,

    /// Dataset: mnist or mnist_binary
    #[arg(long)]
    dataset: Option<DatasetKind>,
    /// Directory holding the MNIST idx files
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Directory for checkpoints, diagnostics and config.json
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Skip training and restore the latest checkpoint
    #[arg(long)]
    test_model: bool,
    /// Directory with index.txt and index_mask.txt to inpaint
    #[arg(long)]
    missing_data_dir: Option<PathBuf>,
    /// Where inpainted images are written
    #[arg(long)]
    save_path: Option<PathBuf>,
}

impl Cli {
    fn apply(self, config: &mut GsnConfig) {
        let network = &mut config.network;
        if let Some(v) = self.hidden_layers {
            network.hidden_layers = v;
        }
        if let Some(v) = self.walkbacks {
            network.walkbacks = v;
        }
        if let Some(v) = self.hidden_size {
            network.hidden_size = v;
        }
        if let Some(v) = self.activation {
            network.activation = v;
        }
        network.vis_init |= self.vis_init;

        let noise = &mut config.noise;
        if let Some(v) = self.input_salt_and_pepper {
            noise.input_salt_and_pepper = v;
        }
        if let Some(v) = self.hidden_add_noise_sigma {
            noise.hidden_add_noise_sigma = v;
        }
        if let Some(v) = self.noiseless_h1 {
            noise.noiseless_h1 = v;
        }
        if let Some(v) = self.input_sampling {
            noise.input_sampling = v;
        }

        let training = &mut config.training;
        if let Some(v) = self.learning_rate {
            training.learning_rate = v;
        }
        if let Some(v) = self.annealing {
            training.annealing = v;
        }
        if let Some(v) = self.momentum {
            training.momentum = v;
        }
        if let Some(v) = self.batch_size {
            training.batch_size = v;
        }
        if let Some(v) = self.n_epoch {
            training.n_epoch = v;
        }
        if let Some(v) = self.chain_loss {
            training.chain_loss = v;
        }
        if let Some(v) = self.seed {
            training.seed = v;
        }

        let experiment = &mut config.experiment;
        if let Some(v) = self.dataset {
            experiment.dataset = v;
        }
        if let Some(v) = self.data_path {
            experiment.data_path = v;
        }
        if let Some(v) = self.output_dir {
            experiment.output_dir = v;
        }
        experiment.test_model |= self.test_model;
        if self.missing_data_dir.is_some() {
            experiment.missing_data_dir = self.missing_data_dir;
        }
        if let Some(v) = self.save_path {
            experiment.save_path = v;
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => GsnConfig::default(),
    };
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let summary = run_experiment(&config).context("experiment failed")?;
    if let Some(epoch) = summary.restored_epoch {
        log::info!("evaluated checkpoint of epoch {}", epoch);
    }
    if summary.inpainted > 0 {
        log::info!(
            "inpainted {} images into {}",
            summary.inpainted,
            config.experiment.save_path.display()
        );
    }
    Ok(())
}
