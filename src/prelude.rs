pub use crate::config::{
    ChainLoss, DatasetKind, ExperimentConfig, GsnConfig, HiddenActivation, NetworkConfig,
    NoiseConfig, TrainingConfig, load_config,
};
pub use crate::dataset::{Mnist, MnistSplit, MissingDataSet, load_mnist};
pub use crate::error::{ExperimentError, IoError, ModelError};
pub use crate::experiment::{ExperimentSummary, inpaint_directory, run_experiment};
pub use crate::neural_network::noise::{
    add_gaussian_noise, bernoulli_sample, corrupt_input, dropout, salt_and_pepper, uniform_noise,
};
pub use crate::neural_network::*;
pub use crate::utility::{save_grayscale_png, tile_raster_images};
