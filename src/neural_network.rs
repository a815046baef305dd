/// Module that contains the hidden and visible nonlinearities
pub mod activation;
/// Module that contains reverse-mode gradients through recorded walkback sweeps
pub mod backprop;
/// Module that contains JSON checkpoints of the network parameters
pub mod checkpoint;
/// Module that contains the `Gsn` facade tying configuration and parameters together
pub mod gsn;
/// Module that contains the conditional sampler used for inpainting
pub mod inpainter;
/// Module that contains the network state and single-layer updates
pub mod layer_update;
/// Module that contains the walkback objective
pub mod loss_function;
/// Module that contains noise injection (salt-and-pepper, Gaussian, Bernoulli, dropout)
pub mod noise;
/// Module that contains momentum SGD with learning-rate annealing
pub mod optimizer;
/// Module that contains the weights and biases of the network
pub mod parameters;
/// Module that contains the Markov-chain sampler
pub mod sampler;
/// Module that contains the minibatch training loop
pub mod trainer;
/// Module that contains odd-then-even sweeps and reconstruction chains
pub mod walkback;

pub use backprop::{GradientTape, ParameterGradients, UpdateTrace, VisiblePath, backpropagate};
pub use checkpoint::{
    SerializableParameters, checkpoint_file_name, latest_checkpoint, load_parameters,
    save_parameters,
};
pub use gsn::Gsn;
pub use inpainter::{Inpainter, InpaintingTrajectory};
pub use layer_update::{LayerUpdate, LayerUpdateEngine, NetworkState};
pub use loss_function::{WalkbackCost, walkback_cost};
pub use optimizer::MomentumSGD;
pub use parameters::ParameterStore;
pub use sampler::{SampleTrajectory, Sampler};
pub use trainer::{EpochObserver, EpochStats, Trainer, TrainingData, TrainingHistory};
pub use walkback::{ReconstructionChain, WalkbackPropagator};
