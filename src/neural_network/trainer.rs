use crate::config::{GsnConfig, HiddenActivation, NoiseConfig, TrainingConfig};
use crate::error::ModelError;
use crate::neural_network::backprop::{GradientTape, backpropagate};
use crate::neural_network::layer_update::{LayerUpdateEngine, NetworkState};
use crate::neural_network::loss_function::{WalkbackCost, walkback_cost};
use crate::neural_network::noise::salt_and_pepper;
use crate::neural_network::optimizer::MomentumSGD;
use crate::neural_network::parameters::ParameterStore;
use crate::neural_network::walkback::WalkbackPropagator;
use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, ArrayView2, Axis, s};
use rand::Rng;
use std::time::{Duration, Instant};

/// Training, validation and test inputs, one example per row.
///
/// The validation and test sets may be empty, in which case their costs are not computed.
#[derive(Debug, Clone, Copy)]
pub struct TrainingData<'a> {
    pub train: ArrayView2<'a, f32>,
    pub valid: ArrayView2<'a, f32>,
    pub test: ArrayView2<'a, f32>,
}

/// What happened during one epoch.
///
/// # Fields
///
/// - `epoch` - 1-based epoch number
/// - `train_batch_costs` - Walkback cost of every training batch, in order
/// - `train_cost` - Mean of `train_batch_costs`
/// - `valid_cost` / `test_cost` - Mean held-out cost, `None` when the set is smaller than a batch
/// - `learning_rate` - Learning rate used during the epoch (before annealing)
/// - `elapsed` - Wall time of the epoch
/// - `mean_visible_bias` - Mean of the visible bias after the epoch
/// - `mean_abs_weights` - Mean absolute weight of every weight matrix after the epoch
#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub train_batch_costs: Vec<f32>,
    pub train_cost: f32,
    pub valid_cost: Option<f32>,
    pub test_cost: Option<f32>,
    pub learning_rate: f32,
    pub elapsed: Duration,
    pub mean_visible_bias: f32,
    pub mean_abs_weights: Vec<f32>,
}

/// Statistics of every completed epoch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochStats>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochStats> {
        self.epochs.last()
    }

    /// Epoch with the lowest validation cost, if any epoch has one
    pub fn best_valid(&self) -> Option<&EpochStats> {
        self.epochs
            .iter()
            .filter(|stats| stats.valid_cost.is_some())
            .min_by(|a, b| {
                let (a, b) = (a.valid_cost.unwrap_or(f32::MAX), b.valid_cost.unwrap_or(f32::MAX));
                a.total_cmp(&b)
            })
    }
}

/// Hooks called by [`Trainer::fit`] at the end of every epoch.
///
/// Both methods default to doing nothing; `()` is the observer that ignores everything.
pub trait EpochObserver {
    /// Called after every epoch with the parameters as they are after the epoch
    fn on_epoch_end(
        &mut self,
        _stats: &EpochStats,
        _params: &ParameterStore,
    ) -> Result<(), ModelError> {
        Ok(())
    }

    /// Called every `checkpoint_interval` epochs, after `on_epoch_end`
    fn on_checkpoint(
        &mut self,
        _epoch: usize,
        _params: &ParameterStore,
    ) -> Result<(), ModelError> {
        Ok(())
    }
}

impl EpochObserver for () {}

/// Minibatch trainer of the walkback objective.
///
/// Every batch is corrupted with salt-and-pepper noise, run through `walkbacks` noisy
/// sweeps, and the summed (or averaged) cross-entropy of the resulting chain against the
/// clean batch is minimised with [`MomentumSGD`].
#[derive(Debug, Clone)]
pub struct Trainer {
    activation: HiddenActivation,
    noise: NoiseConfig,
    training: TrainingConfig,
    walkbacks: usize,
    optimizer: MomentumSGD,
}

impl Trainer {
    /// Creates a trainer from a validated configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Trainer)` - Trainer with fresh momentum buffers
    /// - `Err(ModelError::InputValidationError)` - If the configuration is invalid
    pub fn new(config: &GsnConfig) -> Result<Self, ModelError> {
        config.validate()?;
        let training = config.training.clone();
        let optimizer =
            MomentumSGD::new(training.learning_rate, training.momentum, training.annealing)?;

        Ok(Self {
            activation: config.network.activation,
            noise: config.noise.clone(),
            training,
            walkbacks: config.network.walkbacks,
            optimizer,
        })
    }

    pub fn learning_rate(&self) -> f32 {
        self.optimizer.learning_rate()
    }

    pub fn optimizer(&self) -> &MomentumSGD {
        &self.optimizer
    }

    fn engine<'a>(&'a self, params: &'a ParameterStore) -> LayerUpdateEngine<'a> {
        LayerUpdateEngine::new(params, self.activation, &self.noise)
    }

    /// Noisy walkback chain of one batch and its cost, recording a gradient tape
    fn forward<R: Rng + ?Sized>(
        &self,
        params: &ParameterStore,
        batch: ArrayView2<f32>,
        rng: &mut R,
        tape: Option<&mut GradientTape>,
    ) -> Result<WalkbackCost, ModelError> {
        let corrupted = salt_and_pepper(&batch.to_owned(), self.noise.input_salt_and_pepper, rng)?;
        let mut state = NetworkState::with_visible(params, corrupted.corrupted)?;
        let propagator = WalkbackPropagator::new(self.engine(params));

        let chain = match tape {
            Some(tape) => {
                propagator.walkback_traced(&mut state, self.walkbacks, true, rng, tape)?
            }
            None => propagator.walkback(&mut state, self.walkbacks, true, rng)?,
        };

        let cost = walkback_cost(&chain, batch, self.training.chain_loss)?;
        if !cost.is_finite() {
            return Err(ModelError::NumericError(format!(
                "Walkback cost is not finite: {:?}",
                cost.step_costs
            )));
        }
        Ok(cost)
    }

    /// Runs one gradient step on a batch
    ///
    /// # Parameters
    ///
    /// - `params` - Parameters, updated in place after the whole batch gradient is known
    /// - `batch` - Clean input batch
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(WalkbackCost)` - Cost of the batch before the update
    /// - `Err(ModelError)` - Shape errors, or `NumericError` on a non-finite cost or gradient
    pub fn train_batch<R: Rng + ?Sized>(
        &mut self,
        params: &mut ParameterStore,
        batch: ArrayView2<f32>,
        rng: &mut R,
    ) -> Result<WalkbackCost, ModelError> {
        let mut tape = GradientTape::new();
        let cost = self.forward(params, batch, rng, Some(&mut tape))?;
        let grads = backpropagate(
            &self.engine(params),
            &tape,
            batch,
            self.training.chain_loss,
        )?;
        self.optimizer.step(params, &grads)?;
        Ok(cost)
    }

    /// Mean walkback cost over the full batches of `data`, without updating anything
    ///
    /// # Returns
    ///
    /// - `Ok(Some(cost))` - Mean of the batch costs
    /// - `Ok(None)` - If `data` holds fewer rows than one batch
    pub fn evaluate<R: Rng + ?Sized>(
        &self,
        params: &ParameterStore,
        data: ArrayView2<f32>,
        rng: &mut R,
    ) -> Result<Option<f32>, ModelError> {
        let batch_size = self.training.batch_size;
        let n_batches = data.nrows() / batch_size;
        if n_batches == 0 {
            return Ok(None);
        }

        let mut total = 0.0f64;
        for i in 0..n_batches {
            let batch = data.slice(s![i * batch_size..(i + 1) * batch_size, ..]);
            total += self.forward(params, batch, rng, None)?.total as f64;
        }
        Ok(Some((total / n_batches as f64) as f32))
    }

    /// Runs one epoch over the training set without annealing
    pub fn train_epoch<R: Rng + ?Sized>(
        &mut self,
        params: &mut ParameterStore,
        train: ArrayView2<f32>,
        rng: &mut R,
        progress_bar: Option<&ProgressBar>,
    ) -> Result<Vec<f32>, ModelError> {
        let batch_size = self.training.batch_size;
        let n_batches = train.nrows() / batch_size;
        let mut costs = Vec::with_capacity(n_batches);

        for (i, batch) in train
            .axis_chunks_iter(Axis(0), batch_size)
            .take(n_batches)
            .enumerate()
        {
            let cost = self.train_batch(params, batch, rng)?;
            costs.push(cost.total);
            if let Some(pb) = progress_bar {
                pb.set_message(format!("batch {}/{} | cost {:.4}", i + 1, n_batches, cost.total));
                pb.inc(1);
            }
        }

        Ok(costs)
    }

    /// Trains `params` for `n_epoch` epochs
    ///
    /// # Parameters
    ///
    /// - `params` - Parameters to train in place
    /// - `data` - Training and held-out sets
    /// - `observer` - Receives per-epoch statistics and checkpoint requests
    /// - `rng` - Random generator
    ///
    /// # Returns
    ///
    /// - `Ok(TrainingHistory)` - Statistics of every epoch
    /// - `Err(ModelError)` - The training set is too small, the data does not fit the
    ///   network, training diverged or the observer failed
    pub fn fit<R: Rng + ?Sized, O: EpochObserver + ?Sized>(
        &mut self,
        params: &mut ParameterStore,
        data: TrainingData<'_>,
        observer: &mut O,
        rng: &mut R,
    ) -> Result<TrainingHistory, ModelError> {
        let batch_size = self.training.batch_size;
        let n_batches = data.train.nrows() / batch_size;
        if n_batches == 0 {
            return Err(ModelError::InputValidationError(format!(
                "Training set has {} examples, fewer than one batch of {}",
                data.train.nrows(),
                batch_size
            )));
        }
        if data.train.ncols() != params.input_dim() {
            return Err(ModelError::InputValidationError(format!(
                "Training data has {} columns, network expects {}",
                data.train.ncols(),
                params.input_dim()
            )));
        }

        for (name, set) in [("validation", data.valid), ("test", data.test)] {
            if set.nrows() < batch_size {
                log::warn!(
                    "{} set has {} examples, fewer than one batch of {}; its cost is skipped",
                    name,
                    set.nrows(),
                    batch_size
                );
            }
        }

        let n_epoch = self.training.n_epoch;
        let progress_bar = ProgressBar::new((n_epoch * n_batches) as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} | {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut history = TrainingHistory::default();

        for epoch in 1..=n_epoch {
            let start = Instant::now();
            let learning_rate = self.optimizer.learning_rate();

            let train_batch_costs = self.train_epoch(params, data.train, rng, Some(&progress_bar))?;
            let train_cost =
                train_batch_costs.iter().sum::<f32>() / train_batch_costs.len() as f32;
            let valid_cost = self.evaluate(params, data.valid, rng)?;
            let test_cost = self.evaluate(params, data.test, rng)?;

            self.optimizer.anneal();

            let stats = EpochStats {
                epoch,
                train_batch_costs,
                train_cost,
                valid_cost,
                test_cost,
                learning_rate,
                elapsed: start.elapsed(),
                mean_visible_bias: params.mean_visible_bias(),
                mean_abs_weights: params.mean_abs_weights(),
            };

            log::info!(
                "epoch {} | train {:.6} | valid {} | test {} | lr {:.6} | {:.1}s",
                epoch,
                stats.train_cost,
                format_cost(stats.valid_cost),
                format_cost(stats.test_cost),
                stats.learning_rate,
                stats.elapsed.as_secs_f32()
            );
            log::debug!(
                "epoch {} | mean visible bias {:.4} | mean |W| {:?}",
                epoch,
                stats.mean_visible_bias,
                stats.mean_abs_weights
            );

            observer.on_epoch_end(&stats, params)?;
            if epoch % self.training.checkpoint_interval == 0 {
                observer.on_checkpoint(epoch, params)?;
            }
            history.epochs.push(stats);
        }

        progress_bar.finish_with_message("Training completed");
        Ok(history)
    }
}

fn format_cost(cost: Option<f32>) -> String {
    match cost {
        Some(c) => format!("{:.6}", c),
        None => "-".to_string(),
    }
}

/// Salt-and-pepper corrupted copies of `input`, used by the denoising diagnostic
pub fn corrupted_copy<R: Rng + ?Sized>(
    input: ArrayView2<f32>,
    noise: &NoiseConfig,
    rng: &mut R,
) -> Result<Array2<f32>, ModelError> {
    Ok(salt_and_pepper(&input.to_owned(), noise.input_salt_and_pepper, rng)?.corrupted)
}
