use crate::error::IoError;
use crate::neural_network::parameters::ParameterStore;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use serde_json::{from_reader, to_writer_pretty};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Prefix of checkpoint file names, followed by the epoch number and `.json`
pub const CHECKPOINT_PREFIX: &str = "params_epoch_";

/// On-disk form of a [`ParameterStore`]: weight matrices as vectors of rows, biases as vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializableParameters {
    pub weights: Vec<Vec<Vec<f32>>>,
    pub biases: Vec<Vec<f32>>,
}

impl SerializableParameters {
    pub fn from_parameters(params: &ParameterStore) -> Self {
        Self {
            weights: params
                .weights()
                .iter()
                .map(|w| w.outer_iter().map(|row| row.to_vec()).collect())
                .collect(),
            biases: params.biases().iter().map(|b| b.to_vec()).collect(),
        }
    }
}

fn vec2_to_array2(
    rows: &[Vec<f32>],
    expected: (usize, usize),
    name: &str,
) -> Result<Array2<f32>, IoError> {
    let (n_rows, n_cols) = expected;
    if rows.len() != n_rows || rows.iter().any(|row| row.len() != n_cols) {
        return Err(IoError::CheckpointMismatch(format!(
            "{} should have shape ({}, {}), checkpoint has {} rows of widths {:?}",
            name,
            n_rows,
            n_cols,
            rows.len(),
            rows.iter().map(|row| row.len()).collect::<std::collections::BTreeSet<_>>()
        )));
    }
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((n_rows, n_cols), flat)
        .map_err(|e| IoError::CheckpointMismatch(format!("{}: {}", name, e)))
}

/// Writes `params` as a JSON checkpoint
///
/// # Parameters
///
/// * `params` - Parameters to save
/// * `path` - Destination file, created or overwritten
///
/// # Returns
///
/// * `Result<(), IoError>` - Ok on success, or an I/O or JSON error
pub fn save_parameters<P: AsRef<Path>>(params: &ParameterStore, path: P) -> Result<(), IoError> {
    let serializable = SerializableParameters::from_parameters(params);

    let file = File::create(path.as_ref()).map_err(IoError::StdIoError)?;
    let mut writer = BufWriter::new(file);
    to_writer_pretty(&mut writer, &serializable).map_err(IoError::JsonError)?;
    writer.flush().map_err(IoError::StdIoError)?;

    log::info!("saved parameters to {}", path.as_ref().display());
    Ok(())
}

/// Restores parameters from a JSON checkpoint, position by position
///
/// The checkpoint must hold exactly `layer_sizes.len() - 1` weight matrices and
/// `layer_sizes.len()` bias vectors with the shapes implied by `layer_sizes`.
///
/// # Parameters
///
/// * `path` - Checkpoint file
/// * `layer_sizes` - Widths of the network the checkpoint is loaded into
///
/// # Returns
///
/// - `Ok(ParameterStore)` - The restored parameters
/// - `Err(IoError::CheckpointMismatch)` - If the count or a shape does not match
/// - `Err(IoError)` - If the file cannot be read or parsed
pub fn load_parameters<P: AsRef<Path>>(
    path: P,
    layer_sizes: &[usize],
) -> Result<ParameterStore, IoError> {
    let reader = IoError::load_in_buf_reader(path.as_ref())?;
    let serializable: SerializableParameters = from_reader(reader).map_err(IoError::JsonError)?;

    if layer_sizes.len() < 2
        || serializable.weights.len() != layer_sizes.len() - 1
        || serializable.biases.len() != layer_sizes.len()
    {
        return Err(IoError::CheckpointMismatch(format!(
            "network with layer sizes {:?} needs {} weight matrices and {} biases, checkpoint has {} and {}",
            layer_sizes,
            layer_sizes.len().saturating_sub(1),
            layer_sizes.len(),
            serializable.weights.len(),
            serializable.biases.len()
        )));
    }

    let mut weights = Vec::with_capacity(serializable.weights.len());
    for (i, rows) in serializable.weights.iter().enumerate() {
        let expected = (layer_sizes[i], layer_sizes[i + 1]);
        weights.push(vec2_to_array2(rows, expected, &format!("W_{}", i))?);
    }

    let mut biases = Vec::with_capacity(serializable.biases.len());
    for (i, bias) in serializable.biases.iter().enumerate() {
        if bias.len() != layer_sizes[i] {
            return Err(IoError::CheckpointMismatch(format!(
                "b_{} should have length {}, checkpoint has {}",
                i,
                layer_sizes[i],
                bias.len()
            )));
        }
        biases.push(Array1::from_vec(bias.clone()));
    }

    let params = ParameterStore::from_parts(layer_sizes, weights, biases)
        .map_err(|e| IoError::CheckpointMismatch(e.to_string()))?;
    log::info!("loaded parameters from {}", path.as_ref().display());
    Ok(params)
}

/// File name of the checkpoint written after `epoch`
pub fn checkpoint_file_name(epoch: usize) -> String {
    format!("{}{}.json", CHECKPOINT_PREFIX, epoch)
}

fn parse_checkpoint_epoch(file_name: &str) -> Option<usize> {
    file_name
        .strip_prefix(CHECKPOINT_PREFIX)?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

/// Finds the checkpoint with the highest epoch number in `dir`
///
/// # Returns
///
/// - `Ok(Some((epoch, path)))` - The latest checkpoint
/// - `Ok(None)` - If `dir` holds no checkpoint
/// - `Err(IoError)` - If `dir` cannot be listed
pub fn latest_checkpoint<P: AsRef<Path>>(dir: P) -> Result<Option<(usize, PathBuf)>, IoError> {
    let mut latest: Option<(usize, PathBuf)> = None;
    for entry in fs::read_dir(dir).map_err(IoError::StdIoError)? {
        let entry = entry.map_err(IoError::StdIoError)?;
        let name = entry.file_name();
        let Some(epoch) = name.to_str().and_then(parse_checkpoint_epoch) else {
            continue;
        };
        if latest.as_ref().is_none_or(|(best, _)| epoch > *best) {
            latest = Some((epoch, entry.path()));
        }
    }
    Ok(latest)
}
