use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Error types that can occur while building, training or running a GSN
///
/// # Variants
///
/// - `InputValidationError` - indicates the input data or configuration does not meet the expected format, shape or range
/// - `ProcessingError` - indicates that something went wrong while propagating or updating the network
/// - `NumericError` - indicates that a cost or gradient became NaN or infinite
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    InputValidationError(String),
    ProcessingError(String),
    NumericError(String),
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelError::InputValidationError(msg) => write!(f, "Input validation error: {}", msg),
            ModelError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            ModelError::NumericError(msg) => write!(f, "Numeric error: {}", msg),
        }
    }
}

/// Implements the standard error trait for ModelError
impl std::error::Error for ModelError {}

/// Input/Output error types that can occur during checkpoint, dataset and image operations
///
/// # Variants
///
/// - `StdIoError` - Wraps standard I/O errors from file system operations (reading, writing, file access)
/// - `JsonError` - Wraps JSON serialization/deserialization errors for checkpoints and configs
/// - `ImageError` - Wraps PNG decoding/encoding errors
/// - `CheckpointMismatch` - A checkpoint does not match the current layer sizes
#[derive(Debug)]
pub enum IoError {
    StdIoError(std::io::Error),
    JsonError(serde_json::Error),
    ImageError(image::ImageError),
    CheckpointMismatch(String),
}

impl IoError {
    /// Opens `path` for buffered reading
    pub fn load_in_buf_reader<P: AsRef<Path>>(path: P) -> Result<BufReader<File>, IoError> {
        let file = File::open(path).map_err(IoError::StdIoError)?;
        Ok(BufReader::new(file))
    }

    /// Builds an `InvalidData` I/O error from a message
    pub fn invalid_data(msg: impl Into<String>) -> IoError {
        IoError::StdIoError(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            msg.into(),
        ))
    }
}

impl std::fmt::Display for IoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoError::StdIoError(e) => write!(f, "IO error: {}", e),
            IoError::JsonError(e) => write!(f, "JSON error: {}", e),
            IoError::ImageError(e) => write!(f, "Image error: {}", e),
            IoError::CheckpointMismatch(msg) => write!(f, "Checkpoint mismatch: {}", msg),
        }
    }
}

impl std::error::Error for IoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            IoError::StdIoError(e) => Some(e),
            IoError::JsonError(e) => Some(e),
            IoError::ImageError(e) => Some(e),
            IoError::CheckpointMismatch(_) => None,
        }
    }
}

/// Errors surfaced by the end-to-end experiment runner
///
/// # Variants
///
/// - `Model` - a failure inside the network (validation, propagation, numerics)
/// - `Io` - a failure reading or writing datasets, images, configs or checkpoints
#[derive(Debug)]
pub enum ExperimentError {
    Model(ModelError),
    Io(IoError),
}

impl std::fmt::Display for ExperimentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperimentError::Model(e) => write!(f, "{}", e),
            ExperimentError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ExperimentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExperimentError::Model(e) => Some(e),
            ExperimentError::Io(e) => Some(e),
        }
    }
}

impl From<ModelError> for ExperimentError {
    fn from(e: ModelError) -> Self {
        ExperimentError::Model(e)
    }
}

impl From<IoError> for ExperimentError {
    fn from(e: IoError) -> Self {
        ExperimentError::Io(e)
    }
}
