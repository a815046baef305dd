/// This module provides access to the MNIST digits stored as idx files
pub mod mnist;
/// This module provides access to directories of images with missing regions
pub mod missing_data;

pub use mnist::{MNIST_PIXELS, MNIST_SIDE, Mnist, MnistSplit, load_mnist};
pub use missing_data::{MissingDataEntry, MissingDataSet};
