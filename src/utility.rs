/// Tiling of flattened images into a grid and grayscale PNG input/output
pub mod image_tiler;

pub use image_tiler::{load_grayscale_png, save_grayscale_png, scale_to_unit_interval, tile_raster_images};
