use crate::error::{IoError, ModelError};
use image::{GrayImage, ImageReader, Luma};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use std::path::Path;

/// Rescales a vector linearly so that its minimum maps to 0 and its maximum to 1.
///
/// A constant vector maps to zeros.
///
/// # Parameters
///
/// * `values` - Values to rescale
///
/// # Returns
///
/// * `Array1<f32>` - Values in [0, 1]
pub fn scale_to_unit_interval(values: ArrayView1<f32>) -> Array1<f32> {
    let min = values.iter().copied().fold(f32::INFINITY, f32::min);
    let max = values.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let range = max - min;
    if !range.is_finite() || range <= 0.0 {
        return Array1::zeros(values.len());
    }
    values.mapv(|v| (v - min) / range)
}

/// Arranges flattened images on a grid, row by row.
///
/// Every image is rescaled to [0, 1] on its own before it is placed, and images are
/// separated by `tile_spacing` pixels of black. Images beyond `rows * cols` are ignored;
/// missing images leave their tile black.
///
/// # Parameters
///
/// - `images` - One flattened `height * width` image per row
/// - `img_shape` - `(height, width)` of every image
/// - `tile_shape` - `(rows, cols)` of the grid
/// - `tile_spacing` - `(vertical, horizontal)` gap between tiles
///
/// # Returns
///
/// - `Ok(Array2<f32>)` - The tiled picture, values in [0, 1]
/// - `Err(ModelError::InputValidationError)` - If the image width does not match `img_shape`
///
/// # Example
/// ```rust
/// use gsn_inpaint::utility::image_tiler::tile_raster_images;
/// use ndarray::Array2;
///
/// let images = Array2::from_shape_fn((6, 4), |(i, j)| (i * 4 + j) as f32);
/// let tiled = tile_raster_images(images.view(), (2, 2), (2, 3), (1, 1)).unwrap();
/// assert_eq!(tiled.dim(), (5, 8));
/// ```
pub fn tile_raster_images(
    images: ArrayView2<f32>,
    img_shape: (usize, usize),
    tile_shape: (usize, usize),
    tile_spacing: (usize, usize),
) -> Result<Array2<f32>, ModelError> {
    let (height, width) = img_shape;
    let (rows, cols) = tile_shape;
    let (v_gap, h_gap) = tile_spacing;

    if images.ncols() != height * width {
        return Err(ModelError::InputValidationError(format!(
            "Images have {} pixels, image shape {:?} needs {}",
            images.ncols(),
            img_shape,
            height * width
        )));
    }

    let out_height = ((height + v_gap) * rows).saturating_sub(v_gap);
    let out_width = ((width + h_gap) * cols).saturating_sub(h_gap);
    let mut output = Array2::zeros((out_height, out_width));

    for (index, image) in images.outer_iter().take(rows * cols).enumerate() {
        let (tile_row, tile_col) = (index / cols, index % cols);
        let top = tile_row * (height + v_gap);
        let left = tile_col * (width + h_gap);

        let scaled = scale_to_unit_interval(image);
        let scaled = scaled
            .into_shape_with_order((height, width))
            .map_err(|e| ModelError::ProcessingError(e.to_string()))?;
        output
            .slice_mut(s![top..top + height, left..left + width])
            .assign(&scaled);
    }

    Ok(output)
}

/// Writes a 2-D array of values in [0, 1] as an 8-bit grayscale PNG
///
/// Values outside [0, 1] are clamped.
///
/// # Parameters
///
/// * `pixels` - `(height, width)` intensities
/// * `path` - Destination file
pub fn save_grayscale_png<P: AsRef<Path>>(
    pixels: ArrayView2<f32>,
    path: P,
) -> Result<(), IoError> {
    let (height, width) = pixels.dim();
    let image = GrayImage::from_fn(width as u32, height as u32, |x, y| {
        let v = pixels[[y as usize, x as usize]].clamp(0.0, 1.0);
        Luma([(v * 255.0).round() as u8])
    });
    image.save(path).map_err(IoError::ImageError)
}

/// Reads a PNG as grayscale intensities scaled to [0, 1]
///
/// # Returns
///
/// * `Result<Array2<f32>, IoError>` - `(height, width)` intensities
pub fn load_grayscale_png<P: AsRef<Path>>(path: P) -> Result<Array2<f32>, IoError> {
    let image = ImageReader::open(path)
        .map_err(IoError::StdIoError)?
        .decode()
        .map_err(IoError::ImageError)?
        .into_luma8();
    let (width, height) = image.dimensions();
    let pixels: Vec<f32> = image.as_raw().iter().map(|&b| b as f32 / 255.0).collect();
    Array2::from_shape_vec((height as usize, width as usize), pixels)
        .map_err(|e| IoError::invalid_data(e.to_string()))
}
