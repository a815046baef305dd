use approx::assert_abs_diff_eq;
use gsn_inpaint::utility::image_tiler::{
    load_grayscale_png, save_grayscale_png, scale_to_unit_interval, tile_raster_images,
};
use ndarray::{Array2, array};
use tempfile::tempdir;

#[test]
fn test_scale_to_unit_interval() {
    let values = array![2.0f32, 4.0, 3.0];
    let scaled = scale_to_unit_interval(values.view());
    assert_abs_diff_eq!(scaled[0], 0.0);
    assert_abs_diff_eq!(scaled[1], 1.0);
    assert_abs_diff_eq!(scaled[2], 0.5);

    let constant = array![0.7f32, 0.7, 0.7];
    assert!(scale_to_unit_interval(constant.view()).iter().all(|&v| v == 0.0));
}

#[test]
fn test_tile_raster_images_layout() {
    // three 2x2 images with values 0..4, 4..8 and 8..12
    let images = Array2::from_shape_fn((3, 4), |(i, j)| (i * 4 + j) as f32);
    let tiled = tile_raster_images(images.view(), (2, 2), (2, 2), (1, 1)).unwrap();

    assert_eq!(tiled.dim(), (5, 5));
    // first tile, rescaled on its own
    assert_abs_diff_eq!(tiled[[0, 0]], 0.0);
    assert_abs_diff_eq!(tiled[[1, 1]], 1.0);
    assert_abs_diff_eq!(tiled[[0, 1]], 1.0 / 3.0, epsilon = 1e-6);
    // separators stay black
    assert!(tiled.row(2).iter().all(|&v| v == 0.0));
    assert!(tiled.column(2).iter().all(|&v| v == 0.0));
    // second tile to the right, third below
    assert_abs_diff_eq!(tiled[[1, 4]], 1.0);
    assert_abs_diff_eq!(tiled[[4, 1]], 1.0);
    // the fourth tile has no image
    assert!(tiled.slice(ndarray::s![3.., 3..]).iter().all(|&v| v == 0.0));
}

#[test]
fn test_tile_raster_images_ignores_extra_images() {
    let images = Array2::from_elem((10, 9), 0.5f32);
    let tiled = tile_raster_images(images.view(), (3, 3), (1, 2), (0, 0)).unwrap();
    assert_eq!(tiled.dim(), (3, 6));
}

#[test]
fn test_tile_raster_images_rejects_wrong_shape() {
    let images = Array2::<f32>::zeros((2, 10));
    assert!(tile_raster_images(images.view(), (3, 3), (1, 2), (1, 1)).is_err());
}

#[test]
fn test_png_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("picture.png");
    let pixels = array![[0.0f32, 1.0, 0.5], [1.5, -1.0, 0.2]];

    save_grayscale_png(pixels.view(), &path).unwrap();
    let loaded = load_grayscale_png(&path).unwrap();

    assert_eq!(loaded.dim(), (2, 3));
    assert_abs_diff_eq!(loaded[[0, 0]], 0.0);
    assert_abs_diff_eq!(loaded[[0, 1]], 1.0);
    assert_abs_diff_eq!(loaded[[0, 2]], 128.0 / 255.0, epsilon = 1e-6);
    // out-of-range values are clamped
    assert_abs_diff_eq!(loaded[[1, 0]], 1.0);
    assert_abs_diff_eq!(loaded[[1, 1]], 0.0);
    assert_abs_diff_eq!(loaded[[1, 2]], 51.0 / 255.0, epsilon = 1e-6);
}

#[test]
fn test_load_missing_png() {
    let dir = tempdir().unwrap();
    assert!(load_grayscale_png(dir.path().join("absent.png")).is_err());
}
