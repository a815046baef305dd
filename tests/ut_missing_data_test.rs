use gsn_inpaint::dataset::{MissingDataEntry, MissingDataSet};
use gsn_inpaint::utility::save_grayscale_png;
use ndarray::Array2;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write_square_pngs(dir: &Path, name: &str, side: usize, mask_rows: std::ops::Range<usize>) {
    let digit = Array2::from_shape_fn((side, side), |(_, c)| (c % 2) as f32);
    save_grayscale_png(digit.view(), dir.join(format!("{}_corrupted.png", name))).unwrap();
    let mask = Array2::from_shape_fn((side, side), |(r, _)| mask_rows.contains(&r) as u8 as f32);
    save_grayscale_png(mask.view(), dir.join(format!("{}_mask.png", name))).unwrap();
}

#[test]
fn test_open_reads_both_indexes() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("index.txt"),
        "a_corrupted.png 3\n\nsub/b_corrupted.png 7 extra\n",
    )
    .unwrap();
    fs::write(dir.path().join("index_mask.txt"), "a_mask.png 3\nsub/b_mask.png\n").unwrap();

    let data = MissingDataSet::open(dir.path()).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data.root(), dir.path());
    assert_eq!(
        data.entries()[1],
        MissingDataEntry {
            image_path: "sub/b_corrupted.png".to_string(),
            label: "7".to_string(),
            mask_path: "sub/b_mask.png".to_string(),
        }
    );
    assert_eq!(data.entries()[0].output_name(), "a_ip.png");
    assert_eq!(data.entries()[1].output_name(), "b_ip.png");
}

#[test]
fn test_open_rejects_inconsistent_indexes() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("index.txt"), "a.png 1\nb.png 2\n").unwrap();
    fs::write(dir.path().join("index_mask.txt"), "a_mask.png\n").unwrap();
    assert!(MissingDataSet::open(dir.path()).is_err());

    fs::write(dir.path().join("index.txt"), "a.png\n").unwrap();
    assert!(MissingDataSet::open(dir.path()).is_err());

    let empty = tempdir().unwrap();
    assert!(MissingDataSet::open(empty.path()).is_err());
}

#[test]
fn test_load_digit_and_mask() {
    let dir = tempdir().unwrap();
    write_square_pngs(dir.path(), "seven", 6, 2..4);
    fs::write(dir.path().join("index.txt"), "seven_corrupted.png 7\n").unwrap();
    fs::write(dir.path().join("index_mask.txt"), "seven_mask.png\n").unwrap();

    let data = MissingDataSet::open(dir.path()).unwrap();
    let entry = &data.entries()[0];

    let digit = data.load_digit(entry).unwrap();
    assert_eq!(digit.dim(), (1, 36));
    assert_eq!(digit[[0, 0]], 0.0);
    assert_eq!(digit[[0, 1]], 1.0);

    let mask = data.load_mask(entry).unwrap();
    assert_eq!(mask.len(), 36);
    assert_eq!(mask.iter().filter(|&&m| m).count(), 12);
    assert!(!mask[0]);
    assert!(mask[2 * 6]);
    assert!(!mask[4 * 6]);
}
