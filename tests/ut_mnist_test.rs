use byteorder::{BigEndian, WriteBytesExt};
use flate2::Compression;
use flate2::write::GzEncoder;
use gsn_inpaint::dataset::mnist::{load_mnist, read_idx_images, read_idx_labels};
use std::fs::File;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::tempdir;

const SIDE: usize = 4;

fn image_bytes(n: usize, offset: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.write_i32::<BigEndian>(2051).unwrap();
    bytes.write_i32::<BigEndian>(n as i32).unwrap();
    bytes.write_i32::<BigEndian>(SIDE as i32).unwrap();
    bytes.write_i32::<BigEndian>(SIDE as i32).unwrap();
    for i in 0..n {
        for p in 0..SIDE * SIDE {
            // first pixel encodes the image index, the rest alternate dark and bright
            let value = if p == 0 { (i + offset) as u8 } else if p % 2 == 0 { 255 } else { 51 };
            bytes.push(value);
        }
    }
    bytes
}

fn label_bytes(n: usize, offset: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.write_i32::<BigEndian>(2049).unwrap();
    bytes.write_i32::<BigEndian>(n as i32).unwrap();
    bytes.extend((0..n).map(|i| ((i + offset) % 10) as u8));
    bytes
}

fn write_plain(path: &Path, bytes: &[u8]) {
    File::create(path).unwrap().write_all(bytes).unwrap();
}

fn write_gz(path: &Path, bytes: &[u8]) {
    let mut encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    encoder.write_all(bytes).unwrap();
    encoder.finish().unwrap();
}

fn write_dataset(dir: &Path, n_train: usize, n_test: usize, gzip: bool) {
    let files = [
        ("train-images-idx3-ubyte", image_bytes(n_train, 0)),
        ("train-labels-idx1-ubyte", label_bytes(n_train, 0)),
        ("t10k-images-idx3-ubyte", image_bytes(n_test, 100)),
        ("t10k-labels-idx1-ubyte", label_bytes(n_test, 100)),
    ];
    for (name, bytes) in files {
        if gzip {
            write_gz(&dir.join(format!("{}.gz", name)), &bytes);
        } else {
            write_plain(&dir.join(name), &bytes);
        }
    }
}

#[test]
fn test_read_idx_images_scales_pixels() {
    let bytes = image_bytes(3, 0);
    let images = read_idx_images(&mut Cursor::new(bytes)).unwrap();

    assert_eq!(images.dim(), (3, SIDE * SIDE));
    assert_eq!(images[[2, 0]], 2.0 / 255.0);
    assert_eq!(images[[0, 1]], 0.2);
    assert_eq!(images[[0, 2]], 1.0);
}

#[test]
fn test_read_idx_rejects_bad_files() {
    let labels = label_bytes(3, 0);
    assert!(read_idx_images(&mut Cursor::new(labels.clone())).is_err());

    let images = image_bytes(3, 0);
    assert!(read_idx_labels(&mut Cursor::new(images.clone())).is_err());

    let truncated = images[..images.len() - 1].to_vec();
    assert!(read_idx_images(&mut Cursor::new(truncated)).is_err());

    let parsed = read_idx_labels(&mut Cursor::new(labels)).unwrap();
    assert_eq!(parsed.to_vec(), vec![0, 1, 2]);
}

#[test]
fn test_load_mnist_splits_validation() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path(), 12, 5, false);

    let mnist = load_mnist(dir.path(), false).unwrap();
    assert_eq!(mnist.train.len(), 10);
    assert_eq!(mnist.valid.len(), 2);
    assert_eq!(mnist.test.len(), 5);

    // the validation set is the tail of the training file
    assert_eq!(mnist.valid.labels.to_vec(), vec![0, 1]);
    assert_eq!(mnist.valid.images[[0, 0]], 10.0 / 255.0);
    assert_eq!(mnist.test.labels[0], 0);
    assert_eq!(mnist.test.images[[4, 0]], 104.0 / 255.0);
}

#[test]
fn test_load_mnist_gzip_and_binary() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path(), 6, 2, true);

    let mnist = load_mnist(dir.path(), true).unwrap();
    assert_eq!(mnist.train.len(), 5);
    assert_eq!(mnist.valid.len(), 1);
    for split in [&mnist.train, &mnist.valid, &mnist.test] {
        assert!(split.images.iter().all(|&v| v == 0.0 || v == 1.0));
    }
    assert_eq!(mnist.train.images[[0, 1]], 0.0);
    assert_eq!(mnist.train.images[[0, 2]], 1.0);
}

#[test]
fn test_merge_and_shuffle_train() {
    let dir = tempdir().unwrap();
    write_dataset(dir.path(), 12, 3, false);

    let mut mnist = load_mnist(dir.path(), false).unwrap();
    mnist.merge_valid_into_train().unwrap();
    assert_eq!(mnist.train.len(), 12);
    assert_eq!(mnist.valid.len(), 2);

    let mut again = mnist.clone();
    mnist.shuffle_train(1);
    again.shuffle_train(1);
    assert_eq!(mnist.train, again.train);

    // images and labels move together
    for (image, &label) in mnist.train.images.outer_iter().zip(mnist.train.labels.iter()) {
        let index = (image[0] * 255.0).round() as usize;
        assert_eq!(index % 10, label as usize);
    }
    let mut labels: Vec<u8> = mnist.train.labels.to_vec();
    labels.sort_unstable();
    assert_eq!(labels, vec![0, 0, 1, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
}

#[test]
fn test_load_mnist_missing_directory() {
    let dir = tempdir().unwrap();
    assert!(load_mnist(dir.path().join("nowhere"), false).is_err());
}
