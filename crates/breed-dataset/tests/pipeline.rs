//! End-to-end preprocessing on a generated dataset.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use breed_core::{DataSplit, Error, PipelineConfig};
use breed_dataset::label_map::LabelMap;
use breed_dataset::split::{allocate_largest_remainder, holdout_count};
use breed_dataset::table::{read_table, table_path};
use breed_dataset::{run_preprocess, PreprocessOutput};
use tempfile::TempDir;

const CLASSES: [(&str, usize); 3] = [("beagle", 23), ("persian", 11), ("pug", 17)];

fn write_png(path: &Path, width: u32, height: u32, shade: u8) {
    let img = image::ImageBuffer::from_fn(width, height, |x, y| {
        image::Rgb([shade, (x % 256) as u8, (y % 256) as u8])
    });
    img.save(path).unwrap();
}

/// Builds a dataset with valid images plus files that must be rejected or ignored
fn create_dataset(root: &Path) {
    for (class, count) in CLASSES {
        let dir = root.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..count {
            write_png(&dir.join(format!("{:03}.png", i)), 24, 16, i as u8);
        }
    }

    write_png(&root.join("beagle").join("tiny.png"), 10, 40, 0);
    fs::write(root.join("pug").join("broken.jpg"), b"not really a jpeg").unwrap();
    fs::write(root.join("pug").join("notes.txt"), b"ignored").unwrap();
    fs::create_dir_all(root.join(".thumbnails")).unwrap();
    write_png(&root.join(".thumbnails").join("x.png"), 24, 24, 0);
}

fn config_for(workspace: &Path, data_dirs: Vec<PathBuf>) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.paths.data_dirs = data_dirs;
    config.paths.splits_dir = workspace.join("data/splits");
    config.paths.metadata_dir = workspace.join("data/metadata");
    config.paths.outputs_dir = workspace.join("outputs");
    config
}

fn run(workspace: &Path, data_dirs: Vec<PathBuf>) -> PreprocessOutput {
    run_preprocess(&config_for(workspace, data_dirs), false).unwrap()
}

fn read_all_tables(splits_dir: &Path) -> BTreeMap<DataSplit, Vec<breed_core::LabeledRow>> {
    DataSplit::ALL
        .into_iter()
        .map(|split| (split, read_table(&table_path(splits_dir, split)).unwrap()))
        .collect()
}

#[test]
fn test_label_map_matches_scanned_classes() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let output = run(temp_dir.path(), vec![data]);
    let persisted = LabelMap::load(&output.label_map_path).unwrap();

    assert_eq!(persisted, output.label_map);
    assert_eq!(persisted.names(), &["beagle", "persian", "pug"]);
    for (idx, (class, _)) in CLASSES.iter().enumerate() {
        assert_eq!(persisted.index(class), Some(idx));
    }
}

#[test]
fn test_splits_partition_the_valid_images() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let output = run(temp_dir.path(), vec![data.clone()]);
    let tables = read_all_tables(&temp_dir.path().join("data/splits"));

    let mut seen = HashSet::new();
    for rows in tables.values() {
        for row in rows {
            assert!(seen.insert(row.image.clone()), "{:?} appears twice", row.image);
        }
    }

    let expected_total: usize = CLASSES.iter().map(|(_, n)| n).sum();
    assert_eq!(seen.len(), expected_total);
    assert_eq!(output.statistics.total_images, expected_total);

    assert!(!seen.contains(&data.join("beagle").join("tiny.png")));
    assert!(!seen.contains(&data.join("pug").join("broken.jpg")));
    assert!(seen.iter().all(|p| p.extension().and_then(|e| e.to_str()) == Some("png")));
    assert_eq!(output.rejected.len(), 2);
    assert_eq!(output.statistics.rejected["too_small"], 1);
    assert_eq!(output.statistics.rejected["unreadable"], 1);
}

#[test]
fn test_rows_resolve_through_persisted_label_map() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let output = run(temp_dir.path(), vec![data]);
    let persisted = LabelMap::load(&output.label_map_path).unwrap();

    for rows in read_all_tables(&temp_dir.path().join("data/splits")).values() {
        persisted.check_rows(rows).unwrap();
    }
}

#[test]
fn test_same_seed_gives_same_assignment() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let first_ws = temp_dir.path().join("first");
    let second_ws = temp_dir.path().join("second");
    run(&first_ws, vec![data.clone()]);
    run(&second_ws, vec![data]);

    let first = read_all_tables(&first_ws.join("data/splits"));
    let second = read_all_tables(&second_ws.join("data/splits"));
    assert_eq!(first, second);
}

#[test]
fn test_duplicate_paths_are_collapsed() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let output = run(temp_dir.path(), vec![data.clone(), data]);
    let expected_total: usize = CLASSES.iter().map(|(_, n)| n).sum();

    assert_eq!(output.statistics.duplicates_removed, expected_total);
    assert_eq!(output.tables.total(), expected_total);

    let summary = fs::read_to_string(temp_dir.path().join("outputs/preprocessing_summary.txt")).unwrap();
    assert!(summary.contains(&format!("Duplicates removed: {}", expected_total)));
}

#[test]
fn test_per_class_test_counts_follow_proportional_share() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    let output = run(temp_dir.path(), vec![data]);
    let total: usize = CLASSES.iter().map(|(_, n)| n).sum();
    let test_total = holdout_count(total, 0.2);
    assert_eq!(output.tables.test.len(), test_total);

    let sizes: Vec<usize> = CLASSES.iter().map(|(_, n)| *n).collect();
    let quotas = allocate_largest_remainder(test_total, &sizes);
    let summary = output.tables.summary();

    for ((class, size), quota) in CLASSES.iter().zip(quotas) {
        let share = test_total as f64 * *size as f64 / total as f64;
        let actual = summary.per_class[*class].test;
        assert_eq!(actual, quota);
        assert!(actual == share.floor() as usize || actual == share.ceil() as usize);
    }
}

#[test]
fn test_reports_are_written() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    create_dataset(&data);

    run(temp_dir.path(), vec![data]);
    let outputs = temp_dir.path().join("outputs");

    for file in [
        "preprocessing_summary.txt",
        "class_distribution.txt",
        "preprocessing_summary.json",
    ] {
        assert!(outputs.join(file).is_file(), "missing {}", file);
    }
}

#[test]
fn test_no_valid_images_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    fs::create_dir_all(data.join("beagle")).unwrap();
    write_png(&data.join("beagle").join("small.png"), 5, 5, 0);

    let result = run_preprocess(&config_for(temp_dir.path(), vec![data]), false);
    assert!(matches!(result, Err(Error::Dataset(_))));
    assert!(!temp_dir.path().join("data/splits").exists());
}

#[test]
fn test_missing_root_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let config = config_for(temp_dir.path(), vec![temp_dir.path().join("absent")]);
    assert!(matches!(run_preprocess(&config, false), Err(Error::NotFound(_))));
}

#[test]
fn test_invalid_config_is_rejected_before_scanning() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = config_for(temp_dir.path(), vec![temp_dir.path().join("absent")]);
    config.split.test_size = 1.5;
    assert!(matches!(run_preprocess(&config, false), Err(Error::Config(_))));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_file_name_is_rejected_not_fatal() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = TempDir::new().unwrap();
    let data = temp_dir.path().join("pet_breeds");
    let class_dir = data.join("beagle");
    fs::create_dir_all(&class_dir).unwrap();
    for i in 0..10 {
        write_png(&class_dir.join(format!("{:03}.png", i)), 24, 16, i as u8);
    }
    write_png(&class_dir.join(OsStr::from_bytes(b"caf\xe9.png")), 24, 16, 0);

    let output = run(temp_dir.path(), vec![data]);

    assert_eq!(output.statistics.total_images, 10);
    assert_eq!(output.statistics.rejected["non_utf8_path"], 1);
    assert_eq!(output.tables.total(), 10);

    let tables = read_all_tables(&temp_dir.path().join("data/splits"));
    let rows: usize = tables.values().map(Vec::len).sum();
    assert_eq!(rows, 10);
    assert!(output.label_map_path.is_file());
}
