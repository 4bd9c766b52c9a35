mod common;
use common::grid_index;
use exg_split::{
    read_epoch_index, write_datasets, write_epoch_index, DatasetGenerator, SplitUnit,
    SplittingConfig, StWriter, TestAxis, TestSplitter, TrainMode,
};
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("exg_split_{}_{name}", std::process::id()))
}

/// Parsed JSON header and the data section of a safetensors file.
fn header_of(path: &PathBuf) -> (serde_json::Value, Vec<u8>) {
    let bytes = std::fs::read(path).unwrap();
    let n = u64::from_le_bytes(bytes[..8].try_into().unwrap()) as usize;
    let header = serde_json::from_slice(&bytes[8..8 + n]).unwrap();
    (header, bytes[8 + n..].to_vec())
}

#[test]
fn epoch_index_survives_a_file() {
    let index = grid_index(3, 2, 5, 3);
    let path = scratch("epochs.safetensors");
    write_epoch_index(&index, &path).unwrap();
    let back = read_epoch_index(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(back.len(), index.len());
    assert_eq!(back.subjects(), index.subjects());
    assert_eq!(back.sessions(), index.sessions());
    assert_eq!(back.labels(), index.labels());
    for i in 0..index.len() {
        assert_eq!(back.subject_of(i), index.subject_of(i), "subject of {i}");
        assert_eq!(back.session_of(i), index.session_of(i), "session of {i}");
        assert_eq!(back.label_of(i), index.label_of(i), "label of {i}");
        assert_eq!(back.trial_of(i), index.trial_of(i), "trial of {i}");
    }
}

#[test]
fn dataset_masks_are_written_per_dataset() {
    let index = grid_index(2, 2, 3, 2);
    let cfg = SplittingConfig {
        train_mode: TrainMode::Individual,
        test_splitters: vec![TestSplitter::new(TestAxis::Session, SplitUnit::Number, "1")],
        val_splitters: vec![],
        ..SplittingConfig::default()
    };
    let datasets = DatasetGenerator::new(index.clone(), cfg)
        .generate()
        .unwrap()
        .into_datasets();

    let path = scratch("masks.safetensors");
    write_datasets(&datasets, &path).unwrap();
    let (header, data) = header_of(&path);
    std::fs::remove_file(&path).ok();

    for i in 0..datasets.len() {
        for key in ["train", "val", "test"] {
            let entry = &header[format!("{key}_{i}")];
            assert_eq!(entry["dtype"], "U8");
            assert_eq!(entry["shape"][0], index.len());
        }
    }
    let offsets = &header["test_0"]["data_offsets"];
    let (s, e) = (offsets[0].as_u64().unwrap() as usize, offsets[1].as_u64().unwrap() as usize);
    assert_eq!(&data[s..e], datasets[0].test_mask().to_bytes().as_slice());

    let names = &header["names"]["data_offsets"];
    let (s, e) = (names[0].as_u64().unwrap() as usize, names[1].as_u64().unwrap() as usize);
    assert_eq!(std::str::from_utf8(&data[s..e]).unwrap(), "Subject S00\nSubject S01");
}

#[test]
fn negative_ids_are_rejected() {
    let path = scratch("negative.safetensors");
    let mut w = StWriter::new();
    for key in ["subject", "session", "label", "trial"] {
        w.add_i32(key, &[0, -1], &[2]);
    }
    for key in ["subject_names", "session_names", "label_names"] {
        w.add_names(key, &["a".to_string()]);
    }
    w.write(&path).unwrap();
    let result = read_epoch_index(&path);
    std::fs::remove_file(&path).ok();

    let err = result.unwrap_err().to_string();
    assert!(err.contains("negative"), "{err}");
}

#[test]
fn missing_file_is_an_error() {
    assert!(read_epoch_index(&scratch("does_not_exist.safetensors")).is_err());
}

/// Read `bytes` back as an epoch file and return the error message.
fn read_error(name: &str, bytes: &[u8]) -> String {
    let path = scratch(name);
    std::fs::write(&path, bytes).unwrap();
    let result = read_epoch_index(&path);
    std::fs::remove_file(&path).ok();
    result.unwrap_err().to_string()
}

#[test]
fn oversized_header_length_is_an_error() {
    let mut bytes = u64::MAX.to_le_bytes().to_vec();
    bytes.extend_from_slice(b"{}      ");
    let err = read_error("huge_header.safetensors", &bytes);
    assert!(err.contains("truncated"), "{err}");
}

#[test]
fn overflowing_data_offsets_are_an_error() {
    let header = format!(
        r#"{{"subject":{{"dtype":"I32","shape":[1],"data_offsets":[{m},{m}]}}}}"#,
        m = u64::MAX
    );
    let mut bytes = (header.len() as u64).to_le_bytes().to_vec();
    bytes.extend_from_slice(header.as_bytes());
    bytes.extend_from_slice(&[0; 4]);
    let err = read_error("huge_offsets.safetensors", &bytes);
    assert!(err.contains("data_offsets"), "{err}");
}

#[test]
fn duplicate_tensor_names_are_refused() {
    let mut w = StWriter::new();
    w.add_u8("names", vec![1]);
    w.add_u8("names", vec![2]);
    let path = scratch("duplicate.safetensors");
    let err = w.write(&path).unwrap_err().to_string();
    assert!(err.contains("added twice"), "{err}");
    assert!(!path.exists());
}
