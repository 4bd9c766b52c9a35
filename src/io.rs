//! Safetensors I/O around the splitting core.
//!
//! Reader: parses an `epochs.safetensors` attribute file into an
//! [`EpochIndex`]. Writer: dumps generated dataset masks for a training
//! script to pick up.
//!
//! Epoch file layout:
//!
//! ```text
//! subject, session, label, trial          I32 [E]
//! subject_names, session_names,
//! label_names                             U8  newline-separated UTF-8
//! ```
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

use crate::dataset::Dataset;
use crate::epoch::EpochIndex;

// ── Low-level safetensors parser (raw bytes only, no tensor types) ────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let mut len = [0u8; 8];
    len.copy_from_slice(&bytes[..8]);
    let end = usize::try_from(u64::from_le_bytes(len))
        .ok()
        .and_then(|n| n.checked_add(8))
        .filter(|&end| end <= bytes.len())
        .context("safetensors header truncated")?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..end])
            .context("failed to parse safetensors header")?;
    Ok((header, end))
}

fn tensor_bytes<'a>(
    bytes: &'a [u8],
    data_start: usize,
    header: &HashMap<String, serde_json::Value>,
    name: &str,
    dtype: &str,
) -> Result<&'a [u8]> {
    let entry = header.get(name).with_context(|| format!("missing '{name}' key"))?;
    let got = entry["dtype"].as_str().unwrap_or("?");
    if got != dtype {
        bail!("'{name}' has dtype {got}, expected {dtype}");
    }
    let offsets = entry["data_offsets"]
        .as_array()
        .with_context(|| format!("'{name}' has no data_offsets"))?;
    let absolute = |k: usize| {
        offsets
            .get(k)
            .and_then(|v| v.as_u64())
            .and_then(|v| usize::try_from(v).ok())
            .and_then(|v| data_start.checked_add(v))
    };
    let (Some(s), Some(e)) = (absolute(0), absolute(1)) else {
        bail!("'{name}' has malformed data_offsets");
    };
    if s > e || e > bytes.len() {
        bail!("'{name}' points outside the file");
    }
    Ok(&bytes[s..e])
}

fn read_ids(
    bytes: &[u8],
    data_start: usize,
    header: &HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<Vec<usize>> {
    tensor_bytes(bytes, data_start, header, name, "I32")?
        .chunks_exact(4)
        .map(|b| {
            let v = i32::from_le_bytes([b[0], b[1], b[2], b[3]]);
            usize::try_from(v).with_context(|| format!("'{name}' holds negative id {v}"))
        })
        .collect()
}

fn read_names(
    bytes: &[u8],
    data_start: usize,
    header: &HashMap<String, serde_json::Value>,
    name: &str,
) -> Result<Vec<String>> {
    let raw = tensor_bytes(bytes, data_start, header, name, "U8")?;
    let text = std::str::from_utf8(raw).with_context(|| format!("'{name}' is not UTF-8"))?;
    Ok(text.split('\n').filter(|s| !s.is_empty()).map(String::from).collect())
}

// ── Reader ────────────────────────────────────────────────────────────────

/// Load an [`EpochIndex`] from an `epochs.safetensors` attribute file.
pub fn read_epoch_index(path: &Path) -> Result<EpochIndex> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let index = EpochIndex::new(
        read_ids(&bytes, data_start, &header, "subject")?,
        read_ids(&bytes, data_start, &header, "session")?,
        read_ids(&bytes, data_start, &header, "label")?,
        read_ids(&bytes, data_start, &header, "trial")?,
        read_names(&bytes, data_start, &header, "subject_names")?,
        read_names(&bytes, data_start, &header, "session_names")?,
        read_names(&bytes, data_start, &header, "label_names")?,
    )?;
    log::info!(
        "loaded {} epochs ({} subjects, {} sessions, {} labels) from {}",
        index.len(),
        index.subjects().len(),
        index.sessions().len(),
        index.labels().len(),
        path.display(),
    );
    Ok(index)
}

// ── Generic safetensors builder ───────────────────────────────────────────

/// Minimal safetensors writer for I32 and U8 tensors.
///
/// Usage:
/// ```rust,no_run
/// use exg_split::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_i32("subject", &[0, 0, 1], &[3]);
/// w.add_names("subject_names", &["s1".to_string(), "s2".to_string()]);
/// w.write(Path::new("/tmp/epochs.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn add_u8(&mut self, name: &str, data: Vec<u8>) {
        let shape = vec![data.len()];
        self.entries.push((name.to_string(), data, "U8", shape));
    }

    /// Newline-separated UTF-8 strings as a U8 tensor.
    pub fn add_names(&mut self, name: &str, names: &[String]) {
        self.add_u8(name, names.join("\n").into_bytes());
    }

    /// Header JSON padded with spaces to a multiple of 8 bytes.
    fn header(&self) -> Result<Vec<u8>> {
        let mut header = serde_json::Map::new();
        let mut offset = 0usize;
        for (name, data, dtype, shape) in &self.entries {
            let end = offset + data.len();
            let entry = serde_json::json!({ "dtype": dtype, "shape": shape, "data_offsets": [offset, end] });
            if header.insert(name.clone(), entry).is_some() {
                bail!("tensor '{name}' added twice");
            }
            offset = end;
        }
        let mut bytes = serde_json::to_vec(&header).context("serialising safetensors header")?;
        bytes.resize(bytes.len().next_multiple_of(8), b' ');
        Ok(bytes)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let header = self.header()?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        let mut out = std::io::BufWriter::new(file);
        let mut prefixed = (header.len() as u64).to_le_bytes().to_vec();
        prefixed.extend_from_slice(&header);
        out.write_all(&prefixed)
            .with_context(|| format!("writing header of {}", path.display()))?;
        for (name, data, _, _) in &self.entries {
            out.write_all(data)
                .with_context(|| format!("writing tensor '{name}' to {}", path.display()))?;
        }
        out.flush().with_context(|| format!("flushing {}", path.display()))
    }
}

// ── Writers ───────────────────────────────────────────────────────────────

fn ids_i32(index: &EpochIndex, f: impl Fn(usize) -> usize) -> Result<Vec<i32>> {
    (0..index.len())
        .map(|i| i32::try_from(f(i)).context("id does not fit in I32"))
        .collect()
}

/// Write an [`EpochIndex`] in the layout [`read_epoch_index`] expects.
pub fn write_epoch_index(index: &EpochIndex, path: &Path) -> Result<()> {
    let n = index.len();
    let mut w = StWriter::new();
    w.add_i32("subject", &ids_i32(index, |i| index.subject_of(i))?, &[n]);
    w.add_i32("session", &ids_i32(index, |i| index.session_of(i))?, &[n]);
    w.add_i32("label", &ids_i32(index, |i| index.label_of(i))?, &[n]);
    w.add_i32("trial", &ids_i32(index, |i| index.trial_of(i))?, &[n]);
    w.add_names("subject_names", index.subjects());
    w.add_names("session_names", index.sessions());
    w.add_names("label_names", index.labels());
    w.write(path)
}

/// Write generated masks to `masks.safetensors`.
///
/// Keys: `train_{i}`, `val_{i}`, `test_{i}` (U8 `[E]`, `1` = member),
/// `names` (newline-separated dataset names), `n_datasets` (I32 `[1]`).
pub fn write_datasets(datasets: &[Dataset], path: &Path) -> Result<()> {
    let mut w = StWriter::new();
    for (i, ds) in datasets.iter().enumerate() {
        w.add_u8(&format!("train_{i}"), ds.train_mask().to_bytes());
        w.add_u8(&format!("val_{i}"), ds.val_mask().to_bytes());
        w.add_u8(&format!("test_{i}"), ds.test_mask().to_bytes());
    }
    let names: Vec<String> = datasets.iter().map(|d| d.name().to_string()).collect();
    w.add_names("names", &names);
    w.add_i32("n_datasets", &[i32::try_from(datasets.len())?], &[1]);
    w.write(path)?;
    log::info!("wrote {} datasets to {}", datasets.len(), path.display());
    Ok(())
}
