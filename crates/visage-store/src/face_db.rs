//! On-disk face database: one directory per label, `{label}_{i}` file
//! pairs (embedding JSON + image), and a per-label manifest that records
//! how many pairs have been committed.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use visage_core::FaceSample;

use crate::error::StoreError;

const MANIFEST_FILE: &str = "manifest.json";

/// Per-label manifest. The count here is the source of truth for index
/// allocation; directory listings are never counted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub label: String,
    pub count: usize,
    pub updated_at: String,
}

impl Manifest {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            count: 0,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Append-only store of deduplicated face samples keyed by label.
/// Existing enrollments are never overwritten; new samples get indices
/// continuing from the manifest count.
pub struct FaceDb {
    root: PathBuf,
    // Index allocation is the serialization point for concurrent commits
    // to the same label.
    label_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl FaceDb {
    /// Open (creating if needed) the database rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            label_locks: DashMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Commit a deduplicated run of samples under `label`.
    ///
    /// Returns the number of samples written. An empty run commits zero
    /// and is not an error. Each sample's embedding and image land
    /// together or not at all; the manifest only advances past pairs that
    /// are fully on disk, so a crash mid-commit can never make later
    /// indices collide.
    #[instrument(skip(self, samples), fields(count = samples.len()))]
    pub fn commit(&self, label: &str, samples: &[FaceSample]) -> Result<usize, StoreError> {
        let label = validate_label(label)?;
        if samples.is_empty() {
            return Ok(0);
        }

        let lock = self.lock_for(label);
        let _guard = lock.lock();

        let dir = self.root.join(label);
        fs::create_dir_all(&dir)?;

        let mut manifest = self.read_manifest_in(&dir, label)?;
        for sample in samples {
            let base = format!("{}_{}", label, manifest.count);
            write_pair(&dir, &base, sample)?;
            manifest.count += 1;
            manifest.updated_at = Utc::now().to_rfc3339();
            write_manifest(&dir, &manifest)?;
        }

        tracing::info!(label, written = samples.len(), total = manifest.count, "Committed face samples");
        Ok(samples.len())
    }

    /// Number of samples stored under `label` (0 if never enrolled).
    pub fn label_count(&self, label: &str) -> Result<usize, StoreError> {
        let label = validate_label(label)?;
        let dir = self.root.join(label);
        if !dir.exists() {
            return Ok(0);
        }
        Ok(self.read_manifest_in(&dir, label)?.count)
    }

    /// All labels with at least one committed sample.
    pub fn labels(&self) -> Result<Vec<String>, StoreError> {
        let mut labels = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    labels.push(name.to_string());
                }
            }
        }
        labels.sort();
        Ok(labels)
    }

    fn lock_for(&self, label: &str) -> Arc<Mutex<()>> {
        self.label_locks
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn read_manifest_in(&self, dir: &Path, label: &str) -> Result<Manifest, StoreError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(Manifest::new(label));
        }
        let raw = fs::read_to_string(&path)?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Manifest(format!("{}: {e}", path.display())))
    }
}

fn validate_label(label: &str) -> Result<&str, StoreError> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Err(StoreError::EmptyLabel);
    }
    if trimmed.contains(['/', '\\']) || trimmed == "." || trimmed == ".." {
        return Err(StoreError::InvalidLabel(trimmed.to_string()));
    }
    Ok(trimmed)
}

/// Write one embedding/image pair under `base`. Both files are staged to
/// temp names and renamed into place; any failure removes whatever was
/// staged so no orphaned half-pair survives.
fn write_pair(dir: &Path, base: &str, sample: &FaceSample) -> Result<(), StoreError> {
    let ext = sample.image.format.extension();
    let emb_path = dir.join(format!("{base}.emb.json"));
    let img_path = dir.join(format!("{base}.{ext}"));
    let emb_tmp = dir.join(format!(".{base}.emb.json.tmp"));
    let img_tmp = dir.join(format!(".{base}.{ext}.tmp"));

    let result = (|| -> Result<(), StoreError> {
        fs::write(&emb_tmp, serde_json::to_vec(&sample.embedding)?)?;
        fs::write(&img_tmp, &sample.image.bytes)?;
        fs::rename(&emb_tmp, &emb_path)?;
        fs::rename(&img_tmp, &img_path)?;
        Ok(())
    })();

    if result.is_err() {
        for path in [&emb_tmp, &img_tmp, &emb_path, &img_path] {
            let _ = fs::remove_file(path);
        }
    }
    result
}

fn write_manifest(dir: &Path, manifest: &Manifest) -> Result<(), StoreError> {
    let path = dir.join(MANIFEST_FILE);
    let tmp = dir.join(format!(".{MANIFEST_FILE}.tmp"));
    fs::write(&tmp, serde_json::to_vec_pretty(manifest)?)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}
