//! Atomic checkpoint persistence (spec §4.5/§6). A checkpoint captures
//! enough frontier state to resume a stopped run without re-discovering
//! already-visited papers. Writes go to a temp file in the same directory
//! then `rename` over the target, so a crash mid-write never leaves a
//! corrupt checkpoint behind.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use litgraph_common::config::RunConfig;
use litgraph_common::PaperId;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Bumped whenever the checkpoint's on-disk shape changes incompatibly.
/// A checkpoint written with a different version is treated as absent
/// rather than partially trusted.
pub const CHECKPOINT_SCHEMA_VERSION: u32 = 1;

/// On-disk checkpoint format (spec §6): a monotonic run id, the schema
/// version, an echo of the `start` config, the frontier state needed to
/// resume, and the time this file was written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Checkpoint {
    pub run_id: String,
    pub schema_version: u32,
    pub config: RunConfig,
    pub visited: Vec<PaperId>,
    pub pending: Vec<(PaperId, u32)>,
    pub papers_persisted: usize,
    pub papers_failed: usize,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: String,
        config: RunConfig,
        visited: Vec<PaperId>,
        pending: Vec<(PaperId, u32)>,
        papers_persisted: usize,
        papers_failed: usize,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { run_id, schema_version: CHECKPOINT_SCHEMA_VERSION, config, visited, pending, papers_persisted, papers_failed, created_at }
    }
}

pub async fn save(path: &Path, checkpoint: &Checkpoint) -> std::io::Result<()> {
    let json = serde_json::to_vec_pretty(checkpoint).expect("checkpoint serialization is infallible");
    let tmp_path = tmp_path_for(path);
    tokio::fs::write(&tmp_path, json).await?;
    tokio::fs::rename(&tmp_path, path).await?;
    info!(path = %path.display(), papers_persisted = checkpoint.papers_persisted, "wrote checkpoint");
    Ok(())
}

/// Load a checkpoint, if present and written with a compatible schema
/// version. A missing file or a version mismatch both return `Ok(None)` —
/// the caller starts fresh in either case.
pub async fn load(path: &Path) -> std::io::Result<Option<Checkpoint>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    let checkpoint: Checkpoint = match serde_json::from_slice(&bytes) {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "checkpoint file is not valid JSON, ignoring");
            return Ok(None);
        }
    };
    if checkpoint.schema_version != CHECKPOINT_SCHEMA_VERSION {
        warn!(
            found = checkpoint.schema_version,
            expected = CHECKPOINT_SCHEMA_VERSION,
            "checkpoint schema version mismatch, starting fresh"
        );
        return Ok(None);
    }
    Ok(Some(checkpoint))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_config() -> RunConfig {
        RunConfig {
            seeds: vec!["a".to_string()],
            max_depth: 2,
            max_papers: None,
            max_fanout_per_paper: 20,
            analyze_enabled: true,
            embed_enabled: true,
            use_metadata: true,
            use_full_text: false,
            stage_worker_counts: Default::default(),
            queue_capacities: Default::default(),
            checkpoint_every_n: 500,
            resume: false,
        }
    }

    #[tokio::test]
    async fn round_trips_through_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let checkpoint = Checkpoint::new(
            "run-1".to_string(),
            test_config(),
            vec![PaperId::new("a")],
            vec![(PaperId::new("b"), 1)],
            3,
            1,
            Utc::now(),
        );

        save(&path, &checkpoint).await.unwrap();
        let loaded = load(&path).await.unwrap();
        assert_eq!(loaded, Some(checkpoint));
    }

    #[tokio::test]
    async fn missing_file_yields_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        assert_eq!(load(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn version_mismatch_is_treated_as_absent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let mut checkpoint = Checkpoint::new("run-1".to_string(), test_config(), vec![], vec![], 0, 0, Utc::now());
        checkpoint.schema_version = CHECKPOINT_SCHEMA_VERSION + 1;
        save(&path, &checkpoint).await.unwrap();
        assert_eq!(load(&path).await.unwrap(), None);
    }

    #[tokio::test]
    async fn no_tmp_file_left_behind_after_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("checkpoint.json");
        let checkpoint = Checkpoint::new("run-1".to_string(), test_config(), vec![], vec![], 0, 0, Utc::now());
        save(&path, &checkpoint).await.unwrap();
        assert!(!tmp_path_for(&path).exists());
        assert!(path.exists());
    }
}
