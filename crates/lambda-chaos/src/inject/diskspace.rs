use crate::config::model::{FailureFlag, FailurePayload};
use crate::telemetry::{self, Action};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// All fill files share this prefix so cleanup can locate them.
pub const FILE_PREFIX: &str = "diskspace-failure-";

const CHUNK_BYTES: usize = 1024 * 1024;
static FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Writes a zero-filled file of the configured size under `/tmp`. Write
/// failures are logged, never raised.
pub async fn fill(flag: &FailureFlag) {
    fill_in(Path::new("/tmp"), flag).await;
}

/// Removes every fill file under `/tmp`.
pub async fn clear() {
    clear_in(Path::new("/tmp")).await;
}

pub(crate) async fn fill_in(dir: &Path, flag: &FailureFlag) {
    let FailurePayload::DiskSpace { disk_space_mb } = &flag.payload else {
        return;
    };
    let path = unique_path(dir);
    match write_zeros(&path, *disk_space_mb).await {
        Ok(()) => telemetry::info(
            Action::Inject,
            json!({
                "mode": "diskspace",
                "size_mb": disk_space_mb,
                "path": path.display().to_string(),
            }),
        ),
        Err(e) => telemetry::error(
            Action::Error,
            json!({
                "mode": "diskspace",
                "message": "disk fill failed",
                "path": path.display().to_string(),
                "cause": e.to_string(),
            }),
        ),
    }
}

pub(crate) async fn clear_in(dir: &Path) {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return;
    };
    let mut removed = 0u32;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(FILE_PREFIX) {
            continue;
        }
        match fs::remove_file(entry.path()).await {
            Ok(()) => removed += 1,
            Err(e) => debug!("could not remove {name}: {e}"),
        }
    }
    if removed > 0 {
        telemetry::info(Action::Clear, json!({"mode": "diskspace", "removed": removed}));
    }
}

fn unique_path(dir: &Path) -> PathBuf {
    let sequence = FILE_COUNTER.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{FILE_PREFIX}{}-{sequence}.bin", std::process::id()))
}

async fn write_zeros(path: &Path, size_mb: u64) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    let chunk = vec![0u8; CHUNK_BYTES];
    for _ in 0..size_mb {
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}
