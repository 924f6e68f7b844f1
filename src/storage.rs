//! Whole-file persistence.
//!
//! Every mutation writes a complete file: bytes go to a uniquely named
//! temp file next to the target, then rename into place. The rename is
//! atomic on POSIX, so concurrent writers to one table degrade to
//! last-writer-wins instead of interleaved partial content.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use crate::error::EngineError;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Replace `path` with `bytes` via temp-file-and-rename.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), EngineError> {
    let tmp = tmp_sibling(path);
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

/// A temp path in the target's directory, unique within the process so
/// interleaved writers never collide on the staging file.
fn tmp_sibling(path: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut name = path
        .file_name()
        .map(|f| f.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}.tmp", std::process::id(), n));
    path.with_file_name(name)
}
