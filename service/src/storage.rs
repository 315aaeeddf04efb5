use crate::models::ResultSet;
use parser::write_ndjson;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: parser::ParseError,
    },
    #[error("failed to replace {}: {source}", .path.display())]
    Replace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Temp file next to the target, so the final rename stays on one filesystem.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write the result set as NDJSON in row order.
///
/// The file is written and synced under a temporary name, then renamed over
/// `path`. A failed write leaves any previous file at `path` untouched.
pub fn write_results(results: &ResultSet, path: &Path) -> Result<usize, OutputError> {
    let tmp_path = temp_path(path);
    debug!("Writing {} records to {}", results.len(), tmp_path.display());

    let written = match write_synced(results, &tmp_path) {
        Ok(written) => written,
        Err(source) => {
            discard(&tmp_path);
            return Err(OutputError::Write {
                path: tmp_path,
                source,
            });
        }
    };

    if let Err(source) = fs::rename(&tmp_path, path) {
        discard(&tmp_path);
        return Err(OutputError::Replace {
            path: path.to_path_buf(),
            source,
        });
    }

    info!("Wrote {} records to {}", written, path.display());
    Ok(written)
}

fn write_synced(results: &ResultSet, path: &Path) -> Result<usize, parser::ParseError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = write_ndjson(results.records(), &mut writer)?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    Ok(written)
}

fn discard(tmp_path: &Path) {
    if tmp_path.exists() {
        if let Err(e) = fs::remove_file(tmp_path) {
            warn!("Failed to remove temp file {}: {}", tmp_path.display(), e);
        }
    }
}
