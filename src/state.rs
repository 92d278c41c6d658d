//! State store (component B): the per-task manifest and its on-disk form.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DownloadError, Result};

pub const STATE_FILE_NAME: &str = "state.json";
pub const PART_INDEX_WIDTH: usize = 6;

/// One contiguous byte range of the target resource, fetched by one worker
/// into one file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
  #[serde(rename = "Index")]
  pub index: usize,
  #[serde(rename = "URL")]
  pub url: String,
  #[serde(rename = "Path")]
  pub path: PathBuf,
  #[serde(rename = "RangeFrom")]
  pub range_from: u64,
  #[serde(rename = "RangeTo")]
  pub range_to: u64,
}

impl Part {
  /// Whether this part's request should be the open-ended `bytes=<from>-`
  /// form (spec §4.F / §9 Open Question #2: `to_end` is a derived flag, not
  /// a new wire field — `RangeTo` keeps serializing as `total_length`).
  pub fn to_end(&self, total_length: u64, last_index: usize) -> bool {
    self.index == last_index && self.range_to == total_length
  }

  /// The effective inclusive upper bound for arithmetic purposes: `RangeTo`
  /// for intermediate parts, `total_length - 1` for the sentinel last part.
  pub fn effective_range_to(&self, total_length: u64, last_index: usize) -> u64 {
    if self.to_end(total_length, last_index) {
      total_length.saturating_sub(1)
    } else {
      self.range_to
    }
  }
}

/// The persisted description of a task's URL and its parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
  #[serde(rename = "URL")]
  pub url: String,
  #[serde(rename = "Parts")]
  pub parts: Vec<Part>,
}

pub fn part_file_name(task_name: &str, index: usize) -> String {
  format!("{task_name}.part{index:0width$}", width = PART_INDEX_WIDTH)
}

/// Ensure the task directory exists, move any part file whose recorded path
/// is outside it into it (by basename), then write `state.json` with
/// owner-only-readable permissions.
pub fn save(task_dir: &Path, state: &State) -> Result<()> {
  fs::create_dir_all(task_dir)
    .map_err(|e| DownloadError::Io(std::io::Error::new(e.kind(), format!("creating {}: {e}", task_dir.display()))))?;

  for part in &state.parts {
    if part.path.parent() != Some(task_dir) {
      if let Some(basename) = part.path.file_name() {
        let dest = task_dir.join(basename);
        if part.path.exists() && part.path != dest {
          fs::rename(&part.path, &dest).map_err(|e| {
            DownloadError::Io(std::io::Error::new(
              e.kind(),
              format!("moving part {} into task dir: {e}", part.path.display()),
            ))
          })?;
        }
      }
    }
  }

  let path = task_dir.join(STATE_FILE_NAME);
  let json = serde_json::to_string_pretty(state)
    .map_err(|e| DownloadError::State(format!("serializing manifest: {e}")))?;
  fs::write(&path, json)
    .map_err(|e| DownloadError::Io(std::io::Error::new(e.kind(), format!("writing {}: {e}", path.display()))))?;

  let mut perms = fs::metadata(&path)?.permissions();
  perms.set_mode(0o600);
  fs::set_permissions(&path, perms)?;

  Ok(())
}

/// Load `<task_directory>/state.json`.
///
/// Fails with `StateError` naming the expected file if absent, and with
/// `StateError` if deserialization fails.
pub fn read(task_dir: &Path) -> Result<State> {
  let path = task_dir.join(STATE_FILE_NAME);
  if !path.exists() {
    return Err(DownloadError::State(format!(
      "no manifest at {} (nothing to resume)",
      path.display()
    )));
  }
  let contents = fs::read_to_string(&path)
    .map_err(|e| DownloadError::Io(std::io::Error::new(e.kind(), format!("reading {}: {e}", path.display()))))?;
  serde_json::from_str(&contents)
    .map_err(|e| DownloadError::State(format!("malformed manifest at {}: {e}", path.display())))
}
