//! Resume loader (component I): load state, then rewind each part's start
//! offset by the size of its existing on-disk slice.

use crate::error::Result;
use crate::state::{self, Part, State};

/// Load the manifest for `task_dir` and adjust each part's `range_from` to
/// `min(range_from + on_disk_size, effective_end)`. Parts whose on-disk
/// file is absent are left unchanged.
///
/// The manifest's own `range_from` is never trusted as the resume point by
/// itself (spec §9 Open Question #1) — only the recomputed, file-size-based
/// value is used going forward; `range_to`/`url`/`path` are carried as-is.
pub fn load(task_dir: &std::path::Path) -> Result<State> {
  let mut loaded = state::read(task_dir)?;
  let total_length = loaded.parts.last().map(|p| p.range_to).unwrap_or(0);
  let last_index = loaded.parts.len().saturating_sub(1);

  for part in &mut loaded.parts {
    rewind(part, total_length, last_index);
  }
  Ok(loaded)
}

fn rewind(part: &mut Part, total_length: u64, last_index: usize) {
  let Ok(metadata) = std::fs::metadata(&part.path) else { return };
  let on_disk = metadata.len();
  let effective_end = part.effective_range_to(total_length, last_index);
  part.range_from = (part.range_from + on_disk).min(effective_end);
}
