//! Range planner (component E): split `[0, total)` into N contiguous parts.

use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::state::{part_file_name, Part, State};

/// Emit `n` parts covering `[0, total)`. Part `i < n-1` gets
/// `range_from=(total/n)*i`, `range_to=(total/n)*(i+1)-1`; the last part's
/// `range_to` is the sentinel `total` ("through end-of-resource").
///
/// The task directory is created if missing.
pub fn plan(task_dir: &Path, task_name: &str, url: &str, n: usize, total: u64) -> Result<State> {
  fs::create_dir_all(task_dir)?;

  let n = n.max(1) as u64;
  let share = total / n;
  let mut parts = Vec::with_capacity(n as usize);

  for i in 0..n {
    let range_from = share * i;
    let range_to = if i == n - 1 { total } else { share * (i + 1) - 1 };
    parts.push(Part {
      index: i as usize,
      url: url.to_string(),
      path: task_dir.join(part_file_name(task_name, i as usize)),
      range_from,
      range_to,
    });
  }

  Ok(State { url: url.to_string(), parts })
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parts_cover_total_exactly_once() {
    let tmp = tempfile::tempdir().unwrap();
    let state = plan(tmp.path(), "f.bin", "https://example.com/f.bin", 4, 1000).unwrap();
    assert_eq!(state.parts.len(), 4);
    assert_eq!(state.parts[0].range_from, 0);
    for w in state.parts.windows(2) {
      assert_eq!(w[1].range_from, w[0].range_to + 1);
    }
    let last = state.parts.last().unwrap();
    assert_eq!(last.range_to, 1000);
  }

  #[test]
  fn intermediate_part_size_is_total_over_n() {
    let tmp = tempfile::tempdir().unwrap();
    let state = plan(tmp.path(), "f.bin", "https://example.com/f.bin", 4, 1000).unwrap();
    for part in &state.parts[..3] {
      assert_eq!(part.range_to - part.range_from + 1, 250);
    }
  }

  #[test]
  fn last_part_absorbs_remainder() {
    let tmp = tempfile::tempdir().unwrap();
    // 1003 / 4 = 250 remainder 3; last part should cover the extra 3 bytes.
    let state = plan(tmp.path(), "f.bin", "https://example.com/f.bin", 4, 1003).unwrap();
    let last = state.parts.last().unwrap();
    let last_len = last.range_to - last.range_from; // sentinel semantics: to-end, not inclusive-103
    assert_eq!(last.range_from, 750);
    assert_eq!(last_len, 253);
  }

  #[test]
  fn single_part_for_n_equal_one() {
    let tmp = tempfile::tempdir().unwrap();
    let state = plan(tmp.path(), "f.bin", "https://example.com/f.bin", 1, 500).unwrap();
    assert_eq!(state.parts.len(), 1);
    assert_eq!(state.parts[0].range_from, 0);
    assert_eq!(state.parts[0].range_to, 500);
  }

  #[test]
  fn part_paths_are_lexicographically_sorted_by_index() {
    let tmp = tempfile::tempdir().unwrap();
    let state = plan(tmp.path(), "f.bin", "https://example.com/f.bin", 12, 1200).unwrap();
    let mut sorted: Vec<_> = state.parts.iter().map(|p| p.path.clone()).collect();
    sorted.sort();
    let by_index: Vec<_> = state.parts.iter().map(|p| p.path.clone()).collect();
    assert_eq!(sorted, by_index);
  }
}
