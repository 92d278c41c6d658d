//! Path & URL utilities (component A): derive a safe per-task directory
//! under the configured data root and reject directory traversal.

use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{DownloadError, Result};

/// A URL is valid only if it parses and carries a non-empty scheme and host
/// (spec §9, closing Open Question).
pub fn ensure_valid_url(url: &str) -> Result<Url> {
  let parsed = Url::parse(url)?;
  if parsed.scheme().is_empty() {
    return Err(DownloadError::Config(format!("url has no scheme: {url}")));
  }
  if parsed.host_str().is_none_or(str::is_empty) {
    return Err(DownloadError::Config(format!("url has no host: {url}")));
  }
  Ok(parsed)
}

/// Derive the task name from the final path segment of `url`.
///
/// Rejects any occurrence of the substring `..` anywhere in the raw path
/// before normalizing, trims trailing separators, and returns the final
/// element. Never returns a value containing a path separator or `..`
/// (spec §8) — a segment merely *containing* `..` (e.g. `weird..name.bin`)
/// is rejected just like a bare `..` segment, since either would leak the
/// substring into the returned name.
pub fn task_name(url: &str) -> Result<String> {
  let parsed = ensure_valid_url(url)?;
  let raw_path = parsed.path();
  if raw_path.contains("..") {
    return Err(DownloadError::Security(format!(
      "path traversal in url path: {raw_path}"
    )));
  }
  let trimmed = raw_path.trim_end_matches('/');
  let name = trimmed.rsplit('/').next().unwrap_or("");
  if name.is_empty() {
    return Err(DownloadError::Config(format!(
      "url has no final path segment: {url}"
    )));
  }
  Ok(name.to_string())
}

/// Join `home/data_root/task_name(url)`, canonicalize it, and verify it is
/// a strict descendant of `home/data_root`.
///
/// Fails with `SecurityError` when the relative path from the root would
/// escape it, without creating any directory.
pub fn folder_of(data_root: &Path, url: &str) -> Result<PathBuf> {
  join_under_root(data_root, &task_name(url)?)
}

/// Same containment check as `folder_of`, but for a bare task name rather
/// than one derived from a URL (used by `-resume <task-or-url>` when given
/// a task name).
pub fn folder_of_name(data_root: &Path, name: &str) -> Result<PathBuf> {
  if name.split('/').any(|seg| seg == "..") || name.is_empty() {
    return Err(DownloadError::Security(format!("invalid task name: {name}")));
  }
  join_under_root(data_root, name)
}

/// `-resume <task-or-url>`: try it as a URL first, fall back to a bare
/// task name.
pub fn resolve_task_dir(data_root: &Path, task_or_url: &str) -> Result<PathBuf> {
  if ensure_valid_url(task_or_url).is_ok() {
    folder_of(data_root, task_or_url)
  } else {
    folder_of_name(data_root, task_or_url)
  }
}

fn join_under_root(data_root: &Path, name: &str) -> Result<PathBuf> {
  // The task directory may not exist yet; canonicalize the deepest existing
  // ancestor and rebuild the tail so a still-to-be-created path is checked
  // the same way a canonicalized one would be.
  let root = canonicalize_best_effort(data_root);
  let joined = root.join(name);

  let rel = joined.strip_prefix(&root).map_err(|_| {
    DownloadError::Security(format!("task directory escapes data root: {}", joined.display()))
  })?;
  if rel.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
    return Err(DownloadError::Security(format!(
      "task directory escapes data root: {}",
      joined.display()
    )));
  }
  Ok(joined)
}

fn canonicalize_best_effort(path: &Path) -> PathBuf {
  path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn task_name_extracts_final_segment() {
    assert_eq!(task_name("https://example.com/dir/file.tar.gz").unwrap(), "file.tar.gz");
  }

  #[test]
  fn task_name_strips_query_and_fragment() {
    assert_eq!(
      task_name("https://example.com/a/b/file.iso?x=1#frag").unwrap(),
      "file.iso"
    );
  }

  #[test]
  fn task_name_trims_trailing_slash() {
    assert_eq!(task_name("https://example.com/dir/file/").unwrap(), "file");
  }

  #[test]
  fn task_name_rejects_traversal() {
    let err = task_name("https://example.com/../etc/passwd").unwrap_err();
    assert!(matches!(err, DownloadError::Security(_)));
  }

  #[test]
  fn task_name_never_contains_separator_or_dotdot() {
    for url in ["https://example.com/a/b/c.bin", "https://example.com/single"] {
      let name = task_name(url).unwrap();
      assert!(!name.contains('/'));
      assert!(!name.contains(".."));
    }
  }

  #[test]
  fn task_name_rejects_embedded_dotdot_substring() {
    // Not a traversal segment on its own, but letting it through would leak
    // the `..` substring into the returned task name (spec §8).
    let err = task_name("https://example.com/weird..name.bin").unwrap_err();
    assert!(matches!(err, DownloadError::Security(_)));
  }

  #[test]
  fn folder_of_rejects_traversal_without_creating_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    let err = folder_of(&root, "https://example.com/../escape").unwrap_err();
    assert!(matches!(err, DownloadError::Security(_)));
    assert!(!root.exists());
  }

  #[test]
  fn folder_of_is_descendant_of_root() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    std::fs::create_dir_all(&root).unwrap();
    let dir = folder_of(&root, "https://example.com/file.bin").unwrap();
    assert!(dir.starts_with(root.canonicalize().unwrap()));
  }

  #[test]
  fn invalid_url_missing_scheme_or_host_rejected() {
    assert!(ensure_valid_url("not a url").is_err());
    assert!(ensure_valid_url("file:///etc/passwd").is_err());
  }

  #[test]
  fn folder_of_name_rejects_traversal() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    let err = folder_of_name(&root, "../escape").unwrap_err();
    assert!(matches!(err, DownloadError::Security(_)));
    assert!(!root.exists());
  }

  #[test]
  fn folder_of_name_rejects_embedded_traversal_segment() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    let err = folder_of_name(&root, "a/../../escape").unwrap_err();
    assert!(matches!(err, DownloadError::Security(_)));
  }

  #[test]
  fn folder_of_name_accepts_plain_name() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    std::fs::create_dir_all(&root).unwrap();
    let dir = folder_of_name(&root, "file.bin").unwrap();
    assert!(dir.starts_with(root.canonicalize().unwrap()));
  }

  #[test]
  fn resolve_task_dir_dispatches_on_url_validity() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().join("data");
    std::fs::create_dir_all(&root).unwrap();

    let by_url = resolve_task_dir(&root, "https://example.com/file.bin").unwrap();
    assert_eq!(by_url, folder_of(&root, "https://example.com/file.bin").unwrap());

    let by_name = resolve_task_dir(&root, "file.bin").unwrap();
    assert_eq!(by_name, folder_of_name(&root, "file.bin").unwrap());
  }
}
