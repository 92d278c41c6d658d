//! Joiner (component H): concatenate part files in sorted order into the
//! final output.

use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Sort `paths` lexicographically (the zero-padded part naming makes this
/// equal to index order), then stream each into `destination` in turn.
///
/// Empty parts are allowed and contribute zero bytes. If any source cannot
/// be opened, the whole join fails and the partially written destination is
/// left for the caller to clean up.
pub fn join(paths: &[PathBuf], destination: &Path) -> Result<()> {
  let mut sorted = paths.to_vec();
  sorted.sort();

  let mut out = File::create(destination)?;
  for path in &sorted {
    let mut reader = BufReader::new(File::open(path)?);
    io::copy(&mut reader, &mut out)?;
  }
  out.flush()?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn concatenates_parts_in_sorted_order() {
    let tmp = tempfile::tempdir().unwrap();
    let p0 = tmp.path().join("f.part000000");
    let p1 = tmp.path().join("f.part000001");
    fs::write(&p1, b"world").unwrap();
    fs::write(&p0, b"hello ").unwrap();
    let dest = tmp.path().join("out.bin");

    // Pass paths out of order; sort must still produce the right result.
    join(&[p1.clone(), p0.clone()], &dest).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"hello world");
  }

  #[test]
  fn empty_part_contributes_zero_bytes() {
    let tmp = tempfile::tempdir().unwrap();
    let p0 = tmp.path().join("f.part000000");
    let p1 = tmp.path().join("f.part000001");
    fs::write(&p0, b"abc").unwrap();
    fs::write(&p1, b"").unwrap();
    let dest = tmp.path().join("out.bin");
    join(&[p0, p1], &dest).unwrap();
    assert_eq!(fs::read(&dest).unwrap(), b"abc");
  }

  #[test]
  fn missing_source_fails_the_whole_join() {
    let tmp = tempfile::tempdir().unwrap();
    let p0 = tmp.path().join("f.part000000");
    fs::write(&p0, b"abc").unwrap();
    let missing = tmp.path().join("f.part000001");
    let dest = tmp.path().join("out.bin");
    assert!(join(&[p0, missing], &dest).is_err());
  }
}
