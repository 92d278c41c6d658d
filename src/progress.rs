//! Progress adapter (component M): the sink interface the core writes
//! through, and the two concrete implementations the CLI chooses between.

use std::sync::Arc;

use indicatif::{MultiProgress, MultiProgressAlignment, ProgressBar, ProgressStyle};

/// A writable progress sink per part (spec §1: one of the interfaces the
/// core consumes from its external collaborators).
pub trait ProgressSink: Send + Sync {
  fn on_bytes(&self, part_index: usize, delta: u64);
  fn on_part_done(&self, part_index: usize);
}

/// Used in tests and whenever output isn't a terminal.
pub struct NoopSink;

impl ProgressSink for NoopSink {
  fn on_bytes(&self, _part_index: usize, _delta: u64) {}

  fn on_part_done(&self, _part_index: usize) {}
}

/// One `indicatif` bar per part, styled after the teacher's per-item bars.
pub struct IndicatifSink {
  multi: MultiProgress,
  bars: Vec<ProgressBar>,
}

impl IndicatifSink {
  pub fn new(part_sizes: &[u64]) -> Self {
    let multi = MultiProgress::new();
    multi.set_alignment(MultiProgressAlignment::Top);
    let style = ProgressStyle::default_bar()
      .template("part {msg:>3} [{elapsed_precise}] [{bar:30.cyan/blue}] {bytes}/{total_bytes}")
      .unwrap_or_else(|_| ProgressStyle::default_bar())
      .progress_chars("+>-");

    let bars = part_sizes
      .iter()
      .enumerate()
      .map(|(i, &size)| {
        let pb = multi.add(ProgressBar::new(size));
        pb.set_style(style.clone());
        pb.set_message(format!("{i}"));
        pb
      })
      .collect();

    Self { multi, bars }
  }

  pub fn into_arc(self) -> Arc<Self> {
    Arc::new(self)
  }
}

impl ProgressSink for IndicatifSink {
  fn on_bytes(&self, part_index: usize, delta: u64) {
    if let Some(pb) = self.bars.get(part_index) {
      pb.inc(delta);
    }
  }

  fn on_part_done(&self, part_index: usize) {
    if let Some(pb) = self.bars.get(part_index) {
      pb.finish_with_message(format!("{part_index} done"));
    }
  }
}

impl Drop for IndicatifSink {
  fn drop(&mut self) {
    let _ = self.multi.clear();
  }
}
