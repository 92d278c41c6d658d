//! Download coordinator (component G): a single-threaded event loop over a
//! worker mailbox and a signal channel, deciding join vs. checkpoint.
//!
//! States: RUNNING, INTERRUPTING, JOINING, SAVING, DONE (spec §4.G). The
//! state machine itself is expressed as the control flow below rather than
//! an explicit enum, since every transition is taken at most once per run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use reqwest::Client;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{DownloadError, Result};
use crate::progress::ProgressSink;
use crate::ratelimit::TokenBucket;
use crate::state::{Part, State};
use crate::worker::{run_part, WorkerEvent, WorkerInput};

/// Ephemeral per-task runtime record (spec §3: never persisted).
pub struct Downloader {
  pub url: String,
  pub task_name: String,
  pub task_dir: PathBuf,
  pub parallelism: usize,
  pub total_length: u64,
  pub resumable: bool,
  pub parts: Vec<Part>,
  pub proxy: Option<String>,
  pub skip_tls: bool,
  pub shared_rate: Option<Arc<TokenBucket>>,
  pub worker_rate: Option<u64>,
  pub client: Client,
  pub progress: Arc<dyn ProgressSink>,
}

pub struct ExecuteOutcome {
  pub output_path: PathBuf,
}

impl Downloader {
  /// Launch one worker per (non-skipped) part, multiplex their events and
  /// the process's interrupt signal, and either join to `cwd` or checkpoint.
  pub async fn execute(self, cwd: &Path) -> Result<ExecuteOutcome> {
    let interrupt = CancellationToken::new();
    let signal_waiter = {
      let interrupt = interrupt.clone();
      tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        interrupt.cancel();
      })
    };
    let outcome = self.execute_with_interrupt(cwd, interrupt).await;
    signal_waiter.abort();
    outcome
  }

  /// Same as `execute`, but the caller supplies the token that signals
  /// `signal_received` (spec §4.G) instead of the OS's Ctrl-C, so tests can
  /// drive the interrupt/checkpoint path deterministically.
  pub async fn execute_with_interrupt(self, cwd: &Path, interrupt: CancellationToken) -> Result<ExecuteOutcome> {
    let n = self.parts.len();
    let last_index = n.saturating_sub(1);
    let (tx, mut rx) = mpsc::channel::<WorkerEvent>(n * 2 + 1);
    let cancel = CancellationToken::new();

    let mut handles = Vec::with_capacity(n);
    for part in self.parts.iter().cloned() {
      let input = WorkerInput {
        part,
        total_length: self.total_length,
        last_index,
        parallelism: self.parallelism,
        client: self.client.clone(),
        cancel: cancel.clone(),
        shared_rate: self.shared_rate.clone(),
        worker_rate: self.worker_rate,
        progress: Arc::clone(&self.progress),
      };
      handles.push(tokio::spawn(run_part(input, tx.clone())));
    }
    drop(tx);

    let mut latest: Vec<Option<Part>> = vec![None; n];
    let mut interrupted = false;

    loop {
      tokio::select! {
        biased;
        _ = interrupt.cancelled(), if !interrupted => {
          warn!("interrupt received, cancelling in-flight parts");
          interrupted = true;
          cancel.cancel();
        }
        event = rx.recv() => {
          match event {
            None => break,
            Some(WorkerEvent::PartError { index, error }) => {
              warn!(index, %error, "part failed, terminating task");
              cancel.cancel();
              for h in &handles {
                h.abort();
              }
              return Err(error);
            },
            Some(WorkerEvent::PartState { index, part }) => {
              latest[index] = Some(part);
            },
            // The file itself lives at the part's plan-time path regardless
            // of which branch produced it (streamed to completion here, or
            // already on disk from a prior run and short-circuited in
            // worker.rs without emitting this event at all); the join step
            // below reads paths from the part list rather than from this
            // event, so there's nothing to record beyond the state update
            // already carried by `PartState`.
            Some(WorkerEvent::PartFileReady { .. }) => {},
          }
        }
      }
    }

    for h in handles {
      let _ = h.await;
    }

    let final_parts: Vec<Part> = latest
      .into_iter()
      .enumerate()
      .map(|(i, updated)| updated.unwrap_or_else(|| self.parts[i].clone()))
      .collect();

    if interrupted {
      // SAVING: the joiner is never invoked once any cancellation was
      // observed.
      if self.resumable {
        let state = State { url: self.url.clone(), parts: final_parts };
        crate::state::save(&self.task_dir, &state)?;
        info!(dir = %self.task_dir.display(), "checkpoint saved");
      }
      return Err(DownloadError::Interrupted);
    }

    // JOINING: every part's file lives at its own known, plan-time path
    // (spec §3) — including a part that was already complete on disk before
    // this run started and so never produced a `PartFileReady` event at all
    // (spec §4.F) — so the join list comes from the part plan, not from
    // file-ready events.
    let paths: Vec<PathBuf> = self.parts.iter().map(|p| p.path.clone()).collect();
    let output_path = cwd.join(&self.task_name);
    crate::joiner::join(&paths, &output_path)?;
    std::fs::remove_dir_all(&self.task_dir)?;
    info!(output = %output_path.display(), "download complete");

    Ok(ExecuteOutcome { output_path })
  }
}
