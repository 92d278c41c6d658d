//! Part worker (component F): execute one ranged GET, stream to disk with
//! optional rate limiting, honor cancellation.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use reqwest::header::{ACCEPT, RANGE, USER_AGENT as USER_AGENT_HEADER};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::error::Result;
use crate::http::USER_AGENT;
use crate::ratelimit::TokenBucket;
use crate::state::Part;

/// What a worker reports back to the coordinator's single mailbox.
#[derive(Debug)]
pub enum WorkerEvent {
  /// Emitted only on uninterrupted completion: the coordinator must not
  /// assemble the output on a part that was cancelled.
  PartFileReady { index: usize, path: PathBuf },
  /// The worker's latest view of its part; a later update for the same
  /// index supersedes an earlier one.
  PartState { index: usize, part: Part },
  PartError { index: usize, error: crate::error::DownloadError },
}

pub struct WorkerInput {
  pub part: Part,
  pub total_length: u64,
  pub last_index: usize,
  pub parallelism: usize,
  pub client: Client,
  pub cancel: CancellationToken,
  pub shared_rate: Option<Arc<TokenBucket>>,
  pub worker_rate: Option<u64>,
  pub progress: Arc<dyn crate::progress::ProgressSink>,
}

/// Run a single part to completion, cancellation, or a fatal error, and
/// report the outcome on `events`.
#[instrument(skip(input, events), fields(index = input.part.index))]
pub async fn run_part(input: WorkerInput, events: tokio::sync::mpsc::Sender<WorkerEvent>) {
  let index = input.part.index;
  match run_part_inner(input).await {
    Ok(Outcome::Completed { updated, path }) => {
      let _ = events.send(WorkerEvent::PartState { index, part: updated }).await;
      let _ = events.send(WorkerEvent::PartFileReady { index, path }).await;
    },
    Ok(Outcome::Cancelled { updated }) => {
      let _ = events.send(WorkerEvent::PartState { index, part: updated }).await;
    },
    Err(error) => {
      let _ = events.send(WorkerEvent::PartError { index, error }).await;
    },
  }
}

enum Outcome {
  Completed { updated: Part, path: PathBuf },
  Cancelled { updated: Part },
}

async fn run_part_inner(input: WorkerInput) -> Result<Outcome> {
  let WorkerInput {
    mut part,
    total_length,
    last_index,
    parallelism,
    client,
    cancel,
    shared_rate,
    worker_rate,
    progress,
  } = input;

  let to_end = part.to_end(total_length, last_index);
  let effective_to = part.effective_range_to(total_length, last_index);

  if part.range_from >= effective_to {
    info!(index = part.index, "part already complete, skipping");
    return Ok(Outcome::Cancelled { updated: part });
  }

  let mut request = client.get(&part.url).header(ACCEPT, "*/*").header(USER_AGENT_HEADER, USER_AGENT);
  if parallelism > 1 {
    request = if to_end {
      request.header(RANGE, format!("bytes={}-", part.range_from))
    } else {
      request.header(RANGE, format!("bytes={}-{}", part.range_from, part.range_to))
    };
  }

  let response = request.send().await?;
  let mut file = OpenOptions::new().create(true).append(true).open(&part.path)?;

  let local_bucket = worker_rate.filter(|_| shared_rate.is_none()).map(TokenBucket::new);

  let mut stream = response.bytes_stream();
  let mut bytes_written: u64 = 0;

  loop {
    tokio::select! {
      biased;
      _ = cancel.cancelled() => {
        part.range_from += bytes_written;
        return Ok(Outcome::Cancelled { updated: part });
      }
      next = stream.next() => {
        match next {
          None => break,
          Some(chunk) => {
            let chunk = chunk?;
            file.write_all(&chunk)?;
            let n = chunk.len() as u64;
            bytes_written += n;
            progress.on_bytes(part.index, n);

            if let Some(bucket) = &shared_rate {
              bucket.acquire(n).await;
            } else if let Some(bucket) = &local_bucket {
              bucket.acquire(n).await;
            }
          }
        }
      }
    }
  }

  part.range_from += bytes_written;
  progress.on_part_done(part.index);
  Ok(Outcome::Completed { updated: part, path: part_path(&part) })
}

fn part_path(part: &Part) -> PathBuf {
  part.path.clone()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::progress::NoopSink;

  fn sample_part(from: u64, to: u64) -> Part {
    Part {
      index: 0,
      url: "https://example.com/f.bin".to_string(),
      path: std::env::temp_dir().join("warpget-worker-test.part"),
      range_from: from,
      range_to: to,
    }
  }

  #[tokio::test]
  async fn already_complete_part_short_circuits() {
    let part = sample_part(100, 100);
    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let input = WorkerInput {
      part,
      total_length: 1000,
      last_index: 3,
      parallelism: 4,
      client: reqwest::Client::new(),
      cancel: CancellationToken::new(),
      shared_rate: None,
      worker_rate: None,
      progress: Arc::new(NoopSink),
    };
    run_part(input, tx).await;
    match rx.recv().await.unwrap() {
      WorkerEvent::PartState { part, .. } => assert_eq!(part.range_from, 100),
      other => panic!("unexpected event: {other:?}"),
    }
    assert!(rx.recv().await.is_none());
  }
}
