use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use tracing::{error, info};

use warpget::build;
use warpget::cli::{self, Cli, Mode};
use warpget::config::Config;
use warpget::coordinator::{Downloader, ExecuteOutcome};
use warpget::error::{DownloadError, Result};
use warpget::progress::{IndicatifSink, NoopSink, ProgressSink};
use warpget::ratelimit::TokenBucket;
use warpget::{http, paths, planner, prober, resume, state, utils};

#[tokio::main]
async fn main() {
  utils::init_tracing();

  let mut cmd = Cli::command();
  let cli = Cli::parse();

  if let Some(shell) = cli.completion {
    cli::generate_completions("warpget", shell.as_ref(), &mut cmd);
    return;
  }

  info!("warpget v{}", build::PKG_VERSION);

  let config = match cli.into_config() {
    Ok(c) => c,
    Err(e) => fatal(e),
  };

  let result = match cli.mode() {
    Mode::Fresh(url) => run_fresh(&config, &url).await,
    Mode::Resume(task_or_url) => run_resume(&config, &task_or_url).await,
    Mode::Batch(path) => run_batch(&config, &path).await,
  };

  match result {
    Ok(()) => {},
    Err(DownloadError::Interrupted) => {
      info!("interrupted: checkpoint saved, re-run with --resume to continue");
    },
    Err(e) => fatal(e),
  }
}

fn fatal(e: DownloadError) -> ! {
  error!(severity = "FATAL", "{e}");
  std::process::exit(1);
}

async fn run_fresh(config: &Config, url: &str) -> Result<()> {
  let task_name = paths::task_name(url)?;
  let task_dir = paths::folder_of(&config.data_root, url)?;
  let client = http::build_client(config)?;

  info!(url, "probing capability");
  let probe = prober::probe(&client, url, config.workers).await?;
  info!(
    total_length = probe.total_length,
    range_supported = probe.range_supported,
    resumable = probe.resumable,
    parallelism = probe.parallelism,
    "probe complete"
  );

  let state = planner::plan(&task_dir, &task_name, url, probe.parallelism, probe.total_length)?;
  let cwd = std::env::current_dir()?;

  let outcome = run_plan(
    config,
    client,
    task_name,
    task_dir,
    url.to_string(),
    probe.total_length,
    probe.resumable,
    state.parts.len(),
    state.parts,
    &cwd,
  )
  .await?;

  report_success(&outcome);
  Ok(())
}

async fn run_resume(config: &Config, task_or_url: &str) -> Result<()> {
  let task_dir = paths::resolve_task_dir(&config.data_root, task_or_url)?;
  let state = resume::load(&task_dir)?;
  let total_length = state.parts.last().map(|p| p.range_to).unwrap_or(0);
  let task_name = paths::task_name(&state.url).unwrap_or_else(|_| task_or_url.to_string());
  let client = http::build_client(config)?;
  let cwd = std::env::current_dir()?;
  let url = state.url.clone();
  let parallelism = state.parts.len();

  let outcome = run_plan(
    config,
    client,
    task_name,
    task_dir,
    url,
    total_length,
    true,
    parallelism,
    state.parts,
    &cwd,
  )
  .await?;

  report_success(&outcome);
  Ok(())
}

async fn run_batch(config: &Config, list: &Path) -> Result<()> {
  let contents = std::fs::read_to_string(list)?;
  for line in contents.lines() {
    let url = line.trim();
    if url.is_empty() || url.starts_with('#') {
      continue;
    }
    if let Err(e) = run_fresh(config, url).await {
      error!(url, "batch entry failed: {e}");
    }
  }
  Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_plan(
  config: &Config,
  client: reqwest::Client,
  task_name: String,
  task_dir: PathBuf,
  url: String,
  total_length: u64,
  resumable: bool,
  parallelism: usize,
  parts: Vec<state::Part>,
  cwd: &Path,
) -> Result<ExecuteOutcome> {
  let last_index = parts.len().saturating_sub(1);
  let part_sizes: Vec<u64> = parts
    .iter()
    .map(|p| p.effective_range_to(total_length, last_index).saturating_sub(p.range_from) + 1)
    .collect();

  let progress: Arc<dyn ProgressSink> = if std::io::stderr().is_terminal() {
    Arc::new(IndicatifSink::new(&part_sizes))
  } else {
    Arc::new(NoopSink)
  };

  let downloader = Downloader {
    url,
    task_name,
    task_dir,
    parallelism,
    total_length,
    resumable,
    parts,
    proxy: config.proxy.clone(),
    skip_tls: config.skip_tls,
    shared_rate: config.rate.map(TokenBucket::shared),
    worker_rate: None,
    client,
    progress,
  };

  downloader.execute(cwd).await
}

fn report_success(outcome: &ExecuteOutcome) {
  info!(output = %outcome.output_path.display(), "done");
}
