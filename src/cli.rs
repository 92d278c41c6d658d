//! CLI adapter (component K): argument parsing, run-mode selection, and
//! `Config` construction. A thin layer over the core (spec §1).

use std::path::PathBuf;

use clap::Parser;
use clap_complete::{generate, shells};

use crate::config::Config;
use crate::ratelimit::parse_rate;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shell {
  Bash,
  Zsh,
  Fish,
  Powershell,
  Elvish,
}

impl AsRef<str> for Shell {
  fn as_ref(&self) -> &str {
    match self {
      Shell::Bash => "bash",
      Shell::Zsh => "zsh",
      Shell::Fish => "fish",
      Shell::Powershell => "powershell",
      Shell::Elvish => "elvish",
    }
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  author = env!("CARGO_PKG_AUTHORS"),
  name = "warpget",
  version=crate::build::CLAP_LONG_VERSION,
  about="A concurrent, resumable, byte-range accelerated HTTP(S) downloader",
  long_about = None,
)]
pub struct Cli {
  /// URL of the resource to download (omit when using --resume, --file, or
  /// --completion).
  #[arg(required_unless_present_any = ["resume", "file", "completion"])]
  pub url: Option<String>,

  #[arg(short = 'n', long = "parallel", default_value_t = default_workers(), help = "Number of concurrent range workers")]
  pub parallel: usize,

  #[arg(long = "skip-tls", default_value_t = false, help = "Disable TLS certificate verification")]
  pub skip_tls: bool,

  #[arg(long, help = "http[s]://host[:port] HTTP proxy, or host:port SOCKS5 proxy")]
  pub proxy: Option<String>,

  #[arg(long, help = "Bandwidth cap, e.g. 100kB or 10MiB")]
  pub rate: Option<String>,

  #[arg(long, help = "Resume a previously interrupted task by name or URL")]
  pub resume: Option<String>,

  #[arg(long, help = "Newline-separated URL list, processed serially")]
  pub file: Option<PathBuf>,

  #[arg(long, help = "Root directory for task working directories")]
  pub data_root: Option<PathBuf>,

  #[arg(long, alias = "compl", help = "Shell to generate completion script for")]
  pub completion: Option<Shell>,
}

fn default_workers() -> usize {
  std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// What `main` should do with a parsed `Cli`.
pub enum Mode {
  Fresh(String),
  Resume(String),
  Batch(PathBuf),
}

impl Cli {
  pub fn mode(&self) -> Mode {
    if let Some(task_or_url) = &self.resume {
      Mode::Resume(task_or_url.clone())
    } else if let Some(path) = &self.file {
      Mode::Batch(path.clone())
    } else {
      Mode::Fresh(self.url.clone().unwrap_or_default())
    }
  }

  pub fn into_config(&self) -> crate::error::Result<Config> {
    let data_root = match &self.data_root {
      Some(raw) => PathBuf::from(shellexpand::tilde(&raw.to_string_lossy()).to_string()),
      None => Config::default_data_root(),
    };
    Ok(Config {
      data_root,
      workers: self.parallel.max(1),
      skip_tls: self.skip_tls,
      proxy: self.proxy.clone(),
      rate: self.rate.as_deref().map(parse_rate).transpose()?,
    })
  }
}

/// Generate shell completions for the CLI (unchanged from the teacher).
pub fn generate_completions<S: AsRef<str>>(bin_name: S, shell: S, cmd: &mut clap::Command) {
  match shell.as_ref().to_lowercase().as_str() {
    "bash" => generate(shells::Bash, cmd, bin_name.as_ref(), &mut std::io::stdout()),
    "zsh" => generate(shells::Zsh, cmd, bin_name.as_ref(), &mut std::io::stdout()),
    "fish" => generate(shells::Fish, cmd, bin_name.as_ref(), &mut std::io::stdout()),
    "powershell" => generate(shells::PowerShell, cmd, bin_name.as_ref(), &mut std::io::stdout()),
    "elvish" => generate(shells::Elvish, cmd, bin_name.as_ref(), &mut std::io::stdout()),
    _ => println!("Unsupported shell {}", shell.as_ref()),
  }
}
