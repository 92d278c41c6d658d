use std::path::PathBuf;

/// Settings threaded through every component instead of a process-wide
/// mutable global (spec §9 Design Notes).
#[derive(Debug, Clone)]
pub struct Config {
  /// Root directory under which each task gets its own subdirectory.
  pub data_root: PathBuf,
  /// Requested parallelism; the prober may force this down to 1.
  pub workers: usize,
  pub skip_tls: bool,
  /// `http[s]://host[:port]` for an HTTP proxy, or `host:port` for SOCKS5.
  pub proxy: Option<String>,
  /// Shared bytes-per-second cap across all parts of the task, if any.
  pub rate: Option<u64>,
}

impl Config {
  pub fn default_data_root() -> PathBuf {
    PathBuf::from(shellexpand::tilde("~/.warpget").to_string())
  }
}

impl Default for Config {
  fn default() -> Self {
    Self {
      data_root: Self::default_data_root(),
      workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
      skip_tls: false,
      proxy: None,
      rate: None,
    }
  }
}
