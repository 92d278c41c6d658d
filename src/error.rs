use thiserror::Error;

/// The seven error kinds the engine can surface (spec §7).
///
/// Cancellation (`Interrupted`) is not a failure: the coordinator routes it
/// to the SAVING state and `main` exits 0 when a checkpoint was written.
#[derive(Error, Debug)]
pub enum DownloadError {
  #[error("config: {0}")]
  Config(String),

  #[error("security: {0}")]
  Security(String),

  #[error("network: {0}")]
  Network(#[from] reqwest::Error),

  #[error("protocol: {0}")]
  Protocol(String),

  #[error("state: {0}")]
  State(String),

  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("interrupted")]
  Interrupted,
}

impl From<url::ParseError> for DownloadError {
  fn from(e: url::ParseError) -> Self {
    DownloadError::Config(format!("invalid url: {e}"))
  }
}

pub type Result<T> = std::result::Result<T, DownloadError>;
