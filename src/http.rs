//! HTTP client factory (component C).

use std::time::Duration;

use reqwest::{redirect, Client, Proxy};

use crate::config::Config;
use crate::error::{DownloadError, Result};

pub const USER_AGENT: &str = "curl/8.7.1";
const MAX_REDIRECTS: usize = 10;

/// Build a client honoring TLS-skip, an HTTP or SOCKS5 proxy, and sensible
/// timeouts (spec §4.C).
///
/// `reqwest` has no builder knob matching the Go/hyper notion of a
/// standalone TLS-handshake timeout or an expect-continue timeout; those
/// phases are folded into `connect_timeout` and the per-read `read_timeout`
/// respectively (see DESIGN.md).
pub fn build_client(config: &Config) -> Result<Client> {
  let mut builder = Client::builder()
    .connect_timeout(Duration::from_secs(30))
    .tcp_keepalive(Duration::from_secs(30))
    .read_timeout(Duration::from_secs(15))
    .pool_idle_timeout(Duration::from_secs(90))
    .gzip(true)
    .zstd(true)
    .redirect(redirect::Policy::limited(MAX_REDIRECTS))
    .danger_accept_invalid_certs(config.skip_tls);

  if let Some(proxy) = &config.proxy {
    let proxy = build_proxy(proxy)?;
    builder = builder.proxy(proxy);
  }

  builder
    .build()
    .map_err(|e| DownloadError::Config(format!("building http client: {e}")))
}

/// `http[s]://host[:port]` is an HTTP proxy URL; anything else is treated
/// as a `host:port` SOCKS5 endpoint.
fn build_proxy(proxy: &str) -> Result<Proxy> {
  if proxy.starts_with("http") {
    url::Url::parse(proxy).map_err(|e| DownloadError::Config(format!("invalid proxy url: {e}")))?;
    Proxy::all(proxy).map_err(|e| DownloadError::Config(format!("invalid proxy: {e}")))
  } else {
    let socks_url = format!("socks5://{proxy}");
    Proxy::all(&socks_url).map_err(|e| DownloadError::Config(format!("invalid socks5 proxy: {e}")))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn http_proxy_string_is_accepted() {
    assert!(build_proxy("http://proxy.example.com:8080").is_ok());
    assert!(build_proxy("https://proxy.example.com:8080").is_ok());
  }

  #[test]
  fn bare_host_port_is_treated_as_socks5() {
    assert!(build_proxy("127.0.0.1:1080").is_ok());
  }

  #[test]
  fn client_builds_with_defaults() {
    let config = Config::default();
    assert!(build_client(&config).is_ok());
  }
}
