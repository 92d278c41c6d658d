//! Capability prober (component D): determine total length and range
//! support via HEAD, with a single-byte range GET fallback.

use reqwest::header::{ACCEPT, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use reqwest::{Client, StatusCode};

use crate::error::{DownloadError, Result};
use crate::http::USER_AGENT;

#[derive(Debug, Clone, Copy)]
pub struct Probe {
  pub total_length: u64,
  pub range_supported: bool,
  pub resumable: bool,
  /// Parallelism after the prober's forcing rules are applied; never
  /// exceeds the caller's requested value.
  pub parallelism: usize,
}

/// Run once per fresh download. No retries: any transport error aborts
/// probing and bubbles up as a `NetworkError`.
pub async fn probe(client: &Client, url: &str, requested_parallelism: usize) -> Result<Probe> {
  let head = client
    .head(url)
    .header(ACCEPT, "*/*")
    .header(reqwest::header::USER_AGENT, USER_AGENT)
    .send()
    .await?;

  let mut range_supported = head
    .headers()
    .get(ACCEPT_RANGES)
    .and_then(|v| v.to_str().ok())
    .map(|v| v.contains("bytes"))
    .unwrap_or(false);

  let mut total_length = content_length_if_positive(head.headers());

  if !range_supported || total_length.is_none() {
    let probe_get = client
      .get(url)
      .header(ACCEPT, "*/*")
      .header(reqwest::header::USER_AGENT, USER_AGENT)
      .header(RANGE, "bytes=0-0")
      .send()
      .await?;

    if probe_get.status() == StatusCode::PARTIAL_CONTENT {
      range_supported = true;
      total_length = Some(parse_content_range_total(probe_get.headers())?);
    } else {
      range_supported = false;
      if total_length.is_none() {
        total_length = content_length_if_positive(probe_get.headers());
      }
    }
  }

  let mut parallelism = requested_parallelism.max(1);
  // Resumable requires both a known length and range support (glossary):
  // without range support a resume would have to reissue a full, unranged
  // GET that appends a second copy onto the existing partial bytes.
  let resumable = range_supported && total_length.is_some();

  if !range_supported {
    parallelism = 1;
  }
  let total_length = match total_length {
    Some(len) => len,
    None => {
      // No real byte count to plan against. u64::MAX keeps the sentinel
      // "to end" arithmetic in `Part::effective_range_to` from underflowing
      // to zero and falsely looking already-complete at `range_from == 0`.
      parallelism = 1;
      u64::MAX
    },
  };

  Ok(Probe { total_length, range_supported, resumable, parallelism })
}

fn content_length_if_positive(headers: &reqwest::header::HeaderMap) -> Option<u64> {
  headers
    .get(CONTENT_LENGTH)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.parse::<u64>().ok())
    .filter(|&len| len > 0)
}

/// Parse the total length from the `/<total>` suffix of `Content-Range`.
fn parse_content_range_total(headers: &reqwest::header::HeaderMap) -> Result<u64> {
  let raw = headers
    .get(CONTENT_RANGE)
    .and_then(|v| v.to_str().ok())
    .ok_or_else(|| DownloadError::Protocol("206 response missing Content-Range".to_string()))?;
  let total = raw
    .rsplit('/')
    .next()
    .ok_or_else(|| DownloadError::Protocol(format!("unparseable Content-Range: {raw}")))?;
  total
    .parse::<u64>()
    .map_err(|_| DownloadError::Protocol(format!("unparseable Content-Range total: {raw}")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::header::{HeaderMap, HeaderValue};

  #[test]
  fn parses_content_range_total_suffix() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_RANGE, HeaderValue::from_static("bytes 0-0/262144"));
    assert_eq!(parse_content_range_total(&headers).unwrap(), 262144);
  }

  #[test]
  fn rejects_missing_content_range() {
    let headers = HeaderMap::new();
    assert!(parse_content_range_total(&headers).is_err());
  }

  #[test]
  fn content_length_zero_is_treated_as_unknown() {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    assert_eq!(content_length_if_positive(&headers), None);
  }
}
