//! Blocking HTTP transport with per-request timeout and bounded retry.
//!
//! The pipeline only sees the [`Transport`] trait; [`HttpTransport`] is the
//! `ureq` implementation used by the binaries.

use std::io::Read;
use std::thread;
use std::time::Duration;

use crate::error::FetchError;

/// Upper bound for a downloaded archive.
const MAX_ARCHIVE_BYTES: u64 = 512 * 1024 * 1024;

/// Network reads used by search and acquisition.
pub trait Transport: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError>;

    fn fetch_bytes(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, FetchError>;
}

/// Retry schedule for retryable fetch errors: `retries` extra attempts,
/// waiting `backoff`, then twice that, and so on.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Duration::ZERO,
        }
    }

    /// Run `attempt` until it succeeds, fails with a non-retryable error,
    /// or the retries are used up.
    pub fn run<T>(
        &self,
        url: &str,
        mut attempt: impl FnMut() -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let mut wait = self.backoff;
        let mut tries_left = self.retries;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(err) if tries_left > 0 && err.is_retryable() => {
                    log::debug!(
                        "retrying {} in {:.1}s after error: {}",
                        url,
                        wait.as_secs_f64(),
                        err
                    );
                    thread::sleep(wait);
                    wait *= 2;
                    tries_left -= 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

// ============================================================================
// ureq implementation
// ============================================================================

pub struct HttpTransport {
    agent: ureq::Agent,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn new(user_agent: &str, timeout: Duration, retry: RetryPolicy) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .build();
        Self { agent, retry }
    }

    fn get(&self, url: &str, headers: &[(&str, &str)]) -> Result<ureq::Response, FetchError> {
        let mut request = self.agent.get(url);
        for (name, value) in headers {
            request = request.set(name, value);
        }
        log::debug!("GET {}", url);
        request.call().map_err(|err| classify(url, err))
    }
}

impl Transport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        self.retry.run(url, || {
            self.get(url, &[])?
                .into_string()
                .map_err(|source| body_error(url, source))
        })
    }

    fn fetch_bytes(&self, url: &str, headers: &[(&str, &str)]) -> Result<Vec<u8>, FetchError> {
        self.retry.run(url, || {
            let response = self.get(url, headers)?;
            read_capped(response.into_reader(), MAX_ARCHIVE_BYTES, url)
        })
    }
}

/// Read a whole body, failing instead of truncating when it exceeds `limit`.
fn read_capped(reader: impl Read, limit: u64, url: &str) -> Result<Vec<u8>, FetchError> {
    let mut bytes = Vec::new();
    reader
        .take(limit + 1)
        .read_to_end(&mut bytes)
        .map_err(|source| body_error(url, source))?;
    if bytes.len() as u64 > limit {
        let source = std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("body larger than {} bytes", limit),
        );
        return Err(body_error(url, source));
    }
    Ok(bytes)
}

/// Map a `ureq` failure onto the fetch error taxonomy.
pub(crate) fn classify(url: &str, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Status(status, _) => FetchError::Status {
            url: url.to_string(),
            status,
        },
        ureq::Error::Transport(transport) => {
            let timed_out = std::error::Error::source(&transport)
                .and_then(|source| source.downcast_ref::<std::io::Error>())
                .is_some_and(|io| is_timeout(io.kind()));
            if timed_out {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Transport {
                    url: url.to_string(),
                    message: transport.to_string(),
                }
            }
        }
    }
}

fn body_error(url: &str, source: std::io::Error) -> FetchError {
    if is_timeout(source.kind()) {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Body {
            url: url.to_string(),
            source,
        }
    }
}

fn is_timeout(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn quick(retries: u32) -> RetryPolicy {
        RetryPolicy {
            retries,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_retry_until_success() {
        let calls = Cell::new(0);
        let result = quick(2).run("u", || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(FetchError::Timeout { url: "u".to_string() })
            } else {
                Ok("body")
            }
        });
        assert_eq!(result.unwrap(), "body");
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_retry_gives_up() {
        let calls = Cell::new(0);
        let result: Result<(), _> = quick(1).run("u", || {
            calls.set(calls.get() + 1);
            Err(FetchError::Timeout { url: "u".to_string() })
        });
        assert!(matches!(result, Err(FetchError::Timeout { .. })));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_client_error_not_retried() {
        let calls = Cell::new(0);
        let result: Result<(), _> = quick(3).run("u", || {
            calls.set(calls.get() + 1);
            Err(FetchError::Status {
                url: "u".to_string(),
                status: 404,
            })
        });
        assert!(result.is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_read_capped_accepts_body_at_limit() {
        let bytes = read_capped(&b"12345"[..], 5, "u").unwrap();
        assert_eq!(bytes, b"12345");
    }

    #[test]
    fn test_read_capped_rejects_oversized_body() {
        let err = read_capped(&b"123456"[..], 5, "u").unwrap_err();
        assert!(matches!(err, FetchError::Body { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_timed_out_body_is_retryable_timeout() {
        for kind in [std::io::ErrorKind::TimedOut, std::io::ErrorKind::WouldBlock] {
            let err = body_error("u", std::io::Error::new(kind, "slow"));
            assert!(matches!(err, FetchError::Timeout { .. }));
            assert!(err.is_retryable());
        }
    }

    #[test]
    fn test_other_body_errors_stay_body_errors() {
        let err = body_error("u", std::io::Error::new(std::io::ErrorKind::ConnectionReset, "x"));
        assert!(matches!(err, FetchError::Body { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_no_retry_policy() {
        let calls = Cell::new(0);
        let _: Result<(), _> = RetryPolicy::none().run("u", || {
            calls.set(calls.get() + 1);
            Err(FetchError::Timeout { url: "u".to_string() })
        });
        assert_eq!(calls.get(), 1);
    }
}
