use std::time::Duration;

use anyhow::{Context as _, anyhow};
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use url::Url;

/// How a throttled page download is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: usize,
    pub first_backoff: Duration,
    /// Upper bound for any single wait, `Retry-After` included.
    pub max_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            first_backoff: Duration::from_millis(250),
            max_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn wait(&self, headers: &HeaderMap, backoff: Duration) -> Duration {
        retry_after_duration(headers)
            .unwrap_or(backoff)
            .min(self.max_wait)
    }

    fn next_backoff(&self, backoff: Duration) -> Duration {
        (backoff * 2).min(self.max_wait)
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::SERVICE_UNAVAILABLE
}

/// Downloads the rendered post page that gets enhanced.
pub struct PageFetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(user_agent: &str, policy: RetryPolicy) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .context("build reqwest client")?;
        Ok(Self { client, policy })
    }

    pub async fn fetch_page(&self, url: &Url) -> anyhow::Result<String> {
        let attempts = self.policy.attempts.max(1);
        let mut backoff = self.policy.first_backoff;
        let mut last_status = None;

        for attempt in 1..=attempts {
            let resp = self
                .client
                .get(url.clone())
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;

            let status = resp.status();
            if status.is_success() {
                ensure_html(resp.headers()).with_context(|| format!("GET {url}"))?;
                let body: Bytes = resp.bytes().await.context("read response body")?;
                return String::from_utf8(body.to_vec())
                    .with_context(|| format!("page at {url} is not valid utf-8"));
            }
            if !is_throttled(status) {
                return Err(anyhow!("GET {url} failed with status {status}"));
            }

            last_status = Some(status);
            if attempt == attempts {
                break;
            }
            let wait = self.policy.wait(resp.headers(), backoff);
            tracing::warn!(
                %url,
                %status,
                attempt,
                wait_ms = wait.as_millis(),
                "page download throttled"
            );
            tokio::time::sleep(wait).await;
            backoff = self.policy.next_backoff(backoff);
        }

        let status = last_status.map(|s| s.to_string()).unwrap_or_default();
        Err(anyhow!(
            "GET {url} failed after {attempts} attempts, still throttled ({status})"
        ))
    }
}

/// A missing `Content-Type` is accepted; anything not HTML is not.
fn ensure_html(headers: &HeaderMap) -> anyhow::Result<()> {
    let Some(value) = headers.get(CONTENT_TYPE) else {
        return Ok(());
    };
    let mime = value
        .to_str()
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if mime == "text/html" || mime == "application/xhtml+xml" {
        Ok(())
    } else {
        anyhow::bail!("not an HTML page (content-type {mime:?})")
    }
}

fn retry_after_duration(headers: &HeaderMap) -> Option<Duration> {
    let v = headers.get(RETRY_AFTER)?;
    let s = v.to_str().ok()?.trim();
    let seconds: u64 = s.parse().ok()?;
    Some(Duration::from_secs(seconds))
}
