//! Retrying HTTP GET with user-agent rotation and per-attempt proxy choice.

mod retry;
mod user_agent;

use std::sync::Mutex;
use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use rand::seq::IndexedRandom;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use sizewatch_core::{AppConfig, ProxyEndpoint, ProxyKey};

use crate::error::{FetchError, ScrapeError};
use retry::{retry_with_jitter, RetryPolicy};
use user_agent::UserAgentPool;

pub use user_agent::FALLBACK_USER_AGENT;

/// Characters that must be escaped in the userinfo part of a proxy URL.
const USERINFO: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b';')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'@')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub retry_min_delay: Duration,
    pub retry_max_delay: Duration,
    /// `None` selects the built-in browser list.
    pub user_agents: Option<Vec<String>>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(3),
            max_attempts: 3,
            retry_min_delay: Duration::from_millis(1000),
            retry_max_delay: Duration::from_millis(2000),
            user_agents: None,
        }
    }
}

impl FetchConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.fetch_timeout_ms),
            max_attempts: config.fetch_max_attempts,
            retry_min_delay: Duration::from_millis(config.fetch_retry_min_ms),
            retry_max_delay: Duration::from_millis(config.fetch_retry_max_ms),
            user_agents: config.user_agents.clone(),
        }
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    /// Deserializes the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Json`] naming the page URL.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ScrapeError> {
        serde_json::from_str(&self.body).map_err(|source| ScrapeError::Json {
            context: self.url.clone(),
            source,
        })
    }
}

/// Result of one [`Fetcher::fetch`] call.
///
/// `proxy_failures` lists the proxies that produced transport-level failures
/// during the call, one entry per failed attempt, even when a later attempt
/// succeeded. The fetcher does not record them; the caller decides.
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: Result<Page, FetchError>,
    pub proxy_failures: Vec<ProxyKey>,
}

/// Proxy URLs keyed by the scheme of the target URL.
///
/// Both point at the proxy over plain HTTP; credentials, when the endpoint
/// has both parts, are percent-encoded into the userinfo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyUrls {
    pub http: String,
    pub https: String,
}

#[must_use]
pub fn proxy_urls(endpoint: &ProxyEndpoint) -> ProxyUrls {
    let userinfo = endpoint
        .credentials()
        .map(|(user, pass)| {
            format!(
                "{}:{}@",
                utf8_percent_encode(user, USERINFO),
                utf8_percent_encode(pass, USERINFO)
            )
        })
        .unwrap_or_default();
    let url = format!("http://{userinfo}{}:{}", endpoint.host, endpoint.port);
    ProxyUrls {
        http: url.clone(),
        https: url,
    }
}

pub struct Fetcher {
    direct: Client,
    timeout: Duration,
    retry: RetryPolicy,
    user_agents: UserAgentPool,
}

impl Fetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the HTTP client cannot be built.
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let direct = Client::builder()
            .timeout(config.timeout)
            .no_proxy()
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self {
            direct,
            timeout: config.timeout,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                min_delay: config.retry_min_delay,
                max_delay: config.retry_max_delay,
            },
            user_agents: UserAgentPool::new(config.user_agents),
        })
    }

    /// A user agent drawn at random from the configured pool, or the
    /// fallback agent when the pool is empty.
    #[must_use]
    pub fn pick_user_agent(&self) -> &str {
        self.user_agents.pick()
    }

    /// GETs `url`, retrying per the configured policy.
    ///
    /// A `User-Agent` is added unless `headers` carries one. When `proxies`
    /// is non-empty each attempt goes through one of them chosen at random.
    pub async fn fetch(
        &self,
        url: &str,
        headers: &[(String, String)],
        proxies: &[ProxyEndpoint],
    ) -> FetchOutcome {
        let user_agent = if headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("user-agent"))
        {
            None
        } else {
            Some(self.pick_user_agent().to_owned())
        };
        let user_agent = user_agent.as_deref();
        let failures = Mutex::new(Vec::new());
        let failures_ref = &failures;

        let result = retry_with_jitter(self.retry, move |attempt| {
            let proxy = proxies.choose(&mut rand::rng()).cloned();
            async move {
                let result = self
                    .attempt(url, headers, user_agent, proxy.as_ref(), attempt)
                    .await;
                if let Err(err) = &result {
                    if let Some(key) = err.failed_proxy() {
                        failures_ref
                            .lock()
                            .unwrap_or_else(std::sync::PoisonError::into_inner)
                            .push(key.clone());
                    }
                }
                result
            }
        })
        .await;

        FetchOutcome {
            result,
            proxy_failures: failures
                .into_inner()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &[(String, String)],
        user_agent: Option<&str>,
        proxy: Option<&ProxyEndpoint>,
        attempt: u32,
    ) -> Result<Page, FetchError> {
        let client = match proxy {
            Some(endpoint) => self.proxied_client(endpoint)?,
            None => self.direct.clone(),
        };
        tracing::debug!(
            url,
            attempt,
            proxy = ?proxy.map(ToString::to_string),
            user_agent,
            "requesting page"
        );

        let mut request = client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(ua) = user_agent {
            request = request.header(reqwest::header::USER_AGENT, ua);
        }

        let transport = |source: reqwest::Error| FetchError::Transport {
            url: url.to_owned(),
            proxy: proxy.map(ProxyEndpoint::key),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let body = response.text().await.map_err(transport)?;
        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            body,
        })
    }

    fn proxied_client(&self, endpoint: &ProxyEndpoint) -> Result<Client, FetchError> {
        let urls = proxy_urls(endpoint);
        let invalid = |e: reqwest::Error| FetchError::InvalidProxy {
            proxy: endpoint.to_string(),
            reason: e.to_string(),
        };
        Client::builder()
            .timeout(self.timeout)
            .proxy(reqwest::Proxy::http(&urls.http).map_err(invalid)?)
            .proxy(reqwest::Proxy::https(&urls.https).map_err(invalid)?)
            .build()
            .map_err(FetchError::Client)
    }
}
