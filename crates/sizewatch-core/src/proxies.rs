//! Proxy endpoint records shared by the pool, the fetcher and the stores.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One outbound proxy, as administered in the persisted proxy table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Transient failures recorded since the last bulk reset.
    pub fail_count: u32,
}

impl ProxyEndpoint {
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            fail_count: 0,
        }
    }

    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Username and password, only when both are present and non-empty.
    ///
    /// The admin screens store blank strings for "no credentials", so a lone
    /// username is treated the same as none at all.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user, pass)),
            _ => None,
        }
    }

    /// Identifier used when recording a failure against this endpoint.
    #[must_use]
    pub fn key(&self) -> ProxyKey {
        ProxyKey {
            host: self.host.clone(),
            port: Some(self.port),
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Identifies the endpoint(s) a failure is recorded against.
///
/// With `port: None` every endpoint on `host` is matched, which is how the
/// crawler middleware attributes failures when it only knows the address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProxyKey {
    pub host: String,
    pub port: Option<u16>,
}

impl ProxyKey {
    #[must_use]
    pub fn host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
        }
    }

    #[must_use]
    pub fn matches(&self, endpoint: &ProxyEndpoint) -> bool {
        self.host == endpoint.host && self.port.is_none_or(|port| port == endpoint.port)
    }
}

impl fmt::Display for ProxyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{port}", self.host),
            None => f.write_str(&self.host),
        }
    }
}

/// How scrape requests use the proxy pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// Never route through a proxy.
    Direct,
    /// Use an active proxy when one exists, otherwise connect directly.
    #[default]
    Preferred,
    /// Refuse to send a request when no active proxy is left.
    Required,
}

impl std::str::FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "preferred" => Ok(Self::Preferred),
            "required" => Ok(Self::Required),
            other => Err(format!(
                "unknown proxy mode '{other}'; expected direct, preferred or required"
            )),
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyMode::Direct => write!(f, "direct"),
            ProxyMode::Preferred => write!(f, "preferred"),
            ProxyMode::Required => write!(f, "required"),
        }
    }
}
