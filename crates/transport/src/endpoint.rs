use parley_core::config::ServerConfig;
use parley_core::{Error, Host, Result};
use reqwest::Url;

/// Base URL every request path is joined onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
}

impl Endpoint {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self { base: base.trim_end_matches('/').to_string() }
    }

    /// Pick the base URL for this host
    ///
    /// An explicit `base_url` wins. Otherwise a page served from a loopback
    /// host talks to the dev origin, and any other page talks to its own origin.
    pub fn resolve(host: &dyn Host, server: &ServerConfig) -> Self {
        let base = match &server.base_url {
            Some(base_url) => base_url.clone(),
            None if host.is_loopback_host() => server.dev_origin.clone(),
            None => host.origin(),
        };
        tracing::debug!(base = %base, "resolved endpoint");
        Self::new(base)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

/// Whether an origin names the local machine
pub fn is_loopback(origin: &str) -> Result<bool> {
    let url = Url::parse(origin).map_err(|e| Error::Config(format!("invalid origin '{}': {}", origin, e)))?;
    Ok(match url.host_str() {
        Some(host) => matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1"),
        None => false,
    })
}
