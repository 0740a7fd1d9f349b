//! Shared HTTP client construction.

use anyhow::anyhow;
use chat_core::{AdapterSettings, ProxyAuth};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

fn apply_proxy_auth(proxy: Proxy, auth: Option<&ProxyAuth>) -> Proxy {
    let Some(auth) = auth else {
        return proxy;
    };
    if auth.username.is_empty() {
        return proxy;
    }
    proxy.basic_auth(&auth.username, &auth.password)
}

pub(crate) fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, "application/json".parse().unwrap());
    headers.insert(CONTENT_TYPE, "application/json".parse().unwrap());
    headers
}

/// Base client honoring the adapter's proxy configuration.
pub(crate) fn build_http_client(settings: &AdapterSettings) -> anyhow::Result<Client> {
    let mut builder = Client::builder().default_headers(default_headers());
    if !settings.http_proxy.is_empty() {
        let mut proxy = Proxy::http(&settings.http_proxy)?;
        proxy = apply_proxy_auth(proxy, settings.http_proxy_auth.as_ref());
        builder = builder.proxy(proxy);
    }
    if !settings.https_proxy.is_empty() {
        let mut proxy = Proxy::https(&settings.https_proxy)?;
        proxy = apply_proxy_auth(proxy, settings.https_proxy_auth.as_ref());
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {e}"))
}

/// Retry wrapper for blocking requests.
///
/// Streaming requests go through the bare client instead: a half-consumed
/// event stream must not be replayed by middleware.
pub(crate) fn build_retry_client(client: Client) -> ClientWithMiddleware {
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(3);

    ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_proxy() {
        let settings = AdapterSettings::default();
        assert!(build_http_client(&settings).is_ok());
    }

    #[test]
    fn builds_with_proxy_and_auth() {
        let settings = AdapterSettings {
            api_key: "key".to_string(),
            http_proxy: "http://127.0.0.1:8080".to_string(),
            https_proxy: "http://127.0.0.1:8080".to_string(),
            http_proxy_auth: Some(ProxyAuth {
                username: "user".to_string(),
                password: "pass".to_string(),
            }),
            ..Default::default()
        };
        assert!(build_http_client(&settings).is_ok());
    }
}
