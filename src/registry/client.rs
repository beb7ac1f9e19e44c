//! HTTP helpers shared by the registry implementations.
use crate::config::HttpSettings;
use crate::registry::container_registry::Result;
use reqwest::blocking::{Client, Response};
use std::time::Duration;

/// Build a blocking HTTP client configured from the HTTP settings.
pub(crate) fn build_client(user_agent: &str, http: &HttpSettings) -> Result<Client> {
    let mut builder = Client::builder()
        .user_agent(user_agent)
        .danger_accept_invalid_certs(!http.verify_ssl);

    if let Some(timeout) = http.timeout_secs {
        builder = builder.timeout(Duration::from_secs_f64(timeout));
    }

    Ok(builder.build()?)
}

/// Join a configured base URL and a path without doubling slashes.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Consume a response and return its body, or a placeholder if it can't be read.
pub(crate) fn response_body(response: Response) -> String {
    response
        .text()
        .unwrap_or_else(|e| format!("<unreadable response body: {}>", e))
}
