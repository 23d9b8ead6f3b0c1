//! HTTP client for the ticketing service under test.
//!
//! Redirects are never followed: the join and completion steps judge the
//! redirect itself, and the seat page signals denial with a 302.

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Response, Url};
use serde::Serialize;

use crate::config::HttpSettings;
use crate::error::HarnessError;

#[derive(Debug, Clone)]
pub struct TargetClient {
    http: Client,
    base: Url,
}

impl TargetClient {
    pub fn new(host: &str, settings: &HttpSettings) -> Result<Self, HarnessError> {
        let base = parse_host(host)?;
        let http = Client::builder()
            .redirect(Policy::none())
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;

        tracing::debug!(
            "Created target client for {} with timeout {}s",
            base,
            settings.timeout.as_secs()
        );
        Ok(Self { http, base })
    }

    /// Resolve a path or absolute URL (such as a `Location` header) against the host
    pub fn url(&self, target: &str) -> Result<Url, HarnessError> {
        self.base
            .join(target)
            .map_err(|e| HarnessError::InvalidUrl(format!("{}: {}", target, e)))
    }

    pub async fn get(&self, target: &str) -> Result<Response, HarnessError> {
        let url = self.url(target)?;
        Ok(self.http.get(url).send().await?)
    }

    pub async fn post_form<T: Serialize + ?Sized>(
        &self,
        target: &str,
        form: &T,
    ) -> Result<Response, HarnessError> {
        let url = self.url(target)?;
        Ok(self.http.post(url).form(form).send().await?)
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &T,
        headers: &[(&'static str, String)],
    ) -> Result<Response, HarnessError> {
        let url = self.url(target)?;
        let mut request = self.http.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value.as_str());
        }
        Ok(request.send().await?)
    }
}

/// Parse the `--host` argument into a base URL
pub fn parse_host(host: &str) -> Result<Url, HarnessError> {
    let url = Url::parse(host).map_err(|e| HarnessError::InvalidUrl(format!("{}: {}", host, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HarnessError::InvalidUrl(format!(
            "{}: unsupported scheme '{}'",
            host, other
        ))),
    }
}

/// `Location` header of a redirect, empty when missing or not valid UTF-8
pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
