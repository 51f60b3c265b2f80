use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, Method, StatusCode, header};
use serde_json::Value;
use tracing::debug;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const APPLICATION_LD_JSON: &str = "application/ld+json";

/// Client for resources hosted by other origins.
#[derive(Clone)]
pub(crate) struct RemoteOrigin {
    client: Client,
}

pub(super) struct RemoteResponse {
    pub(super) status: StatusCode,
    body: String,
}

impl RemoteResponse {
    /// The body as JSON. Only an empty body reads as `null`.
    pub(super) fn json(&self) -> serde_json::Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&self.body)
    }
}

impl RemoteOrigin {
    pub(crate) fn new(timeout: Duration) -> Result<RemoteOrigin> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(RemoteOrigin { client })
    }

    /// Send `body` to `url`.
    pub(super) async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<RemoteResponse, reqwest::Error> {
        debug!(target: "resolver", %method, url, "calling remote origin");
        let mut request = self
            .client
            .request(method, url)
            .header(header::ACCEPT, APPLICATION_LD_JSON);
        if let Some(body) = body {
            request = request
                .header(header::CONTENT_TYPE, APPLICATION_LD_JSON)
                .body(body.to_string());
        }
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RemoteResponse { status, body })
    }
}
