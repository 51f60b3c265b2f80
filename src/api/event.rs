use std::collections::BTreeMap;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound request, as delivered by a gateway or the HTTP transport.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestEvent {
    pub(crate) http_method: String,
    pub(crate) path: String,
    #[serde(default)]
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) query_string_parameters: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub(crate) stage_variables: Option<StageVariables>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct StageVariables {
    #[serde(rename = "PublicUrl", default)]
    pub(crate) public_url: String,
}

impl RequestEvent {
    pub(crate) fn public_url(&self) -> &str {
        self.stage_variables
            .as_ref()
            .map(|vars| vars.public_url.trim_end_matches('/'))
            .unwrap_or_default()
    }

    pub(crate) fn query(&self, name: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()?
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// The request body, unless it is missing or blank.
    pub(crate) fn payload(&self) -> Option<&str> {
        self.body.as_deref().filter(|body| !body.trim().is_empty())
    }
}

/// Outgoing response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    pub(crate) status_code: u16,
    pub(crate) body: String,
    pub(crate) headers: BTreeMap<String, String>,
}

impl Envelope {
    pub(crate) fn new(
        status: StatusCode,
        body: Option<&Value>,
        extra_headers: Vec<(&'static str, String)>,
    ) -> Envelope {
        let mut headers = BTreeMap::from([
            ("Content-Type".to_owned(), "application/json".to_owned()),
            ("Access-Control-Allow-Origin".to_owned(), "*".to_owned()),
        ]);
        headers.extend(extra_headers.into_iter().map(|(k, v)| (k.to_owned(), v)));
        let body = body
            .and_then(|body| serde_json::to_string_pretty(body).ok())
            .unwrap_or_default();
        Envelope {
            status_code: status.as_u16(),
            body,
            headers,
        }
    }
}
