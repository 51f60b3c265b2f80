//! Request entry point: path parsing, payload preparation, identity checks and
//! method dispatch.

mod descriptor;
mod error;
mod event;
mod orchestrator;
mod render;

use std::sync::Arc;

use axum::http::Method;
use serde_json::Value;
use tracing::debug;

use crate::json_ld::{CompactionContext, JsonLdProcessor};
use crate::resolver::{RemoteOrigin, Resolver};
use crate::store::{Repository, id_entry};

use self::descriptor::Descriptor;
use self::error::ApiError;
use self::orchestrator::{Orchestrator, Reply};
use self::render::Renderer;

pub(crate) use self::event::{Envelope, RequestEvent, StageVariables};

pub(crate) struct Api {
    resolver: Resolver,
    processor: Arc<JsonLdProcessor>,
}

impl Api {
    pub(crate) fn new(
        repo: Arc<dyn Repository>,
        processor: Arc<JsonLdProcessor>,
        remote: RemoteOrigin,
    ) -> Api {
        Api {
            resolver: Resolver::new(repo, processor.clone(), remote),
            processor,
        }
    }

    pub(crate) async fn handle(&self, event: RequestEvent) -> Envelope {
        debug!(target: "api", ?event, "received event");
        let envelope = match self.process(&event).await {
            Ok(reply) => Envelope::from(reply),
            Err(error) => {
                debug!(target: "api", %error, method = %event.http_method, path = %event.path, "request failed");
                Envelope::from(error)
            }
        };
        debug!(target: "api", ?envelope, "produced envelope");
        envelope
    }

    async fn process(&self, event: &RequestEvent) -> Result<Reply, ApiError> {
        let method = Method::from_bytes(event.http_method.as_bytes()).ok();
        let public_url = event.public_url();
        let descriptor = Descriptor::parse(&event.path, public_url);
        if method == Some(Method::GET) && descriptor.names_default_context() {
            return Ok(Reply::ok(self.processor.default_context().clone()));
        }
        if descriptor.error {
            return Err(ApiError::NotFound);
        }

        let ctx = self.processor.default_scope(public_url);
        let payload = match event.payload() {
            Some(body) => self.prepare_payload(body, &ctx).await?,
            None => None,
        };
        if let Some(payload) = &payload {
            validate_identity(&descriptor, payload)?;
        }

        let renderer = Renderer::new(self.processor.clone(), event.query("context"), &ctx);
        let orchestrator = Orchestrator::new(&self.resolver, renderer, ctx, public_url);
        match method {
            Some(Method::GET) => orchestrator.get(&descriptor).await,
            Some(Method::POST) => orchestrator.post(&descriptor, payload).await,
            Some(Method::PUT) => orchestrator.put(&descriptor, payload).await,
            Some(Method::DELETE) => orchestrator.delete(&descriptor).await,
            _ => Err(ApiError::UnsupportedMethod(event.http_method.clone())),
        }
    }

    /// Parse the body and express it in the service's default context.
    async fn prepare_payload(
        &self,
        body: &str,
        ctx: &CompactionContext,
    ) -> Result<Option<Value>, ApiError> {
        let payload: Value = serde_json::from_str(body).map_err(|error| {
            debug!(target: "api", %error, "request body is not JSON");
            ApiError::MalformedBody
        })?;
        let payload = self.processor.compact(payload, ctx).await.map_err(|error| {
            debug!(target: "api", %error, "request body cannot be compacted");
            ApiError::MalformedBody
        })?;
        Ok(Some(payload).filter(|payload| !payload.is_null()))
    }
}

fn validate_identity(descriptor: &Descriptor, payload: &Value) -> Result<(), ApiError> {
    if let Some(expected) = &descriptor.ty {
        let actual = payload.get("type").or_else(|| payload.get("@type"));
        if actual.and_then(Value::as_str) != Some(expected.as_str()) {
            return Err(ApiError::type_mismatch(expected, actual));
        }
    }
    if descriptor.id.is_some() {
        let actual = id_entry(payload);
        if actual.and_then(Value::as_str) != Some(descriptor.url.as_str()) {
            return Err(ApiError::id_mismatch(&descriptor.url, actual));
        }
    }
    Ok(())
}

impl From<Reply> for Envelope {
    fn from(reply: Reply) -> Self {
        let headers = match reply.location {
            Some(location) => vec![("Location", location)],
            None => vec![],
        };
        Envelope::new(reply.status, reply.body.as_ref(), headers)
    }
}
