use axum::http::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::json_ld::CompactionContext;
use crate::resolver::{Reference, ResolveError, Resolver};
use crate::store::resource_id;

use super::descriptor::Descriptor;
use super::error::ApiError;
use super::render::Renderer;

/// A successful outcome, before it is put into an envelope.
#[derive(Debug)]
pub(crate) struct Reply {
    pub(crate) status: StatusCode,
    pub(crate) body: Option<Value>,
    pub(crate) location: Option<String>,
}

impl Reply {
    /// A `null` body, such as a remote deletion without content, is sent as
    /// no body at all.
    pub(super) fn ok(body: Value) -> Reply {
        Reply {
            status: StatusCode::OK,
            body: Some(body).filter(|body| !body.is_null()),
            location: None,
        }
    }

    fn created(body: Value, location: String) -> Reply {
        Reply {
            status: StatusCode::CREATED,
            body: Some(body),
            location: Some(location),
        }
    }
}

/// Per-method CRUD logic for one request.
pub(crate) struct Orchestrator<'a> {
    resolver: &'a Resolver,
    renderer: Renderer,
    ctx: CompactionContext,
    public_url: &'a str,
}

impl<'a> Orchestrator<'a> {
    pub(crate) fn new(
        resolver: &'a Resolver,
        renderer: Renderer,
        ctx: CompactionContext,
        public_url: &'a str,
    ) -> Orchestrator<'a> {
        Orchestrator {
            resolver,
            renderer,
            ctx,
            public_url,
        }
    }

    pub(crate) async fn get(&self, descriptor: &Descriptor) -> Result<Reply, ApiError> {
        let collection = descriptor.collection_url().ok_or(ApiError::NotFound)?;
        if descriptor.id.is_some() {
            let resource = self
                .resolver
                .resolve(Value::from(descriptor.url.as_str()), self.public_url, &self.ctx)
                .await
                .map_err(not_found)?;
            let body = self.renderer.render(resource).await?;
            return Ok(Reply::ok(body));
        }
        let target = self.reference(collection);
        let resources = self
            .resolver
            .list(&target, &self.ctx)
            .await
            .map_err(not_found)?;
        let rendered = self.renderer.render_all(resources).await?;
        Ok(Reply::ok(Value::Array(rendered)))
    }

    pub(crate) async fn post(
        &self,
        descriptor: &Descriptor,
        payload: Option<Value>,
    ) -> Result<Reply, ApiError> {
        let collection = descriptor.collection_url().ok_or(ApiError::NotFound)?;
        if descriptor.id.is_some() {
            // Creation targets collections; tell apart unknown and taken ids.
            if self.exists(descriptor).await {
                return Err(ApiError::Conflict);
            }
            return Err(ApiError::NotFound);
        }
        let payload = payload.ok_or(ApiError::MissingPayload)?;
        let target = self.reference(collection);
        let created = self
            .resolver
            .create(&target, payload, &self.ctx)
            .await
            .map_err(|error| match error {
                ResolveError::Conflict(_) => ApiError::Conflict,
                error => {
                    warn!(target: "api", %error, "failed to create resource");
                    ApiError::NotFound
                }
            })?;
        let location = resource_id(&created)
            .map(str::to_owned)
            .ok_or(ApiError::Internal("created resource has no id"))?;
        let body = self.renderer.render(created).await?;
        Ok(Reply::created(body, location))
    }

    pub(crate) async fn put(
        &self,
        descriptor: &Descriptor,
        payload: Option<Value>,
    ) -> Result<Reply, ApiError> {
        if descriptor.id.is_none() {
            return Err(ApiError::NotFound);
        }
        let payload = payload.ok_or(ApiError::MissingPayload)?;
        if !self.exists(descriptor).await {
            return Err(ApiError::NotFound);
        }
        let target = self.reference(descriptor.url.clone());
        let updated = self
            .resolver
            .update(&target, payload, &self.ctx)
            .await
            .map_err(mutation_failed)?;
        let body = self.renderer.render(updated).await?;
        Ok(Reply::ok(body))
    }

    pub(crate) async fn delete(&self, descriptor: &Descriptor) -> Result<Reply, ApiError> {
        if descriptor.id.is_none() || !self.exists(descriptor).await {
            return Err(ApiError::NotFound);
        }
        let target = self.reference(descriptor.url.clone());
        let deleted = self
            .resolver
            .delete(&target, &self.ctx)
            .await
            .map_err(mutation_failed)?;
        let body = self.renderer.render(deleted).await?;
        Ok(Reply::ok(body))
    }

    async fn exists(&self, descriptor: &Descriptor) -> bool {
        self.resolver
            .resolve(Value::from(descriptor.url.as_str()), self.public_url, &self.ctx)
            .await
            .is_ok()
    }

    fn reference(&self, iri: String) -> Reference {
        Reference::from_iri(iri, self.public_url)
    }
}

fn not_found(error: ResolveError) -> ApiError {
    debug!(target: "api", %error, "unable to resolve resource");
    ApiError::NotFound
}

fn mutation_failed(error: ResolveError) -> ApiError {
    warn!(target: "api", %error, "mutation failed after existence check");
    ApiError::Mutation
}
