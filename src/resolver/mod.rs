mod remote;

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::json_ld::{CompactError, CompactionContext, JsonLdProcessor};
use crate::store::{Repository, collection_of, id_entry, mint_iri, resource_id};

pub(crate) use remote::RemoteOrigin;

#[derive(Debug, Error)]
pub(crate) enum ResolveError {
    #[error("resource {0} not found")]
    NotFound(String),

    #[error("resource {0} already exists")]
    Conflict(String),

    #[error("resource {id} does not belong to {collection}")]
    OutsideCollection { id: String, collection: String },

    #[error("remote origin answered {status} for {url}")]
    Upstream { url: String, status: StatusCode },

    #[error("unable to reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("remote origin sent a body that is not JSON for {url}: {source}")]
    InvalidBody {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot dereference object with type '{0}'")]
    Undereferenceable(&'static str),

    #[error("resource should be a JSON object")]
    NotAnObject,

    #[error("expected a list of resources")]
    NotAList,

    #[error("inline resources cannot be modified")]
    InlineTarget,

    #[error(transparent)]
    Compact(#[from] CompactError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Where a resource lives.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Reference {
    /// Served by this service's repository.
    Local(String),
    /// Hosted by another origin.
    Remote(String),
    /// An already dereferenced, embedded node.
    // TODO dereference embedded node references ({"id": ...} only) instead of returning them as-is
    Inline(Value),
}

impl Reference {
    pub(crate) fn parse(value: Value, public_url: &str) -> Result<Reference, ResolveError> {
        match value {
            Value::String(iri) => Ok(Reference::from_iri(iri, public_url)),
            Value::Object(_) => Ok(Reference::Inline(value)),
            Value::Null => Err(ResolveError::Undereferenceable("null")),
            Value::Bool(_) => Err(ResolveError::Undereferenceable("boolean")),
            Value::Number(_) => Err(ResolveError::Undereferenceable("number")),
            Value::Array(_) => Err(ResolveError::Undereferenceable("array")),
        }
    }

    pub(crate) fn from_iri(iri: impl Into<String>, public_url: &str) -> Reference {
        let iri = iri.into();
        if is_local(&iri, public_url) {
            Reference::Local(iri)
        } else {
            Reference::Remote(iri)
        }
    }
}

fn is_local(iri: &str, public_url: &str) -> bool {
    match iri.strip_prefix(public_url) {
        Some(rest) => rest.is_empty() || rest.starts_with(['/', '?', '#']),
        None => false,
    }
}

#[derive(Clone)]
pub(crate) struct Resolver {
    repo: Arc<dyn Repository>,
    processor: Arc<JsonLdProcessor>,
    remote: RemoteOrigin,
}

impl Resolver {
    pub(crate) fn new(
        repo: Arc<dyn Repository>,
        processor: Arc<JsonLdProcessor>,
        remote: RemoteOrigin,
    ) -> Resolver {
        Resolver {
            repo,
            processor,
            remote,
        }
    }

    /// Dereference a JSON reference: an IRI string or an inline node.
    pub(crate) async fn resolve(
        &self,
        reference: Value,
        public_url: &str,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        let reference = Reference::parse(reference, public_url)?;
        self.get(&reference, ctx).await
    }

    /// Dereference a single resource. Remote results are compacted against
    /// `ctx`.
    pub(crate) async fn get(
        &self,
        reference: &Reference,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        match reference {
            Reference::Local(iri) => self
                .repo
                .get(iri)
                .await?
                .ok_or_else(|| ResolveError::NotFound(iri.clone())),
            Reference::Remote(url) => {
                self.call_remote(Method::GET, url, None, StatusCode::OK, ctx)
                    .await
            }
            Reference::Inline(resource) => Ok(resource.clone()),
        }
    }

    /// Dereference a collection into its members.
    pub(crate) async fn list(
        &self,
        reference: &Reference,
        ctx: &CompactionContext,
    ) -> Result<Vec<Value>, ResolveError> {
        let resources = match reference {
            Reference::Local(iri) => return Ok(self.repo.list(iri).await?),
            Reference::Remote(url) => {
                self.call_remote(Method::GET, url, None, StatusCode::OK, ctx)
                    .await?
            }
            Reference::Inline(resources) => resources.clone(),
        };
        match resources {
            Value::Array(items) => Ok(items),
            _ => Err(ResolveError::NotAList),
        }
    }

    /// Create `resource` in the collection at `target`. Local resources
    /// without an identifying IRI get one minted under the collection.
    pub(crate) async fn create(
        &self,
        target: &Reference,
        resource: Value,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        match target {
            Reference::Local(collection) => {
                let resource = self.ensure_id(resource, collection, ctx).await?;
                let id = resource_id(&resource)
                    .ok_or(ResolveError::NotAnObject)?
                    .to_owned();
                if collection_of(&id) != Some(collection.trim_end_matches('/')) {
                    return Err(ResolveError::OutsideCollection {
                        id,
                        collection: collection.clone(),
                    });
                }
                if self.repo.get(&id).await?.is_some() {
                    return Err(ResolveError::Conflict(id));
                }
                Ok(self.repo.put(resource).await?)
            }
            Reference::Remote(url) => {
                self.call_remote(Method::POST, url, Some(&resource), StatusCode::CREATED, ctx)
                    .await
            }
            Reference::Inline(_) => Err(ResolveError::InlineTarget),
        }
    }

    pub(crate) async fn update(
        &self,
        target: &Reference,
        resource: Value,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        match target {
            Reference::Local(_) => Ok(self.repo.put(resource).await?),
            Reference::Remote(url) => {
                self.call_remote(Method::PUT, url, Some(&resource), StatusCode::OK, ctx)
                    .await
            }
            Reference::Inline(_) => Err(ResolveError::InlineTarget),
        }
    }

    pub(crate) async fn delete(
        &self,
        target: &Reference,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        match target {
            Reference::Local(iri) => self
                .repo
                .del(iri)
                .await?
                .ok_or_else(|| ResolveError::NotFound(iri.clone())),
            Reference::Remote(url) => {
                self.call_remote(Method::DELETE, url, None, StatusCode::OK, ctx)
                    .await
            }
            Reference::Inline(_) => Err(ResolveError::InlineTarget),
        }
    }

    async fn call_remote(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        expected: StatusCode,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        let response = self
            .remote
            .send(method, url, body)
            .await
            .map_err(|source| ResolveError::Transport {
                url: url.to_owned(),
                source,
            })?;
        if response.status != expected {
            warn!(target: "resolver", url, status = %response.status, "remote origin refused request");
            return Err(ResolveError::Upstream {
                url: url.to_owned(),
                status: response.status,
            });
        }
        let body = response.json().map_err(|source| {
            warn!(target: "resolver", url, %source, "remote origin sent a body that is not JSON");
            ResolveError::InvalidBody {
                url: url.to_owned(),
                source,
            }
        })?;
        Ok(self.processor.compact(body, ctx).await?)
    }

    /// Mint an IRI under `collection` for a resource that has none, stored
    /// under the key `@id` compacts to in `ctx`.
    async fn ensure_id(
        &self,
        mut resource: Value,
        collection: &str,
        ctx: &CompactionContext,
    ) -> Result<Value, ResolveError> {
        if id_entry(&resource).is_some() {
            return Ok(resource);
        }
        let key = self.processor.id_key(ctx).await?;
        let map = resource.as_object_mut().ok_or(ResolveError::NotAnObject)?;
        map.insert(key, Value::String(mint_iri(collection)));
        Ok(resource)
    }
}
