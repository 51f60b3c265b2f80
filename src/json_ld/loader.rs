use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use reqwest::{Client, StatusCode, header};
use serde_json::Value;
use tracing::debug;

use super::CompactError;
use super::context::{self, Context};
use super::vocab::ACTIVITY_STREAMS_NS;

const MAX_REMOTE_DEPTH: usize = 8;
const MAX_CACHED_CONTEXTS: usize = 256;
const ACCEPT_LD_JSON: &str = "application/ld+json, application/json;q=0.9";

#[derive(Default)]
struct Documents {
    by_url: HashMap<String, Arc<Value>>,
    /// Insertion order, oldest first.
    order: VecDeque<String>,
}

/// Context documents keyed by URL. Holds at most `capacity` documents and
/// evicts the oldest first.
pub(super) struct ContextCache {
    documents: RwLock<Documents>,
    capacity: usize,
}

impl ContextCache {
    pub(super) fn with_capacity(capacity: usize) -> ContextCache {
        ContextCache {
            documents: RwLock::default(),
            capacity,
        }
    }
    pub(super) fn put(&self, url: &str, document: Value) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let documents = &mut *documents;
        if documents
            .by_url
            .insert(url.to_owned(), Arc::new(document))
            .is_none()
        {
            documents.order.push_back(url.to_owned());
        }
        while documents.order.len() > self.capacity {
            let Some(oldest) = documents.order.pop_front() else {
                break;
            };
            debug!(target: "json_ld", url = oldest.as_str(), "evicting cached context");
            documents.by_url.remove(&oldest);
        }
    }
    pub(super) fn get(&self, url: &str) -> Option<Arc<Value>> {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.by_url.get(url).cloned()
    }
    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        let documents = self
            .documents
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.by_url.len()
    }
}

pub(super) struct ContextLoader {
    cache: ContextCache,
    client: Client,
    default_context: Value,
}

impl ContextLoader {
    pub(super) fn new(client: Client, default_context: Value) -> ContextLoader {
        ContextLoader {
            cache: ContextCache::with_capacity(MAX_CACHED_CONTEXTS),
            client,
            default_context,
        }
    }

    pub(super) fn default_context(&self) -> &Value {
        &self.default_context
    }

    #[cfg(test)]
    pub(super) fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// Build the active context for a `@context` entry, loading remote
    /// contexts as needed. A reference to `default_url` resolves to the
    /// service's own default context without touching the cache.
    pub(super) async fn active_context(
        &self,
        context_def: &Value,
        default_url: Option<&str>,
    ) -> Result<Context, CompactError> {
        let definitions = self.flatten(context_def, default_url).await?;
        Context::try_from(definitions.as_slice()).map_err(CompactError::InvalidContext)
    }

    /// Replace remote context references with their definitions, keeping
    /// their order.
    async fn flatten(
        &self,
        context_def: &Value,
        default_url: Option<&str>,
    ) -> Result<Vec<Value>, CompactError> {
        let mut pending: VecDeque<(Value, usize)> = context::normalize(context_def)
            .map_err(CompactError::InvalidContext)?
            .into_iter()
            .map(|definition| (definition, 0))
            .collect();
        let mut definitions = vec![];
        while let Some((definition, depth)) = pending.pop_front() {
            let Value::String(url) = definition else {
                definitions.push(definition);
                continue;
            };
            if depth >= MAX_REMOTE_DEPTH {
                return Err(CompactError::ContextOverflow(url));
            }
            let remote = self.load(&url, default_url).await?;
            let nested = context::normalize(&remote).map_err(CompactError::InvalidContext)?;
            for definition in nested.into_iter().rev() {
                pending.push_front((definition, depth + 1));
            }
        }
        Ok(definitions)
    }

    /// The `@context` entry of the context document at `url`.
    async fn load(&self, url: &str, default_url: Option<&str>) -> Result<Value, CompactError> {
        if default_url == Some(url) {
            return context_entry(url, &self.default_context);
        }
        if let Some(document) = self.cache.get(url) {
            return context_entry(url, &document);
        }
        if url.trim_end_matches('#') == ACTIVITY_STREAMS_NS {
            return Ok(context::activitystreams_definition());
        }
        debug!(target: "json_ld", url, "loading remote context");
        let load_error = |message: String| CompactError::ContextLoad {
            url: url.to_owned(),
            message,
        };
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, ACCEPT_LD_JSON)
            .send()
            .await
            .map_err(|error| load_error(error.to_string()))?;
        if response.status() != StatusCode::OK {
            return Err(load_error(format!("unexpected status {}", response.status())));
        }
        let document: Value = response
            .json()
            .await
            .map_err(|error| load_error(error.to_string()))?;
        let entry = context_entry(url, &document)?;
        self.cache.put(url, document);
        Ok(entry)
    }
}

fn context_entry(url: &str, document: &Value) -> Result<Value, CompactError> {
    document
        .get("@context")
        .cloned()
        .ok_or_else(|| CompactError::ContextLoad {
            url: url.to_owned(),
            message: "document has no @context".to_owned(),
        })
}
