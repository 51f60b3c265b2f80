//! Just enough JSON-LD: context processing and compaction.

use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;

use self::loader::ContextLoader;
use self::vocab::ID;

mod compact;
mod context;
mod loader;
mod vocab;

pub(crate) const DEFAULT_CONTEXT_PATH: &str = "/context/default";

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub(crate) enum CompactError {
    #[error("invalid JSON-LD context: {0:#}")]
    InvalidContext(anyhow::Error),

    #[error("failed to load context {url}: {message}")]
    ContextLoad { url: String, message: String },

    #[error("too many nested remote contexts at {0}")]
    ContextOverflow(String),

    #[error("only node objects and arrays of them can be compacted")]
    NotANode,
}

/// The contexts a compaction runs against.
///
/// `target` is the context the result is expressed in, `base` the context
/// assumed for documents that carry no `@context` of their own.
/// `default_url` is where the service's default context is published for the
/// request being served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CompactionContext {
    target: String,
    base: String,
    default_url: String,
}

impl CompactionContext {
    /// Target `target` instead, falling back to the current target for
    /// documents without a `@context`.
    pub(crate) fn retarget(&self, target: impl Into<String>) -> CompactionContext {
        CompactionContext {
            target: target.into(),
            base: self.target.clone(),
            default_url: self.default_url.clone(),
        }
    }
    pub(crate) fn target(&self) -> &str {
        &self.target
    }
    pub(crate) fn base(&self) -> &str {
        &self.base
    }
    pub(crate) fn default_url(&self) -> &str {
        &self.default_url
    }
}

pub(crate) struct JsonLdProcessor {
    loader: ContextLoader,
}

impl JsonLdProcessor {
    pub(crate) fn new(default_context: Value, timeout: Duration) -> Result<JsonLdProcessor> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .gzip(true)
            .timeout(timeout)
            .build()?;
        Ok(JsonLdProcessor {
            loader: ContextLoader::new(client, default_context),
        })
    }

    pub(crate) fn default_context(&self) -> &Value {
        self.loader.default_context()
    }

    #[cfg(test)]
    pub(crate) fn put_context(&self, url: &str, document: Value) {
        self.loader.cache().put(url, document);
    }

    /// The compaction context that targets the default context as published
    /// under `public_url`.
    pub(crate) fn default_scope(&self, public_url: &str) -> CompactionContext {
        let url = format!("{public_url}{DEFAULT_CONTEXT_PATH}");
        CompactionContext {
            target: url.clone(),
            base: url.clone(),
            default_url: url,
        }
    }

    /// The key `@id` compacts to under the target context of `ctx`.
    pub(crate) async fn id_key(&self, ctx: &CompactionContext) -> Result<String, CompactError> {
        let target_ref = Value::String(ctx.target().to_owned());
        let target = self
            .loader
            .active_context(&target_ref, Some(ctx.default_url()))
            .await?;
        Ok(target.compact_iri(&ID))
    }

    pub(crate) async fn compact(
        &self,
        resource: Value,
        ctx: &CompactionContext,
    ) -> Result<Value, CompactError> {
        match resource {
            Value::Null => Ok(Value::Null),
            Value::Object(_) => self.compact_document(resource, ctx).await,
            Value::Array(items) => {
                let mut result = Vec::with_capacity(items.len());
                for item in items {
                    if !item.is_object() {
                        return Err(CompactError::NotANode);
                    }
                    result.push(self.compact_document(item, ctx).await?);
                }
                Ok(Value::Array(result))
            }
            _ => Err(CompactError::NotANode),
        }
    }

    async fn compact_document(
        &self,
        document: Value,
        ctx: &CompactionContext,
    ) -> Result<Value, CompactError> {
        let Value::Object(document) = document else {
            return Err(CompactError::NotANode);
        };
        let local = document
            .get("@context")
            .cloned()
            .unwrap_or_else(|| Value::String(ctx.base().to_owned()));
        let target_ref = Value::String(ctx.target().to_owned());
        let active = self.loader.active_context(&local, Some(ctx.default_url())).await?;
        let target = self
            .loader
            .active_context(&target_ref, Some(ctx.default_url()))
            .await?;
        Ok(compact::compact_document(document, &active, &target, target_ref))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::Result;
    use serde_json::json;

    use crate::config::builtin_default_context;

    use super::{CompactError, JsonLdProcessor};

    fn processor() -> Result<JsonLdProcessor> {
        JsonLdProcessor::new(builtin_default_context(), Duration::from_secs(5))
    }

    #[test]
    fn default_scope_targets_published_context() -> Result<()> {
        let processor = processor()?;
        let ctx = processor.default_scope("https://data.example.com");
        assert_eq!(ctx.target(), "https://data.example.com/context/default");
        assert_eq!(ctx.base(), "https://data.example.com/context/default");
        assert_eq!(ctx.default_url(), "https://data.example.com/context/default");

        let rendered = ctx.retarget("https://contexts.example.com/short");
        assert_eq!(rendered.target(), "https://contexts.example.com/short");
        assert_eq!(rendered.base(), "https://data.example.com/context/default");
        assert_eq!(rendered.default_url(), Some(ctx.default_url()));
        Ok(())
    }

    #[tokio::test]
    async fn default_scopes_do_not_grow_the_cache() -> Result<()> {
        let processor = processor()?;
        for i in 0..1000 {
            let ctx = processor.default_scope(&format!("http://host-{i}.example"));
            let result = processor.compact(json!({"name": "a"}), &ctx).await?;
            assert_eq!(result["name"], json!("a"));
        }
        assert_eq!(processor.loader.cache().len(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn id_key_follows_target_context() -> Result<()> {
        let processor = processor()?;
        let ctx = processor.default_scope("http://local");
        assert_eq!(processor.id_key(&ctx).await?, "id");

        let bare = JsonLdProcessor::new(
            json!({"@context": {"@vocab": "https://schema.org/"}}),
            Duration::from_secs(5),
        )?;
        let ctx = bare.default_scope("http://local");
        assert_eq!(bare.id_key(&ctx).await?, "@id");
        Ok(())
    }

    #[tokio::test]
    async fn compact_payload_without_context() -> Result<()> {
        let processor = processor()?;
        let ctx = processor.default_scope("https://data.example.com");
        let result = processor
            .compact(
                json!({
                    "type": "https://schema.org/widgets",
                    "id": "https://data.example.com/widgets/1",
                    "name": "Sprocket"
                }),
                &ctx,
            )
            .await?;
        assert_eq!(
            result,
            json!({
                "@context": "https://data.example.com/context/default",
                "type": "widgets",
                "id": "https://data.example.com/widgets/1",
                "name": "Sprocket"
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn compact_against_registered_context() -> Result<()> {
        let processor = processor()?;
        let default_ctx = processor.default_scope("https://data.example.com");
        processor.put_context(
            "https://contexts.example.com/short",
            json!({"@context": {"schema": "https://schema.org/", "@vocab": "http://example.org/"}}),
        );
        let ctx = default_ctx.retarget("https://contexts.example.com/short");
        let result = processor
            .compact(
                json!({
                    "@context": "https://data.example.com/context/default",
                    "id": "https://data.example.com/widgets/1",
                    "type": "widgets",
                    "name": "Sprocket"
                }),
                &ctx,
            )
            .await?;
        assert_eq!(
            result,
            json!({
                "@context": "https://contexts.example.com/short",
                "@id": "https://data.example.com/widgets/1",
                "@type": "schema:widgets",
                "schema:name": "Sprocket"
            })
        );
        Ok(())
    }

    #[tokio::test]
    async fn compact_arrays_and_null() -> Result<()> {
        let processor = processor()?;
        let ctx = processor.default_scope("http://local");
        let result = processor
            .compact(json!([{"name": "a"}, {"name": "b"}]), &ctx)
            .await?;
        assert_eq!(
            result,
            json!([
                {"@context": "http://local/context/default", "name": "a"},
                {"@context": "http://local/context/default", "name": "b"}
            ])
        );
        assert_eq!(processor.compact(json!(null), &ctx).await?, json!(null));
        Ok(())
    }

    #[tokio::test]
    async fn reject_scalars() -> Result<()> {
        let processor = processor()?;
        let ctx = processor.default_scope("http://local");
        let result = processor.compact(json!("just a string"), &ctx).await;
        assert!(matches!(result, Err(CompactError::NotANode)));
        let result = processor.compact(json!([1, 2]), &ctx).await;
        assert!(matches!(result, Err(CompactError::NotANode)));
        Ok(())
    }
}
