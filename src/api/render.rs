use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinSet;
use tracing::warn;

use crate::json_ld::{CompactionContext, JsonLdProcessor};

use super::error::ApiError;

/// Compacts outgoing resources against the context the caller asked for with
/// `?context=`. Without one, resources go out as stored.
pub(crate) struct Renderer {
    processor: Arc<JsonLdProcessor>,
    ctx: Option<CompactionContext>,
}

impl Renderer {
    pub(crate) fn new(
        processor: Arc<JsonLdProcessor>,
        requested: Option<&str>,
        default: &CompactionContext,
    ) -> Renderer {
        let ctx = requested.map(|url| default.retarget(url));
        Renderer { processor, ctx }
    }

    pub(crate) async fn render(&self, resource: Value) -> Result<Value, ApiError> {
        let Some(ctx) = &self.ctx else {
            return Ok(resource);
        };
        self.processor.compact(resource, ctx).await.map_err(|error| {
            warn!(target: "api", %error, context = ctx.target(), "failed to render resource");
            ApiError::Render
        })
    }

    /// Render every resource concurrently, keeping input order. Any failure
    /// fails the whole batch.
    pub(crate) async fn render_all(&self, resources: Vec<Value>) -> Result<Vec<Value>, ApiError> {
        let Some(ctx) = &self.ctx else {
            return Ok(resources);
        };
        let mut rendered = vec![Value::Null; resources.len()];
        let mut join_set = JoinSet::new();
        for (index, resource) in resources.into_iter().enumerate() {
            let processor = self.processor.clone();
            let ctx = ctx.clone();
            join_set.spawn(async move { (index, processor.compact(resource, &ctx).await) });
        }
        while let Some(joined) = join_set.join_next().await {
            let (index, result) = joined.map_err(|error| {
                warn!(target: "api", %error, "render task failed");
                ApiError::Render
            })?;
            rendered[index] = result.map_err(|error| {
                warn!(target: "api", %error, index, context = ctx.target(), "failed to render collection member");
                ApiError::Render
            })?;
        }
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use anyhow::Result;
    use serde_json::json;

    use crate::api::error::ApiError;
    use crate::config::builtin_default_context;
    use crate::json_ld::JsonLdProcessor;

    use super::Renderer;

    fn processor() -> Result<Arc<JsonLdProcessor>> {
        Ok(Arc::new(JsonLdProcessor::new(
            builtin_default_context(),
            Duration::from_secs(5),
        )?))
    }

    #[tokio::test]
    async fn no_requested_context_is_identity() -> Result<()> {
        let processor = processor()?;
        let default = processor.default_scope("http://local");
        let renderer = Renderer::new(processor, None, &default);
        let stored = json!({"id": "http://local/widgets/1", "unmapped:thing": 1});
        assert_eq!(renderer.render(stored.clone()).await?, stored);
        assert_eq!(renderer.render_all(vec![stored.clone()]).await?, vec![stored]);
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn render_all_keeps_order() -> Result<()> {
        let processor = processor()?;
        let default = processor.default_scope("http://local");
        processor.put_context(
            "http://contexts.local/short",
            json!({"@context": {"s": "https://schema.org/", "id": "@id"}}),
        );
        let renderer = Renderer::new(processor, Some("http://contexts.local/short"), &default);
        let resources: Vec<_> = (0..16)
            .map(|i| json!({"@context": "http://local/context/default", "id": format!("http://local/widgets/{i}"), "name": i}))
            .collect();
        let rendered = renderer.render_all(resources).await?;
        assert_eq!(rendered.len(), 16);
        for (i, resource) in rendered.iter().enumerate() {
            assert_eq!(resource["id"], json!(format!("http://local/widgets/{i}")));
            assert_eq!(resource["s:name"], json!(i));
            assert_eq!(resource["@context"], json!("http://contexts.local/short"));
        }
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn any_failure_fails_the_batch() -> Result<()> {
        let processor = processor()?;
        let default = processor.default_scope("http://local");
        processor.put_context(
            "http://contexts.local/short",
            json!({"@context": {"s": "https://schema.org/"}}),
        );
        let renderer = Renderer::new(processor, Some("http://contexts.local/short"), &default);
        let result = renderer
            .render_all(vec![json!({"name": "ok"}), json!("not a node"), json!({"name": "ok"})])
            .await;
        assert!(matches!(result, Err(ApiError::Render)));
        Ok(())
    }
}
