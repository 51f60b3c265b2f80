mod member_key;
mod resource_repo;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub(crate) use resource_repo::ResourceRepo;

/// Key-addressed resource storage.
///
/// Resources are keyed by their identifying IRI (see [`resource_id`]). A resource belongs to the collection
/// named by its IRI without the last path segment.
#[async_trait]
pub(crate) trait Repository: Send + Sync {
    async fn get(&self, iri: &str) -> Result<Option<Value>>;
    /// Members of `collection` in key order.
    async fn list(&self, collection: &str) -> Result<Vec<Value>>;
    /// Create or replace the resource under its identifying IRI.
    async fn put(&self, resource: Value) -> Result<Value>;
    /// Remove the resource, returning its last representation.
    async fn del(&self, iri: &str) -> Result<Option<Value>>;
}

/// The entry that identifies `resource`: its `id` alias, or `@id` when the
/// context has none.
pub(crate) fn id_entry(resource: &Value) -> Option<&Value> {
    resource.get("id").or_else(|| resource.get("@id"))
}

pub(crate) fn resource_id(resource: &Value) -> Option<&str> {
    id_entry(resource).and_then(Value::as_str)
}

/// Mint a fresh IRI for a new member of `collection`.
pub(crate) fn mint_iri(collection: &str) -> String {
    let key = uuid::Uuid::now_v7();
    format!("{}/{}", collection.trim_end_matches('/'), key.as_simple())
}

pub(crate) fn collection_of(iri: &str) -> Option<&str> {
    let (collection, member) = iri.trim_end_matches('/').rsplit_once('/')?;
    if collection.is_empty() || member.is_empty() || collection.ends_with('/') {
        return None;
    }
    Some(collection)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{collection_of, mint_iri, resource_id};

    #[test]
    fn collection_of_member() {
        assert_eq!(
            collection_of("https://data.example.com/widgets/1"),
            Some("https://data.example.com/widgets")
        );
        assert_eq!(
            collection_of("https://data.example.com/widgets"),
            Some("https://data.example.com")
        );
        assert_eq!(collection_of("https://data.example.com"), None);
        assert_eq!(collection_of("urn:isbn:123"), None);
    }

    #[test]
    fn minted_iris_are_members() {
        let first = mint_iri("https://data.example.com/widgets/");
        let second = mint_iri("https://data.example.com/widgets");
        assert_eq!(collection_of(&first), Some("https://data.example.com/widgets"));
        assert_eq!(collection_of(&second), Some("https://data.example.com/widgets"));
        assert_ne!(first, second);
    }

    #[test]
    fn identity_under_alias_or_keyword() {
        assert_eq!(resource_id(&json!({"id": "urn:a"})), Some("urn:a"));
        assert_eq!(resource_id(&json!({"@id": "urn:b"})), Some("urn:b"));
        assert_eq!(resource_id(&json!({"id": "urn:a", "@id": "urn:b"})), Some("urn:a"));
        assert_eq!(resource_id(&json!({"id": 1})), None);
        assert_eq!(resource_id(&json!({"name": "anonymous"})), None);
    }
}
