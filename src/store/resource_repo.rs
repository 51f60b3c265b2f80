use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use serde_json::Value;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use super::member_key::MemberKey;
use super::{Repository, collection_of, resource_id};

#[derive(Clone)]
pub(crate) struct ResourceRepo {
    keyspace: Keyspace,
    resources: PartitionHandle,
    members: PartitionHandle,
}

impl ResourceRepo {
    pub(crate) fn new(keyspace: Keyspace) -> Result<ResourceRepo> {
        let options = PartitionCreateOptions::default();
        let resources = keyspace.open_partition("resources", options.clone())?;
        let members = keyspace.open_partition("members", options)?;
        Ok(ResourceRepo {
            keyspace,
            resources,
            members,
        })
    }
    pub(crate) fn find_one(&self, iri: &str) -> Result<Option<Value>> {
        if let Some(bytes) = self.resources.get(iri)? {
            let resource = serde_json::from_slice(&bytes)
                .with_context(|| format!("corrupted resource {iri}"))?;
            return Ok(Some(resource));
        }
        Ok(None)
    }
    pub(crate) fn find_members(&self, collection: &str) -> Result<Vec<Value>> {
        let mut result = vec![];
        for item in self.members.prefix(MemberKey::prefix(collection)) {
            let (key, _) = item?;
            let key = MemberKey::from(key.as_ref());
            let Some(member) = key.member() else {
                warn!(target: "store", collection, "skipping malformed membership key");
                continue;
            };
            match self.find_one(member)? {
                Some(resource) => result.push(resource),
                None => warn!(target: "store", member, "membership without resource"),
            }
        }
        Ok(result)
    }
    pub(crate) fn insert(&self, resource: Value) -> Result<Value> {
        let iri = resource_id(&resource)
            .context("resource should have a string id")?
            .to_owned();
        let bytes = serde_json::to_vec(&resource)?;
        let mut b = self.keyspace.batch();
        b.insert(&self.resources, iri.as_str(), bytes);
        if let Some(collection) = collection_of(&iri) {
            b.insert(&self.members, MemberKey::new(collection, &iri), []);
        }
        b.commit()?;
        debug!(target: "store", iri, "stored resource");
        Ok(resource)
    }
    pub(crate) fn remove(&self, iri: &str) -> Result<Option<Value>> {
        let Some(resource) = self.find_one(iri)? else {
            return Ok(None);
        };
        let mut b = self.keyspace.batch();
        b.remove(&self.resources, iri);
        if let Some(collection) = collection_of(iri) {
            b.remove(&self.members, MemberKey::new(collection, iri));
        }
        b.commit()?;
        debug!(target: "store", iri, "removed resource");
        Ok(Some(resource))
    }
}

#[async_trait]
impl Repository for ResourceRepo {
    async fn get(&self, iri: &str) -> Result<Option<Value>> {
        let repo = self.clone();
        let iri = iri.to_owned();
        spawn_blocking(move || repo.find_one(&iri)).await?
    }
    async fn list(&self, collection: &str) -> Result<Vec<Value>> {
        let repo = self.clone();
        let collection = collection.to_owned();
        spawn_blocking(move || repo.find_members(&collection)).await?
    }
    async fn put(&self, resource: Value) -> Result<Value> {
        let repo = self.clone();
        spawn_blocking(move || repo.insert(resource)).await?
    }
    async fn del(&self, iri: &str) -> Result<Option<Value>> {
        let repo = self.clone();
        let iri = iri.to_owned();
        spawn_blocking(move || repo.remove(&iri)).await?
    }
}
