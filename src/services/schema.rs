use crate::models::CollectionSchema;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// Collection schemas known to the host, looked up by id or name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    collections: Vec<CollectionSchema>,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    pub fn new(collections: Vec<CollectionSchema>) -> Self {
        let mut index = HashMap::new();
        for (i, collection) in collections.iter().enumerate() {
            index.insert(collection.name.clone(), i);
            // ids win over names when they collide
            index.insert(collection.id.clone(), i);
        }
        Self { collections, index }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let collections: Vec<CollectionSchema> =
            serde_json::from_str(json).context("invalid collections JSON")?;
        Ok(Self::new(collections))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn get(&self, id_or_name: &str) -> Option<&CollectionSchema> {
        self.index.get(id_or_name).map(|&i| &self.collections[i])
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
