#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use upload_reconciler::config::StorageSettings;
use upload_reconciler::models::{
    CollectionSchema, EventKind, FieldKind, HeaderUpdate, ObjectAcl, ObjectMetadata, ObjectRef,
    RecordRef, SchemaField, UploadEvent, UploadMap, UploadedFile,
};
use upload_reconciler::services::storage::BucketClient;

pub const BUCKET: &str = "uploads";

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Copy {
        key: String,
        headers: HeaderUpdate,
        preserved: ObjectMetadata,
    },
    Acl(String, ObjectAcl),
}

/// In-memory bucket that records every call made against it.
#[derive(Default)]
pub struct MockBucketClient {
    objects: Mutex<HashMap<String, ObjectMetadata>>,
    acls: Mutex<HashMap<String, ObjectAcl>>,
    calls: Mutex<Vec<Call>>,
    failing_copies: Mutex<HashSet<String>>,
    failing_acls: Mutex<HashSet<String>>,
    latency: Mutex<Option<Duration>>,
}

impl MockBucketClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, key: &str, metadata: ObjectMetadata) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), metadata);
    }

    pub fn object(&self, key: &str) -> Option<ObjectMetadata> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn acl(&self, key: &str) -> Option<ObjectAcl> {
        self.acls.lock().unwrap().get(key).copied()
    }

    pub fn fail_copy(&self, key: &str) {
        self.failing_copies.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_acl(&self, key: &str) {
        self.failing_acls.lock().unwrap().insert(key.to_string());
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().unwrap() = Some(latency);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn copies(&self) -> Vec<(String, HeaderUpdate, ObjectMetadata)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Copy {
                    key,
                    headers,
                    preserved,
                } => Some((key, headers, preserved)),
                _ => None,
            })
            .collect()
    }

    pub fn acl_writes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Acl(key, _) => Some(key),
                _ => None,
            })
            .collect()
    }

    async fn delay(&self) {
        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl BucketClient for MockBucketClient {
    async fn get_object_metadata(&self, object: &ObjectRef) -> anyhow::Result<ObjectMetadata> {
        self.delay().await;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Get(object.key.clone()));
        self.object(&object.key)
            .ok_or_else(|| anyhow::anyhow!("NoSuchKey: {}", object.key))
    }

    async fn copy_object_with_metadata(
        &self,
        object: &ObjectRef,
        headers: &HeaderUpdate,
        preserved: &ObjectMetadata,
    ) -> anyhow::Result<()> {
        self.delay().await;
        self.calls.lock().unwrap().push(Call::Copy {
            key: object.key.clone(),
            headers: headers.clone(),
            preserved: preserved.clone(),
        });
        if self.failing_copies.lock().unwrap().contains(&object.key) {
            return Err(anyhow::anyhow!("AccessDenied"));
        }

        let rewritten = ObjectMetadata {
            content_disposition: Some(headers.content_disposition.clone()),
            cache_control: headers.cache_control.clone(),
            ..preserved.clone()
        };
        self.put(&object.key, rewritten);
        Ok(())
    }

    async fn set_object_acl(&self, object: &ObjectRef, acl: ObjectAcl) -> anyhow::Result<()> {
        self.delay().await;
        self.calls
            .lock()
            .unwrap()
            .push(Call::Acl(object.key.clone(), acl));
        if self.failing_acls.lock().unwrap().contains(&object.key) {
            return Err(anyhow::anyhow!("AccessDenied"));
        }
        self.acls.lock().unwrap().insert(object.key.clone(), acl);
        Ok(())
    }
}

pub fn collection() -> CollectionSchema {
    CollectionSchema {
        id: "col1".to_string(),
        name: "documents".to_string(),
        fields: vec![
            SchemaField::new("title", FieldKind::Text),
            SchemaField::file("doc", true),
            SchemaField::file("avatar", false),
        ],
    }
}

pub fn record() -> RecordRef {
    RecordRef::new("rec1", collection())
}

pub fn key(stored_name: &str) -> String {
    format!("col1/rec1/{}", stored_name)
}

pub fn uploads(entries: &[(&str, &[(&str, &str)])]) -> UploadMap {
    entries
        .iter()
        .map(|(field, files)| {
            (
                field.to_string(),
                files
                    .iter()
                    .map(|(name, original)| UploadedFile::new(*name, *original))
                    .collect(),
            )
        })
        .collect()
}

pub fn event(uploads: UploadMap) -> UploadEvent {
    UploadEvent::new(EventKind::Created, record(), uploads)
}

pub fn enabled_settings() -> StorageSettings {
    StorageSettings {
        enabled: true,
        bucket: BUCKET.to_string(),
        ..StorageSettings::default()
    }
}

pub fn png() -> ObjectMetadata {
    ObjectMetadata {
        content_type: Some("image/png".to_string()),
        content_encoding: Some("gzip".to_string()),
        ..ObjectMetadata::default()
    }
}
