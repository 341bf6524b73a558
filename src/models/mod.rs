use crate::services::context::ExecutionContext;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// A file stored by the host during a record create/update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UploadedFile {
    /// Stored (content-addressed) object name.
    pub name: String,
    /// Filename as supplied by the uploader.
    pub original_name: String,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, original_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original_name: original_name.into(),
        }
    }
}

/// Field name -> files uploaded into that field, in upload order.
pub type UploadMap = BTreeMap<String, Vec<UploadedFile>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Created,
    Updated,
}

impl EventKind {
    pub const ALL: [EventKind; 2] = [EventKind::Created, EventKind::Updated];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Created => "created",
            EventKind::Updated => "updated",
        }
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" | "create" => Ok(EventKind::Created),
            "updated" | "update" => Ok(EventKind::Updated),
            other => Err(format!("Unknown event kind: {}", other)),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOptions {
    #[serde(default)]
    pub protected: bool,
}

/// Field types of a collection. File fields carry their options directly so
/// that policy lookups never need to inspect untyped option blobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    File {
        #[serde(default)]
        options: FileOptions,
    },
    Text,
    Number,
    Bool,
    Email,
    Url,
    Editor,
    Date,
    Select,
    Json,
    Relation,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

impl SchemaField {
    pub fn file(name: impl Into<String>, protected: bool) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::File {
                options: FileOptions { protected },
            },
        }
    }

    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSchema {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<SchemaField>,
}

impl CollectionSchema {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The record an upload event belongs to.
#[derive(Debug, Clone)]
pub struct RecordRef {
    pub id: String,
    pub collection: CollectionSchema,
}

impl RecordRef {
    pub fn new(id: impl Into<String>, collection: CollectionSchema) -> Self {
        Self {
            id: id.into(),
            collection,
        }
    }

    /// Storage prefix of the record's files: `<collection id>/<record id>`.
    pub fn base_files_path(&self) -> String {
        format!("{}/{}", self.collection.id, self.id)
    }

    pub fn object_key(&self, stored_name: &str) -> String {
        format!("{}/{}", self.base_files_path(), stored_name)
    }
}

#[derive(Debug, Clone)]
pub struct UploadEvent {
    pub kind: EventKind,
    pub record: RecordRef,
    pub uploads: UploadMap,
    pub context: ExecutionContext,
}

impl UploadEvent {
    pub fn new(kind: EventKind, record: RecordRef, uploads: UploadMap) -> Self {
        Self {
            kind,
            record,
            uploads,
            context: ExecutionContext::new(),
        }
    }

    pub fn with_context(mut self, context: ExecutionContext) -> Self {
        self.context = context;
        self
    }

    pub fn has_uploads(&self) -> bool {
        self.uploads.values().any(|files| !files.is_empty())
    }

    pub fn file_count(&self) -> usize {
        self.uploads.values().map(Vec::len).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPolicy {
    pub field: String,
    pub is_protected: bool,
}

impl FieldPolicy {
    pub fn cache_control(&self) -> Option<String> {
        self.is_protected.then(|| "no-cache".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Snapshot of an object's current headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_disposition: Option<String>,
    pub cache_control: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl ObjectMetadata {
    pub fn has_disposition(&self) -> bool {
        self.content_disposition
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// Headers written by an in-place metadata rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderUpdate {
    pub content_disposition: String,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectAcl {
    Private,
}

impl ObjectAcl {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectAcl::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReconcileReport {
    /// Objects whose headers were rewritten.
    pub headers_rewritten: usize,
    /// Objects that already carried a content-disposition.
    pub headers_skipped: usize,
    /// Objects set private.
    pub acl_applied: usize,
}
