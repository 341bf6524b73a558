use crate::config::StorageSettings;
use crate::models::{HeaderUpdate, ObjectAcl, ObjectMetadata, ObjectRef};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use std::sync::Arc;

/// Operations the reconciliation pipelines need from a bucket.
#[async_trait]
pub trait BucketClient: Send + Sync {
    async fn get_object_metadata(&self, object: &ObjectRef) -> Result<ObjectMetadata>;

    /// Re-stores `object` onto itself with `headers` applied and every other
    /// header taken from `preserved`.
    async fn copy_object_with_metadata(
        &self,
        object: &ObjectRef,
        headers: &HeaderUpdate,
        preserved: &ObjectMetadata,
    ) -> Result<()>;

    async fn set_object_acl(&self, object: &ObjectRef, acl: ObjectAcl) -> Result<()>;
}

/// Keeps `/` unescaped so the copy source stays a path.
const COPY_SOURCE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

pub struct S3BucketClient {
    client: Client,
}

impl S3BucketClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BucketClient for S3BucketClient {
    async fn get_object_metadata(&self, object: &ObjectRef) -> Result<ObjectMetadata> {
        let res = self
            .client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await;

        let out = match res {
            Ok(out) => out,
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    return Err(anyhow!("object {} not found", object));
                }
                return Err(anyhow!(service_error));
            }
        };

        Ok(ObjectMetadata {
            content_type: out.content_type,
            content_encoding: out.content_encoding,
            content_language: out.content_language,
            content_disposition: out.content_disposition,
            cache_control: out.cache_control,
            metadata: out.metadata.unwrap_or_default(),
        })
    }

    async fn copy_object_with_metadata(
        &self,
        object: &ObjectRef,
        headers: &HeaderUpdate,
        preserved: &ObjectMetadata,
    ) -> Result<()> {
        let copy_source = format!(
            "{}/{}",
            object.bucket,
            utf8_percent_encode(&object.key, COPY_SOURCE)
        );

        let res = self
            .client
            .copy_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .copy_source(copy_source)
            .metadata_directive(MetadataDirective::Replace)
            .content_disposition(&headers.content_disposition)
            .set_cache_control(headers.cache_control.clone())
            .set_content_type(preserved.content_type.clone())
            .set_content_encoding(preserved.content_encoding.clone())
            .set_content_language(preserved.content_language.clone())
            .set_metadata(Some(preserved.metadata.clone()))
            .send()
            .await;

        if let Err(e) = res {
            tracing::error!("S3 copy_object failed: object={}, error={:?}", object, e);
            return Err(e.into());
        }
        Ok(())
    }

    async fn set_object_acl(&self, object: &ObjectRef, acl: ObjectAcl) -> Result<()> {
        let canned = match acl {
            ObjectAcl::Private => ObjectCannedAcl::Private,
        };

        self.client
            .put_object_acl()
            .bucket(&object.bucket)
            .key(&object.key)
            .acl(canned)
            .send()
            .await?;
        Ok(())
    }
}

/// A bucket client held for the duration of one event's reconciliation.
pub struct BucketSession {
    client: Arc<dyn BucketClient>,
    bucket: String,
}

impl BucketSession {
    pub fn new(client: Arc<dyn BucketClient>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn client(&self) -> Arc<dyn BucketClient> {
        Arc::clone(&self.client)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

impl Drop for BucketSession {
    fn drop(&mut self) {
        tracing::debug!("Released bucket session for '{}'", self.bucket);
    }
}

/// Hands out bucket sessions for the settings current at call time.
#[async_trait]
pub trait BucketConnector: Send + Sync {
    async fn open(&self, settings: &StorageSettings) -> Result<BucketSession>;
}

/// Builds an S3 client per session on top of a shared base SDK config.
pub struct S3Connector {
    base: aws_config::SdkConfig,
}

impl S3Connector {
    pub fn new(base: aws_config::SdkConfig) -> Self {
        Self { base }
    }

    pub fn client_for(&self, settings: &StorageSettings) -> Client {
        let mut builder = aws_sdk_s3::config::Builder::from(&self.base)
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .force_path_style(settings.force_path_style);

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if let (Some(access_key), Some(secret_key)) = (&settings.access_key, &settings.secret_key)
        {
            builder = builder.credentials_provider(Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "static",
            ));
        }

        Client::from_conf(builder.build())
    }
}

#[async_trait]
impl BucketConnector for S3Connector {
    async fn open(&self, settings: &StorageSettings) -> Result<BucketSession> {
        if settings.bucket.is_empty() {
            return Err(anyhow!("no S3 bucket configured"));
        }
        let client = S3BucketClient::new(self.client_for(settings));
        Ok(BucketSession::new(Arc::new(client), settings.bucket.clone()))
    }
}

/// Serves sessions over a client injected at construction time.
pub struct SharedClientConnector {
    client: Arc<dyn BucketClient>,
}

impl SharedClientConnector {
    pub fn new(client: Arc<dyn BucketClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BucketConnector for SharedClientConnector {
    async fn open(&self, settings: &StorageSettings) -> Result<BucketSession> {
        Ok(BucketSession::new(
            Arc::clone(&self.client),
            settings.bucket.clone(),
        ))
    }
}
