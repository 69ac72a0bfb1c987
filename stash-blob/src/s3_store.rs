use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream as AwsByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::fmt;
use tracing::{debug, warn};

use stash_core::{StashConfigSnapshot, StorageKey};

use crate::{BlobError, BlobResult, PutResult, StorageLocation, UploadStore, Visibility};

/// S3-compatible bucket settings
#[derive(Clone, PartialEq, Eq)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    /// Prepended to every storage key, e.g. `uploads/`.
    pub key_prefix: String,
    /// `{bucket}` and `{key}` are substituted; `{key}` includes the prefix.
    pub public_url_template: String,
    /// Fail the upload (and delete the object) when public-read cannot be set.
    pub require_public_acl: bool,
    pub force_path_style: bool,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "<redacted>"),
            )
            .field("key_prefix", &self.key_prefix)
            .field("public_url_template", &self.public_url_template)
            .field("require_public_acl", &self.require_public_acl)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

impl S3Config {
    pub const DEFAULT_REGION: &'static str = "us-east-1";
    pub const DEFAULT_KEY_PREFIX: &'static str = "uploads/";
    pub const DEFAULT_URL_TEMPLATE: &'static str = "https://storage.googleapis.com/{bucket}/{key}";

    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            region: Self::DEFAULT_REGION.to_string(),
            endpoint_url: None,
            access_key_id: None,
            secret_access_key: None,
            key_prefix: Self::DEFAULT_KEY_PREFIX.to_string(),
            public_url_template: Self::DEFAULT_URL_TEMPLATE.to_string(),
            require_public_acl: false,
            force_path_style: false,
        }
    }

    /// Read `storage.s3.*` keys. The bucket is required.
    pub fn from_config(config: &StashConfigSnapshot) -> BlobResult<Self> {
        let bucket = config
            .get_string("storage.s3.bucket")
            .ok_or_else(|| {
                BlobError::invalid("storage.s3.bucket is required for the s3 backend")
            })?;

        let mut s3 = Self::new(bucket);
        if let Some(region) = config.get_string("storage.s3.region") {
            s3.region = region;
        }
        s3.endpoint_url = config.get_string("storage.s3.endpoint_url");
        s3.access_key_id = config.get_string("storage.s3.access_key_id");
        s3.secret_access_key = config.get_string("storage.s3.secret_access_key");
        if let Some(prefix) = config.get_string("storage.s3.key_prefix") {
            s3 = s3.with_key_prefix(prefix);
        }
        if let Some(template) = config.get_string("storage.s3.public_url_template") {
            s3.public_url_template = template;
        }
        s3.require_public_acl = config
            .get_bool("storage.s3.require_public_acl")
            .unwrap_or(false);
        s3.force_path_style = config
            .get_bool("storage.s3.force_path_style")
            .unwrap_or(s3.endpoint_url.is_some());

        if s3.access_key_id.is_some() != s3.secret_access_key.is_some() {
            return Err(BlobError::invalid(
                "storage.s3.access_key_id and storage.s3.secret_access_key must be set together",
            ));
        }
        Ok(s3)
    }

    /// Normalise to `segment/` (or empty for no prefix).
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        let trimmed = prefix.trim_matches('/');
        self.key_prefix = if trimmed.is_empty() {
            String::new()
        } else {
            format!("{}/", trimmed)
        };
        self
    }

    pub fn with_public_url_template(mut self, template: impl Into<String>) -> Self {
        self.public_url_template = template.into();
        self
    }

    pub fn object_key(&self, key: &StorageKey) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// Deterministic public URL; never taken from the provider response.
    pub fn render_url(&self, object_key: &str) -> String {
        self.public_url_template
            .replace("{bucket}", &self.bucket)
            .replace("{key}", object_key)
    }
}

/// Object store backend speaking the S3 API (AWS, GCS interop, MinIO, RustFS)
#[derive(Clone)]
pub struct S3CompatibleStore {
    client: Client,
    config: S3Config,
}

impl S3CompatibleStore {
    /// Build a client from the config, falling back to the default AWS
    /// credential chain when no explicit keys are given.
    pub async fn connect(config: S3Config) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()));

        if let (Some(access_key_id), Some(secret)) =
            (config.access_key_id.clone(), config.secret_access_key.clone())
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret,
                None,
                None,
                "stash",
            ));
        }
        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }

        let shared = loader.load().await;
        let client = Client::from_conf(
            aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(config.force_path_style)
                .build(),
        );

        debug!(bucket = %config.bucket, prefix = %config.key_prefix, "s3 upload store ready");
        Self { client, config }
    }

    pub fn with_client(client: Client, config: S3Config) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &S3Config {
        &self.config
    }

    async fn make_public(&self, object_key: &str) -> BlobResult<()> {
        self.client
            .put_object_acl()
            .bucket(&self.config.bucket)
            .key(object_key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| BlobError::visibility(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl UploadStore for S3CompatibleStore {
    async fn write(
        &self,
        key: &StorageKey,
        bytes: Bytes,
        mime_type: &str,
    ) -> BlobResult<PutResult> {
        let object_key = self.config.object_key(key);
        let size_bytes = bytes.len() as u64;

        let output = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .content_type(mime_type)
            .body(AwsByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| BlobError::backend_message(DisplayErrorContext(&e).to_string(), e))?;

        let location = StorageLocation::Object {
            key: key.clone(),
            bucket: self.config.bucket.clone(),
            object_key: object_key.clone(),
        };

        let visibility = match self.make_public(&object_key).await {
            Ok(()) => Visibility::Public,
            Err(e) if self.config.require_public_acl => {
                warn!(
                    object_key = %object_key,
                    error = %e,
                    "public-read failed, removing object"
                );
                if let Err(cleanup) = self.delete(&location).await {
                    warn!(
                        object_key = %object_key,
                        error = %cleanup,
                        "failed to remove unpublished object"
                    );
                }
                return Err(e);
            }
            Err(e) => {
                warn!(
                    object_key = %object_key,
                    error = %e,
                    "public-read failed, URL may not resolve"
                );
                Visibility::Unconfirmed
            }
        };

        Ok(PutResult {
            location,
            size_bytes,
            etag: output.e_tag().map(str::to_string),
            visibility,
        })
    }

    fn public_url(&self, location: &StorageLocation) -> BlobResult<String> {
        match location {
            StorageLocation::Object { object_key, .. } => Ok(self.config.render_url(object_key)),
            StorageLocation::Local { .. } => Err(BlobError::invalid(
                "local location passed to the object-store backend",
            )),
        }
    }

    async fn delete(&self, location: &StorageLocation) -> BlobResult<()> {
        let object_key = match location {
            StorageLocation::Object { object_key, .. } => object_key.clone(),
            StorageLocation::Local { .. } => self.config.object_key(location.key()),
        };
        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(object_key)
            .send()
            .await
            .map_err(|e| BlobError::backend_message(DisplayErrorContext(&e).to_string(), e))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
