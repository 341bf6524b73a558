use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Bucket integration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// Whether uploaded files live in the S3 bucket (default: false)
    pub enabled: bool,

    /// Target bucket name
    pub bucket: String,

    /// Bucket region (default: "us-east-1")
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...)
    pub endpoint: Option<String>,

    /// Static access key; the SDK credential chain is used when unset
    pub access_key: Option<String>,

    /// Static secret key
    pub secret_key: Option<String>,

    /// Use path-style addressing (default: false)
    pub force_path_style: bool,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            force_path_style: false,
        }
    }
}

impl StorageSettings {
    /// Load settings from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            enabled: env::var("S3_ENABLED")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.enabled),

            bucket: env::var("S3_BUCKET").unwrap_or(default.bucket),

            region: env::var("S3_REGION").unwrap_or(default.region),

            endpoint: env::var("S3_ENDPOINT").ok().filter(|v| !v.is_empty()),

            access_key: env::var("S3_ACCESS_KEY").ok().filter(|v| !v.is_empty()),

            secret_key: env::var("S3_SECRET").ok().filter(|v| !v.is_empty()),

            force_path_style: env::var("S3_FORCE_PATH_STYLE")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(default.force_path_style),
        }
    }

    /// Local MinIO defaults for development
    pub fn development() -> Self {
        Self {
            enabled: true,
            bucket: "uploads".to_string(),
            region: "us-east-1".to_string(),
            endpoint: Some("http://127.0.0.1:9000".to_string()),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            force_path_style: true,
        }
    }
}

/// Webhook server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address (default: 127.0.0.1:8090)
    pub bind_addr: SocketAddr,

    /// Bearer secret required on hook requests (disabled when unset)
    pub hook_secret: Option<String>,

    /// JSON file with the collection schemas
    pub collections_file: Option<PathBuf>,

    /// Per-event deadline for bucket calls in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Collection ids or names whose uploads are reconciled (default: all)
    pub hook_collections: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8090)),
            hook_secret: None,
            collections_file: None,
            request_timeout_secs: 30,
            hook_collections: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            bind_addr: env::var("BIND_ADDR")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.bind_addr),

            hook_secret: env::var("HOOK_SECRET").ok().filter(|v| !v.is_empty()),

            collections_file: env::var("COLLECTIONS_FILE").ok().map(PathBuf::from),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.request_timeout_secs),

            hook_collections: env::var("HOOK_COLLECTIONS")
                .map(|v| parse_list(&v))
                .unwrap_or(default.hook_collections),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
