//! `ObjectUploader`: the narrow capability the ingest pipeline talks to.
//!
//! The session and rotator never see a provider-specific type — they hold a
//! `dyn ObjectUploader` and call [`ObjectUploader::upload`], which never
//! fails the caller: any error is logged internally and swallowed.

mod s3;

use std::path::Path;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub use s3::S3Uploader;

/// Where the configured bucket lives.
#[derive(Debug, Clone)]
pub enum UploadProvider {
    Aws,
    S3Compatible {
        service_url: String,
        force_path_style: bool,
    },
}

/// Upload configuration, assembled once at startup by the server's
/// configuration loader and handed to every session by value.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub enabled: bool,
    pub upload_bin: bool,
    pub upload_wav: bool,
    pub prefix: String,
    pub bucket: String,
    pub region: String,
    pub provider: UploadProvider,
}

impl UploadConfig {
    pub fn disabled() -> UploadConfig {
        UploadConfig {
            enabled: false,
            upload_bin: false,
            upload_wav: false,
            prefix: String::new(),
            bucket: String::new(),
            region: String::new(),
            provider: UploadProvider::Aws,
        }
    }

    /// The object key for a file named `filename`, optionally namespaced
    /// under `hwid`. `prefix` is trimmed of surrounding slashes/whitespace.
    pub fn object_key(&self, hwid: Option<&str>, filename: &str) -> String {
        let prefix = self.prefix.trim().trim_matches('/');
        let prefix = if prefix.is_empty() { "received" } else { prefix };

        match hwid {
            Some(hwid) if !hwid.is_empty() => format!("{prefix}/{hwid}/{filename}"),
            _ => format!("{prefix}/{filename}"),
        }
    }
}

/// Best-effort upload of a local file under a computed key. Implementations
/// must never propagate failure to the caller — they log and move on, so the
/// session's teardown always completes.
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    async fn upload(&self, path: &Path, key: &str, cancellation: &CancellationToken);
}

/// An uploader that does nothing; used when uploads are disabled.
pub struct NullUploader;

#[async_trait]
impl ObjectUploader for NullUploader {
    async fn upload(&self, _path: &Path, _key: &str, _cancellation: &CancellationToken) {}
}
