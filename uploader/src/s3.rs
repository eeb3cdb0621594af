use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Builder as S3ConfigBuilder;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tokio_util::sync::CancellationToken;

use crate::{ObjectUploader, UploadConfig, UploadProvider};

/// Production `ObjectUploader` backed by S3 or an S3-compatible endpoint.
///
/// Construction is infallible from the caller's point of view: credential or
/// endpoint configuration problems surface as upload failures later, logged
/// and swallowed, not as a startup error. This mirrors the "never fails the
/// caller" contract all the way through.
pub struct S3Uploader {
    client: Client,
    bucket: String,
}

impl S3Uploader {
    pub async fn new(config: &UploadConfig) -> S3Uploader {
        let loader = aws_config::defaults(BehaviorVersion::latest()).region(
            aws_sdk_s3::config::Region::new(config.region.clone()),
        );
        let shared = loader.load().await;

        let mut builder = S3ConfigBuilder::from(&shared);
        if let UploadProvider::S3Compatible {
            service_url,
            force_path_style,
        } = &config.provider
        {
            builder = builder
                .endpoint_url(service_url.clone())
                .force_path_style(*force_path_style);
        }

        S3Uploader {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait]
impl ObjectUploader for S3Uploader {
    async fn upload(&self, path: &Path, key: &str, cancellation: &CancellationToken) {
        let body = tokio::select! {
            _ = cancellation.cancelled() => {
                log::warn!("upload of {key} cancelled before read, path={path:?}");
                return;
            }
            body = ByteStream::from_path(path) => body,
        };

        let body = match body {
            Ok(body) => body,
            Err(err) => {
                log::warn!("failed to open {path:?} for upload: {err}");
                return;
            }
        };

        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send();

        let result = tokio::select! {
            _ = cancellation.cancelled() => {
                log::warn!("upload of {key} cancelled in flight");
                return;
            }
            result = put => result,
        };

        match result {
            Ok(_) => log::info!("uploaded {path:?} to s3://{}/{key}", self.bucket),
            Err(err) => log::warn!("upload of {path:?} to s3://{}/{key} failed: {err}", self.bucket),
        }
    }
}
