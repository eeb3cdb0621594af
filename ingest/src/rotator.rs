use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ingest_protocol::WavSegmentWriter;
use ingest_uploader::{ObjectUploader, UploadConfig};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::clock::Clock;
use crate::paths::segment_paths;

/// WAV output parameters, present only when the handshake enabled WAV
/// decoding for this session.
#[derive(Debug, Clone, Copy)]
pub struct WavParams {
    pub sample_rate: u32,
    pub channels: u16,
}

struct OpenSegment {
    opened_at: Instant,
    bin_file: File,
    bin_path: PathBuf,
    wav: Option<WavSegmentWriter>,
    wav_path: Option<PathBuf>,
}

/// Owns the "current segment" for one session: the raw `.bin` handle and the
/// optional parallel `.wav` writer. Rotates on a wall-clock interval,
/// uploading each closed segment's files exactly once.
pub struct SegmentRotator {
    project_root: PathBuf,
    stream_id: u32,
    hwid: Option<String>,
    wav_params: Option<WavParams>,
    rotation_interval: Duration,
    uploader: Arc<dyn ObjectUploader>,
    upload_config: UploadConfig,
    clock: Arc<dyn Clock>,
    current: Option<OpenSegment>,
}

impl SegmentRotator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        project_root: PathBuf,
        stream_id: u32,
        hwid: Option<String>,
        wav_params: Option<WavParams>,
        rotation_interval: Duration,
        uploader: Arc<dyn ObjectUploader>,
        upload_config: UploadConfig,
        clock: Arc<dyn Clock>,
    ) -> SegmentRotator {
        SegmentRotator {
            project_root,
            stream_id,
            hwid,
            wav_params,
            rotation_interval,
            uploader,
            upload_config,
            clock,
            current: None,
        }
    }

    /// True if there is no current segment, or the current one has been open
    /// at least `rotation_interval`.
    pub fn should_rotate(&self) -> bool {
        match &self.current {
            None => true,
            Some(seg) => self.clock.monotonic_now().duration_since(seg.opened_at) >= self.rotation_interval,
        }
    }

    /// Closes the current segment (if any), uploads its files, then opens a
    /// fresh one. Close-then-upload ordering is enforced: the upload call is
    /// only made once `close()` has returned for both files.
    pub async fn rotate(&mut self) -> std::io::Result<()> {
        self.close_and_upload(&CancellationToken::new()).await?;
        self.open_new().await
    }

    async fn open_new(&mut self) -> std::io::Result<()> {
        let paths = segment_paths(
            &self.project_root,
            self.stream_id,
            self.hwid.as_deref(),
            self.clock.utc_now(),
        );

        if let Some(parent) = paths.bin_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bin_file = File::options()
            .create_new(true)
            .write(true)
            .open(&paths.bin_path)
            .await?;

        let wav = if let Some(params) = self.wav_params {
            let wav_path = paths.wav_path.clone();
            let writer = tokio::task::spawn_blocking(move || {
                WavSegmentWriter::create(&wav_path, params.sample_rate, params.channels)
            })
            .await
            .expect("wav writer open task panicked")?;
            Some(writer)
        } else {
            None
        };
        let wav_path = wav.is_some().then_some(paths.wav_path.clone());

        self.current = Some(OpenSegment {
            opened_at: self.clock.monotonic_now(),
            bin_file,
            bin_path: paths.bin_path,
            wav,
            wav_path,
        });

        Ok(())
    }

    /// Writes the full wire frame (header + payload) to the raw file and
    /// flushes it.
    pub async fn write_wire_frame(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let seg = self
            .current
            .as_mut()
            .expect("write_wire_frame called with no open segment");

        seg.bin_file.write_all(bytes).await?;
        seg.bin_file.flush().await
    }

    /// Writes decoded/raw PCM bytes to the WAV writer, if one is open.
    /// Returns the number of bytes written (0 if WAV is disabled).
    pub async fn write_pcm(&mut self, pcm: Vec<u8>) -> std::io::Result<usize> {
        let seg = self
            .current
            .as_mut()
            .expect("write_pcm called with no open segment");

        let Some(mut writer) = seg.wav.take() else {
            return Ok(0);
        };

        let len = pcm.len();
        let writer = tokio::task::spawn_blocking(move || -> std::io::Result<WavSegmentWriter> {
            writer.write_samples(&pcm)?;
            Ok(writer)
        })
        .await
        .expect("wav write task panicked")?;

        seg.wav = Some(writer);
        Ok(len)
    }

    /// Closes the current segment (if any) and uploads its files using
    /// `cancellation`. Teardown callers pass a fresh, non-cancellable token so
    /// the final upload attempt survives a cancelled connection.
    pub async fn close_and_upload(&mut self, cancellation: &CancellationToken) -> std::io::Result<()> {
        let Some(mut seg) = self.current.take() else {
            return Ok(());
        };

        seg.bin_file.flush().await?;
        drop(seg.bin_file);

        if let Some(writer) = seg.wav.take() {
            tokio::task::spawn_blocking(move || writer.close())
                .await
                .expect("wav close task panicked")?;
        }

        if self.upload_config.enabled {
            if self.upload_config.upload_bin {
                let key = self.upload_config.object_key(
                    self.hwid.as_deref(),
                    seg.bin_path.file_name().unwrap().to_str().unwrap(),
                );
                self.uploader.upload(&seg.bin_path, &key, cancellation).await;
            }

            if self.upload_config.upload_wav {
                if let Some(wav_path) = seg.wav_path.as_ref() {
                    let key = self.upload_config.object_key(
                        self.hwid.as_deref(),
                        wav_path.file_name().unwrap().to_str().unwrap(),
                    );
                    self.uploader.upload(wav_path, &key, cancellation).await;
                }
            }
        }

        Ok(())
    }

    /// True once a segment has been opened at least once; used to decide
    /// whether teardown has any files to close.
    pub fn has_open_segment(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_uploader::NullUploader;
    use std::sync::Mutex;

    struct FakeClock {
        monotonic: Mutex<Instant>,
        utc: chrono::DateTime<chrono::Utc>,
    }

    impl Clock for FakeClock {
        fn monotonic_now(&self) -> Instant {
            *self.monotonic.lock().unwrap()
        }

        fn utc_now(&self) -> chrono::DateTime<chrono::Utc> {
            self.utc
        }
    }

    fn rotator(root: PathBuf, clock: Arc<dyn Clock>) -> SegmentRotator {
        SegmentRotator::new(
            root,
            0x2A,
            None,
            None,
            Duration::from_secs(10),
            Arc::new(NullUploader),
            UploadConfig::disabled(),
            clock,
        )
    }

    #[tokio::test]
    async fn rotates_after_interval_elapses() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClock {
            monotonic: Mutex::new(Instant::now()),
            utc: chrono::Utc::now(),
        });
        let mut rot = rotator(dir.path().to_path_buf(), clock.clone());

        assert!(rot.should_rotate());
        rot.rotate().await.unwrap();
        assert!(!rot.should_rotate());

        *clock.monotonic.lock().unwrap() += Duration::from_secs(11);
        assert!(rot.should_rotate());
    }

    #[tokio::test]
    async fn teardown_with_no_segment_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FakeClock {
            monotonic: Mutex::new(Instant::now()),
            utc: chrono::Utc::now(),
        });
        let mut rot = rotator(dir.path().to_path_buf(), clock);
        assert!(!rot.has_open_segment());
        rot.close_and_upload(&CancellationToken::new()).await.unwrap();
    }
}
