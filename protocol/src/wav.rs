use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

const HEADER_LEN: u64 = 44;
const BITS_PER_SAMPLE: u16 = 16;

/// Writes a canonical 16-bit PCM WAV file incrementally: a header with
/// placeholder sizes is written on open, sample bytes are appended as they
/// arrive, and the RIFF/data sizes are patched in on [`close`](Self::close).
///
/// `close` must run even if a preceding write failed, so callers keep the
/// writer around and always call it on every exit path (including error
/// paths) rather than relying on `Drop` to finalize sizes.
pub struct WavSegmentWriter {
    file: File,
    sample_rate: u32,
    channels: u16,
    data_bytes: u32,
}

impl WavSegmentWriter {
    pub fn create(path: &Path, sample_rate: u32, channels: u16) -> io::Result<WavSegmentWriter> {
        let mut file = File::options().create_new(true).write(true).open(path)?;
        Self::write_placeholder_header(&mut file, sample_rate, channels)?;

        Ok(WavSegmentWriter {
            file,
            sample_rate,
            channels,
            data_bytes: 0,
        })
    }

    fn write_placeholder_header(file: &mut File, sample_rate: u32, channels: u16) -> io::Result<()> {
        let block_align = channels * (BITS_PER_SAMPLE / 8);
        let byte_rate = sample_rate * block_align as u32;

        file.write_all(b"RIFF")?;
        file.write_all(&0u32.to_le_bytes())?; // size - 8, patched on close
        file.write_all(b"WAVE")?;
        file.write_all(b"fmt ")?;
        file.write_all(&16u32.to_le_bytes())?;
        file.write_all(&1u16.to_le_bytes())?; // PCM
        file.write_all(&channels.to_le_bytes())?;
        file.write_all(&sample_rate.to_le_bytes())?;
        file.write_all(&byte_rate.to_le_bytes())?;
        file.write_all(&block_align.to_le_bytes())?;
        file.write_all(&BITS_PER_SAMPLE.to_le_bytes())?;
        file.write_all(b"data")?;
        file.write_all(&0u32.to_le_bytes())?; // data size, patched on close

        Ok(())
    }

    /// Appends raw PCM sample bytes.
    pub fn write_samples(&mut self, pcm: &[u8]) -> io::Result<()> {
        self.file.write_all(pcm)?;
        self.data_bytes += pcm.len() as u32;
        Ok(())
    }

    pub fn data_bytes(&self) -> u32 {
        self.data_bytes
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Patches the RIFF and data chunk sizes and flushes the file.
    pub fn close(mut self) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(4))?;
        self.file
            .write_all(&(36 + self.data_bytes).to_le_bytes())?;

        self.file.seek(SeekFrom::Start(40))?;
        self.file.write_all(&self.data_bytes.to_le_bytes())?;

        self.file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn header_sizes_are_finalized_on_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.wav");

        let mut writer = WavSegmentWriter::create(&path, 16000, 1).unwrap();
        writer.write_samples(&[0u8; 320]).unwrap();
        assert_eq!(writer.data_bytes(), 320);
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(bytes.len(), HEADER_LEN as usize + 320);

        let riff_size = u32::from_le_bytes(bytes[4..8].try_into().unwrap());
        assert_eq!(riff_size, 36 + 320);

        let data_size = u32::from_le_bytes(bytes[40..44].try_into().unwrap());
        assert_eq!(data_size, 320);
    }

    #[test]
    fn collision_on_create_new_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("segment.wav");
        WavSegmentWriter::create(&path, 16000, 1).unwrap().close().unwrap();
        assert!(WavSegmentWriter::create(&path, 16000, 1).is_err());
    }
}
