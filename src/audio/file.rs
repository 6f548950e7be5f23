use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

use super::capture::{AudioCapture, AudioClip};
use super::signal::StopSignal;
use crate::error::VoiceError;

pub const WAV_MIME: &str = "audio/wav";

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_format != SampleFormat::Int || spec.bits_per_sample != 16 {
            anyhow::bail!(
                "Unsupported WAV format: {:?} {}-bit (expected 16-bit PCM)",
                spec.sample_format,
                spec.bits_per_sample
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Number of interleaved samples covering `elapsed`, rounded down to whole frames
    pub fn samples_for(&self, elapsed: Duration) -> usize {
        let channels = self.channels.max(1) as usize;
        let frames = (elapsed.as_secs_f64() * self.sample_rate as f64) as usize;
        (frames * channels).min(self.samples.len())
    }

    /// Encode the first `sample_count` samples as an in-memory 16-bit WAV file
    pub fn encode_wav(&self, sample_count: usize) -> Result<Vec<u8>> {
        let spec = WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };

        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer =
                WavWriter::new(&mut buffer, spec).context("Failed to create WAV writer")?;
            for &sample in &self.samples[..sample_count.min(self.samples.len())] {
                writer
                    .write_sample(sample)
                    .context("Failed to write sample")?;
            }
            writer.finalize().context("Failed to finalize WAV")?;
        }

        Ok(buffer.into_inner())
    }

    fn duration_ms_for(&self, sample_count: usize) -> u64 {
        let per_second = self.sample_rate as f64 * self.channels.max(1) as f64;
        if per_second == 0.0 {
            return 0;
        }
        (sample_count as f64 / per_second * 1000.0).round() as u64
    }
}

/// Capture backend that replays prerecorded WAV files, one per `capture` call.
///
/// With `realtime` enabled each file takes its own duration to "record" and
/// an early stop truncates the clip to the audio heard so far; otherwise the
/// whole file is returned immediately.
pub struct WavFileCapture {
    queue: Mutex<VecDeque<PathBuf>>,
    realtime: bool,
}

impl WavFileCapture {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            queue: Mutex::new(paths.into_iter().collect()),
            realtime: false,
        }
    }

    pub fn realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    pub fn remaining(&self) -> usize {
        self.queue.lock().map(|q| q.len()).unwrap_or(0)
    }

    fn next_path(&self) -> Result<PathBuf, VoiceError> {
        let mut queue = self
            .queue
            .lock()
            .map_err(|_| VoiceError::capture("capture queue poisoned"))?;
        queue
            .pop_front()
            .ok_or_else(|| VoiceError::capture("no more recordings queued"))
    }
}

#[async_trait::async_trait]
impl AudioCapture for WavFileCapture {
    async fn capture(&self, mut stop: StopSignal) -> Result<AudioClip, VoiceError> {
        let path = self.next_path()?;
        let audio = AudioFile::open(&path).map_err(|e| VoiceError::capture(format!("{e:#}")))?;

        let sample_count = if self.realtime {
            let total = Duration::from_secs_f64(audio.duration_seconds);
            let started = tokio::time::Instant::now();
            tokio::select! {
                _ = tokio::time::sleep(total) => audio.samples.len(),
                _ = stop.stopped() => {
                    let heard = audio.samples_for(started.elapsed());
                    info!("Capture of {} stopped early after {} samples", audio.path, heard);
                    heard
                }
            }
        } else {
            audio.samples.len()
        };

        if sample_count == 0 {
            warn!("Capture of {} produced no samples", audio.path);
        }

        let bytes = audio
            .encode_wav(sample_count)
            .map_err(|e| VoiceError::capture(format!("{e:#}")))?;

        Ok(AudioClip::new(bytes, WAV_MIME).with_duration_ms(audio.duration_ms_for(sample_count)))
    }

    fn name(&self) -> &str {
        "wav-file"
    }
}
