//! Audio file playback as an analysis source.
//!
//! The file is decoded twice on the capture thread: `symphonia` streams mono
//! samples into the shared [`SampleBuffer`] at the file's own sample rate,
//! and `rodio` plays it on the default output so what is seen is also heard.
//! Without an output device the file is still analysed, just silently.
//!
//! The thread reports `Ended` once every decoded sample has been fed, and
//! honours the task's pause flag by holding its position and pausing the
//! sink.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::{Duration, Instant};

use symphonia::core::audio::SampleBuffer as DecodeBuffer;
use symphonia::core::codecs::{Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::capture::{CaptureInfo, CaptureTask, SampleBuffer, TaskContext};
use crate::error::AudioError;

/// How often the feeding thread wakes to push due samples.
pub const FEED_INTERVAL: Duration = Duration::from_millis(15);

/// Start playing `path` into `buffer` on a capture thread.
pub fn spawn(path: PathBuf, buffer: Arc<SampleBuffer>) -> Result<CaptureTask, AudioError> {
    CaptureTask::spawn_thread(move |ctx| {
        let mut decoder = match FileDecoder::open(&path) {
            Ok(decoder) => decoder,
            Err(err) => return ctx.signal.failed(err),
        };
        let playback = match Playback::open(&path) {
            Ok(playback) => Some(playback),
            Err(err) => {
                log::warn!("analysing {} without sound: {err}", path.display());
                None
            }
        };

        let info = CaptureInfo {
            device_name: file_label(&path),
            sample_rate: decoder.sample_rate(),
            channels: decoder.channels(),
        };
        if !ctx.signal.ready(info) {
            return;
        }
        feed(&mut decoder, playback.as_ref(), &buffer, &ctx);
    })
}

fn feed(
    decoder: &mut FileDecoder,
    playback: Option<&Playback>,
    buffer: &SampleBuffer,
    ctx: &TaskContext,
) {
    let mut pacer = Pacer::new(decoder.sample_rate());
    let mut pending = Vec::new();
    let mut last = Instant::now();
    let mut was_paused = false;

    loop {
        match ctx.stop.recv_timeout(FEED_INTERVAL) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
        }

        let now = Instant::now();
        let elapsed = now.duration_since(last);
        last = now;

        let paused = ctx.paused.load(Ordering::Relaxed);
        if paused != was_paused {
            if let Some(playback) = playback {
                playback.set_paused(paused);
            }
            was_paused = paused;
        }
        if paused {
            continue;
        }

        let due = pacer.due(elapsed);
        let mut finished = false;
        while pending.len() < due {
            match decoder.next_chunk(&mut pending) {
                Ok(true) => {}
                Ok(false) => {
                    finished = true;
                    break;
                }
                Err(err) => return ctx.signal.lost(err),
            }
        }

        let take = due.min(pending.len());
        buffer.push(&pending[..take]);
        pending.drain(..take);

        if finished && pending.is_empty() {
            log::debug!("audio file finished");
            return ctx.signal.ended();
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Converts elapsed wall time into a whole number of due samples, carrying
/// the fraction to the next call.
#[derive(Debug, Clone)]
pub struct Pacer {
    rate: f64,
    carry: f64,
}

impl Pacer {
    /// A pacer for `sample_rate` samples per second.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            rate: sample_rate as f64,
            carry: 0.0,
        }
    }

    /// Samples that became due during `elapsed`.
    pub fn due(&mut self, elapsed: Duration) -> usize {
        self.carry += elapsed.as_secs_f64() * self.rate;
        let whole = self.carry.floor();
        self.carry -= whole;
        whole as usize
    }
}

/// Streaming mono decoder for one audio file.
pub struct FileDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
}

impl FileDecoder {
    /// Detect the container of `path` and prepare its default track.
    pub fn open(path: &Path) -> Result<Self, AudioError> {
        let file = File::open(path).map_err(AudioError::OpenFile)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let detected = symphonia::default::get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let format = detected.format;

        let track = format.default_track().ok_or(AudioError::NoAudioTrack)?;
        let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);
        let track_id = track.id;
        let decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        Ok(Self {
            format,
            decoder,
            track_id,
            sample_rate,
            channels,
        })
    }

    /// Decode the next packet and append its mono samples to `out`.
    ///
    /// Returns `Ok(false)` at the end of the stream. Packets that fail to
    /// decode are skipped.
    pub fn next_chunk(&mut self, out: &mut Vec<f32>) -> Result<bool, AudioError> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == ErrorKind::UnexpectedEof => {
                    return Ok(false)
                }
                Err(SymphoniaError::ResetRequired) => return Ok(false),
                Err(err) => return Err(err.into()),
            };
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(reason)) => {
                    log::debug!("skipping undecodable packet: {reason}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count().max(1);
            let mut samples = DecodeBuffer::<f32>::new(decoded.capacity() as u64, spec);
            samples.copy_interleaved_ref(decoded);
            out.extend(
                samples
                    .samples()
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32),
            );
            return Ok(true);
        }
    }

    /// Sample rate of the decoded track.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Channel count of the decoded track before down-mixing.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl std::fmt::Debug for FileDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileDecoder")
            .field("track_id", &self.track_id)
            .field("sample_rate", &self.sample_rate)
            .field("channels", &self.channels)
            .finish()
    }
}

/// Audible playback on the default output device.
struct Playback {
    _stream: rodio::OutputStream,
    _handle: rodio::OutputStreamHandle,
    sink: rodio::Sink,
}

impl Playback {
    fn open(path: &Path) -> Result<Self, AudioError> {
        let (stream, handle) =
            rodio::OutputStream::try_default().map_err(AudioError::OutputDevice)?;
        let sink = rodio::Sink::try_new(&handle).map_err(AudioError::Playback)?;
        let file = File::open(path).map_err(AudioError::OpenFile)?;
        let source = rodio::Decoder::new(BufReader::new(file)).map_err(AudioError::PlaybackDecode)?;
        sink.append(source);
        Ok(Self {
            _stream: stream,
            _handle: handle,
            sink,
        })
    }

    fn set_paused(&self, paused: bool) {
        if paused {
            self.sink.pause();
        } else {
            self.sink.play();
        }
    }
}

/// Write a 16-bit PCM WAV file. Test support for the file source.
#[cfg(test)]
pub(crate) fn write_test_wav(path: &Path, sample_rate: u32, channels: u16, frames: &[i16]) {
    use std::io::Write;

    let data_len = (frames.len() * channels as usize * 2) as u32;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVEfmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * channels as u32 * 2).to_le_bytes());
    bytes.extend_from_slice(&(channels * 2).to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    for &sample in frames {
        for _ in 0..channels {
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }
    let mut file = File::create(path).unwrap();
    file.write_all(&bytes).unwrap();
}
