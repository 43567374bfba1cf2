//! Audio input, spectral analysis and feature extraction.
//!
//! [`AudioHub`] is the only piece the render loop talks to. Once per frame it
//! calls [`AudioHub::poll`] and gets a [`SpectrumFrame`]: the newest byte
//! spectrum plus whether a source is live. Acquisition runs on its own thread
//! (see [`capture`] and [`file`]) and may fail at any time; failure leaves
//! the frame inactive and the visualization keeps running.
//!
//! # Source control
//!
//! | Call | Effect |
//! |------|--------|
//! | [`request_microphone`](AudioHub::request_microphone) | release the current source, open the microphone (`Connecting`) |
//! | [`request_file`](AudioHub::request_file) | release the current source, play a file (`Connecting`) |
//! | [`stop`](AudioHub::stop) | release the current source (`Stopped`); no-op if nothing runs |
//! | [`toggle_microphone`](AudioHub::toggle_microphone) | stop the microphone if it is attached, otherwise open it |
//! | [`toggle_pause`](AudioHub::toggle_pause) | `Live` <-> `Paused`; paused reads as inactive. Replays an ended file |
//!
//! A source that dies after going live (`Blocked`) or a file that runs out
//! (`Ended`) is released on the next poll and its samples discarded.

pub mod analyser;
pub mod capture;
pub mod features;
pub mod file;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

pub use analyser::{SpectrumAnalyser, DEFAULT_FFT_SIZE};
pub use capture::{CaptureInfo, CapturePoll, CaptureTask, SampleBuffer, TaskSignal};
pub use features::AudioFeatures;
pub use file::FileDecoder;

use crate::error::AudioError;

/// One frame's view of the audio input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpectrumFrame {
    /// Byte magnitudes, one per bin.
    pub bins: Vec<u8>,
    /// Whether a source is live. Inactive frames reduce to silent features
    /// regardless of `bins`.
    pub active: bool,
}

impl SpectrumFrame {
    /// An inactive frame of `bins` zeros.
    pub fn silent(bins: usize) -> Self {
        Self {
            bins: vec![0; bins],
            active: false,
        }
    }

    /// An active frame with the given bins.
    pub fn live(bins: Vec<u8>) -> Self {
        Self { bins, active: true }
    }

    /// Reduce to banded features.
    pub fn features(&self) -> AudioFeatures {
        AudioFeatures::extract(&self.bins, self.active)
    }
}

/// Which kind of source feeds the hub.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioSource {
    /// The default input device.
    Microphone,
    /// An audio file, played once.
    File(PathBuf),
}

impl fmt::Display for AudioSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioSource::Microphone => write!(f, "microphone"),
            AudioSource::File(path) => write!(f, "file {}", path.display()),
        }
    }
}

/// Where the audio source stands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioStatus {
    /// No source has been requested.
    Idle,
    /// Waiting for the source to open.
    Connecting,
    /// Capturing and analysing.
    Live,
    /// Analysis is paused. A paused file also holds its position.
    Paused,
    /// The source was stopped.
    Stopped,
    /// A file source played to its end.
    Ended,
    /// The source could not be opened, or failed while running.
    Blocked(String),
}

impl fmt::Display for AudioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioStatus::Idle => write!(f, "idle"),
            AudioStatus::Connecting => write!(f, "connecting"),
            AudioStatus::Live => write!(f, "live"),
            AudioStatus::Paused => write!(f, "paused"),
            AudioStatus::Stopped => write!(f, "stopped"),
            AudioStatus::Ended => write!(f, "ended"),
            AudioStatus::Blocked(reason) => write!(f, "blocked: {reason}"),
        }
    }
}

/// Owns the capture task, the shared sample buffer and the analyser.
#[derive(Debug)]
pub struct AudioHub {
    buffer: Arc<SampleBuffer>,
    analyser: SpectrumAnalyser,
    capture: Option<CaptureTask>,
    source: Option<AudioSource>,
    info: Option<CaptureInfo>,
    status: AudioStatus,
    window: Vec<f32>,
    frame: SpectrumFrame,
}

impl AudioHub {
    /// Create an idle hub with an analyser of `fft_size`.
    pub fn new(fft_size: usize) -> Self {
        let analyser = SpectrumAnalyser::new(fft_size);
        let bins = analyser.bin_count();
        Self {
            buffer: Arc::new(SampleBuffer::new(analyser.fft_size())),
            frame: SpectrumFrame::silent(bins),
            analyser,
            capture: None,
            source: None,
            info: None,
            status: AudioStatus::Idle,
            window: Vec::new(),
        }
    }

    /// Start the given source.
    pub fn request(&mut self, source: AudioSource) {
        match source {
            AudioSource::Microphone => self.request_microphone(),
            AudioSource::File(path) => self.request_file(path),
        }
    }

    /// Start capturing from the default microphone.
    pub fn request_microphone(&mut self) {
        let buffer = self.buffer.clone();
        self.request_source(AudioSource::Microphone, move || CaptureTask::spawn(buffer));
    }

    /// Start playing an audio file.
    pub fn request_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let buffer = self.buffer.clone();
        let task_path = path.clone();
        self.request_source(AudioSource::File(path), move || {
            file::spawn(task_path, buffer)
        });
    }

    /// Start a source from any task constructor. Any previous source is
    /// released first.
    pub fn request_source<F>(&mut self, source: AudioSource, start: F)
    where
        F: FnOnce() -> Result<CaptureTask, AudioError>,
    {
        self.stop();
        self.discard_samples();

        log::info!("audio source requested: {source}");
        self.source = Some(source);
        match start() {
            Ok(task) => {
                self.capture = Some(task);
                self.status = AudioStatus::Connecting;
            }
            Err(err) => self.block(err),
        }
    }

    /// Release the current source. Safe to call repeatedly.
    ///
    /// Never waits on a source that is still opening.
    pub fn stop(&mut self) {
        if let Some(mut task) = self.capture.take() {
            task.stop();
            self.info = None;
            self.status = AudioStatus::Stopped;
            log::info!("audio source stopped");
        }
    }

    /// Stop the microphone if it is attached, otherwise open it. Opening it
    /// releases a playing file.
    pub fn toggle_microphone(&mut self) {
        if self.capture.is_some() && self.source == Some(AudioSource::Microphone) {
            self.stop();
        } else {
            self.request_microphone();
        }
    }

    /// Flip between `Live` and `Paused`. A file that ended or was stopped is
    /// played again from the start. Other states are unchanged.
    pub fn toggle_pause(&mut self) -> &AudioStatus {
        let paused = match self.status {
            AudioStatus::Live => true,
            AudioStatus::Paused => false,
            AudioStatus::Ended | AudioStatus::Stopped => {
                if let Some(AudioSource::File(path)) = self.source.clone() {
                    self.request_file(path);
                }
                return &self.status;
            }
            _ => return &self.status,
        };
        if let Some(task) = &self.capture {
            task.set_paused(paused);
        }
        self.status = if paused {
            AudioStatus::Paused
        } else {
            AudioStatus::Live
        };
        log::debug!("audio {}", self.status);
        &self.status
    }

    /// Advance the source state and analyse the newest samples.
    ///
    /// Never blocks. If the sample buffer is busy the previous window is
    /// analysed again.
    pub fn poll(&mut self) -> &SpectrumFrame {
        self.poll_capture();

        if self.is_active() {
            self.buffer.read_into(&mut self.window);
            self.analyser.process(&self.window, &mut self.frame.bins);
            self.frame.active = true;
        } else {
            self.frame.active = false;
        }
        &self.frame
    }

    fn poll_capture(&mut self) {
        let Some(task) = self.capture.as_mut() else {
            return;
        };
        match task.poll() {
            CapturePoll::Pending => {}
            CapturePoll::Ready(info) => {
                log::info!(
                    "audio live: {} ({} Hz, {} ch)",
                    info.device_name,
                    info.sample_rate,
                    info.channels
                );
                self.info = Some(info);
                self.status = AudioStatus::Live;
            }
            CapturePoll::Failed(err) | CapturePoll::Lost(err) => {
                self.release();
                self.block(err);
            }
            CapturePoll::Ended => {
                self.release();
                self.status = AudioStatus::Ended;
                log::info!("audio source ended");
            }
        }
    }

    /// Drop the task and everything it produced.
    fn release(&mut self) {
        if let Some(mut task) = self.capture.take() {
            task.stop();
        }
        self.info = None;
        self.discard_samples();
    }

    fn discard_samples(&mut self) {
        self.buffer.clear();
        self.analyser.reset();
        self.window.clear();
        self.frame.bins.fill(0);
    }

    fn block(&mut self, err: AudioError) {
        log::warn!("audio source unavailable: {err}");
        self.status = AudioStatus::Blocked(err.to_string());
    }

    /// Whether frames currently carry live audio.
    pub fn is_active(&self) -> bool {
        self.status == AudioStatus::Live
    }

    /// Current status.
    pub fn status(&self) -> &AudioStatus {
        &self.status
    }

    /// The current or most recent source.
    pub fn source(&self) -> Option<&AudioSource> {
        self.source.as_ref()
    }

    /// Source details once live.
    pub fn info(&self) -> Option<&CaptureInfo> {
        self.info.as_ref()
    }

    /// Shared buffer sources write into.
    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    /// Latest frame without advancing.
    pub fn frame(&self) -> &SpectrumFrame {
        &self.frame
    }
}

impl Default for AudioHub {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}
