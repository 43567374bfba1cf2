//! Audio acquisition on a dedicated thread.
//!
//! A [`CaptureTask`] owns one thread. The thread opens its source, reports
//! success or failure over a channel, then keeps the source alive until told
//! to stop, at which point the stream is dropped and the device released.
//! Failures after startup (a device unplugged, a stream error, the end of a
//! file) arrive over the same channel. The render loop never blocks on the
//! task: it polls for events and reads samples from a [`SampleBuffer`]
//! without waiting.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, RwLock, TryLockError};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};

use crate::error::AudioError;

/// Latest-value cell holding the newest mono samples.
///
/// The audio callback writes with `try_write` and drops the chunk if the
/// reader holds the lock; the reader uses `try_read` and keeps its previous
/// copy on contention. Neither side ever waits.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: RwLock<VecDeque<f32>>,
    capacity: usize,
}

impl SampleBuffer {
    /// Create a buffer keeping the newest `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append samples, discarding the oldest past capacity.
    ///
    /// Returns `false` if the lock was busy and the chunk was dropped.
    pub fn push(&self, data: &[f32]) -> bool {
        let mut guard = match self.samples.try_write() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        let skip = data.len().saturating_sub(self.capacity);
        guard.extend(&data[skip..]);
        let excess = guard.len().saturating_sub(self.capacity);
        guard.drain(..excess);
        true
    }

    /// Copy the current contents, oldest first, into `out`.
    ///
    /// Returns `false` without touching `out` if the lock was busy.
    pub fn read_into(&self, out: &mut Vec<f32>) -> bool {
        let guard = match self.samples.try_read() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return false,
        };
        out.clear();
        out.extend(guard.iter().copied());
        true
    }

    /// Drop all samples.
    pub fn clear(&self) {
        match self.samples.write() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    /// Maximum number of samples kept.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Source details reported once it is running.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureInfo {
    /// Input device or file name.
    pub device_name: String,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channels down-mixed to mono.
    pub channels: u16,
}

/// Result of polling a [`CaptureTask`].
#[derive(Debug)]
pub enum CapturePoll {
    /// Nothing new.
    Pending,
    /// The source is running.
    Ready(CaptureInfo),
    /// The source could not be opened. The thread has exited.
    Failed(AudioError),
    /// A running source stopped delivering samples.
    Lost(AudioError),
    /// A finite source reached its end.
    Ended,
}

#[derive(Debug)]
enum TaskEvent {
    Ready(CaptureInfo),
    Failed(AudioError),
    Lost(AudioError),
    Ended,
}

/// Sending half of a task's event channel, handed to the code running on
/// the capture thread.
///
/// Clones may be moved into device callbacks to report failures after
/// startup.
#[derive(Clone, Debug)]
pub struct TaskSignal {
    events: Sender<TaskEvent>,
}

impl TaskSignal {
    /// Report that a running source failed.
    pub fn lost(&self, err: AudioError) {
        let _ = self.events.send(TaskEvent::Lost(err));
    }

    /// Report that a finite source reached its end.
    pub fn ended(&self) {
        let _ = self.events.send(TaskEvent::Ended);
    }

    /// Report a successful start. Returns `false` if the task handle is gone.
    pub(crate) fn ready(&self, info: CaptureInfo) -> bool {
        self.events.send(TaskEvent::Ready(info)).is_ok()
    }

    pub(crate) fn failed(&self, err: AudioError) {
        let _ = self.events.send(TaskEvent::Failed(err));
    }
}

/// What the body of a capture thread receives.
pub(crate) struct TaskContext {
    pub(crate) signal: TaskSignal,
    pub(crate) stop: Receiver<()>,
    pub(crate) paused: Arc<AtomicBool>,
}

/// Handle to a capture thread.
pub struct CaptureTask {
    events: Option<Receiver<TaskEvent>>,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    paused: Arc<AtomicBool>,
    started: bool,
}

impl CaptureTask {
    /// Start capturing from the default input device into `buffer`.
    pub fn spawn(buffer: Arc<SampleBuffer>) -> Result<Self, AudioError> {
        Self::spawn_with(move |signal| open_default_input(buffer, signal))
    }

    /// Start a capture thread with a custom opener.
    ///
    /// `open` runs on the capture thread and may keep the [`TaskSignal`] to
    /// report a later failure. Whatever it returns alongside the info is held
    /// there until [`stop`](Self::stop), then dropped.
    pub fn spawn_with<F, S>(open: F) -> Result<Self, AudioError>
    where
        F: FnOnce(TaskSignal) -> Result<(S, CaptureInfo), AudioError> + Send + 'static,
        S: 'static,
    {
        Self::spawn_thread(move |ctx| match open(ctx.signal.clone()) {
            Ok((stream, info)) => {
                if !ctx.signal.ready(info) {
                    return;
                }
                // Returns on an explicit stop or when the handle is dropped
                let _ = ctx.stop.recv();
                drop(stream);
            }
            Err(err) => ctx.signal.failed(err),
        })
    }

    /// Run `body` on a new capture thread. The body reports its own startup
    /// result and must return soon after `ctx.stop` fires or disconnects.
    pub(crate) fn spawn_thread<B>(body: B) -> Result<Self, AudioError>
    where
        B: FnOnce(TaskContext) + Send + 'static,
    {
        let (events_tx, events_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let paused = Arc::new(AtomicBool::new(false));

        let ctx = TaskContext {
            signal: TaskSignal { events: events_tx },
            stop: stop_rx,
            paused: paused.clone(),
        };
        let handle = thread::Builder::new()
            .name("flowfield-audio".into())
            .spawn(move || body(ctx))
            .map_err(AudioError::ThreadSpawn)?;

        Ok(Self {
            events: Some(events_rx),
            stop: Some(stop_tx),
            handle: Some(handle),
            paused,
            started: false,
        })
    }

    /// Check for news from the thread without blocking.
    ///
    /// `Ready` is reported once. After `Failed`, `Lost` or `Ended` every
    /// later call returns `Pending`.
    pub fn poll(&mut self) -> CapturePoll {
        let Some(rx) = &self.events else {
            return CapturePoll::Pending;
        };
        let result = match rx.try_recv() {
            Ok(TaskEvent::Ready(info)) => {
                self.started = true;
                return CapturePoll::Ready(info);
            }
            Ok(TaskEvent::Failed(err)) => CapturePoll::Failed(err),
            Ok(TaskEvent::Lost(err)) => CapturePoll::Lost(err),
            Ok(TaskEvent::Ended) => CapturePoll::Ended,
            Err(TryRecvError::Empty) => return CapturePoll::Pending,
            Err(TryRecvError::Disconnected) if self.started => {
                CapturePoll::Lost(AudioError::CaptureExited)
            }
            Err(TryRecvError::Disconnected) => CapturePoll::Failed(AudioError::CaptureExited),
        };
        self.events = None;
        result
    }

    /// Whether the startup result has been received.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Whether the capture thread is still alive.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the source to hold its position. Sources that cannot pause keep
    /// running.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    /// Signal the thread to release its source. Idempotent.
    ///
    /// A started task is joined, which is quick because the thread only waits
    /// on the stop channel. A task still opening its source is detached
    /// instead: it notices the dropped handle when it reports and exits on
    /// its own.
    pub fn stop(&mut self) {
        self.stop.take();
        self.events.take();
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.started || handle.is_finished() {
            if handle.join().is_err() {
                log::warn!("audio capture thread panicked");
            }
        } else {
            log::debug!("detaching audio thread that is still opening its source");
        }
    }
}

impl Drop for CaptureTask {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for CaptureTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureTask")
            .field("started", &self.started)
            .field("running", &self.is_running())
            .finish()
    }
}

fn open_default_input(
    buffer: Arc<SampleBuffer>,
    signal: TaskSignal,
) -> Result<(cpal::Stream, CaptureInfo), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(AudioError::NoInputDevice)?;
    let device_name = device
        .name()
        .unwrap_or_else(|_| "Unknown input device".to_owned());

    let supported = device
        .default_input_config()
        .map_err(AudioError::DefaultConfig)?;
    let config = supported.config();

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, buffer, signal)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, buffer, signal)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, buffer, signal)?,
        other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
    };
    stream.play().map_err(AudioError::PlayStream)?;

    Ok((
        stream,
        CaptureInfo {
            device_name,
            sample_rate: config.sample_rate.0,
            channels: config.channels,
        },
    ))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    buffer: Arc<SampleBuffer>,
    signal: TaskSignal,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = (config.channels as usize).max(1);
    let mut mono = Vec::new();

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                mono.clear();
                mono.extend(data.chunks(channels).map(|frame| {
                    let sum: f32 = frame.iter().map(|&s| s.to_sample::<f32>()).sum();
                    sum / frame.len() as f32
                }));
                buffer.push(&mono);
            },
            move |err| {
                log::warn!("audio input stream error: {err}");
                signal.lost(AudioError::Stream(err));
            },
            None,
        )
        .map_err(AudioError::BuildStream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn info() -> CaptureInfo {
        CaptureInfo {
            device_name: "test".into(),
            sample_rate: 48_000,
            channels: 1,
        }
    }

    fn wait_for(task: &mut CaptureTask) -> CapturePoll {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match task.poll() {
                CapturePoll::Pending if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(1))
                }
                other => return other,
            }
        }
    }

    // ========== SampleBuffer Tests ==========

    #[test]
    fn test_buffer_keeps_newest() {
        let buffer = SampleBuffer::new(4);
        buffer.push(&[1.0, 2.0, 3.0]);
        buffer.push(&[4.0, 5.0]);
        let mut out = Vec::new();
        assert!(buffer.read_into(&mut out));
        assert_eq!(out, vec![2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_buffer_oversized_chunk() {
        let buffer = SampleBuffer::new(3);
        buffer.push(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        let mut out = Vec::new();
        buffer.read_into(&mut out);
        assert_eq!(out, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_buffer_busy_keeps_previous() {
        let buffer = SampleBuffer::new(4);
        buffer.push(&[1.0]);
        let mut out = vec![9.0];
        let guard = buffer.samples.write().unwrap();
        assert!(!buffer.read_into(&mut out));
        assert!(!buffer.push(&[2.0]));
        drop(guard);
        assert_eq!(out, vec![9.0]);
    }

    #[test]
    fn test_buffer_clear() {
        let buffer = SampleBuffer::new(4);
        buffer.push(&[1.0, 2.0]);
        buffer.clear();
        let mut out = Vec::new();
        buffer.read_into(&mut out);
        assert!(out.is_empty());
    }

    // ========== Task Tests ==========

    #[test]
    fn test_task_reports_ready_then_releases_on_stop() {
        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        let mut task = CaptureTask::spawn_with(move |_| Ok((Guard(flag), info()))).unwrap();

        match wait_for(&mut task) {
            CapturePoll::Ready(got) => assert_eq!(got, info()),
            other => panic!("expected ready, got {other:?}"),
        }
        assert!(matches!(task.poll(), CapturePoll::Pending));
        assert!(!released.load(Ordering::SeqCst));

        task.stop();
        assert!(released.load(Ordering::SeqCst));
        assert!(!task.is_running());
        task.stop();
    }

    #[test]
    fn test_task_reports_failure() {
        let mut task =
            CaptureTask::spawn_with(|_| Err::<((), CaptureInfo), _>(AudioError::NoInputDevice))
                .unwrap();
        match wait_for(&mut task) {
            CapturePoll::Failed(AudioError::NoInputDevice) => {}
            other => panic!("expected failure, got {other:?}"),
        }
        task.stop();
    }

    #[test]
    fn test_drop_stops_thread() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = released.clone();
        struct Guard(Arc<AtomicBool>);
        impl Drop for Guard {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }
        let mut task = CaptureTask::spawn_with(move |_| Ok((Guard(flag), info()))).unwrap();
        let _ = wait_for(&mut task);
        drop(task);
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn test_lost_after_ready() {
        let mut task = CaptureTask::spawn_with(|signal| {
            signal.lost(AudioError::CaptureExited);
            Ok(((), info()))
        })
        .unwrap();
        // The loss was sent before the ready report and is read first
        match wait_for(&mut task) {
            CapturePoll::Lost(AudioError::CaptureExited) => {}
            other => panic!("expected lost, got {other:?}"),
        }
        assert!(matches!(task.poll(), CapturePoll::Pending));
        task.stop();
    }

    #[test]
    fn test_signal_kept_by_stream_reports_later() {
        let (tx, rx) = mpsc::channel::<()>();
        let mut task = CaptureTask::spawn_with(move |signal| {
            thread::spawn(move || {
                let _ = rx.recv();
                signal.lost(AudioError::CaptureExited);
            });
            Ok(((), info()))
        })
        .unwrap();

        assert!(matches!(wait_for(&mut task), CapturePoll::Ready(_)));
        assert!(task.is_started());
        tx.send(()).unwrap();
        assert!(matches!(wait_for(&mut task), CapturePoll::Lost(_)));
        task.stop();
    }

    #[test]
    fn test_stop_while_opening_does_not_wait() {
        let mut task = CaptureTask::spawn_with(|_| {
            thread::sleep(Duration::from_millis(1500));
            Ok(((), info()))
        })
        .unwrap();

        let started = Instant::now();
        task.stop();
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(matches!(task.poll(), CapturePoll::Pending));
    }

    #[test]
    fn test_pause_flag_reaches_thread() {
        let (tx, rx) = mpsc::channel();
        let task = CaptureTask::spawn_thread(move |ctx| {
            let _ = ctx.stop.recv();
            let _ = tx.send(ctx.paused.load(Ordering::Relaxed));
        })
        .unwrap();
        task.set_paused(true);
        drop(task);
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(true));
    }
}
