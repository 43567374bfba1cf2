//! Error types for flowfield.
//!
//! Numerical trouble inside the simulation is never an error; particles
//! recycle and the field falls back to a fixed direction. These types cover
//! the outer layers that talk to the OS: GPU setup, audio devices, image
//! export and the window loop.

use std::fmt;

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// The surface reported no usable configuration for this adapter.
    UnsupportedSurface,
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::UnsupportedSurface => write!(f, "Surface is not supported by the selected adapter"),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur while opening or running an audio source.
///
/// None of these stop the visualization; the hub reports them as a blocked
/// status and keeps producing silent frames.
#[derive(Debug)]
pub enum AudioError {
    /// The host has no default input device.
    NoInputDevice,
    /// Querying the device's default configuration failed.
    DefaultConfig(cpal::DefaultStreamConfigError),
    /// The device only offers a sample format we do not convert.
    UnsupportedFormat(String),
    /// Building the input stream failed.
    BuildStream(cpal::BuildStreamError),
    /// Starting the input stream failed.
    PlayStream(cpal::PlayStreamError),
    /// The capture thread could not be spawned.
    ThreadSpawn(std::io::Error),
    /// The input stream failed after it started.
    Stream(cpal::StreamError),
    /// The capture thread exited without reporting a result.
    CaptureExited,
    /// An audio file could not be opened.
    OpenFile(std::io::Error),
    /// An audio file format was not recognised or could not be decoded.
    Decode(symphonia::core::errors::Error),
    /// An audio file has no decodable track.
    NoAudioTrack,
    /// No output device for audible playback.
    OutputDevice(rodio::StreamError),
    /// The output device refused a playback sink.
    Playback(rodio::PlayError),
    /// The playback decoder rejected the file.
    PlaybackDecode(rodio::decoder::DecoderError),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::NoInputDevice => write!(f, "No default audio input device found"),
            AudioError::DefaultConfig(e) => write!(f, "Failed to read default input config: {}", e),
            AudioError::UnsupportedFormat(format) => {
                write!(f, "Unsupported input sample format: {}", format)
            }
            AudioError::BuildStream(e) => write!(f, "Failed to build input stream: {}", e),
            AudioError::PlayStream(e) => write!(f, "Failed to start input stream: {}", e),
            AudioError::ThreadSpawn(e) => write!(f, "Failed to spawn audio thread: {}", e),
            AudioError::Stream(e) => write!(f, "Audio input stream failed: {}", e),
            AudioError::CaptureExited => write!(f, "Audio capture thread exited"),
            AudioError::OpenFile(e) => write!(f, "Failed to open audio file: {}", e),
            AudioError::Decode(e) => write!(f, "Failed to decode audio file: {}", e),
            AudioError::NoAudioTrack => write!(f, "Audio file has no decodable track"),
            AudioError::OutputDevice(e) => write!(f, "No audio output device: {}", e),
            AudioError::Playback(e) => write!(f, "Failed to start playback: {}", e),
            AudioError::PlaybackDecode(e) => write!(f, "Playback cannot decode file: {}", e),
        }
    }
}

impl std::error::Error for AudioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AudioError::DefaultConfig(e) => Some(e),
            AudioError::BuildStream(e) => Some(e),
            AudioError::PlayStream(e) => Some(e),
            AudioError::ThreadSpawn(e) => Some(e),
            AudioError::Stream(e) => Some(e),
            AudioError::OpenFile(e) => Some(e),
            AudioError::Decode(e) => Some(e),
            AudioError::OutputDevice(e) => Some(e),
            AudioError::Playback(e) => Some(e),
            AudioError::PlaybackDecode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<cpal::BuildStreamError> for AudioError {
    fn from(e: cpal::BuildStreamError) -> Self {
        AudioError::BuildStream(e)
    }
}

impl From<cpal::PlayStreamError> for AudioError {
    fn from(e: cpal::PlayStreamError) -> Self {
        AudioError::PlayStream(e)
    }
}

impl From<symphonia::core::errors::Error> for AudioError {
    fn from(e: symphonia::core::errors::Error) -> Self {
        AudioError::Decode(e)
    }
}

/// Errors that can occur when exporting a frame to disk.
#[derive(Debug)]
pub enum ExportError {
    /// Failed to encode the image.
    Image(image::ImageError),
    /// Failed to write the file.
    Io(std::io::Error),
    /// The requested output has no pixels.
    EmptyFrame {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
    },
}

impl fmt::Display for ExportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportError::Image(e) => write!(f, "Failed to encode image: {}", e),
            ExportError::Io(e) => write!(f, "Failed to write export file: {}", e),
            ExportError::EmptyFrame { width, height } => {
                write!(f, "Cannot export an empty {}x{} frame", width, height)
            }
        }
    }
}

impl std::error::Error for ExportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExportError::Image(e) => Some(e),
            ExportError::Io(e) => Some(e),
            ExportError::EmptyFrame { .. } => None,
        }
    }
}

impl From<image::ImageError> for ExportError {
    fn from(e: image::ImageError) -> Self {
        ExportError::Image(e)
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

/// Errors that can occur when running the visualizer.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}
