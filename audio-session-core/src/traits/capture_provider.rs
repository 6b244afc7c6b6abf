use std::sync::Arc;

use crate::models::audio_models::{AudioDevicePort, CaptureFormat};
use crate::models::error::SessionError;

/// Callback invoked when an audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples.
/// - `sample_rate`: The actual sample rate of the delivered audio.
/// - `channels`: Number of interleaved channels.
///
/// Runs on the platform's real-time audio thread: it must not block or allocate.
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// Interface for platform-specific input capture sources.
///
/// Implemented by:
/// - `SineCaptureProvider` (simulated)
/// - `WasapiMicCapture` (Windows)
pub trait CaptureProvider: Send {
    /// Whether this capture source is currently available.
    fn is_available(&self) -> bool;

    /// Resolve the device to open and negotiate the capture format.
    ///
    /// `preferred_input` is the session's preferred port, or `None` for the
    /// platform default.
    fn prepare(&mut self, preferred_input: Option<&AudioDevicePort>) -> Result<CaptureFormat, SessionError>;

    /// Start delivering buffers in the prepared format via `callback`.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError>;

    /// Stop capturing and release the hardware. Must tolerate being called when idle.
    fn stop(&mut self) -> Result<(), SessionError>;

    /// Whether the capture thread started by `start` is still delivering.
    ///
    /// Turns false on its own when the thread exits, for example after the
    /// device is unplugged.
    fn is_running(&self) -> bool;
}
