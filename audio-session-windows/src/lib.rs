//! # audio-session-windows
//!
//! Windows WASAPI backend for audio-session-kit.
//!
//! Provides:
//! - `WindowsSessionBackend`: session backend over the MMDevice API, with a
//!   polling device watcher for route changes
//! - `WasapiMicCapture`: microphone capture via a WASAPI capture endpoint
//! - `DeviceEnumerator`: audio endpoint enumeration
//! - `permissions`: Windows microphone privacy check
//!
//! ## Usage
//! ```ignore
//! use audio_session_core::AudioSessionContext;
//! use audio_session_windows::{WasapiMicCapture, WindowsSessionBackend};
//!
//! let context = AudioSessionContext::new(WindowsSessionBackend::new(), WasapiMicCapture::new());
//! ```

pub mod transport;

#[cfg(target_os = "windows")]
pub mod backend;
#[cfg(target_os = "windows")]
mod com;
#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod permissions;
#[cfg(target_os = "windows")]
pub mod wasapi_mic;

#[cfg(target_os = "windows")]
pub use backend::WindowsSessionBackend;
#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use wasapi_mic::WasapiMicCapture;
pub use transport::port_type_for;
