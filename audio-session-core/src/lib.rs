//! # audio-session-core
//!
//! Platform-agnostic audio session core library.
//!
//! Provides the session manager (configuration, readiness, device inventory),
//! the capture controller with its lock-free-producer PCM double buffer, and
//! legacy routing overrides. Platform backends implement `SessionBackend` and
//! `CaptureProvider` and plug into the generic `AudioSessionContext`.
//!
//! ## Architecture
//!
//! ```text
//! audio-session-core (this crate)
//! ├── traits/       ← SessionBackend, CaptureProvider
//! ├── models/       ← SessionError, CaptureState, SessionConfiguration, AudioDevicePort, etc.
//! ├── processing/   ← PcmBuffer (single-producer/single-consumer double buffer)
//! ├── session/      ← SessionManager, CaptureController, RoutingOverride, AudioSessionContext
//! └── simulated/    ← SimulatedBackend, SineCaptureProvider
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod simulated;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{
    AudioDevicePort, AudioLevels, AudioPortType, CaptureDiagnostics, CaptureFormat, PortDirection,
};
pub use models::config::{CategoryOptions, SessionConfiguration};
pub use models::error::SessionError;
pub use models::route::{RouteChange, RouteOverride};
pub use models::state::CaptureState;
pub use processing::pcm_buffer::{PcmBuffer, PcmView};
pub use session::capture::CaptureController;
pub use session::context::{AudioSessionContext, SimulatedContext};
pub use session::manager::SessionManager;
pub use session::routing::RoutingOverride;
pub use simulated::{SimulatedBackend, SimulatedCaptureConfig, SineCaptureProvider};
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::session_backend::{RouteChangeCallback, SessionBackend};
