//! Platform-free session backend and capture source.
//!
//! Stands in for the platform where no native backend exists, generating a
//! 440 Hz test tone on a virtual microphone.

pub mod backend;
pub mod sine;

pub use backend::SimulatedBackend;
pub use sine::{SimulatedCaptureConfig, SineCaptureProvider, SineGenerator};
