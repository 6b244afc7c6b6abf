use std::sync::Arc;

use crate::models::route::RouteOverride;
use crate::traits::session_backend::SessionBackend;

/// Legacy routing overrides for hosts whose own session setup cannot force
/// speaker output while recording.
///
/// Holds no state of its own; every call goes straight to the platform.
pub struct RoutingOverride<B: SessionBackend> {
    backend: Arc<B>,
}

impl<B: SessionBackend> RoutingOverride<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// Force output to the loudspeaker.
    pub fn route_for_playback(&self) {
        self.apply(RouteOverride::Playback);
    }

    /// Force input to the built-in microphone, output to the loudspeaker.
    pub fn route_for_recording(&self) {
        self.apply(RouteOverride::Recording);
    }

    /// Whether the current output route goes to headphones, Bluetooth, USB or similar.
    pub fn is_external_device_connected(&self) -> bool {
        match self.backend.current_outputs() {
            Ok(outputs) => outputs.iter().any(|p| p.port_type.is_external()),
            Err(e) => {
                log::warn!("Failed to query current route: {}", e);
                false
            }
        }
    }

    fn apply(&self, route: RouteOverride) {
        match self.backend.override_route(route) {
            Ok(()) => log::info!("Route override applied: {:?}", route),
            Err(e) => log::warn!("Route override {:?} not applied: {}", route, e),
        }
    }
}
