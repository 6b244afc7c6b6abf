use std::sync::Arc;

use crate::models::audio_models::AudioDevicePort;
use crate::models::config::CategoryOptions;
use crate::models::error::SessionError;
use crate::models::route::{RouteChange, RouteOverride};

/// Callback invoked by the platform when the available routes change.
///
/// May fire on any thread.
pub type RouteChangeCallback = Arc<dyn Fn(RouteChange) + Send + Sync + 'static>;

/// Platform audio session: category, device inventory and routing.
///
/// Implemented by:
/// - `SimulatedBackend`
/// - `WindowsSessionBackend`
pub trait SessionBackend: Send + Sync {
    /// Apply category options. An error means the platform rejected them.
    fn apply_category(&self, options: CategoryOptions) -> Result<(), SessionError>;

    /// Query the currently available input ports.
    fn available_inputs(&self) -> Result<Vec<AudioDevicePort>, SessionError>;

    /// Query the currently available output ports.
    fn available_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError>;

    /// Ask the platform to route input through `port`.
    fn set_preferred_input(&self, port: &AudioDevicePort) -> Result<(), SessionError>;

    /// Force a route regardless of the session category.
    fn override_route(&self, route: RouteOverride) -> Result<(), SessionError>;

    /// Output ports of the route currently in use.
    fn current_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError>;

    /// Register the handler for route-change notifications. Called once per session.
    fn watch_route_changes(&self, callback: RouteChangeCallback);
}
