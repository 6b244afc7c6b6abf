use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::session::capture::CaptureController;
use crate::session::manager::SessionManager;
use crate::session::routing::RoutingOverride;
use crate::simulated::{SimulatedBackend, SineCaptureProvider};
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::session_backend::SessionBackend;

/// Process-wide audio session context.
///
/// Owns the one session manager, capture controller and routing override
/// over a single backend. Create it once, on first use, and pass it to
/// whatever needs it; it is never torn down while the process lives.
pub struct AudioSessionContext<B: SessionBackend, P: CaptureProvider> {
    session: Arc<SessionManager<B>>,
    capture: Mutex<CaptureController<B, P>>,
    routing: RoutingOverride<B>,
}

/// Context over the simulated backend and test tone.
pub type SimulatedContext = AudioSessionContext<SimulatedBackend, SineCaptureProvider>;

impl<B: SessionBackend, P: CaptureProvider> AudioSessionContext<B, P> {
    pub fn new(backend: B, provider: P) -> Self {
        Self::with_backend(Arc::new(backend), provider)
    }

    pub fn with_backend(backend: Arc<B>, provider: P) -> Self {
        let session = SessionManager::new(Arc::clone(&backend));
        let capture = CaptureController::new(Arc::clone(&session), provider);
        Self {
            session,
            capture: Mutex::new(capture),
            routing: RoutingOverride::new(backend),
        }
    }

    pub fn session(&self) -> &SessionManager<B> {
        &self.session
    }

    pub fn capture(&self) -> MutexGuard<'_, CaptureController<B, P>> {
        self.capture.lock()
    }

    pub fn routing(&self) -> &RoutingOverride<B> {
        &self.routing
    }
}

impl SimulatedContext {
    pub fn simulated() -> Self {
        Self::new(SimulatedBackend::new(), SineCaptureProvider::default())
    }
}
