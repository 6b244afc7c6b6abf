//! Windows implementation of the audio session backend.
//!
//! Windows has no per-application audio session category or route override.
//! The category is "accepted" when the microphone can be opened, a preferred
//! input is accepted when its endpoint still resolves (the capture provider
//! opens it by ID), and route changes come from a polling watcher that diffs
//! the active endpoint IDs.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use audio_session_core::models::audio_models::AudioDevicePort;
use audio_session_core::models::config::CategoryOptions;
use audio_session_core::models::error::SessionError;
use audio_session_core::models::route::{RouteChange, RouteOverride};
use audio_session_core::traits::session_backend::{RouteChangeCallback, SessionBackend};

use crate::com::ComGuard;
use crate::device_enumerator::DeviceEnumerator;
use crate::permissions;

const WATCH_INTERVAL: Duration = Duration::from_millis(500);

pub struct WindowsSessionBackend {
    watcher_running: Arc<AtomicBool>,
    watcher_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl WindowsSessionBackend {
    pub fn new() -> Self {
        Self {
            watcher_running: Arc::new(AtomicBool::new(false)),
            watcher_handle: Mutex::new(None),
        }
    }

    fn with_enumerator<T>(
        f: impl FnOnce(&DeviceEnumerator) -> Result<T, SessionError>,
    ) -> Result<T, SessionError> {
        let _com = ComGuard::init()?;
        let enumerator = DeviceEnumerator::new()?;
        f(&enumerator)
    }
}

impl Default for WindowsSessionBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for WindowsSessionBackend {
    fn apply_category(&self, options: CategoryOptions) -> Result<(), SessionError> {
        log::debug!(
            "Category options {:#x} have no WASAPI equivalent; checking microphone access",
            options.bits()
        );
        if permissions::check_microphone_permission()? {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied)
        }
    }

    fn available_inputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        Self::with_enumerator(|e| e.list_capture_devices())
    }

    fn available_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        Self::with_enumerator(|e| e.list_render_devices())
    }

    fn set_preferred_input(&self, port: &AudioDevicePort) -> Result<(), SessionError> {
        Self::with_enumerator(|e| e.capture_device(Some(&port.id)).map(|_| ()))?;
        log::debug!("Capture endpoint {} resolves; it will be opened on next start", port.id);
        Ok(())
    }

    fn override_route(&self, route: RouteOverride) -> Result<(), SessionError> {
        Err(SessionError::Unsupported(format!(
            "route override {:?} (WASAPI follows the system default endpoint)",
            route
        )))
    }

    fn current_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        Self::with_enumerator(|e| e.default_render_device().map(|port| vec![port]))
    }

    fn watch_route_changes(&self, callback: RouteChangeCallback) {
        if self.watcher_running.swap(true, Ordering::SeqCst) {
            log::warn!("Device watcher already running; ignoring second registration");
            return;
        }

        let running = Arc::clone(&self.watcher_running);
        let spawned = thread::Builder::new()
            .name("device-watcher".into())
            .spawn(move || {
                if let Err(e) = watch_loop(&running, &callback) {
                    log::error!("Device watcher stopped: {}", e);
                }
                running.store(false, Ordering::SeqCst);
            });

        match spawned {
            Ok(handle) => *self.watcher_handle.lock() = Some(handle),
            Err(e) => {
                self.watcher_running.store(false, Ordering::SeqCst);
                log::error!("Failed to spawn device watcher: {}", e);
            }
        }
    }
}

impl Drop for WindowsSessionBackend {
    fn drop(&mut self) {
        self.watcher_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.watcher_handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn endpoint_ids(ports: Vec<AudioDevicePort>) -> BTreeSet<String> {
    ports.into_iter().map(|p| p.id).collect()
}

fn watch_loop(running: &AtomicBool, callback: &RouteChangeCallback) -> Result<(), SessionError> {
    let _com = ComGuard::init()?;
    let enumerator = DeviceEnumerator::new()?;

    let mut inputs = endpoint_ids(enumerator.list_capture_devices()?);
    let mut outputs = endpoint_ids(enumerator.list_render_devices()?);

    while running.load(Ordering::SeqCst) {
        thread::sleep(WATCH_INTERVAL);

        let (Ok(current_inputs), Ok(current_outputs)) =
            (enumerator.list_capture_devices(), enumerator.list_render_devices())
        else {
            continue;
        };
        let current_inputs = endpoint_ids(current_inputs);
        let current_outputs = endpoint_ids(current_outputs);

        let change = match (current_inputs != inputs, current_outputs != outputs) {
            (true, true) => Some(RouteChange::Both),
            (true, false) => Some(RouteChange::Inputs),
            (false, true) => Some(RouteChange::Outputs),
            (false, false) => None,
        };

        if let Some(change) = change {
            callback(change);
            inputs = current_inputs;
            outputs = current_outputs;
        }
    }
    Ok(())
}
