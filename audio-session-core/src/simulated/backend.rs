use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevicePort, AudioPortType, PortDirection};
use crate::models::config::CategoryOptions;
use crate::models::error::SessionError;
use crate::models::route::{RouteChange, RouteOverride};
use crate::traits::session_backend::{RouteChangeCallback, SessionBackend};

#[derive(Debug)]
struct SimulatedState {
    inputs: Vec<AudioDevicePort>,
    outputs: Vec<AudioDevicePort>,
    applied: Option<CategoryOptions>,
    preferred_input: Option<String>,
    last_override: Option<RouteOverride>,
    reject_configuration: bool,
    fail_queries: bool,
}

/// In-process audio session with a virtual device inventory.
///
/// Used where no native backend exists and by tests. Plugging and unplugging
/// ports fires the registered route-change callback the way a platform
/// notification would.
pub struct SimulatedBackend {
    state: Mutex<SimulatedState>,
    route_callback: Mutex<Option<RouteChangeCallback>>,
}

impl SimulatedBackend {
    /// One built-in microphone and one built-in speaker.
    pub fn new() -> Self {
        Self::with_ports(
            vec![AudioDevicePort::input("sim-mic", "Default microphone", AudioPortType::BuiltInMic)],
            vec![AudioDevicePort::output("sim-speaker", "Default speaker", AudioPortType::BuiltInSpeaker)],
        )
    }

    pub fn with_ports(inputs: Vec<AudioDevicePort>, outputs: Vec<AudioDevicePort>) -> Self {
        Self {
            state: Mutex::new(SimulatedState {
                inputs,
                outputs,
                applied: None,
                preferred_input: None,
                last_override: None,
                reject_configuration: false,
                fail_queries: false,
            }),
            route_callback: Mutex::new(None),
        }
    }

    /// Plug in a port and notify.
    pub fn connect_port(&self, port: AudioDevicePort) {
        let change = {
            let mut s = self.state.lock();
            match port.direction {
                PortDirection::Input => {
                    s.inputs.push(port);
                    RouteChange::Inputs
                }
                PortDirection::Output => {
                    s.outputs.push(port);
                    RouteChange::Outputs
                }
            }
        };
        self.notify(change);
    }

    /// Unplug a port by ID and notify. Returns false if no such port exists.
    pub fn disconnect_port(&self, id: &str) -> bool {
        let change = {
            let mut s = self.state.lock();
            if let Some(pos) = s.inputs.iter().position(|p| p.id == id) {
                s.inputs.remove(pos);
                if s.preferred_input.as_deref() == Some(id) {
                    s.preferred_input = None;
                }
                RouteChange::Inputs
            } else if let Some(pos) = s.outputs.iter().position(|p| p.id == id) {
                s.outputs.remove(pos);
                RouteChange::Outputs
            } else {
                return false;
            }
        };
        self.notify(change);
        true
    }

    pub fn set_reject_configuration(&self, reject: bool) {
        self.state.lock().reject_configuration = reject;
    }

    pub fn set_fail_queries(&self, fail: bool) {
        self.state.lock().fail_queries = fail;
    }

    pub fn applied_options(&self) -> Option<CategoryOptions> {
        self.state.lock().applied
    }

    pub fn preferred_input_id(&self) -> Option<String> {
        self.state.lock().preferred_input.clone()
    }

    pub fn last_override(&self) -> Option<RouteOverride> {
        self.state.lock().last_override
    }

    fn notify(&self, change: RouteChange) {
        let callback = self.route_callback.lock().clone();
        if let Some(callback) = callback {
            callback(change);
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for SimulatedBackend {
    fn apply_category(&self, options: CategoryOptions) -> Result<(), SessionError> {
        let mut s = self.state.lock();
        if s.reject_configuration {
            return Err(SessionError::ConfigurationFailed(format!(
                "category options {:#x} rejected",
                options.bits()
            )));
        }
        s.applied = Some(options);
        Ok(())
    }

    fn available_inputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        let s = self.state.lock();
        if s.fail_queries {
            return Err(SessionError::Platform("input query failed".into()));
        }
        // Hands-free Bluetooth inputs only show up once the category allows them.
        let allow_bluetooth = s
            .applied
            .is_some_and(|o| o.contains(CategoryOptions::ALLOW_BLUETOOTH));
        Ok(s
            .inputs
            .iter()
            .filter(|p| allow_bluetooth || p.port_type != AudioPortType::BluetoothHfp)
            .cloned()
            .collect())
    }

    fn available_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        let s = self.state.lock();
        if s.fail_queries {
            return Err(SessionError::Platform("output query failed".into()));
        }
        Ok(s.outputs.clone())
    }

    fn set_preferred_input(&self, port: &AudioDevicePort) -> Result<(), SessionError> {
        let mut s = self.state.lock();
        if !s.inputs.iter().any(|p| p.id == port.id) {
            return Err(SessionError::DeviceNotAvailable);
        }
        s.preferred_input = Some(port.id.clone());
        Ok(())
    }

    fn override_route(&self, route: RouteOverride) -> Result<(), SessionError> {
        self.state.lock().last_override = Some(route);
        Ok(())
    }

    fn current_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
        let s = self.state.lock();
        if s.fail_queries {
            return Err(SessionError::Platform("route query failed".into()));
        }
        // Last connected output wins, as on the real platform.
        Ok(s.outputs.last().cloned().into_iter().collect())
    }

    fn watch_route_changes(&self, callback: RouteChangeCallback) {
        *self.route_callback.lock() = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn default_inventory() {
        let backend = SimulatedBackend::new();
        let inputs = backend.available_inputs().unwrap();
        let outputs = backend.available_outputs().unwrap();

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].name, "Default microphone");
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].name, "Default speaker");
    }

    #[test]
    fn plugging_fires_callback() {
        let backend = SimulatedBackend::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        backend.watch_route_changes(Arc::new(move |change| {
            assert_eq!(change, RouteChange::Outputs);
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        backend.connect_port(AudioDevicePort::output("hp", "Headphones", AudioPortType::Headphones));
        assert!(backend.disconnect_port("hp"));
        assert!(!backend.disconnect_port("hp"));

        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn bluetooth_inputs_need_category_option() {
        let backend = SimulatedBackend::new();
        backend.connect_port(AudioDevicePort::input("bt", "AirPods", AudioPortType::BluetoothHfp));

        assert_eq!(backend.available_inputs().unwrap().len(), 1);

        backend.apply_category(CategoryOptions::ALLOW_BLUETOOTH).unwrap();
        assert_eq!(backend.available_inputs().unwrap().len(), 2);
    }

    #[test]
    fn rejects_unknown_preferred_input() {
        let backend = SimulatedBackend::new();
        let ghost = AudioDevicePort::input("ghost", "Ghost", AudioPortType::Usb);

        assert_eq!(backend.set_preferred_input(&ghost), Err(SessionError::DeviceNotAvailable));
        assert_eq!(backend.preferred_input_id(), None);
    }

    #[test]
    fn current_route_is_last_connected_output() {
        let backend = SimulatedBackend::new();
        backend.connect_port(AudioDevicePort::output("usb", "USB DAC", AudioPortType::Usb));

        let route = backend.current_outputs().unwrap();
        assert_eq!(route.len(), 1);
        assert_eq!(route[0].id, "usb");
    }
}
