use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::audio_models::AudioDevicePort;
use crate::models::config::SessionConfiguration;
use crate::models::route::RouteChange;
use crate::traits::session_backend::SessionBackend;

/// Flags written by the platform notification thread.
///
/// `changed` is what the consumer polls (read-and-clear); `stale` tells the
/// manager to re-query before serving the next snapshot.
#[derive(Debug)]
struct RouteFlags {
    inputs_changed: AtomicBool,
    outputs_changed: AtomicBool,
    inputs_stale: AtomicBool,
    outputs_stale: AtomicBool,
}

impl RouteFlags {
    fn new() -> Self {
        Self {
            inputs_changed: AtomicBool::new(false),
            outputs_changed: AtomicBool::new(false),
            inputs_stale: AtomicBool::new(true),
            outputs_stale: AtomicBool::new(true),
        }
    }

    fn record(&self, change: RouteChange) {
        if change.affects_inputs() {
            self.inputs_stale.store(true, Ordering::Release);
            self.inputs_changed.store(true, Ordering::Release);
        }
        if change.affects_outputs() {
            self.outputs_stale.store(true, Ordering::Release);
            self.outputs_changed.store(true, Ordering::Release);
        }
    }
}

/// Internal mutable session state, protected by `parking_lot::Mutex`.
#[derive(Debug, Default)]
struct SessionState {
    configuration: Option<SessionConfiguration>,
    ready: bool,
    inputs: Vec<AudioDevicePort>,
    outputs: Vec<AudioDevicePort>,
    preferred_input: Option<AudioDevicePort>,
}

/// Owns the single logical audio session: configuration, readiness and the
/// device inventory cache.
///
/// Device lists are replaced wholesale on refresh. A list is refreshed lazily
/// on the next `list_*` call after a route-change notification or a
/// configuration change.
pub struct SessionManager<B: SessionBackend> {
    backend: Arc<B>,
    flags: Arc<RouteFlags>,
    state: Mutex<SessionState>,
}

impl<B: SessionBackend> SessionManager<B> {
    pub fn new(backend: Arc<B>) -> Arc<Self> {
        let flags = Arc::new(RouteFlags::new());

        let notified = Arc::clone(&flags);
        backend.watch_route_changes(Arc::new(move |change| {
            log::debug!("Route change: {:?}", change);
            notified.record(change);
        }));

        Arc::new(Self {
            backend,
            flags,
            state: Mutex::new(SessionState::default()),
        })
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Apply category options derived from `config`.
    ///
    /// A platform rejection is logged, never returned; it only shows as
    /// `is_ready()` staying false on a session that was never configured.
    pub fn configure(&self, config: SessionConfiguration) {
        let options = config.category_options();
        match self.backend.apply_category(options) {
            Ok(()) => {
                {
                    let mut s = self.state.lock();
                    s.configuration = Some(config);
                    s.ready = true;
                }
                // The category decides which ports are visible.
                self.flags.inputs_stale.store(true, Ordering::Release);
                self.flags.outputs_stale.store(true, Ordering::Release);
                log::info!(
                    "Audio session configured (bluetooth recording: {}, default to speaker: {}, options {:#x})",
                    config.bluetooth_recording,
                    config.default_to_speaker,
                    options.bits()
                );
            }
            Err(e) => {
                log::error!("Audio session rejected configuration {:?}: {}", config, e);
            }
        }
    }

    /// True once a configuration has been applied successfully at least once.
    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn configuration(&self) -> Option<SessionConfiguration> {
        self.state.lock().configuration
    }

    /// The backend is queried without holding the state lock; only the
    /// snapshot swap is locked.
    pub fn list_inputs(&self) -> Vec<AudioDevicePort> {
        if self.flags.inputs_stale.swap(false, Ordering::AcqRel) {
            match self.backend.available_inputs() {
                Ok(inputs) => self.state.lock().inputs = inputs,
                Err(e) => {
                    log::warn!("Failed to query inputs, keeping previous list: {}", e);
                    self.flags.inputs_stale.store(true, Ordering::Release);
                }
            }
        }
        self.state.lock().inputs.clone()
    }

    pub fn list_outputs(&self) -> Vec<AudioDevicePort> {
        if self.flags.outputs_stale.swap(false, Ordering::AcqRel) {
            match self.backend.available_outputs() {
                Ok(outputs) => self.state.lock().outputs = outputs,
                Err(e) => {
                    log::warn!("Failed to query outputs, keeping previous list: {}", e);
                    self.flags.outputs_stale.store(true, Ordering::Release);
                }
            }
        }
        self.state.lock().outputs.clone()
    }

    /// Read-and-clear. With more than one consumer a change can be observed by only one of them.
    pub fn consume_inputs_changed(&self) -> bool {
        self.flags.inputs_changed.swap(false, Ordering::AcqRel)
    }

    pub fn consume_outputs_changed(&self) -> bool {
        self.flags.outputs_changed.swap(false, Ordering::AcqRel)
    }

    /// Route capture through `port` if it is still present in the latest input list.
    pub fn set_preferred_input(&self, port: &AudioDevicePort) {
        let inputs = self.list_inputs();
        let Some(current) = inputs.into_iter().find(|p| p.id == port.id) else {
            log::warn!("Ignoring preferred input '{}': no longer available", port.name);
            return;
        };

        match self.backend.set_preferred_input(&current) {
            Ok(()) => {
                log::info!("Preferred input set to '{}'", current.name);
                self.state.lock().preferred_input = Some(current);
            }
            Err(e) => log::error!("Failed to set preferred input '{}': {}", current.name, e),
        }
    }

    /// The preferred input, if it is still present in the latest input list.
    pub fn preferred_input(&self) -> Option<AudioDevicePort> {
        let preferred = self.state.lock().preferred_input.clone()?;
        self.list_inputs().into_iter().find(|p| p.id == preferred.id)
    }

    /// Entry point for platform notifications delivered outside the backend callback.
    pub fn notify_route_change(&self, change: RouteChange) {
        self.flags.record(change);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::models::audio_models::AudioPortType;
    use crate::models::config::CategoryOptions;
    use crate::models::error::SessionError;
    use crate::models::route::RouteOverride;
    use crate::simulated::SimulatedBackend;
    use crate::traits::session_backend::RouteChangeCallback;

    /// Backend whose input query parks until the test releases it.
    struct GatedBackend {
        entered: Mutex<Option<mpsc::Sender<()>>>,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl SessionBackend for GatedBackend {
        fn apply_category(&self, _options: CategoryOptions) -> Result<(), SessionError> {
            Ok(())
        }

        fn available_inputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
                let _ = self.release.lock().recv();
            }
            Ok(vec![AudioDevicePort::input("mic", "Mic", AudioPortType::BuiltInMic)])
        }

        fn available_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
            Ok(Vec::new())
        }

        fn set_preferred_input(&self, _port: &AudioDevicePort) -> Result<(), SessionError> {
            Ok(())
        }

        fn override_route(&self, _route: RouteOverride) -> Result<(), SessionError> {
            Ok(())
        }

        fn current_outputs(&self) -> Result<Vec<AudioDevicePort>, SessionError> {
            Ok(Vec::new())
        }

        fn watch_route_changes(&self, _callback: RouteChangeCallback) {}
    }

    fn manager() -> (Arc<SimulatedBackend>, Arc<SessionManager<SimulatedBackend>>) {
        let backend = Arc::new(SimulatedBackend::new());
        let manager = SessionManager::new(Arc::clone(&backend));
        (backend, manager)
    }

    #[test]
    fn configure_makes_ready() {
        let (backend, manager) = manager();
        assert!(!manager.is_ready());

        manager.configure(SessionConfiguration::new(false, true));

        assert!(manager.is_ready());
        let applied = backend.applied_options().unwrap();
        assert!(applied.contains(CategoryOptions::DEFAULT_TO_SPEAKER));
        assert!(!applied.contains(CategoryOptions::ALLOW_BLUETOOTH));
    }

    #[test]
    fn rejected_configure_is_silent() {
        let (backend, manager) = manager();
        backend.set_reject_configuration(true);

        manager.configure(SessionConfiguration::default());
        assert!(!manager.is_ready());
        assert_eq!(manager.configuration(), None);
    }

    #[test]
    fn rejected_reconfigure_keeps_ready() {
        let (backend, manager) = manager();
        manager.configure(SessionConfiguration::default());
        backend.set_reject_configuration(true);

        manager.configure(SessionConfiguration::new(true, true));
        assert!(manager.is_ready());
        assert_eq!(manager.configuration(), Some(SessionConfiguration::default()));
    }

    #[test]
    fn lists_snapshot_inventory() {
        let (_, manager) = manager();
        let inputs = manager.list_inputs();
        let outputs = manager.list_outputs();

        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs[0].port_type, AudioPortType::BuiltInMic);
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].port_type, AudioPortType::BuiltInSpeaker);
    }

    #[test]
    fn change_flags_collapse_and_clear() {
        let (backend, manager) = manager();
        assert!(!manager.consume_inputs_changed());

        backend.connect_port(AudioDevicePort::input("usb-1", "USB Mic", AudioPortType::Usb));
        backend.connect_port(AudioDevicePort::input("usb-2", "USB Mic 2", AudioPortType::Usb));

        assert!(manager.consume_inputs_changed());
        assert!(!manager.consume_inputs_changed());
        assert!(!manager.consume_outputs_changed());
        assert_eq!(manager.list_inputs().len(), 3);
    }

    #[test]
    fn notification_refreshes_cached_list() {
        let (backend, manager) = manager();
        assert_eq!(manager.list_outputs().len(), 1);

        backend.connect_port(AudioDevicePort::output("hp", "Headphones", AudioPortType::Headphones));
        assert!(manager.consume_outputs_changed());

        let outputs = manager.list_outputs();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[1].name, "Headphones");
    }

    #[test]
    fn failed_requery_keeps_flag_and_snapshot() {
        let (backend, manager) = manager();
        assert_eq!(manager.list_inputs().len(), 1);

        backend.connect_port(AudioDevicePort::input("usb", "USB Mic", AudioPortType::Usb));
        backend.set_fail_queries(true);

        // Old snapshot served, change still pending.
        assert_eq!(manager.list_inputs().len(), 1);
        assert!(manager.consume_inputs_changed());

        // Still stale, so the next call retries.
        backend.set_fail_queries(false);
        assert_eq!(manager.list_inputs().len(), 2);
        assert!(!manager.consume_inputs_changed());
    }

    #[test]
    fn successful_requery_does_not_raise_flag() {
        let (_, manager) = manager();
        manager.configure(SessionConfiguration::default());
        manager.list_inputs();
        assert!(!manager.consume_inputs_changed());
    }

    #[test]
    fn configure_reveals_bluetooth_inputs() {
        let (backend, manager) = manager();
        backend.connect_port(AudioDevicePort::input("bt", "AirPods", AudioPortType::BluetoothHfp));

        manager.configure(SessionConfiguration::new(false, false));
        assert_eq!(manager.list_inputs().len(), 1);

        manager.configure(SessionConfiguration::new(true, false));
        assert_eq!(manager.list_inputs().len(), 2);
    }

    #[test]
    fn preferred_input_is_revalidated() {
        let (backend, manager) = manager();
        let usb = AudioDevicePort::input("usb", "USB Mic", AudioPortType::Usb);
        backend.connect_port(usb.clone());

        manager.set_preferred_input(&usb);
        assert_eq!(backend.preferred_input_id().as_deref(), Some("usb"));
        assert_eq!(manager.preferred_input(), Some(usb));

        assert!(backend.disconnect_port("usb"));
        assert_eq!(manager.preferred_input(), None);
    }

    #[test]
    fn absent_preferred_input_is_noop() {
        let (backend, manager) = manager();
        let usb = AudioDevicePort::input("usb", "USB Mic", AudioPortType::Usb);
        backend.connect_port(usb.clone());
        manager.list_inputs();
        backend.disconnect_port("usb");

        // The caller's handle is stale; the latest list no longer has it.
        manager.set_preferred_input(&usb);
        assert_eq!(backend.preferred_input_id(), None);
        assert_eq!(manager.preferred_input(), None);
    }

    #[test]
    fn absent_port_keeps_existing_preferred_input() {
        let (backend, manager) = manager();
        let usb = AudioDevicePort::input("usb", "USB Mic", AudioPortType::Usb);
        let headset = AudioDevicePort::input("headset", "Headset Mic", AudioPortType::HeadsetMic);
        backend.connect_port(usb.clone());
        backend.connect_port(headset.clone());
        manager.set_preferred_input(&usb);

        manager.list_inputs();
        backend.disconnect_port("headset");
        manager.set_preferred_input(&headset);

        assert_eq!(backend.preferred_input_id().as_deref(), Some("usb"));
        assert_eq!(manager.preferred_input(), Some(usb));
    }

    #[test]
    fn backend_query_does_not_block_readers() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let manager = SessionManager::new(Arc::new(GatedBackend {
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(release_rx),
        }));
        manager.configure(SessionConfiguration::default());

        let lister = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || manager.list_inputs())
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let (ready_tx, ready_rx) = mpsc::channel();
        let reader = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || ready_tx.send(manager.is_ready()).unwrap())
        };
        let ready = ready_rx.recv_timeout(Duration::from_secs(1));

        release_tx.send(()).unwrap();
        let inputs = lister.join().unwrap();
        reader.join().unwrap();

        assert_eq!(ready, Ok(true));
        assert_eq!(inputs.len(), 1);
    }

    #[test]
    fn external_notifications() {
        let (_, manager) = manager();
        manager.notify_route_change(RouteChange::Both);
        assert!(manager.consume_inputs_changed());
        assert!(manager.consume_outputs_changed());
    }
}
