use std::sync::Arc;

use crate::models::audio_models::{AudioLevels, CaptureDiagnostics, CaptureFormat};
use crate::models::error::SessionError;
use crate::models::state::CaptureState;
use crate::processing::pcm_buffer::{PcmBuffer, PcmView};
use crate::session::manager::SessionManager;
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::session_backend::SessionBackend;

/// Start/stop lifecycle of input capture and owner of the live PCM buffer.
///
/// Data flow:
/// ```text
/// [CaptureProvider] → audio thread → [PcmBuffer back slot] → publish
///                                           ↓
///            consumer ← PcmView ← [PcmBuffer front slot]
/// ```
///
/// The format and the buffer exist only while recording.
pub struct CaptureController<B: SessionBackend, P: CaptureProvider> {
    session: Arc<SessionManager<B>>,
    provider: P,
    state: CaptureState,
    format: Option<CaptureFormat>,
    buffer: Option<Arc<PcmBuffer>>,
}

impl<B: SessionBackend, P: CaptureProvider> CaptureController<B, P> {
    pub fn new(session: Arc<SessionManager<B>>, provider: P) -> Self {
        Self {
            session,
            provider,
            state: CaptureState::Stopped,
            format: None,
            buffer: None,
        }
    }

    pub fn state(&mut self) -> CaptureState {
        self.reap_dead_provider();
        self.state
    }

    pub fn is_recording(&mut self) -> bool {
        self.reap_dead_provider();
        self.state.is_recording()
    }

    /// Start capture. Transitions: stopped → starting → recording.
    ///
    /// Fails with `NotReady` without touching the provider if the session has
    /// never been configured. Starting while recording is a no-op.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.reap_dead_provider();
        if self.state.is_recording() {
            log::debug!("Capture already running");
            return Ok(());
        }
        if !self.session.is_ready() {
            log::warn!("Capture start refused: audio session not ready");
            return Err(SessionError::NotReady);
        }

        self.state = CaptureState::Starting;

        match self.start_provider() {
            Ok(format) => {
                self.state = CaptureState::Recording;
                log::info!(
                    "Capture started: {} ch @ {} Hz, {} samples/frame",
                    format.channels,
                    format.sample_rate,
                    format.frame_length
                );
                Ok(())
            }
            Err(e) => {
                log::error!("Capture start failed: {}", e);
                if let Err(stop_err) = self.provider.stop() {
                    log::error!("Capture provider failed to stop after a failed start: {}", stop_err);
                }
                self.format = None;
                self.buffer = None;
                self.state = CaptureState::Stopped;
                Err(e)
            }
        }
    }

    fn start_provider(&mut self) -> Result<CaptureFormat, SessionError> {
        if !self.provider.is_available() {
            return Err(SessionError::DeviceNotAvailable);
        }

        let preferred = self.session.preferred_input();
        let format = self.provider.prepare(preferred.as_ref())?;
        if !format.is_valid() {
            return Err(SessionError::ConfigurationFailed(format!(
                "provider negotiated an unusable format: {:?}",
                format
            )));
        }

        let buffer = Arc::new(PcmBuffer::for_format(&format));
        let sink = Arc::clone(&buffer);
        self.provider.start(Arc::new(move |samples: &[f32], _sample_rate: f64, channels: u16| {
            sink.write_interleaved(samples, channels as usize);
        }))?;

        self.format = Some(format);
        self.buffer = Some(buffer);
        Ok(format)
    }

    /// Stop capture. Idempotent.
    pub fn stop(&mut self) {
        if self.state.is_stopped() {
            return;
        }
        if let Err(e) = self.provider.stop() {
            log::error!("Capture provider failed to stop cleanly: {}", e);
        }
        self.format = None;
        self.buffer = None;
        self.state = CaptureState::Stopped;
        log::info!("Capture stopped");
    }

    /// Drop back to stopped if the provider's capture thread has exited.
    fn reap_dead_provider(&mut self) {
        if !self.state.is_recording() || self.provider.is_running() {
            return;
        }
        log::warn!("Capture provider stopped delivering; capture is now stopped");
        self.stop();
    }

    /// The capture format, or `None` when not recording.
    pub fn current_format(&mut self) -> Option<CaptureFormat> {
        self.reap_dead_provider();
        if !self.state.is_recording() {
            return None;
        }
        self.format
    }

    /// Borrow the most recently published frame, or `None` when not recording.
    pub fn read_buffer(&mut self) -> Option<PcmView<'_>> {
        self.reap_dead_provider();
        if !self.state.is_recording() {
            return None;
        }
        self.buffer.as_ref().map(|b| b.read())
    }

    /// True at most once per published frame.
    pub fn consume_updated(&mut self) -> bool {
        self.reap_dead_provider();
        self.buffer.as_ref().is_some_and(|b| b.consume_updated())
    }

    pub fn levels(&mut self) -> AudioLevels {
        self.read_buffer().map(|v| v.levels()).unwrap_or_default()
    }

    pub fn diagnostics(&mut self) -> CaptureDiagnostics {
        self.reap_dead_provider();
        CaptureDiagnostics {
            is_recording: self.state.is_recording(),
            frames_published: self.buffer.as_ref().map_or(0, |b| b.frames_published()),
            samples_dropped: self.buffer.as_ref().map_or(0, |b| b.samples_dropped()),
            format: self.format,
        }
    }
}

impl<B: SessionBackend, P: CaptureProvider> Drop for CaptureController<B, P> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    use parking_lot::Mutex;

    use super::*;
    use crate::models::audio_models::{AudioDevicePort, AudioPortType};
    use crate::models::config::SessionConfiguration;
    use crate::simulated::SimulatedBackend;
    use crate::traits::capture_provider::AudioBufferCallback;

    /// Capture provider driven by the test instead of an audio thread.
    #[derive(Clone, Default)]
    struct ManualProvider {
        callback: Arc<Mutex<Option<AudioBufferCallback>>>,
        prepared_with: Arc<Mutex<Option<String>>>,
        fail_start: bool,
        starts: Arc<Mutex<u32>>,
        stops: Arc<Mutex<u32>>,
        running: Arc<AtomicBool>,
    }

    impl ManualProvider {
        fn deliver(&self, samples: &[f32], channels: u16) {
            let callback = self.callback.lock().clone();
            if let Some(cb) = callback {
                cb(samples, 48000.0, channels);
            }
        }
    }

    impl CaptureProvider for ManualProvider {
        fn is_available(&self) -> bool {
            true
        }

        fn prepare(&mut self, preferred_input: Option<&AudioDevicePort>) -> Result<CaptureFormat, SessionError> {
            *self.prepared_with.lock() = preferred_input.map(|p| p.id.clone());
            Ok(CaptureFormat::float32(2, 48000.0, 4))
        }

        fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
            if self.fail_start {
                return Err(SessionError::PermissionDenied);
            }
            *self.starts.lock() += 1;
            *self.callback.lock() = Some(callback);
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) -> Result<(), SessionError> {
            *self.stops.lock() += 1;
            *self.callback.lock() = None;
            self.running.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::SeqCst)
        }
    }

    fn controller(
        provider: ManualProvider,
    ) -> (
        Arc<SimulatedBackend>,
        Arc<SessionManager<SimulatedBackend>>,
        CaptureController<SimulatedBackend, ManualProvider>,
    ) {
        let backend = Arc::new(SimulatedBackend::new());
        let session = SessionManager::new(Arc::clone(&backend));
        let controller = CaptureController::new(Arc::clone(&session), provider);
        (backend, session, controller)
    }

    #[test]
    fn start_before_ready_fails() {
        let provider = ManualProvider::default();
        let (_, _, mut controller) = controller(provider.clone());

        assert_eq!(controller.start(), Err(SessionError::NotReady));
        assert_eq!(controller.state(), CaptureState::Stopped);
        assert_eq!(*provider.starts.lock(), 0);
        assert!(controller.current_format().is_none());
        assert!(controller.read_buffer().is_none());
    }

    #[test]
    fn stop_is_idempotent() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());

        controller.stop();
        controller.stop();
        assert_eq!(controller.state(), CaptureState::Stopped);
        assert_eq!(*provider.stops.lock(), 0);

        session.configure(SessionConfiguration::default());
        controller.start().unwrap();
        controller.stop();
        controller.stop();
        assert_eq!(*provider.stops.lock(), 1);
        assert!(!controller.is_recording());
    }

    #[test]
    fn format_fixed_while_recording() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());

        controller.start().unwrap();
        let format = controller.current_format().unwrap();
        assert_eq!(format.channels, 2);
        assert_eq!(format.sample_rate, 48000.0);

        provider.deliver(&[0.1; 8], 2);
        assert_eq!(controller.current_format(), Some(format));

        controller.stop();
        assert!(controller.current_format().is_none());
    }

    #[test]
    fn full_scenario() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());

        session.configure(SessionConfiguration::new(false, true));
        assert!(session.is_ready());
        controller.start().unwrap();
        assert!(controller.is_recording());
        assert!(!controller.consume_updated());

        provider.deliver(&[0.5, -0.5, 0.25, -0.25, 0.0, 0.0, 1.0, -1.0], 2);

        let format = controller.current_format().unwrap();
        {
            let view = controller.read_buffer().unwrap();
            assert_eq!(view.channels(), format.channels as usize);
            assert_eq!(view.samples_per_channel(), format.frame_length as usize);
            assert_eq!(view.channel(0), Some(&[0.5, 0.25, 0.0, 1.0][..]));
            assert_eq!(view.channel(1), Some(&[-0.5, -0.25, 0.0, -1.0][..]));
        }
        assert!(controller.consume_updated());
        assert!(!controller.consume_updated());

        controller.stop();
        assert!(!controller.is_recording());
        assert!(controller.current_format().is_none());
        assert!(!controller.consume_updated());
    }

    #[test]
    fn provider_failure_returns_to_stopped() {
        let provider = ManualProvider {
            fail_start: true,
            ..Default::default()
        };
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());

        assert_eq!(controller.start(), Err(SessionError::PermissionDenied));
        assert_eq!(controller.state(), CaptureState::Stopped);
        assert!(controller.current_format().is_none());
        assert_eq!(*provider.stops.lock(), 1);
    }

    #[test]
    fn capture_thread_exit_stops_controller() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());
        controller.start().unwrap();
        provider.deliver(&[0.25; 8], 2);
        assert!(controller.is_recording());

        // The capture thread hits a device error and exits on its own.
        let running = Arc::clone(&provider.running);
        thread::spawn(move || running.store(false, Ordering::SeqCst))
            .join()
            .unwrap();

        assert!(!controller.is_recording());
        assert_eq!(controller.state(), CaptureState::Stopped);
        assert!(controller.current_format().is_none());
        assert!(controller.read_buffer().is_none());
        assert!(!controller.consume_updated());
        assert!(!controller.diagnostics().is_recording);
        assert_eq!(*provider.stops.lock(), 1);
    }

    #[test]
    fn restart_after_capture_thread_exit() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());
        controller.start().unwrap();

        provider.running.store(false, Ordering::SeqCst);
        controller.start().unwrap();

        assert_eq!(*provider.starts.lock(), 2);
        assert!(controller.is_recording());
        assert!(controller.current_format().is_some());
    }

    #[test]
    fn start_while_recording_is_noop() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());

        controller.start().unwrap();
        controller.start().unwrap();
        assert_eq!(*provider.starts.lock(), 1);
    }

    #[test]
    fn opens_preferred_input() {
        let provider = ManualProvider::default();
        let (backend, session, mut controller) = controller(provider.clone());
        let usb = AudioDevicePort::input("usb", "USB Mic", AudioPortType::Usb);
        backend.connect_port(usb.clone());

        session.configure(SessionConfiguration::default());
        session.set_preferred_input(&usb);
        controller.start().unwrap();

        assert_eq!(provider.prepared_with.lock().as_deref(), Some("usb"));
    }

    #[test]
    fn diagnostics_and_levels() {
        let provider = ManualProvider::default();
        let (_, session, mut controller) = controller(provider.clone());
        session.configure(SessionConfiguration::default());
        controller.start().unwrap();

        provider.deliver(&[0.5; 8], 2);
        provider.deliver(&[0.5; 8], 2);

        let diagnostics = controller.diagnostics();
        assert!(diagnostics.is_recording);
        assert_eq!(diagnostics.frames_published, 2);
        assert_eq!(diagnostics.samples_dropped, 0);
        assert!((controller.levels().peak - 0.5).abs() < 1e-6);

        controller.stop();
        assert_eq!(controller.diagnostics().frames_published, 0);
        assert_eq!(controller.levels(), AudioLevels::default());
    }
}
