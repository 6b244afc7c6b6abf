use std::ffi::{c_char, CString};
use std::sync::OnceLock;

use parking_lot::Mutex;

use audio_session_core::{AudioDevicePort, AudioSessionContext};

#[cfg(target_os = "windows")]
pub type PlatformBackend = audio_session_windows::WindowsSessionBackend;
#[cfg(target_os = "windows")]
pub type PlatformCapture = audio_session_windows::WasapiMicCapture;

#[cfg(not(target_os = "windows"))]
pub type PlatformBackend = audio_session_core::SimulatedBackend;
#[cfg(not(target_os = "windows"))]
pub type PlatformCapture = audio_session_core::SineCaptureProvider;

/// Ports from the last `list_*` call plus the C strings handed to the host.
///
/// The pointer array stays valid until the list is replaced.
#[derive(Default)]
pub struct PortList {
    ports: Vec<AudioDevicePort>,
    names: Vec<CString>,
    pointers: Vec<*const c_char>,
}

// SAFETY: `pointers` only ever points into the `CString`s owned by `names`,
// which move together with it; the list is only touched under its mutex.
unsafe impl Send for PortList {}

impl PortList {
    pub fn replace(&mut self, ports: Vec<AudioDevicePort>) {
        self.names = ports
            .iter()
            .map(|p| CString::new(p.name.replace('\0', "")).unwrap_or_default())
            .collect();
        self.pointers = self.names.iter().map(|n| n.as_ptr()).collect();
        self.ports = ports;
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }

    pub fn get(&self, index: usize) -> Option<&AudioDevicePort> {
        self.ports.get(index)
    }
}

/// Everything the C surface needs, behind one lazily created static.
pub struct PluginContext {
    pub audio: AudioSessionContext<PlatformBackend, PlatformCapture>,
    pub inputs: Mutex<PortList>,
    pub outputs: Mutex<PortList>,
    /// Planar copy of the last frame handed out by `read_pcm_data`.
    pub pcm: Mutex<Vec<f32>>,
    pub diagnostics: Mutex<CString>,
}

impl PluginContext {
    fn new() -> Self {
        Self {
            audio: AudioSessionContext::new(PlatformBackend::default(), PlatformCapture::default()),
            inputs: Mutex::new(PortList::default()),
            outputs: Mutex::new(PortList::default()),
            pcm: Mutex::new(Vec::new()),
            diagnostics: Mutex::new(CString::default()),
        }
    }
}

static CONTEXT: OnceLock<PluginContext> = OnceLock::new();

/// The process-wide context, created on first use and never torn down.
pub fn context() -> &'static PluginContext {
    CONTEXT.get_or_init(|| {
        init_logging();
        log::info!("Audio session plugin initialized");
        PluginContext::new()
    })
}

/// Install `env_logger` unless the host already installed a logger.
fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init();
}
