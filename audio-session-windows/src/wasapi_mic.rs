//! WASAPI microphone capture provider.
//!
//! Captures audio from a WASAPI capture endpoint (microphone) in shared mode.
//! Delivers interleaved Float32 samples via the `AudioBufferCallback`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use windows::core::w;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use audio_session_core::models::audio_models::{AudioDevicePort, CaptureFormat};
use audio_session_core::models::error::SessionError;
use audio_session_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

use crate::com::ComGuard;
use crate::device_enumerator::DeviceEnumerator;

/// Shared-mode buffer duration, in 100-nanosecond units (100 ms).
const BUFFER_DURATION: i64 = 1_000_000;

/// WASAPI microphone capture.
///
/// Opens the preferred (or default) capture endpoint in shared mode and
/// delivers buffers on a dedicated thread registered with MMCSS.
pub struct WasapiMicCapture {
    device_id: Option<String>,
    format: Option<CaptureFormat>,
    running: Arc<AtomicBool>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

// SAFETY: COM objects are created and used only on the capture thread or on a
// scoped probe thread. The struct itself holds plain data, an atomic and a
// join handle.
unsafe impl Send for WasapiMicCapture {}

impl WasapiMicCapture {
    pub fn new() -> Self {
        Self {
            device_id: None,
            format: None,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: None,
        }
    }
}

impl Default for WasapiMicCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureProvider for WasapiMicCapture {
    fn is_available(&self) -> bool {
        let Ok(_com) = ComGuard::init() else {
            return false;
        };
        DeviceEnumerator::new()
            .and_then(|e| e.list_capture_devices())
            .map(|devices| !devices.is_empty())
            .unwrap_or(false)
    }

    fn prepare(&mut self, preferred_input: Option<&AudioDevicePort>) -> Result<CaptureFormat, SessionError> {
        let device_id = preferred_input.map(|p| p.id.clone());

        // Probe on a fresh thread so the caller's COM apartment is irrelevant.
        let format = thread::scope(|scope| {
            scope
                .spawn(|| probe_format(device_id.as_deref()))
                .join()
                .map_err(|_| SessionError::Platform("format probe panicked".into()))?
        })?;

        self.device_id = device_id;
        self.format = Some(format);
        Ok(format)
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), SessionError> {
        if self.format.is_none() {
            return Err(SessionError::ConfigurationFailed("mic capture not prepared".into()));
        }
        if self.running.load(Ordering::SeqCst) {
            return Err(SessionError::ConfigurationFailed(
                "mic capture already running".into(),
            ));
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let device_id = self.device_id.clone();

        let handle = thread::Builder::new()
            .name("wasapi-mic-capture".into())
            .spawn(move || {
                if let Err(e) = mic_capture_loop(&running, device_id.as_deref(), &callback) {
                    log::error!("Mic capture error: {}", e);
                }
                running.store(false, Ordering::SeqCst);
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SessionError::Platform(format!("failed to spawn mic thread: {}", e))
            })?;

        self.capture_handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SessionError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.take() {
            let _ = handle.join();
        }
        self.format = None;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
            && self.capture_handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for WasapiMicCapture {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Read the endpoint's shared-mode mix format.
fn probe_format(device_id: Option<&str>) -> Result<CaptureFormat, SessionError> {
    let _com = ComGuard::init()?;
    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.capture_device(device_id)?;

    unsafe {
        let audio_client: IAudioClient = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| SessionError::ConfigurationFailed(format!("Activate failed: {}", e)))?;

        let mix_format_ptr = audio_client
            .GetMixFormat()
            .map_err(|e| SessionError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;

        let sample_rate = (*mix_format_ptr).nSamplesPerSec as f64;
        let channels = (*mix_format_ptr).nChannels;
        CoTaskMemFree(Some(mix_format_ptr as *const _));

        // One published frame per 100 ms of audio.
        let frame_length = (sample_rate / 10.0) as u32;
        Ok(CaptureFormat::float32(channels, sample_rate, frame_length))
    }
}

/// Main capture loop running on a dedicated thread.
///
/// Sequence:
/// 1. Join the MTA
/// 2. Resolve the capture device (preferred or default)
/// 3. Activate IAudioClient and initialize in shared mode
/// 4. Get the IAudioCaptureClient service
/// 5. Register with MMCSS for real-time priority
/// 6. Start capture, poll for packets
fn mic_capture_loop(
    running: &AtomicBool,
    device_id: Option<&str>,
    callback: &AudioBufferCallback,
) -> Result<(), SessionError> {
    let _com = ComGuard::init()?;
    let enumerator = DeviceEnumerator::new()?;
    let device = enumerator.capture_device(device_id)?;

    unsafe {
        let audio_client: IAudioClient = device
            .Activate(CLSCTX_ALL, None)
            .map_err(|e| SessionError::ConfigurationFailed(format!("Activate failed: {}", e)))?;

        let mix_format_ptr = audio_client
            .GetMixFormat()
            .map_err(|e| SessionError::ConfigurationFailed(format!("GetMixFormat failed: {}", e)))?;
        let sample_rate = (*mix_format_ptr).nSamplesPerSec as f64;
        let channels = (*mix_format_ptr).nChannels;

        let initialized = audio_client.Initialize(
            AUDCLNT_SHAREMODE_SHARED,
            AUDCLNT_STREAMFLAGS_NOPERSIST,
            BUFFER_DURATION,
            0,
            mix_format_ptr,
            None,
        );
        CoTaskMemFree(Some(mix_format_ptr as *const _));
        initialized.map_err(|e| {
            SessionError::ConfigurationFailed(format!("IAudioClient::Initialize failed: {}", e))
        })?;

        let capture_client: IAudioCaptureClient = audio_client
            .GetService()
            .map_err(|e| SessionError::ConfigurationFailed(format!("GetService failed: {}", e)))?;

        let mut task_index: u32 = 0;
        let mmcss = AvSetMmThreadCharacteristicsW(w!("Pro Audio"), &mut task_index).ok();

        audio_client
            .Start()
            .map_err(|e| SessionError::Platform(format!("IAudioClient::Start failed: {}", e)))?;

        let mut silence: Vec<f32> = Vec::new();
        let result = (|| -> Result<(), SessionError> {
            while running.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(10));

                let mut packet_length = capture_client
                    .GetNextPacketSize()
                    .map_err(|e| SessionError::Platform(format!("GetNextPacketSize failed: {}", e)))?;

                while packet_length > 0 {
                    let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
                    let mut num_frames: u32 = 0;
                    let mut flags: u32 = 0;

                    capture_client
                        .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                        .map_err(|e| SessionError::Platform(format!("GetBuffer failed: {}", e)))?;

                    if num_frames > 0 && !buffer_ptr.is_null() {
                        let total_samples = num_frames as usize * channels as usize;

                        if flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0 {
                            silence.clear();
                            silence.resize(total_samples, 0.0);
                            callback(&silence, sample_rate, channels);
                        } else {
                            // Shared mode delivers the Float32 mix format.
                            let samples =
                                std::slice::from_raw_parts(buffer_ptr as *const f32, total_samples);
                            callback(samples, sample_rate, channels);
                        }
                    }

                    capture_client
                        .ReleaseBuffer(num_frames)
                        .map_err(|e| SessionError::Platform(format!("ReleaseBuffer failed: {}", e)))?;

                    packet_length = capture_client
                        .GetNextPacketSize()
                        .map_err(|e| SessionError::Platform(format!("GetNextPacketSize failed: {}", e)))?;
                }
            }
            Ok(())
        })();

        let _ = audio_client.Stop();
        if let Some(handle) = mmcss {
            let _ = AvRevertMmThreadCharacteristics(handle);
        }
        result
    }
}
