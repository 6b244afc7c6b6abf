//! Windows audio device enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list capture and render endpoints as
//! session ports, with the port type derived from the device's enumerator
//! (Bluetooth, USB or built-in).

use windows::core::*;
use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::UI::Shell::PropertiesSystem::PROPERTYKEY;

use audio_session_core::models::audio_models::{AudioDevicePort, PortDirection};
use audio_session_core::models::error::SessionError;

use crate::transport::port_type_for;

/// Audio device enumerator using the Windows MMDevice API.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new device enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> std::result::Result<Self, SessionError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    SessionError::Platform(format!("failed to create enumerator: {}", e))
                })?;
            Ok(Self { enumerator })
        }
    }

    /// List active capture (microphone) endpoints.
    pub fn list_capture_devices(&self) -> std::result::Result<Vec<AudioDevicePort>, SessionError> {
        self.list_devices(eCapture, PortDirection::Input)
    }

    /// List active render (output) endpoints.
    pub fn list_render_devices(&self) -> std::result::Result<Vec<AudioDevicePort>, SessionError> {
        self.list_devices(eRender, PortDirection::Output)
    }

    /// The default render endpoint as a port.
    pub fn default_render_device(&self) -> std::result::Result<AudioDevicePort, SessionError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(eRender, eConsole)
                .map_err(|_| SessionError::DeviceNotAvailable)?;
            Self::port_for(&device, PortDirection::Output).ok_or(SessionError::DeviceNotAvailable)
        }
    }

    /// Resolve a capture endpoint by ID, or the default one.
    pub(crate) fn capture_device(&self, id: Option<&str>) -> std::result::Result<IMMDevice, SessionError> {
        unsafe {
            match id {
                Some(id) => {
                    let wide_id: Vec<u16> = id.encode_utf16().chain(std::iter::once(0)).collect();
                    self.enumerator
                        .GetDevice(PCWSTR(wide_id.as_ptr()))
                        .map_err(|_| SessionError::DeviceNotAvailable)
                }
                None => self
                    .enumerator
                    .GetDefaultAudioEndpoint(eCapture, eConsole)
                    .map_err(|_| SessionError::DeviceNotAvailable),
            }
        }
    }

    fn list_devices(
        &self,
        data_flow: EDataFlow,
        direction: PortDirection,
    ) -> std::result::Result<Vec<AudioDevicePort>, SessionError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(data_flow, DEVICE_STATE_ACTIVE)
                .map_err(|e| SessionError::Platform(format!("EnumAudioEndpoints failed: {}", e)))?;

            let count = collection
                .GetCount()
                .map_err(|e| SessionError::Platform(format!("GetCount failed: {}", e)))?;

            let mut ports = Vec::with_capacity(count as usize);
            for i in 0..count {
                let Ok(device) = collection.Item(i) else {
                    continue;
                };
                if let Some(port) = Self::port_for(&device, direction) {
                    ports.push(port);
                }
            }
            Ok(ports)
        }
    }

    unsafe fn port_for(device: &IMMDevice, direction: PortDirection) -> Option<AudioDevicePort> {
        let id = device_id(device)?;
        let name = Self::read_string_property(device, &PKEY_Device_FriendlyName)
            .unwrap_or_else(|| id.clone());
        let enumerator_name = Self::read_string_property(device, &PKEY_Device_EnumeratorName);

        Some(AudioDevicePort {
            port_type: port_type_for(enumerator_name.as_deref(), direction),
            id,
            name,
            direction,
        })
    }

    unsafe fn read_string_property(device: &IMMDevice, key: &PROPERTYKEY) -> Option<String> {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;
        let value = store.GetValue(key).ok()?;
        let text = value.to_string();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Endpoint ID string, freeing the COM allocation.
pub(crate) unsafe fn device_id(device: &IMMDevice) -> Option<String> {
    let raw = device.GetId().ok()?;
    let id = raw.to_string().ok();
    CoTaskMemFree(Some(raw.0 as *const _));
    id
}
