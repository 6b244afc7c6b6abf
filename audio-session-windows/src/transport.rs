//! Port type classification from PnP enumerator names.
//!
//! Pure string logic, kept outside the COM code so it builds and tests on
//! every platform.

use audio_session_core::models::audio_models::{AudioPortType, PortDirection};

/// Map a PnP enumerator name (`BTHENUM`, `BTHLEENUM`, `USB`, ...) to a port type.
pub fn port_type_for(enumerator_name: Option<&str>, direction: PortDirection) -> AudioPortType {
    let name = enumerator_name.unwrap_or_default().to_uppercase();
    let input = direction == PortDirection::Input;

    if name.contains("BTHLEENUM") {
        AudioPortType::BluetoothLe
    } else if name.contains("BTHENUM") {
        // Classic Bluetooth capture endpoints are the hands-free profile.
        if input {
            AudioPortType::BluetoothHfp
        } else {
            AudioPortType::BluetoothA2dp
        }
    } else if name.contains("USB") {
        AudioPortType::Usb
    } else if name.contains("HDAUDIO") || name.contains("MMDEVAPI") || name.is_empty() {
        if input {
            AudioPortType::BuiltInMic
        } else {
            AudioPortType::BuiltInSpeaker
        }
    } else if name.contains("SW") || name.contains("ROOT") {
        AudioPortType::Virtual
    } else {
        AudioPortType::Unknown
    }
}
