//! Windows microphone privacy check.
//!
//! Microphone access is governed by Settings > Privacy > Microphone. Desktop
//! apps get no consent prompt; they simply fail to activate the endpoint when
//! the toggle is off. The session backend treats that as the platform
//! rejecting a recording category.

use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use audio_session_core::models::error::SessionError;

use crate::com::ComGuard;

const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
const AUDCLNT_E_DEVICE_IN_USE: i32 = 0x8889_000A_u32 as i32;

/// Check whether the default microphone can be opened.
///
/// `Ok(false)` means there is no capture device or access is denied.
pub fn check_microphone_permission() -> Result<bool, SessionError> {
    let _com = ComGuard::init()?;
    unsafe { check_mic_access_inner() }
}

unsafe fn check_mic_access_inner() -> Result<bool, SessionError> {
    let enumerator: IMMDeviceEnumerator = CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
        .map_err(|e| SessionError::Platform(format!("failed to create enumerator: {}", e)))?;

    let Ok(device) = enumerator.GetDefaultAudioEndpoint(eCapture, eConsole) else {
        return Ok(false);
    };

    match device.Activate::<IAudioClient>(CLSCTX_ALL, None) {
        Ok(_) => Ok(true),
        Err(e) => {
            let code = e.code().0;
            if code == E_ACCESSDENIED || code == AUDCLNT_E_DEVICE_IN_USE {
                Ok(false)
            } else {
                log::warn!("Unexpected error checking mic permission: {}", e);
                Ok(true)
            }
        }
    }
}
