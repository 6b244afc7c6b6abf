//! Per-thread COM apartment handling.

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::*;

use audio_session_core::models::error::SessionError;

/// RAII guard for a COM apartment on the current thread.
///
/// Joins the multithreaded apartment. If the thread already lives in a
/// single-threaded apartment (typical for a host's main thread) that one is
/// used as-is and nothing is uninitialized on drop.
pub(crate) struct ComGuard {
    owns_init: bool,
}

impl ComGuard {
    pub(crate) fn init() -> Result<Self, SessionError> {
        unsafe {
            let hr = CoInitializeEx(None, COINIT_MULTITHREADED);
            if hr == RPC_E_CHANGED_MODE {
                return Ok(Self { owns_init: false });
            }
            hr.ok()
                .map_err(|e| SessionError::Platform(format!("CoInitializeEx failed: {}", e)))?;
        }
        Ok(Self { owns_init: true })
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        if self.owns_init {
            unsafe {
                CoUninitialize();
            }
        }
    }
}
