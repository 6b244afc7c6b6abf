//! # audio-session-ffi
//!
//! Flat C ABI over one process-wide audio session, for hosts such as game
//! engines that load the library as a native plugin.
//!
//! Every entry point is callable from any thread, never unwinds across the
//! boundary, and returns a neutral default (`false`, `0`, NULL) when the
//! call cannot be served. Pointers handed out are owned by the library and
//! stay valid until the next call of the same function.
//!
//! The declarations live in `include/audio_session.h`.

mod context;

use std::ffi::{c_char, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use audio_session_core::SessionConfiguration;

use crate::context::{context, PortList};

/// Run `f`, turning a panic into a logged error and `fallback`.
fn guarded<T>(name: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|_| {
        log::error!("Panic caught in {}", name);
        fallback
    })
}

unsafe fn write_count(count: *mut i32, value: usize) {
    if !count.is_null() {
        *count = i32::try_from(value).unwrap_or(i32::MAX);
    }
}

unsafe fn publish_list(list: &mut PortList, count: *mut i32) -> *const *const c_char {
    write_count(count, list.len());
    if list.is_empty() {
        ptr::null()
    } else {
        list.as_ptr()
    }
}

#[no_mangle]
pub extern "C" fn audio_session_configure(bluetooth_recording: bool, default_to_speaker: bool) {
    guarded("audio_session_configure", (), || {
        context()
            .audio
            .session()
            .configure(SessionConfiguration::new(bluetooth_recording, default_to_speaker));
    })
}

#[no_mangle]
pub extern "C" fn audio_session_is_ready() -> bool {
    guarded("audio_session_is_ready", false, || context().audio.session().is_ready())
}

/// Names of the available inputs.
///
/// # Safety
/// `count` must be NULL or point to a writable `int32_t`.
#[no_mangle]
pub unsafe extern "C" fn audio_session_list_inputs(count: *mut i32) -> *const *const c_char {
    guarded("audio_session_list_inputs", ptr::null(), || {
        let ctx = context();
        let ports = ctx.audio.session().list_inputs();
        let mut list = ctx.inputs.lock();
        list.replace(ports);
        publish_list(&mut list, count)
    })
}

/// Names of the available outputs.
///
/// # Safety
/// `count` must be NULL or point to a writable `int32_t`.
#[no_mangle]
pub unsafe extern "C" fn audio_session_list_outputs(count: *mut i32) -> *const *const c_char {
    guarded("audio_session_list_outputs", ptr::null(), || {
        let ctx = context();
        let ports = ctx.audio.session().list_outputs();
        let mut list = ctx.outputs.lock();
        list.replace(ports);
        publish_list(&mut list, count)
    })
}

#[no_mangle]
pub extern "C" fn audio_session_inputs_changed() -> bool {
    guarded("audio_session_inputs_changed", false, || {
        context().audio.session().consume_inputs_changed()
    })
}

#[no_mangle]
pub extern "C" fn audio_session_outputs_changed() -> bool {
    guarded("audio_session_outputs_changed", false, || {
        context().audio.session().consume_outputs_changed()
    })
}

/// Select the input at `index` in the most recent `audio_session_list_inputs`.
#[no_mangle]
pub extern "C" fn audio_session_set_preferred_input(index: i32) {
    guarded("audio_session_set_preferred_input", (), || {
        let ctx = context();
        let port = usize::try_from(index)
            .ok()
            .and_then(|i| ctx.inputs.lock().get(i).cloned());
        match port {
            Some(port) => ctx.audio.session().set_preferred_input(&port),
            None => log::warn!("Preferred input index {} is not in the last listing", index),
        }
    })
}

#[no_mangle]
pub extern "C" fn audio_session_channels() -> u32 {
    guarded("audio_session_channels", 0, || {
        context().audio.capture().current_format().map_or(0, |f| u32::from(f.channels))
    })
}

#[no_mangle]
pub extern "C" fn audio_session_sample_rate() -> f64 {
    guarded("audio_session_sample_rate", 0.0, || {
        context().audio.capture().current_format().map_or(0.0, |f| f.sample_rate)
    })
}

/// Samples per channel in one published frame.
#[no_mangle]
pub extern "C" fn audio_session_pcm_data_samples() -> u32 {
    guarded("audio_session_pcm_data_samples", 0, || {
        context().audio.capture().current_format().map_or(0, |f| f.frame_length)
    })
}

#[no_mangle]
pub extern "C" fn audio_session_bytes_per_sample() -> u32 {
    guarded("audio_session_bytes_per_sample", 0, || {
        context()
            .audio
            .capture()
            .current_format()
            .map_or(0, |f| u32::from(f.bytes_per_sample))
    })
}

/// Copy the latest frame, channel after channel, and point `out` at it.
///
/// `out` receives NULL when not recording.
///
/// # Safety
/// `out` must be NULL or point to a writable `const float *`.
#[no_mangle]
pub unsafe extern "C" fn audio_session_read_pcm_data(out: *mut *const f32) {
    guarded("audio_session_read_pcm_data", (), || {
        let ctx = context();
        let mut capture = ctx.audio.capture();
        let data = match capture.read_buffer() {
            Some(view) => {
                let mut pcm = ctx.pcm.lock();
                view.copy_planar_into(&mut pcm);
                pcm.as_ptr()
            }
            None => ptr::null(),
        };
        if !out.is_null() {
            *out = data;
        }
    })
}

#[no_mangle]
pub extern "C" fn audio_session_pcm_updated() -> bool {
    guarded("audio_session_pcm_updated", false, || {
        context().audio.capture().consume_updated()
    })
}

#[no_mangle]
pub extern "C" fn audio_session_start_recording() -> bool {
    guarded("audio_session_start_recording", false, || {
        match context().audio.capture().start() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                false
            }
        }
    })
}

#[no_mangle]
pub extern "C" fn audio_session_stop_recording() {
    guarded("audio_session_stop_recording", (), || context().audio.capture().stop())
}

#[no_mangle]
pub extern "C" fn audio_session_is_recording() -> bool {
    guarded("audio_session_is_recording", false, || {
        context().audio.capture().is_recording()
    })
}

#[no_mangle]
pub extern "C" fn audio_session_route_for_playback() {
    guarded("audio_session_route_for_playback", (), || {
        context().audio.routing().route_for_playback()
    })
}

#[no_mangle]
pub extern "C" fn audio_session_route_for_recording() {
    guarded("audio_session_route_for_recording", (), || {
        context().audio.routing().route_for_recording()
    })
}

#[no_mangle]
pub extern "C" fn audio_session_external_device_connected() -> bool {
    guarded("audio_session_external_device_connected", false, || {
        context().audio.routing().is_external_device_connected()
    })
}

/// Capture diagnostics as a JSON object.
#[no_mangle]
pub extern "C" fn audio_session_diagnostics_json() -> *const c_char {
    guarded("audio_session_diagnostics_json", ptr::null(), || {
        let ctx = context();
        let diagnostics = ctx.audio.capture().diagnostics();
        let mut cached = ctx.diagnostics.lock();
        match diagnostics.to_json().map(CString::new) {
            Ok(Ok(json)) => *cached = json,
            Ok(Err(e)) => log::error!("Diagnostics JSON contained NUL: {}", e),
            Err(e) => log::error!("Failed to encode diagnostics: {}", e),
        }
        cached.as_ptr()
    })
}
