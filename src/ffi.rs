//! FFI bindings for Nayanthara Flux
//!
//! C-compatible functions for driving the game engines and the dosha engine
//! from a host app. All functions take null-terminated C strings and return
//! allocated memory that must be freed by the caller using `nayan_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::dosha::DEFAULT_CHILD_NAME;
use crate::games::GameKind;
use crate::pipeline::{analyze_logs_json, GameProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Serialize an optional value, `"null"` when absent
fn option_to_json<T: serde::Serialize>(value: Option<T>) -> Result<String, serde_json::Error> {
    serde_json::to_string(&value)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Run the dosha engine over a JSON array of game logs.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
/// - Returns NULL on error; call `nayan_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nayan_analyze_logs(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match analyze_logs_json(json_str) {
        Ok(result) => string_to_cstr(&result),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a GameProcessor
pub struct GameProcessorHandle {
    processor: GameProcessor,
}

/// Create a processor for `game` ("follow", "blink" or "gaze").
///
/// # Safety
/// - `game` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Must be freed with `nayan_processor_free`.
/// - Returns NULL on error; call `nayan_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_new(
    game: *const c_char,
    config_json: *const c_char,
) -> *mut GameProcessorHandle {
    clear_last_error();

    let game_str = match cstr_to_string(game) {
        Some(s) => s,
        None => {
            set_last_error("Invalid game string pointer");
            return ptr::null_mut();
        }
    };
    let kind = match GameKind::parse(&game_str) {
        Ok(kind) => kind,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let config_str = cstr_to_string(config_json).unwrap_or_else(|| "{}".to_string());
    match GameProcessor::from_config_json(kind, &config_str) {
        Ok(processor) => Box::into_raw(Box::new(GameProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a GameProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_free(processor: *mut GameProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Start a new session, ending any active one. Returns the session id.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_start_session(
    processor: *mut GameProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;
    string_to_cstr(&handle.processor.start_session())
}

/// Feed one analyzer response captured at `now_ms`. Returns the frame update JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - `analysis_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
/// - Returns NULL on error; call `nayan_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_on_frame(
    processor: *mut GameProcessorHandle,
    analysis_json: *const c_char,
    now_ms: u64,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let json_str = match cstr_to_string(analysis_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    match handle.processor.process_analysis_json(&json_str, now_ms) {
        Ok(update) => string_to_cstr(&update),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// End the active session. Returns the session summary JSON, or `null`.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_end_session(
    processor: *mut GameProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    match option_to_json(handle.processor.end_session()) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Game log for a completed attempt, or `null` when not (yet) complete.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - `child_id` must be a valid null-terminated C string.
/// - `child_name` may be null (a generic name is used) or a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_completion_log(
    processor: *mut GameProcessorHandle,
    child_id: *const c_char,
    child_name: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &mut *processor;

    let child = match cstr_to_string(child_id) {
        Some(s) => s,
        None => {
            set_last_error("Invalid child_id string pointer");
            return ptr::null_mut();
        }
    };

    let name = if child_name.is_null() {
        DEFAULT_CHILD_NAME.to_string()
    } else {
        match cstr_to_string(child_name) {
            Some(s) => s,
            None => {
                set_last_error("Invalid child_name string pointer");
                return ptr::null_mut();
            }
        }
    };

    match option_to_json(handle.processor.completion_log(&child, &name)) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save session history to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - Returns a newly allocated string that must be freed with `nayan_free_string`.
/// - Returns NULL on error; call `nayan_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_save_sessions(
    processor: *mut GameProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    match handle.processor.save_sessions() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Load session history from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `nayan_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `nayan_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn nayan_processor_load_sessions(
    processor: *mut GameProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_sessions(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Nayanthara Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a `nayan_*` function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn nayan_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next `nayan_*` call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn nayan_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn nayan_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
