//! FFI bindings for Funnel Flux
//!
//! This module provides C-compatible functions for calling Funnel Flux from other languages.
//! All functions use C strings (null-terminated) and return allocated memory that
//! must be freed by the caller using `funnel_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{FunnelConfig, DEFAULT_LOOKBACK_DAYS};
use crate::engagement::DEFAULT_ENGAGEMENT_GAP_DAYS;
use crate::error::FunnelError;
use crate::filter::PopulationFilter;
use crate::pipeline::{events_to_funnel_report, FunnelProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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

/// Parse an optional filter argument; NULL means "keep every event"
unsafe fn filter_from_cstr(ptr: *const c_char) -> Result<PopulationFilter, FunnelError> {
    if ptr.is_null() {
        return Ok(PopulationFilter::all());
    }
    let json = cstr_to_string(ptr)
        .ok_or_else(|| FunnelError::InvalidFilter("filter is not valid UTF-8".to_string()))?;
    Ok(serde_json::from_str(&json)?)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Convert a raw event JSON array into a funnel report JSON object.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `filter_json` must be a valid null-terminated C string or NULL.
/// - Returns a newly allocated string that must be freed with `funnel_free_string`.
/// - Returns NULL on error; call `funnel_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn funnel_events_to_report(
    json: *const c_char,
    filter_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let filter_str = if filter_json.is_null() {
        None
    } else {
        match cstr_to_string(filter_json) {
            Some(s) => Some(s),
            None => {
                set_last_error("Invalid filter string pointer");
                return ptr::null_mut();
            }
        }
    };

    match events_to_funnel_report(json_str, filter_str) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a FunnelProcessor
pub struct FunnelProcessorHandle {
    processor: FunnelProcessor,
}

/// Create a new FunnelProcessor.
///
/// Non-positive `engagement_gap_days` or negative `lookback_days` select the defaults.
///
/// # Safety
/// - Returns a pointer to a newly allocated FunnelProcessor.
/// - Must be freed with `funnel_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn funnel_processor_new(
    engagement_gap_days: i32,
    lookback_days: i32,
) -> *mut FunnelProcessorHandle {
    clear_last_error();

    let config = FunnelConfig {
        engagement_gap_days: if engagement_gap_days <= 0 {
            DEFAULT_ENGAGEMENT_GAP_DAYS
        } else {
            engagement_gap_days as i64
        },
        lookback_days: if lookback_days < 0 {
            DEFAULT_LOOKBACK_DAYS
        } else {
            lookback_days as i64
        },
        transitions: None,
    };

    match FunnelProcessor::with_config(config) {
        Ok(processor) => Box::into_raw(Box::new(FunnelProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a FunnelProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `funnel_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn funnel_processor_free(processor: *mut FunnelProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replace the processor's event log with a raw event JSON array.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `funnel_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns the number of events kept, or -1 on error.
/// - On error, call `funnel_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn funnel_processor_load_json(
    processor: *mut FunnelProcessorHandle,
    json: *const c_char,
) -> i64 {
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

    match handle.processor.load_json(&json_str) {
        Ok(()) => handle.processor.event_count() as i64,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Compute a report over the loaded events.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `funnel_processor_new`.
/// - `filter_json` must be a valid null-terminated C string or NULL.
/// - Returns a newly allocated string that must be freed with `funnel_free_string`.
/// - Returns NULL on error; call `funnel_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn funnel_processor_report(
    processor: *mut FunnelProcessorHandle,
    filter_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let result =
        filter_from_cstr(filter_json).and_then(|filter| handle.processor.report_json(&filter));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Default population filter (lookback window) for the loaded events, as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `funnel_processor_new`.
/// - Returns a newly allocated string that must be freed with `funnel_free_string`.
/// - Returns NULL when no event carries an invitation time, or on error.
#[no_mangle]
pub unsafe extern "C" fn funnel_processor_default_filter(
    processor: *mut FunnelProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let Some(filter) = handle.processor.default_filter() else {
        return ptr::null_mut();
    };

    match serde_json::to_string(&filter) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Funnel Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Funnel Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn funnel_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Funnel Flux function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn funnel_last_error() -> *const c_char {
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
pub unsafe extern "C" fn funnel_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
