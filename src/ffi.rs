//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Memory management
//! - Strings returned through `out_*` pointers are allocated on the Rust heap.
//! - Callers **must** free them with `pageforge_free_string`.
//! - Passing a null pointer to the free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error).
//! - Error details can be retrieved via `pageforge_last_error`.
//!
//! ## Threading
//! - Each call runs its own current-thread runtime and blocks until done.
//! - `pageforge_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -lpage_forge
//! // #include <stdint.h>
//! // extern int pageforge_paginate(const char* html, uint32_t html_len,
//! //                               const char* theme, char** out_json);
//! // extern const char* pageforge_last_error();
//! // extern void pageforge_free_string(char* s);
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::pipeline::{block_on, OutputFormat, Pipeline, PipelineConfig};
use crate::theme::{self, DEFAULT_THEME};

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Borrow the HTML input and theme name.
///
/// # Safety
/// `html_ptr` must point to `html_len` valid bytes; `theme`, if non-null,
/// must be a valid null-terminated string.
unsafe fn read_inputs<'a>(
    html_ptr: *const u8,
    html_len: u32,
    theme: *const c_char,
) -> Result<(&'a str, &'a str), (c_int, String)> {
    let html_bytes = slice::from_raw_parts(html_ptr, html_len as usize);
    let html = std::str::from_utf8(html_bytes).map_err(|e| (2, format!("Invalid UTF-8: {e}")))?;
    let theme = if theme.is_null() {
        DEFAULT_THEME
    } else {
        CStr::from_ptr(theme)
            .to_str()
            .map_err(|e| (2, format!("Invalid UTF-8 in theme: {e}")))?
    };
    Ok((html, theme))
}

/// Run the pipeline with default configuration and hand the text back
/// through `out`.
///
/// # Safety
/// Same pointer requirements as the exported functions.
unsafe fn render_into(
    html_ptr: *const u8,
    html_len: u32,
    theme: *const c_char,
    format: OutputFormat,
    out: *mut *mut c_char,
) -> c_int {
    if html_ptr.is_null() || out.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let (html, theme) = match read_inputs(html_ptr, html_len, theme) {
        Ok(v) => v,
        Err((code, msg)) => {
            set_last_error(&msg);
            return code;
        }
    };

    let result = Pipeline::new(PipelineConfig::default()).and_then(|pipeline| {
        block_on(pipeline.render(html, theme, format))?
    });
    let text = match result {
        Ok(t) => t,
        Err(e) => {
            set_last_error(&e.to_string());
            return 3;
        }
    };

    match CString::new(text) {
        Ok(cs) => {
            *out = cs.into_raw();
            0
        }
        Err(e) => {
            set_last_error(&format!("Output contains NUL byte: {e}"));
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Paginate HTML and return a JSON array of standalone page documents.
///
/// # Parameters
/// - `html_ptr`: pointer to UTF-8 HTML bytes (not necessarily null-terminated)
/// - `html_len`: length of the HTML data in bytes
/// - `theme`: null-terminated theme id, or `NULL` for the default
/// - `out_json`: on success, receives a null-terminated JSON string
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `pageforge_last_error`.
///
/// # Safety
/// - `html_ptr` must point to `html_len` valid bytes.
/// - `out_json` must be a valid pointer.
/// - The caller must free `*out_json` with `pageforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pageforge_paginate(
    html_ptr: *const u8,
    html_len: u32,
    theme: *const c_char,
    out_json: *mut *mut c_char,
) -> c_int {
    render_into(html_ptr, html_len, theme, OutputFormat::Preview, out_json)
}

/// Paginate HTML and return one print document containing every page.
///
/// # Safety
/// Same as `pageforge_paginate`.
#[no_mangle]
pub unsafe extern "C" fn pageforge_print_document(
    html_ptr: *const u8,
    html_len: u32,
    theme: *const c_char,
    out_html: *mut *mut c_char,
) -> c_int {
    render_into(html_ptr, html_len, theme, OutputFormat::Document, out_html)
}

/// Return the theme ids as a JSON array.
///
/// # Safety
/// `out_json` must be a valid pointer; free the result with
/// `pageforge_free_string`.
#[no_mangle]
pub unsafe extern "C" fn pageforge_theme_names(out_json: *mut *mut c_char) -> c_int {
    if out_json.is_null() {
        set_last_error("Null pointer argument");
        return 1;
    }
    let json = match serde_json::to_string(&theme::names()) {
        Ok(j) => j,
        Err(e) => {
            set_last_error(&format!("Serialization error: {e}"));
            return 3;
        }
    };
    match CString::new(json) {
        Ok(cs) => {
            *out_json = cs.into_raw();
            0
        }
        Err(e) => {
            set_last_error(&format!("Output contains NUL byte: {e}"));
            4
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a string returned through an `out_*` parameter.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn pageforge_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `pageforge_*` call on the
/// same thread. The caller should **not** free this pointer.
///
/// Returns null if no error has occurred.
#[no_mangle]
pub extern "C" fn pageforge_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn pageforge_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
