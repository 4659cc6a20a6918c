//! Operating system bindings
//!
//! All unsafe FFI is contained here. The rest of the crate only sees
//! `io::Result` byte counts and plain process/module descriptions.

#[cfg(target_os = "linux")]
pub mod procfs;
#[cfg(windows)]
pub mod win32;
