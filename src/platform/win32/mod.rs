//! Win32 layer: process handles, foreign memory and ToolHelp32 snapshots

pub mod handle;
pub mod kernel32;
pub mod toolhelp;

pub use handle::Handle;

use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;

/// Convert a Windows wide string (UTF-16) to a Rust string, stopping at NUL
pub fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    OsString::from_wide(&wide[..len])
        .to_string_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wide_to_string() {
        let wide = vec![72, 101, 108, 108, 111, 0, 88];
        assert_eq!(wide_to_string(&wide), "Hello");

        let no_null = vec![72, 105];
        assert_eq!(wide_to_string(&no_null), "Hi");
    }
}
