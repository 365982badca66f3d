//! Best-effort local browser launching.
//!
//! Opening a browser is a convenience, never a correctness requirement:
//! every caller logs a failure and carries on, and the printed URL always
//! works as a fallback.

use std::io;
use std::process::{Child, Command};

/// Try to open `url` in the user's default browser.
///
/// Returns the spawned helper process so the caller can reap it when the
/// session ends.
pub fn open(url: &str) -> io::Result<Child> {
    #[cfg(target_os = "macos")]
    {
        Command::new("open").arg(url).spawn()
    }

    #[cfg(target_os = "linux")]
    {
        Command::new("xdg-open").arg(url).spawn()
    }

    #[cfg(target_os = "windows")]
    {
        Command::new("cmd").args(["/C", "start", "", url]).spawn()
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        let _ = url;
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no browser launcher for this platform",
        ))
    }
}
