//! When an `open`-family call carries a mode argument.

use std::ffi::c_int;

#[cfg(any(target_os = "linux", target_os = "android"))]
const O_TMPFILE: c_int = libc::O_TMPFILE;
#[cfg(not(any(target_os = "linux", target_os = "android")))]
const O_TMPFILE: c_int = 0;

/// True when `flags` require the caller to pass a mode (`O_CREAT`, or
/// `O_TMPFILE` where it exists). Otherwise no mode was passed and none may be
/// read from the argument list.
#[must_use]
pub const fn takes_mode(flags: c_int) -> bool {
    flags & libc::O_CREAT != 0 || (O_TMPFILE != 0 && flags & O_TMPFILE == O_TMPFILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_is_read_only_when_creating() {
        assert!(!takes_mode(libc::O_RDONLY));
        assert!(!takes_mode(libc::O_WRONLY | libc::O_TRUNC));
        assert!(takes_mode(libc::O_CREAT | libc::O_WRONLY));
        assert!(takes_mode(libc::O_CREAT | libc::O_EXCL | libc::O_RDWR));
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    #[test]
    fn tmpfile_takes_mode_but_directory_alone_does_not() {
        assert!(takes_mode(libc::O_TMPFILE | libc::O_RDWR));
        assert!(!takes_mode(libc::O_DIRECTORY));
    }
}
