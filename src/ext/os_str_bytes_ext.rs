use std::borrow::Cow;
use std::ffi::OsStr;

/// Lossless byte access to OS strings, for names that are not valid UTF-8.
pub trait OsStrBytesExt {
    fn raw_bytes(&self) -> &[u8];
}

impl OsStrBytesExt for OsStr {
    #[cfg(unix)]
    fn raw_bytes(&self) -> &[u8] {
        std::os::unix::ffi::OsStrExt::as_bytes(self)
    }

    #[cfg(not(unix))]
    fn raw_bytes(&self) -> &[u8] {
        self.as_encoded_bytes()
    }
}

/// Inverse of [`OsStrBytesExt::raw_bytes`]. Exact on unix; elsewhere bytes
/// that are not UTF-8 are replaced.
#[cfg(unix)]
pub fn os_str_from_raw_bytes(bytes: &[u8]) -> Cow<'_, OsStr> {
    Cow::Borrowed(std::os::unix::ffi::OsStrExt::from_bytes(bytes))
}

#[cfg(not(unix))]
pub fn os_str_from_raw_bytes(bytes: &[u8]) -> Cow<'_, OsStr> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(OsStr::new(text)),
        Err(_) => Cow::Owned(std::ffi::OsString::from(String::from_utf8_lossy(bytes).into_owned())),
    }
}
