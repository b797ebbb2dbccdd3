use std::path::Path;

/// Permission probes for the current process, as the kernel would evaluate them.
pub trait AccessExt {
    /// A directory is readable when it can be listed and traversed.
    fn is_readable_dir(&self) -> bool;
    fn is_writable(&self) -> bool;
}

#[cfg(unix)]
impl AccessExt for Path {
    fn is_readable_dir(&self) -> bool {
        use nix::unistd::{AccessFlags, access};

        access(self, AccessFlags::R_OK | AccessFlags::X_OK).is_ok()
    }

    fn is_writable(&self) -> bool {
        use nix::unistd::{AccessFlags, access};

        access(self, AccessFlags::W_OK).is_ok()
    }
}

#[cfg(not(unix))]
impl AccessExt for Path {
    fn is_readable_dir(&self) -> bool {
        std::fs::read_dir(self).is_ok()
    }

    fn is_writable(&self) -> bool {
        self.metadata()
            .map(|metadata| !metadata.permissions().readonly())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fresh_temp_dir_is_readable_and_writable() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        assert!(dir.path().is_readable_dir());
        assert!(dir.path().is_writable());
    }

    #[test]
    fn test_missing_path_is_neither() {
        let path = Path::new("/this/path/does/not/exist");
        assert!(!path.is_readable_dir());
        assert!(!path.is_writable());
    }
}
