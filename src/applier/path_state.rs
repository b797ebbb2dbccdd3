use std::io::{self, ErrorKind};
use std::path::Path;

use derive_more::Display;

/// What currently occupies a target path. Symlinks are never followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PathState {
    #[display("absent")]
    Absent,
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
    #[display("symlink")]
    Symlink,
}

impl PathState {
    pub fn probe(path: &Path) -> io::Result<Self> {
        match path.symlink_metadata() {
            Ok(metadata) => {
                let file_type = metadata.file_type();
                Ok(if file_type.is_symlink() {
                    PathState::Symlink
                } else if file_type.is_dir() {
                    PathState::Directory
                } else {
                    PathState::File
                })
            }
            // A file where a parent directory should be means nothing is here either
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(PathState::Absent)
            }
            Err(e) => Err(e),
        }
    }
}
