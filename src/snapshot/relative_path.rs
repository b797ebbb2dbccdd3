use std::path::{Component, Path, PathBuf};

use derive_more::Display;

use crate::ext::{OsStrBytesExt, os_str_from_raw_bytes};

const SEPARATOR: u8 = b'/';

/// A root-relative path with `/` as separator, kept as raw bytes so names
/// that are not valid UTF-8 survive.
///
/// Ordering is byte-wise on the normalized form, so an ancestor always
/// sorts before any of its descendants.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[display("{}", String::from_utf8_lossy(_0))]
pub struct RelativePath(Vec<u8>);

impl RelativePath {
    /// Normalizes a path that is already relative to some root.
    ///
    /// Returns `None` for empty paths and paths with anything other than
    /// plain name components (roots, prefixes, `..`). `.` components are
    /// dropped.
    pub fn from_relative(path: &Path) -> Option<Self> {
        let mut normalized = Vec::new();

        for component in path.components() {
            match component {
                Component::Normal(name) => {
                    if !normalized.is_empty() {
                        normalized.push(SEPARATOR);
                    }
                    normalized.extend_from_slice(name.raw_bytes());
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        (!normalized.is_empty()).then_some(RelativePath(normalized))
    }

    /// Strips `root` from `path` and normalizes the remainder.
    pub fn from_root(root: &Path, path: &Path) -> Option<Self> {
        Self::from_relative(path.strip_prefix(root).ok()?)
    }

    /// Parses the byte form produced by [`RelativePath::as_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        Self::from_relative(Path::new(&*os_str_from_raw_bytes(bytes)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Resolves this path below `root` using native separators.
    pub fn to_native(&self, root: &Path) -> PathBuf {
        self.0
            .split(|byte| *byte == SEPARATOR)
            .fold(root.to_path_buf(), |mut path, name| {
                path.push(&*os_str_from_raw_bytes(name));
                path
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a.txt", Some("a.txt"))]
    #[case("dir/b.txt", Some("dir/b.txt"))]
    #[case("./dir//b.txt", Some("dir/b.txt"))]
    #[case("dir/./b", Some("dir/b"))]
    #[case("", None)]
    #[case(".", None)]
    #[case("../escape", None)]
    #[case("a/../b", None)]
    #[case("/absolute", None)]
    fn test_from_relative(#[case] input: &str, #[case] expected: Option<&str>) {
        let normalized = RelativePath::from_relative(Path::new(input));
        assert_eq!(normalized.map(|path| path.to_string()).as_deref(), expected);
    }

    #[test]
    fn test_from_root_strips_the_root() {
        let path = RelativePath::from_root(Path::new("/src"), Path::new("/src/dir/b.txt"));
        assert_eq!(path.unwrap().as_bytes(), b"dir/b.txt");
    }

    #[test]
    fn test_from_root_rejects_outside_paths_and_the_root_itself() {
        assert!(RelativePath::from_root(Path::new("/src"), Path::new("/other/b.txt")).is_none());
        assert!(RelativePath::from_root(Path::new("/src"), Path::new("/src")).is_none());
    }

    #[test]
    fn test_to_native_joins_onto_root() {
        let path = RelativePath::from_relative(Path::new("dir/sub/b.txt")).unwrap();
        assert_eq!(
            path.to_native(Path::new("/target")),
            Path::new("/target").join("dir").join("sub").join("b.txt")
        );
    }

    #[rstest]
    #[case("a", "a/b")]
    #[case("a/b", "a/b/c")]
    #[case("dir", "dir/nested.txt")]
    fn test_descendant_sorts_after_ancestor(#[case] ancestor: &str, #[case] descendant: &str) {
        let ancestor = RelativePath::from_relative(Path::new(ancestor)).unwrap();
        let descendant = RelativePath::from_relative(Path::new(descendant)).unwrap();
        assert!(descendant > ancestor);
    }

    #[test]
    fn test_byte_form_parses_back() {
        let path = RelativePath::from_relative(Path::new("dir/sub/b.txt")).unwrap();

        assert_eq!(RelativePath::from_bytes(path.as_bytes()), Some(path));
        assert!(RelativePath::from_bytes(b"../escape").is_none());
        assert!(RelativePath::from_bytes(b"").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_names_are_kept() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = Path::new(OsStr::from_bytes(b"dir/caf\xe9.txt"));
        let path = RelativePath::from_relative(name).unwrap();

        assert_eq!(path.as_bytes(), b"dir/caf\xe9.txt");
        assert_eq!(path.to_native(Path::new("/target")), Path::new("/target").join(name));
        assert_eq!(path.to_string(), "dir/caf\u{FFFD}.txt");
    }
}
