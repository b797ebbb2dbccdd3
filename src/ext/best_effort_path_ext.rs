use std::path::{Component, Path, PathBuf};

/// Renders a path for error messages and logs.
///
/// Existing paths are shown canonicalized. Paths that cannot be canonicalized
/// (usually because they do not exist yet) are made absolute against the
/// current directory and lexically cleaned of `.` and `..` components.
pub fn best_effort_path_display(path: &Path) -> String {
    if let Ok(canonical_path) = path.canonicalize() {
        return canonical_path.display().to_string();
    }

    let absolute_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    lexically_clean(&absolute_path).display().to_string()
}

fn lexically_clean(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !matches!(cleaned.components().next_back(), None | Some(Component::RootDir)) {
                    cleaned.pop();
                }
            }
            other => cleaned.push(other),
        }
    }

    cleaned
}

pub trait BestEffortPathExt {
    fn best_effort_path_display(&self) -> String;
}

impl<P> BestEffortPathExt for P
where
    P: AsRef<Path> + ?Sized,
{
    fn best_effort_path_display(&self) -> String {
        best_effort_path_display(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b", "/a/b")]
    #[case("/../a", "/a")]
    #[case("/a/b/..", "/a")]
    fn test_lexically_clean(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(lexically_clean(Path::new(input)), PathBuf::from(expected));
    }

    #[test]
    fn test_existing_path_is_canonicalized() {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let roundabout = dir.path().join(".").join("x").join("..");
        std::fs::create_dir(dir.path().join("x")).expect("Failed to create dir");

        let expected = dir.path().canonicalize().unwrap().display().to_string();
        assert_eq!(roundabout.best_effort_path_display(), expected);
    }

    #[test]
    fn test_missing_relative_path_is_made_absolute() {
        let shown = "does/not/../exist.txt".best_effort_path_display();
        assert!(Path::new(&shown).is_absolute());
        assert!(shown.ends_with("does/exist.txt"));
    }
}
