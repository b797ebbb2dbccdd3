use derive_more::Display;

/// Counts of what one application of a plan did to the target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[display(
    "removed {removed_files} files and {removed_directories} directories \
     (kept {kept_directories} non-empty), created {created_directories} directories, \
     copied {copied_files} files ({unchanged_files} unchanged), linked {linked_files} files, \
     regrouped {regrouped_entries} entries"
)]
pub struct ApplyReport {
    pub removed_files: usize,
    pub removed_directories: usize,
    pub kept_directories: usize,
    pub created_directories: usize,
    pub copied_files: usize,
    pub unchanged_files: usize,
    pub linked_files: usize,
    pub regrouped_entries: usize,
}

impl ApplyReport {
    /// Number of filesystem mutations performed.
    pub fn writes(&self) -> usize {
        self.removed_files
            + self.removed_directories
            + self.created_directories
            + self.copied_files
            + self.linked_files
            + self.regrouped_entries
    }
}
