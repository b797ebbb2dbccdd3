use derive_more::Display;

/// How files are placed into the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum MaterializeMode {
    /// Independent byte-for-byte copies
    #[default]
    #[display("copy")]
    Copy,
    /// Symlinks pointing back at the source files
    #[display("link")]
    Link,
}

impl MaterializeMode {
    pub fn from_links_flag(links: bool) -> Self {
        if links {
            MaterializeMode::Link
        } else {
            MaterializeMode::Copy
        }
    }
}
