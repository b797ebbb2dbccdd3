use std::path::Path;

use tracing::{debug, warn};

/// Best-effort enforcement of the owning group of target entries.
///
/// Implementations never fail; a path whose group cannot be inspected or
/// changed is left as it is.
pub trait GroupOwnership {
    /// Returns `true` when the group of `path` was changed.
    fn enforce(&self, path: &Path) -> bool;
}

/// Used when no group is requested or the platform cannot honour one.
pub struct NoGroupOwnership;

impl GroupOwnership for NoGroupOwnership {
    fn enforce(&self, _path: &Path) -> bool {
        false
    }
}

#[cfg(unix)]
pub struct UnixGroupOwnership {
    name: String,
    gid: u32,
}

#[cfg(unix)]
impl UnixGroupOwnership {
    /// Looks the group up once. Unknown groups disable enforcement.
    pub fn resolve(name: &str) -> Option<Self> {
        match nix::unistd::Group::from_name(name) {
            Ok(Some(group)) => Some(Self {
                name: group.name,
                gid: group.gid.as_raw(),
            }),
            Ok(None) => {
                warn!("Group '{name}' does not exist, group ownership will not be enforced");
                None
            }
            Err(e) => {
                warn!("Failed to look up group '{name}': {e}");
                None
            }
        }
    }
}

#[cfg(unix)]
impl GroupOwnership for UnixGroupOwnership {
    fn enforce(&self, path: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;

        let Ok(metadata) = path.symlink_metadata() else {
            return false;
        };
        if metadata.gid() == self.gid {
            return false;
        }

        match std::os::unix::fs::lchown(path, None, Some(self.gid)) {
            Ok(()) => {
                debug!("Changed group of {} to '{}'", path.display(), self.name);
                true
            }
            Err(e) => {
                debug!("Could not change group of {}: {e}", path.display());
                false
            }
        }
    }
}

/// Picks the group enforcement available for `group` on this platform.
pub fn group_ownership_for(group: Option<&str>) -> Box<dyn GroupOwnership> {
    let Some(group) = group else {
        return Box::new(NoGroupOwnership);
    };

    #[cfg(unix)]
    {
        return match UnixGroupOwnership::resolve(group) {
            Some(ownership) => Box::new(ownership),
            None => Box::new(NoGroupOwnership),
        };
    }

    #[cfg(not(unix))]
    {
        warn!("Group ownership ('{group}') is not supported on this platform");
        return Box::new(NoGroupOwnership);
    }
}
