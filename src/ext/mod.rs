mod access_ext;
mod async_conversion;
mod best_effort_path_ext;
mod os_str_bytes_ext;

pub use access_ext::AccessExt;
pub use async_conversion::{AsyncTryFrom, AsyncTryInto};
pub use best_effort_path_ext::BestEffortPathExt;
pub use os_str_bytes_ext::{OsStrBytesExt, os_str_from_raw_bytes};
