//! Domain logic - pure release types independent of git and the filesystem

pub mod tag;
pub mod version;
pub mod version_file;

pub use tag::TagPattern;
pub use version::{BumpRequest, Version, VersionBump};
pub use version_file::{FormatKind, VersionFile};
