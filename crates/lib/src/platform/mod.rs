//! Platform-specific directories.

pub mod paths;
