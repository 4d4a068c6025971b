//! Build macOS disk images from a folder.
//!
//! The heavy lifting is done by the system's `hdiutil`, `codesign`, `bless`
//! and `xcrun` tools; this crate validates options, turns them into the right
//! argument lists and runs the tools in order, cleaning up after itself.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod cli;
pub mod dmg;
pub mod error;

// Re-export commonly used types
pub use error::{CliError, MkdmgError, Result};
