//! macOS disk image builder.
//!
//! Builds a DMG from a folder using the native `hdiutil` tool, optionally
//! signing it with `codesign` and notarizing it with `xcrun notarytool`.
//!
//! # Architecture
//!
//! This module is organized into logical submodules:
//! - `config` - user options and their validation
//! - `options` - mapping of options to `hdiutil` arguments
//! - `command` - external process execution and simulate mode
//! - `sink` - progress reporting
//! - `runner` - the step-by-step build pipeline
//!
//! # Example
//!
//! ```no_run
//! use mkdmg::dmg::{Config, Runner};
//!
//! # async fn example() -> mkdmg::dmg::Result<()> {
//! let config = Config {
//!     output_path: "dist/MyApp.dmg".into(),
//!     source_dir: "build/MyApp".into(),
//!     ..Default::default()
//! };
//!
//! Runner::new(config).run().await?;
//! # Ok(())
//! # }
//! ```

mod command;
mod config;
mod error;
mod options;
mod runner;
mod sink;

pub use command::CommandExecutor;
pub use config::{Config, ValidatedConfig};
pub use error::{Error, ErrorExt, Result};
pub use options::{FileSystem, HdiutilVerbosity, ImageFormat, volume_size_args};
pub use runner::{Runner, parse_mount_point};
pub use sink::{EventSink, LogSink, NoopSink};
