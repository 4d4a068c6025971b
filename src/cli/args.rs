//! Command line argument parsing.
//!
//! Flags map one-to-one onto [`Config`] fields. A JSON config file given with
//! `--config` provides the base values; flags that are present on the command
//! line override it, and so do the positional arguments.

use crate::dmg::Config;
use crate::error::{CliError, Result};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;

/// Build a macOS disk image from a folder
#[derive(Parser, Debug)]
#[command(
    name = "mkdmg",
    version,
    about = "Build a macOS disk image from a folder",
    long_about = "Creates a compressed DMG from SOURCE_DIR using hdiutil, optionally blessing,
code signing and notarizing it.

Usage:
  mkdmg MyApp.dmg build/MyApp
  mkdmg --format ULFO --codesign \"Developer ID Application: Me\" MyApp.dmg build/MyApp
  mkdmg --config mkdmg.json"
)]
pub struct Args {
    /// Output disk image, must end in .dmg
    #[arg(value_name = "OUTPUT.dmg")]
    pub output: Option<PathBuf>,

    /// Folder whose contents become the volume
    #[arg(value_name = "SOURCE_DIR")]
    pub source: Option<PathBuf>,

    /// Load options from a JSON config file
    #[arg(long, value_name = "FILE.json")]
    pub config: Option<PathBuf>,

    /// Volume name for the DMG (default: output file name)
    #[arg(long, value_name = "NAME")]
    pub volname: Option<String>,

    /// Size for the DMG in MB (default: fit the source folder)
    #[arg(long, value_name = "MB")]
    pub disk_image_size: Option<u64>,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,

    /// Signing identity
    #[arg(long, value_name = "IDENTITY")]
    pub codesign: Option<String>,

    /// Use APFS as the disk image's filesystem (default: HFS+)
    #[arg(long)]
    pub apfs: bool,

    /// Build a disk image that passes App Sandbox validation
    #[arg(long)]
    pub sandbox_safe: bool,

    /// Final disk image format (UDZO|UDBZ|ULFO|ULMO)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// hdiutil verbosity (0=default, 1=quiet, 2=verbose, 3=debug)
    #[arg(long, value_name = "LEVEL")]
    pub hdiutil_verbosity: Option<u8>,

    /// Print the commands without running them
    #[arg(short = 's', long)]
    pub dry_run: bool,

    /// Bless the disk image
    #[arg(long)]
    pub bless: bool,

    /// Notarize the disk image using this keychain profile
    #[arg(long, value_name = "KEYCHAIN_PROFILE")]
    pub notarize: Option<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Build the effective configuration.
    pub fn into_config(self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => Config::default(),
        };

        match (self.output, self.source) {
            (Some(output), Some(source)) => {
                config.output_path = output;
                config.source_dir = source;
            }
            (None, None) if self.config.is_some() => {}
            (None, _) => {
                return Err(CliError::MissingArgument {
                    argument: "OUTPUT.dmg".to_string(),
                }
                .into());
            }
            (Some(_), None) => {
                return Err(CliError::MissingArgument {
                    argument: "SOURCE_DIR".to_string(),
                }
                .into());
            }
        }

        if let Some(volname) = self.volname {
            config.volume_name = Some(volname);
        }
        if let Some(size) = self.disk_image_size {
            config.volume_size_mb = size;
        }
        if let Some(identity) = self.codesign {
            config.signing_identity = Some(identity);
        }
        if self.apfs {
            config.filesystem = "APFS".to_string();
        }
        if self.sandbox_safe {
            config.sandbox_safe = true;
        }
        if let Some(format) = self.format {
            config.image_format = format;
        }
        if let Some(level) = self.hdiutil_verbosity {
            config.hdiutil_verbosity = level;
        }
        if self.dry_run {
            config.simulate = true;
        }
        if self.bless {
            config.bless = true;
        }
        if let Some(profile) = self.notarize {
            config.notarize_credentials = Some(profile);
        }

        Ok(config)
    }
}
