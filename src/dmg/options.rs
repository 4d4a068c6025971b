//! Translation of user options into `hdiutil` argument fragments.
//!
//! The fragments produced here are passed verbatim to `hdiutil`, so their
//! spelling and order are part of the external contract with that tool.

use super::error::Error;
use std::fmt;
use std::str::FromStr;

/// Filesystem of the intermediate read/write image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FileSystem {
    /// Journaled HFS+ (default)
    #[default]
    HfsPlus,
    /// Apple File System
    Apfs,
}

impl FileSystem {
    /// Arguments for `hdiutil create`.
    ///
    /// HFS+ gets explicit clump sizes for catalog, attribute and extent files
    /// (`-c c=64,a=16,e=16`) so small volumes do not run out of B-tree space.
    pub fn args(self) -> Vec<String> {
        match self {
            Self::HfsPlus => to_args(&["-fs", "HFS+", "-fsargs", "-c c=64,a=16,e=16"]),
            Self::Apfs => to_args(&["-fs", "APFS"]),
        }
    }
}

impl FromStr for FileSystem {
    type Err = Error;

    /// Case-insensitive; the empty string selects the default.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "HFS+" => Ok(Self::HfsPlus),
            "APFS" => Ok(Self::Apfs),
            _ => Err(Error::InvalidFilesystem(s.to_string())),
        }
    }
}

impl fmt::Display for FileSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::HfsPlus => "HFS+",
            Self::Apfs => "APFS",
        })
    }
}

/// Format of the final, read-only image.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageFormat {
    /// zlib compressed (default)
    #[default]
    Udzo,
    /// bzip2 compressed
    Udbz,
    /// LZFSE compressed
    Ulfo,
    /// LZMA compressed
    Ulmo,
}

impl ImageFormat {
    /// Arguments for `hdiutil convert`.
    ///
    /// zlib and bzip2 are pinned to level 9; the LZ formats have no tunable level.
    pub fn args(self) -> Vec<String> {
        match self {
            Self::Udzo => to_args(&["-format", "UDZO", "-imagekey", "zlib-level=9"]),
            Self::Udbz => to_args(&["-format", "UDBZ", "-imagekey", "bzip2-level=9"]),
            Self::Ulfo | Self::Ulmo => vec!["-format".to_string(), self.to_string()],
        }
    }
}

impl FromStr for ImageFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "" | "UDZO" => Ok(Self::Udzo),
            "UDBZ" => Ok(Self::Udbz),
            "ULFO" => Ok(Self::Ulfo),
            "ULMO" => Ok(Self::Ulmo),
            _ => Err(Error::InvalidFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Udzo => "UDZO",
            Self::Udbz => "UDBZ",
            Self::Ulfo => "ULFO",
            Self::Ulmo => "ULMO",
        })
    }
}

/// `hdiutil` output level: 0 leaves the tool's default, 1 quiet, 2 verbose, 3+ debug.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HdiutilVerbosity(pub u8);

impl HdiutilVerbosity {
    /// The flag for this level, if any.
    pub fn flag(self) -> Option<&'static str> {
        match self.0 {
            0 => None,
            1 => Some("-quiet"),
            2 => Some("-verbose"),
            _ => Some("-debug"),
        }
    }

    /// Insert the flag into an `hdiutil` argument list.
    ///
    /// Image-producing verbs (`create`, `makehybrid`, `convert`) take it right
    /// after the verb; everything else takes it first.
    pub fn apply(self, mut args: Vec<String>) -> Vec<String> {
        let Some(flag) = self.flag() else {
            return args;
        };
        let Some(verb) = args.first() else {
            return args;
        };

        let index = match verb.as_str() {
            "create" | "makehybrid" | "convert" => 1,
            _ => 0,
        };
        args.insert(index, flag.to_string());
        args
    }
}

/// `-size <N>m` when a size was requested; empty lets `hdiutil` fit the source folder.
pub fn volume_size_args(size_mb: u64) -> Vec<String> {
    if size_mb > 0 {
        vec!["-size".to_string(), format!("{size_mb}m")]
    } else {
        Vec::new()
    }
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
