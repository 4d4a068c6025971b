//! Disk image configuration.
//!
//! [`Config`] is what the user asked for, exactly as given on the command line or
//! in a JSON config file. [`Config::validate`] turns it into a
//! [`ValidatedConfig`], the only type that exposes derived `hdiutil` arguments.

use super::error::{Error, ErrorExt, Result};
use super::options::{FileSystem, HdiutilVerbosity, ImageFormat, volume_size_args};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// User options for building a disk image.
///
/// Serialized with snake_case keys; missing keys take their default.
///
/// ```json
/// {
///   "volume_name": "MyApp",
///   "image_format": "ULFO",
///   "output_path": "dist/MyApp.dmg",
///   "source_dir": "build/MyApp"
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name of the mounted volume. Defaults to the output file name without `.dmg`.
    pub volume_name: Option<String>,

    /// Volume size in megabytes. 0 lets `hdiutil` size it to fit.
    pub volume_size_mb: u64,

    /// Build via `makehybrid` + `convert` so the image passes App Sandbox checks.
    /// Cannot be combined with APFS.
    pub sandbox_safe: bool,

    /// Bless the volume root folder.
    pub bless: bool,

    /// `HFS+` (default) or `APFS`, case-insensitive.
    pub filesystem: String,

    /// Identity passed to `codesign -s`. Signing is skipped when unset.
    pub signing_identity: Option<String>,

    /// Keychain profile for `notarytool`. Notarization is skipped when unset.
    pub notarize_credentials: Option<String>,

    /// `UDZO` (default), `UDBZ`, `ULFO` or `ULMO`.
    pub image_format: String,

    /// 0 default, 1 quiet, 2 verbose, 3+ debug.
    pub hdiutil_verbosity: u8,

    /// Final image path. Must end in `.dmg`.
    pub output_path: PathBuf,

    /// Folder whose contents become the volume.
    pub source_dir: PathBuf,

    /// Log every command without running it.
    pub simulate: bool,
}

impl Config {
    /// Read a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).fs_context("opening config file", path)?;
        Self::from_json(std::io::BufReader::new(file))
    }

    /// Write this config as pretty-printed JSON to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path).fs_context("creating config file", path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.to_json(&mut writer)?;
        writer.flush().fs_context("writing config file", path)
    }

    /// Decode a config from JSON.
    pub fn from_json(reader: impl Read) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Encode this config as JSON.
    pub fn to_json(&self, writer: impl Write) -> Result<()> {
        Ok(serde_json::to_writer_pretty(writer, self)?)
    }

    /// Check the options and derive everything the runner needs.
    ///
    /// Checks run in a fixed order and the first failure is returned:
    /// source directory, output extension, image format, filesystem, then the
    /// sandbox-safe/APFS conflict.
    pub fn validate(&self) -> Result<ValidatedConfig> {
        if self.source_dir.as_os_str().is_empty() {
            return Err(Error::InvalidSourceDir);
        }

        if self.output_path.extension().and_then(|e| e.to_str()) != Some("dmg") {
            return Err(Error::InvalidImageExtension(self.output_path.clone()));
        }

        let image_format: ImageFormat = self.image_format.parse()?;
        let filesystem: FileSystem = self.filesystem.parse()?;

        if self.sandbox_safe && filesystem == FileSystem::Apfs {
            return Err(Error::SandboxApfsConflict);
        }

        let volume_name = match non_empty(&self.volume_name) {
            Some(name) => name.to_string(),
            None => default_volume_name(&self.output_path),
        };

        Ok(ValidatedConfig {
            source_dir: self.source_dir.components().collect(),
            output_path: self.output_path.clone(),
            volume_name,
            volume_size_mb: self.volume_size_mb,
            filesystem,
            image_format,
            verbosity: HdiutilVerbosity(self.hdiutil_verbosity),
            sandbox_safe: self.sandbox_safe,
            bless: self.bless,
            signing_identity: non_empty(&self.signing_identity).map(str::to_string),
            notarize_credentials: non_empty(&self.notarize_credentials).map(str::to_string),
            simulate: self.simulate,
        })
    }
}

/// A configuration that passed [`Config::validate`].
///
/// Immutable; every accessor is infallible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedConfig {
    source_dir: PathBuf,
    output_path: PathBuf,
    volume_name: String,
    volume_size_mb: u64,
    filesystem: FileSystem,
    image_format: ImageFormat,
    verbosity: HdiutilVerbosity,
    sandbox_safe: bool,
    bless: bool,
    signing_identity: Option<String>,
    notarize_credentials: Option<String>,
    simulate: bool,
}

impl ValidatedConfig {
    /// `-fs ...` fragment for `hdiutil create`.
    pub fn filesystem_args(&self) -> Vec<String> {
        self.filesystem.args()
    }

    /// `-format ...` fragment for `hdiutil convert`.
    pub fn image_format_args(&self) -> Vec<String> {
        self.image_format.args()
    }

    /// `-size Nm`, or nothing when the size is automatic.
    pub fn volume_size_args(&self) -> Vec<String> {
        volume_size_args(self.volume_size_mb)
    }

    pub fn volume_name(&self) -> &str {
        &self.volume_name
    }

    pub fn filesystem(&self) -> FileSystem {
        self.filesystem
    }

    pub fn image_format(&self) -> ImageFormat {
        self.image_format
    }

    pub fn verbosity(&self) -> HdiutilVerbosity {
        self.verbosity
    }

    /// Source folder with redundant separators and `.` segments removed.
    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn sandbox_safe(&self) -> bool {
        self.sandbox_safe
    }

    pub fn bless(&self) -> bool {
        self.bless
    }

    pub fn signing_identity(&self) -> Option<&str> {
        self.signing_identity.as_deref()
    }

    pub fn notarize_credentials(&self) -> Option<&str> {
        self.notarize_credentials.as_deref()
    }

    pub fn simulate(&self) -> bool {
        self.simulate
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn default_volume_name(output_path: &Path) -> String {
    output_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            source_dir: "src".into(),
            output_path: "out.dmg".into(),
            ..Default::default()
        }
    }

    #[test]
    fn empty_source_dir_wins_over_everything_else() {
        let config = Config {
            source_dir: PathBuf::new(),
            output_path: "out.txt".into(),
            image_format: "bogus".into(),
            filesystem: "bogus".into(),
            sandbox_safe: true,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidSourceDir)));
    }

    #[test]
    fn output_must_be_a_dmg() {
        for output in ["out", "out.img", "out.DMG.zip", "out.iso", ""] {
            let config = Config {
                output_path: output.into(),
                image_format: "bogus".into(),
                ..base()
            };
            assert!(
                matches!(config.validate(), Err(Error::InvalidImageExtension(_))),
                "{output:?}"
            );
        }
    }

    #[test]
    fn format_is_checked_before_filesystem() {
        let config = Config {
            image_format: "UDRW".into(),
            filesystem: "FAT32".into(),
            ..base()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidFormat(_))));

        let config = Config {
            filesystem: "FAT32".into(),
            ..base()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidFilesystem(_))));
    }

    #[test]
    fn sandbox_safe_rejects_apfs_in_any_case() {
        for fs in ["APFS", "apfs", "Apfs"] {
            let config = Config {
                sandbox_safe: true,
                filesystem: fs.into(),
                ..base()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::SandboxApfsConflict)
            ));
        }

        let config = Config {
            sandbox_safe: true,
            filesystem: "HFS+".into(),
            ..base()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn volume_name_defaults_to_output_stem() {
        let config = Config {
            output_path: "/a/b/MyApp.dmg".into(),
            ..base()
        };
        assert_eq!(config.validate().unwrap().volume_name(), "MyApp");

        let config = Config {
            output_path: "/a/b/MyApp.dmg".into(),
            volume_name: Some(String::new()),
            ..base()
        };
        assert_eq!(config.validate().unwrap().volume_name(), "MyApp");
    }

    #[test]
    fn explicit_volume_name_is_kept() {
        let config = Config {
            output_path: "/a/b/MyApp.dmg".into(),
            volume_name: Some("Custom".into()),
            ..base()
        };
        assert_eq!(config.validate().unwrap().volume_name(), "Custom");
    }

    #[test]
    fn derived_arguments() {
        let validated = Config {
            volume_size_mb: 100,
            filesystem: "apfs".into(),
            image_format: "udbz".into(),
            ..base()
        }
        .validate()
        .unwrap();

        assert_eq!(validated.volume_size_args(), ["-size", "100m"]);
        assert_eq!(validated.filesystem_args(), ["-fs", "APFS"]);
        assert_eq!(
            validated.image_format_args(),
            ["-format", "UDBZ", "-imagekey", "bzip2-level=9"]
        );

        let validated = base().validate().unwrap();
        assert!(validated.volume_size_args().is_empty());
        assert_eq!(validated.filesystem(), FileSystem::HfsPlus);
        assert_eq!(validated.image_format(), ImageFormat::Udzo);
    }

    #[test]
    fn empty_credentials_mean_skip() {
        let validated = Config {
            signing_identity: Some(String::new()),
            notarize_credentials: Some(String::new()),
            ..base()
        }
        .validate()
        .unwrap();
        assert_eq!(validated.signing_identity(), None);
        assert_eq!(validated.notarize_credentials(), None);
    }

    #[test]
    fn source_dir_is_normalized() {
        let config = Config {
            source_dir: "build//./MyApp/".into(),
            ..base()
        };
        assert_eq!(
            config.validate().unwrap().source_dir(),
            Path::new("build/MyApp")
        );
    }

    #[test]
    fn json_round_trip() {
        let config = Config {
            volume_name: Some("MyVolume".into()),
            volume_size_mb: 100,
            sandbox_safe: true,
            bless: true,
            filesystem: "HFS+".into(),
            signing_identity: Some("Developer ID Application: Test".into()),
            notarize_credentials: Some("test-profile".into()),
            image_format: "UDZO".into(),
            hdiutil_verbosity: 2,
            output_path: "test.dmg".into(),
            source_dir: "src".into(),
            simulate: true,
        };

        let mut buf = Vec::new();
        config.to_json(&mut buf).unwrap();
        let decoded = Config::from_json(buf.as_slice()).unwrap();

        assert_eq!(config, decoded);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{"volume_name": "Test", "output_path": "out.dmg", "source_dir": "src"}"#;
        let config = Config::from_json(json.as_bytes()).unwrap();

        assert_eq!(config.volume_name.as_deref(), Some("Test"));
        assert_eq!(config.output_path, Path::new("out.dmg"));
        assert_eq!(config.source_dir, Path::new("src"));
        assert_eq!(config.volume_size_mb, 0);
        assert!(!config.simulate);
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Config::from_json(r#"{"volume_size_mb": "big"}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config {
            volume_name: Some("TestFile".into()),
            output_path: "file.dmg".into(),
            ..base()
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }

    #[test]
    fn load_missing_file_names_the_path() {
        let err = Config::load("/nonexistent/mkdmg.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mkdmg.json"));
    }
}
