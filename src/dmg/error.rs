//! Error types for disk image creation.
//!
//! Every failure of the pipeline maps to exactly one variant here, so callers can
//! tell a bad configuration apart from a tool that refused to run.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

/// Result type alias for disk image operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while validating a configuration or driving the external tools.
#[derive(Error, Debug)]
pub enum Error {
    /// The source directory was left empty
    #[error("invalid source directory")]
    InvalidSourceDir,

    /// The output path does not end in `.dmg`
    #[error("output file must have a .dmg extension: {0}")]
    InvalidImageExtension(PathBuf),

    /// Unknown final image format
    #[error("invalid image format: {0} (expected UDZO, UDBZ, ULFO or ULMO)")]
    InvalidFormat(String),

    /// Unknown filesystem
    #[error("invalid image filesystem: {0} (expected HFS+ or APFS)")]
    InvalidFilesystem(String),

    /// Sandbox-safe images are built with `makehybrid`, which only produces HFS+
    #[error("creating an APFS disk image that is sandbox safe is not supported")]
    SandboxApfsConflict,

    /// A path handed to an external tool is not valid UTF-8
    #[error("path contains non-UTF8 characters: {0:?}")]
    NonUtf8Path(PathBuf),

    /// The temporary working directory could not be created
    #[error("couldn't create directory: {0}")]
    CreateDir(#[source] std::io::Error),

    /// A pipeline step ran before `setup`
    #[error("runner not properly initialized, call setup() first")]
    NotInitialized,

    /// `hdiutil attach` failed or printed no mount point
    #[error("couldn't attach disk image: {0}")]
    MountImage(String),

    /// `codesign -s` exited with an error
    #[error("codesign command failed: {0}")]
    CodesignFailed(#[source] Box<Error>),

    /// The image was signed but `codesign --verify` rejected it
    #[error("the signature seems invalid: {0}")]
    CodesignVerifyFailed(#[source] Box<Error>),

    /// Submission or stapling failed
    #[error("notarization failed: {stage}: {detail}")]
    NotarizeFailed {
        /// `submit` or `staple`
        stage: &'static str,
        /// Raw tool output or the underlying error
        detail: String,
    },

    /// The executable is not on `PATH`
    #[error("{tool} not found in PATH")]
    ToolNotFound {
        /// Program name
        tool: String,
        #[source]
        source: which::Error,
    },

    /// An external command exited with a non-zero status
    #[error("{command} exited with {status}")]
    CommandFailed {
        /// Program and arguments as run
        command: String,
        /// Exit status reported by the OS
        status: ExitStatus,
        /// Captured output, empty when output was streamed
        output: String,
    },

    /// An external command could not be spawned
    #[error("failed to execute {command}: {source}")]
    Spawn {
        /// Program name
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem error with the operation and path that caused it
    #[error("{context} {}: {source}", .path.display())]
    Fs {
        /// What was being attempted
        context: &'static str,
        /// Path involved
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file (de)serialization
    #[error("invalid config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Attach a description of the filesystem operation to an I/O result.
pub trait ErrorExt<T> {
    /// Wrap the error with `context` and the offending `path`.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::io::Result<T> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|source| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            source,
        })
    }
}

/// Borrow a path as `&str` for use as a command argument.
pub(crate) fn path_str(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))
}
