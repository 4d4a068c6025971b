//! Disk image build pipeline.
//!
//! [`Runner`] drives the external tools in a fixed order:
//!
//! 1. [`setup`](Runner::setup) - validate, create the working directory
//! 2. [`start`](Runner::start) - build a writable UDRW image from the source folder
//! 3. [`attach_disk_image`](Runner::attach_disk_image) - mount it
//! 4. [`bless`](Runner::bless) - fix permissions, optionally bless the volume
//! 5. [`detach_disk_image`](Runner::detach_disk_image) - unmount
//! 6. [`finalize_dmg`](Runner::finalize_dmg) - convert to the compressed final image
//! 7. [`codesign`](Runner::codesign) - sign and verify, if an identity is set
//! 8. [`notarize`](Runner::notarize) - submit and staple, if a profile is set
//!
//! [`cleanup`](Runner::cleanup) removes the working directory and must run
//! whatever happened in between; [`run`](Runner::run) takes care of that, and
//! dropping the runner does it as a last resort.

use super::command::CommandExecutor;
use super::config::{Config, ValidatedConfig};
use super::error::{Error, Result, path_str};
use super::sink::{EventSink, NoopSink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// Mounted volumes live under this directory; `hdiutil attach` prints it in the last column.
const VOLUMES_ROOT: &str = "/Volumes/";

/// Runs the disk image pipeline for one [`Config`].
///
/// Not meant to be shared: each step mutates the runner and must finish before
/// the next starts.
pub struct Runner {
    config: Config,
    executor: CommandExecutor,
    sink: Arc<dyn EventSink>,
    prepared: Option<Prepared>,
    mount_dir: String,
    permissions_fixed: bool,
    cleanup_actions: Vec<CleanupAction>,
}

/// State established by `setup`.
#[derive(Debug)]
struct Prepared {
    validated: ValidatedConfig,
    temp_dir: PathBuf,
    temp_image: String,
    source_dir: String,
    output_path: String,
}

enum CleanupAction {
    RemoveTempDir(TempDir),
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("prepared", &self.prepared)
            .field("mount_dir", &self.mount_dir)
            .field("permissions_fixed", &self.permissions_fixed)
            .field("pending_cleanup", &self.cleanup_actions.len())
            .finish()
    }
}

impl Runner {
    /// Create a runner that reports nothing.
    pub fn new(config: Config) -> Self {
        Self::with_sink(config, Arc::new(NoopSink))
    }

    /// Create a runner that reports progress and commands to `sink`.
    pub fn with_sink(config: Config, sink: Arc<dyn EventSink>) -> Self {
        let executor = CommandExecutor::new(config.simulate, sink.clone());
        Self {
            config,
            executor,
            sink,
            prepared: None,
            mount_dir: String::new(),
            permissions_fixed: false,
            cleanup_actions: Vec::new(),
        }
    }

    /// Run every step in order, then clean up regardless of the outcome.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.run_steps().await;
        self.cleanup();
        result
    }

    async fn run_steps(&mut self) -> Result<()> {
        self.setup()?;

        self.sink.message("Creating temporary DMG...");
        self.start().await?;

        self.sink.message("Mounting temporary DMG...");
        self.attach_disk_image().await?;
        self.bless().await?;

        self.sink.message("Unmounting DMG...");
        self.detach_disk_image().await?;

        self.sink.message("Converting to final compressed DMG...");
        self.finalize_dmg().await?;

        self.codesign().await?;
        self.notarize().await?;

        let output = self.prepared()?.output_path.clone();
        self.sink.message(&format!("DMG created successfully: {output}"));
        Ok(())
    }

    /// Validate the configuration and create the working directory.
    ///
    /// Calling it again discards the previous working directory first.
    pub fn setup(&mut self) -> Result<()> {
        self.cleanup();

        let validated = self.config.validate()?;

        let temp_dir = tempfile::Builder::new()
            .prefix("mkdmg-")
            .tempdir()
            .map_err(Error::CreateDir)?;
        let temp_image = path_str(&temp_dir.path().join("temp.dmg"))?.to_string();
        let source_dir = path_str(validated.source_dir())?.to_string();
        let output_path = path_str(validated.output_path())?.to_string();

        log::debug!("Working directory: {}", temp_dir.path().display());

        self.prepared = Some(Prepared {
            validated,
            temp_dir: temp_dir.path().to_path_buf(),
            temp_image,
            source_dir,
            output_path,
        });
        self.mount_dir.clear();
        self.permissions_fixed = false;
        self.cleanup_actions.push(CleanupAction::RemoveTempDir(temp_dir));

        Ok(())
    }

    /// Build the writable intermediate image.
    pub async fn start(&mut self) -> Result<()> {
        let prepared = self.prepared()?;
        if prepared.validated.sandbox_safe() {
            self.create_temp_image_sandbox_safe(prepared).await
        } else {
            self.create_temp_image(prepared).await
        }
    }

    /// Same as [`start`](Self::start).
    pub async fn create_dst_dmg(&mut self) -> Result<()> {
        self.start().await
    }

    /// Mount the intermediate image and record where it landed.
    ///
    /// In simulate mode there is no tool output to read, so the mount directory
    /// stays empty and later steps operate on an empty path.
    pub async fn attach_disk_image(&mut self) -> Result<()> {
        let prepared = self.prepared()?;
        let args = to_args(&["attach", "-nobrowse", "-noverify", &prepared.temp_image]);

        let output = match self.executor.output("hdiutil", &args).await {
            Ok(output) => output,
            Err(Error::CommandFailed { output, .. }) => {
                return Err(Error::MountImage(output.trim_end().to_string()));
            }
            Err(e) => return Err(Error::MountImage(e.to_string())),
        };

        if self.executor.simulate() {
            self.mount_dir.clear();
            return Ok(());
        }

        match parse_mount_point(&output) {
            Some(mount_dir) => {
                self.mount_dir = mount_dir.to_string();
                self.sink.message(&format!("DMG mounted at {:?}", self.mount_dir));
                Ok(())
            }
            None => Err(Error::MountImage(format!(
                "couldn't find mount point: {:?}",
                output.trim_end()
            ))),
        }
    }

    /// Fix volume permissions, then bless the volume if requested.
    ///
    /// Blessing is skipped for sandbox-safe images.
    pub async fn bless(&mut self) -> Result<()> {
        let (bless, sandbox_safe) = {
            let validated = &self.prepared()?.validated;
            (validated.bless(), validated.sandbox_safe())
        };

        self.fix_permissions().await;

        if !bless {
            return Ok(());
        }

        if sandbox_safe {
            self.sink.message("Skipping blessing on sandbox safe images");
            return Ok(());
        }

        self.executor
            .run("bless", &to_args(&["--folder", &self.mount_dir]))
            .await
    }

    /// Unmount the volume.
    pub async fn detach_disk_image(&mut self) -> Result<()> {
        self.prepared()?;
        self.fix_permissions().await;
        self.executor
            .run("hdiutil", &to_args(&["detach", &self.mount_dir]))
            .await
    }

    /// Convert the intermediate image into the final one at the output path.
    pub async fn finalize_dmg(&mut self) -> Result<()> {
        let prepared = self.prepared()?;
        let mut args = to_args(&["convert", &prepared.temp_image]);
        args.extend(prepared.validated.image_format_args());
        args.extend(to_args(&["-o", &prepared.output_path]));

        self.hdiutil(prepared, args).await
    }

    /// Sign the final image and verify the signature.
    pub async fn codesign(&mut self) -> Result<()> {
        let prepared = self.prepared()?;
        let Some(identity) = prepared.validated.signing_identity() else {
            self.sink.message("Skipping codesign");
            return Ok(());
        };

        self.executor
            .run("codesign", &to_args(&["-s", identity, &prepared.output_path]))
            .await
            .map_err(|e| Error::CodesignFailed(Box::new(e)))?;

        self.executor
            .run(
                "codesign",
                &to_args(&[
                    "--verify",
                    "--deep",
                    "--strict",
                    "--verbose=2",
                    &prepared.output_path,
                ]),
            )
            .await
            .map_err(|e| Error::CodesignVerifyFailed(Box::new(e)))?;

        self.sink.message("codesign complete");
        Ok(())
    }

    /// Submit the final image for notarization and staple the ticket.
    pub async fn notarize(&mut self) -> Result<()> {
        let prepared = self.prepared()?;
        let Some(profile) = prepared.validated.notarize_credentials() else {
            self.sink.message("Skipping notarization");
            return Ok(());
        };

        self.sink.message("Start notarization");
        let submit = to_args(&[
            "notarytool",
            "submit",
            &prepared.output_path,
            "--keychain-profile",
            profile,
        ]);
        self.executor
            .run("xcrun", &submit)
            .await
            .map_err(|e| Error::NotarizeFailed {
                stage: "submit",
                detail: e.to_string(),
            })?;

        self.sink.message("Stapling the notarization ticket");
        let staple = to_args(&["stapler", "staple", &prepared.output_path]);
        if let Err(e) = self.executor.output("xcrun", &staple).await {
            let detail = match e {
                Error::CommandFailed { output, .. } => output.trim_end().to_string(),
                other => other.to_string(),
            };
            return Err(Error::NotarizeFailed {
                stage: "staple",
                detail,
            });
        }

        self.sink.message("Notarization complete");
        Ok(())
    }

    /// Run pending cleanup actions. Safe to call any number of times.
    ///
    /// Every step returns [`Error::NotInitialized`] afterwards until `setup`
    /// runs again.
    pub fn cleanup(&mut self) {
        self.prepared = None;
        self.mount_dir.clear();
        for action in std::mem::take(&mut self.cleanup_actions) {
            match action {
                CleanupAction::RemoveTempDir(dir) => {
                    self.sink.message(&format!(
                        "Removing temporary directory: {}",
                        dir.path().display()
                    ));
                    let path = dir.path().to_path_buf();
                    if let Err(e) = dir.close() {
                        log::warn!("Failed to remove {}: {}", path.display(), e);
                    }
                }
            }
        }
    }

    /// The validated configuration, once `setup` has run.
    pub fn config(&self) -> Option<&ValidatedConfig> {
        self.prepared.as_ref().map(|p| &p.validated)
    }

    /// Working directory created by `setup`.
    pub fn temp_dir(&self) -> Option<&Path> {
        self.prepared.as_ref().map(|p| p.temp_dir.as_path())
    }

    /// Path of the intermediate read/write image.
    pub fn temp_image(&self) -> Option<&Path> {
        self.prepared.as_ref().map(|p| Path::new(&p.temp_image))
    }

    /// Where the volume is mounted; empty before attach and in simulate mode.
    pub fn mount_dir(&self) -> &Path {
        Path::new(&self.mount_dir)
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.prepared.as_ref().map(|p| Path::new(&p.output_path))
    }

    fn prepared(&self) -> Result<&Prepared> {
        self.prepared.as_ref().ok_or(Error::NotInitialized)
    }

    async fn create_temp_image(&self, prepared: &Prepared) -> Result<()> {
        let validated = &prepared.validated;
        let mut args = vec!["create".to_string()];
        args.extend(validated.filesystem_args());
        args.extend(validated.volume_size_args());
        args.extend(to_args(&[
            "-format",
            "UDRW",
            "-volname",
            validated.volume_name(),
            "-srcfolder",
            &prepared.source_dir,
            &prepared.temp_image,
        ]));

        self.hdiutil(prepared, args).await
    }

    /// `hdiutil create -srcfolder` records absolute source paths in the image,
    /// which App Sandbox validation rejects. A hybrid image converted to UDRW
    /// carries no such metadata.
    async fn create_temp_image_sandbox_safe(&self, prepared: &Prepared) -> Result<()> {
        let makehybrid = to_args(&[
            "makehybrid",
            "-default-volume-name",
            prepared.validated.volume_name(),
            "-hfs",
            "-o",
            &prepared.temp_image,
            &prepared.source_dir,
        ]);
        self.hdiutil(prepared, makehybrid).await?;

        let convert = to_args(&[
            "convert",
            "-format",
            "UDRW",
            "-ov",
            "-o",
            &prepared.temp_image,
            &prepared.temp_image,
        ]);
        self.hdiutil(prepared, convert).await
    }

    /// Run an image-producing `hdiutil` verb with the configured verbosity.
    async fn hdiutil(&self, prepared: &Prepared, args: Vec<String>) -> Result<()> {
        let args = prepared.validated.verbosity().apply(args);
        self.executor.run("hdiutil", &args).await
    }

    /// Clear group and other write bits under the mount point, once.
    ///
    /// Failures are reported but never abort the build.
    async fn fix_permissions(&mut self) {
        if self.permissions_fixed {
            return;
        }

        self.sink.message("Fixing permissions");
        if let Err(e) = self
            .executor
            .run("chmod", &to_args(&["-Rf", "go-w", &self.mount_dir]))
            .await
        {
            self.sink.message(&format!("chmod failed: {e}"));
        }

        self.permissions_fixed = true;
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Find the mount point in `hdiutil attach` output.
///
/// `hdiutil` prints one line per partition; the line for the mounted
/// filesystem ends with its path under `/Volumes/`. Volume names containing
/// whitespace are cut at the last space.
pub fn parse_mount_point(output: &str) -> Option<&str> {
    output
        .lines()
        .find(|line| line.contains(VOLUMES_ROOT))
        .and_then(|line| line.split_whitespace().last())
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
