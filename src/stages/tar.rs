//! Archive stage backed by `tar -z`

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{ArchiveStage, ShellRunner};
use crate::backup::TempFileRegistry;
use crate::error::{BackupError, BackupResult};
use crate::logging::RunLog;

/// GNU tar: "some files differ" (e.g. changed while being read)
const TAR_EXIT_FILES_DIFFER: i32 = 1;

/// Compresses the source files into a `.tar.gz` temp file
#[derive(Debug, Clone)]
pub struct TarCompressor {
    program: OsString,
    runner: ShellRunner,
}

impl Default for TarCompressor {
    fn default() -> Self {
        Self::with_program("tar")
    }
}

impl TarCompressor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different tar binary (e.g. `gtar`)
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            runner: ShellRunner::new("Archive").check(false),
        }
    }

    /// `tar -zcf <output> [--exclude <pattern>]... <sources>...`
    pub fn tar_args(&self, sources: &[String], excludes: &[String], output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.program.clone(),
            "-zcf".into(),
            output.as_os_str().to_os_string(),
        ];
        for pattern in excludes {
            args.push("--exclude".into());
            args.push(pattern.into());
        }
        args.extend(sources.iter().map(OsString::from));
        args
    }
}

impl ArchiveStage for TarCompressor {
    fn archive(
        &self,
        sources: &[String],
        excludes: &[String],
        temps: &mut TempFileRegistry,
        log: &dyn RunLog,
    ) -> BackupResult<PathBuf> {
        let output = temps.allocate(".tar.gz")?;
        let args = self.tar_args(sources, excludes, output.path());

        let status = self.runner.run(&args, None, None, log)?;
        match status.code() {
            Some(0) => {}
            Some(TAR_EXIT_FILES_DIFFER) => {
                log.warn("tar reported that some files changed while being archived");
            }
            _ => {
                return Err(BackupError::archive(format!(
                    "tar exited with {} - check your logs",
                    status
                )))
            }
        }

        Ok(output.into_path())
    }
}
