#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use typed_builder::TypedBuilder;
use which::which;

use crate::{
    constants::{DEFAULT_RTLIB_NAME, RTLIB_NAME_ENV, SCORE_LOG, VERBOSITY_ENV},
    error::GradingError,
};

/// How much of the per-token diagnostics reach the case logs.
///
/// * `1`: malformed lines, wrong kinds and wrong values
/// * `2` and up: also wrong locations, wrong whitespace recognition and
///   unified diffs of mismatching program output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Verbosity(u8);

impl Verbosity {
    /// Least detailed level.
    pub const MIN: Verbosity = Verbosity(1);
    /// Most detailed level.
    pub const MAX: Verbosity = Verbosity(3);

    /// Numeric level.
    pub fn level(self) -> u8 {
        self.0
    }

    /// Whether the detailed diagnostics (token locations and whitespace,
    /// output diffs) are reported.
    pub fn is_detailed(self) -> bool {
        self.0 >= 2
    }

    /// Reads `SYSU_GRADER_VERBOSITY`, falling back to `default` when unset.
    pub fn from_env_or(default: Verbosity) -> Result<Verbosity, GradingError> {
        match std::env::var(VERBOSITY_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<u8>().ok())
        {
            Some(level) => Verbosity::try_from(level),
            None => Ok(default),
        }
    }
}

impl TryFrom<u8> for Verbosity {
    type Error = GradingError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        if (Self::MIN.0..=Self::MAX.0).contains(&level) {
            Ok(Self(level))
        } else {
            Err(GradingError::InvalidVerbosity(level))
        }
    }
}

impl Default for Verbosity {
    fn default() -> Self {
        Self::MAX
    }
}

/// Inputs shared by every grading run.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct GraderConfig {
    /// Directory holding one subdirectory per case.
    #[builder(setter(into))]
    pub case_root:    PathBuf,
    /// Weight table listing the cases to grade.
    #[builder(setter(into))]
    pub weights_path: PathBuf,
    /// Diagnostic verbosity.
    #[builder(default)]
    pub verbosity:    Verbosity,
}

impl GraderConfig {
    /// Makes both paths absolute, relative to the working directory.
    pub fn absolutize(mut self) -> Result<Self> {
        self.case_root = absolute(&self.case_root)?;
        self.weights_path = absolute(&self.weights_path)?;
        Ok(self)
    }

    /// Run-wide log under the case root.
    pub fn aggregate_log(&self) -> PathBuf {
        self.case_root.join(SCORE_LOG)
    }
}

/// Absolute form of `path`, without touching the filesystem.
fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Could not resolve {}", path.display()))
}

/// The native toolchain used to turn IR into executables.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(doc)]
pub struct ToolchainConfig {
    /// Compiler driver, either a path or a name looked up on `PATH`.
    #[builder(setter(into))]
    pub compiler:   PathBuf,
    /// Directory searched for the runtime library.
    #[builder(setter(into))]
    pub rtlib_dir:  PathBuf,
    /// Name of the runtime library, as passed to `-l`.
    #[builder(default = rtlib_name_from_env(), setter(into))]
    pub rtlib_name: String,
    /// Deadline of every compile or run step.
    pub timeout:    Duration,
}

/// `SYSU_GRADER_RTLIB_NAME`, or the course's runtime library.
fn rtlib_name_from_env() -> String {
    std::env::var(RTLIB_NAME_ENV)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_RTLIB_NAME.to_owned())
}

impl ToolchainConfig {
    /// Resolves a bare compiler name against `PATH`.
    pub fn resolve_compiler(mut self) -> Result<Self> {
        if self.compiler.components().count() == 1 && !self.compiler.exists() {
            self.compiler = which(&self.compiler).with_context(|| {
                format!("Cannot find the compiler `{}` on PATH", self.compiler.display())
            })?;
        }
        Ok(self)
    }

    /// Arguments compiling `ir` into the executable `exe`:
    /// `-O0 -L<rtlib_dir> -o <exe> <ir> -l<rtlib_name>`.
    pub fn compile_args(&self, ir: &Path, exe: &Path) -> Vec<OsString> {
        let mut lib_dir = OsString::from("-L");
        lib_dir.push(&self.rtlib_dir);

        vec![
            "-O0".into(),
            lib_dir,
            "-o".into(),
            exe.as_os_str().to_owned(),
            ir.as_os_str().to_owned(),
            format!("-l{}", self.rtlib_name).into(),
        ]
    }
}
