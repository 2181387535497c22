#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # sysu-grader
//!
//! Scores the lab submissions of a compiler-construction course. Every case
//! directory under a case root holds a reference answer and the candidate's
//! output; the grader compares them case by case and folds the scores into a
//! weighted total.
//!
//! * `sysu-grader lex CASES WEIGHTS` grades lexer token dumps.
//! * `sysu-grader exec CASES WEIGHTS TOOLCHAIN RTLIB_DIR TIMEOUT` compiles,
//!   runs and times generated IR against the reference IR.
//!
//! Each case gets its own `score.txt`; the run-wide log, `report.json` and
//! `report.txt` land in the case root.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use bpaf::*;
use dotenvy::dotenv;
use sysu_grader::{
    Comparator, ExecutionComparator, GraderConfig, LogRouter, Orchestrator, ToolchainConfig,
    TokenStreamComparator, Verbosity,
};
use tracing::{error, info};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Grade lexer token dumps
    Lex {
        /// optional verbosity override
        verbosity: Option<u8>,
        /// directory holding the cases
        case_root: PathBuf,
        /// weight table
        weights:   PathBuf,
    },
    /// Grade generated IR by running it
    Exec {
        /// optional verbosity override
        verbosity:  Option<u8>,
        /// optional runtime library name override
        rtlib_name: Option<String>,
        /// directory holding the cases
        case_root:  PathBuf,
        /// weight table
        weights:    PathBuf,
        /// compiler driver
        toolchain:  PathBuf,
        /// directory of the runtime library
        rtlib_dir:  PathBuf,
        /// per-step deadline in seconds
        timeout:    u64,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the verbosity flag
    fn v() -> impl Parser<Option<u8>> {
        long("verbosity")
            .short('v')
            .help("How much detail the case logs get, from 1 to 3")
            .argument::<u8>("LEVEL")
            .optional()
    }

    /// parses the case root
    fn c() -> impl Parser<PathBuf> {
        positional::<PathBuf>("CASE_ROOT").help("Directory with one subdirectory per case")
    }

    /// parses the weight table path
    fn w() -> impl Parser<PathBuf> {
        positional::<PathBuf>("WEIGHTS").help("Weight table, one `case [weight]` per line")
    }

    let lex = {
        let verbosity = v();
        let case_root = c();
        let weights = w();
        construct!(Cmd::Lex {
            verbosity,
            case_root,
            weights
        })
    }
    .to_options()
    .command("lex")
    .help("Grade lexer token dumps against the reference dumps");

    let exec = {
        let verbosity = v();
        let rtlib_name = long("rtlib-name")
            .help("Runtime library linked into both executables")
            .argument::<String>("NAME")
            .optional();
        let case_root = c();
        let weights = w();
        let toolchain =
            positional::<PathBuf>("TOOLCHAIN").help("Compiler driver turning IR into executables");
        let rtlib_dir = positional::<PathBuf>("RTLIB_DIR").help("Directory of the runtime library");
        let timeout = positional::<u64>("TIMEOUT_SECS").help("Deadline of every compile or run");
        construct!(Cmd::Exec {
            verbosity,
            rtlib_name,
            case_root,
            weights,
            toolchain,
            rtlib_dir,
            timeout
        })
    }
    .to_options()
    .command("exec")
    .help("Compile, run and time generated IR against the reference IR");

    let cmd = construct!([lex, exec]);

    cmd.to_options()
        .descr("Weighted grader for compiler lab submissions")
        .run()
}

/// The command-line level, else `SYSU_GRADER_VERBOSITY`, else `default`.
fn verbosity(flag: Option<u8>, default: Verbosity) -> Result<Verbosity> {
    Ok(match flag {
        Some(level) => Verbosity::try_from(level)?,
        None => Verbosity::from_env_or(default)?,
    })
}

/// Runs one grading pass and prints the overview.
async fn grade<C: Comparator>(config: GraderConfig, comparator: C) -> Result<()> {
    let router = if config.case_root.is_dir() {
        LogRouter::new(&config.aggregate_log())?
    } else {
        LogRouter::console_only()
    };
    tracing::subscriber::set_global_default(router.subscriber())
        .context("Could not install the log subscriber")?;

    info!("task: {}", comparator.task());
    info!("case root: {}", config.case_root.display());
    info!("weights: {}", config.weights_path.display());
    info!("verbosity: {}", config.verbosity.level());
    info!("{}", "-".repeat(40));

    let mut orchestrator = Orchestrator::new(comparator, &config.case_root, router);
    let outcome = orchestrator.run(&config.weights_path).await;
    match &outcome {
        Ok(_) => info!("grading complete."),
        Err(e) => error!("grading failed: {e}"),
    }
    info!("{}", "-".repeat(40));

    let reports = orchestrator.finish()?;
    eprintln!("{}", reports.overview());

    outcome?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    match options() {
        Cmd::Lex {
            verbosity: level,
            case_root,
            weights,
        } => {
            let config = GraderConfig::builder()
                .case_root(case_root)
                .weights_path(weights)
                .verbosity(verbosity(level, Verbosity::MAX)?)
                .build()
                .absolutize()?;
            let comparator = TokenStreamComparator::new(config.verbosity);
            grade(config, comparator).await
        }
        Cmd::Exec {
            verbosity: level,
            rtlib_name,
            case_root,
            weights,
            toolchain,
            rtlib_dir,
            timeout,
        } => {
            let config = GraderConfig::builder()
                .case_root(case_root)
                .weights_path(weights)
                .verbosity(verbosity(level, Verbosity::MIN)?)
                .build()
                .absolutize()?;

            let toolchain = match rtlib_name {
                Some(name) => ToolchainConfig::builder()
                    .compiler(toolchain)
                    .rtlib_dir(rtlib_dir)
                    .rtlib_name(name)
                    .timeout(Duration::from_secs(timeout))
                    .build(),
                None => ToolchainConfig::builder()
                    .compiler(toolchain)
                    .rtlib_dir(rtlib_dir)
                    .timeout(Duration::from_secs(timeout))
                    .build(),
            }
            .resolve_compiler()?;

            let comparator = ExecutionComparator::new(toolchain, config.verbosity);
            grade(config, comparator).await
        }
    }
}
