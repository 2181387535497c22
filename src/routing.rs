#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use anyhow::{Context, Result, ensure};
use tracing::{Level, Subscriber, metadata::LevelFilter};
use tracing_subscriber::{fmt, fmt::MakeWriter, prelude::*};

/// Destination of every log record emitted while it is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Standard output.
    Console,
    /// The log file of the case being scored.
    CaseFile,
    /// The run-wide log file under the case root.
    AggregateFile,
}

/// Shared state behind every [`LogRouter`] handle.
struct RouterState {
    /// currently selected sink
    sink:      Sink,
    /// open per-case log, present only while a [`CaseSink`] lives
    case_log:  Option<BufWriter<File>>,
    /// run-wide log, created when the router is built
    aggregate: Option<File>,
}

/// Routes `tracing` output to exactly one of console, per-case file or
/// run-wide file.
///
/// The router is the writer factory of the fmt layer (see
/// [`LogRouter::subscriber`]) and, at the same time, the routing context the
/// orchestrator switches between phases. Grading is single threaded, so the
/// handle that owns the phase is the only one that ever changes the sink.
#[derive(Clone)]
pub struct LogRouter {
    /// state shared with the writers handed to `tracing`
    state: Arc<Mutex<RouterState>>,
}

impl LogRouter {
    /// Creates a router logging to the console, with its run-wide log
    /// created (or truncated) at `aggregate_log`.
    pub fn new(aggregate_log: &Path) -> Result<Self> {
        let aggregate = File::create(aggregate_log)
            .with_context(|| format!("Could not create {}", aggregate_log.display()))?;
        Ok(Self::with_aggregate(Some(aggregate)))
    }

    /// Creates a router with no run-wide log; aggregate output is discarded.
    pub fn console_only() -> Self {
        Self::with_aggregate(None)
    }

    /// Shared constructor.
    fn with_aggregate(aggregate: Option<File>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RouterState {
                sink: Sink::Console,
                case_log: None,
                aggregate,
            })),
        }
    }

    /// Locks the shared state, recovering it if a writer panicked mid-write.
    fn lock(&self) -> MutexGuard<'_, RouterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Currently selected sink.
    pub fn sink(&self) -> Sink {
        self.lock().sink
    }

    /// Creates the log file of a case at `path` and routes everything into
    /// it until the returned guard is dropped.
    pub fn open_case(&mut self, path: &Path) -> Result<CaseSink<'_>> {
        let file =
            File::create(path).with_context(|| format!("Could not create {}", path.display()))?;

        {
            let mut state = self.lock();
            ensure!(state.case_log.is_none(), "A case log is already open");
            state.case_log = Some(BufWriter::new(file));
            state.sink = Sink::CaseFile;
        }

        Ok(CaseSink {
            router: self,
            path:   path.to_path_buf(),
        })
    }

    /// Routes everything to the run-wide log.
    pub fn route_to_aggregate(&mut self) {
        self.lock().sink = Sink::AggregateFile;
    }

    /// Routes everything to the console.
    pub fn route_to_console(&mut self) {
        let mut state = self.lock();
        if let Some(file) = state.aggregate.as_mut() {
            let _ = file.flush();
        }
        state.sink = Sink::Console;
    }

    /// Flushes and closes the case log, then goes back to the console.
    fn close_case(&mut self) {
        let mut state = self.lock();
        if let Some(mut log) = state.case_log.take() {
            let _ = log.flush();
        }
        state.sink = Sink::Console;
    }

    /// Builds a subscriber whose fmt layer writes through this router.
    pub fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
        let fmt = fmt::layer()
            .without_time()
            .with_file(false)
            .with_line_number(false)
            .with_target(false)
            .with_level(false)
            .with_ansi(false)
            .with_writer(self.clone());
        let filter_layer = LevelFilter::from_level(Level::INFO);
        tracing_subscriber::registry().with(fmt).with(filter_layer)
    }
}

impl<'a> MakeWriter<'a> for LogRouter {
    type Writer = RoutedWriter;

    fn make_writer(&'a self) -> Self::Writer {
        RoutedWriter {
            state: Arc::clone(&self.state),
        }
    }
}

/// Writer handed to the fmt layer for a single record.
pub struct RoutedWriter {
    /// state shared with the router
    state: Arc<Mutex<RouterState>>,
}

impl RoutedWriter {
    /// Runs `op` against whichever sink is selected.
    fn with_sink<T>(&mut self, op: impl FnOnce(&mut dyn Write) -> io::Result<T>) -> io::Result<T> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        let state = &mut *state;
        match (state.sink, state.case_log.as_mut(), state.aggregate.as_mut()) {
            (Sink::CaseFile, Some(log), _) => op(log),
            (Sink::AggregateFile, _, Some(file)) => op(file),
            (Sink::AggregateFile, _, None) => op(&mut io::sink()),
            _ => op(&mut io::stdout()),
        }
    }
}

impl Write for RoutedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.with_sink(|w| w.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.with_sink(|w| w.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.with_sink(|w| w.flush())
    }
}

/// Keeps a case's log file selected. Dropping it, on any exit path, flushes
/// and closes the file and hands routing back to the console.
pub struct CaseSink<'r> {
    /// router whose sink this guard owns
    router: &'r mut LogRouter,
    /// location of the case log
    path:   PathBuf,
}

impl CaseSink<'_> {
    /// Where the case log is written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CaseSink<'_> {
    fn drop(&mut self) {
        self.router.close_case();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sysu-grader-routing-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn case_guard_resets_to_console_on_drop() {
        let dir = temp_dir();
        let mut router = LogRouter::new(&dir.join("score.txt")).expect("router");
        assert_eq!(router.sink(), Sink::Console);

        {
            let sink = router.open_case(&dir.join("case.txt")).expect("open case");
            assert_eq!(sink.path(), dir.join("case.txt"));
        }
        assert_eq!(router.sink(), Sink::Console);

        router.route_to_aggregate();
        assert_eq!(router.sink(), Sink::AggregateFile);
        router.route_to_console();
        assert_eq!(router.sink(), Sink::Console);

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn records_land_in_the_selected_sink_only() {
        let dir = temp_dir();
        let aggregate = dir.join("score.txt");
        let case_log = dir.join("case.txt");
        let mut router = LogRouter::new(&aggregate).expect("router");
        let _default = tracing::subscriber::set_default(router.subscriber());

        tracing::info!("before any case");
        {
            let _sink = router.open_case(&case_log).expect("open case");
            tracing::info!("inside the case");
        }
        router.route_to_aggregate();
        tracing::info!("final report");
        router.route_to_console();

        let case_text = std::fs::read_to_string(&case_log).expect("case log");
        let aggregate_text = std::fs::read_to_string(&aggregate).expect("aggregate log");
        assert!(case_text.contains("inside the case"));
        assert!(!case_text.contains("final report"));
        assert!(aggregate_text.contains("final report"));
        assert!(!aggregate_text.contains("inside the case"));
        assert!(!aggregate_text.contains("before any case"));
        assert!(case_text.lines().any(|line| line.trim_end() == "inside the case"));
        assert!(!case_text.contains("INFO"));
        assert!(aggregate_text.lines().any(|line| line.trim_end() == "final report"));

        let _ = std::fs::remove_dir_all(dir);
    }
}
