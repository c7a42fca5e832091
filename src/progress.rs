//! Progress and warning reporting.
//!
//! Long operations (export, repack) emit [`ProgressEvent`]s to a
//! [`ProgressReporter`] instead of printing directly, so the CLI can choose
//! between colored console output, JSON lines, or silence.
//!
//! # Example
//!
//! ```
//! use spritepack::progress::{ConsoleProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = ConsoleProgress::with_output(Vec::new());
//! reporter.report(ProgressEvent::PhaseStarted { phase: "export".to_string(), total: 3 });
//! reporter.report(ProgressEvent::Warning {
//!     context: Some("ui_x.png".to_string()),
//!     message: "unrecognized cell name".to_string(),
//! });
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Events emitted by long-running operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A phase began
    PhaseStarted {
        /// Phase name ("tilesets", "sprites", "placement")
        phase: String,
        /// Number of items expected (0 when unknown)
        total: usize,
    },
    /// One item of a phase finished
    ItemCompleted {
        phase: String,
        /// Item identifier (sprite, tileset or file name)
        item: String,
    },
    /// A phase finished
    PhaseCompleted {
        phase: String,
        /// Number of items processed
        count: usize,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// A non-fatal problem, such as a skipped file
    Warning {
        /// File or sprite the warning concerns (if applicable)
        context: Option<String>,
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }

    /// Convenience for emitting a warning.
    fn warn(&self, context: Option<&str>, message: String) {
        self.report(ProgressEvent::Warning { context: context.map(str::to_string), message });
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// A reporter that keeps every event, for callers that want to inspect
/// warnings after the fact.
#[derive(Debug, Default)]
pub struct CollectingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events received so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages of all warnings received so far.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for CollectingProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    use_colors: bool,
    verbose: bool,
    /// Items completed in the current phase
    current: AtomicUsize,
    /// Items expected in the current phase
    total: AtomicUsize,
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("current", &self.current)
            .field("total", &self.total)
            .finish()
    }
}

impl ConsoleProgress {
    /// Reporter writing to stderr, colored when stderr is a terminal.
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stderr),
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Verbose mode prints every completed item.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::PhaseStarted { phase, total } => {
                self.total.store(total, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
                if total > 0 {
                    self.writeln(&format!(
                        "{} {} item{}...",
                        self.cyan(&format!("[{}]", phase)),
                        total,
                        if total == 1 { "" } else { "s" }
                    ));
                } else {
                    self.writeln(&format!("{} ...", self.cyan(&format!("[{}]", phase))));
                }
            }
            ProgressEvent::ItemCompleted { phase, item } => {
                let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                if self.verbose {
                    let total = self.total.load(Ordering::SeqCst);
                    let counter = if total > 0 {
                        format!("[{}/{}]", current, total)
                    } else {
                        format!("[{}]", current)
                    };
                    self.writeln(&format!(
                        "{} {} {}",
                        self.cyan(&format!("[{}]", phase)),
                        counter,
                        item
                    ));
                }
            }
            ProgressEvent::PhaseCompleted { phase, count, duration_ms } => {
                self.writeln(&format!(
                    "{} {} {} in {}",
                    self.green(&format!("[{}]", phase)),
                    count,
                    if count == 1 { "item" } else { "items" },
                    format_duration(duration_ms)
                ));
            }
            ProgressEvent::Warning { context, message } => {
                let prefix = match context {
                    Some(c) => format!("{}: ", c),
                    None => String::new(),
                };
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON-lines progress reporter for machine-readable output.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::PhaseStarted { phase, total } => {
                serde_json::json!({ "event": "phase_started", "phase": phase, "total": total })
            }
            ProgressEvent::ItemCompleted { phase, item } => {
                serde_json::json!({ "event": "item_completed", "phase": phase, "item": item })
            }
            ProgressEvent::PhaseCompleted { phase, count, duration_ms } => serde_json::json!({
                "event": "phase_completed",
                "phase": phase,
                "count": count,
                "duration_ms": duration_ms,
            }),
            ProgressEvent::Warning { context, message } => serde_json::json!({
                "event": "warning",
                "context": context,
                "message": message,
            }),
        };
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
