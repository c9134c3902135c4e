//! Normalized execution reports.
//!
//! Every strategy ends in exactly one [`ExecutionReport`]. Strategies that
//! produce a transcript build it through an [`OutputSink`], which keeps the
//! stdout/stderr/warning/return lines in arrival order and renders them the
//! same way for every language.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use workbench_common::EngineError;

/// Outcome class of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Warning,
    Error,
}

impl Status {
    /// Glyph prefixed to the rendered report.
    pub const fn glyph(self) -> char {
        match self {
            Status::Success => '✓',
            Status::Warning => '⚠',
            Status::Error => '✗',
        }
    }
}

/// Severity of a single diagnostic line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// One ordered diagnostic attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub text: String,
}

impl Diagnostic {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            text: text.into(),
        }
    }
}

/// The uniform result of any execution attempt.
///
/// Reports are built once and then only read; the builder-style methods
/// consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub status: Status,
    pub message: String,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    /// Opaque extra data (strategy name, remote resource usage, ...).
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ExecutionReport {
    pub fn new(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            diagnostics: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Status::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Status::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Status::Error, message)
    }

    /// Append one diagnostic.
    #[must_use]
    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }

    /// Append several diagnostics, keeping their order.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }

    /// Attach a metadata entry. Later values replace earlier ones.
    #[must_use]
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Tag the report with the class of the failure behind it.
    ///
    /// Stored as `error_class`: `infrastructure`, `resource_limit`,
    /// `remote_service` or `guest`.
    #[must_use]
    pub fn with_error_class(self, error: &EngineError) -> Self {
        self.with_metadata("error_class", error_class(error))
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }

    pub fn is_warning(&self) -> bool {
        self.status == Status::Warning
    }

    pub fn is_error(&self) -> bool {
        self.status == Status::Error
    }

    /// Terminal rendering: glyph and message, then one indented line per
    /// diagnostic.
    pub fn render(&self) -> String {
        let mut out = format!("{} {}", self.status.glyph(), self.message);
        for diagnostic in &self.diagnostics {
            out.push_str("\n  - ");
            out.push_str(&diagnostic.text);
        }
        out
    }
}

fn error_class(error: &EngineError) -> &'static str {
    if error.is_resource_limit() {
        "resource_limit"
    } else if error.is_infrastructure() {
        "infrastructure"
    } else if matches!(error, EngineError::Remote(_)) {
        "remote_service"
    } else {
        "guest"
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Stream a captured line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Stdout,
    Stderr,
    Warn,
    Return,
}

impl Stream {
    /// Prefix used when the line is rendered into a transcript.
    pub const fn prefix(self) -> &'static str {
        match self {
            Stream::Stdout => "",
            Stream::Stderr => "ERROR: ",
            Stream::Warn => "WARNING: ",
            Stream::Return => "Return: ",
        }
    }
}

/// Accumulates captured output lines in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSink {
    lines: Vec<(Stream, String)>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stream: Stream, text: impl Into<String>) {
        self.lines.push((stream, text.into()));
    }

    pub fn return_value(&mut self, text: impl Into<String>) {
        self.push(Stream::Return, text);
    }

    /// Push a whole captured stream, one entry per line. Trailing newlines
    /// do not produce empty entries.
    pub fn push_block(&mut self, stream: Stream, block: &str) {
        let block = block.strip_suffix('\n').unwrap_or(block);
        let block = block.strip_suffix('\r').unwrap_or(block);
        if block.is_empty() {
            return;
        }
        for line in block.split('\n') {
            self.push(stream, line.strip_suffix('\r').unwrap_or(line));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the transcript with stream prefixes.
    pub fn transcript(&self) -> String {
        self.lines
            .iter()
            .map(|(stream, text)| format!("{}{}", stream.prefix(), text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build a report from the captured lines.
    ///
    /// An empty sink never yields an empty message: it becomes
    /// `"<language> executed successfully (no output)"` for successes.
    pub fn into_report(self, status: Status, language_name: &str) -> ExecutionReport {
        if self.is_empty() {
            let message = match status {
                Status::Success => format!("{language_name} executed successfully (no output)"),
                Status::Warning => format!("{language_name} finished with warnings (no output)"),
                Status::Error => format!("{language_name} failed (no output)"),
            };
            return ExecutionReport::new(status, message);
        }
        ExecutionReport::new(status, self.transcript())
    }
}
