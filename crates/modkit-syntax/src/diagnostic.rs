//! Diagnostic system for errors and warnings
//!
//! Lexer errors, parser errors and attribute checks all produce the same
//! `Diagnostic` type so the build can report them in one batch.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticLevel {
    /// Fatal error that fails the validation gate
    #[serde(rename = "error")]
    Error,
    /// Advisory finding
    #[serde(rename = "warning")]
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "MK1002")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// File path
    pub file: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of error span
    pub length: usize,
    /// Source line string
    pub snippet: String,
    /// Short label for caret range
    pub label: String,
    /// Additional notes (optional)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix (optional)
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::new(DiagnosticLevel::Error, code, message, span)
    }

    /// Create a new warning diagnostic with code
    pub fn warning_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::new(DiagnosticLevel::Warning, code, message, span)
    }

    /// Create a new error diagnostic (uses generic error code)
    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::error_with_code(error_codes::SYNTAX_ERROR, message, span)
    }

    fn new(
        level: DiagnosticLevel,
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            diag_version: DIAG_VERSION,
            level,
            code: code.into(),
            message: message.into(),
            file: "<unknown>".to_string(),
            line: span.line as usize,
            column: span.column as usize,
            length: span.len(),
            snippet: String::new(),
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Set the file path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Fill in the snippet from the full source text
    pub fn with_source(self, source: &str) -> Self {
        let snippet = source
            .lines()
            .nth(self.line.saturating_sub(1))
            .unwrap_or("")
            .trim_end_matches('\r')
            .to_string();
        self.with_snippet(snippet)
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[MK1002]: Unterminated string literal
        output.push_str(&format!("{}[{}]: {}\n", self.level, self.code, self.message));

        // Location: --> Public/Get-Widget.ps1:12:9
        output.push_str(&format!("  --> {}:{}:{}\n", self.file, self.line, self.column));

        if !self.snippet.is_empty() {
            output.push_str("   |\n");
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            // Caret line, clamped to the snippet
            let available = self
                .snippet
                .chars()
                .count()
                .saturating_sub(self.column.saturating_sub(1));
            let carets = self.length.min(available).max(1);
            let padding = " ".repeat(self.column.saturating_sub(1));
            output.push_str(&format!("   | {}{}", padding, "^".repeat(carets)));
            if !self.label.is_empty() {
                output.push_str(&format!(" {}", self.label));
            }
            output.push('\n');
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}[{}]: {}",
            self.file, self.line, self.column, self.level, self.code, self.message
        )
    }
}

/// Sort diagnostics by level (errors first), then by location
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| match (a.level, b.level) {
        (DiagnosticLevel::Error, DiagnosticLevel::Warning) => std::cmp::Ordering::Less,
        (DiagnosticLevel::Warning, DiagnosticLevel::Error) => std::cmp::Ordering::Greater,
        _ => a
            .file
            .cmp(&b.file)
            .then(a.line.cmp(&b.line))
            .then(a.column.cmp(&b.column)),
    });
}

/// Error code registry
///
/// - MK1xxx: lexer and parser errors
/// - MK3xxx: attribute usage errors
pub mod error_codes {
    pub const SYNTAX_ERROR: &str = "MK1000";
    pub const UNEXPECTED_TOKEN: &str = "MK1001";
    pub const UNTERMINATED_STRING: &str = "MK1002";
    pub const UNTERMINATED_HERE_STRING: &str = "MK1003";
    pub const UNTERMINATED_COMMENT: &str = "MK1004";
    pub const UNTERMINATED_VARIABLE: &str = "MK1005";
    pub const MISSING_CLOSING_DELIMITER: &str = "MK1006";
    pub const MISSING_FUNCTION_NAME: &str = "MK1007";
    pub const MISSING_FUNCTION_BODY: &str = "MK1008";
    pub const MISSING_TYPE_NAME: &str = "MK1009";
    pub const INVALID_USING: &str = "MK1010";
    pub const MISPLACED_PARAM_BLOCK: &str = "MK1011";
    pub const INVALID_CLASS_MEMBER: &str = "MK1012";
    pub const INVALID_ENUM_MEMBER: &str = "MK1013";
    pub const MISSING_HASH_EQUALS: &str = "MK1014";

    pub const UNKNOWN_ATTRIBUTE: &str = "MK3001";
    pub const UNKNOWN_ATTRIBUTE_ARGUMENT: &str = "MK3002";
}
