//! Diagnostics for parse, lex, and indentation failures.
//!
//! Error nodes live in the tree; this module turns them into renderable
//! messages. Collection is builder-based; rendering goes through
//! `annotate-snippets` so the CLI shows the familiar source-window format.

use std::fmt::Write as _;
use std::ops::Range;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

/// Severity of a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// One renderable message with a byte span into the exported document text.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub span: Range<usize>,
    pub message: String,
    /// Terminal classes the parser would have accepted here.
    pub expected: Vec<String>,
}

/// Collection of diagnostics from one document state.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

/// Builder for one diagnostic.
#[must_use = "diagnostic not recorded, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>, span: Range<usize>) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            diagnostics: self,
            message: Diagnostic {
                severity: Severity::Error,
                span,
                message: msg.into(),
                expected: Vec::new(),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter {
            diagnostics: self,
            source,
            path: None,
            colored: false,
        }
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn expected(mut self, classes: impl IntoIterator<Item = String>) -> Self {
        self.message.expected.extend(classes);
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}

/// Renders diagnostics against the document text.
pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a Diagnostics,
    source: &'a str,
    path: Option<&'a str>,
    colored: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn path(mut self, path: &'a str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        let mut out = String::new();
        for diag in self.diagnostics.iter() {
            let span = clamp(diag.span.clone(), self.source.len());
            let label = if diag.expected.is_empty() {
                diag.message.clone()
            } else {
                format!("{} (expected {})", diag.message, diag.expected.join(", "))
            };

            let mut snippet = Snippet::source(self.source)
                .line_start(1)
                .annotation(AnnotationKind::Primary.span(span).label(&label));
            if let Some(path) = self.path {
                snippet = snippet.path(path);
            }

            let level = match diag.severity {
                Severity::Error => Level::ERROR,
                Severity::Warning => Level::WARNING,
            };
            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];
            let _ = writeln!(out, "{}", renderer.render(&report));
        }
        out
    }
}

/// Spans can dangle one byte past a deleted tail; clamp instead of panicking
/// inside the renderer.
fn clamp(span: Range<usize>, len: usize) -> Range<usize> {
    let start = span.start.min(len);
    let end = span.end.clamp(start, len);
    if start == end && start == len && len > 0 {
        len - 1..len
    } else {
        start..end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expected_sets() {
        let mut diagnostics = Diagnostics::new();
        diagnostics
            .error("unexpected token", 2..3)
            .expected(["INT".to_owned()])
            .emit();

        let rendered = diagnostics.printer("1++2").render();
        assert!(rendered.contains("unexpected token"));
        assert!(rendered.contains("expected INT"));
    }

    #[test]
    fn clamps_dangling_spans() {
        assert_eq!(clamp(10..12, 4), 3..4);
        assert_eq!(clamp(1..2, 4), 1..2);
        assert_eq!(clamp(0..0, 0), 0..0);
    }
}
