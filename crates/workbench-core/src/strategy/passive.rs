//! Markup, stylesheets, structured data and queries. Nothing here executes
//! user code.

use tracing::warn;

use super::ExecutionRequest;
use crate::language::LanguageId;
use crate::preview::PreviewSurface;
use crate::report::{Diagnostic, ExecutionReport};
use crate::sql;

pub(super) fn execute(surface: &dyn PreviewSurface, request: &ExecutionRequest) -> ExecutionReport {
    match request.language {
        LanguageId::Html => open_document(surface, &request.source),
        LanguageId::Css => apply_stylesheet(surface, &request.source),
        LanguageId::Json => pretty_print_json(&request.source),
        LanguageId::Sql => analyze_sql(&request.source),
        other => ExecutionReport::error(format!("Execution not supported for {other}")),
    }
}

fn open_document(surface: &dyn PreviewSurface, html: &str) -> ExecutionReport {
    match surface.open_document(html) {
        Ok(()) => ExecutionReport::success("HTML opened in preview"),
        Err(e) => {
            warn!(error = %e, "Preview rejected document");
            ExecutionReport::error(format!("Could not open the preview: {e}"))
        }
    }
}

fn apply_stylesheet(surface: &dyn PreviewSurface, css: &str) -> ExecutionReport {
    match surface.apply_stylesheet(css) {
        Ok(()) => ExecutionReport::success("CSS applied to current page"),
        Err(e) => {
            warn!(error = %e, "Preview rejected stylesheet");
            ExecutionReport::error(format!("Could not apply the stylesheet: {e}"))
        }
    }
}

/// Parse and re-print with sorted keys and a two-space indent.
fn pretty_print_json(source: &str) -> ExecutionReport {
    let parsed = match serde_json::from_str::<serde_json::Value>(source) {
        Ok(value) => value,
        Err(e) => return ExecutionReport::error(format!("Invalid JSON: {e}")),
    };
    match serde_json::to_string_pretty(&canonicalize(parsed)) {
        Ok(pretty) => ExecutionReport::success(format!("Valid JSON:\n{pretty}")),
        Err(e) => ExecutionReport::error(format!("Invalid JSON: {e}")),
    }
}

/// Rebuild objects with keys in sorted order, independent of how the map
/// type orders its entries.
fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    use serde_json::Value;

    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

fn analyze_sql(source: &str) -> ExecutionReport {
    let analysis = sql::analyze(source);
    let operation = analysis
        .distinct_operations()
        .iter()
        .map(|op| op.description())
        .collect::<Vec<_>>()
        .join(", ");
    let named = Diagnostic::info(format!("Operation: {operation}"));

    if analysis.issues.is_empty() {
        ExecutionReport::success("SQL syntax appears valid")
            .with_diagnostic(named)
            .with_diagnostic(Diagnostic::info("SQL execution requires database connection"))
    } else {
        ExecutionReport::warning("SQL issues found")
            .with_diagnostics(analysis.issues.into_iter().map(Diagnostic::warning))
            .with_diagnostic(named)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::InMemorySurface;

    fn run(language: LanguageId, source: &str, surface: &InMemorySurface) -> ExecutionReport {
        execute(surface, &ExecutionRequest::new(source, language))
    }

    #[test]
    fn test_html_opens_document() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Html, "<h1>Hello</h1>", &surface);

        assert!(report.is_success());
        assert_eq!(report.message, "HTML opened in preview");
        assert_eq!(surface.snapshot().document.as_deref(), Some("<h1>Hello</h1>"));
    }

    #[test]
    fn test_css_applies_stylesheet() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Css, "body { margin: 0; }", &surface);

        assert!(report.is_success());
        assert_eq!(surface.snapshot().stylesheets_applied, 1);
    }

    #[test]
    fn test_surface_failure_is_error() {
        let surface = InMemorySurface::with_limit(2);
        let report = run(LanguageId::Html, "<p>too big</p>", &surface);

        assert!(report.is_error());
        assert!(report.message.starts_with("Could not open the preview"));
    }

    #[test]
    fn test_json_canonical_print() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Json, r#"{"b":1,"a":[true,null]}"#, &surface);

        assert!(report.is_success());
        assert_eq!(
            report.message,
            "Valid JSON:\n{\n  \"a\": [\n    true,\n    null\n  ],\n  \"b\": 1\n}"
        );
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let surface = InMemorySurface::new();
        let first = run(LanguageId::Json, r#"{"z": {"y": 2, "x": 1}}"#, &surface);
        let printed = first.message.strip_prefix("Valid JSON:\n").unwrap();

        let second = run(LanguageId::Json, printed, &surface);
        assert_eq!(first.message, second.message);
    }

    #[test]
    fn test_invalid_json() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Json, "{\"a\": }", &surface);

        assert!(report.is_error());
        assert!(report.message.starts_with("Invalid JSON: "));
        assert!(report.message.contains("line 1"));
    }

    #[test]
    fn test_sql_valid() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Sql, "SELECT * FROM users;", &surface);

        assert!(report.is_success());
        assert_eq!(report.message, "SQL syntax appears valid");
        assert_eq!(report.diagnostics[0].text, "Operation: SELECT - Query data");
    }

    #[test]
    fn test_sql_issues_still_name_operation() {
        let surface = InMemorySurface::new();
        let report = run(LanguageId::Sql, "SELECT 1", &surface);

        assert!(report.is_warning());
        assert_eq!(report.diagnostics[0].text, "SELECT statement missing FROM clause");
        assert_eq!(report.diagnostics[1].text, "Operation: SELECT - Query data");
    }
}
