//! Direct evaluation in the in-process script host.

use tracing::{debug, warn};

use super::{ExecutionRequest, ScriptHost};
use crate::dispatcher::InputProvider;
use crate::report::{Diagnostic, ExecutionReport, OutputSink, Status};

pub(super) async fn execute(
    host: &dyn ScriptHost,
    prompt: Option<&dyn InputProvider>,
    request: &ExecutionRequest,
) -> ExecutionReport {
    let outcome = match host
        .evaluate(&request.source, request.stdin.as_deref(), prompt)
        .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!(error = %e, "Script host failed");
            return ExecutionReport::error(format!("JavaScript host unavailable: {e}"))
                .with_error_class(&e);
        }
    };

    let mut sink = OutputSink::new();
    for (stream, text) in outcome.logs {
        sink.push_block(stream, &text);
    }

    if let Some(message) = outcome.error {
        debug!(error = %message, "Script threw");
        let mut report = ExecutionReport::error(format!("JavaScript Error: {message}"));
        if !sink.is_empty() {
            report = report.with_diagnostic(Diagnostic::info(format!(
                "Output before the error:\n{}",
                sink.transcript()
            )));
        }
        return report;
    }

    if let Some(value) = outcome.value {
        sink.return_value(value);
    }
    sink.into_report(Status::Success, "JavaScript")
}
