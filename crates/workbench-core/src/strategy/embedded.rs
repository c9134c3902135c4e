//! Evaluation inside the embedded interpreter.

use tracing::warn;

use super::{ExecutionRequest, RemoteExecutor, RemoteSubmission};
use crate::report::{Diagnostic, ExecutionReport, OutputSink, Status, Stream};
use crate::runtime::{GuestExit, GuestOutput, RuntimeBootstrapper};
use workbench_common::EngineError;

pub(super) async fn execute(
    runtime: &RuntimeBootstrapper,
    remote: Option<&dyn RemoteExecutor>,
    request: &ExecutionRequest,
) -> ExecutionReport {
    let handle = match runtime.ensure_ready().await {
        Ok(handle) => handle,
        Err(e) => {
            if let Some(remote) = remote.filter(|r| r.supports(request.language)) {
                warn!(error = %e, "Embedded runtime unavailable, running remotely");
                let submission = RemoteSubmission {
                    source: &request.source,
                    language: request.language,
                    stdin: request.stdin.as_deref(),
                };
                return remote.run(submission).await.with_diagnostic(Diagnostic::warning(
                    format!("Python runtime failed to load ({e}); ran on the remote service"),
                ));
            }
            return ExecutionReport::error(format!("Python runtime failed to load: {e}"))
                .with_error_class(&EngineError::from(e));
        }
    };

    match handle.run(&request.source, request.stdin.as_deref()).await {
        Ok(output) => report_from_output(output),
        Err(e) => {
            warn!(error = %e, "Embedded runtime could not run the program");
            ExecutionReport::error(format!("Python Error: {e}")).with_error_class(&e)
        }
    }
}

fn report_from_output(output: GuestOutput) -> ExecutionReport {
    let mut sink = OutputSink::new();
    sink.push_block(Stream::Stdout, &output.stdout);
    sink.push_block(Stream::Stderr, &output.stderr);

    let report = match output.exit {
        GuestExit::Code(0) => sink.into_report(Status::Success, "Python"),
        GuestExit::Code(code) => sink
            .into_report(Status::Error, "Python")
            .with_diagnostic(Diagnostic::error(format!("Exited with status {code}"))),
        GuestExit::Trap(message) => sink
            .into_report(Status::Error, "Python")
            .with_diagnostic(Diagnostic::error(format!("Runtime trap: {message}"))),
        GuestExit::OutOfFuel => {
            let limit = EngineError::FuelExhausted;
            sink.into_report(Status::Error, "Python")
                .with_diagnostic(Diagnostic::error(limit.to_string()))
                .with_error_class(&limit)
        }
    };

    match output.fuel_consumed {
        Some(fuel) => report.with_metadata("fuel_consumed", fuel),
        None => report,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::language::LanguageId;
    use crate::runtime::{GuestRuntime, RuntimeHandle, RuntimeLoader};
    use workbench_common::RuntimeLoadError;

    struct FixedRuntime(GuestOutput);

    #[async_trait]
    impl GuestRuntime for FixedRuntime {
        async fn run(&self, _source: &str, _stdin: Option<&str>) -> Result<GuestOutput, EngineError> {
            Ok(self.0.clone())
        }
    }

    struct Loader(Option<GuestOutput>);

    #[async_trait]
    impl RuntimeLoader for Loader {
        async fn load(&self) -> Result<RuntimeHandle, RuntimeLoadError> {
            match &self.0 {
                Some(output) => Ok(Arc::new(FixedRuntime(output.clone()))),
                None => Err(RuntimeLoadError::Fetch {
                    url: "https://bundles.example.test/python.wasm".into(),
                    reason: "dns error".into(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct CountingRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteExecutor for CountingRemote {
        async fn run(&self, submission: RemoteSubmission<'_>) -> ExecutionReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ExecutionReport::success(format!("remote ran {}", submission.source))
        }

        fn supports(&self, language: LanguageId) -> bool {
            language == LanguageId::Python
        }
    }

    fn output(stdout: &str, stderr: &str, exit: GuestExit) -> GuestOutput {
        GuestOutput {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit,
            fuel_consumed: None,
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest::new("print(1+1)", LanguageId::Python)
    }

    #[tokio::test]
    async fn test_success_output() {
        let runtime = RuntimeBootstrapper::new(Arc::new(Loader(Some(output(
            "2\n",
            "",
            GuestExit::Code(0),
        )))));

        let report = execute(&runtime, None, &request()).await;
        assert!(report.is_success());
        assert_eq!(report.message, "2");
    }

    #[tokio::test]
    async fn test_guest_exception() {
        let runtime = RuntimeBootstrapper::new(Arc::new(Loader(Some(output(
            "partial\n",
            "ZeroDivisionError: division by zero\n",
            GuestExit::Code(1),
        )))));

        let report = execute(&runtime, None, &request()).await;
        assert!(report.is_error());
        assert_eq!(
            report.message,
            "partial\nERROR: ZeroDivisionError: division by zero"
        );
        assert_eq!(report.diagnostics[0].text, "Exited with status 1");
    }

    #[tokio::test]
    async fn test_no_output() {
        let runtime =
            RuntimeBootstrapper::new(Arc::new(Loader(Some(output("", "", GuestExit::Code(0))))));

        let report = execute(&runtime, None, &request()).await;
        assert_eq!(report.message, "Python executed successfully (no output)");
    }

    #[tokio::test]
    async fn test_out_of_fuel() {
        let mut out = output("", "", GuestExit::OutOfFuel);
        out.fuel_consumed = Some(500);
        let runtime = RuntimeBootstrapper::new(Arc::new(Loader(Some(out))));

        let report = execute(&runtime, None, &request()).await;
        assert!(report.is_error());
        assert!(report.diagnostics[0].text.contains("CPU limit exceeded"));
        assert_eq!(report.metadata["fuel_consumed"], 500);
        assert_eq!(report.metadata["error_class"], "resource_limit");
    }

    #[tokio::test]
    async fn test_load_failure_without_remote() {
        let runtime = RuntimeBootstrapper::new(Arc::new(Loader(None)));

        let report = execute(&runtime, None, &request()).await;
        assert!(report.is_error());
        assert!(report.message.starts_with("Python runtime failed to load: "));
        assert!(report.message.contains("dns error"));
        assert_eq!(report.metadata["error_class"], "infrastructure");
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_remote() {
        let runtime = RuntimeBootstrapper::new(Arc::new(Loader(None)));
        let remote = CountingRemote::default();

        let report = execute(&runtime, Some(&remote), &request()).await;
        assert!(report.is_success());
        assert_eq!(report.message, "remote ran print(1+1)");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
        assert!(report.diagnostics[0].text.contains("failed to load"));
    }
}
