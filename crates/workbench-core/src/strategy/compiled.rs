//! Local heuristic check, then remote compile-and-run.
//!
//! A program with any heuristic issue is never sent to the remote service.
//! A clean check only means no checked pattern failed, so the wording stays
//! at "appears valid" unless the program actually ran remotely.

use tracing::debug;

use super::{ExecutionRequest, RemoteExecutor, RemoteSubmission};
use crate::report::{Diagnostic, ExecutionReport};
use crate::validator;

pub(super) async fn execute(
    remote: Option<&dyn RemoteExecutor>,
    request: &ExecutionRequest,
) -> ExecutionReport {
    let language = request.language;
    let name = language.display_name();

    let issues = validator::validate(&request.source, language);
    if !issues.is_empty() {
        debug!(%language, issues = issues.len(), "Heuristic check failed, not submitting");
        return ExecutionReport::warning(format!("{name} code issues found"))
            .with_diagnostics(issues.iter().map(|i| Diagnostic::warning(i.to_string())))
            .with_diagnostic(Diagnostic::info("Fix these issues for successful compilation."))
            .with_metadata(
                "issues",
                serde_json::to_value(&issues).unwrap_or(serde_json::Value::Null),
            );
    }

    match remote.filter(|r| r.supports(language)) {
        Some(remote) => {
            let submission = RemoteSubmission {
                source: &request.source,
                language,
                stdin: request.stdin.as_deref(),
            };
            remote.run(submission).await
        }
        None => ExecutionReport::success(format!("{name} code appears valid"))
            .with_diagnostics(
                validator::summary(&request.source, language)
                    .into_iter()
                    .map(Diagnostic::info),
            )
            .with_diagnostic(Diagnostic::info(
                "Not executed: remote execution is not configured",
            )),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::language::LanguageId;

    #[derive(Default)]
    struct CountingRemote {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RemoteExecutor for CountingRemote {
        async fn run(&self, submission: RemoteSubmission<'_>) -> ExecutionReport {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ExecutionReport::success(format!("ran {}", submission.language))
        }

        fn supports(&self, language: LanguageId) -> bool {
            matches!(language, LanguageId::Java | LanguageId::Cpp)
        }
    }

    const HELLO_JAVA: &str = "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"hi\");\n    }\n}\n";

    #[tokio::test]
    async fn test_issues_block_remote() {
        let remote = CountingRemote::default();
        let request = ExecutionRequest::new("{ { }", LanguageId::Cpp);

        let report = execute(Some(&remote), &request).await;
        assert!(report.is_warning());
        assert_eq!(remote.calls.load(Ordering::SeqCst), 0);
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.text == "Unbalanced braces: 2 open, 1 close"));
    }

    #[tokio::test]
    async fn test_clean_source_runs_remotely() {
        let remote = CountingRemote::default();
        let request = ExecutionRequest::new(HELLO_JAVA, LanguageId::Java);

        let report = execute(Some(&remote), &request).await;
        assert!(report.is_success());
        assert_eq!(report.message, "ran java");
        assert_eq!(remote.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_clean_source_without_remote_is_hedged() {
        let request = ExecutionRequest::new(HELLO_JAVA, LanguageId::Java);

        let report = execute(None, &request).await;
        assert!(report.is_success());
        assert_eq!(report.message, "Java code appears valid");
        assert_eq!(report.diagnostics[0].text, "Syntax validation passed");
        assert!(report
            .diagnostics
            .last()
            .is_some_and(|d| d.text.contains("not configured")));
    }
}
