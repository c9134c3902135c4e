//! Remote compile-and-run client.
//!
//! Speaks the JDoodle execute API: one JSON POST per run carrying the
//! credentials, the script and the language/version pair, answered by a JSON
//! object with `output`, `error`, `cputime`, `memory` and whatever else the
//! service chooses to report.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use workbench_common::{EngineError, RemoteConfig, RemoteError, RemoteTarget};
use workbench_core::{Diagnostic, ExecutionReport, LanguageId, RemoteExecutor, RemoteSubmission};

/// Response fields rendered into the report rather than copied to metadata.
const KNOWN_FIELDS: [&str; 4] = ["output", "error", "cputime", "memory"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteBody<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    script: &'a str,
    language: String,
    version_index: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

/// Client for the remote execution service.
pub struct RemoteClient {
    client: Client,
    endpoint: String,
    client_id: String,
    client_secret: String,
    config: RemoteConfig,
    request_count: AtomicU64,
}

impl RemoteClient {
    /// Build a client from configuration.
    ///
    /// Returns `Ok(None)` when credentials are missing; remote execution is
    /// then disabled rather than failing every request.
    pub fn from_config(config: &RemoteConfig) -> Result<Option<Self>, EngineError> {
        let (Some(client_id), Some(client_secret)) = (&config.client_id, &config.client_secret)
        else {
            return Ok(None);
        };
        if !config.is_configured() {
            return Ok(None);
        }

        Url::parse(&config.endpoint).map_err(|e| {
            EngineError::invalid_config(format!("remote endpoint '{}': {e}", config.endpoint))
        })?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(4)
            .user_agent(concat!("workbench/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EngineError::invalid_config(format!("HTTP client: {e}")))?;

        Ok(Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
            config: config.clone(),
            request_count: AtomicU64::new(0),
        }))
    }

    fn target(&self, language: LanguageId) -> Option<&RemoteTarget> {
        self.config.targets.get(language.as_str())
    }

    /// Number of requests sent so far.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Send one submission and return the decoded response object.
    #[instrument(skip(self, submission), fields(language = %submission.language))]
    pub async fn execute(
        &self,
        submission: &RemoteSubmission<'_>,
    ) -> Result<Map<String, Value>, RemoteError> {
        let target = self
            .target(submission.language)
            .ok_or_else(|| RemoteError::UnsupportedLanguage {
                language: submission.language.to_string(),
            })?;

        let body = ExecuteBody {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            script: submission.source,
            language: target.wire_language(),
            version_index: &target.version_index,
            stdin: submission.stdin,
        };

        self.request_count.fetch_add(1, Ordering::Relaxed);
        debug!(endpoint = %self.endpoint, wire_language = %body.language, "Submitting to remote service");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| RemoteError::Unreachable {
                endpoint: self.endpoint.clone(),
                reason: transport_reason(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: rejection_message(&text, status.canonical_reason()),
            });
        }

        let text = response.text().await.map_err(|e| RemoteError::Unreachable {
            endpoint: self.endpoint.clone(),
            reason: transport_reason(&e),
        })?;
        match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(RemoteError::InvalidResponse {
                reason: format!("expected a JSON object, got {other}"),
            }),
            Err(e) => Err(RemoteError::InvalidResponse {
                reason: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl RemoteExecutor for RemoteClient {
    async fn run(&self, submission: RemoteSubmission<'_>) -> ExecutionReport {
        match self.execute(&submission).await {
            Ok(response) => report_from_response(response),
            Err(e) => {
                warn!(error = %e, unreachable = e.is_unreachable(), "Remote execution failed");
                report_from_error(e)
            }
        }
    }

    fn supports(&self, language: LanguageId) -> bool {
        self.target(language).is_some()
    }
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("endpoint", &self.endpoint)
            .field("targets", &self.config.targets.keys().collect::<Vec<_>>())
            .field("request_count", &self.request_count())
            .finish_non_exhaustive()
    }
}

fn transport_reason(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "connection failed".to_string()
    } else {
        e.to_string()
    }
}

/// The service's own message, verbatim when it sent one.
fn rejection_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = map.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }
    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("no message").to_string()
    } else {
        body.to_string()
    }
}

fn report_from_error(error: RemoteError) -> ExecutionReport {
    let message = match &error {
        RemoteError::Unreachable { reason, .. } => {
            format!("Cannot reach the remote execution service: {reason}")
        }
        RemoteError::Rejected { status, message } => {
            format!("Remote execution service rejected the request (HTTP {status}): {message}")
        }
        RemoteError::InvalidResponse { reason } => {
            format!("Remote execution service returned an unexpected response: {reason}")
        }
        RemoteError::UnsupportedLanguage { language } => {
            format!("Remote execution does not support {language}")
        }
    };
    ExecutionReport::error(message).with_error_class(&EngineError::Remote(error))
}

fn report_from_response(mut response: Map<String, Value>) -> ExecutionReport {
    if let Some(error) = response.get("error").and_then(non_empty) {
        return ExecutionReport::error(format!("Remote compilation error:\n{error}"))
            .with_metadata("remote", true);
    }

    let message = response
        .get("output")
        .and_then(non_empty)
        .unwrap_or_else(|| "Code executed successfully (no output)".to_string());

    let mut report = ExecutionReport::success(message);
    if let Some(cpu) = response.get("cputime").and_then(non_empty) {
        report = report.with_diagnostic(Diagnostic::info(format!("CPU Time: {cpu}s")));
    }
    if let Some(memory) = response.get("memory").and_then(non_empty) {
        report = report.with_diagnostic(Diagnostic::info(format!("Memory: {memory}")));
    }

    for field in KNOWN_FIELDS {
        response.remove(field);
    }
    response
        .into_iter()
        .fold(report.with_metadata("remote", true), |report, (key, value)| {
            report.with_metadata(key, value)
        })
}

/// Render a string or number field; null, empty strings and other shapes
/// count as absent.
fn non_empty(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_credentials_disable_client() {
        let config = RemoteConfig::default();
        assert!(RemoteClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = RemoteConfig {
            endpoint: "not a url".into(),
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let err = RemoteClient::from_config(&config).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn test_supports_configured_targets() {
        let config = RemoteConfig {
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            ..Default::default()
        };
        let client = RemoteClient::from_config(&config).unwrap().unwrap();

        assert!(client.supports(LanguageId::Java));
        assert!(client.supports(LanguageId::Cpp));
        assert!(client.supports(LanguageId::Python));
        assert!(!client.supports(LanguageId::Sql));
    }

    #[test]
    fn test_body_shape() {
        let body = ExecuteBody {
            client_id: "id",
            client_secret: "secret",
            script: "int main() {}",
            language: "cpp17".into(),
            version_index: "0",
            stdin: None,
        };
        let value = serde_json::to_value(&body).unwrap();

        assert_eq!(value["clientId"], "id");
        assert_eq!(value["language"], "cpp17");
        assert_eq!(value["versionIndex"], "0");
        assert!(value.get("stdin").is_none());
    }

    #[test]
    fn test_success_report() {
        let report = report_from_response(object(json!({
            "output": "Hello\n",
            "cputime": "0.12",
            "memory": "8192",
            "statusCode": 200
        })));

        assert!(report.is_success());
        assert_eq!(report.message, "Hello\n");
        assert_eq!(report.diagnostics[0].text, "CPU Time: 0.12s");
        assert_eq!(report.diagnostics[1].text, "Memory: 8192");
        assert_eq!(report.metadata["statusCode"], 200);
        assert!(!report.metadata.contains_key("output"));
    }

    #[test]
    fn test_no_output_report() {
        let report = report_from_response(object(json!({ "output": "" })));
        assert_eq!(report.message, "Code executed successfully (no output)");
    }

    #[test]
    fn test_compilation_error_verbatim() {
        let report = report_from_response(object(json!({
            "error": "Main.java:3: error: ';' expected"
        })));

        assert!(report.is_error());
        assert_eq!(
            report.message,
            "Remote compilation error:\nMain.java:3: error: ';' expected"
        );
    }

    #[test]
    fn test_error_wording_is_distinct() {
        let unreachable = report_from_error(RemoteError::Unreachable {
            endpoint: "http://127.0.0.1:9".into(),
            reason: "connection failed".into(),
        });
        let rejected = report_from_error(RemoteError::Rejected {
            status: 401,
            message: "Unauthorized Request".into(),
        });

        assert!(unreachable.message.starts_with("Cannot reach the remote execution service"));
        assert_eq!(
            rejected.message,
            "Remote execution service rejected the request (HTTP 401): Unauthorized Request"
        );
        assert_eq!(unreachable.metadata["error_class"], "infrastructure");
        assert_eq!(rejected.metadata["error_class"], "remote_service");
    }

    #[test]
    fn test_rejection_message() {
        assert_eq!(rejection_message(r#"{"error":"Daily limit reached"}"#, None), "Daily limit reached");
        assert_eq!(rejection_message("  ", Some("Unauthorized")), "Unauthorized");
        assert_eq!(rejection_message("plain text", Some("Bad Request")), "plain text");
    }
}
