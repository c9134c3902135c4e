//! Public entry point: resolve the language, solicit input when the program
//! reads it, run the selected strategy, return one report.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use crate::detector;
use crate::language::LanguageId;
use crate::preview::PreviewSurface;
use crate::report::ExecutionReport;
use crate::runtime::{RuntimeBootstrapper, RuntimeState};
use crate::strategy::{Collaborators, ExecutionRequest, RemoteExecutor, ScriptHost, Strategy};
use workbench_common::ExecutionConfig;

/// Supplies stdin for programs that read input.
#[async_trait]
pub trait InputProvider: Send + Sync {
    /// Ask for the program's input. `None` means the user declined, and the
    /// program runs without stdin.
    async fn request_input(&self, language: LanguageId) -> Option<String>;
}

/// The multi-language execution engine.
pub struct ExecutionEngine {
    script: Arc<dyn ScriptHost>,
    runtime: Arc<RuntimeBootstrapper>,
    remote: Option<Arc<dyn RemoteExecutor>>,
    surface: Arc<dyn PreviewSurface>,
    input: Option<Arc<dyn InputProvider>>,
    config: ExecutionConfig,
}

impl ExecutionEngine {
    pub fn new(
        script: Arc<dyn ScriptHost>,
        runtime: Arc<RuntimeBootstrapper>,
        surface: Arc<dyn PreviewSurface>,
    ) -> Self {
        Self {
            script,
            runtime,
            remote: None,
            surface,
            input: None,
            config: ExecutionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteExecutor>) -> Self {
        self.remote = Some(remote);
        self
    }

    #[must_use]
    pub fn with_input_provider(mut self, input: Arc<dyn InputProvider>) -> Self {
        self.input = Some(input);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ExecutionConfig) -> Self {
        self.config = config;
        self
    }

    /// Run `source` as `language_id`.
    ///
    /// Never fails: unknown languages, guest errors and infrastructure
    /// failures all come back as reports.
    #[instrument(skip(self, source, stdin), fields(source_len = source.len()))]
    pub async fn run(
        &self,
        source: &str,
        language_id: &str,
        stdin: Option<String>,
    ) -> ExecutionReport {
        let Ok(language) = language_id.parse::<LanguageId>() else {
            debug!("Unsupported language requested");
            return ExecutionReport::error(format!("Execution not supported for {language_id}"))
                .with_metadata("language", language_id);
        };

        self.run_request(ExecutionRequest {
            source: source.to_string(),
            language,
            stdin,
        })
        .await
    }

    /// Run an already-resolved request.
    pub async fn run_request(&self, mut request: ExecutionRequest) -> ExecutionReport {
        let language = request.language;

        if request.source.trim().is_empty() {
            return ExecutionReport::warning("No code to execute.")
                .with_metadata("language", language.as_str());
        }

        if request.stdin.is_none()
            && self.config.solicit_input
            && detector::needs_input(&request.source, language)
        {
            match &self.input {
                Some(provider) => {
                    debug!(%language, "Program reads input, asking provider");
                    request.stdin = provider.request_input(language).await;
                }
                None => {
                    return ExecutionReport::warning(format!(
                        "This {} program reads input. Provide stdin and run again.",
                        language.display_name()
                    ))
                    .with_metadata("language", language.as_str())
                    .with_metadata("needs_input", true);
                }
            }
        }

        let strategy = Strategy::for_language(language);
        let collaborators = Collaborators {
            script: self.script.as_ref(),
            runtime: self.runtime.as_ref(),
            remote: self.remote.as_deref(),
            surface: self.surface.as_ref(),
            input: self.input.as_deref(),
        };

        let start = Instant::now();
        let report = strategy
            .execute(&collaborators, &request)
            .await
            .with_metadata("language", language.as_str());

        info!(
            %language,
            strategy = strategy.as_str(),
            status = ?report.status,
            duration_ms = start.elapsed().as_millis(),
            "Execution finished"
        );

        report
    }

    /// Start loading the runtime `language` needs, if it has one.
    ///
    /// Returns the runtime state, or `None` for languages that do not use
    /// the embedded runtime.
    pub fn preload(&self, language: LanguageId) -> Option<RuntimeState> {
        (Strategy::for_language(language) == Strategy::Embedded).then(|| self.runtime.preload())
    }

    pub fn runtime_state(&self) -> RuntimeState {
        self.runtime.state()
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn supported_languages(&self) -> &'static [LanguageId] {
        &LanguageId::ALL
    }
}

impl std::fmt::Debug for ExecutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEngine")
            .field("runtime", &self.runtime)
            .field("remote_enabled", &self.remote_enabled())
            .field("solicit_input", &self.config.solicit_input)
            .finish_non_exhaustive()
    }
}
