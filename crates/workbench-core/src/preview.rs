//! Rendering target for markup and stylesheets.
//!
//! HTML and CSS are not executed; they are handed to a [`PreviewSurface`].
//! [`InMemorySurface`] keeps the latest document and stylesheet so a front
//! end (the HTTP server's `/preview` route, for instance) can render them.

use parking_lot::RwLock;
use serde::Serialize;

use workbench_common::EngineError;

/// Where markup is opened and stylesheets are applied.
pub trait PreviewSurface: Send + Sync {
    /// Replace the current document.
    fn open_document(&self, html: &str) -> Result<(), EngineError>;

    /// Replace the stylesheet applied to the current presentation.
    fn apply_stylesheet(&self, css: &str) -> Result<(), EngineError>;
}

/// Point-in-time copy of the surface contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreviewSnapshot {
    pub document: Option<String>,
    pub stylesheet: Option<String>,
    pub documents_opened: u64,
    pub stylesheets_applied: u64,
}

/// Surface that holds its contents in memory.
#[derive(Debug)]
pub struct InMemorySurface {
    state: RwLock<PreviewSnapshot>,
    max_bytes: usize,
}

const STYLE_ELEMENT_ID: &str = "workbench-preview-css";

impl InMemorySurface {
    pub fn new() -> Self {
        Self::with_limit(4 * 1024 * 1024)
    }

    /// Create a surface that rejects documents larger than `max_bytes`.
    pub fn with_limit(max_bytes: usize) -> Self {
        Self {
            state: RwLock::new(PreviewSnapshot::default()),
            max_bytes,
        }
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        self.state.read().clone()
    }

    /// The current document with the current stylesheet injected.
    ///
    /// Returns `None` until a document has been opened.
    pub fn render(&self) -> Option<String> {
        let state = self.state.read();
        let document = state.document.as_ref()?;
        let Some(css) = &state.stylesheet else {
            return Some(document.clone());
        };

        let style = format!("<style id=\"{STYLE_ELEMENT_ID}\">\n{css}\n</style>");
        let rendered = match find_ignore_case(document, "</head>") {
            Some(at) => format!("{}{style}\n{}", &document[..at], &document[at..]),
            None => format!("{style}\n{document}"),
        };
        Some(rendered)
    }

    fn check_size(&self, what: &str, content: &str) -> Result<(), EngineError> {
        if content.len() > self.max_bytes {
            return Err(EngineError::surface(format!(
                "{what} is {} bytes, the preview accepts at most {}",
                content.len(),
                self.max_bytes
            )));
        }
        Ok(())
    }
}

impl Default for InMemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewSurface for InMemorySurface {
    fn open_document(&self, html: &str) -> Result<(), EngineError> {
        self.check_size("document", html)?;
        let mut state = self.state.write();
        state.document = Some(html.to_string());
        state.documents_opened += 1;
        Ok(())
    }

    fn apply_stylesheet(&self, css: &str) -> Result<(), EngineError> {
        self.check_size("stylesheet", css)?;
        let mut state = self.state.write();
        state.stylesheet = Some(css.to_string());
        state.stylesheets_applied += 1;
        Ok(())
    }
}

fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack.to_ascii_lowercase().find(&needle.to_ascii_lowercase())
}
