//! Request bodies accepted by the API.

use serde::Deserialize;

/// Maximum accepted source size.
pub const MAX_SOURCE_BYTES: usize = 1024 * 1024;

/// Body of `POST /run`.
#[derive(Debug, Clone, Deserialize)]
pub struct RunRequest {
    /// Program text.
    #[serde(alias = "code")]
    pub source: String,

    /// Language id or alias (`python`, `py`, `c++`, ...).
    pub language: String,

    /// Program input. Absent means "ask if the program needs it".
    #[serde(default)]
    pub stdin: Option<String>,
}

impl RunRequest {
    /// Reject requests the engine should never see.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.trim().is_empty() {
            return Err("language is required".to_string());
        }
        if self.source.len() > MAX_SOURCE_BYTES {
            return Err(format!(
                "source is {} bytes, the limit is {MAX_SOURCE_BYTES}",
                self.source.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_code_alias() {
        let req: RunRequest =
            serde_json::from_str(r#"{"code": "print(1)", "language": "py"}"#).unwrap();

        assert_eq!(req.source, "print(1)");
        assert_eq!(req.language, "py");
        assert!(req.stdin.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let req = RunRequest {
            source: "x".into(),
            language: "  ".into(),
            stdin: None,
        };
        assert_eq!(req.validate().unwrap_err(), "language is required");

        let req = RunRequest {
            source: "x".repeat(MAX_SOURCE_BYTES + 1),
            language: "js".into(),
            stdin: None,
        };
        assert!(req.validate().is_err());
    }
}
