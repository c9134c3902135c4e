//! Supported languages.
//!
//! [`LanguageId`] is the closed set of languages the engine knows. It drives
//! strategy selection, default templates and file-extension detection.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A source language understood by the workbench.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageId {
    JavaScript,
    Python,
    Java,
    Cpp,
    Html,
    Css,
    Json,
    Sql,
}

/// Error returned when a language id is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

impl LanguageId {
    /// Every supported language, in menu order.
    pub const ALL: [LanguageId; 8] = [
        LanguageId::JavaScript,
        LanguageId::Python,
        LanguageId::Java,
        LanguageId::Cpp,
        LanguageId::Html,
        LanguageId::Css,
        LanguageId::Json,
        LanguageId::Sql,
    ];

    /// Canonical id used on the wire and in configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            LanguageId::JavaScript => "javascript",
            LanguageId::Python => "python",
            LanguageId::Java => "java",
            LanguageId::Cpp => "cpp",
            LanguageId::Html => "html",
            LanguageId::Css => "css",
            LanguageId::Json => "json",
            LanguageId::Sql => "sql",
        }
    }

    /// Human-readable name used in report messages.
    pub const fn display_name(self) -> &'static str {
        match self {
            LanguageId::JavaScript => "JavaScript",
            LanguageId::Python => "Python",
            LanguageId::Java => "Java",
            LanguageId::Cpp => "C++",
            LanguageId::Html => "HTML",
            LanguageId::Css => "CSS",
            LanguageId::Json => "JSON",
            LanguageId::Sql => "SQL",
        }
    }

    /// Preferred file extension, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            LanguageId::JavaScript => "js",
            LanguageId::Python => "py",
            LanguageId::Java => "java",
            LanguageId::Cpp => "cpp",
            LanguageId::Html => "html",
            LanguageId::Css => "css",
            LanguageId::Json => "json",
            LanguageId::Sql => "sql",
        }
    }

    /// Guess the language from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Some(LanguageId::JavaScript),
            "py" => Some(LanguageId::Python),
            "java" => Some(LanguageId::Java),
            "cpp" | "cc" | "cxx" | "hpp" | "h" => Some(LanguageId::Cpp),
            "html" | "htm" => Some(LanguageId::Html),
            "css" => Some(LanguageId::Css),
            "json" => Some(LanguageId::Json),
            "sql" => Some(LanguageId::Sql),
            _ => None,
        }
    }

    /// Starter program shown when the language is first selected.
    pub const fn default_template(self) -> &'static str {
        match self {
            LanguageId::JavaScript => templates::JAVASCRIPT,
            LanguageId::Python => templates::PYTHON,
            LanguageId::Java => templates::JAVA,
            LanguageId::Cpp => templates::CPP,
            LanguageId::Html => templates::HTML,
            LanguageId::Css => templates::CSS,
            LanguageId::Json => templates::JSON,
            LanguageId::Sql => templates::SQL,
        }
    }
}

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LanguageId {
    type Err = UnknownLanguage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "node" => Ok(LanguageId::JavaScript),
            "python" | "py" | "python3" => Ok(LanguageId::Python),
            "java" => Ok(LanguageId::Java),
            "cpp" | "c++" | "cxx" => Ok(LanguageId::Cpp),
            "html" => Ok(LanguageId::Html),
            "css" => Ok(LanguageId::Css),
            "json" => Ok(LanguageId::Json),
            "sql" => Ok(LanguageId::Sql),
            _ => Err(UnknownLanguage(s.to_string())),
        }
    }
}

mod templates {
    pub const JAVASCRIPT: &str = r#"// Welcome to the workbench
function helloWorld() {
    console.log("Hello, World!");
    return "Welcome to coding!";
}

helloWorld();
"#;

    pub const PYTHON: &str = r#"# Welcome to the workbench
def hello_world():
    print("Hello, World!")
    return "Welcome to coding!"

hello_world()
"#;

    pub const JAVA: &str = r#"// Welcome to the workbench
public class HelloWorld {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;

    pub const CPP: &str = r#"// Welcome to the workbench
#include <iostream>
using namespace std;

int main() {
    cout << "Hello, World!" << endl;
    return 0;
}
"#;

    pub const HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Hello World</title>
</head>
<body>
    <h1>Hello, World!</h1>
    <p>Welcome to the workbench.</p>
</body>
</html>
"#;

    pub const CSS: &str = r#"/* Welcome to the workbench */
body {
    font-family: Arial, sans-serif;
    margin: 0;
    padding: 20px;
}

h1 {
    color: #333;
    text-align: center;
}
"#;

    pub const JSON: &str = r#"{
  "message": "Hello, World!",
  "language": "JSON",
  "features": ["validation", "pretty printing"]
}
"#;

    pub const SQL: &str = r"-- Welcome to the workbench
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name VARCHAR(100),
    email VARCHAR(100)
);

SELECT * FROM users WHERE id = 1;
";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("js".parse::<LanguageId>(), Ok(LanguageId::JavaScript));
        assert_eq!("Python".parse::<LanguageId>(), Ok(LanguageId::Python));
        assert_eq!("c++".parse::<LanguageId>(), Ok(LanguageId::Cpp));
        assert_eq!(" sql ".parse::<LanguageId>(), Ok(LanguageId::Sql));
    }

    #[test]
    fn test_parse_unknown() {
        let err = "cobol".parse::<LanguageId>().unwrap_err();
        assert_eq!(err, UnknownLanguage("cobol".into()));
        assert_eq!(err.to_string(), "unknown language 'cobol'");
    }

    #[test]
    fn test_round_trip_through_as_str() {
        for lang in LanguageId::ALL {
            assert_eq!(lang.as_str().parse::<LanguageId>(), Ok(lang));
            assert_eq!(LanguageId::from_extension(lang.extension()), Some(lang));
        }
    }

    #[test]
    fn test_from_extension() {
        assert_eq!(LanguageId::from_extension(".PY"), Some(LanguageId::Python));
        assert_eq!(LanguageId::from_extension("htm"), Some(LanguageId::Html));
        assert_eq!(LanguageId::from_extension("rs"), None);
    }

    #[test]
    fn test_templates_are_not_empty() {
        for lang in LanguageId::ALL {
            assert!(!lang.default_template().trim().is_empty(), "{lang}");
        }
        assert!(LanguageId::Cpp.default_template().contains("#include <iostream>"));
    }

    #[test]
    fn test_serde_uses_canonical_id() {
        let json = serde_json::to_string(&LanguageId::JavaScript).unwrap();
        assert_eq!(json, r#""javascript""#);
        let lang: LanguageId = serde_json::from_str(r#""cpp""#).unwrap();
        assert_eq!(lang, LanguageId::Cpp);
    }
}
