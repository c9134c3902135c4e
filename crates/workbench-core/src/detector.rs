//! Interactive-input detection.
//!
//! A lexical scan for the blocking-read primitives of each language. It is
//! a heuristic: a read hidden behind an alias goes unnoticed, and a
//! commented-out `input(` still counts.

use std::sync::LazyLock;

use regex::Regex;

use crate::language::LanguageId;

static JAVASCRIPT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:prompt|readline|input)\s*\("));

static PYTHON: LazyLock<Regex> = LazyLock::new(|| compile(r"\binput\s*\(|\bsys\.stdin\b"));

static JAVA: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(?:Scanner|nextInt|nextDouble|nextLine|next|nextLong|nextBoolean)\s*\(|\bSystem\.in\b|\bBufferedReader\b",
    )
});

static CPP: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:scanf|cin|getline|getchar)\b"));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("input pattern is a valid regex")
}

/// Returns `true` if `source` appears to read from standard input.
///
/// Pure and stateless. Languages without an input primitive always return
/// `false`.
pub fn needs_input(source: &str, language: LanguageId) -> bool {
    let pattern = match language {
        LanguageId::JavaScript => &*JAVASCRIPT,
        LanguageId::Python => &*PYTHON,
        LanguageId::Java => &*JAVA,
        LanguageId::Cpp => &*CPP,
        LanguageId::Html | LanguageId::Css | LanguageId::Json | LanguageId::Sql => return false,
    };
    pattern.is_match(source)
}
