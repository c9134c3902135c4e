//! Heuristic static checks for compiled languages.
//!
//! These checks are pattern matches, not a parser. An empty issue list
//! means only that no checked pattern failed; the source still *appears*
//! valid at best. Bracket balance is a raw character count, so brackets
//! inside string literals and comments are counted too.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::language::LanguageId;

/// Category of a heuristic finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueKind {
    MissingEntryPoint,
    MissingDeclaration,
    UnbalancedBraces,
    UnbalancedParens,
    MissingInclude,
    MissingSemicolon,
}

/// One heuristic finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeuristicIssue {
    pub kind: IssueKind,
    pub detail: String,
}

impl HeuristicIssue {
    pub fn new(kind: IssueKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for HeuristicIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}

/// A standard-library name that needs a header or import to be in scope.
struct Prerequisite {
    names: &'static [&'static str],
    /// Any one of these satisfies the prerequisite.
    provided_by: &'static [&'static str],
    label: &'static str,
}

const CPP_PREREQUISITES: &[Prerequisite] = &[
    Prerequisite {
        names: &["cout", "cin", "cerr", "clog", "endl"],
        provided_by: &["iostream"],
        label: "#include <iostream>",
    },
    Prerequisite {
        names: &["printf", "scanf", "puts", "getchar"],
        provided_by: &["cstdio", "stdio.h"],
        label: "#include <cstdio>",
    },
    Prerequisite {
        names: &["vector"],
        provided_by: &["vector"],
        label: "#include <vector>",
    },
];

const JAVA_UTIL: &[&str] = &[
    "Scanner",
    "ArrayList",
    "HashMap",
    "HashSet",
    "LinkedList",
    "Arrays",
    "Collections",
];

static JAVA_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:class|interface|enum|record)\s+[A-Za-z_]\w*"));

static JAVA_MAIN: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:public\s+static|static\s+public)\s+void\s+main\s*\(")
});

static JAVA_STATEMENT_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:System|int|long|double|float|char|boolean|String)\b"));

static JAVA_CONTROL_START: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"^(?:if|else|for|while|do|switch|case|default|try|catch|finally|@)\b")
});

static CPP_MAIN: LazyLock<Regex> = LazyLock::new(|| compile(r"\bmain\s*\("));

static CPP_INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"#\s*include\s*[<"]([^>"]+)[>"]"#));

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("validator pattern is a valid regex")
}

/// Run the language's check battery.
///
/// Languages without a heuristic battery always yield an empty list.
pub fn validate(source: &str, language: LanguageId) -> Vec<HeuristicIssue> {
    match language {
        LanguageId::Java => validate_java(source),
        LanguageId::Cpp => validate_cpp(source),
        _ => Vec::new(),
    }
}

/// Summary lines shown when validation passes.
pub fn summary(source: &str, language: LanguageId) -> Vec<String> {
    let (open, _) = count_pair(source, '{', '}');
    let mut lines = vec!["Syntax validation passed".to_string()];
    match language {
        LanguageId::Cpp => lines.push(format!(
            "Found {} include directives",
            CPP_INCLUDE.find_iter(source).count()
        )),
        _ => lines.push(format!("Found {} lines of code", source.lines().count())),
    }
    lines.push(format!("Brace balance: {open} pairs"));
    lines
}

fn validate_java(source: &str) -> Vec<HeuristicIssue> {
    let mut issues = Vec::new();

    if !JAVA_DECLARATION.is_match(source) {
        issues.push(HeuristicIssue::new(
            IssueKind::MissingDeclaration,
            "Missing class or interface declaration",
        ));
    }

    if !JAVA_MAIN.is_match(source) {
        issues.push(HeuristicIssue::new(
            IssueKind::MissingEntryPoint,
            "Missing main method (public static void main)",
        ));
    }

    check_balance(source, &mut issues);

    for name in JAVA_UTIL {
        if uses_word(source, name) && !java_imports(source, name) {
            issues.push(HeuristicIssue::new(
                IssueKind::MissingInclude,
                format!("Using {name} but missing import java.util.{name}"),
            ));
        }
    }

    check_semicolons(source, &mut issues);

    issues
}

fn validate_cpp(source: &str) -> Vec<HeuristicIssue> {
    let mut issues = Vec::new();

    if !CPP_MAIN.is_match(source) {
        issues.push(HeuristicIssue::new(
            IssueKind::MissingEntryPoint,
            "Missing main function",
        ));
    }

    let headers: Vec<&str> = CPP_INCLUDE
        .captures_iter(source)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim())
        .collect();

    if headers.is_empty() {
        issues.push(HeuristicIssue::new(
            IssueKind::MissingInclude,
            "Missing #include directives",
        ));
    }

    check_balance(source, &mut issues);

    let everything = headers.contains(&"bits/stdc++.h");
    for prerequisite in CPP_PREREQUISITES {
        let used: Vec<&str> = prerequisite
            .names
            .iter()
            .copied()
            .filter(|name| uses_word(source, name))
            .collect();
        if used.is_empty() || everything {
            continue;
        }
        if !prerequisite.provided_by.iter().any(|h| headers.contains(h)) {
            issues.push(HeuristicIssue::new(
                IssueKind::MissingInclude,
                format!("Using {} but missing {}", used.join("/"), prerequisite.label),
            ));
        }
    }

    issues
}

fn check_balance(source: &str, issues: &mut Vec<HeuristicIssue>) {
    let (open, close) = count_pair(source, '{', '}');
    if open != close {
        issues.push(HeuristicIssue::new(
            IssueKind::UnbalancedBraces,
            format!("Unbalanced braces: {open} open, {close} close"),
        ));
    }

    let (open, close) = count_pair(source, '(', ')');
    if open != close {
        issues.push(HeuristicIssue::new(
            IssueKind::UnbalancedParens,
            format!("Unbalanced parentheses: {open} open, {close} close"),
        ));
    }
}

/// Flags declaration and `System` lines with no statement terminator.
fn check_semicolons(source: &str, issues: &mut Vec<HeuristicIssue>) {
    let lines: Vec<&str> = source.lines().collect();
    let mut in_block_comment = false;

    for (index, line) in lines.iter().enumerate() {
        let trimmed = line.trim();

        if in_block_comment {
            if trimmed.contains("*/") {
                in_block_comment = false;
            }
            continue;
        }
        if trimmed.starts_with("/*") {
            in_block_comment = !trimmed.contains("*/");
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('*') {
            continue;
        }
        if JAVA_CONTROL_START.is_match(trimmed) || !JAVA_STATEMENT_TOKEN.is_match(trimmed) {
            continue;
        }

        let code = trimmed
            .split_once("//")
            .map_or(trimmed, |(before, _)| before)
            .trim_end();
        let terminated = [';', '{', '}', ':', ',', '(', '+', '=', '&', '|']
            .iter()
            .any(|c| code.ends_with(*c));
        if terminated {
            continue;
        }

        let continues_on_next_line = lines[index + 1..]
            .iter()
            .map(|l| l.trim())
            .find(|l| !l.is_empty())
            .is_some_and(|next| {
                ['{', '.', '+', '-', '?', ':', ')', '&', '|']
                    .iter()
                    .any(|c| next.starts_with(*c))
            });
        if continues_on_next_line {
            continue;
        }

        issues.push(HeuristicIssue::new(
            IssueKind::MissingSemicolon,
            format!("Missing semicolon at line {}: {trimmed}", index + 1),
        ));
    }
}

fn count_pair(source: &str, open: char, close: char) -> (usize, usize) {
    source.chars().fold((0, 0), |(o, c), ch| {
        if ch == open {
            (o + 1, c)
        } else if ch == close {
            (o, c + 1)
        } else {
            (o, c)
        }
    })
}

fn uses_word(source: &str, word: &str) -> bool {
    source.match_indices(word).any(|(at, _)| {
        let before = source[..at].chars().next_back();
        let after = source[at + word.len()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn java_imports(source: &str, name: &str) -> bool {
    source.contains(&format!("java.util.{name}")) || source.contains("java.util.*")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_JAVA: &str = r#"
public class HelloWorld {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;

    const HELLO_CPP: &str = r#"
#include <iostream>
using namespace std;

int main() {
    cout << "Hello" << endl;
    return 0;
}
"#;

    fn kinds(issues: &[HeuristicIssue]) -> Vec<IssueKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_valid_java_has_no_issues() {
        assert!(validate(HELLO_JAVA, LanguageId::Java).is_empty());
    }

    #[test]
    fn test_valid_cpp_has_no_issues() {
        assert!(validate(HELLO_CPP, LanguageId::Cpp).is_empty());
    }

    #[test]
    fn test_brace_count_cites_both_counts() {
        let issues = validate("{ { }", LanguageId::Cpp);
        let brace = issues
            .iter()
            .find(|i| i.kind == IssueKind::UnbalancedBraces)
            .unwrap();
        assert_eq!(brace.detail, "Unbalanced braces: 2 open, 1 close");
    }

    #[test]
    fn test_brace_count_ignores_nesting_order() {
        // Equal counts, wrong order: still no brace issue.
        let src = "#include <cstdio>\nint main() } { return 0; }{";
        let issues = validate(src, LanguageId::Cpp);
        assert!(!kinds(&issues).contains(&IssueKind::UnbalancedBraces));
    }

    #[test]
    fn test_brace_count_property() {
        for (open, close) in [(0, 1), (3, 2), (5, 5), (1, 1), (4, 0)] {
            let src = format!("{}{}", "{".repeat(open), "}".repeat(close));
            for lang in [LanguageId::Java, LanguageId::Cpp] {
                let issues = validate(&src, lang);
                let has = kinds(&issues).contains(&IssueKind::UnbalancedBraces);
                assert_eq!(has, open != close, "{lang} {open}/{close}");
                if has {
                    let text = format!("Unbalanced braces: {open} open, {close} close");
                    assert!(issues.iter().any(|i| i.detail == text));
                }
            }
        }
    }

    #[test]
    fn test_java_missing_main_and_class() {
        let issues = validate("int x = 1;", LanguageId::Java);
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::MissingDeclaration, IssueKind::MissingEntryPoint]
        );
    }

    #[test]
    fn test_java_missing_semicolon() {
        let src = r#"
public class Main {
    public static void main(String[] args) {
        int x = 5
        System.out.println(x);
    }
}
"#;
        let issues = validate(src, LanguageId::Java);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::MissingSemicolon);
        assert_eq!(issues[0].detail, "Missing semicolon at line 4: int x = 5");
    }

    #[test]
    fn test_java_allman_braces_not_flagged() {
        let src = r#"
public class Main
{
    public static void main(String[] args)
    {
        String greeting = "hi";
        System.out
            .println(greeting);
    }
}
"#;
        assert!(validate(src, LanguageId::Java).is_empty());
    }

    #[test]
    fn test_java_scanner_needs_import() {
        let src = r#"
public class Main {
    public static void main(String[] args) {
        Scanner sc = new Scanner(System.in);
    }
}
"#;
        let issues = validate(src, LanguageId::Java);
        assert_eq!(kinds(&issues), vec![IssueKind::MissingInclude]);
        assert!(issues[0].detail.contains("java.util.Scanner"));

        let imported = format!("import java.util.*;\n{src}");
        assert!(validate(&imported, LanguageId::Java).is_empty());
    }

    #[test]
    fn test_cpp_missing_iostream() {
        let src = "#include <string>\nint main() { cout << 1; cin >> x; return 0; }";
        let issues = validate(src, LanguageId::Cpp);
        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].detail,
            "Using cout/cin but missing #include <iostream>"
        );
    }

    #[test]
    fn test_cpp_bits_header_satisfies_everything() {
        let src = "#include <bits/stdc++.h>\nint main() { vector<int> v; printf(\"x\"); cout << 1; }";
        assert!(validate(src, LanguageId::Cpp).is_empty());
    }

    #[test]
    fn test_cpp_no_includes_no_main() {
        let issues = validate("void f() {}", LanguageId::Cpp);
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::MissingEntryPoint, IssueKind::MissingInclude]
        );
    }

    #[test]
    fn test_cpp_unbalanced_parens() {
        let src = "#include <cstdio>\nint main() { printf(\"x\"; return 0; }";
        let issues = validate(src, LanguageId::Cpp);
        assert_eq!(kinds(&issues), vec![IssueKind::UnbalancedParens]);
        assert_eq!(issues[0].detail, "Unbalanced parentheses: 2 open, 1 close");
    }

    #[test]
    fn test_other_languages_have_no_battery() {
        assert!(validate("{{{", LanguageId::Python).is_empty());
        assert!(validate("{{{", LanguageId::Json).is_empty());
    }

    #[test]
    fn test_summary_lines() {
        let lines = summary(HELLO_CPP, LanguageId::Cpp);
        assert_eq!(
            lines,
            vec![
                "Syntax validation passed".to_string(),
                "Found 1 include directives".to_string(),
                "Brace balance: 1 pairs".to_string(),
            ]
        );
    }
}
