//! Query-language classification.
//!
//! SQL is never executed. Each statement is classified by its leading
//! keyword and checked for a small set of structural co-requirements.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Operation named by a statement's leading keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlOperation {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Drop,
    Unknown,
}

impl SqlOperation {
    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_uppercase().as_str() {
            "SELECT" | "WITH" => SqlOperation::Select,
            "INSERT" => SqlOperation::Insert,
            "UPDATE" => SqlOperation::Update,
            "DELETE" => SqlOperation::Delete,
            "CREATE" => SqlOperation::Create,
            "DROP" => SqlOperation::Drop,
            _ => SqlOperation::Unknown,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            SqlOperation::Select => "SELECT - Query data",
            SqlOperation::Insert => "INSERT - Add data",
            SqlOperation::Update => "UPDATE - Modify data",
            SqlOperation::Delete => "DELETE - Remove data",
            SqlOperation::Create => "CREATE - Create table/database",
            SqlOperation::Drop => "DROP - Delete table/database",
            SqlOperation::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SqlOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Result of classifying a SQL script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlAnalysis {
    /// One entry per non-empty statement, in source order.
    pub operations: Vec<SqlOperation>,
    pub issues: Vec<String>,
}

impl SqlAnalysis {
    /// Operations with duplicates removed, first occurrence wins.
    pub fn distinct_operations(&self) -> Vec<SqlOperation> {
        let mut seen = Vec::new();
        for op in &self.operations {
            if !seen.contains(op) {
                seen.push(*op);
            }
        }
        if seen.is_empty() {
            seen.push(SqlOperation::Unknown);
        }
        seen
    }
}

/// Classify every statement of `source`.
pub fn analyze(source: &str) -> SqlAnalysis {
    let statements = split_statements(&strip_comments(source));
    let multiple = statements.len() > 1;

    let mut operations = Vec::with_capacity(statements.len());
    let mut issues = Vec::new();

    for (index, statement) in statements.iter().enumerate() {
        let keyword = statement.split_whitespace().next().unwrap_or_default();
        let keyword = keyword.trim_end_matches('(');
        let operation = SqlOperation::from_keyword(keyword);

        if operation == SqlOperation::Select && !has_word(statement, "FROM") {
            if multiple {
                issues.push(format!(
                    "SELECT statement missing FROM clause (statement {})",
                    index + 1
                ));
            } else {
                issues.push("SELECT statement missing FROM clause".to_string());
            }
        }
        operations.push(operation);
    }

    if operations.iter().all(|op| *op == SqlOperation::Unknown) {
        issues.insert(0, "No valid SQL command detected".to_string());
    }

    SqlAnalysis { operations, issues }
}

/// Remove `--` and `/* */` comments outside single-quoted literals.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if in_literal {
            out.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }
        match (c, chars.peek().copied()) {
            ('\'', _) => {
                in_literal = true;
                out.push(c);
            }
            ('-', Some('-')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for skipped in chars.by_ref() {
                    if prev == '*' && skipped == '/' {
                        break;
                    }
                    prev = skipped;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Split on `;` outside single-quoted literals, dropping blank statements.
fn split_statements(source: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_literal = false;

    for c in source.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                current.push(c);
            }
            ';' if !in_literal => statements.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    statements.push(current);

    statements
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn has_word(statement: &str, word: &str) -> bool {
    statement
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|token| token.eq_ignore_ascii_case(word))
}
