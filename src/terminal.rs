//! Interactive terminal.
//!
//! A line-oriented shell over the execution engine. Commands:
//! `help`, `clear`, `run <file>`, `js <code>`, `py <code>`, `echo <text>`,
//! `date`, `ls`, `exit`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::debug;

use workbench_core::{ExecutionEngine, InputProvider, LanguageId, Strategy};

const HELP: &str = "Available commands:
  help          - Show this help message
  clear         - Clear terminal
  run <file>    - Execute a source file (language from its extension)
  js <code>     - Execute JavaScript code
  py <code>     - Execute Python code
  echo <text>   - Echo text
  date          - Show current date and time
  ls            - List supported languages
  exit          - Leave the terminal";

/// Line source shared by the prompt loop and the input provider.
pub type SharedLines = Arc<Mutex<Lines<BufReader<Stdin>>>>;

pub fn stdin_lines() -> SharedLines {
    Arc::new(Mutex::new(BufReader::new(tokio::io::stdin()).lines()))
}

/// One parsed terminal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Help,
    Clear,
    Run(String),
    Js(String),
    Py(String),
    Echo(String),
    Date,
    Ls,
    Exit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match name.to_ascii_lowercase().as_str() {
            "" => Command::Empty,
            "help" => Command::Help,
            "clear" => Command::Clear,
            "run" => Command::Run(rest.to_string()),
            "js" => Command::Js(rest.to_string()),
            "py" => Command::Py(rest.to_string()),
            "echo" => Command::Echo(rest.to_string()),
            "date" => Command::Date,
            "ls" => Command::Ls,
            "exit" | "quit" => Command::Exit,
            other => Command::Unknown(other.to_string()),
        }
    }
}

/// What the prompt loop should do after a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Print(String),
    Clear,
    Exit,
    Nothing,
}

/// Command interpreter. Holds no terminal I/O of its own.
pub struct Terminal {
    engine: Arc<ExecutionEngine>,
    history: Vec<String>,
}

impl Terminal {
    pub fn new(engine: Arc<ExecutionEngine>) -> Self {
        Self {
            engine,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub async fn execute(&mut self, line: &str) -> Reply {
        let command = Command::parse(line);
        if command != Command::Empty {
            self.history.push(line.trim().to_string());
        }
        debug!(?command, "Terminal command");

        match command {
            Command::Empty => Reply::Nothing,
            Command::Help => Reply::Print(HELP.to_string()),
            Command::Clear => Reply::Clear,
            Command::Exit => Reply::Exit,
            Command::Echo(text) => Reply::Print(text),
            Command::Date => Reply::Print(
                chrono::Local::now()
                    .format("%a %b %d %Y %H:%M:%S %z")
                    .to_string(),
            ),
            Command::Ls => Reply::Print(self.list_languages()),
            Command::Js(code) if code.is_empty() => {
                Reply::Print("Usage: js <javascript_code>".to_string())
            }
            Command::Py(code) if code.is_empty() => {
                Reply::Print("Usage: py <python_code>".to_string())
            }
            Command::Run(path) if path.is_empty() => Reply::Print("Usage: run <file>".to_string()),
            Command::Js(code) => self.run_source(&code, LanguageId::JavaScript).await,
            Command::Py(code) => self.run_source(&code, LanguageId::Python).await,
            Command::Run(path) => self.run_file(Path::new(&path)).await,
            Command::Unknown(name) => Reply::Print(format!(
                "Command not found: {name}. Type 'help' for available commands."
            )),
        }
    }

    async fn run_source(&self, source: &str, language: LanguageId) -> Reply {
        let report = self.engine.run(source, language.as_str(), None).await;
        Reply::Print(report.render())
    }

    async fn run_file(&self, path: &Path) -> Reply {
        let Some(language) = language_for_path(path) else {
            return Reply::Print(format!("Cannot detect language for '{}'", path.display()));
        };
        match tokio::fs::read_to_string(path).await {
            Ok(source) => self.run_source(&source, language).await,
            Err(e) => Reply::Print(format!("Cannot read '{}': {e}", path.display())),
        }
    }

    fn list_languages(&self) -> String {
        let mut out = String::from("Supported languages:");
        for &language in self.engine.supported_languages() {
            out.push_str(&format!(
                "\n  {:<11} .{:<5} {}",
                language.display_name(),
                language.extension(),
                Strategy::for_language(language).as_str()
            ));
        }
        out
    }
}

/// Language implied by a file extension.
pub fn language_for_path(path: &Path) -> Option<LanguageId> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(LanguageId::from_extension)
}

/// Asks for program input on the terminal.
///
/// Lines are collected until an empty line. `.cancel` (or end of input
/// before any line) declines, and the program runs without stdin.
pub struct TerminalInput {
    lines: SharedLines,
}

impl TerminalInput {
    pub fn new(lines: SharedLines) -> Self {
        Self { lines }
    }
}

#[async_trait]
impl InputProvider for TerminalInput {
    async fn request_input(&self, language: LanguageId) -> Option<String> {
        let mut out = tokio::io::stderr();
        let banner = format!(
            "This {} program reads input. Enter lines, finish with an empty line ('.cancel' to skip):\n",
            language.display_name()
        );
        let _ = out.write_all(banner.as_bytes()).await;
        let _ = out.flush().await;

        let mut lines = self.lines.lock().await;
        let mut collected: Vec<String> = Vec::new();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim() == ".cancel" => return None,
                Ok(Some(line)) if line.is_empty() => break,
                Ok(Some(line)) => collected.push(line),
                Ok(None) | Err(_) => {
                    if collected.is_empty() {
                        return None;
                    }
                    break;
                }
            }
        }

        let mut input = collected.join("\n");
        input.push('\n');
        Some(input)
    }
}

/// Run the prompt loop until `exit` or end of input.
pub async fn run_loop(engine: Arc<ExecutionEngine>, lines: SharedLines) -> std::io::Result<()> {
    let mut terminal = Terminal::new(engine);
    let mut out = tokio::io::stdout();

    out.write_all(b"Workbench terminal. Type 'help' for available commands.\n")
        .await?;
    loop {
        out.write_all(b"$ ").await?;
        out.flush().await?;

        let line = {
            let mut lines = lines.lock().await;
            lines.next_line().await?
        };
        let Some(line) = line else {
            break;
        };

        match terminal.execute(&line).await {
            Reply::Print(text) => {
                out.write_all(text.as_bytes()).await?;
                out.write_all(b"\n").await?;
            }
            Reply::Clear => out.write_all(b"\x1b[2J\x1b[H").await?,
            Reply::Exit => break,
            Reply::Nothing => {}
        }
    }
    out.flush().await
}
