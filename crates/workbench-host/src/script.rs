//! In-process JavaScript host.
//!
//! A single `boa_engine` context lives on a dedicated thread for the whole
//! process, the way a page keeps one global scope. Evaluations are sent over
//! a channel and run in arrival order. Each evaluation swaps the global
//! `console` (and, when stdin is supplied, `input`/`readline`/`prompt`) for
//! capturing versions and restores the previous bindings in a `finally`
//! block, so nothing leaks into the next call even when the script throws.
//!
//! User code shares the global scope and may replace any builtin. The bridge
//! captures the builtins it relies on when the context is created and builds
//! its JSON results from primitive strings only, so a script that overwrites
//! `JSON`, `Function` or a prototype cannot break the runs after it.

use std::cell::RefCell;
use std::sync::mpsc as std_mpsc;
use std::thread;

use async_trait::async_trait;
use boa_engine::{Context, JsResult, JsString, JsValue, NativeFunction, Source};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::logging::{ConsoleEntry, LoggingHost};
use workbench_common::EngineError;
use workbench_core::{InputProvider, LanguageId, ScriptHost, ScriptOutcome};

const THREAD_NAME: &str = "workbench-js";

/// Native hook the prelude captures and then removes from the global scope.
const PROMPT_HOOK: &str = "__workbenchPrompt";

/// Installed once when the context is created.
///
/// The default console buffers its calls; they are drained after every
/// evaluation and forwarded to `tracing`.
const PRELUDE: &str = r#"
(function () {
  const global = globalThis;
  const stringify = JSON.stringify;
  const apply = Reflect.apply;
  const hasOwn = Object.prototype.hasOwnProperty;
  const defineProperty = Object.defineProperty;
  const getOwnDescriptor = Object.getOwnPropertyDescriptor;
  const freeze = Object.freeze;
  const FunctionCtor = Function;
  const StringCtor = String;
  const ask = global.__workbenchPrompt;
  delete global.__workbenchPrompt;

  const append = (list, item) => {
    defineProperty(list, list.length, {
      __proto__: null, value: item, writable: true, enumerable: true, configurable: true,
    });
  };

  const text = (value) => {
    try { return StringCtor(value); } catch (_) { return '[unprintable]'; }
  };

  const show = (value) => {
    if (value !== null && typeof value === 'object') {
      try {
        const json = stringify(value, null, 2);
        if (typeof json === 'string') return json;
      } catch (_) {}
    }
    return text(value);
  };

  const format = (args) => {
    let out = '';
    for (let i = 0; i < args.length; i++) {
      if (i > 0) out += ' ';
      out += typeof args[i] === 'string' ? args[i] : show(args[i]);
    }
    return out;
  };

  const quote = (value) => (value === null ? 'null' : stringify(value));

  const describe = (e) => {
    try {
      if (e !== null && e !== undefined && e.message !== undefined) return StringCtor(e.message);
    } catch (_) {}
    return text(e);
  };

  // Descriptor copy with no prototype, so inherited `get`/`set` keys never
  // leak into `defineProperty`.
  const snapshot = (name) => {
    const found = getOwnDescriptor(global, name);
    if (found === undefined) return undefined;
    const copy = { __proto__: null, enumerable: found.enumerable, configurable: found.configurable };
    if (apply(hasOwn, found, ['value'])) {
      copy.value = found.value;
      copy.writable = found.writable;
    } else {
      copy.get = found.get;
      copy.set = found.set;
    }
    return copy;
  };

  const install = (name, value) => {
    try {
      defineProperty(global, name, {
        __proto__: null, value, writable: true, enumerable: true, configurable: true,
      });
    } catch (_) {}
  };

  const restore = (name, descriptor) => {
    try {
      if (descriptor === undefined) delete global[name];
      else defineProperty(global, name, descriptor);
    } catch (_) {}
  };

  const hostLog = [];
  const hostMethod = (method) => function (...args) {
    append(hostLog, { __proto__: null, method, message: format(args) });
  };
  const hostConsole = freeze({
    log: hostMethod('log'),
    info: hostMethod('info'),
    debug: hostMethod('debug'),
    warn: hostMethod('warn'),
    error: hostMethod('error'),
  });

  const drainHostLog = () => {
    let out = '[';
    for (let i = 0; i < hostLog.length; i++) {
      if (i > 0) out += ',';
      out += '{"method":' + quote(hostLog[i].method) + ',"message":' + quote(hostLog[i].message) + '}';
    }
    hostLog.length = 0;
    return out + ']';
  };

  const run = function (source, lines) {
    const logs = [];
    const names = lines === null ? ['console'] : ['console', 'input', 'readline', 'prompt'];
    const saved = [];
    for (let i = 0; i < names.length; i++) append(saved, snapshot(names[i]));

    const previous = saved[0] !== undefined && apply(hasOwn, saved[0], ['value']) ? saved[0].value : undefined;
    const capture = (stream, method) => function (...args) {
      append(logs, [stream, format(args)]);
      try {
        if (previous !== null && typeof previous === 'object') {
          const forward = previous[method];
          if (typeof forward === 'function') apply(forward, previous, args);
        }
      } catch (_) {}
    };

    let error = null;
    let value = null;
    try {
      install('console', {
        log: capture('stdout', 'log'),
        info: capture('stdout', 'info'),
        debug: capture('stdout', 'debug'),
        warn: capture('warn', 'warn'),
        error: capture('stderr', 'error'),
      });

      if (lines !== null) {
        let cursor = 0;
        const next = function (promptText) {
          if (cursor < lines.length) return lines[cursor++];
          return ask(promptText);
        };
        install('input', next);
        install('readline', () => next(''));
        install('prompt', next);
      }

      const result = new FunctionCtor(source)();
      if (result !== undefined) value = show(result);
    } catch (e) {
      error = describe(e);
    } finally {
      for (let i = 0; i < names.length; i++) restore(names[i], saved[i]);
    }

    let encoded = '[';
    for (let i = 0; i < logs.length; i++) {
      if (i > 0) encoded += ',';
      encoded += '[' + quote(logs[i][0]) + ',' + quote(logs[i][1]) + ']';
    }
    return '{"logs":' + encoded + '],"error":' + quote(error) + ',"value":' + quote(value) + '}';
  };

  defineProperty(global, '__workbenchHostConsole', { __proto__: null, value: hostConsole });
  defineProperty(global, '__workbenchDrainHostLog', { __proto__: null, value: drainHostLog });
  defineProperty(global, '__workbenchRun', { __proto__: null, value: run });
  global.console = hostConsole;
})();
"#;

/// A script read that ran past the supplied stdin.
struct PromptRequest {
    text: String,
    reply: std_mpsc::Sender<Option<String>>,
}

thread_local! {
    /// Where the running evaluation sends its prompts, if anywhere.
    static PROMPTS: RefCell<Option<mpsc::UnboundedSender<PromptRequest>>> =
        const { RefCell::new(None) };
}

enum Command {
    Evaluate {
        source: String,
        stdin: Option<String>,
        prompts: Option<mpsc::UnboundedSender<PromptRequest>>,
        reply: oneshot::Sender<Result<ScriptOutcome, EngineError>>,
    },
    Inspect {
        expression: String,
        reply: oneshot::Sender<Result<String, EngineError>>,
    },
}

/// Handle to the JavaScript host thread.
///
/// Cloning the handle shares the same context. The thread exits once every
/// handle is dropped.
#[derive(Clone)]
pub struct JsHost {
    commands: mpsc::UnboundedSender<Command>,
}

impl JsHost {
    /// Spawn the host thread and install the prelude.
    pub fn start() -> Result<Self, EngineError> {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::channel();

        thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || host_thread(receiver, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                debug!("JavaScript host started");
                Ok(Self { commands })
            }
            Ok(Err(reason)) => Err(EngineError::script_host_unavailable(reason)),
            Err(_) => Err(EngineError::script_host_unavailable(
                "host thread exited during startup",
            )),
        }
    }

    /// Evaluate a global expression and return its string form.
    ///
    /// Runs in the same context as user scripts, without any redirection.
    pub async fn inspect(&self, expression: &str) -> Result<String, EngineError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Inspect {
            expression: expression.to_string(),
            reply,
        })?;
        response.await.map_err(|_| stopped())?
    }

    fn send(&self, command: Command) -> Result<(), EngineError> {
        self.commands.send(command).map_err(|_| stopped())
    }
}

#[async_trait]
impl ScriptHost for JsHost {
    async fn evaluate(
        &self,
        source: &str,
        stdin: Option<&str>,
        prompt: Option<&dyn InputProvider>,
    ) -> Result<ScriptOutcome, EngineError> {
        let (reply, mut response) = oneshot::channel();
        let (prompts, mut requests) = mpsc::unbounded_channel();
        self.send(Command::Evaluate {
            source: source.to_string(),
            stdin: stdin.map(str::to_string),
            prompts: prompt.is_some().then_some(prompts),
            reply,
        })?;

        // The host thread blocks on each prompt until it gets an answer.
        loop {
            tokio::select! {
                outcome = &mut response => return outcome.map_err(|_| stopped())?,
                Some(request) = requests.recv() => {
                    debug!(prompt = %request.text, "Script is waiting for input");
                    let answer = match prompt {
                        Some(provider) => provider.request_input(LanguageId::JavaScript).await,
                        None => None,
                    };
                    let _ = request.reply.send(answer);
                }
            }
        }
    }
}

impl std::fmt::Debug for JsHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsHost")
            .field("running", &!self.commands.is_closed())
            .finish()
    }
}

fn stopped() -> EngineError {
    EngineError::script_host_unavailable("JavaScript host thread has stopped")
}

fn host_thread(
    mut receiver: mpsc::UnboundedReceiver<Command>,
    ready: std_mpsc::Sender<Result<(), String>>,
) {
    let mut context = Context::default();
    let installed = context
        .register_global_callable(
            JsString::from(PROMPT_HOOK),
            1,
            NativeFunction::from_fn_ptr(host_prompt),
        )
        .and_then(|()| context.eval(Source::from_bytes(PRELUDE)));
    if let Err(e) = installed {
        error!(error = %e, "JavaScript prelude failed");
        let _ = ready.send(Err(format!("prelude failed: {e}")));
        return;
    }
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Some(command) = receiver.blocking_recv() {
        match command {
            Command::Evaluate {
                source,
                stdin,
                prompts,
                reply,
            } => {
                PROMPTS.set(prompts);
                let outcome = evaluate(&mut context, &source, stdin.as_deref());
                PROMPTS.set(None);
                drain_host_log(&mut context);
                let _ = reply.send(outcome);
            }
            Command::Inspect { expression, reply } => {
                let value = context
                    .eval(Source::from_bytes(&expression))
                    .map(|v| display(&v))
                    .map_err(|e| EngineError::script_host_unavailable(e.to_string()));
                let _ = reply.send(value);
            }
        }
    }
    debug!("JavaScript host stopped");
}

/// Answers a read past the supplied stdin with the first line the prompt
/// returns, or an empty string.
fn host_prompt(_this: &JsValue, args: &[JsValue], context: &mut Context) -> JsResult<JsValue> {
    let text = match args.first() {
        Some(value) if !value.is_undefined() => value.to_string(context)?.to_std_string_escaped(),
        _ => String::new(),
    };

    let answer = PROMPTS.with_borrow(|prompts| {
        let prompts = prompts.as_ref()?;
        let (reply, answer) = std_mpsc::channel();
        prompts.send(PromptRequest { text, reply }).ok()?;
        answer.recv().ok().flatten()
    });

    let line = answer
        .as_deref()
        .and_then(|answer| answer.lines().next())
        .unwrap_or_default();
    Ok(JsValue::from(JsString::from(line)))
}

fn evaluate(
    context: &mut Context,
    source: &str,
    stdin: Option<&str>,
) -> Result<ScriptOutcome, EngineError> {
    let lines: Option<Vec<&str>> = stdin.map(|stdin| stdin.lines().collect());
    let call = format!(
        "__workbenchRun({}, {})",
        encode(&source)?,
        encode(&lines)?
    );

    let value = context
        .eval(Source::from_bytes(&call))
        .map_err(|e| EngineError::script_host_unavailable(format!("evaluation bridge failed: {e}")))?;
    context.run_jobs();

    let json = value
        .as_string()
        .map(|s| s.to_std_string_escaped())
        .ok_or_else(|| EngineError::script_host_unavailable("evaluation bridge returned no result"))?;

    serde_json::from_str(&json).map_err(|e| {
        EngineError::script_host_unavailable(format!("malformed evaluation result: {e}"))
    })
}

fn drain_host_log(context: &mut Context) {
    let drained = match context.eval(Source::from_bytes("__workbenchDrainHostLog()")) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Could not drain host console");
            return;
        }
    };
    let Some(json) = drained.as_string().map(|s| s.to_std_string_escaped()) else {
        return;
    };
    match serde_json::from_str::<Vec<ConsoleEntry>>(&json) {
        Ok(entries) => {
            LoggingHost::forward(THREAD_NAME, entries);
        }
        Err(e) => warn!(error = %e, "Malformed host console entries"),
    }
}

/// JSON text is a valid JavaScript literal.
fn encode<T: serde::Serialize>(value: &T) -> Result<String, EngineError> {
    serde_json::to_string(value)
        .map_err(|e| EngineError::script_host_unavailable(format!("cannot encode argument: {e}")))
}

fn display(value: &JsValue) -> String {
    match value.as_string() {
        Some(s) => s.to_std_string_escaped(),
        None => value.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use workbench_core::Stream;

    struct TypedInput {
        answer: Option<&'static str>,
        asked: AtomicUsize,
    }

    impl TypedInput {
        fn new(answer: Option<&'static str>) -> Self {
            Self {
                answer,
                asked: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InputProvider for TypedInput {
        async fn request_input(&self, language: LanguageId) -> Option<String> {
            assert_eq!(language, LanguageId::JavaScript);
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer.map(str::to_string)
        }
    }

    #[tokio::test]
    async fn test_console_is_captured_in_order() {
        let host = JsHost::start().unwrap();
        let outcome = host
            .evaluate("console.log('a', 1); console.warn('b'); console.error('c');", None, None)
            .await
            .unwrap();

        assert_eq!(
            outcome.logs,
            vec![
                (Stream::Stdout, "a 1".to_string()),
                (Stream::Warn, "b".to_string()),
                (Stream::Stderr, "c".to_string()),
            ]
        );
        assert!(outcome.error.is_none());
        assert!(outcome.value.is_none());
    }

    #[tokio::test]
    async fn test_return_values() {
        let host = JsHost::start().unwrap();

        let outcome = host.evaluate("return 6 * 7;", None, None).await.unwrap();
        assert_eq!(outcome.value.as_deref(), Some("42"));

        let outcome = host.evaluate("return { a: 1 };", None, None).await.unwrap();
        assert_eq!(outcome.value.as_deref(), Some("{\n  \"a\": 1\n}"));

        let outcome = host.evaluate("return null;", None, None).await.unwrap();
        assert_eq!(outcome.value.as_deref(), Some("null"));
    }

    #[tokio::test]
    async fn test_thrown_error_keeps_earlier_logs() {
        let host = JsHost::start().unwrap();
        let outcome = host
            .evaluate("console.log('before'); throw new Error('boom');", None, None)
            .await
            .unwrap();

        assert_eq!(outcome.error.as_deref(), Some("boom"));
        assert_eq!(outcome.logs, vec![(Stream::Stdout, "before".to_string())]);
    }

    #[tokio::test]
    async fn test_syntax_error_is_catchable() {
        let host = JsHost::start().unwrap();
        let outcome = host.evaluate("let = ;", None, None).await.unwrap();

        assert!(outcome.error.is_some());
    }

    #[tokio::test]
    async fn test_console_restored_after_throw() {
        let host = JsHost::start().unwrap();
        host.evaluate("throw new Error('x');", None, None).await.unwrap();

        let restored = host
            .inspect("String(globalThis.console === globalThis.__workbenchHostConsole)")
            .await
            .unwrap();
        assert_eq!(restored, "true");
    }

    #[tokio::test]
    async fn test_stdin_lines_feed_input() {
        let host = JsHost::start().unwrap();
        let outcome = host
            .evaluate(
                "const a = input('a?'); const b = readline(); console.log(a + '|' + b + '|' + input());",
                Some("first\nsecond\n"),
                None,
            )
            .await
            .unwrap();

        assert_eq!(outcome.logs, vec![(Stream::Stdout, "first|second|".to_string())]);

        let leaked = host.inspect("typeof input").await.unwrap();
        assert_eq!(leaked, "undefined");
    }

    #[tokio::test]
    async fn test_globals_persist_between_runs() {
        let host = JsHost::start().unwrap();
        host.evaluate("globalThis.counter = 1;", None, None).await.unwrap();
        let outcome = host.evaluate("return ++globalThis.counter;", None, None).await.unwrap();

        assert_eq!(outcome.value.as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_objects_are_logged_indented() {
        let host = JsHost::start().unwrap();
        let outcome = host
            .evaluate("console.log('obj', { a: 1, b: [2] });", None, None)
            .await
            .unwrap();

        assert_eq!(
            outcome.logs,
            vec![(
                Stream::Stdout,
                "obj {\n  \"a\": 1,\n  \"b\": [\n    2\n  ]\n}".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_overwritten_builtins_do_not_break_later_runs() {
        let host = JsHost::start().unwrap();
        let outcome = host
            .evaluate(
                "JSON.stringify = () => 1; Function = null; String = null; \
                 Reflect.apply = null; Object.defineProperty = null; \
                 Array.prototype.map = null; Object.prototype.hasOwnProperty = null; \
                 Object.prototype.get = function () {}; console.log('replaced');",
                None,
                None,
            )
            .await
            .unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.logs, vec![(Stream::Stdout, "replaced".to_string())]);

        let outcome = host
            .evaluate("console.log('hello', { n: 1 });", Some("x"), None)
            .await
            .unwrap();
        assert_eq!(
            outcome.logs,
            vec![(Stream::Stdout, "hello {\n  \"n\": 1\n}".to_string())]
        );
        assert_eq!(host.inspect("typeof input").await.unwrap(), "undefined");
    }

    #[tokio::test]
    async fn test_reads_past_stdin_ask_the_prompt() {
        let host = JsHost::start().unwrap();
        let typed = TypedInput::new(Some("typed\nignored\n"));
        let outcome = host
            .evaluate(
                "console.log(input('a?') + '|' + input('b?'));",
                Some("only\n"),
                Some(&typed),
            )
            .await
            .unwrap();

        assert_eq!(outcome.logs, vec![(Stream::Stdout, "only|typed".to_string())]);
        assert_eq!(typed.asked.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_declined_prompt_reads_empty() {
        let host = JsHost::start().unwrap();
        let declined = TypedInput::new(None);
        let outcome = host
            .evaluate(
                "console.log('[' + input() + '][' + input() + ']');",
                Some("only"),
                Some(&declined),
            )
            .await
            .unwrap();

        assert_eq!(outcome.logs, vec![(Stream::Stdout, "[only][]".to_string())]);
        assert_eq!(declined.asked.load(Ordering::SeqCst), 1);
    }
}
