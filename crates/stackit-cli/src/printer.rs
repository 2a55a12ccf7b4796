//! Output channels: results, diagnostics and confirmation prompts.
//!
//! Results go to the output stream and are shaped by the output format.
//! Diagnostics and prompts go to the error stream, filtered by verbosity.

use std::fmt::{self, Write as _};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::{CliError, Result};
use crate::globals::{GlobalFlags, OutputFormat, Verbosity};

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;
type SharedReader = Arc<Mutex<Box<dyn BufRead + Send>>>;

/// The three process streams, shareable across tasks.
///
/// Every write takes the stream's lock, so lines never interleave.
#[derive(Clone)]
pub struct Streams {
    out: SharedWriter,
    err: SharedWriter,
    input: SharedReader,
    err_is_terminal: bool,
}

impl fmt::Debug for Streams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streams")
            .field("err_is_terminal", &self.err_is_terminal)
            .finish_non_exhaustive()
    }
}

impl Streams {
    /// Creates streams from arbitrary writers and a reader.
    #[must_use]
    pub fn new(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        input: Box<dyn BufRead + Send>,
    ) -> Self {
        Self {
            out: Arc::new(Mutex::new(out)),
            err: Arc::new(Mutex::new(err)),
            input: Arc::new(Mutex::new(input)),
            err_is_terminal: false,
        }
    }

    /// Streams bound to the process stdout, stderr and stdin.
    #[must_use]
    pub fn stdio() -> Self {
        let mut streams = Self::new(
            Box::new(io::stdout()),
            Box::new(io::stderr()),
            Box::new(io::BufReader::new(io::stdin())),
        );
        streams.err_is_terminal = console::Term::stderr().is_term();
        streams
    }

    /// In-memory streams with an empty input.
    #[must_use]
    pub fn captured() -> (Self, Capture) {
        Self::captured_with_input(Vec::new())
    }

    /// In-memory streams reading the given bytes as input.
    #[must_use]
    pub fn captured_with_input(input: impl Into<Vec<u8>>) -> (Self, Capture) {
        let capture = Capture::default();
        let streams = Self::new(
            Box::new(capture.out.clone()),
            Box::new(capture.err.clone()),
            Box::new(io::Cursor::new(input.into())),
        );
        (streams, capture)
    }

    /// True if the error stream is an interactive terminal.
    #[must_use]
    pub const fn err_is_terminal(&self) -> bool {
        self.err_is_terminal
    }

    pub(crate) fn write_out(&self, s: &str) -> Result<()> {
        let mut out = self.out.lock();
        out.write_all(s.as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| CliError::internal("write output", e))
    }

    pub(crate) fn write_err(&self, s: &str) {
        let mut err = self.err.lock();
        // Diagnostics never fail the command.
        let _ = err.write_all(s.as_bytes()).and_then(|()| err.flush());
    }
}

/// A cloneable in-memory writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Returns everything written so far, lossily decoded.
    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }

    /// True if nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Buffers backing [`Streams::captured`].
#[derive(Debug, Clone, Default)]
pub struct Capture {
    /// Result channel.
    pub out: SharedBuffer,
    /// Diagnostic channel.
    pub err: SharedBuffer,
}

/// Writes results, diagnostics and prompts for one invocation.
#[derive(Debug, Clone)]
pub struct Printer {
    streams: Streams,
    format: OutputFormat,
    verbosity: Verbosity,
    assume_yes: bool,
}

impl Printer {
    /// Creates a printer configured from the resolved global flags.
    #[must_use]
    pub fn new(streams: Streams, globals: &GlobalFlags) -> Self {
        Self {
            streams,
            format: globals.output_format,
            verbosity: globals.verbosity,
            assume_yes: globals.assume_yes,
        }
    }

    /// Output format of this invocation.
    #[must_use]
    pub const fn format(&self) -> OutputFormat {
        self.format
    }

    /// Verbosity of this invocation.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// True if a spinner may be drawn on the error stream.
    #[must_use]
    pub const fn interactive(&self) -> bool {
        matches!(self.format, OutputFormat::Pretty) && self.streams.err_is_terminal()
    }

    /// Writes a diagnostic line if `level` passes the verbosity filter.
    pub fn diag(&self, level: Verbosity, args: fmt::Arguments<'_>) {
        if level < self.verbosity {
            return;
        }
        let prefix = match level {
            Verbosity::Debug => "[DEBUG] ",
            Verbosity::Info => "",
            Verbosity::Warning => "Warning: ",
            Verbosity::Error => "Error: ",
        };
        self.streams.write_err(&format!("{prefix}{args}\n"));
    }

    /// Debug diagnostic.
    pub fn debug(&self, msg: impl fmt::Display) {
        self.diag(Verbosity::Debug, format_args!("{msg}"));
    }

    /// Informational diagnostic.
    pub fn info(&self, msg: impl fmt::Display) {
        self.diag(Verbosity::Info, format_args!("{msg}"));
    }

    /// Warning diagnostic.
    pub fn warn(&self, msg: impl fmt::Display) {
        self.diag(Verbosity::Warning, format_args!("{msg}"));
    }

    /// Error diagnostic. Always emitted.
    pub fn error(&self, msg: impl fmt::Display) {
        self.diag(Verbosity::Error, format_args!("{msg}"));
    }

    /// Writes to the result channel, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Internal`] if the stream cannot be written.
    pub fn output(&self, s: &str) -> Result<()> {
        self.streams.write_out(s)
    }

    /// Writes a line to the result channel, unfiltered.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Internal`] if the stream cannot be written.
    pub fn outputln(&self, s: &str) -> Result<()> {
        self.streams.write_out(&format!("{s}\n"))
    }

    /// Renders a command result in the configured format.
    ///
    /// `human` is only called for the pretty format.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error, or whatever `human` returns.
    pub fn result<T, F>(&self, value: &T, human: F) -> Result<()>
    where
        T: Serialize + ?Sized,
        F: FnOnce(&Self) -> Result<()>,
    {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(value)
                    .map_err(|e| CliError::internal("encode JSON output", e))?;
                self.outputln(&json)
            }
            OutputFormat::Yaml => {
                let value = serde_json::to_value(value)
                    .map_err(|e| CliError::internal("encode YAML output", e))?;
                self.output(&to_yaml(&value))
            }
            OutputFormat::Pretty => human(self),
            OutputFormat::None => Ok(()),
        }
    }

    /// Asks the user to confirm a mutation.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ConfirmationDeclined`] unless the answer is `y` or
    /// `yes`. EOF counts as a decline; cancellation marks it as interrupted.
    pub async fn confirm(&self, prompt: &str, cancel: &CancellationToken) -> Result<()> {
        if self.assume_yes {
            return Ok(());
        }
        self.streams.write_err(&format!("{prompt} [y/N] "));

        let input = Arc::clone(&self.streams.input);
        let read = tokio::task::spawn_blocking(move || {
            let mut line = String::new();
            input.lock().read_line(&mut line).map(|n| (n, line))
        });

        tokio::select! {
            () = cancel.cancelled() => {
                self.streams.write_err("\n");
                Err(CliError::ConfirmationDeclined { interrupted: true })
            }
            joined = read => {
                let (n, line) = joined
                    .map_err(|e| CliError::internal("read confirmation", e))?
                    .map_err(|e| CliError::internal("read confirmation", e))?;
                if n == 0 {
                    self.streams.write_err("\n");
                }
                match line.trim().to_ascii_lowercase().as_str() {
                    "y" | "yes" => Ok(()),
                    _ => Err(CliError::ConfirmationDeclined { interrupted: false }),
                }
            }
        }
    }

    /// Logs the parsed input model at debug verbosity.
    ///
    /// Keys are sorted and empty values omitted.
    pub fn debug_input_model<T: Serialize + ?Sized>(&self, model: &T) {
        if self.verbosity > Verbosity::Debug {
            return;
        }
        match serde_json::to_value(model) {
            Ok(value) => self.debug(format_args!("parsed input values: {}", input_summary(&value))),
            Err(e) => self.debug(format_args!("failed to summarize input values: {e}")),
        }
    }
}

fn input_summary(value: &Value) -> String {
    let Value::Object(map) = value else {
        return format!("[{}]", scalar_text(value));
    };
    let mut pairs: Vec<(&String, String)> = map
        .iter()
        .filter(|(_, v)| !is_empty_value(v))
        .map(|(k, v)| (k, scalar_text(v)))
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));
    let body = pairs
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{body}]")
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Renders a JSON value as block-style YAML.
///
/// Sequences are indented under their keys. The output ends with exactly one
/// newline.
#[must_use]
pub fn to_yaml(value: &Value) -> String {
    let mut out = String::new();
    match value {
        Value::Object(map) if !map.is_empty() => emit_mapping(&mut out, map, 0),
        Value::Array(items) if !items.is_empty() => emit_sequence(&mut out, items, 0),
        scalar => {
            out.push_str(&yaml_inline(scalar));
            out.push('\n');
        }
    }
    out
}

fn emit_mapping(out: &mut String, map: &serde_json::Map<String, Value>, indent: usize) {
    let pad = " ".repeat(indent);
    for (key, value) in map {
        let key = yaml_string(key);
        match value {
            Value::Object(inner) if !inner.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                emit_mapping(out, inner, indent + 2);
            }
            Value::Array(items) if !items.is_empty() => {
                let _ = writeln!(out, "{pad}{key}:");
                emit_sequence(out, items, indent + 2);
            }
            scalar => {
                let _ = writeln!(out, "{pad}{key}: {}", yaml_inline(scalar));
            }
        }
    }
}

fn emit_sequence(out: &mut String, items: &[Value], indent: usize) {
    let pad = " ".repeat(indent);
    for item in items {
        let nested = match item {
            Value::Object(inner) if !inner.is_empty() => {
                let mut nested = String::new();
                emit_mapping(&mut nested, inner, indent + 2);
                nested
            }
            Value::Array(inner) if !inner.is_empty() => {
                let mut nested = String::new();
                emit_sequence(&mut nested, inner, indent + 2);
                nested
            }
            scalar => {
                let _ = writeln!(out, "{pad}- {}", yaml_inline(scalar));
                continue;
            }
        };
        // The first nested line shares the dash's line.
        out.push_str(&pad);
        out.push_str("- ");
        out.push_str(&nested[indent + 2..]);
    }
}

fn yaml_inline(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => yaml_string(s),
        Value::Array(_) => "[]".to_owned(),
        Value::Object(_) => "{}".to_owned(),
    }
}

fn yaml_string(s: &str) -> String {
    if s.contains(['\n', '\r']) {
        // A double-quoted JSON string is a valid flow scalar.
        return serde_json::to_string(s).unwrap_or_else(|_| format!("{s:?}"));
    }
    match serde_yaml::to_string(s) {
        Ok(rendered) => rendered.trim_end_matches('\n').to_owned(),
        Err(_) => format!("{s:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn printer(format: OutputFormat, verbosity: Verbosity) -> (Printer, Capture) {
        printer_with_input(format, verbosity, false, "")
    }

    fn printer_with_input(
        format: OutputFormat,
        verbosity: Verbosity,
        assume_yes: bool,
        input: &str,
    ) -> (Printer, Capture) {
        let (streams, capture) = Streams::captured_with_input(input);
        let globals = GlobalFlags {
            output_format: format,
            verbosity,
            assume_yes,
            ..GlobalFlags::default()
        };
        (Printer::new(streams, &globals), capture)
    }

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        id: String,
        display_name: String,
        tags: Vec<String>,
    }

    fn sample() -> Sample {
        Sample {
            id: "abc".into(),
            display_name: "my key".into(),
            tags: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn json_is_indented_with_trailing_newline() {
        let (p, cap) = printer(OutputFormat::Json, Verbosity::Info);
        p.result(&sample(), |_| unreachable!()).expect("render");
        assert_eq!(
            cap.out.contents(),
            "{\n  \"id\": \"abc\",\n  \"displayName\": \"my key\",\n  \"tags\": [\n    \"a\",\n    \"b\"\n  ]\n}\n"
        );
    }

    #[test]
    fn yaml_indents_sequences_under_keys() {
        let (p, cap) = printer(OutputFormat::Yaml, Verbosity::Info);
        p.result(&sample(), |_| unreachable!()).expect("render");
        assert_eq!(
            cap.out.contents(),
            "id: abc\ndisplayName: my key\ntags:\n  - a\n  - b\n"
        );
    }

    #[test]
    fn yaml_nests_mappings_inside_sequences() {
        let value = json!({
            "rules": [
                {"order": 1, "ipAcl": ["10.0.0.0/8"]},
                {"order": 2, "readOnly": true}
            ],
            "empty": [],
            "comment": null
        });
        assert_eq!(
            to_yaml(&value),
            "rules:\n  - order: 1\n    ipAcl:\n      - 10.0.0.0/8\n  - order: 2\n    readOnly: true\nempty: []\ncomment: null\n"
        );
    }

    #[test]
    fn yaml_quotes_ambiguous_scalars() {
        let value = json!({"version": "1", "flag": "true", "multi": "a\nb"});
        assert_eq!(
            to_yaml(&value),
            "version: '1'\nflag: 'true'\nmulti: \"a\\nb\"\n"
        );
    }

    #[test]
    fn yaml_output_parses_back_to_the_same_value() {
        let value = json!({"a": [{"b": ["c", {"d": 1}]}, [1, 2]], "e": {"f": "g: h"}});
        let parsed: Value = serde_yaml::from_str(&to_yaml(&value)).expect("valid yaml");
        assert_eq!(parsed, value);
    }

    #[test]
    fn pretty_calls_human_renderer() {
        let (p, cap) = printer(OutputFormat::Pretty, Verbosity::Info);
        p.result(&sample(), |p| p.outputln("human")).expect("render");
        assert_eq!(cap.out.contents(), "human\n");
    }

    #[test]
    fn none_suppresses_result_but_not_errors() {
        let (p, cap) = printer(OutputFormat::None, Verbosity::Info);
        p.result(&sample(), |p| p.outputln("human")).expect("render");
        p.error("boom");
        assert!(cap.out.is_empty());
        assert_eq!(cap.err.contents(), "Error: boom\n");
    }

    #[test]
    fn human_renderer_errors_surface_unchanged() {
        let (p, _cap) = printer(OutputFormat::Pretty, Verbosity::Info);
        let err = p.result(&sample(), |_| Err(CliError::EmptyUpdate)).expect_err("fails");
        assert!(matches!(err, CliError::EmptyUpdate));
    }

    #[test]
    fn diagnostics_respect_verbosity() {
        let (p, cap) = printer(OutputFormat::Pretty, Verbosity::Warning);
        p.debug("hidden");
        p.info("hidden");
        p.warn("shown");
        p.error("shown too");
        assert_eq!(cap.err.contents(), "Warning: shown\nError: shown too\n");
        assert!(cap.out.is_empty());
    }

    #[test]
    fn input_model_summary_is_sorted_and_skips_empty_values() {
        let (p, cap) = printer(OutputFormat::Pretty, Verbosity::Debug);
        p.debug_input_model(&json!({
            "zeta": "z",
            "alpha": 3,
            "empty": "",
            "missing": null,
            "list": ["x"]
        }));
        assert_eq!(
            cap.err.contents(),
            "[DEBUG] parsed input values: [alpha: 3, list: [\"x\"], zeta: z]\n"
        );
    }

    #[test]
    fn input_model_is_not_logged_above_debug() {
        let (p, cap) = printer(OutputFormat::Pretty, Verbosity::Info);
        p.debug_input_model(&json!({"a": 1}));
        assert!(cap.err.is_empty());
    }

    #[tokio::test]
    async fn confirm_accepts_yes_case_insensitively() {
        for answer in ["y\n", "YES\n", "  Yes  \n"] {
            let (p, cap) = printer_with_input(OutputFormat::Pretty, Verbosity::Info, false, answer);
            p.confirm("Delete it?", &CancellationToken::new()).await.expect("confirmed");
            assert_eq!(cap.err.contents(), "Delete it? [y/N] ");
        }
    }

    #[tokio::test]
    async fn confirm_declines_on_no_and_eof() {
        for answer in ["n\n", "", "maybe\n"] {
            let (p, _cap) = printer_with_input(OutputFormat::Pretty, Verbosity::Info, false, answer);
            let err = p
                .confirm("Delete it?", &CancellationToken::new())
                .await
                .expect_err("declined");
            assert!(matches!(err, CliError::ConfirmationDeclined { interrupted: false }));
        }
    }

    #[tokio::test]
    async fn confirm_is_skipped_with_assume_yes() {
        let (p, cap) = printer_with_input(OutputFormat::Pretty, Verbosity::Info, true, "n\n");
        p.confirm("Delete it?", &CancellationToken::new()).await.expect("skipped");
        assert!(cap.err.is_empty());
    }

    #[tokio::test]
    async fn cancelled_confirmation_is_interrupted() {
        struct Blocking;
        impl io::Read for Blocking {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                std::thread::sleep(std::time::Duration::from_millis(200));
                Ok(0)
            }
        }
        let capture = Capture::default();
        let streams = Streams::new(
            Box::new(capture.out.clone()),
            Box::new(capture.err.clone()),
            Box::new(io::BufReader::new(Blocking)),
        );
        let p = Printer::new(streams, &GlobalFlags::default());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = p.confirm("Delete it?", &cancel).await.expect_err("interrupted");
        assert!(matches!(err, CliError::ConfirmationDeclined { interrupted: true }));
        assert_eq!(err.exit_code(), 130);
    }
}
