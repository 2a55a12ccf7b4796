//! The request pipeline shared by every leaf command.
//!
//! ```text
//! parse ─► validate ─► resolve labels ─► confirm ─► build ─► dispatch ─┬─► render
//!                                                                      └─► wait ─► render
//! ```
//!
//! Leaves implement [`Operation`]; the blanket [`Leaf`] impl drives the
//! stages in order. Failures after dispatch are marked with
//! [`CliError::AfterDispatch`].

use async_trait::async_trait;
use serde::Serialize;
use stackit_sdk::SdkError;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::client::Clients;
use crate::error::{CliError, Result};
use crate::flags::FlagValues;
use crate::globals::GlobalFlags;
use crate::printer::Printer;
use crate::spinner::Spinner;
use crate::waiter::{self, FetchError, Terminal, WaitOptions, WaitTarget};

/// Parsed command line of one leaf invocation.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Resolved global flags.
    pub globals: GlobalFlags,
    /// Leaf flags.
    pub flags: FlagValues,
    /// Validated positional arguments, in declaration order.
    pub args: Vec<String>,
}

impl Invocation {
    /// Positional argument by index.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Internal`] if the leaf declared fewer arguments.
    pub fn arg(&self, index: usize) -> Result<&str> {
        self.args
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| CliError::internal("positional argument", format!("index {index} not declared")))
    }
}

/// Everything a leaf may use besides its input.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output channels.
    pub printer: Printer,
    /// SDK clients.
    pub clients: Clients,
    /// Cancelled on interrupt.
    pub cancel: CancellationToken,
}

/// Pipeline states, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Input model built.
    Parsed,
    /// Cross-field checks passed.
    Validated,
    /// Prompt accepted or skipped.
    Confirmed,
    /// Request accepted by the API.
    Dispatched,
    /// Polling for a terminal state.
    Waiting,
    /// Result written.
    Rendered,
    /// Stopped by an error.
    Aborted,
}

impl Stage {
    /// Lowercase name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parsed => "parsed",
            Self::Validated => "validated",
            Self::Confirmed => "confirmed",
            Self::Dispatched => "dispatched",
            Self::Waiting => "waiting",
            Self::Rendered => "rendered",
            Self::Aborted => "aborted",
        }
    }
}

/// One leaf command, expressed as pipeline stages.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Typed input model.
    type Input: Serialize + Send + Sync;
    /// Display labels resolved before the prompt.
    type Labels: Default + Send + Sync;
    /// Request built from the input.
    type Request: Send;
    /// Result of the dispatch.
    type Response: Serialize + Send + Sync;

    /// Builds the input model.
    ///
    /// # Errors
    ///
    /// Returns `FLAG_VALIDATION` or `ARG_VALIDATION` for malformed values.
    fn parse(&self, inv: &Invocation) -> Result<Self::Input>;

    /// Runs cross-field checks.
    ///
    /// # Errors
    ///
    /// Returns the taxonomy error of the failed check.
    fn validate(&self, _input: &Self::Input) -> Result<()> {
        Ok(())
    }

    /// Resolves display labels. Failures fall back to identifiers.
    async fn resolve_labels(&self, _ctx: &Context, _input: &Self::Input) -> Self::Labels {
        Self::Labels::default()
    }

    /// The confirmation prompt, if the leaf mutates anything.
    fn confirmation(&self, _input: &Self::Input, _labels: &Self::Labels) -> Option<String> {
        None
    }

    /// Builds the SDK request.
    ///
    /// # Errors
    ///
    /// Returns `EMPTY_UPDATE` for updates without fields.
    fn build_request(&self, ctx: &Context, input: &Self::Input) -> Result<Self::Request>;

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns `REMOTE` if the API call fails.
    async fn dispatch(&self, ctx: &Context, input: &Self::Input, request: Self::Request) -> Result<Self::Response>;

    /// True if the operation completes asynchronously on the server.
    fn waits(&self, _input: &Self::Input) -> bool {
        false
    }

    /// Waits for the operation to reach a terminal state.
    ///
    /// # Errors
    ///
    /// Returns `WAIT_TIMEOUT` or `REMOTE`.
    async fn wait(&self, _ctx: &Context, _input: &Self::Input, _response: &Self::Response) -> Result<()> {
        Ok(())
    }

    /// Writes the result.
    ///
    /// # Errors
    ///
    /// Returns the printer's error.
    fn render(
        &self,
        printer: &Printer,
        input: &Self::Input,
        labels: &Self::Labels,
        response: &Self::Response,
    ) -> Result<()>;
}

/// A runnable leaf of the command tree.
#[async_trait]
pub trait Leaf: Send + Sync {
    /// Runs the leaf.
    ///
    /// # Errors
    ///
    /// Returns the error of the failing stage.
    async fn run(&self, ctx: &Context, inv: &Invocation) -> Result<()>;
}

#[async_trait]
impl<O: Operation> Leaf for O {
    async fn run(&self, ctx: &Context, inv: &Invocation) -> Result<()> {
        let result = execute(self, ctx, inv).await;
        if let Err(err) = &result {
            debug!(stage = Stage::Aborted.as_str(), kind = %err.kind(), "pipeline stopped");
        }
        result
    }
}

fn trace_stage(stage: Stage) {
    debug!(stage = stage.as_str(), "pipeline stage");
}

/// Runs every stage of `op` in order.
///
/// # Errors
///
/// Returns the first failing stage's error. Wait and render failures are
/// wrapped in [`CliError::AfterDispatch`].
pub async fn execute<O: Operation>(op: &O, ctx: &Context, inv: &Invocation) -> Result<()> {
    let input = op.parse(inv)?;
    ctx.printer.debug_input_model(&input);
    trace_stage(Stage::Parsed);

    op.validate(&input)?;
    trace_stage(Stage::Validated);

    let labels = op.resolve_labels(ctx, &input).await;
    if let Some(prompt) = op.confirmation(&input, &labels) {
        ctx.printer.confirm(&prompt, &ctx.cancel).await?;
    }
    trace_stage(Stage::Confirmed);

    let request = op.build_request(ctx, &input)?;
    let response = tokio::select! {
        () = ctx.cancel.cancelled() => {
            return Err(CliError::OperationFailed {
                operation: "send request".to_owned(),
                reason: "interrupted".to_owned(),
            }
            .after_dispatch());
        }
        response = op.dispatch(ctx, &input, request) => response?,
    };
    trace_stage(Stage::Dispatched);

    if op.waits(&input) && !inv.globals.async_mode {
        trace_stage(Stage::Waiting);
        op.wait(ctx, &input, &response)
            .await
            .map_err(CliError::after_dispatch)?;
    }

    op.render(&ctx.printer, &input, &labels, &response)
        .map_err(CliError::after_dispatch)?;
    trace_stage(Stage::Rendered);
    Ok(())
}

/// Polls with a spinner bound to the context's printer.
///
/// # Errors
///
/// See [`waiter::wait`].
pub async fn poll<S, F, Fut, C>(
    ctx: &Context,
    target: &WaitTarget,
    fetch: F,
    check: C,
    options: &WaitOptions,
) -> Result<S>
where
    F: FnMut() -> Fut + Send,
    Fut: std::future::Future<Output = std::result::Result<S, FetchError>> + Send,
    C: Fn(&S) -> Terminal + Send,
    S: Send,
{
    let spinner = Spinner::for_printer(&ctx.printer);
    waiter::wait(&ctx.cancel, target, fetch, check, options, &spinner).await
}

/// Fetch adapter treating 404 as `None`, for deletions.
///
/// # Errors
///
/// Returns the classified SDK error for anything but 404.
pub fn gone_on_not_found<T>(result: std::result::Result<T, SdkError>) -> std::result::Result<Option<T>, FetchError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(FetchError::from(e)),
    }
}

/// Resolves a display label, falling back to `fallback` on failure.
pub async fn label_or<F>(ctx: &Context, what: &str, fallback: &str, fetch: F) -> String
where
    F: std::future::Future<Output = std::result::Result<String, SdkError>> + Send,
{
    match fetch.await {
        Ok(label) if !label.trim().is_empty() => label,
        Ok(_) => fallback.to_owned(),
        Err(e) => {
            ctx.printer.debug(format_args!("get {what} name: {e}"));
            fallback.to_owned()
        }
    }
}

/// Name of the project, or its ID if the lookup fails.
pub async fn project_label(ctx: &Context, project_id: &str) -> String {
    let request = ctx.clients.resource_manager.get_project(project_id);
    label_or(ctx, "project", project_id, async move {
        request.execute().await.map(|p| p.name)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::globals::OutputFormat;
    use crate::printer::{Capture, Streams};
    use parking_lot::Mutex;
    use serde_json::Value;
    use stackit_sdk::{ApiCall, Transport};
    use std::sync::Arc;

    struct Canned {
        project_name: Option<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for Canned {
        async fn send(&self, call: ApiCall) -> stackit_sdk::Result<Option<Value>> {
            self.calls.lock().push(format!("{} {}", call.method, call.path));
            match self.project_name {
                Some(name) => Ok(Some(serde_json::json!({"projectId": "p", "name": name}))),
                None => Err(SdkError::http(403, b"")),
            }
        }
    }

    fn context(globals: &GlobalFlags, project_name: Option<&'static str>, input: &str) -> (Context, Capture) {
        let (streams, capture) = Streams::captured_with_input(input);
        let transport: Arc<dyn Transport> = Arc::new(Canned {
            project_name,
            calls: Mutex::new(Vec::new()),
        });
        let ctx = Context {
            printer: Printer::new(streams, globals),
            clients: Clients::with_transport(&transport),
            cancel: CancellationToken::new(),
        };
        (ctx, capture)
    }

    #[derive(Default)]
    struct Probe {
        waits: bool,
        fail_render: bool,
        dispatched: Mutex<u32>,
        waited: Mutex<u32>,
    }

    #[async_trait]
    impl Operation for Probe {
        type Input = String;
        type Labels = String;
        type Request = String;
        type Response = String;

        fn parse(&self, inv: &Invocation) -> Result<String> {
            Ok(inv.arg(0)?.to_owned())
        }

        async fn resolve_labels(&self, ctx: &Context, _input: &String) -> String {
            project_label(ctx, "p").await
        }

        fn confirmation(&self, input: &String, labels: &String) -> Option<String> {
            Some(format!("Delete {input} in {labels}?"))
        }

        fn build_request(&self, _ctx: &Context, input: &String) -> Result<String> {
            Ok(input.clone())
        }

        async fn dispatch(&self, _ctx: &Context, _input: &String, request: String) -> Result<String> {
            *self.dispatched.lock() += 1;
            Ok(format!("done:{request}"))
        }

        fn waits(&self, _input: &String) -> bool {
            self.waits
        }

        async fn wait(&self, _ctx: &Context, _input: &String, _response: &String) -> Result<()> {
            *self.waited.lock() += 1;
            Ok(())
        }

        fn render(&self, printer: &Printer, _input: &String, _labels: &String, response: &String) -> Result<()> {
            if self.fail_render {
                return Err(CliError::internal("render", "broken"));
            }
            printer.result(response, |p| p.outputln(response))
        }
    }

    fn invocation(globals: GlobalFlags) -> Invocation {
        Invocation {
            globals,
            flags: FlagValues::from_args(Vec::new(), &[]).expect("flags"),
            args: vec!["x".to_owned()],
        }
    }

    #[tokio::test]
    async fn runs_every_stage_and_labels_the_prompt() {
        let globals = GlobalFlags::default();
        let (ctx, capture) = context(&globals, Some("my-project"), "y\n");
        let op = Probe {
            waits: true,
            ..Probe::default()
        };
        op.run(&ctx, &invocation(globals)).await.expect("run");
        assert_eq!(capture.err.contents(), "Delete x in my-project? [y/N] ");
        assert_eq!(capture.out.contents(), "done:x\n");
        assert_eq!(*op.dispatched.lock(), 1);
        assert_eq!(*op.waited.lock(), 1);
    }

    #[tokio::test]
    async fn declined_prompt_never_dispatches() {
        let globals = GlobalFlags::default();
        let (ctx, capture) = context(&globals, Some("my-project"), "");
        let op = Probe::default();
        let err = op.run(&ctx, &invocation(globals)).await.expect_err("declined");
        assert!(matches!(err, CliError::ConfirmationDeclined { interrupted: false }));
        assert_eq!(*op.dispatched.lock(), 0);
        assert!(capture.out.is_empty());
    }

    #[tokio::test]
    async fn async_mode_skips_the_wait() {
        let globals = GlobalFlags {
            async_mode: true,
            assume_yes: true,
            ..GlobalFlags::default()
        };
        let (ctx, _capture) = context(&globals, Some("p"), "");
        let op = Probe {
            waits: true,
            ..Probe::default()
        };
        op.run(&ctx, &invocation(globals)).await.expect("run");
        assert_eq!(*op.waited.lock(), 0);
    }

    #[tokio::test]
    async fn label_failure_falls_back_to_id_with_debug_note() {
        let globals = GlobalFlags {
            verbosity: crate::globals::Verbosity::Debug,
            ..GlobalFlags::default()
        };
        let (ctx, capture) = context(&globals, None, "yes\n");
        Probe::default().run(&ctx, &invocation(globals)).await.expect("run");
        let err = capture.err.contents();
        assert!(err.contains("[DEBUG] get project name: HTTP 403"), "{err}");
        assert!(err.contains("Delete x in p? [y/N] "), "{err}");
    }

    #[tokio::test]
    async fn render_failure_notes_the_dispatch() {
        let globals = GlobalFlags {
            assume_yes: true,
            output_format: OutputFormat::Pretty,
            ..GlobalFlags::default()
        };
        let (ctx, _capture) = context(&globals, Some("p"), "");
        let op = Probe {
            fail_render: true,
            ..Probe::default()
        };
        let err = op.run(&ctx, &invocation(globals)).await.expect_err("render fails");
        assert!(err.is_after_dispatch());
        assert!(err.to_string().ends_with("Note: the operation may have already taken effect."));
    }

    #[test]
    fn not_found_means_gone() {
        assert!(matches!(gone_on_not_found::<u8>(Err(SdkError::http(404, b""))), Ok(None)));
        assert!(matches!(gone_on_not_found(Ok(1u8)), Ok(Some(1))));
        assert!(matches!(
            gone_on_not_found::<u8>(Err(SdkError::http(500, b""))),
            Err(FetchError::Fatal(_))
        ));
    }
}
