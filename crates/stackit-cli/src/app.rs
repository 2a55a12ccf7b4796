//! Top-level runner: argv in, exit code out.
//!
//! The prologue runs in a fixed order before any leaf: parse the command
//! line, enforce flag constraints, validate positionals, resolve globals,
//! require the project, build the printer, configure the clients.

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::auth;
use crate::builder::{CommandNode, NodeBody};
use crate::client::{ClientFactory, ClientSettings};
use crate::config::{Config, EnvSnapshot};
use crate::error::{CliError, Result};
use crate::flags::FlagValues;
use crate::globals::{GlobalFlags, OutputFormat, RawGlobals, Verbosity};
use crate::pipeline::{Context, Invocation, Leaf};
use crate::printer::{Printer, Streams};

/// Name of the binary.
pub const BIN_NAME: &str = "stackit";

const ARG_PROJECT_ID: &str = "project-id";
const ARG_REGION: &str = "region";
const ARG_OUTPUT_FORMAT: &str = "output-format";
const ARG_VERBOSITY: &str = "verbosity";
const ARG_ASYNC: &str = "async";
const ARG_ASSUME_YES: &str = "assume-yes";

/// The dependency bag of one process.
pub struct App {
    root: CommandNode,
    env: EnvSnapshot,
    config: Option<Config>,
    factory: Arc<dyn ClientFactory>,
    cancel: CancellationToken,
    init_logging: bool,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("init_logging", &self.init_logging)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Creates an app running the full command tree.
    #[must_use]
    pub fn new(env: EnvSnapshot, factory: Arc<dyn ClientFactory>, cancel: CancellationToken) -> Self {
        Self {
            root: crate::commands::root(),
            env,
            config: None,
            factory,
            cancel,
            init_logging: false,
        }
    }

    /// Replaces the command tree.
    #[must_use]
    pub fn with_root(mut self, root: CommandNode) -> Self {
        self.root = root;
        self
    }

    /// Uses the given configuration instead of loading the profile.
    #[must_use]
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Installs the tracing subscriber once globals are resolved.
    #[must_use]
    pub const fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// The clap command for the whole tree, with global flags.
    #[must_use]
    pub fn command(&self) -> Command {
        global_args(self.root.to_command())
            .name(BIN_NAME)
            .bin_name(BIN_NAME)
            .version(env!("CARGO_PKG_VERSION"))
    }

    /// Runs one invocation and returns the process exit code.
    pub async fn run<I, T>(&self, argv: I, streams: Streams) -> u8
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = match self.command().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(e) => {
                return match e.kind() {
                    ClapErrorKind::DisplayHelp
                    | ClapErrorKind::DisplayVersion
                    | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        let _ = streams.write_out(&e.render().to_string());
                        0
                    }
                    _ => {
                        let err = CliError::Usage(e.render().to_string());
                        streams.write_err(&err.to_string());
                        err.exit_code()
                    }
                };
            }
        };

        let (path, node, leaf_matches) = match resolve_path(&self.root, &matches) {
            Resolved::Leaf { path, node, matches } => (path, node, matches),
            Resolved::Branch { path } => {
                return match self.branch_help(&path) {
                    Ok(help) => {
                        let _ = streams.write_out(&help);
                        0
                    }
                    Err(err) => self.report(&fallback_printer(&streams), &err),
                };
            }
        };
        tracing::debug!(command = %path.join(" "), "resolved command");

        let (printer, ctx, inv) = match self.prologue(node, leaf_matches, &streams) {
            Ok(prepared) => prepared,
            Err((printer, err)) => return self.report(&printer, &err),
        };

        let NodeBody::Leaf(leaf) = &node.body else {
            return self.report(&printer, &CliError::internal("dispatch", "resolved node is not a leaf"));
        };
        match leaf.run(&ctx, &inv).await {
            Ok(()) => 0,
            Err(err) => self.report(&printer, &err),
        }
    }

    #[allow(clippy::result_large_err)]
    fn prologue(
        &self,
        node: &CommandNode,
        matches: &ArgMatches,
        streams: &Streams,
    ) -> std::result::Result<(Printer, Context, Invocation), (Printer, CliError)> {
        let fallback = || fallback_printer(streams);

        let flags = FlagValues::new(matches.clone(), node.flags.clone());
        flags.enforce(&node.constraints).map_err(|e| (fallback(), e))?;

        let mut args = Vec::with_capacity(node.args.len());
        for spec in &node.args {
            let value = matches.get_one::<String>(spec.name).cloned().unwrap_or_default();
            spec.validate(&value).map_err(|e| (fallback(), e))?;
            args.push(value);
        }

        let config = match &self.config {
            Some(config) => config.clone(),
            None => Config::load(&self.env).map_err(|e| (fallback(), e))?,
        };
        let globals = GlobalFlags::resolve(&raw_globals(matches), &self.env, &config.profile)
            .map_err(|e| (fallback(), e))?;
        if self.init_logging {
            init_logging(globals.verbosity, &self.env);
        }
        if node.requires_project {
            globals.require_project().map_err(|e| (fallback(), e))?;
        }

        let printer = Printer::new(streams.clone(), &globals);
        let settings = ClientSettings::new(&globals.region, auth::token_from_env(&self.env), &config.profile);
        let clients = match self.factory.configure(&settings) {
            Ok(clients) => clients,
            Err(e) => return Err((printer, e)),
        };

        let ctx = Context {
            printer: printer.clone(),
            clients,
            cancel: self.cancel.clone(),
        };
        let inv = Invocation { globals, flags, args };
        Ok((printer, ctx, inv))
    }

    fn branch_help(&self, path: &[&str]) -> Result<String> {
        let mut command = self.command();
        command.build();
        let mut current = &mut command;
        for name in path.iter().skip(1) {
            current = current
                .find_subcommand_mut(name)
                .ok_or_else(|| CliError::internal("help", format!("unknown subcommand {name}")))?;
        }
        Ok(current.render_long_help().to_string())
    }

    fn report(&self, printer: &Printer, err: &CliError) -> u8 {
        printer.error(err);
        if printer.verbosity() == Verbosity::Debug {
            let mut source = std::error::Error::source(err);
            while let Some(cause) = source {
                printer.debug(format_args!("caused by: {cause}"));
                source = cause.source();
            }
            printer.debug(format_args!("error kind: {}", err.kind()));
        }
        err.exit_code()
    }
}

enum Resolved<'a> {
    Leaf {
        path: Vec<&'a str>,
        node: &'a CommandNode,
        matches: &'a ArgMatches,
    },
    Branch {
        path: Vec<&'a str>,
    },
}

fn resolve_path<'a>(root: &'a CommandNode, matches: &'a ArgMatches) -> Resolved<'a> {
    let mut node = root;
    let mut current = matches;
    let mut path = vec![root.name];
    loop {
        if node.is_leaf() {
            return Resolved::Leaf {
                path,
                node,
                matches: current,
            };
        }
        let Some((name, sub)) = current.subcommand() else {
            return Resolved::Branch { path };
        };
        let Some(child) = node.find_child(name) else {
            return Resolved::Branch { path };
        };
        path.push(child.name);
        node = child;
        current = sub;
    }
}

fn global_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROJECT_ID)
                .long(ARG_PROJECT_ID)
                .global(true)
                .value_name("UUID")
                .help("Project ID"),
        )
        .arg(
            Arg::new(ARG_REGION)
                .long(ARG_REGION)
                .global(true)
                .value_name("REGION")
                .help("Target region, e.g. eu01"),
        )
        .arg(
            Arg::new(ARG_OUTPUT_FORMAT)
                .long(ARG_OUTPUT_FORMAT)
                .short('o')
                .global(true)
                .value_name("FORMAT")
                .help(format!("Output format, one of: {}", OutputFormat::VALUES.join(", "))),
        )
        .arg(
            Arg::new(ARG_VERBOSITY)
                .long(ARG_VERBOSITY)
                .global(true)
                .value_name("LEVEL")
                .help(format!("Verbosity, one of: {}", Verbosity::VALUES.join(", "))),
        )
        .arg(
            Arg::new(ARG_ASYNC)
                .long(ARG_ASYNC)
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Do not wait for long-running operations to finish"),
        )
        .arg(
            Arg::new(ARG_ASSUME_YES)
                .long(ARG_ASSUME_YES)
                .short('y')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Skip confirmation prompts"),
        )
}

fn raw_globals(matches: &ArgMatches) -> RawGlobals {
    let string = |id: &str| matches.try_get_one::<String>(id).ok().flatten().cloned();
    let flag = |id: &str| matches.try_get_one::<bool>(id).ok().flatten().copied().unwrap_or(false);
    RawGlobals {
        project_id: string(ARG_PROJECT_ID),
        region: string(ARG_REGION),
        output_format: string(ARG_OUTPUT_FORMAT),
        verbosity: string(ARG_VERBOSITY),
        async_mode: flag(ARG_ASYNC),
        assume_yes: flag(ARG_ASSUME_YES),
    }
}

fn fallback_printer(streams: &Streams) -> Printer {
    Printer::new(streams.clone(), &GlobalFlags::default())
}

/// Default tracing filter for a verbosity.
#[must_use]
pub fn default_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Debug => "stackit_cli=debug,stackit_sdk=debug",
        Verbosity::Info | Verbosity::Warning | Verbosity::Error => "warn",
    }
}

fn init_logging(verbosity: Verbosity, env: &EnvSnapshot) {
    let filter = env
        .get("RUST_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default_filter(verbosity)));
    // A second initialization in the same process is a no-op.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Clients;
    use crate::error::ErrorKind;
    use crate::flags::{ArgSpec, FlagSpec};
    use crate::pipeline::Leaf;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::Value;
    use stackit_sdk::{ApiCall, Transport};

    struct NoNetwork;

    #[async_trait]
    impl Transport for NoNetwork {
        async fn send(&self, _call: ApiCall) -> stackit_sdk::Result<Option<Value>> {
            Err(stackit_sdk::SdkError::Unauthenticated)
        }
    }

    struct Factory;

    impl ClientFactory for Factory {
        fn configure(&self, _settings: &ClientSettings) -> Result<Clients> {
            let transport: Arc<dyn Transport> = Arc::new(NoNetwork);
            Ok(Clients::with_transport(&transport))
        }
    }

    #[derive(Clone, Default)]
    struct Seen(Arc<Mutex<Vec<Invocation>>>);

    #[async_trait]
    impl Leaf for Seen {
        async fn run(&self, ctx: &Context, inv: &Invocation) -> Result<()> {
            self.0.lock().push(inv.clone());
            ctx.printer.outputln("ran")
        }
    }

    fn app(seen: &Seen) -> App {
        let root = CommandNode::branch(BIN_NAME, "STACKIT CLI")
            .child(
                CommandNode::branch("kms", "KMS")
                    .child(
                        CommandNode::leaf("describe", "Describe", seen.clone())
                            .arg(ArgSpec::uuid("KEY_ID"))
                            .flag(FlagSpec::uuid("key-ring", "Key ring").required()),
                    )
                    .child(CommandNode::leaf("offline", "No project", seen.clone()).without_project()),
            );
        App::new(EnvSnapshot::default(), Arc::new(Factory), CancellationToken::new())
            .with_root(root)
            .with_config(Config::default())
    }

    const PROJECT: &str = "00000000-0000-0000-0000-000000000001";
    const KEY: &str = "22222222-2222-2222-2222-222222222222";
    const RING: &str = "11111111-1111-1111-1111-111111111111";

    #[tokio::test]
    async fn runs_a_leaf_with_globals_from_any_position() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        let code = app(&seen)
            .run(
                ["stackit", "--project-id", PROJECT, "kms", "describe", KEY, "--key-ring", RING, "-o", "json", "-y"],
                streams,
            )
            .await;
        assert_eq!(code, 0, "{}", capture.err.contents());
        assert_eq!(capture.out.contents(), "ran\n");
        let inv = seen.0.lock().pop().expect("invoked");
        assert_eq!(inv.args, vec![KEY.to_owned()]);
        assert_eq!(inv.globals.project(), PROJECT);
        assert_eq!(inv.globals.output_format, OutputFormat::Json);
        assert!(inv.globals.assume_yes);
        assert_eq!(inv.flags.uuid("key-ring").expect("ok").as_deref(), Some(RING));
    }

    #[tokio::test]
    async fn missing_project_is_reported() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        let code = app(&seen)
            .run(["stackit", "kms", "describe", KEY, "--key-ring", RING], streams)
            .await;
        assert_eq!(code, 1);
        assert_eq!(
            capture.err.contents(),
            format!("Error: {}\n", CliError::ProjectIdMissing)
        );
        assert!(seen.0.lock().is_empty());
    }

    #[tokio::test]
    async fn project_can_come_from_the_environment() {
        let seen = Seen::default();
        let env = EnvSnapshot::from_pairs([("STACKIT_PROJECT_ID", PROJECT)]);
        let mut app = app(&seen);
        app.env = env;
        let (streams, _capture) = Streams::captured();
        let code = app
            .run(["stackit", "kms", "describe", KEY, "--key-ring", RING], streams)
            .await;
        assert_eq!(code, 0);
        assert_eq!(seen.0.lock()[0].globals.project(), PROJECT);
    }

    #[tokio::test]
    async fn constraint_and_argument_errors_precede_project_resolution() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        let code = app(&seen).run(["stackit", "kms", "describe", KEY], streams).await;
        assert_eq!(code, 1);
        assert!(capture.err.contents().contains("required flag(s) \"key-ring\" not set"));

        let (streams, capture) = Streams::captured();
        let code = app(&seen)
            .run(["stackit", "kms", "describe", "nope", "--key-ring", RING], streams)
            .await;
        assert_eq!(code, 1);
        assert!(capture.err.contents().contains("the provided argument \"nope\" is invalid"));
    }

    #[tokio::test]
    async fn leaves_may_opt_out_of_the_project() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        assert_eq!(app(&seen).run(["stackit", "kms", "offline"], streams).await, 0);
        assert_eq!(capture.out.contents(), "ran\n");
    }

    #[tokio::test]
    async fn branches_print_help_and_succeed() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        assert_eq!(app(&seen).run(["stackit", "kms"], streams).await, 0);
        let help = capture.out.contents();
        assert!(help.contains("describe"), "{help}");
        assert!(help.contains("offline"), "{help}");
    }

    #[tokio::test]
    async fn help_and_version_exit_zero_on_stdout() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        assert_eq!(app(&seen).run(["stackit", "--help"], streams).await, 0);
        assert!(capture.out.contents().contains("--project-id"));

        let (streams, capture) = Streams::captured();
        assert_eq!(app(&seen).run(["stackit", "--version"], streams).await, 0);
        assert_eq!(capture.out.contents(), format!("stackit {}\n", env!("CARGO_PKG_VERSION")));
    }

    #[tokio::test]
    async fn usage_errors_exit_two() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        assert_eq!(app(&seen).run(["stackit", "bogus"], streams).await, 2);
        assert!(capture.err.contents().contains("unrecognized subcommand"));
        assert!(capture.out.is_empty());
    }

    #[tokio::test]
    async fn invalid_global_values_are_flag_validation_errors() {
        let seen = Seen::default();
        let (streams, capture) = Streams::captured();
        let code = app(&seen)
            .run(["stackit", "kms", "offline", "--output-format", "xml"], streams)
            .await;
        assert_eq!(code, 1);
        assert!(capture.err.contents().starts_with("Error: the provided flag --output-format is invalid"));
        assert_eq!(
            CliError::flag_validation("output-format", "x").kind(),
            ErrorKind::FlagValidation
        );
    }

    #[test]
    fn debug_verbosity_enables_crate_logs() {
        assert_eq!(default_filter(Verbosity::Debug), "stackit_cli=debug,stackit_sdk=debug");
        assert_eq!(default_filter(Verbosity::Info), "warn");
    }

    #[test]
    fn full_tree_is_consistent() {
        App::new(EnvSnapshot::default(), Arc::new(Factory), CancellationToken::new())
            .command()
            .debug_assert();
    }
}
