//! `stackit` binary entrypoint.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use tokio_util::sync::CancellationToken;

use stackit_cli::{App, EnvSnapshot, HttpClientFactory, Streams};

fn main() -> ExitCode {
    match run() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<u8> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create async runtime")?;

    let cancel = CancellationToken::new();
    let app = App::new(EnvSnapshot::from_process(), Arc::new(HttpClientFactory), cancel.clone()).with_logging();

    let code = runtime.block_on(async {
        let interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupt.cancel();
            }
        });
        app.run(std::env::args_os(), Streams::stdio()).await
    });

    // A prompt blocked on stdin must not keep the process alive.
    runtime.shutdown_background();
    Ok(code)
}
