//! Shared harness for the integration tests: a route-matching fake API and
//! captured process streams.

#![allow(dead_code)]

use std::io::{self, BufRead, Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use stackit_cli::client::ClientSettings;
use stackit_cli::printer::SharedBuffer;
use stackit_cli::{App, ClientFactory, Clients, Config, EnvSnapshot, Streams};
use stackit_sdk::{ApiCall, Method, SdkError, Transport};
use tokio_util::sync::CancellationToken;

pub const PROJECT: &str = "00000000-0000-0000-0000-000000000001";

/// Answers calls by method and path. Unknown routes answer 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<Vec<(Method, String, Result<Value, u16>)>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(self: &Arc<Self>, method: Method, path: &str, body: Value) -> Arc<Self> {
        self.routes.lock().push((method, path.to_owned(), Ok(body)));
        Arc::clone(self)
    }

    pub fn fail(self: &Arc<Self>, method: Method, path: &str, status: u16) -> Arc<Self> {
        self.routes.lock().push((method, path.to_owned(), Err(status)));
        Arc::clone(self)
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn calls_with(&self, method: Method) -> Vec<ApiCall> {
        self.calls().into_iter().filter(|c| c.method == method).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, call: ApiCall) -> stackit_sdk::Result<Option<Value>> {
        self.calls.lock().push(call.clone());
        let routes = self.routes.lock();
        match routes
            .iter()
            .find(|(method, path, _)| *method == call.method && *path == call.path)
        {
            Some((_, _, Ok(body))) => Ok(Some(body.clone())),
            Some((_, _, Err(status))) => Err(SdkError::http(*status, b"")),
            None => Err(SdkError::http(404, br#"{"message":"not found"}"#)),
        }
    }
}

struct FakeFactory(Arc<FakeTransport>);

impl ClientFactory for FakeFactory {
    fn configure(&self, _settings: &ClientSettings) -> stackit_cli::Result<Clients> {
        let transport: Arc<dyn Transport> = self.0.clone();
        Ok(Clients::with_transport(&transport))
    }
}

/// Stdin that records how many bytes the command consumed.
struct CountingInput {
    inner: Cursor<Vec<u8>>,
    consumed: Arc<AtomicUsize>,
}

impl Read for CountingInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.consumed.fetch_add(n, Ordering::SeqCst);
        Ok(n)
    }
}

impl BufRead for CountingInput {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.consumed.fetch_add(amt, Ordering::SeqCst);
        self.inner.consume(amt);
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub code: u8,
    pub stdout: String,
    pub stderr: String,
    pub stdin_consumed: usize,
}

/// Runs `stackit <argv>` against the fake API.
pub async fn run(api: &Arc<FakeTransport>, argv: &[&str], stdin: &str) -> Outcome {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let consumed = Arc::new(AtomicUsize::new(0));
    let input = CountingInput {
        inner: Cursor::new(stdin.as_bytes().to_vec()),
        consumed: Arc::clone(&consumed),
    };
    let streams = Streams::new(Box::new(out.clone()), Box::new(err.clone()), Box::new(input));

    let app = App::new(
        EnvSnapshot::default(),
        Arc::new(FakeFactory(Arc::clone(api))),
        CancellationToken::new(),
    )
    .with_config(Config::default());
    let args = std::iter::once("stackit").chain(argv.iter().copied());
    let code = app.run(args, streams).await;

    Outcome {
        code,
        stdout: out.contents(),
        stderr: err.contents(),
        stdin_consumed: consumed.load(Ordering::SeqCst),
    }
}
