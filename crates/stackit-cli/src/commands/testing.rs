//! In-memory API used by the command tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use stackit_sdk::{ApiCall, Method, SdkError, Transport};
use tokio_util::sync::CancellationToken;

use crate::app::App;
use crate::client::{ClientFactory, ClientSettings, Clients};
use crate::config::{Config, EnvSnapshot};
use crate::error::Result;
use crate::printer::Streams;

pub const PROJECT: &str = "00000000-0000-0000-0000-000000000001";

#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Empty,
    Status(u16),
}

struct Route {
    method: Method,
    path: String,
    replies: VecDeque<Reply>,
}

/// Answers calls by exact method and path. The last reply of a route
/// repeats; unknown routes answer 404.
#[derive(Default)]
pub struct Stub {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<ApiCall>>,
}

impl Stub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn on(self: &Arc<Self>, method: Method, path: &str, reply: Reply) -> Arc<Self> {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.replies.push_back(reply),
            None => routes.push(Route {
                method,
                path: path.to_owned(),
                replies: VecDeque::from([reply]),
            }),
        }
        Arc::clone(self)
    }

    pub fn json(self: &Arc<Self>, method: Method, path: &str, body: Value) -> Arc<Self> {
        self.on(method, path, Reply::Json(body))
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }

    pub fn body(&self, method: Method, path: &str) -> Option<Value> {
        self.calls
            .lock()
            .iter()
            .rev()
            .find(|c| c.method == method && c.path == path)
            .and_then(|c| c.body.clone())
    }
}

#[async_trait]
impl Transport for Stub {
    async fn send(&self, call: ApiCall) -> stackit_sdk::Result<Option<Value>> {
        self.calls.lock().push(call.clone());
        let reply = {
            let mut routes = self.routes.lock();
            routes
                .iter_mut()
                .find(|r| r.method == call.method && r.path == call.path)
                .and_then(|route| {
                    if route.replies.len() > 1 {
                        route.replies.pop_front()
                    } else {
                        route.replies.front().cloned()
                    }
                })
        };
        match reply {
            Some(Reply::Json(value)) => Ok(Some(value)),
            Some(Reply::Empty) => Ok(None),
            Some(Reply::Status(status)) => Err(SdkError::http(status, b"")),
            None => Err(SdkError::http(404, b"")),
        }
    }
}

struct StubFactory(Arc<Stub>);

impl ClientFactory for StubFactory {
    fn configure(&self, _settings: &ClientSettings) -> Result<Clients> {
        let transport: Arc<dyn Transport> = self.0.clone();
        Ok(Clients::with_transport(&transport))
    }
}

#[derive(Debug)]
pub struct Outcome {
    pub code: u8,
    pub out: String,
    pub err: String,
}

/// Runs `stackit <argv>` against the stub with the given stdin.
pub async fn run(stub: &Arc<Stub>, argv: &[&str], stdin: &str) -> Outcome {
    let (streams, capture) = Streams::captured_with_input(stdin);
    let app = App::new(
        EnvSnapshot::default(),
        Arc::new(StubFactory(Arc::clone(stub))),
        CancellationToken::new(),
    )
    .with_config(Config::default());
    let args = std::iter::once("stackit").chain(argv.iter().copied());
    let code = app.run(args, streams).await;
    Outcome {
        code,
        out: capture.out.contents(),
        err: capture.err.contents(),
    }
}
