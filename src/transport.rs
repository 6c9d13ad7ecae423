//! HTTP capability used to reach the bridge.

use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};

use log::{debug, trace};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

// =============================================================================
// Request / Response
// =============================================================================

/// HTTP method of a bridge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `GET`
    Get,
    /// `POST`
    Post,
}

/// How a request is dispatched relative to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Block the caller until the response arrives or the timeout expires.
    Blocking,
    /// Return immediately; the result handler runs when the response arrives.
    Background,
}

/// An outbound bridge request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// JSON body, if any.
    pub body: Option<serde_json::Value>,
}

/// A response received from the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl Response {
    /// Whether the bridge answered with 200.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// What a result handler observes for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A response arrived, with whatever status.
    Response(Response),
    /// No response: connection error, timeout, or a body read failure.
    Failed(String),
}

impl Outcome {
    /// The response body if the status was 200 and the body is non-empty.
    pub fn ok_body(&self) -> Option<&[u8]> {
        match self {
            Outcome::Response(response) if response.is_ok() && !response.body.is_empty() => {
                Some(&response.body)
            }
            _ => None,
        }
    }
}

/// Callback invoked with the outcome of a request.
pub type ResultHandler = Box<dyn FnOnce(Outcome) + Send + 'static>;

/// A result handler that drops the outcome.
pub fn ignore() -> ResultHandler {
    Box::new(|_| {})
}

/// Handle for a dispatched request.
///
/// Blocking requests hand back an already finished handle. Dropping the
/// handle does not cancel anything.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    done: Arc<AtomicBool>,
}

impl PendingRequest {
    /// A handle for a request that has already completed.
    pub fn completed() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A handle that finishes once [`PendingRequest::finish`] is called on a clone.
    pub fn in_flight() -> Self {
        Self {
            done: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the request as completed.
    pub fn finish(&self) {
        self.done.store(true, Ordering::SeqCst);
    }

    /// Whether the result handler has run.
    pub fn is_finished(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Capability for issuing bridge requests.
///
/// Implementations must never surface network failures as panics or errors
/// to the caller; they report them through the handler as
/// [`Outcome::Failed`].
pub trait Transport: Send + Sync {
    /// Issue `request` and deliver its outcome to `on_result`.
    ///
    /// With [`Dispatch::Blocking`] the handler has run by the time this
    /// returns.
    fn execute(&self, request: Request, dispatch: Dispatch, on_result: ResultHandler) -> PendingRequest;
}

// =============================================================================
// HttpTransport
// =============================================================================

/// [`Transport`] backed by `reqwest`.
///
/// Background requests run on a small runtime owned by the transport, so
/// their handlers execute on that runtime's worker thread.
///
/// Blocking requests issued from inside an async context, including from a
/// background handler, run on a short-lived thread of their own instead of
/// re-entering a runtime.
pub struct HttpTransport {
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport that applies `timeout` to every request.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Http`](crate::BridgeError::Http) if the HTTP client cannot be built
    /// - [`BridgeError::Runtime`](crate::BridgeError::Runtime) if the worker runtime fails to start
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("kraken-bridge-http")
            .enable_all()
            .build()?;
        Ok(Self {
            client,
            runtime,
            timeout,
        })
    }

    /// Create a transport using the timeout from `config`.
    pub fn from_config(config: &BridgeConfig) -> Result<Self> {
        Self::new(config.timeout())
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: Request, dispatch: Dispatch, on_result: ResultHandler) -> PendingRequest {
        let client = self.client.clone();
        match dispatch {
            Dispatch::Blocking => {
                let outcome = if tokio::runtime::Handle::try_current().is_ok() {
                    self.perform_detached(request)
                } else {
                    self.runtime.block_on(perform(client, request))
                };
                on_result(outcome);
                PendingRequest::completed()
            }
            Dispatch::Background => {
                let pending = PendingRequest::in_flight();
                let handle = pending.clone();
                self.runtime.spawn(async move {
                    let outcome = perform(client, request).await;
                    on_result(outcome);
                    handle.finish();
                });
                pending
            }
        }
    }
}

impl HttpTransport {
    fn perform_detached(&self, request: Request) -> Outcome {
        let timeout = self.timeout;
        thread::scope(|scope| {
            let worker = scope.spawn(move || {
                let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
                let client = reqwest::Client::builder().timeout(timeout).build()?;
                Ok::<_, BridgeError>(runtime.block_on(perform(client, request)))
            });
            match worker.join() {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => Outcome::Failed(e.to_string()),
                Err(_) => Outcome::Failed("request thread panicked".to_string()),
            }
        })
    }
}

async fn perform(client: reqwest::Client, request: Request) -> Outcome {
    trace!("{:?} {}", request.method, request.url);

    let builder = match request.method {
        Method::Get => client.get(&request.url),
        Method::Post => client.post(&request.url),
    };
    let builder = builder
        .header(ACCEPT, "application/json")
        .header(CONTENT_TYPE, "application/json");
    let builder = match &request.body {
        Some(body) => builder.json(body),
        None => builder,
    };

    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("request to {} failed: {}", request.url, e);
            return Outcome::Failed(e.to_string());
        }
    };

    let status = response.status().as_u16();
    match response.bytes().await {
        Ok(body) => Outcome::Response(Response {
            status,
            body: body.to_vec(),
        }),
        Err(e) => {
            debug!("reading response from {} failed: {}", request.url, e);
            Outcome::Failed(e.to_string())
        }
    }
}
