//! Typed access to the bridge endpoints.

use crate::config::BridgeConfig;
use crate::encoding::encode_bytes;
use crate::error::{BridgeError, Result};
use crate::gif::GifPayload;
use crate::pipeline::FramePayload;
use crate::transport::{Dispatch, Method, Outcome, PendingRequest, Request, ResultHandler, Transport, ignore};

use log::{debug, warn};
use serde::Serialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc;

/// Bridge client bound to one bridge address.
///
/// Cheap to clone; clones share the transport.
#[derive(Clone)]
pub struct BridgeClient {
    transport: Arc<dyn Transport>,
    config: BridgeConfig,
}

impl fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BridgeClient {
    /// Create a client that sends through `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: BridgeConfig) -> Self {
        Self { transport, config }
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Issue a `GET`.
    pub fn get(&self, url: &str, on_result: ResultHandler, dispatch: Dispatch) -> PendingRequest {
        let request = Request {
            method: Method::Get,
            url: url.to_string(),
            body: None,
        };
        self.transport.execute(request, dispatch, on_result)
    }

    /// Issue a `POST` with a JSON body.
    ///
    /// A body that fails to serialize is reported to `on_result` as a failed
    /// outcome, like any other dropped request.
    pub fn post<T>(&self, url: &str, on_result: ResultHandler, body: &T, dispatch: Dispatch) -> PendingRequest
    where
        T: Serialize + ?Sized,
    {
        let body = match serde_json::to_value(body) {
            Ok(body) => body,
            Err(e) => {
                warn!("dropping request to {}: {}", url, e);
                on_result(Outcome::Failed(e.to_string()));
                return PendingRequest::completed();
            }
        };
        let request = Request {
            method: Method::Post,
            url: url.to_string(),
            body: Some(body),
        };
        self.transport.execute(request, dispatch, on_result)
    }

    /// Blocking `GET` of an image, returned as base64 text.
    ///
    /// # Errors
    ///
    /// [`BridgeError::Fetch`] if the status is not 200. A request that never
    /// got a response reports status 0.
    pub fn download_image(&self, url: &str) -> Result<String> {
        let (tx, rx) = mpsc::channel();
        self.get(
            url,
            Box::new(move |outcome| {
                let _ = tx.send(outcome);
            }),
            Dispatch::Blocking,
        );

        match rx.try_recv() {
            Ok(Outcome::Response(response)) if response.is_ok() => Ok(encode_bytes(&response.body)),
            Ok(Outcome::Response(response)) => Err(BridgeError::Fetch {
                status: response.status,
            }),
            Ok(Outcome::Failed(_)) | Err(_) => Err(BridgeError::Fetch { status: 0 }),
        }
    }

    /// `POST /frame`.
    pub fn send_frame(&self, payload: &FramePayload, dispatch: Dispatch) -> PendingRequest {
        debug!("sending frame ({} bytes encoded, {:?})", payload.raw.len(), dispatch);
        self.post(&self.config.endpoint("/frame"), ignore(), payload, dispatch)
    }

    /// `POST /gif`, blocking.
    pub fn start_gif(&self, payload: &GifPayload) -> PendingRequest {
        self.post(&self.config.endpoint("/gif"), ignore(), payload, Dispatch::Blocking)
    }

    /// `POST /gif/config` in the background.
    pub fn configure_gif(&self, payload: &GifPayload) -> PendingRequest {
        self.post(&self.config.endpoint("/gif/config"), ignore(), payload, Dispatch::Background)
    }

    /// `POST /gif/stop`, blocking.
    pub fn stop_gif(&self) -> PendingRequest {
        self.post(&self.config.endpoint("/gif/stop"), ignore(), &json!({}), Dispatch::Blocking)
    }

    /// `POST /brightness`, blocking.
    pub fn set_brightness(&self, brightness: u8) -> PendingRequest {
        self.post(
            &self.config.endpoint("/brightness"),
            ignore(),
            &json!({ "brightness": brightness }),
            Dispatch::Blocking,
        )
    }

    /// `GET /` in the background.
    pub fn probe(&self, on_result: ResultHandler) -> PendingRequest {
        self.get(&self.config.endpoint("/"), on_result, Dispatch::Background)
    }

    /// Icon shown for the discovery service.
    pub fn icon_url(&self) -> String {
        self.config.endpoint("/images/plugin.png")
    }
}
