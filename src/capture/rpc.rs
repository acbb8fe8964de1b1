//! Abstract request/response relay for the capture and OCR collaborators,
//! independent of any concrete transport.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

pub const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq)]
pub enum RpcRequest {
    /// Screenshot of the currently visible region, from the window identity
    /// the relay was opened for.
    CaptureVisibleRegion,
    /// OCR pass over an encoded image (data URI or bare base64 PNG).
    Recognize { image_data: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RpcResponse {
    Captured { image_data: String },
    Recognized { lines: Vec<RecognizedLine> },
}

/// One OCR line: text plus its quadrilateral bounding box, vertex order
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLine {
    pub text: String,
    pub bounding_box: [[f32; 2]; 4],
}

pub type RpcFuture = Pin<Box<dyn Future<Output = Result<RpcResponse>> + Send>>;

pub trait RpcClient: Send + Sync {
    fn request(&self, request: RpcRequest) -> RpcFuture;
}

/// Sends a request and enforces the relay timeout.
pub async fn request_with_timeout(
    client: &dyn RpcClient,
    request: RpcRequest,
) -> Result<RpcResponse> {
    match tokio::time::timeout(RPC_TIMEOUT, client.request(request)).await {
        Ok(response) => response,
        Err(_) => Err(anyhow!(
            "relay request timed out after {}s",
            RPC_TIMEOUT.as_secs()
        )),
    }
}

pub type RpcEnvelope = (RpcRequest, oneshot::Sender<Result<RpcResponse>>);

/// Channel-backed relay: requests are shipped over an mpsc channel together
/// with a correlation sender the serving side answers on. Backs tests and
/// in-process hosts; real hosts can put IPC behind the same trait.
#[derive(Clone)]
pub struct ChannelRpc {
    outbound: mpsc::UnboundedSender<RpcEnvelope>,
}

impl ChannelRpc {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RpcEnvelope>) {
        let (outbound, inbound) = mpsc::unbounded_channel();
        (Self { outbound }, inbound)
    }
}

impl RpcClient for ChannelRpc {
    fn request(&self, request: RpcRequest) -> RpcFuture {
        let outbound = self.outbound.clone();
        Box::pin(async move {
            let (responder, receiver) = oneshot::channel();
            outbound
                .send((request, responder))
                .map_err(|_| anyhow!("relay is closed"))?;
            receiver
                .await
                .map_err(|_| anyhow!("relay dropped the request"))?
        })
    }
}
