//! SMS request pipeline: dispatch → fetch → compose → send, one task per request.
//!
//! `deliver` is called from the transport's delivery path and returns immediately. Each
//! recognized request runs on its own tokio task; a semaphore caps how many fetch at once, so a
//! flood of requests queues for permits instead of opening unbounded outbound connections.
//! Every request that reaches a task produces exactly one reply attempt. Tasks are tracked so
//! shutdown can wait for in-flight replies instead of dropping them.

use crate::codec::{PayloadCipher, SharedSecret};
use crate::compose;
use crate::dispatch::{self, DecodeMode, Request};
use crate::fetch::ContentFetcher;
use crate::transport::{InboundMessage, SmsTransport};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;

/// Default cap on concurrent fetches.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

const DECODE_REJECTED_DETAIL: &str = "could not decode request";

/// Shared pipeline. Holds no per-request state.
pub struct RequestPipeline {
    cipher: Arc<dyn PayloadCipher>,
    secret: SharedSecret,
    decode_mode: DecodeMode,
    fetcher: ContentFetcher,
    transport: Arc<dyn SmsTransport>,
    permits: Arc<Semaphore>,
    tasks: TaskTracker,
}

impl RequestPipeline {
    pub fn new(
        cipher: Arc<dyn PayloadCipher>,
        secret: SharedSecret,
        decode_mode: DecodeMode,
        fetcher: ContentFetcher,
        transport: Arc<dyn SmsTransport>,
        max_concurrent_fetches: usize,
    ) -> Self {
        Self {
            cipher,
            secret,
            decode_mode,
            fetcher,
            transport,
            permits: Arc::new(Semaphore::new(max_concurrent_fetches.max(1))),
            tasks: TaskTracker::new(),
        }
    }

    /// Accept an inbound message without blocking. Non-protocol messages are ignored and yield
    /// `None`; protocol requests are spawned and their task handle returned.
    pub fn deliver(self: &Arc<Self>, msg: InboundMessage) -> Option<JoinHandle<()>> {
        if dispatch::recognize(&msg.body).is_none() {
            log::debug!("message from {} is not a request, ignoring", msg.sender);
            return None;
        }
        let pipeline = Arc::clone(self);
        Some(self.tasks.spawn(async move {
            pipeline.process(msg).await;
        }))
    }

    /// Number of request tasks still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait up to `limit` for running request tasks to finish. Returns false (after logging)
    /// when some were still pending. Requests delivered afterwards are still spawned.
    pub async fn drain(&self, limit: Duration) -> bool {
        self.tasks.close();
        let pending = self.tasks.len();
        if pending > 0 {
            log::info!("waiting for {} in-flight request(s)", pending);
        }
        let done = tokio::time::timeout(limit, self.tasks.wait()).await.is_ok();
        if !done {
            log::warn!(
                "{} request(s) still pending after {:?}; their replies are lost",
                self.tasks.len(),
                limit
            );
        }
        done
    }

    /// Run one request to completion: decode, fetch, reply.
    pub async fn process(&self, msg: InboundMessage) {
        let request_id = uuid::Uuid::new_v4();
        log::info!("[{}] request from {}", request_id, msg.sender);

        let request = match dispatch::dispatch(
            self.cipher.as_ref(),
            &self.secret,
            &msg,
            self.decode_mode,
        ) {
            Ok(Some(request)) => request,
            Ok(None) => return,
            Err(e) => {
                log::warn!("[{}] rejected: {}", request_id, e);
                let reply = compose::compose_error(DECODE_REJECTED_DETAIL);
                self.send_error_reply(request_id, &msg.sender, &reply).await;
                return;
            }
        };

        self.fetch_and_reply(request_id, request).await;
    }

    async fn fetch_and_reply(&self, request_id: uuid::Uuid, request: Request) {
        // Semaphore is never closed; a missing permit only means the cap is not enforced.
        let permit = self.permits.clone().acquire_owned().await.ok();
        log::debug!("[{}] fetching {}", request_id, request.target_url);
        let result = self.fetcher.fetch(&request.target_url).await;
        drop(permit);

        let payload = compose::outbound(
            self.cipher.as_ref(),
            &self.secret,
            &request.sender,
            &result,
        );
        match compose::send(
            self.transport.as_ref(),
            &payload.destination,
            &payload.encoded_text,
        )
        .await
        {
            Ok(()) => log::info!("[{}] replied to {}", request_id, payload.destination),
            Err(e) => {
                log::warn!("[{}] reply to {} failed: {}", request_id, payload.destination, e);
                let reply = compose::compose_error(&e);
                self.send_error_reply(request_id, &payload.destination, &reply)
                    .await;
            }
        }
    }

    /// Last-resort plain-text reply; failures are only logged.
    async fn send_error_reply(&self, request_id: uuid::Uuid, destination: &str, text: &str) {
        if let Err(e) = compose::send(self.transport.as_ref(), destination, text).await {
            log::error!(
                "[{}] failed to send error reply to {}: {}",
                request_id,
                destination,
                e
            );
        }
    }
}
