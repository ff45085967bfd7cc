//! Client-side call multiplexing.
//!
//! `HttpClient::request` registers a waiter in the pending table and pushes
//! the call onto a queue. A background batcher task collects calls in FIFO
//! order into a chunk, starting when the first call arrives. The chunk is
//! sent once it holds `max_batch_size` calls or `buffer_delay_ms` after its
//! first call, whichever comes first, through the transport on its own task.
//! Results are routed back to their waiters by call id.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::client::error::ClientError;
use crate::client::transport::{HttpTransport, Transport};
use crate::config::ClientConfig;
use crate::dispatch::{CallItem, ResultItem};
use crate::observability::metrics;

type CallResult = Result<Value, ClientError>;
type PendingTable = Arc<DashMap<String, oneshot::Sender<CallResult>>>;

/// Batching RPC client.
///
/// Must be created inside a Tokio runtime. Cloning is cheap and clones
/// share one queue and one pending table.
#[derive(Clone)]
pub struct HttpClient {
    config: Arc<ClientConfig>,
    pending: PendingTable,
    queue: mpsc::UnboundedSender<CallItem>,
}

impl HttpClient {
    /// Client posting batches to `config.endpoint` over HTTP.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = HttpTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Client sending batches through a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Result<Self, ClientError> {
        if config.max_batch_size == 0 {
            return Err(ClientError::Config("max_batch_size must be greater than 0".into()));
        }

        let pending: PendingTable = Arc::new(DashMap::new());
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(batcher_task(
            rx,
            transport,
            Arc::clone(&pending),
            config.buffer_delay(),
            config.max_batch_size,
        ));

        Ok(Self {
            config: Arc::new(config),
            pending,
            queue: tx,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Number of calls still waiting for a result.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Queue a call and return its waiter without blocking.
    ///
    /// The call is sent with the next chunk, at most `buffer_delay_ms` after
    /// that chunk's first call.
    pub fn request(&self, route: impl Into<String>, body: Option<Value>, headers: Option<Value>) -> PendingCall {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id.clone(), tx);

        let call = CallItem {
            id: id.clone(),
            route: route.into(),
            body,
            headers,
        };

        if self.queue.send(call).is_err() {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(ClientError::Closed));
            }
        }

        PendingCall { id, rx }
    }
}

/// Waiter for one queued call. Resolves with the call's result object.
#[derive(Debug)]
pub struct PendingCall {
    id: String,
    rx: oneshot::Receiver<CallResult>,
}

impl PendingCall {
    /// Id the call travels under on the wire.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(ClientError::Closed)))
    }
}

async fn batcher_task(
    mut rx: mpsc::UnboundedReceiver<CallItem>,
    transport: Arc<dyn Transport>,
    pending: PendingTable,
    delay: Duration,
    max_batch_size: usize,
) {
    let mut open = true;
    while open {
        let first = match rx.recv().await {
            Some(call) => call,
            None => break,
        };

        // The first queued call is sent within `delay`, however busy the queue is.
        let flush_at = tokio::time::Instant::now() + delay;
        let mut chunk = vec![first];
        while chunk.len() < max_batch_size {
            match tokio::time::timeout_at(flush_at, rx.recv()).await {
                Ok(Some(call)) => chunk.push(call),
                Ok(None) => {
                    open = false;
                    break;
                }
                Err(_) => break,
            }
        }

        tracing::debug!(calls = chunk.len(), max_batch_size, "Flushing client chunk");
        tokio::spawn(send_chunk(Arc::clone(&transport), Arc::clone(&pending), chunk));
    }

    tracing::debug!("Client batcher stopped");
}

async fn send_chunk(transport: Arc<dyn Transport>, pending: PendingTable, chunk: Vec<CallItem>) {
    let mut ids: HashMap<String, String> = chunk.iter().map(|c| (c.id.clone(), c.route.clone())).collect();
    let size = chunk.len();

    match transport.send(chunk).await {
        Ok(results) => {
            metrics::record_client_chunk("sent", size);
            for item in results {
                if ids.remove(&item.id).is_none() {
                    tracing::debug!(id = %item.id, "Dropping result for unknown call");
                    continue;
                }
                resolve(&pending, item);
            }
            for (id, route) in ids {
                tracing::warn!(id = %id, route = %route, "Batch response carried no result for call");
                reject(&pending, &id, ClientError::MissingResult(id.clone()));
            }
        }
        Err(e) => {
            metrics::record_client_chunk("failed", size);
            tracing::warn!(calls = size, error = %e, "Outbound batch failed");
            let message = e.to_string();
            for id in ids.into_keys() {
                reject(&pending, &id, ClientError::Transport(message.clone()));
            }
        }
    }
}

fn resolve(pending: &PendingTable, item: ResultItem) {
    let Some((_, tx)) = pending.remove(&item.id) else {
        return;
    };
    let outcome = match item.error {
        Some(err) => Err(ClientError::Rpc(err)),
        None => Ok(item.result.unwrap_or(Value::Null)),
    };
    let _ = tx.send(outcome);
}

fn reject(pending: &PendingTable, id: &str, err: ClientError) {
    if let Some((_, tx)) = pending.remove(id) {
        let _ = tx.send(Err(err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::error::TransportError;
    use crate::dispatch::ItemError;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every chunk and answers from a closure.
    struct MockTransport<F> {
        chunks: Mutex<Vec<Vec<CallItem>>>,
        reply: F,
    }

    impl<F> MockTransport<F>
    where
        F: Fn(&[CallItem]) -> Result<Vec<ResultItem>, TransportError> + Send + Sync,
    {
        fn new(reply: F) -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(Vec::new()),
                reply,
            })
        }

        fn chunks(&self) -> Vec<Vec<CallItem>> {
            self.chunks.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl<F> Transport for MockTransport<F>
    where
        F: Fn(&[CallItem]) -> Result<Vec<ResultItem>, TransportError> + Send + Sync,
    {
        async fn send(&self, calls: Vec<CallItem>) -> Result<Vec<ResultItem>, TransportError> {
            let reply = (self.reply)(&calls);
            self.chunks.lock().unwrap().push(calls);
            reply
        }
    }

    fn echo(calls: &[CallItem]) -> Result<Vec<ResultItem>, TransportError> {
        Ok(calls
            .iter()
            .map(|c| ResultItem::success(c.id.clone(), c.route.clone(), c.body.clone().unwrap_or(json!({}))))
            .collect())
    }

    fn config(max_batch_size: usize) -> ClientConfig {
        ClientConfig {
            max_batch_size,
            buffer_delay_ms: 5,
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_calls_share_one_batch_in_order() {
        let transport = MockTransport::new(echo);
        let client = HttpClient::with_transport(config(25), transport.clone()).unwrap();

        let a = client.request("alpha", Some(json!({"n": 1})), None);
        let b = client.request("beta", Some(json!({"n": 2})), None);
        let c = client.request("gamma", None, Some(json!({"auth": "x"})));

        assert_eq!(a.await.unwrap(), json!({"n": 1}));
        assert_eq!(b.await.unwrap(), json!({"n": 2}));
        assert_eq!(c.await.unwrap(), json!({}));

        let chunks = transport.chunks();
        assert_eq!(chunks.len(), 1);
        let routes: Vec<&str> = chunks[0].iter().map(|c| c.route.as_str()).collect();
        assert_eq!(routes, vec!["alpha", "beta", "gamma"]);
        assert_eq!(chunks[0][2].headers, Some(json!({"auth": "x"})));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_queue_is_split_by_max_batch_size() {
        let transport = MockTransport::new(echo);
        let client = HttpClient::with_transport(config(2), transport.clone()).unwrap();

        let waiters: Vec<PendingCall> = (0..5)
            .map(|n| client.request("count", Some(json!({ "n": n })), None))
            .collect();
        for (n, waiter) in waiters.into_iter().enumerate() {
            assert_eq!(waiter.await.unwrap(), json!({ "n": n }));
        }

        let mut sizes: Vec<usize> = transport.chunks().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![1, 2, 2]);
    }

    #[tokio::test]
    async fn test_transport_failure_only_rejects_its_chunk() {
        let transport = MockTransport::new(|calls: &[CallItem]| {
            if calls.iter().any(|c| c.route == "broken") {
                Err(TransportError::Status {
                    status: 502,
                    reason: "Bad Gateway".into(),
                })
            } else {
                echo(calls)
            }
        });
        let client = HttpClient::with_transport(config(1), transport).unwrap();

        let good = client.request("fine", Some(json!({"ok": true})), None);
        let bad = client.request("broken", None, None);

        assert_eq!(good.await.unwrap(), json!({"ok": true}));
        assert_eq!(
            bad.await.unwrap_err(),
            ClientError::Transport("HTTP Error: 502 - Bad Gateway".into())
        );
    }

    #[tokio::test]
    async fn test_error_tuple_rejects_waiter() {
        let transport = MockTransport::new(|calls: &[CallItem]| {
            Ok(calls
                .iter()
                .map(|c| {
                    let mut err = ItemError::internal();
                    err.message = "Not Found".into();
                    err.status = 404;
                    ResultItem::failure(c.id.clone(), c.route.clone(), err)
                })
                .collect())
        });
        let client = HttpClient::with_transport(config(25), transport).unwrap();

        let err = client.request("ghost", None, None).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_unknown_ids_dropped_and_missing_rejected() {
        let transport = MockTransport::new(|calls: &[CallItem]| {
            let mut out = vec![ResultItem::success("stranger".into(), "x".into(), json!({}))];
            out.extend(
                calls
                    .iter()
                    .filter(|c| c.route != "skipped")
                    .map(|c| ResultItem::success(c.id.clone(), c.route.clone(), json!({"seen": true}))),
            );
            Ok(out)
        });
        let client = HttpClient::with_transport(config(25), transport).unwrap();

        let seen = client.request("answered", None, None);
        let skipped = client.request("skipped", None, None);
        let skipped_id = skipped.id().to_string();

        assert_eq!(seen.await.unwrap(), json!({"seen": true}));
        assert_eq!(skipped.await.unwrap_err(), ClientError::MissingResult(skipped_id));
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_calls_after_quiet_period_form_new_batch() {
        let transport = MockTransport::new(echo);
        let client = HttpClient::with_transport(config(25), transport.clone()).unwrap();

        client.request("first", None, None).await.unwrap();
        client.request("second", None, None).await.unwrap();

        assert_eq!(transport.chunks().len(), 2);
    }

    #[tokio::test]
    async fn test_steady_stream_still_flushes() {
        let transport = MockTransport::new(echo);
        let client = HttpClient::with_transport(
            ClientConfig {
                max_batch_size: 100,
                buffer_delay_ms: 20,
                ..ClientConfig::default()
            },
            transport,
        )
        .unwrap();

        let first = client.request("first", None, None);
        let feeder = client.clone();
        let stream = tokio::spawn(async move {
            let mut waiters = Vec::new();
            for _ in 0..60 {
                tokio::time::sleep(Duration::from_millis(5)).await;
                waiters.push(feeder.request("next", None, None));
            }
            waiters
        });

        let resolved = tokio::time::timeout(Duration::from_millis(300), first).await;
        assert!(matches!(resolved, Ok(Ok(_))), "first call waited on the stream: {resolved:?}");

        for waiter in stream.await.unwrap() {
            waiter.await.unwrap();
        }
        assert_eq!(client.pending_calls(), 0);
    }

    #[tokio::test]
    async fn test_full_chunk_sent_before_delay() {
        let transport = MockTransport::new(echo);
        let client = HttpClient::with_transport(
            ClientConfig {
                max_batch_size: 2,
                buffer_delay_ms: 60_000,
                ..ClientConfig::default()
            },
            transport.clone(),
        )
        .unwrap();

        let a = client.request("a", None, None);
        let b = client.request("b", None, None);
        let both = tokio::time::timeout(Duration::from_secs(1), async move { (a.await, b.await) }).await;

        let (a, b) = both.expect("full chunk should not wait for the delay");
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.chunks().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let transport = MockTransport::new(echo);
        let result = HttpClient::with_transport(config(0), transport);
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
