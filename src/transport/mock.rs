use super::{Transport, TransportEvent, TransportPair, TransportSink};
use crate::types::{LinkError, Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Scripted in-process transport for manager tests.
///
/// Each `connect` pops a scripted outcome (accepting by default), hands the
/// manager a sink that records transmitted frames, and keeps the event
/// sender so tests can inject inbound text or close events on the most
/// recent link. Like the production transport, dropping the sink produces no
/// event on the read half; a peer-initiated closure must be injected with
/// [`emit_close`](Self::emit_close).
pub(crate) struct MockTransport {
    refusals: Mutex<VecDeque<()>>,
    dial_delay: Mutex<Option<Duration>>,
    pub sent: Arc<Mutex<Vec<String>>>,
    pub fail_sends: Arc<AtomicBool>,
    pub connect_count: AtomicUsize,
    events: Mutex<Option<mpsc::UnboundedSender<Result<TransportEvent>>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            refusals: Mutex::new(VecDeque::new()),
            dial_delay: Mutex::new(None),
            sent: Arc::new(Mutex::new(Vec::new())),
            fail_sends: Arc::new(AtomicBool::new(false)),
            connect_count: AtomicUsize::new(0),
            events: Mutex::new(None),
        })
    }

    /// Refuse the next `n` connect attempts.
    pub fn refuse_next(&self, n: usize) {
        let mut refusals = self.refusals.lock().unwrap();
        for _ in 0..n {
            refusals.push_back(());
        }
    }

    /// Make every subsequent dial hang for `delay` before completing.
    pub fn delay_connects(&self, delay: Duration) {
        *self.dial_delay.lock().unwrap() = Some(delay);
    }

    /// Inject an inbound text frame on the current link.
    pub fn emit_text(&self, text: impl Into<String>) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(TransportEvent::Text(text.into())));
        }
    }

    /// Inject a close event on the current link.
    pub fn emit_close(&self, code: u16, reason: &str) {
        if let Some(tx) = self.events.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(TransportEvent::Closed {
                code,
                reason: reason.to_string(),
            }));
        }
    }

    /// Dials that ran to completion; a dial dropped mid-flight (timed out or
    /// cancelled) does not count.
    pub fn connects(&self) -> usize {
        self.connect_count.load(Ordering::SeqCst)
    }

    /// Frames transmitted across all links, parsed back from the wire.
    pub fn sent_messages(&self) -> Vec<crate::types::StreamMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("mock captured invalid frame"))
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self, _endpoint: &str) -> Result<TransportPair> {
        let delay = *self.dial_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.connect_count.fetch_add(1, Ordering::SeqCst);
        if self.refusals.lock().unwrap().pop_front().is_some() {
            return Err(LinkError::Connection("connection refused".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.events.lock().unwrap() = Some(tx);

        Ok(TransportPair {
            sink: Box::new(MockSink {
                sent: Arc::clone(&self.sent),
                fail_sends: Arc::clone(&self.fail_sends),
            }),
            stream: UnboundedReceiverStream::new(rx).boxed(),
        })
    }
}

struct MockSink {
    sent: Arc<Mutex<Vec<String>>>,
    fail_sends: Arc<AtomicBool>,
}

#[async_trait]
impl TransportSink for MockSink {
    async fn transmit(&mut self, text: &str) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(LinkError::Connection("send failed".to_string()));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
