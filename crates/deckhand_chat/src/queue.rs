//! Per-session event queues.
//!
//! Each session gets one worker task fed by an unbounded channel, so events of
//! a session are handled in the order they were submitted while different
//! sessions run concurrently. A worker that stays idle for the idle timeout
//! removes itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::dispatcher::Dispatcher;
use crate::types::{IncomingEvent, SessionKey};

/// Default time a worker waits for its next event before exiting.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

type Workers = Arc<Mutex<HashMap<SessionKey, UnboundedSender<IncomingEvent>>>>;

/// Routes events to one FIFO worker per session.
pub struct SessionQueues {
    dispatcher: Arc<Dispatcher>,
    workers: Workers,
    idle_timeout: Duration,
}

impl SessionQueues {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            workers: Arc::new(Mutex::new(HashMap::new())),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Queue an event behind earlier events of the same session. Must be
    /// called from within a tokio runtime.
    pub fn submit(&self, event: IncomingEvent) {
        let key = event.session_key();
        let mut workers = self.workers.lock();

        let event = match workers.get(&key) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                Err(SendError(event)) => event,
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if tx.send(event).is_err() {
            return;
        }
        workers.insert(key, tx);
        debug!("Started worker for {}", key);
        tokio::spawn(run_worker(
            key,
            rx,
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.workers),
            self.idle_timeout,
        ));
    }

    /// Sessions with a live worker.
    pub fn active(&self) -> usize {
        self.workers.lock().len()
    }
}

async fn run_worker(
    key: SessionKey,
    mut rx: UnboundedReceiver<IncomingEvent>,
    dispatcher: Arc<Dispatcher>,
    workers: Workers,
    idle_timeout: Duration,
) {
    loop {
        let event = match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                // Submitters hold the map lock while sending, so nothing can
                // slip in between this check and the removal.
                let next = {
                    let mut map = workers.lock();
                    match rx.try_recv() {
                        Ok(event) => Some(event),
                        Err(_) => {
                            map.remove(&key);
                            None
                        }
                    }
                };
                match next {
                    Some(event) => event,
                    None => break,
                }
            }
        };

        if let Err(e) = dispatcher.handle(event).await {
            warn!("Failed to handle event for {}: {}", key, e);
        }
    }
    debug!("Worker for {} stopped", key);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionSettings, SessionStore};
    use crate::transport::RecordingTransport;
    use crate::types::{ChatId, MessageId, ParentMessage, UserId};
    use deckhand_api::{Method, MockGateway, MockReply, ProviderClient};
    use serde_json::json;

    const CHAT: ChatId = ChatId(1);
    const USER: UserId = UserId(2);

    fn setup() -> (Arc<Dispatcher>, RecordingTransport) {
        let gateway = MockGateway::new().route(
            Method::Get,
            "users",
            MockReply::json(json!({"name": "Ada"})),
        );
        let transport = RecordingTransport::new();
        let dispatcher = Dispatcher::new(
            ProviderClient::new(Arc::new(gateway)),
            Arc::new(transport.clone()),
            Arc::new(SessionStore::new(SessionSettings::default())),
        );
        (Arc::new(dispatcher), transport)
    }

    async fn wait_for(what: impl Fn() -> bool) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !what() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_session_events_keep_submission_order() {
        let (dispatcher, transport) = setup();
        let queues = SessionQueues::new(Arc::clone(&dispatcher));
        let key = SessionKey::new(CHAT, USER);

        for round in 0..10 {
            dispatcher
                .handle(IncomingEvent::command(CHAT, USER, "login", &[]))
                .await
                .unwrap();
            let (prompt, sent) = transport.sent().last().cloned().unwrap();
            let parent = ParentMessage {
                id: prompt,
                text: sent.text,
            };
            let before = transport.sent().len();

            // The key reply and a logout arrive in the same batch.
            queues.submit(
                IncomingEvent::reply(CHAT, USER, "rnd_key", parent).with_message(MessageId(50)),
            );
            queues.submit(IncomingEvent::command(CHAT, USER, "logout", &[]));
            wait_for(|| transport.sent().len() >= before + 2).await;

            let texts: Vec<String> = transport
                .sent()
                .into_iter()
                .skip(before)
                .map(|(_, m)| m.text)
                .collect();
            assert!(texts[0].contains("Logged in"), "round {round}: {texts:?}");
            assert!(texts[1].contains("Logged out"), "round {round}: {texts:?}");
            assert!(!dispatcher.sessions().is_logged_in(key), "round {round}");
        }
    }

    #[tokio::test]
    async fn test_idle_worker_is_removed() {
        let (dispatcher, transport) = setup();
        let queues =
            SessionQueues::new(dispatcher).with_idle_timeout(Duration::from_millis(20));

        queues.submit(IncomingEvent::command(CHAT, USER, "help", &[]));
        queues.submit(IncomingEvent::command(ChatId(9), USER, "help", &[]));
        assert_eq!(queues.active(), 2);

        wait_for(|| transport.sent().len() == 2).await;
        wait_for(|| queues.active() == 0).await;

        queues.submit(IncomingEvent::command(CHAT, USER, "help", &[]));
        wait_for(|| transport.sent().len() == 3).await;
    }
}
