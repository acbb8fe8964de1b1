use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::debug;

use crate::languages::Language;
use crate::notify::{NoticeKind, Notifier};
use crate::providers::BatchTranslator;

pub(crate) const BATCH_SIZE: usize = 5;

pub(crate) struct PendingRequest {
    text: String,
    target: Language,
    responder: oneshot::Sender<Result<String>>,
}

/// Shared pending queue drained by a single batch processor task.
///
/// Mutations are synchronous steps that never span an await; the processor
/// flag hands ownership of the drain loop to exactly one task at a time.
pub(crate) struct BatchQueue {
    pending: Mutex<VecDeque<PendingRequest>>,
    draining: AtomicBool,
}

impl BatchQueue {
    pub(crate) fn new() -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    /// Enqueues one text and wakes the processor if it is idle. The returned
    /// receiver resolves when the request's batch completes or fails.
    pub(crate) fn submit(
        queue: &Arc<Self>,
        text: String,
        target: Language,
        endpoint: Arc<dyn BatchTranslator>,
        notifier: Arc<dyn Notifier>,
    ) -> oneshot::Receiver<Result<String>> {
        let (responder, receiver) = oneshot::channel();
        {
            let mut pending = queue.pending.lock().unwrap_or_else(|err| err.into_inner());
            pending.push_back(PendingRequest {
                text,
                target,
                responder,
            });
        }

        if !queue.draining.swap(true, Ordering::AcqRel) {
            let queue = Arc::clone(queue);
            tokio::spawn(async move {
                queue.drain(endpoint, notifier).await;
            });
        }

        receiver
    }

    async fn drain(self: Arc<Self>, endpoint: Arc<dyn BatchTranslator>, notifier: Arc<dyn Notifier>) {
        loop {
            let batch = self.take_batch();
            if batch.is_empty() {
                self.draining.store(false, Ordering::Release);
                // A submit may have raced the flag reset; reclaim the drain
                // if so, otherwise stop.
                let more = {
                    let pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
                    !pending.is_empty()
                };
                if more && !self.draining.swap(true, Ordering::AcqRel) {
                    continue;
                }
                return;
            }

            let texts: Vec<String> = batch.iter().map(|item| item.text.clone()).collect();
            let target = batch[0].target;
            debug!("translating batch of {} ({})", texts.len(), target);

            match endpoint.translate_batch(texts, target).await {
                Ok(translations) => {
                    for (index, item) in batch.into_iter().enumerate() {
                        let translated = translations
                            .get(index)
                            .filter(|value| !value.is_empty())
                            .cloned()
                            .unwrap_or_else(|| item.text.clone());
                        let _ = item.responder.send(Ok(translated));
                    }
                }
                Err(err) => {
                    notifier.notify(NoticeKind::Error, "Translation failed. Please try again.");
                    let message = err.to_string();
                    for item in batch {
                        let _ = item.responder.send(Err(anyhow!(message.clone())));
                    }
                }
            }
        }
    }

    /// Pops up to [`BATCH_SIZE`] requests sharing the front item's target
    /// language, preserving queue order.
    fn take_batch(&self) -> Vec<PendingRequest> {
        let mut pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
        let mut batch = Vec::new();
        while batch.len() < BATCH_SIZE {
            let matches = match pending.front() {
                Some(front) => batch.is_empty() || front.target == batch[0].target,
                None => false,
            };
            if !matches {
                break;
            }
            if let Some(item) = pending.pop_front() {
                batch.push(item);
            }
        }
        batch
    }

    pub(crate) fn clear(&self) {
        let dropped: Vec<PendingRequest> = {
            let mut pending = self.pending.lock().unwrap_or_else(|err| err.into_inner());
            pending.drain(..).collect()
        };
        for item in dropped {
            let _ = item
                .responder
                .send(Err(anyhow!("translation queue was reset")));
        }
    }
}
