//! Deduplicating, batching translation cache.
//!
//! `translate` is infallible at its boundary: after the bounded retries are
//! exhausted the original text comes back unchanged.

mod batch;
mod filter;
mod retry;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

pub use filter::should_skip_translation;
pub use retry::RetryPolicy;

use crate::languages::Language;
use crate::notify::{NoticeKind, Notifier};
use crate::providers::{enhanced_instruction, BatchTranslator, EnhancedTranslator};
use batch::BatchQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMode {
    /// Batched endpoint, deduplicated through the shared queue.
    Direct,
    /// Context-aware endpoint first, batched path as fallback.
    Enhanced,
}

impl TranslationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMode::Direct => "direct",
            TranslationMode::Enhanced => "enhanced",
        }
    }

    pub fn parse(value: &str) -> Option<TranslationMode> {
        match value.trim().to_lowercase().as_str() {
            "direct" => Some(TranslationMode::Direct),
            "enhanced" => Some(TranslationMode::Enhanced),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    text: String,
    target: Language,
    mode: TranslationMode,
}

struct CacheEntry {
    text: String,
    timestamp: Instant,
}

pub struct TranslationService {
    batch_endpoint: Arc<dyn BatchTranslator>,
    enhanced_endpoint: Arc<dyn EnhancedTranslator>,
    queue: Arc<BatchQueue>,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    retry: RetryPolicy,
    notifier: Arc<dyn Notifier>,
}

impl TranslationService {
    pub fn new(
        batch_endpoint: Arc<dyn BatchTranslator>,
        enhanced_endpoint: Arc<dyn EnhancedTranslator>,
        retry: RetryPolicy,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            batch_endpoint,
            enhanced_endpoint,
            queue: Arc::new(BatchQueue::new()),
            cache: Mutex::new(HashMap::new()),
            retry,
            notifier,
        }
    }

    /// Resolves a translation for `text`, or returns `text` unchanged after
    /// the retry budget is spent. Cache hits never touch the network.
    pub async fn translate(
        &self,
        text: &str,
        target: Language,
        mode: TranslationMode,
    ) -> String {
        let text = text.trim();
        if text.is_empty() {
            return String::new();
        }

        let key = CacheKey {
            text: text.to_string(),
            target,
            mode,
        };
        if let Some(hit) = self.cache_lookup(&key) {
            return hit;
        }

        for attempt in 1..=self.retry.max_attempts {
            match self.translate_once(text, target, mode).await {
                Ok(translated) => {
                    self.cache_store(key, translated.clone());
                    return translated;
                }
                Err(err) => {
                    debug!("translation attempt {} failed: {}", attempt, err);
                    if attempt < self.retry.max_attempts {
                        self.retry.wait("translation", attempt).await;
                    }
                }
            }
        }

        text.to_string()
    }

    async fn translate_once(
        &self,
        text: &str,
        target: Language,
        mode: TranslationMode,
    ) -> Result<String> {
        if mode == TranslationMode::Enhanced {
            let instruction = enhanced_instruction(text, target);
            match self
                .enhanced_endpoint
                .translate_enhanced(text.to_string(), instruction)
                .await
            {
                Ok(Some(translated)) => return Ok(translated),
                Ok(None) => {
                    debug!("enhanced endpoint returned no text; using batched path");
                }
                Err(err) => {
                    self.notifier
                        .notify(NoticeKind::Error, "AI translation failed. Please try again.");
                    debug!("enhanced endpoint error: {}; using batched path", err);
                }
            }
        }

        let receiver = BatchQueue::submit(
            &self.queue,
            text.to_string(),
            target,
            Arc::clone(&self.batch_endpoint),
            Arc::clone(&self.notifier),
        );
        receiver
            .await
            .map_err(|_| anyhow!("translation request dropped"))?
    }

    fn cache_lookup(&self, key: &CacheKey) -> Option<String> {
        let cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
        cache.get(key).map(|entry| {
            debug!(
                "translation cache hit (age {:?})",
                entry.timestamp.elapsed()
            );
            entry.text.clone()
        })
    }

    fn cache_store(&self, key: CacheKey, text: String) {
        let mut cache = self.cache.lock().unwrap_or_else(|err| err.into_inner());
        cache.insert(
            key,
            CacheEntry {
                text,
                timestamp: Instant::now(),
            },
        );
    }

    /// Drops every cached entry. Invoked on language switch, mode toggle and
    /// scroll-triggered resets; there is no per-entry TTL.
    pub fn clear_cache(&self) {
        self.cache
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .clear();
    }

    /// Full reset for stop: clears the cache and rejects queued requests.
    pub fn reset(&self) {
        self.clear_cache();
        self.queue.clear();
    }
}
