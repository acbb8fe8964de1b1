use anyhow::Result;
use std::future::Future;
use std::pin::Pin;

use crate::languages::Language;

mod gemini;
mod google;

pub use gemini::GeminiTranslate;
pub use google::GoogleTranslate;

pub type BatchFuture = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send>>;
pub type EnhancedFuture = Pin<Box<dyn Future<Output = Result<Option<String>>> + Send>>;

/// Batched translation endpoint: one request per batch, translations
/// index-aligned with the input texts.
pub trait BatchTranslator: Send + Sync {
    fn translate_batch(&self, texts: Vec<String>, target: Language) -> BatchFuture;
}

/// Context-aware translation endpoint driven by an instruction prompt.
/// Returns `None` when the endpoint produced no usable text; callers fall
/// back to the batched path.
pub trait EnhancedTranslator: Send + Sync {
    fn translate_enhanced(&self, text: String, instruction: String) -> EnhancedFuture;
}

/// Instruction prompt handed to the enhanced endpoint.
pub fn enhanced_instruction(text: &str, target: Language) -> String {
    format!(
        "Translate the following text into {}. Keep the meaning intact and \
         make the result read naturally. Reply with the translation only, \
         with no explanation.\n\n{}",
        target.english_name(),
        text
    )
}
