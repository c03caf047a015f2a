use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tiktoken_rs::tokenizer::{get_tokenizer, Tokenizer as Encoding};
use tiktoken_rs::{get_bpe_from_tokenizer, CoreBPE};
use tracing::{debug, warn};

use super::error::OpenAiError;

/// Loaded encodings. Building a `CoreBPE` parses the whole vocabulary, so it happens
/// once per encoding per process.
static ENCODINGS: Lazy<Mutex<HashMap<Encoding, Arc<CoreBPE>>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn encodings() -> Result<MutexGuard<'static, HashMap<Encoding, Arc<CoreBPE>>>, OpenAiError> {
    ENCODINGS
        .lock()
        .map_err(|_| OpenAiError::InvalidConfiguration("Tokenizer cache is poisoned".to_string()))
}

fn load(encoding: Encoding) -> Result<Arc<CoreBPE>, OpenAiError> {
    if let Some(bpe) = encodings()?.get(&encoding) {
        return Ok(bpe.clone());
    }

    // Parsed outside the lock. If two callers race, the first insert wins.
    let bpe = get_bpe_from_tokenizer(encoding).map_err(|e| {
        OpenAiError::InvalidConfiguration(format!("Failed to load {:?} tokenizer: {}", encoding, e))
    })?;
    debug!(?encoding, "Loaded tokenizer");

    Ok(encodings()?.entry(encoding).or_insert_with(|| Arc::new(bpe)).clone())
}

/// Counts tokens the way the configured model will.
#[derive(Clone)]
pub struct Tokenizer {
    model: String,
    encoding: Encoding,
    bpe: Arc<CoreBPE>,
}

impl Tokenizer {
    /// Resolves the encoding for `model`.
    ///
    /// Models unknown to `tiktoken-rs` fall back to `cl100k_base`, the encoding of the
    /// gpt-3.5/gpt-4 families.
    pub fn for_model(model: &str) -> Result<Self, OpenAiError> {
        let encoding = get_tokenizer(model).unwrap_or_else(|| {
            warn!(%model, "No tokenizer registered for model, using cl100k_base");
            Encoding::Cl100kBase
        });
        let bpe = load(encoding)?;
        Ok(Self { model: model.to_string(), encoding, bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_with_special_tokens(text).len()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }
}

impl fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("model", &self.model)
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}
