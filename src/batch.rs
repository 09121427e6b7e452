use candle_core::{Device, Tensor};
use tracing::debug;

use crate::error::{InvalidInputError, TokenBatchError};

/// An ordered, non-empty list of sentences handed to an embedding provider in
/// a single call. The first sentence is the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceBatch {
    sentences: Vec<String>,
}

impl SentenceBatch {
    pub fn assemble<S: AsRef<str>>(sentences: &[S]) -> Result<Self, InvalidInputError> {
        if sentences.is_empty() {
            return Err(InvalidInputError::EmptyBatch);
        }

        Ok(Self {
            sentences: sentences.iter().map(|s| s.as_ref().to_owned()).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn reference(&self) -> &str {
        &self.sentences[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.sentences.iter().map(String::as_str)
    }

    pub fn as_strs(&self) -> Vec<&str> {
        self.iter().collect()
    }
}

impl TryFrom<Vec<String>> for SentenceBatch {
    type Error = InvalidInputError;

    fn try_from(sentences: Vec<String>) -> Result<Self, Self::Error> {
        if sentences.is_empty() {
            return Err(InvalidInputError::EmptyBatch);
        }
        Ok(Self { sentences })
    }
}

/// Every sentence of one call, stacked along the leading dimension.
/// Row `i` of each tensor belongs to sentence `i`.
pub struct TokenBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
}

impl TokenBatch {
    /// `(sentences, padded sequence length)`
    pub fn dims(&self) -> Result<(usize, usize), TokenBatchError> {
        Ok(self.input_ids.dims2()?)
    }
}

/// Pad the tokenized sentences to a common length and stack them into a
/// single [`TokenBatch`]. The common length is the longest sentence rounded
/// up to a multiple of 8 for better GPU utilization. Input order is kept.
pub fn pack_token_ids(
    token_ids: Vec<Vec<u32>>,
    pad_token_id: u32,
    device: &Device,
) -> Result<TokenBatch, TokenBatchError> {
    let Some(longest) = token_ids.iter().map(Vec::len).max() else {
        return Err(TokenBatchError::EmptyBatch);
    };
    let seq_len = 8 * longest.div_ceil(8).max(1);
    let n_sentences = token_ids.len();

    let mut input_ids = Vec::with_capacity(n_sentences * seq_len);
    let mut attention_mask = Vec::with_capacity(n_sentences * seq_len);

    for mut ids in token_ids {
        // attention mask first, since it depends on len of input_ids before padding
        attention_mask.extend((0..seq_len).map(|i| u32::from(i < ids.len())));

        ids.resize(seq_len, pad_token_id);
        input_ids.extend(ids);
    }

    let shape = (n_sentences, seq_len);
    let input_ids = Tensor::from_vec(input_ids, shape, device)?;
    let attention_mask = Tensor::from_vec(attention_mask, shape, device)?;
    let token_type_ids = input_ids.zeros_like()?;

    debug!(sentences = n_sentences, seq_len, "packed token batch");

    Ok(TokenBatch {
        input_ids,
        attention_mask,
        token_type_ids,
    })
}
