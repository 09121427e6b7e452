use std::path::Path;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    batch::{pack_token_ids, SentenceBatch, TokenBatch},
    config::SentenceBertConfig,
    error::{EmbedError, TransformerLoadError},
    models::bert::{BertConfig, BertModel},
    utils::load_config,
};

/// The encoder of a sentence-transformers model together with the tokenizer
/// that feeds it.
pub struct Transformer {
    model: BertModel,
    tokenizer: Tokenizer,
    pad_token_id: u32,
    do_lower_case: bool,
    device: Device,
}

impl Transformer {
    pub fn load(
        vb: VarBuilder,
        config_filename: &Path,
        tokenizer_filename: &Path,
        sbert_config: &SentenceBertConfig,
    ) -> Result<Self, TransformerLoadError> {
        let config = load_config::<BertConfig>(config_filename)?;
        let device = vb.device().clone();
        let model = BertModel::load(vb, &config)?;

        let mut tokenizer = Tokenizer::from_file(tokenizer_filename)?;
        tokenizer
            .with_padding(None)
            .with_truncation(Some(TruncationParams {
                max_length: sbert_config.max_seq_length,
                ..Default::default()
            }))?;

        Ok(Self {
            model,
            tokenizer,
            pad_token_id: config.pad_token_id as u32,
            do_lower_case: sbert_config.do_lower_case,
            device,
        })
    }

    /// Tokenize every sentence of the batch and pack them into one
    /// [`TokenBatch`], row `i` holding sentence `i`.
    pub fn tokenize(&self, batch: &SentenceBatch) -> Result<TokenBatch, EmbedError> {
        let inputs = batch
            .iter()
            .map(|s| {
                if self.do_lower_case {
                    s.to_lowercase()
                } else {
                    s.to_owned()
                }
            })
            .collect::<Vec<String>>();

        let token_ids = self
            .tokenizer
            .encode_batch(inputs, true)?
            .iter()
            .map(|enc| enc.get_ids().to_vec())
            .collect::<Vec<Vec<u32>>>();

        Ok(pack_token_ids(token_ids, self.pad_token_id, &self.device)?)
    }

    /// Token embeddings of the last layer, `(bsz, seq_len, hidden_size)`.
    pub fn forward(&self, batch: &TokenBatch) -> Result<Tensor, EmbedError> {
        Ok(self.model.forward(batch)?)
    }
}
