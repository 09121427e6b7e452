//! BERT encoder for sentence-transformers checkpoints (MiniLM, LaBSE and
//! friends). Dropout and the pooler head are omitted: only inference over the
//! last hidden state is needed.

use candle_core::{DType, Module, Result, Tensor, D};
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};
use serde::Deserialize;

use crate::{activation::Activation, batch::TokenBatch};

pub const DTYPE: DType = DType::F32;

// https://github.com/huggingface/transformers/blob/main/src/transformers/models/bert/configuration_bert.py
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BertConfig {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub hidden_act: Activation,
    pub max_position_embeddings: usize,
    pub type_vocab_size: usize,
    pub layer_norm_eps: f64,
    #[serde(default)]
    pub pad_token_id: usize,
    pub model_type: Option<String>,
}

impl BertConfig {
    fn head_size(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }
}

struct BertEmbeddings {
    word_embeddings: Embedding,
    position_embeddings: Embedding,
    token_type_embeddings: Embedding,
    layer_norm: LayerNorm,
    span: tracing::Span,
}

impl BertEmbeddings {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        Ok(Self {
            word_embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("word_embeddings"),
            )?,
            position_embeddings: embedding(
                config.max_position_embeddings,
                config.hidden_size,
                vb.pp("position_embeddings"),
            )?,
            token_type_embeddings: embedding(
                config.type_vocab_size,
                config.hidden_size,
                vb.pp("token_type_embeddings"),
            )?,
            layer_norm: layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            span: tracing::span!(tracing::Level::TRACE, "BertEmbeddings"),
        })
    }

    fn forward(&self, input_ids: &Tensor, token_type_ids: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let (_bsz, seq_len) = input_ids.dims2()?;
        let position_ids = Tensor::arange(0u32, seq_len as u32, input_ids.device())?;

        let embeddings = (self.word_embeddings.forward(input_ids)?
            + self.token_type_embeddings.forward(token_type_ids)?)?
            .broadcast_add(&self.position_embeddings.forward(&position_ids)?)?;

        self.layer_norm.forward(&embeddings)
    }
}

struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    layer_norm: LayerNorm,
    num_heads: usize,
    head_size: usize,
    span: tracing::Span,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        let hidden = config.hidden_size;
        let all_heads = config.num_attention_heads * config.head_size();

        Ok(Self {
            query: linear(hidden, all_heads, vb.pp("self.query"))?,
            key: linear(hidden, all_heads, vb.pp("self.key"))?,
            value: linear(hidden, all_heads, vb.pp("self.value"))?,
            output: linear(all_heads, hidden, vb.pp("output.dense"))?,
            layer_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("output.LayerNorm"))?,
            num_heads: config.num_attention_heads,
            head_size: config.head_size(),
            span: tracing::span!(tracing::Level::TRACE, "SelfAttention"),
        })
    }

    /// (bsz, seq_len, hidden) -> (bsz, num_heads, seq_len, head_size)
    fn split_heads(&self, xs: &Tensor) -> Result<Tensor> {
        let (bsz, seq_len, _) = xs.dims3()?;
        xs.reshape((bsz, seq_len, self.num_heads, self.head_size))?
            .transpose(1, 2)?
            .contiguous()
    }

    fn forward(&self, hidden_states: &Tensor, attention_bias: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();

        let query = self.split_heads(&self.query.forward(hidden_states)?)?;
        let key = self.split_heads(&self.key.forward(hidden_states)?)?;
        let value = self.split_heads(&self.value.forward(hidden_states)?)?;

        let scale = 1.0 / (self.head_size as f64).sqrt();
        let scores = (query.matmul(&key.t()?)? * scale)?.broadcast_add(attention_bias)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;

        // (bsz, num_heads, seq_len, head_size) -> (bsz, seq_len, hidden)
        let context = probs.matmul(&value)?.transpose(1, 2)?.flatten_from(D::Minus2)?;

        let attended = self.output.forward(&context)?;
        self.layer_norm.forward(&(attended + hidden_states)?)
    }
}

struct FeedForward {
    intermediate: Linear,
    activation: Activation,
    output: Linear,
    layer_norm: LayerNorm,
    span: tracing::Span,
}

impl FeedForward {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        Ok(Self {
            intermediate: linear(
                config.hidden_size,
                config.intermediate_size,
                vb.pp("intermediate.dense"),
            )?,
            activation: config.hidden_act,
            output: linear(
                config.intermediate_size,
                config.hidden_size,
                vb.pp("output.dense"),
            )?,
            layer_norm: layer_norm(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("output.LayerNorm"),
            )?,
            span: tracing::span!(tracing::Level::TRACE, "FeedForward"),
        })
    }
}

impl Module for FeedForward {
    fn forward(&self, hidden_states: &Tensor) -> Result<Tensor> {
        let _enter = self.span.enter();
        let xs = hidden_states
            .apply(&self.intermediate)?
            .apply(&self.activation)?
            .apply(&self.output)?;
        self.layer_norm.forward(&(xs + hidden_states)?)
    }
}

struct EncoderLayer {
    attention: SelfAttention,
    feed_forward: FeedForward,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"), config)?,
            // intermediate and output live side by side under the layer prefix
            feed_forward: FeedForward::load(vb, config)?,
        })
    }

    fn forward(&self, hidden_states: &Tensor, attention_bias: &Tensor) -> Result<Tensor> {
        let attended = self.attention.forward(hidden_states, attention_bias)?;
        self.feed_forward.forward(&attended)
    }
}

pub struct BertModel {
    embeddings: BertEmbeddings,
    layers: Vec<EncoderLayer>,
    span: tracing::Span,
}

impl BertModel {
    /// Sentence-transformers checkpoints store the encoder unprefixed; plain
    /// HF checkpoints nest it under the model type (`bert.`), which is tried
    /// second.
    pub fn load(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        match Self::load_at(vb.clone(), config) {
            Ok(model) => Ok(model),
            Err(err) => match &config.model_type {
                Some(model_type) => Self::load_at(vb.pp(model_type), config).map_err(|_| err),
                None => Err(err),
            },
        }
    }

    fn load_at(vb: VarBuilder, config: &BertConfig) -> Result<Self> {
        let embeddings = BertEmbeddings::load(vb.pp("embeddings"), config)?;
        let layers = (0..config.num_hidden_layers)
            .map(|i| EncoderLayer::load(vb.pp(format!("encoder.layer.{i}")), config))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings,
            layers,
            span: tracing::span!(tracing::Level::TRACE, "BertModel"),
        })
    }

    /// Returns the last hidden state, `(bsz, seq_len, hidden_size)`.
    pub fn forward(&self, batch: &TokenBatch) -> Result<Tensor> {
        let _enter = self.span.enter();

        let mut hidden_states = self
            .embeddings
            .forward(&batch.input_ids, &batch.token_type_ids)?;
        let attention_bias = attention_bias(&batch.attention_mask, hidden_states.dtype())?;

        for layer in self.layers.iter() {
            hidden_states = layer.forward(&hidden_states, &attention_bias)?;
        }

        Ok(hidden_states)
    }
}

/// (bsz, seq_len) mask of 1/0 -> (bsz, 1, 1, seq_len) additive bias of 0/min.
fn attention_bias(attention_mask: &Tensor, dtype: DType) -> Result<Tensor> {
    let mask = attention_mask.unsqueeze(1)?.unsqueeze(1)?.to_dtype(dtype)?;
    // torch.finfo(dtype).min
    (mask.ones_like()? - &mask)? * f64::from(f32::MIN)
}

#[cfg(test)]
mod tests {
    use candle_core::Device;
    use candle_nn::VarMap;

    use super::*;
    use crate::batch::pack_token_ids;

    fn tiny_config() -> BertConfig {
        serde_json::from_str(
            r#"{
                "vocab_size": 16,
                "hidden_size": 8,
                "num_hidden_layers": 2,
                "num_attention_heads": 2,
                "intermediate_size": 12,
                "hidden_act": "gelu",
                "max_position_embeddings": 32,
                "type_vocab_size": 2,
                "layer_norm_eps": 1e-12,
                "model_type": "bert"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn attention_bias_masks_padding() -> Result<()> {
        let mask = Tensor::new(&[[1u32, 1, 0]], &Device::Cpu)?;
        let bias = attention_bias(&mask, DType::F32)?;
        assert_eq!(bias.dims(), &[1, 1, 1, 3]);
        assert_eq!(bias.flatten_all()?.to_vec1::<f32>()?, [0.0, 0.0, f32::MIN]);
        Ok(())
    }

    #[test]
    fn forward_shape_and_padding_independence() -> Result<()> {
        let device = Device::Cpu;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DTYPE, &device);
        let model = BertModel::load(vb, &tiny_config())?;

        let alone = pack_token_ids(vec![vec![1, 5, 2]], 0, &device).map_err(candle_core::Error::wrap)?;
        let together = pack_token_ids(vec![vec![1, 5, 2], vec![1, 3, 4, 6, 7, 8, 9, 10, 11, 2]], 0, &device)
            .map_err(candle_core::Error::wrap)?;

        let alone_out = model.forward(&alone)?;
        let together_out = model.forward(&together)?;
        assert_eq!(alone_out.dims(), &[1, 8, 8]);
        assert_eq!(together_out.dims(), &[2, 16, 8]);

        // real tokens of the first sentence are unaffected by the batch it is packed in
        let a = alone_out.get(0)?.narrow(0, 0, 3)?.to_vec2::<f32>()?;
        let b = together_out.get(0)?.narrow(0, 0, 3)?.to_vec2::<f32>()?;
        for (row_a, row_b) in a.iter().zip(&b) {
            for (x, y) in row_a.iter().zip(row_b) {
                assert!((x - y).abs() < 1e-4, "{x} != {y}");
            }
        }
        Ok(())
    }
}
