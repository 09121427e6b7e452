use std::path::Path;

use candle_core::{Tensor, D};
use serde::Deserialize;

use crate::{
    error::{PoolerFromConfigError, PoolingError},
    utils::load_config,
};

/// Value written into masked positions before max pooling.
const MASKED_MAX_FILL: f64 = -1e9;

#[derive(Deserialize, Debug, Clone)]
pub struct PoolingConfig {
    pub word_embedding_dimension: usize,
    #[serde(default)]
    pub pooling_mode_cls_token: bool,
    #[serde(default)]
    pub pooling_mode_mean_tokens: bool,
    #[serde(default)]
    pub pooling_mode_max_tokens: bool,
    #[serde(default)]
    pub pooling_mode_mean_sqrt_len_tokens: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolingStrategy {
    Cls,
    Mean,
    Max,
    MeanSqrtLenTokens,
}

impl PoolingStrategy {
    /// `token_embeddings` is `(batch, seq_len, hidden)`, `attn_mask` is
    /// `(batch, seq_len)`. Returns `(batch, hidden)`.
    pub fn pool(&self, token_embeddings: &Tensor, attn_mask: &Tensor) -> Result<Tensor, PoolingError> {
        let res = match self {
            PoolingStrategy::Cls => token_embeddings.get_on_dim(1, 0)?.contiguous()?,
            PoolingStrategy::Max => {
                let mask = expand_mask(attn_mask, token_embeddings)?;
                // push padding far below any real activation so it never wins
                let fill = ((mask.ones_like()? - &mask)? * MASKED_MAX_FILL)?;
                (token_embeddings * &mask)?.add(&fill)?.max(1)?
            }
            PoolingStrategy::Mean | PoolingStrategy::MeanSqrtLenTokens => {
                let mask = expand_mask(attn_mask, token_embeddings)?;
                let sum_embeddings = token_embeddings.broadcast_mul(&mask)?.sum(1)?;
                let sum_mask = mask.sum(1)?.clamp(1e-9, f32::INFINITY)?;

                if let PoolingStrategy::Mean = self {
                    sum_embeddings.broadcast_div(&sum_mask)?
                } else {
                    sum_embeddings.broadcast_div(&sum_mask.sqrt()?)?
                }
            }
        };

        Ok(res)
    }
}

fn expand_mask(attn_mask: &Tensor, token_embeddings: &Tensor) -> candle_core::Result<Tensor> {
    attn_mask
        .unsqueeze(D::Minus1)?
        .expand(token_embeddings.shape())?
        .to_dtype(token_embeddings.dtype())
}

/// Applies every enabled strategy and concatenates the results along the
/// feature dimension, in the order CLS, mean, max, mean-sqrt-len.
#[derive(Debug, Clone)]
pub struct Pooler {
    strategies: Vec<PoolingStrategy>,
}

impl Pooler {
    pub fn from_config_file(config_filepath: &Path) -> Result<Self, PoolerFromConfigError> {
        Self::from_config(load_config::<PoolingConfig>(config_filepath)?)
    }

    pub fn from_config(config: PoolingConfig) -> Result<Self, PoolerFromConfigError> {
        let strategies = [
            (config.pooling_mode_cls_token, PoolingStrategy::Cls),
            (config.pooling_mode_mean_tokens, PoolingStrategy::Mean),
            (config.pooling_mode_max_tokens, PoolingStrategy::Max),
            (
                config.pooling_mode_mean_sqrt_len_tokens,
                PoolingStrategy::MeanSqrtLenTokens,
            ),
        ]
        .into_iter()
        .filter_map(|(enabled, strategy)| enabled.then_some(strategy))
        .collect::<Vec<_>>();

        if strategies.is_empty() {
            return Err(PoolerFromConfigError::PoolingStrategyNotSpecified { config });
        }
        Ok(Pooler { strategies })
    }

    pub fn strategies(&self) -> &[PoolingStrategy] {
        &self.strategies
    }

    pub fn pool(&self, token_embeddings: &Tensor, attn_mask: &Tensor) -> Result<Tensor, PoolingError> {
        if let [strategy] = self.strategies.as_slice() {
            return strategy.pool(token_embeddings, attn_mask);
        }

        let pooled = self
            .strategies
            .iter()
            .map(|s| s.pool(token_embeddings, attn_mask))
            .collect::<Result<Vec<Tensor>, PoolingError>>()?;
        Ok(Tensor::cat(&pooled, 1)?)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::Device;

    use super::*;

    fn config(cls: bool, mean: bool, max: bool, sqrt: bool) -> PoolingConfig {
        PoolingConfig {
            word_embedding_dimension: 2,
            pooling_mode_cls_token: cls,
            pooling_mode_mean_tokens: mean,
            pooling_mode_max_tokens: max,
            pooling_mode_mean_sqrt_len_tokens: sqrt,
        }
    }

    /// Two sentences of three token positions with two features; the second
    /// sentence has one padding position whose value must be ignored.
    fn inputs() -> (Tensor, Tensor) {
        let device = Device::Cpu;
        let embeddings = Tensor::new(
            &[
                [[1.0f32, 2.0], [3.0, 4.0], [5.0, -6.0]],
                [[-1.0, 0.0], [-3.0, 2.0], [100.0, 100.0]],
            ],
            &device,
        )
        .unwrap();
        let mask = Tensor::new(&[[1u32, 1, 1], [1, 1, 0]], &device).unwrap();
        (embeddings, mask)
    }

    fn pooled(strategy: PoolingStrategy) -> Vec<Vec<f32>> {
        let (embeddings, mask) = inputs();
        strategy.pool(&embeddings, &mask).unwrap().to_vec2().unwrap()
    }

    #[test]
    fn cls_takes_first_token() {
        assert_eq!(pooled(PoolingStrategy::Cls), vec![vec![1.0, 2.0], vec![-1.0, 0.0]]);
    }

    #[test]
    fn mean_ignores_padding() {
        assert_eq!(pooled(PoolingStrategy::Mean), vec![vec![3.0, 0.0], vec![-2.0, 1.0]]);
    }

    #[test]
    fn max_ignores_padding() {
        assert_eq!(pooled(PoolingStrategy::Max), vec![vec![5.0, 4.0], vec![-1.0, 2.0]]);
    }

    #[test]
    fn mean_sqrt_len_divides_by_root_token_count() {
        let out = pooled(PoolingStrategy::MeanSqrtLenTokens);
        let root3 = 3.0f32.sqrt();
        let root2 = 2.0f32.sqrt();
        assert!((out[0][0] - 9.0 / root3).abs() < 1e-5);
        assert!((out[1][0] + 4.0 / root2).abs() < 1e-5);
        assert!((out[1][1] - 2.0 / root2).abs() < 1e-5);
    }

    #[test]
    fn pooler_concatenates_enabled_strategies() {
        let (embeddings, mask) = inputs();
        let pooler = Pooler::from_config(config(true, true, false, false)).unwrap();
        assert_eq!(
            pooler.strategies(),
            &[PoolingStrategy::Cls, PoolingStrategy::Mean]
        );

        let out = pooler.pool(&embeddings, &mask).unwrap();
        assert_eq!(out.dims(), &[2, 4]);
        assert_eq!(
            out.to_vec2::<f32>().unwrap(),
            vec![vec![1.0, 2.0, 3.0, 0.0], vec![-1.0, 0.0, -2.0, 1.0]]
        );
    }

    #[test]
    fn pooler_requires_a_strategy() {
        assert!(matches!(
            Pooler::from_config(config(false, false, false, false)),
            Err(PoolerFromConfigError::PoolingStrategyNotSpecified { .. })
        ));
    }

    #[test]
    fn parses_sentence_transformers_pooling_config() {
        let json = r#"{
            "word_embedding_dimension": 384,
            "pooling_mode_cls_token": false,
            "pooling_mode_mean_tokens": true,
            "pooling_mode_max_tokens": false,
            "pooling_mode_mean_sqrt_len_tokens": false,
            "pooling_mode_weightedmean_tokens": false,
            "pooling_mode_lasttoken": false
        }"#;
        let config: PoolingConfig = serde_json::from_str(json).unwrap();
        let pooler = Pooler::from_config(config).unwrap();
        assert_eq!(pooler.strategies(), &[PoolingStrategy::Mean]);
    }
}
