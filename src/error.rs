use thiserror::Error;

use crate::pooling::PoolingConfig;

#[derive(Debug, Error)]
pub enum SentenceTransformerBuilderError {
    #[error("Device must be specified")]
    DeviceNotSpecified,

    #[error("Pooling method must be specified")]
    PoolingMethodNotSpecified,

    #[error("DownloadHFModelError: {0}")]
    DownloadHFModelError(#[from] DownloadHFModelError),

    #[error("LoadSafeTensorError: {0}")]
    LoadSafeTensorError(#[from] LoadSafeTensorError),

    #[error("LoadConfigError: {0}")]
    LoadConfigError(#[from] LoadConfigError),

    #[error("CandleError: {0}")]
    CandleError(#[from] candle_core::error::Error),

    #[error("DenseError: {0}")]
    DenseError(#[from] DenseError),

    #[error("PoolerFromConfigError: {0}")]
    PoolerFromConfigError(#[from] PoolerFromConfigError),

    #[error("TransformerLoadError: {0}")]
    TransformerLoadError(#[from] TransformerLoadError),
}

#[derive(Debug, Error)]
pub enum DownloadHFModelError {
    #[error("HFHubApiError({0})")]
    HFHubApiError(#[from] hf_hub::api::sync::ApiError),
}

#[derive(Debug, Error)]
pub enum LoadSafeTensorError {
    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),
}

#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("IO Error: {0}")]
    StdIOError(#[from] std::io::Error),

    #[error("SerdeJsonError: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TransformerLoadError {
    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),

    #[error("TokenizersError({0})")]
    TokenizersError(#[from] tokenizers::Error),

    #[error("LoadConfigError({0})")]
    LoadConfigError(#[from] LoadConfigError),
}

#[derive(Debug, Error)]
pub enum TokenBatchError {
    #[error("Cannot pack a token batch from zero sentences")]
    EmptyBatch,

    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),
}

#[derive(Debug, Error)]
pub enum PoolingError {
    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),
}

#[derive(Debug, Error)]
pub enum PoolerFromConfigError {
    #[error("No pooling strategy is enabled in {config:?}")]
    PoolingStrategyNotSpecified { config: PoolingConfig },

    #[error("LoadConfigError({0})")]
    LoadConfigError(#[from] LoadConfigError),
}

#[derive(Debug, Error)]
pub enum DenseError {
    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),
}

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),
}

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("TokenizersError({0})")]
    TokenizersError(#[from] tokenizers::Error),

    #[error("CandleError({0})")]
    CandleError(#[from] candle_core::error::Error),

    #[error("TokenBatchError({0})")]
    TokenBatchError(#[from] TokenBatchError),

    #[error("PoolingError({0})")]
    PoolingError(#[from] PoolingError),

    #[error("DenseError({0})")]
    DenseError(#[from] DenseError),

    #[error("NormalizeError({0})")]
    NormalizeError(#[from] NormalizeError),
}

#[derive(Debug, Error)]
pub enum CosineSimilarityError {
    #[error("Cosine similarity of 0 sized vectors is undefined")]
    ZeroSizedVectorSimUndefined,

    #[error("Cosine similarity of vectors of different lengths (lhs: {lhs:?}, rhs: {rhs:?}) is undefined")]
    DifferentLenVectorSimUndefined { lhs: usize, rhs: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidInputError {
    #[error("Cannot assemble a batch from zero sentences")]
    EmptyBatch,
}

/// Failure of a similarity pipeline run over a provider whose error type is `E`.
///
/// Provider failures are carried as-is in [`PipelineError::ProviderError`].
#[derive(Debug, Error)]
pub enum PipelineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("InvalidInputError({0})")]
    InvalidInputError(#[from] InvalidInputError),

    #[error("ProviderError({0})")]
    ProviderError(#[source] E),

    #[error("CosineSimilarityError({0})")]
    CosineSimilarityError(#[from] CosineSimilarityError),

    #[error("Provider returned {got} embeddings for {expected} sentences")]
    EmbeddingCountMismatch { expected: usize, got: usize },
}
