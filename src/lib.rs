pub mod activation;
pub mod batch;
pub mod config;
pub mod dense;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod pooling;
pub mod provider;
pub mod samples;
pub mod sentence_transformer;
pub mod similarity;
pub mod transformer;
pub mod utils;

pub use batch::SentenceBatch;
pub use error::{InvalidInputError, PipelineError};
pub use pipeline::{compare_to_reference, Similarity, SimilarityReport};
pub use provider::EmbeddingProvider;
pub use sentence_transformer::{SentenceTransformer, SentenceTransformerBuilder, Which};
pub use similarity::cosine_similarity;
