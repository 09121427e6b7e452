use crate::batch::SentenceBatch;

/// Anything that turns a batch of sentences into one embedding per sentence.
///
/// Implementations must return exactly `batch.len()` vectors, all of the same
/// length, in the order of the batch, and must serve the whole batch from a
/// single call.
pub trait EmbeddingProvider {
    type Error: std::error::Error + Send + Sync + 'static;

    fn embed(&self, batch: &SentenceBatch) -> Result<Vec<Vec<f32>>, Self::Error>;
}

impl<P: EmbeddingProvider + ?Sized> EmbeddingProvider for &P {
    type Error = P::Error;

    fn embed(&self, batch: &SentenceBatch) -> Result<Vec<Vec<f32>>, Self::Error> {
        (**self).embed(batch)
    }
}
