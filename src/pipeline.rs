use std::fmt;

use tracing::debug;

use crate::{
    batch::SentenceBatch, error::PipelineError, provider::EmbeddingProvider,
    similarity::cosine_similarity,
};

/// Score given to the reference sentence. It is not recomputed.
pub const REFERENCE_SIMILARITY: f32 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Similarity {
    pub sentence: String,
    pub score: f32,
}

/// Cosine similarity of each sentence to the first one, in input order.
/// The first entry is the reference itself.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityReport {
    entries: Vec<Similarity>,
}

impl SimilarityReport {
    pub fn reference(&self) -> &Similarity {
        &self.entries[0]
    }

    /// Every entry but the reference.
    pub fn comparisons(&self) -> &[Similarity] {
        &self.entries[1..]
    }

    pub fn entries(&self) -> &[Similarity] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Similarity> {
        self.entries.iter()
    }

    pub fn into_entries(self) -> Vec<Similarity> {
        self.entries
    }
}

impl fmt::Display for SimilarityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "similarities to sentence:{}", self.reference().sentence)?;
        for Similarity { sentence, score } in self.comparisons() {
            writeln!(f, "{score}\t=>\t\t{sentence}")?;
        }
        Ok(())
    }
}

/// Embed all `sentences` with one call to `provider` and score each of them
/// against the first.
pub fn compare_to_reference<P, S>(
    provider: &P,
    sentences: &[S],
) -> Result<SimilarityReport, PipelineError<P::Error>>
where
    P: EmbeddingProvider + ?Sized,
    S: AsRef<str>,
{
    let batch = SentenceBatch::assemble(sentences)?;
    debug!(sentences = batch.len(), "embedding batch");

    let embeddings = provider
        .embed(&batch)
        .map_err(PipelineError::ProviderError)?;

    if embeddings.len() != batch.len() {
        return Err(PipelineError::EmbeddingCountMismatch {
            expected: batch.len(),
            got: embeddings.len(),
        });
    }

    let reference = &embeddings[0];
    let mut entries = Vec::with_capacity(batch.len());
    entries.push(Similarity {
        sentence: batch.reference().to_owned(),
        score: REFERENCE_SIMILARITY,
    });

    for (sentence, embedding) in batch.iter().zip(&embeddings).skip(1) {
        entries.push(Similarity {
            sentence: sentence.to_owned(),
            score: cosine_similarity(reference, embedding)?,
        });
    }

    Ok(SimilarityReport { entries })
}
