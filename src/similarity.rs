use crate::error::CosineSimilarityError;

/// Calculate the cosine similarity between two float slices.
///
/// Sums are accumulated in `f64`. There is no guard against zero-norm
/// vectors: the division then yields `NaN` or an infinity, which is returned
/// as a value. The result is not clamped to `[-1, 1]`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32, CosineSimilarityError> {
    let a_len = a.len();
    let b_len = b.len();

    // check if vectors are zero lengthed
    if a_len == 0 || b_len == 0 {
        return Err(CosineSimilarityError::ZeroSizedVectorSimUndefined);
    }

    // check if the sizes are the same
    if a_len != b_len {
        return Err(CosineSimilarityError::DifferentLenVectorSimUndefined {
            lhs: a_len,
            rhs: b_len,
        });
    }

    let (dot, norm_a, norm_b) = a.iter().zip(b.iter()).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())) as f32)
}
