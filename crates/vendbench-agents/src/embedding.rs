//! Deterministic local text embeddings.
//!
//! Text is lowercased and split into alphanumeric tokens; each token is
//! hashed into one of [`EMBEDDING_DIM`] buckets with a hash-derived sign,
//! and the resulting vector is L2-normalized. Identical text always yields
//! the identical vector, and texts sharing words score higher under
//! [`cosine_similarity`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Number of dimensions in every embedding.
pub const EMBEDDING_DIM: usize = 256;

/// Embed `text` into a normalized [`EMBEDDING_DIM`]-dimensional vector.
///
/// Text without any alphanumeric token embeds to the zero vector.
pub fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0_f32; EMBEDDING_DIM];
    for token in tokens(text) {
        let hash = token_hash(&token);
        let bucket = usize::try_from(hash % EMBEDDING_DIM as u64).unwrap_or(0);
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        if let Some(slot) = vector.get_mut(bucket) {
            *slot += sign;
        }
    }
    normalize(&mut vector);
    vector
}

/// Cosine similarity of two vectors; `0.0` when lengths differ, either is
/// empty, or either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (lhs, rhs) in a.iter().zip(b) {
        dot += lhs * rhs;
        norm_a += lhs * lhs;
        norm_b += rhs * rhs;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

fn token_hash(token: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    hasher.finish()
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        return;
    }
    for value in vector {
        *value /= norm;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_are_deterministic_and_normalized() {
        let a = embed("Soda sells best on weekends");
        let b = embed("Soda sells best on weekends");
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        assert_eq!(embed("Chips, CHIPS!"), embed("chips chips"));
    }

    #[test]
    fn shared_words_score_higher() {
        let query = embed("supplier price for soda");
        let related = embed("the supplier raised the soda price");
        let unrelated = embed("machine maintenance schedule tuesday");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[test]
    fn degenerate_inputs_score_zero() {
        assert!(cosine_similarity(&[], &[]).abs() < f32::EPSILON);
        assert!(cosine_similarity(&[1.0], &[1.0, 0.0]).abs() < f32::EPSILON);
        let empty = embed("!!!");
        assert!(cosine_similarity(&empty, &embed("chips")).abs() < f32::EPSILON);
    }
}
