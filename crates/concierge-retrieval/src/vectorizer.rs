//! Deterministic hashing bag-of-words vectorizer.
//!
//! The teacher's stack carries no embedding-model dependency, and this
//! spec's Non-goals already exclude re-ranking and query rewriting, so a
//! real ANN/embedding service would be scope creep. This hashing trick
//! (tokenize, hash each token into one of `DIMS` buckets, L2-normalize)
//! gives a stable, dependency-free stand-in with the properties retrieval
//! actually needs: similar text gets a similar vector, and it's reproducible
//! across restarts without recomputation of anything but the query.

use sha2::{Digest, Sha256};

pub const DIMS: usize = 256;

pub fn vectorize(text: &str) -> Vec<f32> {
    let mut buckets = vec![0f32; DIMS];
    for token in tokenize(text) {
        let digest = Sha256::digest(token.as_bytes());
        let idx = (u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize) % DIMS;
        buckets[idx] += 1.0;
    }
    normalize(&mut buckets);
    buckets
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_text_has_similarity_one() {
        let v = vectorize("attendance policy requires 75 percent");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn unrelated_text_has_low_similarity() {
        let a = vectorize("attendance policy requires seventy five percent minimum");
        let b = vectorize("library opening hours on weekends");
        assert!(cosine_similarity(&a, &b) < 0.3);
    }

    #[test]
    fn overlapping_vocabulary_scores_higher_than_disjoint() {
        let query = vectorize("what is the attendance requirement");
        let close = vectorize("attendance requirement is 75 percent of classes");
        let far = vectorize("canteen menu changes every week");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }
}
