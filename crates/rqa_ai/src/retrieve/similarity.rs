pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot / (a_norm * b_norm)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_parallel_and_orthogonal_vectors() {
        let a = [3.0f32, 4.0];
        let b = [6.0f32, 8.0];
        let c = [-4.0f32, 3.0];
        assert_eq!(l2_norm(&a), 5.0);
        assert!((cosine_similarity(&a, &b, l2_norm(&a), l2_norm(&b)) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&a, &c, l2_norm(&a), l2_norm(&c)).abs() < 1e-6);
    }
}
