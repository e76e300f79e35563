//! N-dimensional vector operations over `f64` slices.
//!
//! Positions, velocities and forces are stored as flat buffers with `D`
//! consecutive coordinates per node, so every operation here works on plain
//! slices and never assumes a particular dimensionality. Binary operations
//! expect both operands to have the same length.

/// Elementwise `a + b`.
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// Elementwise `a - b`.
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `v * s`.
pub fn scale(v: &[f64], s: f64) -> Vec<f64> {
    v.iter().map(|x| x * s).collect()
}

/// Squared Euclidean norm.
#[inline]
pub fn norm_squared(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}

/// Euclidean norm.
#[inline]
pub fn norm(v: &[f64]) -> f64 {
    norm_squared(v).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance between two points.
#[inline]
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    distance_squared(a, b).sqrt()
}

/// Unit vector in the direction of `v`.
///
/// A zero (or non-finite) norm yields the zero vector instead of dividing by
/// zero.
pub fn normalize(v: &[f64]) -> Vec<f64> {
    let n = norm(v);
    if n > 0.0 && n.is_finite() {
        scale(v, 1.0 / n)
    } else {
        vec![0.0; v.len()]
    }
}

/// `acc += v`.
#[inline]
pub fn add_assign(acc: &mut [f64], v: &[f64]) {
    debug_assert_eq!(acc.len(), v.len());
    for (a, x) in acc.iter_mut().zip(v) {
        *a += x;
    }
}

/// `acc += v * s`.
#[inline]
pub fn add_scaled(acc: &mut [f64], v: &[f64], s: f64) {
    debug_assert_eq!(acc.len(), v.len());
    for (a, x) in acc.iter_mut().zip(v) {
        *a += x * s;
    }
}

/// True when every component is finite.
#[inline]
pub fn is_finite(v: &[f64]) -> bool {
    v.iter().all(|x| x.is_finite())
}
