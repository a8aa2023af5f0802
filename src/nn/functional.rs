//! Functional interface for stateless neural operations.
//!
//! These helpers back the MPN forward pass: the padded index gather,
//! middle-axis reduction over gathered contributors, and the numerically
//! stable softmax variants.

use crate::graph::IndexTable;
use crate::tensor::Tensor;

/// Softmax on a 1D slice of f32 values.
///
/// Equation: softmax(x)\_i = exp(x\_i - max) / sum\_j exp(x\_j - max)
#[must_use]
pub fn softmax_1d(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b));
    let exp: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|&x| x / sum).collect()
}

/// Softmax over the live entries of a padded slot row.
///
/// Slots where `live` is false receive exactly zero weight; the remaining
/// weights sum to 1. Returns all zeros when no slot is live.
#[must_use]
pub fn masked_softmax_1d(logits: &[f32], live: &[bool]) -> Vec<f32> {
    debug_assert_eq!(logits.len(), live.len());
    let max = logits
        .iter()
        .zip(live.iter())
        .filter(|(_, &m)| m)
        .fold(f32::NEG_INFINITY, |a, (&b, _)| a.max(b));
    if max == f32::NEG_INFINITY {
        return vec![0.0; logits.len()];
    }
    let exp: Vec<f32> = logits
        .iter()
        .zip(live.iter())
        .map(|(&x, &m)| if m { (x - max).exp() } else { 0.0 })
        .collect();
    let sum: f32 = exp.iter().sum();
    exp.iter().map(|&x| x / sum).collect()
}

/// Row-wise softmax over a 2D tensor.
#[must_use]
pub fn softmax_rows(x: &Tensor) -> Tensor {
    assert_eq!(x.ndim(), 2, "softmax_rows() requires a 2D tensor");
    let cols = x.shape()[1];
    let mut out = Vec::with_capacity(x.numel());
    for row in x.data().chunks(cols) {
        out.extend(softmax_1d(row));
    }
    Tensor::new(&out, x.shape())
}

/// Gather rows of `source` through a padded 2D index table.
///
/// Produces a `[table_rows, table_width, features]` tensor whose slot
/// `(r, s)` holds `source` row `table[r][s]`. Index 0 is the reserved
/// sentinel; as long as `source` row 0 is the zero row, padded slots
/// contribute nothing to downstream sums.
///
/// # Panics
///
/// Panics if any index is out of range for `source`.
#[must_use]
pub fn index_select_nd(source: &Tensor, table: &IndexTable) -> Tensor {
    assert_eq!(source.ndim(), 2, "index_select_nd() requires a 2D source");
    let n_source = source.shape()[0];
    let features = source.shape()[1];
    let (rows, width) = (table.rows(), table.width());

    let mut out = Vec::with_capacity(rows * width * features);
    for r in 0..rows {
        for s in 0..width {
            let idx = table.get(r, s);
            assert!(
                idx < n_source,
                "Index {idx} out of range for source with {n_source} rows"
            );
            out.extend_from_slice(source.row(idx));
        }
    }

    Tensor::new(&out, &[rows, width, features])
}

/// Elementwise logistic sigmoid.
#[must_use]
pub fn sigmoid(x: &Tensor) -> Tensor {
    let data: Vec<f32> = x.data().iter().map(|&v| 1.0 / (1.0 + (-v).exp())).collect();
    Tensor::new(&data, x.shape())
}

/// Sum a `[a, b, c]` tensor over its middle axis, yielding `[a, c]`.
#[must_use]
pub fn sum_dim1(x: &Tensor) -> Tensor {
    assert_eq!(x.ndim(), 3, "sum_dim1() requires a 3D tensor");
    let (a, b, c) = (x.shape()[0], x.shape()[1], x.shape()[2]);
    let data = x.data();
    let mut out = vec![0.0f32; a * c];
    for i in 0..a {
        for j in 0..b {
            let src = &data[(i * b + j) * c..(i * b + j + 1) * c];
            let dst = &mut out[i * c..(i + 1) * c];
            for (d, &s) in dst.iter_mut().zip(src.iter()) {
                *d += s;
            }
        }
    }
    Tensor::new(&out, &[a, c])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_softmax_1d_sums_to_one() {
        let probs = softmax_1d(&[1.0, 2.0, 3.0]);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(probs[2] > probs[1] && probs[1] > probs[0]);
    }

    #[test]
    fn test_softmax_1d_stable_for_large_inputs() {
        let probs = softmax_1d(&[1000.0, 1000.0]);
        assert!((probs[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_masked_softmax_ignores_padded_slots() {
        let probs = masked_softmax_1d(&[5.0, 100.0, 5.0], &[true, false, true]);
        assert_eq!(probs[1], 0.0);
        assert!((probs[0] - 0.5).abs() < 1e-6);
        assert!((probs[2] - 0.5).abs() < 1e-6);
        let sum: f32 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_masked_softmax_all_padded_is_zero() {
        let probs = masked_softmax_1d(&[1.0, 2.0], &[false, false]);
        assert_eq!(probs, vec![0.0, 0.0]);
    }

    #[test]
    fn test_index_select_nd_gathers_rows() {
        let source = Tensor::new(&[0.0, 0.0, 1.0, 2.0, 3.0, 4.0], &[3, 2]);
        let table = IndexTable::from_rows(&[vec![2, 0], vec![1, 2]], 2);
        let gathered = index_select_nd(&source, &table);

        assert_eq!(gathered.shape(), &[2, 2, 2]);
        // Row 0 slot 0 -> source row 2, slot 1 -> sentinel zero row.
        assert_eq!(&gathered.data()[0..2], &[3.0, 4.0]);
        assert_eq!(&gathered.data()[2..4], &[0.0, 0.0]);
    }

    #[test]
    fn test_sigmoid_bounds() {
        let y = sigmoid(&Tensor::from_slice(&[-100.0, 0.0, 100.0]));
        assert!(y.data()[0] < 1e-6);
        assert!((y.data()[1] - 0.5).abs() < 1e-6);
        assert!(y.data()[2] > 1.0 - 1e-6);
    }

    #[test]
    fn test_sum_dim1() {
        let x = Tensor::new(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &[2, 2, 2]);
        let summed = sum_dim1(&x);
        assert_eq!(summed.shape(), &[2, 2]);
        assert_eq!(summed.data(), &[4.0, 6.0, 12.0, 14.0]);
    }
}
