//! Dummy-row padding for rectangular assignment problems.
//!
//! A matrix with more columns than rows is squared up by appending
//! `C - R` slack rows, so every column can be matched. Slack rows represent
//! "unassigned": they carry a finite penalty inside each element's active
//! columns and −∞ everywhere else. They are stripped again before the result
//! leaves the normalizer.
use crate::Batch;
use crate::Error;
use crate::Extents;
use crate::Result;
use crate::Score;
use ndarray::Array3;

/// Appends slack rows, returning the squared batch and its extents, whose
/// row extents now equal the column extents.
pub(crate) fn pad<F>(batch: Batch<F>, extents: &Extents, slack: F) -> Result<(Batch<F>, Extents)>
where
    F: Score,
{
    let (n, r, c) = (batch.size(), batch.rows(), batch.cols());
    if c < r {
        return Err(Error::Precondition(format!(
            "dummy rows need cols >= rows, got {} x {}",
            r, c
        )));
    }
    if let Some(b) = (0..n).find(|&b| extents.get(b).0 > extents.get(b).1) {
        return Err(Error::Precondition(format!(
            "dummy rows need ncols >= nrows, element {} has {} x {}",
            b,
            extents.get(b).0,
            extents.get(b).1
        )));
    }
    let scores = batch.view();
    let padded = Array3::from_shape_fn((n, c, c), |(b, i, j)| {
        let (rows, cols) = extents.get(b);
        if i >= cols || j >= cols {
            F::neg_infinity()
        } else if i >= rows {
            slack
        } else {
            scores[[b, i, j]]
        }
    });
    log::trace!("padded {} x {} to {} x {}", r, c, c, c);
    Ok((batch.with(padded), extents.squared()))
}

/// Drops the slack rows beyond `rows` and re-masks every row at or past
/// each element's original row extent.
pub(crate) fn unpad<F>(log_s: Array3<F>, original: &Extents, rows: usize) -> Array3<F>
where
    F: Score,
{
    let (n, _, c) = log_s.dim();
    Array3::from_shape_fn((n, rows, c), |(b, i, j)| {
        if i >= original.get(b).0 {
            F::neg_infinity()
        } else {
            log_s[[b, i, j]]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn slack_fills_missing_rows() {
        let batch = Batch::from(array![[[1f64, 2., 3.], [4., 5., 6.]]]);
        let extents = Extents::full(1, 2, 3);
        let (padded, squared) = pad(batch, &extents, -100.).unwrap();
        assert_eq!(padded.rows(), 3);
        assert_eq!(squared.get(0), (3, 3));
        assert_eq!(padded.view()[[0, 1, 2]], 6.);
        assert!(padded.view().slice(ndarray::s![0, 2, ..]).iter().all(|&x| x == -100.));
    }

    #[test]
    fn slack_respects_extents() {
        let batch = Batch::from(array![[[1f64, 2., 3., 4.], [5., 6., 7., 8.]]]);
        let extents = Extents::new(vec![1], vec![3]);
        let (padded, _) = pad(batch, &extents, -100.).unwrap();
        let v = padded.view();
        assert_eq!(v[[0, 0, 0]], 1.);
        assert_eq!(v[[0, 1, 0]], -100.);
        assert_eq!(v[[0, 2, 2]], -100.);
        assert_eq!(v[[0, 0, 3]], f64::NEG_INFINITY);
        assert_eq!(v[[0, 3, 0]], f64::NEG_INFINITY);
    }

    #[test]
    fn tall_matrices_are_refused() {
        let batch = Batch::from(array![[[1f64], [2.]]]);
        assert!(pad(batch, &Extents::full(1, 2, 1), -100.).is_err());
        let batch = Batch::from(array![[[1f64, 2.], [3., 4.]]]);
        assert!(pad(batch, &Extents::new(vec![2], vec![1]), -100.).is_err());
    }

    #[test]
    fn unpad_strips_and_masks() {
        let log_s = Array3::<f64>::zeros((1, 3, 3));
        let out = unpad(log_s, &Extents::new(vec![1], vec![3]), 2);
        assert_eq!(out.dim(), (1, 2, 3));
        assert!(out.slice(ndarray::s![0, 0, ..]).iter().all(|&x| x == 0.));
        assert!(out.slice(ndarray::s![0, 1, ..]).iter().all(|&x| x == f64::NEG_INFINITY));
    }
}
