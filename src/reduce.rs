//! Log-space lane reductions shared by both iteration modes.
use crate::Score;
use ndarray::Array;
use ndarray::Array3;
use ndarray::ArrayView1;
use ndarray::Axis;
use ndarray::Dimension;

/// Stable ln Σ exp(x) over one lane.
///
/// Returns −∞ when the lane holds no finite entry, i.e. the lane is
/// entirely masked.
pub fn logsumexp<F>(lane: ArrayView1<'_, F>) -> F
where
    F: Score,
{
    let max = lane.iter().copied().fold(F::neg_infinity(), F::max);
    if !max.is_finite() {
        return max;
    }
    max + lane
        .iter()
        .map(|&x| (x - max).exp())
        .fold(F::zero(), |acc, e| acc + e)
        .ln()
}

/// Normalizes every lane along `axis` in log space: afterwards each lane's
/// probabilities sum to one.
///
/// A lane whose log-partition is not finite is shifted by the largest finite
/// log-partition of the same pass instead (zero if there is none), so fully
/// masked lanes stay at −∞ rather than turning into NaN.
pub fn normalize_lanes<F, D>(block: &mut Array<F, D>, axis: Axis)
where
    F: Score,
    D: Dimension,
{
    let sums = block
        .lanes(axis)
        .into_iter()
        .map(logsumexp)
        .collect::<Vec<F>>();
    let best = sums
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .reduce(F::max)
        .unwrap_or_else(F::zero);
    if sums.iter().any(|s| !s.is_finite()) {
        log::trace!("degenerate lanes along axis {}, shifting by {}", axis.index(), best);
    }
    block
        .lanes_mut(axis)
        .into_iter()
        .zip(sums)
        .for_each(|(mut lane, sum)| {
            let sum = if sum.is_finite() { sum } else { best };
            lane.mapv_inplace(|x| x - sum);
        });
}

/// Broadcast variant of [`normalize_lanes`] over a whole `B × R × C` tensor.
///
/// No fallback shift here: fully masked lanes turn into NaN on subtraction
/// and are masked back to −∞ afterwards.
pub fn normalize_tensor<F>(log_s: &Array3<F>, axis: Axis) -> Array3<F>
where
    F: Score,
{
    let sums = log_s.map_axis(axis, logsumexp).insert_axis(axis);
    let mut next = log_s - &sums;
    mask_nan(&mut next);
    next
}

/// −∞ − (−∞) leaves NaN behind in the vectorized mode; those cells are masked.
pub fn mask_nan<F, D>(block: &mut Array<F, D>)
where
    F: Score,
    D: Dimension,
{
    block.mapv_inplace(|x| if x.is_nan() { F::neg_infinity() } else { x });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn logsumexp_matches_naive() {
        let lane = array![0.5f64, -1.0, 2.0];
        let naive = lane.iter().map(|x| x.exp()).sum::<f64>().ln();
        assert!((logsumexp(lane.view()) - naive).abs() < 1e-12);
    }

    #[test]
    fn logsumexp_survives_large_scores() {
        let lane = array![1000f32, 1000.];
        let lse = logsumexp(lane.view());
        assert!((lse - (1000. + 2f32.ln())).abs() < 1e-3);
    }

    #[test]
    fn logsumexp_of_masked_lane() {
        let lane = array![f64::NEG_INFINITY, f64::NEG_INFINITY];
        assert_eq!(logsumexp(lane.view()), f64::NEG_INFINITY);
    }

    #[test]
    fn rows_sum_to_one() {
        let mut block = array![[1f64, 2., 3.], [0., 0., 0.]];
        normalize_lanes(&mut block, Axis(1));
        for row in block.rows() {
            assert!((row.mapv(f64::exp).sum() - 1.).abs() < 1e-12);
        }
    }

    #[test]
    fn masked_row_stays_masked() {
        let ninf = f64::NEG_INFINITY;
        let mut block = array![[1f64, 2.], [ninf, ninf]];
        normalize_lanes(&mut block, Axis(1));
        assert!(block.iter().all(|x| !x.is_nan()));
        assert_eq!(block[[1, 0]], ninf);
        assert_eq!(block[[1, 1]], ninf);
        normalize_lanes(&mut block, Axis(0));
        assert!(block.iter().all(|x| !x.is_nan()));
    }

    #[test]
    fn tensor_pass_matches_lane_pass() {
        let ninf = f64::NEG_INFINITY;
        let log_s = ndarray::array![[[0.3f64, -1.2, ninf], [2.0, 0.1, ninf], [ninf, ninf, ninf]]];
        let mut lanes = log_s.clone();
        normalize_lanes(&mut lanes, Axis(2));
        let tensor = normalize_tensor(&log_s, Axis(2));
        assert!(tensor.iter().all(|x| !x.is_nan()));
        for (a, b) in lanes.iter().zip(tensor.iter()) {
            assert!(a == b || (a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn nan_becomes_masked() {
        let mut block = array![[f32::NAN, 0.]];
        mask_nan(&mut block);
        assert_eq!(block[[0, 0]], f32::NEG_INFINITY);
        assert_eq!(block[[0, 1]], 0.);
    }
}
