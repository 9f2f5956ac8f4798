use crate::Batch;
use crate::Error;
use crate::Extent;
use crate::Extents;
use crate::Result;
use crate::Score;
use crate::SinkhornConfig;
use crate::padding;
use crate::reduce;
use ndarray::Array;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayD;
use ndarray::ArrayView3;
use ndarray::ArrayViewD;
use ndarray::Axis;
use ndarray::Dimension;
use ndarray::s;
use rayon::prelude::*;

/// Batched Sinkhorn-Knopp normalization in log space.
///
/// Produces, for every batch element, a matrix whose active sub-rectangle is
/// approximately doubly stochastic and whose masked cells are exactly zero.
///
/// # Algorithm
///
/// 1. Orient each matrix so that cols >= rows (transpose otherwise)
/// 2. Divide scores by the temperature
/// 3. Optionally append slack rows so every element becomes square
/// 4. Alternate row (even passes) and column (odd passes) log-sum-exp
///    normalization over each element's active block
/// 5. Strip slack rows, undo the orientation, exponentiate
///
/// Passes are counted in the oriented frame, so for a matrix that had to be
/// transposed the first pass normalizes the caller's columns.
///
/// # Concurrency
///
/// Batch elements are independent and run on the rayon pool. Passes within an
/// element are strictly sequential.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Sinkhorn {
    config: SinkhornConfig,
}

impl Sinkhorn {
    pub fn new(config: SinkhornConfig) -> Result<Self> {
        config.validate()?;
        if !config.log_forward {
            log::warn!("sinkhorn without log forward is deprecated, normalizing in log space instead");
        }
        Ok(Self { config })
    }
    /// Default config with the given pass count and temperature.
    pub fn with(max_iter: usize, tau: f64) -> Result<Self> {
        Self::new(SinkhornConfig {
            max_iter,
            tau,
            ..SinkhornConfig::default()
        })
    }
    pub fn config(&self) -> &SinkhornConfig {
        &self.config
    }

    /// Normalizes a rank-2 (`R × C`) or rank-3 (`B × R × C`) score tensor.
    ///
    /// `nrows` / `ncols` give each element's active extent in the caller's
    /// orientation and default to the full matrix. The result has the
    /// caller's shape and holds probabilities.
    pub fn normalize<F>(
        &self,
        scores: ArrayViewD<'_, F>,
        nrows: Option<&[Extent]>,
        ncols: Option<&[Extent]>,
        dummy_row: bool,
    ) -> Result<ArrayD<F>>
    where
        F: Score,
    {
        let batch = Batch::try_from(scores)?;
        let extents = Extents::resolve(nrows, ncols, batch.size(), batch.rows(), batch.cols());
        self.normalize_batch(batch, extents, dummy_row)
            .map(Batch::finish)
    }

    /// Typed entry point: probabilities for an already-batched tensor.
    pub fn normalize_batch<F>(&self, batch: Batch<F>, extents: Extents, dummy_row: bool) -> Result<Batch<F>>
    where
        F: Score,
    {
        self.log_normalize_batch(batch, extents, dummy_row)
            .map(|log_s| log_s.map(F::exp))
    }

    /// Same as [`Sinkhorn::normalize_batch`] but stays in log space:
    /// masked cells are −∞ instead of 0.
    pub fn log_normalize_batch<F>(&self, batch: Batch<F>, extents: Extents, dummy_row: bool) -> Result<Batch<F>>
    where
        F: Score,
    {
        extents.check(batch.size(), batch.rows(), batch.cols())?;
        let tau = self.temperature::<F>();
        if !(tau.is_finite() && tau > F::zero()) {
            return Err(Error::Precondition(format!(
                "tau {} vanishes in the score precision",
                self.config.tau
            )));
        }
        let transposed = batch.cols() < batch.rows();
        let (batch, extents) = match transposed {
            true => (batch.transpose(), extents.transpose()),
            false => (batch, extents),
        };
        log::debug!(
            "normalizing {} x {} x {} (transposed: {}, dummy: {}, batched: {})",
            batch.size(),
            batch.rows(),
            batch.cols(),
            transposed,
            dummy_row,
            self.config.batched,
        );
        let rows = batch.rows();
        let batch = batch.scale(tau);
        let (batch, active) = match dummy_row {
            true => padding::pad(batch, &extents, F::of(crate::DUMMY_SLACK))?,
            false => (batch, extents.clone()),
        };
        let log_s = match self.config.batched {
            true => self.vectorized(batch.view(), &active),
            false => self.elementwise(batch.view(), &active),
        };
        let log_s = match dummy_row {
            true => padding::unpad(log_s, &extents, rows),
            false => log_s,
        };
        let log_s = batch.with(log_s);
        Ok(match transposed {
            true => log_s.transpose(),
            false => log_s,
        })
    }

    /// Each element's active block is copied out, iterated on its own, and
    /// scattered into an arena that starts at −∞ everywhere.
    fn elementwise<F>(&self, scores: ArrayView3<'_, F>, extents: &Extents) -> Array3<F>
    where
        F: Score,
    {
        let blocks = (0..scores.len_of(Axis(0)))
            .into_par_iter()
            .map(|b| {
                let (rows, cols) = extents.get(b);
                let mut block = scores.slice(s![b, ..rows, ..cols]).to_owned();
                self.iterate(&mut block, Axis(1), Axis(0));
                block
            })
            .collect::<Vec<Array2<F>>>();
        let mut arena = Array3::from_elem(scores.dim(), F::neg_infinity());
        for (b, block) in blocks.into_iter().enumerate() {
            let (rows, cols) = block.dim();
            arena.slice_mut(s![b, ..rows, ..cols]).assign(&block);
        }
        arena
    }

    /// Masks the whole tensor up front and reduces over every element at
    /// once. Matches [`Sinkhorn::elementwise`] whenever no lane degenerates.
    fn vectorized<F>(&self, scores: ArrayView3<'_, F>, extents: &Extents) -> Array3<F>
    where
        F: Score,
    {
        let mut log_s = Array3::from_shape_fn(scores.dim(), |(b, i, j)| {
            let (rows, cols) = extents.get(b);
            match i < rows && j < cols {
                true => scores[[b, i, j]],
                false => F::neg_infinity(),
            }
        });
        for i in 0..self.iterations() {
            let axis = match i % 2 {
                0 => Axis(2),
                _ => Axis(1),
            };
            log_s = reduce::normalize_tensor(&log_s, axis);
        }
        log_s
    }

    /// Alternating passes: even ones along `rows`, odd ones along `cols`.
    fn iterate<F, D>(&self, log_s: &mut Array<F, D>, rows: Axis, cols: Axis)
    where
        F: Score,
        D: Dimension,
    {
        for i in 0..self.iterations() {
            match i % 2 {
                0 => reduce::normalize_lanes(log_s, rows),
                _ => reduce::normalize_lanes(log_s, cols),
            }
        }
    }

    /// maximum number of alternating passes
    const fn iterations(&self) -> usize {
        self.config.max_iter
    }
    /// lower = closer to a hard permutation
    fn temperature<F>(&self) -> F
    where
        F: Score,
    {
        F::of(self.config.tau)
    }
}
