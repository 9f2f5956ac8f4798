//! Gumbel-Sinkhorn sampling.
//!
//! Perturbing scores with i.i.d. Gumbel(0, 1) noise before Sinkhorn
//! normalization yields a continuous relaxation of a random permutation
//! sample; as the temperature drops, each replica approaches a hard
//! assignment drawn from the score-induced distribution.
use crate::Batch;
use crate::Error;
use crate::Extent;
use crate::Extents;
use crate::Result;
use crate::Score;
use crate::Sinkhorn;
use crate::SinkhornConfig;
use ndarray::Array3;
use ndarray::ArrayD;
use ndarray::ArrayViewD;
use rand::Rng;

/// Draws standard Gumbel noise, `-ln(-ln(u + ε) + ε)` with `u ~ U[0, 1)`.
///
/// Cells are filled in row-major order, one uniform draw each, so a seeded
/// generator always lands the same noise on the same replica.
pub fn gumbel<F, R>(rng: &mut R, shape: (usize, usize, usize)) -> Array3<F>
where
    F: Score,
    R: Rng,
{
    let eps = crate::GUMBEL_EPSILON;
    Array3::from_shape_fn(shape, |_| {
        let u = rng.random::<f64>();
        F::of(-(-(u + eps).ln() + eps).ln())
    })
}

/// Replicates each batch element, perturbs every replica with independent
/// Gumbel noise, and normalizes the replicas with a [`Sinkhorn`].
///
/// Output element `b * sample_num + k` is replica `k` of input element `b`,
/// so callers can view the result as `B × sample_num × R × C`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct GumbelSinkhorn {
    sinkhorn: Sinkhorn,
}

impl From<Sinkhorn> for GumbelSinkhorn {
    fn from(sinkhorn: Sinkhorn) -> Self {
        Self { sinkhorn }
    }
}

impl GumbelSinkhorn {
    pub fn new(config: SinkhornConfig) -> Result<Self> {
        Sinkhorn::new(config).map(Self::from)
    }
    pub fn sinkhorn(&self) -> &Sinkhorn {
        &self.sinkhorn
    }

    /// Samples `sample_num` relaxed assignments per element of a rank-2 or
    /// rank-3 score tensor. Always returns a rank-3 batch of
    /// `B * sample_num` matrices, even for a single input matrix.
    pub fn sample<F, R>(
        &self,
        rng: &mut R,
        scores: ArrayViewD<'_, F>,
        nrows: Option<&[Extent]>,
        ncols: Option<&[Extent]>,
        sample_num: usize,
        dummy_row: bool,
    ) -> Result<ArrayD<F>>
    where
        F: Score,
        R: Rng,
    {
        let batch = Batch::try_from(scores)?;
        let extents = Extents::resolve(nrows, ncols, batch.size(), batch.rows(), batch.cols());
        self.sample_batch(rng, batch, extents, sample_num, dummy_row)
            .map(Batch::finish)
    }

    /// Typed entry point behind [`GumbelSinkhorn::sample`].
    pub fn sample_batch<F, R>(
        &self,
        rng: &mut R,
        batch: Batch<F>,
        extents: Extents,
        sample_num: usize,
        dummy_row: bool,
    ) -> Result<Batch<F>>
    where
        F: Score,
        R: Rng,
    {
        if sample_num == 0 {
            return Err(Error::Precondition("sample_num must be positive".into()));
        }
        extents.check(batch.size(), batch.rows(), batch.cols())?;
        let replicas = batch.repeat(sample_num);
        let extents = extents.repeat(sample_num);
        let noise = gumbel::<F, R>(rng, replicas.view().dim());
        log::debug!(
            "sampling {} replicas of {} matrices",
            sample_num,
            batch.size()
        );
        let noisy = Batch::from(replicas.into_inner() + &noise);
        self.sinkhorn.normalize_batch(noisy, extents, dummy_row)
    }
}
