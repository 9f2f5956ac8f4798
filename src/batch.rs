use crate::Error;
use crate::Result;
use crate::Score;
use ndarray::Array2;
use ndarray::Array3;
use ndarray::ArrayD;
use ndarray::ArrayView3;
use ndarray::ArrayViewD;
use ndarray::Axis;
use ndarray::Ix2;
use ndarray::Ix3;

/// A batch of `B` score matrices stored densely as `B × R × C`.
///
/// Rank-2 input is lifted to a batch of one and remembered as `squeeze`,
/// so [`Batch::finish`] can hand back a matrix of the caller's rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<F> {
    data: Array3<F>,
    squeeze: bool,
}

impl<F> Batch<F>
where
    F: Score,
{
    /// number of matrices
    pub fn size(&self) -> usize {
        self.data.len_of(Axis(0))
    }
    /// rows per matrix
    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }
    /// columns per matrix
    pub fn cols(&self) -> usize {
        self.data.len_of(Axis(2))
    }
    /// whether the caller handed us a single matrix
    pub fn squeezed(&self) -> bool {
        self.squeeze
    }
    pub fn view(&self) -> ArrayView3<'_, F> {
        self.data.view()
    }
    pub fn into_inner(self) -> Array3<F> {
        self.data
    }
    /// Swaps in new contents, keeping the caller's rank.
    pub fn with(&self, data: Array3<F>) -> Self {
        Self {
            data,
            squeeze: self.squeeze,
        }
    }

    /// Swaps the last two axes of every matrix.
    pub fn transpose(self) -> Self {
        Self {
            data: self
                .data
                .permuted_axes([0, 2, 1])
                .as_standard_layout()
                .into_owned(),
            squeeze: self.squeeze,
        }
    }
    /// Divides every score by the temperature.
    pub fn scale(self, tau: F) -> Self {
        Self {
            data: self.data.mapv_into(|x| x / tau),
            squeeze: self.squeeze,
        }
    }
    /// Elementwise map, keeping the batch shape.
    pub fn map(self, f: impl Fn(F) -> F) -> Self {
        Self {
            data: self.data.mapv_into(f),
            squeeze: self.squeeze,
        }
    }
    /// Repeats every matrix `n` consecutive times, so element `b` lands at
    /// `b * n .. (b + 1) * n`. The result is always a proper batch.
    pub fn repeat(&self, n: usize) -> Self {
        let (b, r, c) = self.data.dim();
        Self {
            data: Array3::from_shape_fn((b * n, r, c), |(i, j, k)| self.data[[i / n, j, k]]),
            squeeze: false,
        }
    }
    /// Back to the caller's rank.
    pub fn finish(self) -> ArrayD<F> {
        match self.squeeze {
            true => self.data.index_axis_move(Axis(0), 0).into_dyn(),
            false => self.data.into_dyn(),
        }
    }
}

impl<F> From<Array3<F>> for Batch<F> {
    fn from(data: Array3<F>) -> Self {
        Self {
            data,
            squeeze: false,
        }
    }
}

impl<F> From<Array2<F>> for Batch<F> {
    fn from(matrix: Array2<F>) -> Self {
        Self {
            data: matrix.insert_axis(Axis(0)),
            squeeze: true,
        }
    }
}

impl<F> TryFrom<ArrayViewD<'_, F>> for Batch<F>
where
    F: Score,
{
    type Error = Error;
    fn try_from(scores: ArrayViewD<'_, F>) -> Result<Self> {
        let rank = scores.ndim();
        match rank {
            2 => scores
                .into_dimensionality::<Ix2>()
                .map(|m| Self::from(m.to_owned()))
                .map_err(|_| Error::InvalidShape { rank }),
            3 => scores
                .into_dimensionality::<Ix3>()
                .map(|m| Self::from(m.to_owned()))
                .map_err(|_| Error::InvalidShape { rank }),
            _ => Err(Error::InvalidShape { rank }),
        }
    }
}
