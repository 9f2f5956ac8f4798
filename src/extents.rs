use crate::Error;
use crate::Extent;
use crate::Result;

/// Per-element active sub-rectangles of a batch.
///
/// Element `b` is valid on `[0, nrows[b]) × [0, ncols[b])`. Cells outside
/// are masked: they never enter a normalization sum and always come back
/// as exactly zero probability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extents {
    nrows: Vec<Extent>,
    ncols: Vec<Extent>,
}

impl Extents {
    pub fn new(nrows: Vec<Extent>, ncols: Vec<Extent>) -> Self {
        Self { nrows, ncols }
    }
    /// every element spans the whole matrix
    pub fn full(batch: usize, rows: Extent, cols: Extent) -> Self {
        Self {
            nrows: vec![rows; batch],
            ncols: vec![cols; batch],
        }
    }
    /// Fills in whichever side the caller left out with the full extent.
    pub fn resolve(
        nrows: Option<&[Extent]>,
        ncols: Option<&[Extent]>,
        batch: usize,
        rows: Extent,
        cols: Extent,
    ) -> Self {
        Self {
            nrows: nrows.map_or_else(|| vec![rows; batch], <[Extent]>::to_vec),
            ncols: ncols.map_or_else(|| vec![cols; batch], <[Extent]>::to_vec),
        }
    }

    pub fn nrows(&self) -> &[Extent] {
        &self.nrows
    }
    pub fn ncols(&self) -> &[Extent] {
        &self.ncols
    }
    pub fn len(&self) -> usize {
        self.nrows.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nrows.is_empty()
    }
    /// (nrows, ncols) of element `b`
    pub fn get(&self, b: usize) -> (Extent, Extent) {
        (self.nrows[b], self.ncols[b])
    }

    /// Validates against a `batch × rows × cols` tensor.
    pub fn check(&self, batch: usize, rows: Extent, cols: Extent) -> Result<()> {
        if self.nrows.len() != batch || self.ncols.len() != batch {
            return Err(Error::Precondition(format!(
                "extents cover {} x {} elements, batch has {}",
                self.nrows.len(),
                self.ncols.len(),
                batch
            )));
        }
        if let Some((b, n)) = self
            .nrows
            .iter()
            .enumerate()
            .find(|(_, n)| !(1..=rows).contains(*n))
        {
            return Err(Error::Precondition(format!(
                "nrows[{}] = {} outside 1..={}",
                b, n, rows
            )));
        }
        if let Some((b, n)) = self
            .ncols
            .iter()
            .enumerate()
            .find(|(_, n)| !(1..=cols).contains(*n))
        {
            return Err(Error::Precondition(format!(
                "ncols[{}] = {} outside 1..={}",
                b, n, cols
            )));
        }
        Ok(())
    }

    /// Swaps the roles of rows and columns.
    pub fn transpose(self) -> Self {
        Self {
            nrows: self.ncols,
            ncols: self.nrows,
        }
    }
    /// Repeats every element `n` consecutive times, matching [`crate::Batch::repeat`].
    pub fn repeat(&self, n: usize) -> Self {
        let rep = |xs: &[Extent]| {
            xs.iter()
                .flat_map(|x| std::iter::repeat_n(*x, n))
                .collect::<Vec<_>>()
        };
        Self {
            nrows: rep(&self.nrows),
            ncols: rep(&self.ncols),
        }
    }
    /// Row extents replaced by column extents, as dummy padding squares each element.
    pub fn squared(&self) -> Self {
        Self {
            nrows: self.ncols.clone(),
            ncols: self.ncols.clone(),
        }
    }
}
