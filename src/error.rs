/// Failures surfaced by normalization and sampling.
///
/// Both are raised before any iteration runs. There is no partial result:
/// a call either returns a complete tensor or one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input data shape not understood: expected rank 2 or 3, got rank {rank}")]
    InvalidShape { rank: usize },
    #[error("precondition violated: {0}")]
    Precondition(String),
}

pub type Result<T> = std::result::Result<T, Error>;
