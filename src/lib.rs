//! Batched log-domain Sinkhorn normalization.
//!
//! Turns a batch of score matrices into (approximately) doubly stochastic
//! matrices by alternating row and column log-sum-exp normalization, with
//! per-element valid extents, optional dummy-row padding for rectangular
//! assignment problems, and Gumbel noise injection for stochastic relaxations
//! of permutation matrices.
//!
//! ## Core Types
//!
//! - [`Sinkhorn`]: the normalizer, configured by [`SinkhornConfig`]
//! - [`GumbelSinkhorn`]: replicates, perturbs, and normalizes
//! - [`Batch`]: a dense `B × R × C` score tensor
//! - [`Extents`]: per-element valid `nrows × ncols` sub-rectangles
pub mod batch;
pub mod config;
pub mod error;
pub mod extents;
pub mod gumbel;
mod padding;
pub mod reduce;
pub mod sinkhorn;


pub use batch::*;
pub use config::*;
pub use error::*;
pub use extents::*;
pub use gumbel::*;
pub use sinkhorn::*;

// ============================================================================
// TYPE ALIASES
// ============================================================================
/// Row or column count of an active sub-rectangle.
pub type Extent = usize;

/// Floating point element type of a score tensor.
///
/// Implemented for `f32` and `f64`. Constants are carried around as `f64`
/// and lowered with [`Score::of`].
pub trait Score: ndarray::NdFloat {
    fn of(x: f64) -> Self;
}
impl Score for f32 {
    fn of(x: f64) -> Self {
        x as f32
    }
}
impl Score for f64 {
    fn of(x: f64) -> Self {
        x
    }
}

// ============================================================================
// SINKHORN NORMALIZATION
// ============================================================================
/// Alternating row/column normalization passes per call.
pub const SINKHORN_ITERATIONS: usize = 10;
/// Scores are divided by this before exponentiation. Lower = sharper.
pub const SINKHORN_TEMPERATURE: f64 = 1.0;
/// Additive stabilizer of the direct-space scaling mode. Unused in log space.
pub const SINKHORN_EPSILON: f64 = 1e-4;
/// Log-score given to dummy rows inside the active columns.
/// Finite, so "unassigned" stays possible but costly.
pub const DUMMY_SLACK: f64 = -100.0;

// ============================================================================
// GUMBEL SAMPLING
// ============================================================================
/// Default number of noisy replicas per batch element.
pub const GUMBEL_SAMPLES: usize = 5;
/// Keeps both logarithms in -ln(-ln(u + ε) + ε) away from ln(0).
pub const GUMBEL_EPSILON: f64 = 1e-20;

// ============================================================================
// RUNTIME UTILITIES
// ============================================================================
/// Initialize dual logging (terminal + file) with timestamped log files.
/// Creates `logs/` directory and writes DEBUG level to file, INFO to stderr.
#[cfg(feature = "cli")]
pub fn log() -> anyhow::Result<()> {
    std::fs::create_dir_all("logs")?;
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)?
        .as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/{}.log", time))?,
    );
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config.clone(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term, file])?;
    Ok(())
}
