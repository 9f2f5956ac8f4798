//! Sinkhorn Binary
//!
//! Normalizes a JSON score matrix (rank 2 or 3) from a file or stdin and
//! prints the result as JSON. With no input it runs the 4 x 3 demo matrix.
//!
//! Options: --iterations, --tau, --nrows, --ncols, --dummy, --batched,
//! --samples, --seed, --config

use clap::Parser;
use gumbel_sinkhorn::*;
use ndarray::ArrayD;
use ndarray::Axis;
use ndarray::IxDyn;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::Deserialize;
use serde::Serialize;
use std::io::Read;

#[derive(Debug, Parser)]
#[command(name = "sinkhorn", about = "log-domain Sinkhorn normalization")]
struct Args {
    /// JSON nested array of rank 2 or 3; "-" reads stdin
    input: Option<String>,
    /// JSON file with a SinkhornConfig; flags below override it
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    #[arg(short, long)]
    iterations: Option<usize>,
    #[arg(short, long)]
    tau: Option<f64>,
    /// per-element row extents, comma separated
    #[arg(long, value_delimiter = ',')]
    nrows: Vec<usize>,
    /// per-element column extents, comma separated
    #[arg(long, value_delimiter = ',')]
    ncols: Vec<usize>,
    /// pad with slack rows so rectangular inputs behave as square
    #[arg(long)]
    dummy: bool,
    /// reduce over the whole tensor at once
    #[arg(long)]
    batched: bool,
    /// draw this many Gumbel-perturbed replicas per element
    #[arg(short, long)]
    samples: Option<usize>,
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Args {
    fn config(&self) -> anyhow::Result<SinkhornConfig> {
        let mut config = match self.config {
            Some(ref path) => SinkhornConfig::from_json(&std::fs::read_to_string(path)?)?,
            None => SinkhornConfig::default(),
        };
        config.max_iter = self.iterations.unwrap_or(config.max_iter);
        config.tau = self.tau.unwrap_or(config.tau);
        config.batched |= self.batched;
        config.validate()?;
        Ok(config)
    }
    fn scores(&self) -> anyhow::Result<ArrayD<f64>> {
        let json = match self.input.as_deref() {
            None => return Scores::demo().array(),
            Some("-") => {
                let mut buffer = String::new();
                std::io::stdin().read_to_string(&mut buffer)?;
                buffer
            }
            Some(path) => std::fs::read_to_string(path)?,
        };
        serde_json::from_str::<Scores>(&json)?.array()
    }
    fn extents(xs: &[usize]) -> Option<&[usize]> {
        (!xs.is_empty()).then_some(xs)
    }
}

/// Wire format: a bare matrix or a batch of matrices.
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Scores {
    Matrix(Vec<Vec<f64>>),
    Batch(Vec<Vec<Vec<f64>>>),
}

impl Scores {
    fn demo() -> Self {
        Self::Matrix(vec![
            vec![1., 0., 1.],
            vec![1., 0., 3.],
            vec![2., 0., 1.],
            vec![4., 0., 2.],
        ])
    }
    fn array(self) -> anyhow::Result<ArrayD<f64>> {
        let (shape, flat) = match self {
            Self::Matrix(m) => (vec![m.len(), width(&m)?], m.concat()),
            Self::Batch(b) => {
                let rows = b.first().map_or(0, Vec::len);
                let cols = b.iter().map(|m| width(m)).try_fold(0, |w, x| -> anyhow::Result<usize> {
                    let x = x?;
                    anyhow::ensure!(w == 0 || w == x, "ragged batch");
                    Ok(x)
                })?;
                anyhow::ensure!(b.iter().all(|m| m.len() == rows), "ragged batch");
                (vec![b.len(), rows, cols], b.concat().concat())
            }
        };
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), flat)?)
    }
}

impl TryFrom<&ArrayD<f64>> for Scores {
    type Error = anyhow::Error;
    fn try_from(p: &ArrayD<f64>) -> anyhow::Result<Self> {
        let rows = |m: ndarray::ArrayViewD<'_, f64>| {
            m.outer_iter()
                .map(|r| r.iter().copied().collect())
                .collect::<Vec<Vec<f64>>>()
        };
        match p.ndim() {
            2 => Ok(Self::Matrix(rows(p.view()))),
            3 => Ok(Self::Batch(p.outer_iter().map(rows).collect())),
            n => Err(anyhow::anyhow!("cannot print rank {} output", n)),
        }
    }
}

/// Common row length, refusing ragged rows.
fn width(m: &[Vec<f64>]) -> anyhow::Result<usize> {
    let cols = m.first().map_or(0, Vec::len);
    anyhow::ensure!(m.iter().all(|r| r.len() == cols), "ragged matrix");
    Ok(cols)
}

/// Logs the marginals of every output matrix.
fn report(p: &ArrayD<f64>) {
    let matrices = match p.ndim() {
        2 => vec![p.view()],
        _ => p.outer_iter().collect(),
    };
    for (b, m) in matrices.into_iter().enumerate() {
        let rows = m.sum_axis(Axis(1));
        let cols = m.sum_axis(Axis(0));
        log::info!("matrix {} row sums {:.4}", b, rows);
        log::info!("matrix {} col sums {:.4}", b, cols);
    }
}

fn main() -> anyhow::Result<()> {
    log()?;
    let args = Args::parse();
    let config = args.config()?;
    let scores = args.scores()?;
    let nrows = Args::extents(&args.nrows);
    let ncols = Args::extents(&args.ncols);
    log::info!("normalizing {:?} scores with {:?}", scores.shape(), config);
    let p = match args.samples {
        Some(n) => GumbelSinkhorn::new(config)?.sample(
            &mut SmallRng::seed_from_u64(args.seed),
            scores.view(),
            nrows,
            ncols,
            n,
            args.dummy,
        )?,
        None => Sinkhorn::new(config)?.normalize(scores.view(), nrows, ncols, args.dummy)?,
    };
    report(&p);
    println!("{}", serde_json::to_string_pretty(&Scores::try_from(&p)?)?);
    Ok(())
}
