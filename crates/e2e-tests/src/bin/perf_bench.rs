use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde::Serialize;

use e2e_tests::{brute_force_topk, random_vectors, recall};
use vectordb_index::{Distance, HnswIndex, HnswParams, Indexer, SearchParams, WorkerPool};

#[derive(Parser, Debug)]
#[command(name = "perf_bench", about = "HNSW build, latency and recall benchmark")]
struct Args {
    #[arg(long, value_enum, default_value = "small")]
    tier: DatasetTier,
    #[arg(long, default_value = "euclidean")]
    distance: String,
    #[arg(long, default_value_t = 16)]
    m: usize,
    #[arg(long, default_value_t = 100)]
    ef_construction: usize,
    /// Beam widths to sweep at query time
    #[arg(long, value_delimiter = ',', default_value = "16,32,64,128")]
    ef: Vec<usize>,
    #[arg(long, default_value_t = 10)]
    topk: usize,
    #[arg(long, default_value_t = 4)]
    workers: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Write the report as JSON here as well as printing it
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Serialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
enum DatasetTier {
    Small,
    Medium,
}

impl DatasetTier {
    /// (points, queries, dimension)
    fn shape(self) -> (usize, usize, usize) {
        match self {
            DatasetTier::Small => (5_000, 100, 32),
            DatasetTier::Medium => (50_000, 200, 64),
        }
    }
}

#[derive(Debug, Serialize)]
struct Report {
    tier: DatasetTier,
    points: usize,
    dimension: usize,
    workers: usize,
    build_ms: u128,
    max_level: Option<usize>,
    sweeps: Vec<Sweep>,
}

#[derive(Debug, Serialize)]
struct Sweep {
    ef: usize,
    recall: f64,
    p50_us: u128,
    p95_us: u128,
    qps: f64,
}

fn percentile(sorted: &[Duration], pct: usize) -> u128 {
    if sorted.is_empty() {
        return 0;
    }
    let pos = (sorted.len() * pct / 100).min(sorted.len() - 1);
    sorted[pos].as_micros()
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let distance: Distance = args.distance.parse()?;
    let (points, query_count, dim) = args.tier.shape();

    let data = random_vectors(points, dim, args.seed);
    let queries = random_vectors(query_count, dim, args.seed.wrapping_add(1));

    let params = HnswParams::new(points)
        .with_m(args.m)
        .with_ef_construction(args.ef_construction);
    let index = HnswIndex::with_seed(distance, &params, args.seed)?;
    let pool = WorkerPool::new(args.workers);

    let items = data
        .iter()
        .enumerate()
        .map(|(pos, v)| (pos.to_string(), v.clone()))
        .collect();
    let started = Instant::now();
    for result in pool.insert_all(&index, items) {
        result?;
    }
    let build_ms = started.elapsed().as_millis();

    let truth: Vec<Vec<String>> = queries
        .iter()
        .map(|q| {
            brute_force_topk(distance, &data, q, args.topk)
                .into_iter()
                .map(|pos| pos.to_string())
                .collect()
        })
        .collect();

    let mut sweeps = Vec::new();
    for &ef in &args.ef {
        let search = SearchParams::with_ef(ef);
        let mut latencies = Vec::with_capacity(queries.len());
        let mut total_recall = 0.0;

        let sweep_started = Instant::now();
        for (query, expected) in queries.iter().zip(&truth) {
            let t = Instant::now();
            let found: Vec<String> = index
                .search(query, args.topk, &search)?
                .into_iter()
                .map(|r| r.id)
                .collect();
            latencies.push(t.elapsed());
            total_recall += recall(expected, &found);
        }
        let elapsed = sweep_started.elapsed().as_secs_f64();
        latencies.sort();

        sweeps.push(Sweep {
            ef,
            recall: total_recall / queries.len() as f64,
            p50_us: percentile(&latencies, 50),
            p95_us: percentile(&latencies, 95),
            qps: queries.len() as f64 / elapsed.max(f64::EPSILON),
        });
    }

    let report = Report {
        tier: args.tier,
        points,
        dimension: dim,
        workers: pool.workers(),
        build_ms,
        max_level: index.stats().max_level,
        sweeps,
    };

    let json = serde_json::to_string_pretty(&report)?;
    println!("{json}");
    if let Some(path) = args.out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, json)?;
    }
    Ok(())
}
