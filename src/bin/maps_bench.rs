//! maps-bench - times insert, remove and find on both map types
//!
//! Usage:
//!   maps-bench [COUNT] [--buckets N]

use std::time::{Duration, Instant};

use anyhow::Context;
use assoc_maps::{AvlTreeMap, ChainedHashMap};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_COUNT: usize = 60_000;

#[derive(Parser)]
#[command(name = "maps-bench")]
#[command(about = "Compare a chained hash map with an AVL tree map")]
struct Cli {
    /// Number of sequential keys to insert
    #[arg(default_value_t = DEFAULT_COUNT)]
    count: usize,

    /// Bucket count of the hash map (defaults to COUNT)
    #[arg(long)]
    buckets: Option<usize>,
}

#[derive(Clone, Copy)]
enum Round {
    Insert,
    Remove,
    Find,
}

impl Round {
    fn title(self) -> &'static str {
        match self {
            Round::Insert => "Test1: Inserting elements",
            Round::Remove => "Test2: Removing elements",
            Round::Find => "Test3: Finding elements",
        }
    }
}

/// Keys touched by the remove and find rounds.
fn probe_keys(count: usize) -> impl Iterator<Item = usize> {
    (2..count / 2).step_by(4)
}

fn filled_hash_map(count: usize, buckets: usize) -> anyhow::Result<ChainedHashMap<usize, String>> {
    let mut map = ChainedHashMap::with_bucket_count(buckets);
    map.try_extend((0..count).map(|key| (key, String::from("Item"))))
        .context("filling hash map")?;
    Ok(map)
}

fn filled_tree_map(count: usize) -> anyhow::Result<AvlTreeMap<usize, String>> {
    let mut map = AvlTreeMap::new();
    map.try_extend((0..count).map(|key| (key, String::from("Item"))))
        .context("filling tree map")?;
    Ok(map)
}

fn time_hash_map(round: Round, count: usize, buckets: usize) -> anyhow::Result<Duration> {
    let elapsed = match round {
        Round::Insert => {
            let mut map = ChainedHashMap::with_bucket_count(buckets);
            let start = Instant::now();
            for key in 0..count {
                map.insert(key, String::from("Item"))
                    .with_context(|| format!("inserting key {key} into hash map"))?;
            }
            start.elapsed()
        }
        Round::Remove => {
            let mut map = filled_hash_map(count, buckets)?;
            let start = Instant::now();
            for key in probe_keys(count) {
                map.remove(&key)
                    .with_context(|| format!("removing key {key} from hash map"))?;
            }
            start.elapsed()
        }
        Round::Find => {
            let map = filled_hash_map(count, buckets)?;
            let start = Instant::now();
            for key in probe_keys(count) {
                std::hint::black_box(map.find(&key));
            }
            start.elapsed()
        }
    };
    Ok(elapsed)
}

fn time_tree_map(round: Round, count: usize) -> anyhow::Result<Duration> {
    let elapsed = match round {
        Round::Insert => {
            let mut map = AvlTreeMap::new();
            let start = Instant::now();
            map.try_extend((0..count).map(|key| (key, String::from("Item"))))
                .context("bulk inserting into tree map")?;
            start.elapsed()
        }
        Round::Remove => {
            let mut map = filled_tree_map(count)?;
            let start = Instant::now();
            for key in probe_keys(count) {
                map.remove(&key)
                    .with_context(|| format!("removing key {key} from tree map"))?;
            }
            start.elapsed()
        }
        Round::Find => {
            let map = filled_tree_map(count)?;
            let start = Instant::now();
            for key in probe_keys(count) {
                std::hint::black_box(map.find(&key));
            }
            start.elapsed()
        }
    };
    Ok(elapsed)
}

fn run_round(round: Round, count: usize, buckets: usize) -> anyhow::Result<()> {
    println!("{}", round.title());
    let hash = time_hash_map(round, count, buckets)?;
    println!("HashMap: {} us", hash.as_micros());
    let tree = time_tree_map(round, count)?;
    println!("TreeMap: {} us", tree.as_micros());
    let difference = tree.as_micros() as i128 - hash.as_micros() as i128;
    println!("Difference: {difference} us\n");
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let buckets = cli.buckets.unwrap_or(cli.count);
    tracing::info!(count = cli.count, buckets, "starting benchmark");

    for round in [Round::Insert, Round::Remove, Round::Find] {
        if let Err(err) = run_round(round, cli.count, buckets) {
            tracing::error!("{}: {err:#}", round.title());
        }
    }
}
