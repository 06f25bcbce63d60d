//! Build (or reopen) an index over a synthetic relation and run one range
//! scan.
//!
//! Usage: `leafline [data_dir] [records] [low] [high]`
//!
//! Scans `low <= key < high`. Without a `data_dir` argument the directory
//! comes from `LEAFLINE_DATA_DIR` (default `./data`).

use std::process::ExitCode;
use std::sync::Arc;

use leafline::{BTreeIndex, BufferPoolManager, Datatype, IndexConfig, MemoryRelation, Operator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_RECORDS: i32 = 5_000;
const ATTR_OFFSET: usize = 8;
const RECORD_LEN: usize = 32;

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "leafline=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> leafline::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut config = IndexConfig::from_env()?;
    if let Some(dir) = args.first() {
        config = config.with_data_dir(dir);
    }
    let records = parse_arg(&args, 1, "records", DEFAULT_RECORDS)?;
    let low = parse_arg(&args, 2, "low", records / 4)?;
    let high = parse_arg(&args, 3, "high", records / 2)?;

    tracing::info!(
        data_dir = %config.data_dir.display(),
        pool_size = config.pool_size,
        records,
        "starting"
    );

    // Salaries spread over the key space in a scrambled order.
    let mut relation = MemoryRelation::new("employees");
    for i in 0..records.max(0) {
        let salary = (i64::from(i) * 7_919 % i64::from(records.max(1))) as i32;
        relation.push_int(ATTR_OFFSET, salary, RECORD_LEN);
    }

    let bpm = Arc::new(BufferPoolManager::new(config.pool_size));
    let mut index = BTreeIndex::open_or_create(
        Arc::clone(&bpm),
        &config,
        &relation,
        ATTR_OFFSET,
        Datatype::Integer,
    )?;
    tracing::info!(
        index = index.index_name(),
        root = %index.root_page_id(),
        height = index.height()?,
        "index ready"
    );

    let rids = index.scan_range(low, Operator::Gte, high, Operator::Lt)?;
    tracing::info!(low, high, matches = rids.len(), "scan finished");
    if let Some(first) = rids.first() {
        tracing::info!(%first, "first match");
    }

    drop(index);
    tracing::info!(stats = %bpm.stats().snapshot(), "buffer pool");
    Ok(())
}

fn parse_arg(args: &[String], position: usize, name: &str, default: i32) -> leafline::Result<i32> {
    match args.get(position) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| leafline::Error::InvalidConfig {
            name: name.to_string(),
            message: format!("'{value}' is not an integer"),
        }),
    }
}
