//! schemacost CLI
//!
//! Command-line driver around `schemacost-core`: locates schema and statistics files,
//! runs the estimators and prints plain-text reports.

mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use schemacost_core::catalog::SchemaCatalog;
use schemacost_core::compare::{CandidateSet, ModelComparator};
use schemacost_core::config::EstimatorConfig;
use schemacost_core::cost::CostModel;
use schemacost_core::operation::Operation;
use schemacost_core::plan::QueryPlan;
use schemacost_core::sharding::{ServerPool, ShardingModel};
use schemacost_core::size::SizeModel;
use schemacost_core::stats::StatisticsSnapshot;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schemacost")]
#[command(about = "Estimate storage and query cost of document schema designs")]
#[command(version)]
struct Cli {
    /// Estimator configuration (JSON): server count, workload, sharding probes
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of servers in the sharded cluster
    #[arg(long, global = true)]
    servers: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Document, collection and database sizes of one schema, plus sharding probes
    Analyze {
        /// Schema description file
        #[arg(long)]
        schema: PathBuf,
        /// Statistics snapshot file
        #[arg(long)]
        stats: PathBuf,
    },
    /// Rank every db*.json schema in a directory on the configured workload
    Compare {
        /// Directory holding the candidate schema files
        #[arg(long, default_value = "schemas")]
        schemas_dir: PathBuf,
        /// Statistics snapshot file
        #[arg(long)]
        stats: PathBuf,
    },
    /// Cost of a single operation
    Query {
        /// Statistics snapshot file
        #[arg(long)]
        stats: PathBuf,
        #[command(subcommand)]
        op: QueryOp,
    },
    /// Cost of a multi-step query plan (JSON)
    Plan {
        /// Statistics snapshot file
        #[arg(long)]
        stats: PathBuf,
        /// Plan file
        #[arg(long)]
        plan: PathBuf,
    },
}

#[derive(Subcommand)]
enum QueryOp {
    /// Filter one collection
    Filter {
        collection: String,
        /// Route the filter by this shard key
        #[arg(long)]
        shard_key: Option<String>,
    },
    /// Join two collections
    Join {
        left: String,
        right: String,
        /// Route the join by this shard key
        #[arg(long)]
        shard_key: Option<String>,
    },
    /// Aggregate one collection
    Aggregate {
        collection: String,
        /// Route the aggregate by this shard key
        #[arg(long)]
        shard_key: Option<String>,
    },
}

impl QueryOp {
    fn into_operation(self) -> Operation {
        match self {
            QueryOp::Filter { collection, shard_key } => Operation::Filter { collection, shard_key },
            QueryOp::Join { left, right, shard_key } => Operation::Join { left, right, shard_key },
            QueryOp::Aggregate { collection, shard_key } => {
                Operation::Aggregate { collection, shard_key }
            }
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("schemacost=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref(), cli.servers)?;

    match cli.command {
        Commands::Analyze { schema, stats } => {
            let stats = load_stats(&stats)?;
            let catalog = load_schema(&schema)?;
            warn_unknown_types(&candidate_name(&schema), &catalog);

            let sizes = SizeModel::new(&catalog, &stats).report();
            let probes =
                ShardingModel::new(&stats, config.pool()).probe_all(&catalog, &config.sharding_probes);
            print!("{}", report::render_analysis(&candidate_name(&schema), &sizes, &probes));
        }
        Commands::Compare { schemas_dir, stats } => {
            let stats = load_stats(&stats)?;
            let files = discover_candidates(&schemas_dir)?;
            if files.is_empty() {
                bail!("no db*.json files found in {}", schemas_dir.display());
            }
            info!("found {} candidate schemas", files.len());

            let mut set = CandidateSet::default();
            for (name, path) in files {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("cannot read {}", path.display()))?;
                let loaded = SchemaCatalog::from_json_str(&text);
                if let Ok(catalog) = &loaded {
                    warn_unknown_types(&name, catalog);
                }
                set.push(name, loaded);
            }

            let comparator =
                ModelComparator::new(Arc::new(config.cost_model()), config.workload.clone());
            let comparison = comparator.compare(&set.candidates, &stats);
            print!("{}", report::render_comparison(&comparison, &set.rejected));
        }
        Commands::Query { stats, op } => {
            let stats = load_stats(&stats)?;
            let est = config.cost_model().estimate(&op.into_operation(), &stats);
            print!("{}", report::render_estimate(&est));
        }
        Commands::Plan { stats, plan } => {
            let stats = load_stats(&stats)?;
            let text = std::fs::read_to_string(&plan)
                .with_context(|| format!("cannot read {}", plan.display()))?;
            let plan: QueryPlan = serde_json::from_str(&text)
                .with_context(|| format!("invalid plan {}", plan.display()))?;
            let est = plan.estimate(&config.cost_model(), &stats);
            print!("{}", report::render_plan(&est));
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>, servers: Option<u64>) -> Result<EstimatorConfig> {
    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            EstimatorConfig::from_json_str(&text)
                .with_context(|| format!("invalid config {}", path.display()))?
        }
        None => EstimatorConfig::default(),
    };
    if let Some(servers) = servers {
        config.server_count = ServerPool::new(servers)?;
    }
    Ok(config)
}

fn load_stats(path: &Path) -> Result<StatisticsSnapshot> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    StatisticsSnapshot::from_json_str(&text)
        .with_context(|| format!("invalid statistics {}", path.display()))
}

fn load_schema(path: &Path) -> Result<SchemaCatalog> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    SchemaCatalog::from_json_str(&text).with_context(|| format!("invalid schema {}", path.display()))
}

fn warn_unknown_types(candidate: &str, catalog: &SchemaCatalog) {
    for (path, type_name) in catalog.unknown_field_types() {
        warn!("{}: unknown field type `{}` at {}, sized as string", candidate, type_name, path);
    }
}

/// Upper-cased file stem, e.g. `schemas/db1.json` -> `DB1`.
fn candidate_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| path.display().to_string())
}

/// `db*.json` files in `dir`, sorted by file name.
fn discover_candidates(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries =
        std::fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_candidate = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("db") && n.ends_with(".json"))
            .unwrap_or(false);
        if is_candidate && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files
        .into_iter()
        .map(|path| (candidate_name(&path), path))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_discover_candidates_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["db3.json", "db1.json", "notes.json", "db2.txt", "stats.json"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }

        let found = discover_candidates(dir.path()).unwrap();
        let names: Vec<&str> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["DB1", "DB3"]);
    }

    #[test]
    fn test_load_config_server_override() {
        let config = load_config(None, Some(10)).unwrap();
        assert_eq!(config.pool().server_count(), 10);
        assert!(load_config(None, Some(0)).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "server_count": 250, "sharding_probes": [] }"#).unwrap();

        let config = load_config(Some(&path), None).unwrap();
        assert_eq!(config.pool().server_count(), 250);
        assert!(config.sharding_probes.is_empty());
    }

    fn demos() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos")
    }

    #[test]
    fn test_demo_files_load() {
        let demos = demos();
        let stats = load_stats(&demos.join("stats.json")).unwrap();
        assert_eq!(stats.cardinality("OrderLine"), 4_100_000_000);

        let config = load_config(Some(&demos.join("config.json")), None).unwrap();
        assert_eq!(config, EstimatorConfig::default());

        let found = discover_candidates(&demos.join("schemas")).unwrap();
        let names: Vec<&str> = found.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["DB1", "DB2"]);
        for (_, path) in &found {
            let catalog = load_schema(path).unwrap();
            assert!(catalog.unknown_field_types().is_empty());
        }

        let text = std::fs::read_to_string(demos.join("plan.json")).unwrap();
        let plan: QueryPlan = serde_json::from_str(&text).unwrap();
        assert_eq!(plan.steps.len(), 3);
    }

    #[test]
    fn test_query_op_conversion() {
        let op = QueryOp::Join {
            left: "OrderLine".into(),
            right: "Product".into(),
            shard_key: None,
        }
        .into_operation();
        assert_eq!(op, Operation::join("OrderLine", "Product", None));
    }

    #[test]
    fn test_cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "schemacost", "query", "--stats", "s.json", "filter", "Product", "--shard-key", "IDP",
            "--servers", "8",
        ])
        .unwrap();
        assert_eq!(cli.servers, Some(8));
        match cli.command {
            Commands::Query { op: QueryOp::Filter { collection, shard_key }, .. } => {
                assert_eq!(collection, "Product");
                assert_eq!(shard_key.as_deref(), Some("IDP"));
            }
            _ => panic!("expected query filter"),
        }
    }
}
