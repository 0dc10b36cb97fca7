//! joinopt CLI
//!
//! Usage:
//!   joinopt optimize <dump-file> [--cost-model cout|learned] [--forest <path>]
//!   joinopt print-query <dump-file>

use clap::{Parser, Subcommand, ValueEnum};
use joinopt::config::Settings;
use joinopt::cost::{CostModel, CostOut};
use joinopt::dp::DpSize;
use joinopt::model::Model;
use joinopt::parser::parse_dump;
use joinopt::plan::printer::print_plan;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "joinopt")]
#[command(about = "Join-order optimizer over bitset-encoded relation classes")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (defaults applied if absent).
    #[arg(short, long, default_value = "joinopt.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run DPsize over a query dump and print the chosen plan.
    Optimize {
        /// Path to the query dump file.
        file: PathBuf,

        /// Which cost adapter to score candidate joins with.
        #[arg(short = 'm', long, default_value = "cout")]
        cost_model: CostModelArg,

        /// Path to a compiled forest object, overriding the config file.
        /// Only meaningful with `--cost-model learned` and a `forest-ffi` build.
        #[arg(long)]
        forest: Option<PathBuf>,
    },

    /// Parse a query dump and print the relations and joins it resolved to.
    PrintQuery {
        /// Path to the query dump file.
        file: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CostModelArg {
    /// C_out: sum of output cardinalities, no learned model required.
    Cout,
    /// The trained regression-forest cost model.
    Learned,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = match Settings::load(&cli.config) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to load config, using defaults");
            Default::default()
        }
    };

    match cli.command {
        Commands::Optimize {
            file,
            cost_model,
            forest,
        } => cmd_optimize(file, cost_model, forest, &settings),
        Commands::PrintQuery { file } => cmd_print_query(file),
    }
}

fn read_dump(file: &PathBuf) -> Result<joinopt::QueryGraph, ExitCode> {
    let source = fs::read_to_string(file).map_err(|e| {
        error!(path = %file.display(), error = %e, "failed to read query dump");
        ExitCode::FAILURE
    })?;
    parse_dump(&source).map_err(|e| {
        error!(error = %e, "failed to build query graph");
        ExitCode::FAILURE
    })
}

fn cmd_print_query(file: PathBuf) -> ExitCode {
    let graph = match read_dump(&file) {
        Ok(g) => g,
        Err(code) => return code,
    };

    println!("relations: {}", graph.len());
    for relation in &graph.relations {
        println!(
            "  {} (id={}, table_size={}, cardinality={})",
            relation.name, relation.id, relation.table_size, relation.cardinality
        );
    }
    println!("joins: {}", graph.joins.len());
    for join in &graph.joins {
        println!("  {:#x} <-> {:#x} (sel={})", join.left, join.right, join.selectivity);
    }
    ExitCode::SUCCESS
}

fn cmd_optimize(
    file: PathBuf,
    cost_model: CostModelArg,
    forest: Option<PathBuf>,
    settings: &Settings,
) -> ExitCode {
    let graph = match read_dump(&file) {
        Ok(g) => g,
        Err(code) => return code,
    };

    let started = std::time::Instant::now();
    let result = match cost_model {
        CostModelArg::Cout => {
            let mut dp = DpSize::new(&graph, CostOut);
            dp.run().map(|root| (root, dp))
        }
        CostModelArg::Learned => {
            let forest_path = forest.or_else(|| settings.resolved_forest_library().ok().flatten());
            return cmd_optimize_learned(&graph, forest_path, settings);
        }
    };

    match result {
        Ok((Some(root), dp)) => {
            let elapsed = started.elapsed();
            info!(elapsed_ms = elapsed.as_secs_f64() * 1000.0, "optimization complete");
            println!("{}", print_plan(dp.arena(), &graph, root));
            println!("cost: {}", dp.arena().get(root).cost);
            ExitCode::SUCCESS
        }
        Ok((None, _)) => {
            error!("query graph is disconnected or empty; no plan exists");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "DP run failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "forest-ffi")]
fn cmd_optimize_learned(
    graph: &joinopt::QueryGraph,
    forest_path: Option<PathBuf>,
    settings: &Settings,
) -> ExitCode {
    if forest_path.is_none() {
        error!("--cost-model learned requires --forest <path> or [model].forest_library in the config file");
        return ExitCode::FAILURE;
    }
    // ExternForest links against a process-global `forest_root` symbol at
    // build time (spec 6.1); `forest_path` only confirms the operator has
    // set one up, the linker resolves the actual symbol.
    let mut model = Model::new(joinopt::model::ExternForest);
    model.resize(settings.model.buffer_capacity.max(1));
    let adapter = CostModel::new(model);
    let mut dp = DpSize::new(graph, adapter);
    match dp.run() {
        Ok(Some(root)) => {
            println!("{}", print_plan(dp.arena(), graph, root));
            println!("cost: {}", dp.arena().get(root).cost);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            error!("query graph is disconnected or empty; no plan exists");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "DP run failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(feature = "forest-ffi"))]
fn cmd_optimize_learned(
    _graph: &joinopt::QueryGraph,
    _forest_path: Option<PathBuf>,
    _settings: &Settings,
) -> ExitCode {
    error!(
        "this build was compiled without the `forest-ffi` feature; rebuild with \
         --features forest-ffi and a linked forest object to use --cost-model learned"
    );
    ExitCode::FAILURE
}
