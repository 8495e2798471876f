use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use role_miner::config::{Config, ConfigOverrides, DataConfig};
use role_miner::candidates::StrategyView;
use role_miner::engine::{AnalysisReport, MiningEngine};
use role_miner::ingest::{load_population_from_paths, load_target_ids_from_path, resolve_targets};
use role_miner::optimizer::{best_scoring, Policy, Solution, POLICIES};
use role_miner::model::UserIndex;
use role_miner::output::csv::{outliers_to_csv, roles_to_csv, solutions_to_csv};
use role_miner::output::json::render_json;
use role_miner::output::table::{
    render_policies_table, render_role_detail, render_roles_table, render_solutions_table,
    render_strategies_table, render_strategy_view,
};
use role_miner::progress::TracingProgress;
use role_miner::server::run_server;
use role_miner::strategy::{Strategy, DEFAULT_CATALOG};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

/// Which analysis export `--output csv` writes.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CsvExport {
    /// One row per shared entitlement of the selected policy's roles
    Roles,
    /// One row per policy
    Summary,
    /// Low-commonality and per-user exception grants of the selected roles
    Outliers,
}

#[derive(Debug, Parser)]
#[command(
    name = "role-miner",
    about = "Mine candidate roles from HR attributes and entitlement grants"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    /// Commonality threshold between 0.50 and 1.00
    #[arg(short, long)]
    threshold: Option<f64>,
    #[arg(short = 'm', long = "min-group")]
    min_group: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Analyze {
        #[arg(long)]
        hr: Option<PathBuf>,
        #[arg(long)]
        entitlements: Option<PathBuf>,
        #[arg(long)]
        users: Option<PathBuf>,
        /// Policy whose roles are printed; 0 is the recommended one
        #[arg(long, default_value_t = 0)]
        policy: usize,
        #[arg(long, value_enum, default_value_t = CsvExport::Roles)]
        export: CsvExport,
        /// Print every role's entitlements, members and exceptions
        #[arg(long)]
        detail: bool,
    },
    /// Browse candidate roles per strategy at the base threshold
    Candidates {
        #[arg(long)]
        hr: Option<PathBuf>,
        #[arg(long)]
        entitlements: Option<PathBuf>,
        #[arg(long)]
        users: Option<PathBuf>,
        #[arg(long)]
        strategy: Option<String>,
    },
    Strategies,
    Policies,
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        threshold: cli.threshold,
        min_group: cli.min_group,
    });

    match &cli.command {
        Commands::Config { init, show } => handle_config_command(*init, *show, &config, &config_path),
        Commands::Serve { host, port } => {
            let host = host.clone().unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let bind = format!("{host}:{port}");
            let addr: SocketAddr = bind
                .parse()
                .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
            run_server(config, addr).await
        }
        Commands::Strategies => print_strategies(&DEFAULT_CATALOG, cli.output),
        Commands::Policies => print_policies(&POLICIES, cli.output),
        Commands::Analyze {
            hr,
            entitlements,
            users,
            policy,
            export,
            detail,
        } => {
            let (index, targets) =
                load_inputs(&config, hr.as_deref(), entitlements.as_deref(), users.as_deref())?;
            let report = run_analysis(&config, &index, &targets)?;
            let view = ReportView {
                policy: *policy,
                export: *export,
                detail: *detail,
            };
            print_report(&report, &index, view, cli.output)
        }
        Commands::Candidates {
            hr,
            entitlements,
            users,
            strategy,
        } => {
            let (index, targets) =
                load_inputs(&config, hr.as_deref(), entitlements.as_deref(), users.as_deref())?;
            let params = config.analysis_params()?;
            let engine =
                MiningEngine::with_progress(&index, &targets, &DEFAULT_CATALOG, &mut TracingProgress)?;
            let mut views = engine.browse(&params);
            if let Some(name) = strategy {
                views.retain(|v| v.strategy.eq_ignore_ascii_case(name.trim()));
                if views.is_empty() {
                    warn!("strategy {name} produced no candidate roles");
                }
            }
            print_candidates(&views, cli.output)
        }
    }
}

fn input_path(flag: Option<&Path>, configured: &str, name: &str) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| DataConfig::resolved(configured))
        .ok_or_else(|| anyhow!("{name} is required (or set it under [data] in the config)"))
}

fn load_inputs(
    config: &Config,
    hr: Option<&Path>,
    entitlements: Option<&Path>,
    users: Option<&Path>,
) -> Result<(UserIndex, Vec<String>)> {
    let hr = input_path(hr, &config.data.hr_path, "--hr")?;
    let entitlements = input_path(
        entitlements,
        &config.data.entitlements_path,
        "--entitlements",
    )?;
    let users = input_path(users, &config.data.users_path, "--users")?;

    let index = load_population_from_paths(&hr, &entitlements)?;
    let requested = load_target_ids_from_path(&users)?;
    let targets = resolve_targets(&index, &requested)?;
    info!(
        "loaded {} target users against {} employees",
        targets.len(),
        index.len()
    );
    Ok((index, targets))
}

fn run_analysis(config: &Config, index: &UserIndex, targets: &[String]) -> Result<AnalysisReport> {
    let params = config.analysis_params()?;
    let mut progress = TracingProgress;
    let engine = MiningEngine::with_progress(index, targets, &DEFAULT_CATALOG, &mut progress)?;
    Ok(engine.analyze(&params, &mut progress))
}

fn handle_config_command(init: bool, show: bool, config: &Config, config_path: &Path) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct ReportView {
    policy: usize,
    export: CsvExport,
    detail: bool,
}

fn print_report(
    report: &AnalysisReport,
    index: &UserIndex,
    view: ReportView,
    format: OutputFormat,
) -> Result<()> {
    let selected = select_solution(&report.solutions, view.policy)?;
    match format {
        OutputFormat::Table => {
            println!("{}", render_solutions_table(&report.solutions));
            if let Some(best) = best_scoring(&report.solutions) {
                if best != 0 {
                    info!(
                        "highest composite score: {} ({:.1})",
                        report.solutions[best].policy_name, report.solutions[best].composite_score
                    );
                }
            }
            println!(
                "\n{} ({} roles, threshold {:.2}, min group {})",
                selected.policy_name,
                selected.roles.len(),
                selected.threshold,
                selected.min_group
            );
            println!("{}", render_roles_table(selected));
            if view.detail {
                for role in &selected.roles {
                    println!("\n{}", render_role_detail(role, index));
                }
            }
        }
        OutputFormat::Json => println!("{}", render_json(report)?),
        OutputFormat::Csv => println!("{}", csv_export(report, selected, index, view.export)?),
    }
    Ok(())
}

fn csv_export(
    report: &AnalysisReport,
    selected: &Solution,
    index: &UserIndex,
    export: CsvExport,
) -> Result<String> {
    if selected.roles.is_empty() && !matches!(export, CsvExport::Summary) {
        warn!("{} selected no roles, the export has headers only", selected.policy_name);
    }
    match export {
        CsvExport::Roles => roles_to_csv(selected),
        CsvExport::Summary => solutions_to_csv(&report.solutions),
        CsvExport::Outliers => outliers_to_csv(selected, index),
    }
}

fn print_candidates(views: &[StrategyView], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            for view in views {
                println!("{}\n", render_strategy_view(view));
            }
        }
        OutputFormat::Json => println!("{}", render_json(views)?),
        OutputFormat::Csv => {
            warn!("CSV output for candidates not implemented, using JSON");
            println!("{}", render_json(views)?);
        }
    }
    Ok(())
}

fn select_solution(solutions: &[Solution], policy: usize) -> Result<&Solution> {
    solutions
        .get(policy)
        .ok_or_else(|| anyhow!("unknown policy index {policy}, expected 0..{}", solutions.len()))
}

fn print_strategies(catalog: &[Strategy], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_strategies_table(catalog)),
        OutputFormat::Json => println!("{}", render_json(catalog)?),
        OutputFormat::Csv => {
            warn!("CSV output for strategies not implemented, using JSON");
            println!("{}", render_json(catalog)?);
        }
    }
    Ok(())
}

fn print_policies(policies: &[Policy], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => println!("{}", render_policies_table(policies)),
        OutputFormat::Json => println!("{}", render_json(policies)?),
        OutputFormat::Csv => {
            warn!("CSV output for policies not implemented, using JSON");
            println!("{}", render_json(policies)?);
        }
    }
    Ok(())
}
