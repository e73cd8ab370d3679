use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use sitekit_core::check::check_site;
use sitekit_core::config::SiteConfig;
use sitekit_core::fetch::HttpFetcher;
use sitekit_core::migrate::{
    MigrateOptions, RecordOutcome, RecordReport, SkipReason, load_seed, migrate,
};
use sitekit_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, normalize_for_display, resolve_paths,
};
use sitekit_core::schema::validate_content;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "SITEKIT_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "sitekit",
    version,
    about = "Build-output checks and YouTube content migration for the portfolio site"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Check built HTML for missing local assets and images without alt text")]
    Check(CheckArgs),
    #[command(about = "Create works documents and covers from the YouTube seed list")]
    Migrate(MigrateArgs),
    #[command(about = "Validate works frontmatter against the content schema")]
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[arg(long, value_name = "PATH", help = "Build output directory (default: dist)")]
    dist: Option<PathBuf>,
    #[arg(long, help = "Print the full report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct MigrateArgs {
    #[arg(long, help = "Skip oEmbed metadata lookups")]
    no_fetch: bool,
    #[arg(long, value_name = "PATH", help = "Seed file (default: scripts/videos.seed.json)")]
    seed: Option<PathBuf>,
    #[arg(long, help = "Print the migration report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long, value_name = "PATH", help = "Content directory (default: src/content/works)")]
    content: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Check(args)) => run_check(&runtime, args),
        Some(Commands::Migrate(args)) => run_migrate(&runtime, args),
        Some(Commands::Validate(args)) => run_validate(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_check(runtime: &RuntimeOptions, args: CheckArgs) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    let root = args
        .dist
        .map(|dist| paths.project_root.join(dist))
        .unwrap_or_else(|| paths.dist_dir.clone());

    let report = check_site(&root)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    if runtime.diagnostics {
        println!("[diagnostics]\n{}", paths.diagnostics());
        println!("dist_dir: {}", normalize_for_display(&root));
        println!("documents_scanned: {}", report.documents_scanned);
        println!("references_checked: {}", report.references_checked);
    }

    if !report.is_clean() {
        for line in report.render_findings() {
            eprintln!("{line}");
        }
        bail!(
            "asset & link checks failed with {} finding(s)",
            report.total_findings()
        );
    }

    println!("Asset & link checks passed.");
    Ok(())
}

fn run_migrate(runtime: &RuntimeOptions, args: MigrateArgs) -> Result<()> {
    let (paths, config) = resolve_runtime_paths(runtime)?;
    let seed_path = args
        .seed
        .map(|seed| paths.project_root.join(seed))
        .unwrap_or_else(|| paths.seed_path.clone());
    if runtime.diagnostics {
        println!("[diagnostics]\n{}", paths.diagnostics());
        println!("seed_path: {}", normalize_for_display(&seed_path));
        println!("fetch: {}", !args.no_fetch);
    }

    let records = load_seed(&seed_path)?;
    let options = MigrateOptions::resolve(&paths, &config, !args.no_fetch);
    let fetcher = HttpFetcher::from_config(&config)?;

    let report = migrate(&records, &options, &fetcher, |record| {
        if !args.json {
            println!("{}", outcome_line(record));
        }
    })?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!(
        "written: {}, skipped: {}, covers missing: {}",
        report.written(),
        report.skipped(),
        report.covers_missing()
    );
    println!("Done.");
    Ok(())
}

fn outcome_line(record: &RecordReport) -> String {
    match &record.outcome {
        RecordOutcome::Written => format!("✓ Wrote {}", record.document_name()),
        RecordOutcome::Skipped(SkipReason::Exists) => {
            format!("↷ Skip existing: {}", record.document_name())
        }
        RecordOutcome::Skipped(SkipReason::Collision { first_url }) => format!(
            "↷ Skip duplicate slug: {} (already used by {first_url})",
            record.document_name()
        ),
    }
}

fn run_validate(runtime: &RuntimeOptions, args: ValidateArgs) -> Result<()> {
    let (paths, _) = resolve_runtime_paths(runtime)?;
    let root = args
        .content
        .map(|content| paths.project_root.join(content))
        .unwrap_or_else(|| paths.content_dir.clone());
    if runtime.diagnostics {
        println!("[diagnostics]\n{}", paths.diagnostics());
    }

    let report = validate_content(&root)?;
    if !report.is_clean() {
        for line in report.render_issues() {
            eprintln!("{line}");
        }
        bail!(
            "content validation failed for {} document(s)",
            report.issues.len()
        );
    }

    println!(
        "Content schema checks passed ({} documents).",
        report.documents_checked
    );
    Ok(())
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<(ResolvedPaths, SiteConfig)> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        config: runtime.config.clone(),
    };

    let (initial, _) = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}
