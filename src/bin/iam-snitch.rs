//! iam-snitch CLI
//!
//! `refresh` recompiles the rule database from an authorization-details
//! snapshot; `whocan` queries it.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use iam_snitch::{AccessControlRule, Filter, SnapshotSource, Snitch, SnitchConfig};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "iam-snitch")]
#[command(about = "Find out who can do what in an AWS account")]
struct Args {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Rule database [default: .snitch.db]
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Recompile and store every role's access rules
    Refresh {
        /// Output of `aws iam get-account-authorization-details`
        #[arg(short, long)]
        snapshot: Option<PathBuf>,

        /// Roles processed per page
        #[arg(long)]
        page_size: Option<usize>,
    },

    /// List the principals that can perform an action on a resource
    ///
    /// Example: iam-snitch whocan -p "s3:PutObject" -r "*"
    Whocan {
        /// Permission pattern (repeatable)
        #[arg(short = 'p', long = "permission", short_alias = 'a', alias = "action", default_value = "*")]
        permissions: Vec<String>,

        /// Resource pattern (repeatable)
        #[arg(short = 'r', long = "resource", default_value = "*")]
        resources: Vec<String>,

        /// Treat `*` literally
        #[arg(long)]
        exact: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

/// Principal, then the grant chain as an indented tree
fn render_text(rules: &[AccessControlRule]) -> String {
    let mut out = String::new();
    for rule in rules {
        let _ = writeln!(out, "{}", rule.principal);
        let _ = writeln!(out, "  can {} on {}", rule.permission, rule.resource);
        let _ = writeln!(out, "via:");
        let mut indent = String::from("  ");
        for grant in rule.grant_chain.grants() {
            let _ = writeln!(out, "{}|-> {}", indent, grant);
            indent.push_str("  ");
        }
        out.push('\n');
    }
    out
}

/// `RUST_LOG` when set (info otherwise); `-v` raises the global level to debug
fn log_filter(verbose: bool, rust_log: Option<&str>) -> EnvFilter {
    let filter = rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    if verbose {
        filter.add_directive(tracing::Level::DEBUG.into())
    } else {
        filter
    }
}

fn load_config(args: &Args) -> anyhow::Result<SnitchConfig> {
    let mut config = match &args.config {
        Some(path) => SnitchConfig::load(path)
            .with_context(|| format!("Failed to load config {:?}", path))?,
        None => SnitchConfig::default(),
    };

    if let Some(database) = &args.database {
        config = config.with_database(database);
    }
    if let Command::Refresh {
        snapshot,
        page_size,
    } = &args.command
    {
        if let Some(snapshot) = snapshot {
            config = config.with_snapshot(snapshot);
        }
        if let Some(page_size) = page_size {
            config = config.with_page_size(*page_size);
        }
    }

    config.check().context("Invalid configuration")?;
    debug!("Configuration: {:?}", config);
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(args.verbose, rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;
    let mut snitch = Snitch::open(&config)
        .with_context(|| format!("Failed to open rule database {:?}", config.database))?;

    match args.command {
        Command::Refresh { .. } => {
            let Some(snapshot) = &config.snapshot else {
                bail!("No snapshot given; pass --snapshot or set `snapshot` in the config file");
            };
            let source = SnapshotSource::from_path(snapshot)
                .with_context(|| format!("Failed to load snapshot {:?}", snapshot))?
                .with_page_size(config.page_size);

            let report = snitch.refresh(&source).context("Refresh failed")?;
            println!(
                "{} roles over {} pages, {} rules ({} roles and {} policies skipped)",
                report.roles, report.pages, report.rules, report.skipped_roles, report.skipped_policies
            );
        }
        Command::Whocan {
            permissions,
            resources,
            exact,
            format,
        } => {
            let mut filter = Filter::new().exact(exact);
            for permission in permissions {
                filter.add_permission(permission);
            }
            for resource in resources {
                filter.add_resource(resource);
            }

            let rules = snitch.who_can(&filter).context("Query failed")?;
            info!("{} matching rules", rules.len());

            match format {
                Format::Text => print!("{}", render_text(&rules)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&rules)?),
            }
        }
    }

    Ok(())
}
