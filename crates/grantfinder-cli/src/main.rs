//! grantfinder - government grant catalog browser and admin tool

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use grantfinder_core::{GrantList, GrantRecord, generate_id};
use grantfinder_store::{
    AdminGateway, DataSource, FallbackFile, LoadOutcome, Origin, Precedence, ReloadCoordinator,
    ReloadEvent, RemoteStore, SourcePolicy, export_list,
};
use grantfinder_sync::RestStore;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod display;
mod filters;

use filters::FilterArgs;

#[derive(Parser, Debug)]
#[command(name = "grantfinder")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: Config,

    #[command(subcommand)]
    command: Commands,
}

/// Where grants are read from and written to.
#[derive(Args, Debug)]
struct Config {
    /// Base URL of the hosted grant table
    #[arg(long, global = true, env = "GRANTFINDER_REMOTE_URL")]
    remote_url: Option<String>,

    /// API key for the hosted grant table
    #[arg(long, global = true, env = "GRANTFINDER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Table name
    #[arg(long, global = true, env = "GRANTFINDER_TABLE", default_value = "grants")]
    table: String,

    /// Catalog file used to seed the table and when it is unreachable
    #[arg(
        long,
        global = true,
        env = "GRANTFINDER_FALLBACK",
        default_value = "data/grants-database.json"
    )]
    fallback: PathBuf,

    /// Read the catalog file only
    #[arg(long, global = true)]
    offline: bool,

    /// Do not write the catalog file into an empty table
    #[arg(long, global = true)]
    no_seed: bool,

    /// Seconds between polls in `watch`
    #[arg(long, global = true, default_value = "5")]
    refresh_secs: u64,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List grants matching the filters
    #[command(alias = "ls")]
    Search(FilterArgs),

    /// Show one grant in full
    Show {
        /// Grant id
        id: String,
    },

    /// Category tree with counts
    Categories,

    /// Filter options with ids and counts
    Facets,

    /// Add a grant from a JSON file
    Add {
        /// JSON file holding one grant record
        file: PathBuf,
    },

    /// Replace a grant with the record in a JSON file
    Update {
        /// Grant id
        id: String,
        /// JSON file holding the new record
        file: PathBuf,
    },

    /// Delete a grant
    Delete {
        /// Grant id
        id: String,
    },

    /// Print an empty record template with a fresh id
    New,

    /// Write grants and aggregates to a dated JSON file
    Export {
        /// Output directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },

    /// Overwrite the hosted table from the catalog file
    Seed,

    /// Keep reloading and print the filtered count on each update
    Watch(FilterArgs),
}

impl Config {
    fn remote(&self) -> Result<Option<Arc<dyn RemoteStore>>> {
        if self.offline {
            return Ok(None);
        }
        let Some(url) = &self.remote_url else {
            return Ok(None);
        };
        let key = self
            .api_key
            .clone()
            .context("--api-key (or GRANTFINDER_API_KEY) is required with --remote-url")?;
        Ok(Some(Arc::new(RestStore::new(url, key, self.table.clone()))))
    }

    fn policy(&self, remote: bool) -> SourcePolicy {
        SourcePolicy {
            precedence: if remote {
                Precedence::RemoteFirst
            } else {
                Precedence::FallbackOnly
            },
            seed_on_empty: !self.no_seed,
        }
    }

    fn source(&self, remote: Option<Arc<dyn RemoteStore>>) -> DataSource {
        let fallback = FallbackFile::new(&self.fallback);
        let policy = self.policy(remote.is_some());
        match remote {
            Some(remote) => DataSource::new(remote, fallback).with_policy(policy),
            None => DataSource::fallback_only(fallback),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.config;
    let remote = config.remote()?;

    match cli.command {
        Commands::Search(args) => {
            let outcome = load(&config.source(remote)).await?;
            let list = &outcome.list;
            let matched = list.query(&args.filter_state(), args.sort);
            display::print_listing(&matched, list.len());
        }
        Commands::Show { id } => {
            let outcome = load(&config.source(remote)).await?;
            let grant = outcome
                .list
                .find(&id)
                .with_context(|| format!("grant {id} not found"))?;
            display::print_grant_card(grant);
        }
        Commands::Categories => {
            let outcome = load(&config.source(remote)).await?;
            display::print_category_tree(outcome.list.category_counts());
        }
        Commands::Facets => {
            let outcome = load(&config.source(remote)).await?;
            display::print_facets(outcome.list.facets());
        }
        Commands::Add { file } => {
            let record = read_record(&file)?;
            let id = record.id.clone();
            let mut admin = admin(&config, remote).await?;
            admin
                .add(record)
                .await
                .with_context(|| format!("adding grant {id}"))?;
            println!("added {id} ({} grants)", admin.grants().len());
        }
        Commands::Update { id, file } => {
            let record = read_record(&file)?;
            let mut admin = admin(&config, remote).await?;
            admin
                .update(&id, record)
                .await
                .with_context(|| format!("updating grant {id}"))?;
            println!("updated {id}");
        }
        Commands::Delete { id } => {
            let mut admin = admin(&config, remote).await?;
            let removed = admin
                .delete(&id)
                .await
                .with_context(|| format!("deleting grant {id}"))?;
            println!("deleted {} ({})", removed.id, removed.name);
        }
        Commands::New => {
            let draft = GrantRecord::draft(generate_id(Utc::now().timestamp_millis()));
            println!("{}", serde_json::to_string_pretty(&draft)?);
        }
        Commands::Export { dir } => {
            let outcome = load(&config.source(remote)).await?;
            let path = export_list(&outcome.list, &dir, Utc::now().date_naive())
                .await
                .context("exporting grants")?;
            println!("exported {} grants to {}", outcome.list.len(), path.display());
        }
        Commands::Seed => {
            let remote = remote.context("seed needs --remote-url")?;
            let doc = FallbackFile::new(&config.fallback)
                .read()
                .await
                .context("reading catalog file")?;
            let mut admin = AdminGateway::new(remote, GrantList::default());
            admin
                .seed(doc.grants)
                .await
                .context("seeding remote store")?;
            println!("seeded {} grants", admin.grants().len());
        }
        Commands::Watch(args) => watch(&config, remote, &args).await?,
    }
    Ok(())
}

async fn load(source: &DataSource) -> Result<LoadOutcome> {
    source.load().await.context("loading grants")
}

/// Gateway over the current remote list. Admin writes need a remote table.
async fn admin(config: &Config, remote: Option<Arc<dyn RemoteStore>>) -> Result<AdminGateway> {
    let Some(remote) = remote else {
        bail!("admin commands need --remote-url and cannot run with --offline");
    };
    let source = config.source(Some(Arc::clone(&remote)));
    let outcome = load(&source).await?;
    if !matches!(outcome.origin, Origin::Remote { .. } | Origin::Seeded) {
        bail!("remote store not readable; refusing to overwrite it from the catalog file");
    }
    Ok(AdminGateway::new(remote, outcome.list))
}

fn read_record(path: &Path) -> Result<GrantRecord> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing grant record {}", path.display()))
}

async fn watch(config: &Config, remote: Option<Arc<dyn RemoteStore>>, args: &FilterArgs) -> Result<()> {
    let source = Arc::new(config.source(remote));
    let mut handle =
        ReloadCoordinator::new(source, Duration::from_secs(config.refresh_secs)).spawn();
    let filters = args.filter_state();
    info!("watching for changes, ctrl-c to stop");

    loop {
        tokio::select! {
            event = handle.next() => match event {
                Some(ReloadEvent::Loaded { generation, outcome }) => {
                    let matched = outcome.list.query(&filters, args.sort);
                    println!(
                        "[{generation}] {} of {} grants ({:?})",
                        matched.len(),
                        outcome.list.len(),
                        outcome.origin
                    );
                }
                Some(ReloadEvent::Failed { generation, error }) => {
                    eprintln!("[{generation}] reload failed: {error}");
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.shutdown().await;
    Ok(())
}
