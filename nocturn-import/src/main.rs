//! nocturn-import - Clip Archive Import Tool
//!
//! Walks legacy archive trees, merges clips into a destination store, and
//! reports or prunes per-group clip counts.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nocturn_common::config::{self, TomlConfig};
use nocturn_import::decode::SymphoniaDecoder;
use nocturn_import::prune::prune_to_total;
use nocturn_import::store::{write_counts_csv, ClipStore, CountFilter, MemoryStore};
use nocturn_import::{ArchiveWalker, MergeVisitor, NameGrammar, TimeResolver};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "nocturn-import", version, about = "Clip archive import tool")]
struct Cli {
    /// Configuration file (default: $NOCTURN_CONFIG, then the platform
    /// config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Walk an archive tree, merge its clips, and report counters
    Scan {
        /// Archive tree root; its final path component is the first-level
        /// directory name
        root: PathBuf,
    },
    /// Walk an archive tree and export per-(station, night) clip counts
    Counts {
        root: PathBuf,
        /// Restrict to one station
        #[arg(long)]
        station: Option<String>,
        /// Restrict to one detector
        #[arg(long)]
        detector: Option<String>,
        /// Restrict to one classification (includes its specializations)
        #[arg(long)]
        class: Option<String>,
        /// Write CSV here instead of stdout
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Walk an archive tree, then plan and apply a fair reduction of one
    /// classification to a target total
    Prune {
        root: PathBuf,
        /// Classification to prune (includes its specializations)
        #[arg(long)]
        class: String,
        /// Target total clip count
        #[arg(long)]
        target: u64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let config = config::load_or_default(&config_path)?;

    let level = Level::from_str(&config.logging.level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("nocturn-import {}", env!("CARGO_PKG_VERSION"));
    info!("Config: {}", config_path.display());

    match cli.command {
        Command::Scan { root } => {
            let store = import_tree(&config, &root)?;
            info!("Store now holds {} clips", store.len());
        }
        Command::Counts {
            root,
            station,
            detector,
            class,
            csv,
        } => {
            let store = import_tree(&config, &root)?;
            let filter = CountFilter {
                station,
                detector,
                clip_class: class,
                ..Default::default()
            };
            let counts = store.clip_counts(&filter)?;
            match csv {
                Some(path) => {
                    let mut file = std::fs::File::create(&path)
                        .with_context(|| format!("Cannot create {}", path.display()))?;
                    write_counts_csv(&mut file, &counts)?;
                    info!("Wrote {} count rows to {}", counts.len(), path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    write_counts_csv(&mut stdout, &counts)?;
                }
            }
        }
        Command::Prune { root, class, target } => {
            let mut store = import_tree(&config, &root)?;
            let before = store.len();
            let outcome = prune_to_total(&mut store, Some(&class), target)?;
            info!(
                "Pruned {} of {} clips; {} remain",
                outcome.deleted,
                before,
                store.len()
            );
        }
    }

    Ok(())
}

/// Walk `root` and merge every accepted clip into a fresh in-memory store.
fn import_tree(config: &TomlConfig, root: &Path) -> Result<MemoryStore> {
    let grammar = NameGrammar::new(config.stations.iter().cloned());
    let resolver = TimeResolver::from_config(config)?;

    let mut merge = MergeVisitor::new(MemoryStore::new(), SymphoniaDecoder);
    let mut walker =
        ArchiveWalker::new(grammar, resolver).with_suppress(config.suppress.clone());
    walker.register(&mut merge);

    info!("Walking {}", root.display());
    let counters = walker.walk(root)?;
    drop(walker);

    let mc = merge.counters();
    info!(
        "Walk finished: {} accepted, {} ignored; {} merged, {} duplicates, \
         {} bad files, {} add errors, {} conflicts",
        counters.accepted,
        counters.ignored,
        mc.merged,
        mc.duplicates,
        mc.bad_files,
        mc.add_errors,
        mc.conflicts
    );

    Ok(merge.into_store())
}
