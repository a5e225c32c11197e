//! checklist-graph
//!
//! Extracts checklist tasks from a folder of Markdown notes and shows them as
//! an interactive force-directed graph.

use anyhow::{Context, Result};
use checklist_graph::cli::render::RenderArgs;
use checklist_graph::cli::scan::ScanArgs;
use checklist_graph::cli::{Cli, Command, ServeArgs};
use checklist_graph::config::watcher::{
    DocumentWatcherHandle, WatchFilter, WatcherConfig, start_document_watcher,
};
use checklist_graph::config::{Config, ConfigLoader, VaultConfig};
use checklist_graph::dashboard::{self, GraphViewServer};
use checklist_graph::format::{format_collection, format_graph};
use checklist_graph::graph::assemble;
use checklist_graph::layout::Size;
use checklist_graph::logging::{LogTarget, init_logging};
use checklist_graph::opener::{CommandOpener, Opener};
use checklist_graph::render::SvgSurface;
use checklist_graph::scan::Scanner;
use checklist_graph::session::GraphSession;
use checklist_graph::source::VaultSource;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

type SharedSession = Arc<Mutex<GraphSession>>;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let target: LogTarget = cli.log.parse()?;
    init_logging(&target, cli.verbose)?;

    let mut loader = ConfigLoader::load(cli.config.as_deref())?;
    for (tier, path) in loader.sources() {
        debug!(%tier, path = %path.display(), "Config source");
    }
    if let Some(vault) = &cli.vault {
        loader.config_mut().vault.root = vault.clone();
    }
    let config = loader.into_config();

    match cli.command {
        Some(Command::Scan(args)) => run_scan(config, args).await,
        Some(Command::Render(args)) => run_render(config, args).await,
        Some(Command::Serve(args)) => run_serve(config, args).await,
        None => run_serve(config, ServeArgs::default()).await,
    }
}

fn vault_source(vault: &VaultConfig) -> VaultSource {
    VaultSource::new(&vault.root)
        .with_extensions(vault.extensions.clone())
        .with_ignore_dirs(vault.ignore_dirs.clone())
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => println!("{}", content),
    }
    Ok(())
}

/// Print the tasks of one scan.
async fn run_scan(mut config: Config, args: ScanArgs) -> Result<()> {
    args.view.apply(&mut config.view);
    let view = config.view.to_view_config();
    let source = vault_source(&config.vault);

    let collection = Scanner::with_task_limit(view.task_limit)
        .scan(&source)
        .await?;

    let format = args.format.unwrap_or(config.vault.default_format);
    let content = if args.filtered {
        format_graph(&assemble(&collection, &view), format)
    } else {
        format_collection(&collection, format)
    };
    write_output(args.output.as_deref(), &content)
}

/// Settle the layout once and write it as SVG.
async fn run_render(mut config: Config, args: RenderArgs) -> Result<()> {
    args.view.apply(&mut config.view);
    let viewport = Size::new(
        args.width.unwrap_or(config.ui.viewport_width),
        args.height.unwrap_or(config.ui.viewport_height),
    );
    let mut session = GraphSession::new(
        config.view.to_view_config(),
        config.layout.clone(),
        viewport,
        config.editor.reveal_lines,
    );

    let source = vault_source(&config.vault);
    let ticket = session.begin_scan();
    let collection = Scanner::with_task_limit(session.config().task_limit)
        .scan(&source)
        .await?;
    session.apply_scan(ticket, collection);
    session.settle(args.max_ticks);
    if !session.simulation().is_converged() {
        warn!(
            max_ticks = args.max_ticks,
            "Layout did not converge, writing the current positions"
        );
    }

    let mut surface = SvgSurface::new(config.layout.lod_threshold);
    let stats = session.render(&mut surface);
    info!(
        nodes = stats.nodes_drawn,
        edges = stats.edges_drawn,
        "Rendered graph"
    );
    write_output(args.output.as_deref(), surface.svg())
}

/// Serve the interactive view until interrupted.
async fn run_serve(mut config: Config, args: ServeArgs) -> Result<()> {
    args.view.apply(&mut config.view);
    if let Some(host) = args.host {
        config.ui.host = host;
    }
    if let Some(port) = args.port {
        config.ui.port = port;
    }

    let session: SharedSession = Arc::new(Mutex::new(GraphSession::new(
        config.view.to_view_config(),
        config.layout.clone(),
        Size::new(config.ui.viewport_width, config.ui.viewport_height),
        config.editor.reveal_lines,
    )));
    let source = Arc::new(vault_source(&config.vault));
    let rescan = Arc::new(Notify::new());

    info!(vault = %config.vault.root.display(), "Opening {}", dashboard::TITLE);
    scan_into(Arc::clone(&session), Arc::clone(&source)).await;

    tokio::spawn(tick_loop(Arc::clone(&session), config.layout.tick_interval()));
    tokio::spawn(scan_loop(
        Arc::clone(&session),
        Arc::clone(&source),
        Arc::clone(&rescan),
    ));

    if args.no_watch {
        info!("Live update disabled");
    } else {
        let filter = WatchFilter {
            root: config.vault.root.clone(),
            extensions: config.vault.extensions.clone(),
            ignore_dirs: config.vault.ignore_dirs.clone(),
        };
        let watcher_config = WatcherConfig {
            debounce_duration: Duration::from_millis(config.vault.debounce_ms),
        };
        match start_document_watcher(filter, watcher_config) {
            Ok(handle) => {
                tokio::spawn(watch_loop(handle, Arc::clone(&session), Arc::clone(&rescan)));
            }
            Err(e) => warn!("Failed to start document watcher: {}. Live update disabled.", e),
        }
    }

    let opener: Arc<dyn Opener> = Arc::new(CommandOpener::new(Arc::clone(&source), &config.editor));
    let server = GraphViewServer::new(
        Arc::clone(&session),
        opener,
        Arc::clone(&rescan),
        config.layout.lod_threshold,
    );
    let handle = dashboard::start_server_with_retry(server, &config.ui);

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    handle.shutdown();
    Ok(())
}

/// Run one scan outside the session lock and hand the result back.
async fn scan_into(session: SharedSession, source: Arc<VaultSource>) {
    let (ticket, limit) = {
        let mut session = session.lock().await;
        (session.begin_scan(), session.config().task_limit)
    };
    match Scanner::with_task_limit(limit).scan(source.as_ref()).await {
        Ok(collection) => {
            if !session.lock().await.apply_scan(ticket, collection) {
                debug!(
                    generation = ticket.generation(),
                    "Discarded results of a superseded scan"
                );
            }
        }
        Err(e) => warn!("Scan failed: {}", e),
    }
}

/// Start a scan for every rescan request. Scans may overlap; the session
/// keeps whichever started last.
async fn scan_loop(session: SharedSession, source: Arc<VaultSource>, rescan: Arc<Notify>) {
    loop {
        rescan.notified().await;
        tokio::spawn(scan_into(Arc::clone(&session), Arc::clone(&source)));
    }
}

async fn watch_loop(mut handle: DocumentWatcherHandle, session: SharedSession, rescan: Arc<Notify>) {
    while let Some(event) = handle.wait_for_change().await {
        if !event.requires_rescan() {
            continue;
        }
        if session.lock().await.config().live_update {
            debug!(paths = ?event.paths(), "Documents changed, rescanning");
            rescan.notify_one();
        }
    }
}

/// Drive the simulation and view transitions at the configured tick rate.
async fn tick_loop(session: SharedSession, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last = Instant::now();
    loop {
        ticker.tick().await;
        let now = Instant::now();
        session.lock().await.advance(now - last);
        last = now;
    }
}
