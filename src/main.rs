use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use posterwall::{
    Config, create_app,
    import::{
        ContentCategory, ImportRequest, Importer, OverwritePolicy, ProviderKind, TotalStats,
        connect,
    },
    startup_checks,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Global options that apply to all commands
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: PathBuf,

    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the web server (default if no command specified)
    Serve {
        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        host: Option<String>,

        /// Automatically quit after specified number of seconds (useful for testing)
        #[arg(long)]
        quit_after: Option<u64>,
    },

    /// List the video libraries of a media server
    Libraries {
        /// jellyfin or plex
        #[arg(long)]
        provider: String,
    },

    /// Import posters from a media server, batch by batch
    Import {
        /// jellyfin or plex
        #[arg(long)]
        provider: String,

        /// Library id (not needed with --show-key)
        #[arg(long, default_value = "")]
        library: String,

        /// movies, shows, seasons or collections
        #[arg(long = "type")]
        import_type: String,

        /// Destination directory: movies, tv-shows, tv-seasons or collections
        #[arg(long)]
        content_type: Option<String>,

        /// skip, overwrite or copy
        #[arg(long, default_value = "skip")]
        overwrite: String,

        /// Import the seasons of a single show
        #[arg(long)]
        show_key: Option<String>,

        /// Import the seasons of every show in the library, one show per batch
        #[arg(long)]
        all_seasons: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Set up logging first
    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Serve {
            port,
            host,
            quit_after,
        }) => run_server(config, port, host, quit_after).await,
        Some(Commands::Libraries { provider }) => list_libraries(&config, &provider).await,
        Some(Commands::Import {
            provider,
            library,
            import_type,
            content_type,
            overwrite,
            show_key,
            all_seasons,
        }) => {
            let category = ContentCategory::from_import_type(&import_type)
                .ok_or_else(|| format!("Invalid import type: {}", import_type))?;
            let target = match content_type {
                Some(value) => ContentCategory::from_content_type(&value)
                    .ok_or_else(|| format!("Invalid content type: {}", value))?,
                None => category,
            };
            let policy = OverwritePolicy::parse(&overwrite)
                .ok_or_else(|| format!("Invalid overwrite option: {}", overwrite))?;

            let request = ImportRequest {
                category,
                library_id: library,
                target,
                policy,
                show_key,
                import_all_seasons: all_seasons,
                batch_processing: true,
                start_index: 0,
                prior_totals: TotalStats::default(),
            };
            run_import(&config, &provider, request).await
        }
        None => {
            // Default to serve command if no subcommand specified
            run_server(config, None, None, None).await
        }
    }
}

fn load_config(config_path: &Path) -> Result<Config, Box<dyn std::error::Error>> {
    if config_path.exists() {
        let config_content = std::fs::read_to_string(config_path)?;
        info!("Configuration loaded from: {:?}", config_path);
        Ok(toml_edit::de::from_str::<Config>(&config_content)?)
    } else {
        info!("Config file not found at {:?}, using defaults", config_path);
        Ok(Config::default())
    }
}

fn provider_kind(name: &str) -> Result<ProviderKind, Box<dyn std::error::Error>> {
    ProviderKind::parse(name).ok_or_else(|| format!("Unknown provider: {}", name).into())
}

async fn list_libraries(config: &Config, provider: &str) -> Result<(), Box<dyn std::error::Error>> {
    let kind = provider_kind(provider)?;
    let client = connect(kind, config.provider(kind), &config.import)?;

    let libraries = client.libraries().await?;
    if libraries.is_empty() {
        println!("No video libraries found on {}", client.label());
    } else {
        println!("Libraries on {}:", client.label());
        for library in libraries {
            println!("  {:>6}  {:<6?}  {}", library.id, library.kind, library.title);
        }
    }
    Ok(())
}

/// Drives the importer exactly as a remote client would: echo the cursor
/// (and, for all-shows seasons, the running totals) back until complete.
async fn run_import(
    config: &Config,
    provider: &str,
    mut request: ImportRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind = provider_kind(provider)?;
    let client = connect(kind, config.provider(kind), &config.import)?;
    let importer = Importer::new(client.as_ref(), &config.directories, config.import.batch_size);

    let server_totals = request.category == ContentCategory::Seasons && request.show_key.is_none();
    let mut totals = TotalStats::default();

    loop {
        let response = importer.run(&request).await?;

        for message in &response.results.errors {
            eprintln!("  {}", message);
        }
        println!(
            "{}/{} ({}%): {} imported, {} skipped, {} failed",
            response.progress.processed,
            response.progress.total,
            response.progress.percentage,
            response.results.successful,
            response.results.skipped,
            response.results.failed
        );

        totals = if server_totals {
            response.total_stats
        } else {
            totals.fold(&response.results)
        };

        match response.progress.next_index {
            Some(next) if !response.progress.is_complete => {
                request.start_index = next;
                request.prior_totals = totals;
            }
            _ => break,
        }
    }

    println!(
        "Done: {} imported, {} skipped ({} unchanged), {} failed",
        totals.successful, totals.skipped, totals.unchanged, totals.failed
    );
    Ok(())
}

async fn run_server(
    config: Config,
    port: Option<u16>,
    host: Option<String>,
    quit_after: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let host = host.unwrap_or(config.server.host.clone());
    let port = port.unwrap_or(config.server.port);

    info!("Starting {} server", config.app.name);
    for category in ContentCategory::ALL {
        info!(
            "Poster directory for {}: {:?}",
            category,
            config.directories.dir_for(category)
        );
    }
    for kind in [ProviderKind::Jellyfin, ProviderKind::Plex] {
        if let Some(provider) = config.provider(kind) {
            info!("{} server: {}", kind.label(), provider.url);
        }
    }

    // Perform startup checks
    match startup_checks::perform_startup_checks(&config).await {
        Ok(()) => info!("All startup checks passed"),
        Err(errors) => {
            for error in &errors {
                tracing::error!("Startup check failed: {}", error);
            }

            if errors.iter().any(|e| e.is_critical()) {
                tracing::error!("Critical startup check failed, exiting");
                return Err("Critical startup check failed".into());
            } else {
                tracing::warn!("Non-critical startup checks failed, continuing");
            }
        }
    }

    let app = create_app(config).await;

    let addr = SocketAddr::from((host.parse::<std::net::IpAddr>()?, port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let server = axum::serve(listener, app);
    let graceful = server.with_graceful_shutdown(shutdown_signal(quit_after));

    if let Err(e) = graceful.await {
        tracing::error!("Server error: {}", e);
    }

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal(quit_after: Option<u64>) {
    use tokio::signal;
    use tokio::time::{Duration, sleep};

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let quit_timer = async {
        if let Some(seconds) = quit_after {
            info!(
                "Server will automatically shut down after {} seconds",
                seconds
            );
            sleep(Duration::from_secs(seconds)).await;
            info!("Quit timer expired, shutting down");
        } else {
            std::future::pending::<()>().await
        }
    };

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        },
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        },
        _ = quit_timer => {},
    }
}
