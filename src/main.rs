mod cli;

use starfin::{
    catalog::Catalog,
    config::{self, Config},
    dispatch::Dispatcher,
    metadata::{Enricher, ImdbScraper, LetterboxdScraper, TmdbProvider},
    probe::{self, MediaInfoProbe, MediaProbe},
    sync::Synchronizer,
    volumes::{VolumeFollower, VolumeManager},
    watch::FileWatcher,
};
use starfin_db::{SqliteStore, VolumeStore};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands, VolumeCommands};
use std::path::Path;
use std::sync::Arc;

/// Everything a command needs, wired from the configuration.
struct Services {
    config: Config,
    store: Arc<SqliteStore>,
    dispatcher: Arc<Dispatcher>,
}

impl Services {
    fn build(config_path: Option<&Path>) -> Result<Self> {
        let config = config::load_config_or_default(config_path)?;

        let db_path = config.database.path.to_string_lossy().to_string();
        tracing::info!("Opening catalog at {}", db_path);
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .with_context(|| format!("Failed to open catalog database {}", db_path))?,
        );

        let provider = Arc::new(TmdbProvider::from_config(&config.tmdb)?);
        let probe = Arc::new(MediaInfoProbe::new(config.probe.mediainfo_path.clone()));
        let mut enricher = Enricher::new(provider, probe);
        if config.ratings.enabled {
            enricher = enricher.with_ratings(
                Arc::new(ImdbScraper::new()?),
                Arc::new(LetterboxdScraper::new()?),
            );
        }

        let catalog = Catalog::new(store.clone(), store.clone(), Arc::new(enricher))
            .context("Failed to load catalog")?;
        let dispatcher = Arc::new(Dispatcher::new(Arc::new(catalog)));

        Ok(Self {
            config,
            store,
            dispatcher,
        })
    }

    fn volumes(&self) -> VolumeManager {
        VolumeManager::new(
            self.store.clone(),
            self.dispatcher.clone(),
            self.config.scan.workers,
        )
    }
}

async fn start(config_path: Option<&Path>) -> Result<()> {
    let services = Services::build(config_path)?;
    tracing::info!("Starting starfin");

    let watcher = FileWatcher::start(&services.config.watch, services.dispatcher.clone())?;
    let follower = VolumeFollower::new(
        services.store.clone(),
        watcher.control(),
        Synchronizer::new(services.dispatcher.clone()),
    );
    let following = tokio::spawn(follower.run(services.config.watch.volume_refresh()));

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let result = watcher.run_until(shutdown).await;
    following.abort();
    tracing::info!("Shutting down...");
    result
}

async fn sync(config_path: Option<&Path>, name: Option<&str>) -> Result<()> {
    let services = Services::build(config_path)?;
    let synchronizer = Synchronizer::new(services.dispatcher.clone());

    let volumes: Vec<_> = services
        .store
        .list_volumes()?
        .into_iter()
        .filter(|volume| name.map_or(true, |name| volume.name == name))
        .collect();
    if volumes.is_empty() {
        anyhow::bail!("No matching volume");
    }

    for volume in &volumes {
        match synchronizer.sync(volume).await {
            Ok(report) => println!(
                "{}: +{} videos, +{} subtitles, -{} videos, -{} subtitles, {} failures",
                volume.name,
                report.videos_added,
                report.subtitles_added,
                report.videos_removed,
                report.subtitles_removed,
                report.failures
            ),
            Err(e) => println!("{}: sync failed: {}", volume.name, e),
        }
    }
    Ok(())
}

async fn volume(config_path: Option<&Path>, command: VolumeCommands) -> Result<()> {
    let services = Services::build(config_path)?;
    let manager = Arc::new(services.volumes());

    match command {
        VolumeCommands::Add {
            name,
            path,
            flat,
            kind,
        } => {
            let (volume, scan) = manager.add_volume(&name, &path, !flat, kind)?;
            println!("Added volume {} ({})", volume.name, volume.id);
            scan.await.context("Initial scan task failed")?;
        }
        VolumeCommands::List => {
            for volume in manager.list()? {
                println!(
                    "{}  {}  {}  {}{}",
                    volume.id,
                    volume.name,
                    volume.path.display(),
                    volume.media_kind,
                    if volume.is_recursive { "" } else { "  (flat)" }
                );
            }
        }
        VolumeCommands::Remove { name } => {
            let volume = manager
                .list()?
                .into_iter()
                .find(|volume| volume.name == name)
                .with_context(|| format!("No volume named {}", name))?;
            let deleted = manager.delete_volume(volume.id).await?;
            println!("Removed volume {} ({} films deleted)", volume.name, deleted);
        }
    }
    Ok(())
}

fn list_films(config_path: Option<&Path>) -> Result<()> {
    let services = Services::build(config_path)?;
    let films = services.dispatcher.catalog().store().list()?;

    for film in &films {
        let year = if film.year.is_empty() {
            film.release_year.to_string()
        } else {
            film.year.clone()
        };
        println!("{}  {} ({})", film.id, film.display_title(), year);
        for volume_file in &film.volume_files {
            println!("    {}", volume_file.path.display());
            for subtitle in &volume_file.subtitles {
                println!("      + {} [{}]", subtitle.path.display(), subtitle.language);
            }
        }
    }
    println!("{} films", films.len());
    Ok(())
}

async fn relink(config_path: Option<&Path>, film: starfin_common::FilmId, link: &str) -> Result<()> {
    let services = Services::build(config_path)?;
    let film = services.dispatcher.catalog().relink(film, link).await?;
    println!("{} is now {} ({})", film.id, film.display_title(), film.year);
    Ok(())
}

fn show_filters(config_path: Option<&Path>) -> Result<()> {
    let services = Services::build(config_path)?;
    let filters = services.dispatcher.catalog().filters();
    println!("{}", serde_json::to_string_pretty(&filters)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "starfin=trace,starfin_db=debug,starfin_parser=debug".to_string()
        } else {
            "starfin=debug,starfin_db=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Start => runtime()?.block_on(start(config_path)),
        Commands::Sync { volume } => runtime()?.block_on(sync(config_path, volume.as_deref())),
        Commands::Volume { command } => runtime()?.block_on(volume(config_path, command)),
        Commands::Films => list_films(config_path),
        Commands::Relink { film, link } => runtime()?.block_on(relink(config_path, film, &link)),
        Commands::Filters => show_filters(config_path),
        Commands::Parse { filename } => parse_filename(&filename),
        Commands::Probe { file, json } => probe_file(&file, config_path, json),
        Commands::CheckTools => check_tools(config_path),
        Commands::Validate {
            config: config_override,
        } => {
            let path = config_override.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("starfin {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("Failed to start the async runtime")
}

fn parse_filename(filename: &str) -> Result<()> {
    let parsed = starfin_parser::parse_filename(filename);
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn probe_file(file: &Path, config_path: Option<&Path>, json: bool) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let config = config::load_config_or_default(config_path)?;
    let probe = MediaInfoProbe::new(config.probe.mediainfo_path);
    let media_info = probe.probe(file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&media_info)?);
        return Ok(());
    }

    println!("File: {}", file.display());
    println!("Format: {}", media_info.format);
    println!("Size: {}", media_info.file_size);
    println!("Duration: {}", media_info.duration);
    if !media_info.resolution.is_empty() {
        println!("Resolution: {}", media_info.resolution);
    }

    println!("\nVideo Tracks: {}", media_info.video.len());
    for (i, track) in media_info.video.iter().enumerate() {
        println!(
            "  [{}] {} {} {} {} fps, {} bit",
            i, track.codec_id, track.profile, track.resolution, track.frame_rate, track.bit_depth
        );
    }

    println!("\nAudio Tracks: {}", media_info.audio.len());
    for (i, track) in media_info.audio.iter().enumerate() {
        print!("  [{}] {} {}ch {}", i, track.codec_id, track.channels, track.sampling_rate);
        if !track.language.is_empty() {
            print!(" ({})", track.language);
        }
        println!();
    }

    println!("\nSubtitle Tracks: {}", media_info.subtitles.len());
    for (i, track) in media_info.subtitles.iter().enumerate() {
        print!("  [{}] {}", i, track.codec_id);
        if !track.language.is_empty() {
            print!(" ({})", track.language);
        }
        if track.forced == "Yes" {
            print!(" [forced]");
        }
        println!();
    }

    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let tools = probe::check_tools(config.probe.mediainfo_path.as_deref());

    println!("External tools:");
    let mut missing = false;
    for tool in &tools {
        if tool.available {
            println!(
                "  [OK] {} {}",
                tool.name,
                tool.version.as_deref().unwrap_or("")
            );
            if let Some(path) = &tool.path {
                println!("       {}", path.display());
            }
        } else {
            missing = true;
            println!("  [MISSING] {}", tool.name);
        }
    }

    if missing {
        println!("\nFilms are still cataloged without mediainfo, but with blank technical details.");
    }
    Ok(())
}

fn validate_config(config_path: Option<&Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Configuration is valid!");
    println!("  Database: {}", config.database.path.display());
    println!("  TMDB: {}", config.tmdb.base_url);
    println!(
        "  TMDB API key: {}",
        if config.tmdb.api_key.is_empty() {
            "not set"
        } else {
            "set"
        }
    );
    println!("  Poll interval: {}s", config.watch.poll_interval_secs);
    println!("  Volume refresh: {}s", config.watch.volume_refresh_secs);
    println!("  Scan workers: {}", config.scan.workers);
    println!("  Ratings: {}", if config.ratings.enabled { "on" } else { "off" });

    Ok(())
}
