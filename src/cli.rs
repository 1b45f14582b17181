use clap::{Parser, Subcommand};
use starfin_common::{FilmId, MediaKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "starfin")]
#[command(author, version, about = "Film catalog that follows your media volumes")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch and synchronize every volume, following volume changes until interrupted
    Start,

    /// Synchronize volumes with the catalog once and exit
    Sync {
        /// Volume name (all volumes when omitted)
        volume: Option<String>,
    },

    /// Manage volumes
    Volume {
        #[command(subcommand)]
        command: VolumeCommands,
    },

    /// List cataloged films
    Films,

    /// Point a film at the TMDB entry behind a TMDB, IMDb or Letterboxd link
    Relink {
        /// Film id
        film: FilmId,

        /// Link to the film on themoviedb.org, imdb.com or letterboxd.com
        link: String,
    },

    /// Show the filter values the catalog offers
    Filters,

    /// Show what a filename parses to
    Parse {
        #[arg(required = true)]
        filename: String,
    },

    /// Probe a media file and display information
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum VolumeCommands {
    /// Register a volume and catalog its files
    Add {
        /// Display name (at least 3 characters)
        name: String,

        /// Root directory
        path: PathBuf,

        /// Only look at the root directory itself
        #[arg(long)]
        flat: bool,

        /// What the volume holds
        #[arg(long, default_value = "movies")]
        kind: MediaKind,
    },

    /// List registered volumes
    List,

    /// Remove a volume and the files it contributed
    Remove {
        /// Volume name
        name: String,
    },
}
