//! Starfin-DB: catalog persistence for starfin
//!
//! This crate stores volumes, films (with their volume files and sidecar
//! subtitles) and people in SQLite, using rusqlite and r2d2 connection
//! pooling.
//!
//! # Modules
//!
//! - `migrations` - Embedded schema migrations
//! - `pool` - Connection pool management
//! - `models` - Catalog records
//! - `queries` - Free-standing query functions over a `Connection`
//! - `store` - The `CatalogStore`, `VolumeStore` and `PersonStore` traits and
//!   their SQLite implementation
//!
//! # Example
//!
//! ```
//! use starfin_db::store::{SqliteStore, VolumeStore};
//!
//! let store = SqliteStore::in_memory().unwrap();
//! assert!(store.list_volumes().unwrap().is_empty());
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
pub mod store;

pub use models::{
    AudioInfo, CastMember, Film, MediaInfo, Person, SubsInfo, Subtitle, VideoInfo, Volume,
    VolumeFile,
};
pub use store::{CatalogStore, PersonStore, SqliteStore, VolumeStore};
