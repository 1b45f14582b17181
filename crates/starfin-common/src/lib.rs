//! Starfin-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across starfin:
//!
//! - **Typed IDs**: Type-safe UUID wrappers for films, volumes and people
//! - **Core Types**: The media kind a volume holds
//! - **Path Utilities**: Classification of video and subtitle files by extension
//! - **Error Handling**: The catalog error taxonomy and result alias
//!
//! # Examples
//!
//! ```
//! use starfin_common::{FilmId, MediaKind, Error, Result};
//! use starfin_common::paths::is_video_file;
//! use std::path::Path;
//!
//! let film_id = FilmId::new();
//! let kind = MediaKind::Movies;
//!
//! assert!(is_video_file(Path::new("movie.mkv")));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("film"))
//! }
//! ```

pub mod error;
pub mod ids;
pub mod paths;
pub mod types;

pub use error::{Error, Result};
pub use ids::*;
pub use types::*;
