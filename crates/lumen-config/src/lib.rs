#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs)]

//! Typed configuration for the Lumen feed client.
//!
//! Layout: `model.rs` (typed sections), `defaults.rs` (baseline values),
//! `validate.rs` (field parsing/validation), `loader.rs` (JSON + environment
//! layering), `error.rs` (`ConfigError`).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ENV_PREFIX, EnvLookup, ProcessEnv};
pub use model::{
    ApiConfig, FeedTuning, LoggingSettings, LumenConfig, PlaybackConfig, TrackingConfig,
};
