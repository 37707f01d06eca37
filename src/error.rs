//! Error types
//!
//! Anything that can fail outside the substep loop funnels into [`GameError`].
//! The substep loop itself never returns errors: renderer failures degrade to
//! pausing the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("failed to load asset `{path}`: {reason}")]
    AssetLoad { path: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
    #[error("level {0} does not exist")]
    UnknownLevel(usize),
    #[error("level catalog is empty")]
    EmptyCatalog,
    #[error("renderer is not available")]
    RendererUnavailable,
    #[error("renderer error: {0}")]
    Renderer(String),
    #[error("initialization failed: {0}")]
    Init(String),
}

pub type Result<T> = std::result::Result<T, GameError>;
