use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a pipeline stage. Expected conditions
/// (non-countries, missing fields, unresolved Olympic codes) are not errors;
/// they degrade in place and are reported as printed diagnostics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed response from {url}: {detail}")]
    MalformedResponse { url: String, detail: String },

    #[error("page structure not understood: {0}")]
    PageStructure(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Missing needed file {0:?} -- Please check README.")]
    MissingInput(PathBuf),

    #[error("missing card image {0:?}")]
    MissingAsset(PathBuf),

    #[error("country names are not unique: {0:?} appears twice")]
    DuplicateName(String),

    #[error("no template for card style {0:?}")]
    UnknownStyle(String),

    #[error("card rendering failed: {0}")]
    Render(String),

    #[error("{program} failed: {detail}")]
    CommandFailed { program: String, detail: String },
}
