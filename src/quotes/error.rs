use thiserror::Error;

use crate::criteria::{CriteriaError, TablesError};

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("i/o error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Tables(#[from] TablesError),
    #[error("subtitle log not found: {path}")]
    MissingSubtitles { path: String },
    #[error("voice line file name does not start with a file id: {path}")]
    InvalidFileName { path: String },
    #[error("voice line directory is missing speaker/skin/category segments: {path}")]
    InvalidDirectory { path: String },
    #[error("voice line category was not produced by the extractor ('{category}'): {path}")]
    UncategorisedDirectory { path: String, category: String },
    #[error("weight sidecar '{path}' is not a number: '{value}'")]
    InvalidWeight { path: String, value: String },
    #[error("criteria of '{path}' failed to parse: {source}")]
    Criteria {
        path: String,
        #[source]
        source: CriteriaError,
    },
    #[error("conversation '{id}' is not in the conversation list: {path}")]
    UnknownConversation { id: String, path: String },
    #[error("conversation line file name is not '<index>-<speaker>-<file id>': {path}")]
    InvalidConversationFile { path: String },
    #[error("conversation list '{path}' is malformed: {source}")]
    ConversationList {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("previous output '{path}' is not a quote list: {source}")]
    PreviousOutput {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to build worker pool: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
