use std::io;
use std::path::PathBuf;

use thiserror::Error;
use vintage_x86::ParseModelError;

pub type Result<T> = std::result::Result<T, CorpusError>;

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("VINTAGE_X86_CORPUS_DIR is not set")]
    MissingCorpusDir,

    #[error("invalid VINTAGE_X86_MODEL: {0}")]
    InvalidModel(#[from] ParseModelError),

    #[error("io error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed corpus file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("corpus file name {} does not name an opcode", path.display())]
    InvalidFileName { path: PathBuf },

    #[error("filter {filter:?} matched no corpus files in {}", dir.display())]
    NoFilesMatched { dir: PathBuf, filter: String },
}
