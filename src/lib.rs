pub mod config;
pub mod event_feed;
pub mod import_runlog;
pub mod models;
pub mod package;
pub mod time_format;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use config::{Config, DurationFormat};
pub use event_feed::{IntegrityError, Package};
pub use import_runlog::ParseError;
pub use package::OutputError;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("couldn't read {path:?}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Reads the run log at `input` and writes a contest package to `output`.
/// Nothing is written unless the whole log parses and derives cleanly.
pub fn convert(input: &Path, output: &Path, config: &Config) -> Result<Package, ConvertError> {
    log::info!("Reading run log {:?}", input);
    let xml = fs::read_to_string(input).map_err(|source| ConvertError::Input {
        path: input.into(),
        source,
    })?;
    let model = import_runlog::parse(&xml, config)?;
    let package = event_feed::derive(&model, config)?;
    package::write_package(&package, output)?;
    Ok(package)
}
