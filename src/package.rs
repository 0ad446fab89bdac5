use crate::event_feed::Package;
use log::{debug, info, warn};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONTEST_FILE: &str = "contest.json";
pub const JUDGEMENT_TYPES_FILE: &str = "judgement-types.json";
pub const LANGUAGES_FILE: &str = "languages.json";
pub const GROUPS_FILE: &str = "groups.json";
pub const ORGANIZATIONS_FILE: &str = "organizations.json";
pub const TEAMS_FILE: &str = "teams.json";
pub const PROBLEMS_FILE: &str = "problems.json";
pub const EVENT_FEED_FILE: &str = "event-feed.ndjson";

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("output directory {0:?} already exists and is not empty")]
    NotEmpty(PathBuf),
    #[error("couldn't write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't serialize {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> OutputError + '_ {
    move |source| OutputError::Io {
        path: path.into(),
        source,
    }
}

/// Makes sure `directory` exists and is empty. Returns whether it had to be
/// created.
fn prepare_directory(directory: &Path) -> Result<bool, OutputError> {
    match fs::read_dir(directory) {
        Ok(mut entries) => {
            if entries.next().is_some() {
                return Err(OutputError::NotEmpty(directory.into()));
            }
            Ok(false)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir(directory).map_err(io_error(directory))?;
            Ok(true)
        }
        Err(e) => Err(io_error(directory)(e)),
    }
}

fn write_json<T: Serialize + ?Sized>(directory: &Path, name: &str, value: &T) -> Result<(), OutputError> {
    let path = directory.join(name);
    let file = File::create(&path).map_err(io_error(&path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|source| {
        OutputError::Serialize {
            path: path.clone(),
            source,
        }
    })?;
    writer.write_all(b"\n").map_err(io_error(&path))?;
    writer.flush().map_err(io_error(&path))?;
    debug!("Wrote {:?}", path);
    Ok(())
}

fn write_event_feed(directory: &Path, package: &Package) -> Result<(), OutputError> {
    let path = directory.join(EVENT_FEED_FILE);
    let file = File::create(&path).map_err(io_error(&path))?;
    let mut writer = BufWriter::new(file);
    for event in &package.events {
        serde_json::to_writer(&mut writer, event).map_err(|source| OutputError::Serialize {
            path: path.clone(),
            source,
        })?;
        writer.write_all(b"\n").map_err(io_error(&path))?;
    }
    writer.flush().map_err(io_error(&path))?;
    debug!("Wrote {} events to {:?}", package.events.len(), path);
    Ok(())
}

fn write_files(directory: &Path, package: &Package) -> Result<(), OutputError> {
    write_json(directory, CONTEST_FILE, &package.contest)?;
    write_json(directory, JUDGEMENT_TYPES_FILE, &package.judgement_types)?;
    write_json(directory, LANGUAGES_FILE, &package.languages)?;
    write_json(directory, GROUPS_FILE, &package.groups)?;
    write_json(directory, ORGANIZATIONS_FILE, &package.organizations)?;
    write_json(directory, TEAMS_FILE, &package.teams)?;
    write_json(directory, PROBLEMS_FILE, &package.problems)?;
    write_event_feed(directory, package)
}

/// Empties a directory that was empty before this run, removing it too if
/// this run created it.
fn discard(directory: &Path, created: bool) {
    let result = if created {
        fs::remove_dir_all(directory)
    } else {
        fs::read_dir(directory).and_then(|entries| {
            for entry in entries {
                let path = entry?.path();
                if path.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
            Ok(())
        })
    };
    if let Err(e) = result {
        warn!("Couldn't clean up partial package in {:?}: {}", directory, e);
    }
}

/// Writes the package into `directory`, which must be absent or empty.
/// Its parent must already exist. On failure nothing written by this call is
/// left behind.
pub fn write_package(package: &Package, directory: &Path) -> Result<(), OutputError> {
    write_package_with(package, directory, write_files)
}

fn write_package_with<F>(package: &Package, directory: &Path, write: F) -> Result<(), OutputError>
where
    F: FnOnce(&Path, &Package) -> Result<(), OutputError>,
{
    let created = prepare_directory(directory)?;
    if let Err(e) = write(directory, package) {
        discard(directory, created);
        return Err(e);
    }
    info!(
        "Wrote contest package with {} events to {:?}",
        package.events.len(),
        directory
    );
    Ok(())
}
