//! CSV import and export.
//!
//! Imports parse the whole file first; the store only ever sees a complete
//! replacement slice.

pub mod csv;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::model::validation::validate_csv_path;
use crate::model::ValidationError;
use crate::store::{StudentsState, UsersState};

pub use self::csv::{export_students, export_users, import_students, import_users};

#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("line {line}: {message}")]
    Invalid { line: usize, message: String },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// What a CSV file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Dataset {
    Students,
    Users,
}

pub fn export_students_file(state: &StudentsState, path: &Path) -> Result<usize, ExchangeError> {
    validate_csv_path(path)?;
    let rows = export_students(state, BufWriter::new(File::create(path)?))?;
    tracing::info!("Exported {rows} journal rows to {}", path.display());
    Ok(rows)
}

pub fn export_users_file(state: &UsersState, path: &Path) -> Result<usize, ExchangeError> {
    validate_csv_path(path)?;
    let rows = export_users(state, BufWriter::new(File::create(path)?))?;
    tracing::info!("Exported {rows} users to {}", path.display());
    Ok(rows)
}

pub fn import_students_file(path: &Path) -> Result<StudentsState, ExchangeError> {
    validate_csv_path(path)?;
    let state = import_students(BufReader::new(File::open(path)?))?;
    tracing::info!("Imported {} students from {}", state.len(), path.display());
    Ok(state)
}

pub fn import_users_file(path: &Path) -> Result<UsersState, ExchangeError> {
    validate_csv_path(path)?;
    let state = import_users(BufReader::new(File::open(path)?))?;
    tracing::info!("Imported {} users from {}", state.len(), path.display());
    Ok(state)
}
