//! Failure taxonomy for import runs
//!
//! - [`EntryError`]: one mapping entry of one row is abandoned; the row goes on.
//! - [`PersistError`]: a subtree (or the whole row) is not saved; the run goes on.
//! - [`RunError`]: the run cannot start at all.

use super::clean::CleanError;
use super::ColumnError;
use crate::schema::SchemaError;
use crate::store::StoreError;

/// A mapping entry that could not be applied to a row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryError {
    /// Column reference could not be resolved
    Column(ColumnError),
    /// Path names a field that does not exist
    NoSuchField { model: String, field: String },
    /// Many-to-many field not followed by a group index
    MissingIndex { field: String },
    /// Many-to-many group index not followed by a field
    IncompleteManyToMany { field: String, index: usize },
    /// Foreign key at the end of the path
    IncompleteForeignKey { field: String },
    /// Cell could not be cleaned for the field
    InvalidValue { field: String, error: CleanError },
    /// Schema problem other than a missing field
    Schema(SchemaError),
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryError::Column(e) => write!(f, "{}", e),
            EntryError::NoSuchField { model, field } => {
                write!(f, "no such field '{}' on {}", field, model)
            }
            EntryError::MissingIndex { field } => {
                write!(f, "m2m {} must be followed by an index", field)
            }
            EntryError::IncompleteManyToMany { field, index } => write!(
                f,
                "m2m {} must be followed by a field name after index {}",
                field, index
            ),
            EntryError::IncompleteForeignKey { field } => {
                write!(f, "foreign key {} must be followed by a field name", field)
            }
            EntryError::InvalidValue { field, error } => write!(f, "{} for {}", error, field),
            EntryError::Schema(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EntryError {}

impl From<ColumnError> for EntryError {
    fn from(e: ColumnError) -> Self {
        EntryError::Column(e)
    }
}

/// Failure while looking for an existing record
#[derive(Debug, Clone, PartialEq)]
pub enum DedupError {
    /// More than one record matches the dedup filter
    NonUniqueMatch {
        model: String,
        filter: String,
        matches: usize,
    },
    /// The lookup itself failed
    Store(StoreError),
}

impl std::fmt::Display for DedupError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DedupError::NonUniqueMatch {
                model,
                filter,
                matches,
            } => write!(
                f,
                "{} records of {} match {} - refusing to guess",
                matches, model, filter
            ),
            DedupError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for DedupError {}

/// Why a node could not be saved
#[derive(Debug, Clone, PartialEq)]
pub enum SaveCause {
    Dedup(DedupError),
    Store(StoreError),
    Schema(SchemaError),
}

impl std::fmt::Display for SaveCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveCause::Dedup(e) => write!(f, "{}", e),
            SaveCause::Store(e) => write!(f, "{}", e),
            SaveCause::Schema(e) => write!(f, "{}", e),
        }
    }
}

/// A pending node (and everything that depends on it) was not saved
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    TreeSaveFailure { model: String, cause: SaveCause },
}

impl PersistError {
    pub(crate) fn store(model: &str, error: StoreError) -> Self {
        PersistError::TreeSaveFailure {
            model: model.to_string(),
            cause: SaveCause::Store(error),
        }
    }

    pub(crate) fn dedup(model: &str, error: DedupError) -> Self {
        PersistError::TreeSaveFailure {
            model: model.to_string(),
            cause: SaveCause::Dedup(error),
        }
    }

    pub(crate) fn schema(model: &str, error: SchemaError) -> Self {
        PersistError::TreeSaveFailure {
            model: model.to_string(),
            cause: SaveCause::Schema(error),
        }
    }
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::TreeSaveFailure { model, cause } => {
                write!(f, "{} not saved: {}", model, cause)
            }
        }
    }
}

impl std::error::Error for PersistError {}

/// The run could not start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// Target model is not registered
    UnknownModel { model: String },
    /// Neither a mapping nor a usable header row
    NoUsableMapping { model: String },
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::UnknownModel { model } => write!(
                f,
                "Sorry your model {} could not be found please check app_label.modelname",
                model
            ),
            RunError::NoUsableMapping { model } => write!(
                f,
                "No fields in the CSV file match {} - you must add a header field name row to the CSV file or supply a mapping list",
                model
            ),
        }
    }
}

impl std::error::Error for RunError {}
