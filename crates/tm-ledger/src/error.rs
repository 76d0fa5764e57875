//! Error types for tm-ledger

use thiserror::Error;
use tm_core::{CoreError, DiffError, OperationConflict, SchemaError, StepId};
use tm_db::{DbError, Direction};

/// Ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// L001: Appended step does not extend the current head
    #[error("[L001] Step {step} has parent {parent} but the ledger head is {head}")]
    ParentMismatch {
        step: StepId,
        parent: String,
        head: String,
    },

    /// L002: `init` on a directory that already holds steps
    #[error("[L002] Ledger already initialized at {path} ({count} step(s) present)")]
    AlreadyInitialized { path: String, count: usize },

    /// L003: Ledger directory missing
    #[error("[L003] No ledger at {path}. Run 'tidemark init' first")]
    NotInitialized { path: String },

    /// L004: No step matches the given id
    #[error("[L004] Unknown step '{id}'")]
    UnknownStep { id: String },

    /// L005: Prefix matches several steps
    #[error("[L005] Step prefix '{prefix}' is ambiguous: {matches}")]
    AmbiguousPrefix { prefix: String, matches: String },

    /// L006: Two steps share a parent
    #[error("[L006] Ledger is branched: steps {children} all follow {parent}")]
    Branched { parent: String, children: String },

    /// L007: More than one step without a parent
    #[error("[L007] Ledger has several root steps: {roots}")]
    MultipleRoots { roots: String },

    /// L008: Step whose parent is not in the ledger
    #[error("[L008] Step {step} follows {parent}, which is not in the ledger")]
    Orphan { step: StepId, parent: String },

    /// L009: Stored step does not match its content
    #[error("[L009] Step file {path} has been modified: {reason}")]
    Tampered { path: String, reason: String },

    /// L010: Reverse operations do not undo the forward operations
    #[error("[L010] Reverse operations of step {step} are not the inverse of its forward operations")]
    ReverseMismatch { step: StepId },

    /// L011: Another process holds the ledger lock
    #[error("[L011] Ledger is locked by another process ({path}). Remove the file if no migration is running")]
    Locked { path: String },

    /// L012: Target cannot be reached in the requested direction
    #[error("[L012] Invalid target '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },

    /// L013: Live database points at a step the ledger does not know
    #[error("[L013] Database is at step '{id}', which is not in the ledger")]
    UnknownDatabaseVersion { id: StepId },

    /// L014: Recorded operations do not replay from the empty schema
    #[error("[L014] Step {step} does not replay over the recorded schema: {source}")]
    Replay {
        step: StepId,
        source: OperationConflict,
    },

    /// L015: The live database rejected an operation
    #[error("[L015] {0}")]
    Apply(#[from] ApplyError),

    /// L016: Two step files carry the same id
    #[error("[L016] Step {id} is stored twice: {first} and {second}")]
    DuplicateStep {
        id: StepId,
        first: String,
        second: String,
    },

    /// L017: IO error
    #[error("[L017] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// L018: IO error with file path context
    #[error("[L018] Failed to access '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// L019: Step file is not valid JSON
    #[error("[L019] Failed to parse step file {path}: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Diff(#[from] DiffError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type alias for LedgerError
pub type LedgerResult<T> = Result<T, LedgerError>;

/// An operation the live database refused to run.
#[derive(Error, Debug)]
#[error("Step {step} failed migrating {direction} at operation {index} ({operation}): {source}")]
pub struct ApplyError {
    pub step: StepId,
    pub direction: Direction,
    /// Position of the operation within the step's list
    pub index: usize,
    /// Human-readable form of the operation
    pub operation: String,
    pub source: DbError,
}

/// Render an optional step id, `base` for none.
pub(crate) fn describe(id: Option<&StepId>) -> String {
    id.map_or_else(|| "base".to_string(), |id| id.to_string())
}
