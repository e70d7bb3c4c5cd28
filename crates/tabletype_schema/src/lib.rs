//! Table Type Catalog
//!
//! # Table types
//!
//! A table type is a named, ordered list of typed, validated columns. Every
//! table in the data dictionary is an instance of exactly one type. Types are
//! either user-defined or one of the two intrinsic kinds:
//!
//! 1. **Structure**: parameters with name, data type, array size, bit length
//! 2. **Command**: command name and code plus groups of argument columns
//!
//! Kind is never declared. A type represents a kind when it holds a column
//! of every protected input type in that kind's template, so a user type
//! gains structure behavior simply by carrying the right columns.
//!
//! Committed definitions cannot change shape once tables exist. Imports and
//! edits go through the reconciliation engine, which accepts description
//! changes and new data fields, and rejects everything else as a Mismatch.
//!
//! # Modules
//!
//! - [`input_type`]: Input type registry: validation patterns and normalizers
//! - [`defaults`]: Compiled-in column templates for the intrinsic kinds
//! - [`naming`]: Display name to storage name translation, reserved words
//! - [`definition`]: Column and type definitions
//! - [`builder`]: Two-pass construction from storage or edited rows
//! - [`classify`]: Structure/command classification
//! - [`registry`]: The committed type set and its query surface
//! - [`field`]: Data fields and their comparison rules
//! - [`store`]: Storage collaborator traits and an in-memory store
//! - [`reconcile`]: New / Match / Mismatch reconciliation with field cascade
//! - [`command_args`]: Command argument column groups

pub mod builder;
pub mod classify;
pub mod command_args;
pub mod defaults;
pub mod definition;
pub mod field;
pub mod input_type;
pub mod naming;
pub mod reconcile;
pub mod registry;
pub mod store;

pub use builder::{
    build_type_from_edited_rows, build_type_from_storage_rows, BuildError, EditedRow,
    PendingTypeDefinition, StorageRow,
};
pub use defaults::{SemanticKind, COMMAND_TYPE, STRUCTURE_TYPE};
pub use definition::{ColumnDefinition, TypeDefinition};
pub use field::{Applicability, FieldDefinition, FieldDifference};
pub use input_type::{builtin, InputType, InputTypeFormat, InputTypeRef, InputTypeRegistry, RegistryError};
pub use naming::{NameTranslator, ReservedWords};
pub use registry::{TypeRegistry, TypeRegistryError};
pub use store::{FieldStore, MemoryStore, StoreError, TypeStore};

// Re-export key types from reconcile module
pub use reconcile::{
    BatchPlan, BatchReport, ColumnDifference, ColumnFlag, DuplicateFieldRename, IncomingType,
    MatchChanges, Mismatch, ReconcileError, ReconciliationEngine, ReconciliationOutcome,
    RenameDecision, RenamePolicy,
};
