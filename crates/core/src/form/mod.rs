//! Form model and the field-completion tracker.

pub mod definition;
pub mod loader;
pub mod preset;
pub mod record;
pub mod tracker;

pub use definition::{
    FieldCondition, FieldDefinition, FieldType, FormDefinition, FormError, Requirement,
};
pub use loader::FormLoadError;
pub use record::DataRecord;
pub use tracker::{CompletionTracker, TurnOutcome};
