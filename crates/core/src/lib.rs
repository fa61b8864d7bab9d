pub mod config;
pub mod errors;
pub mod form;

pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use form::{
    CompletionTracker, DataRecord, FieldCondition, FieldDefinition, FieldType, FormDefinition,
    FormError, Requirement, TurnOutcome,
};
