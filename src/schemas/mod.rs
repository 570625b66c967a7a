//! JSON schema plumbing for structured model replies

pub mod schema;
pub mod validation;

pub use schema::{apply_doc_comments, CompletionSchema, SchemaHandle};
pub use validation::{decode_model_payload, validate_structured_payload};
