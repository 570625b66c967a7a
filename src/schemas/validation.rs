use crate::{
    error::{PlannerError, Result},
    schemas::{CompletionSchema, SchemaHandle},
};
use jsonschema::{Draft, JSONSchema};
use serde_json::{Map, Value};

const MAX_SCHEMA_ERRORS: usize = 3;

/// Validate a structured payload against a schema
pub fn validate_structured_payload(schema: &SchemaHandle, payload: &Value) -> Result<()> {
    let validator = JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema.schema_json())
        .map_err(|err| {
            PlannerError::Validation(format!(
                "Failed to prepare `{}` schema for validation: {}",
                schema.schema_name(),
                err
            ))
        })?;

    if let Err(errors) = validator.validate(payload) {
        let mut details = Vec::new();
        let mut truncated = false;

        for (idx, error) in errors.enumerate() {
            if idx == MAX_SCHEMA_ERRORS {
                truncated = true;
                break;
            }
            let mut path = error.instance_path.to_string();
            if path.is_empty() {
                path = "<root>".to_string();
            }
            details.push(format!("{}: {}", path, error));
        }

        let mut detail_str = if details.is_empty() {
            "payload failed schema validation".to_string()
        } else {
            details.join("; ")
        };

        if truncated {
            detail_str.push_str("; additional errors truncated");
        }

        return Err(PlannerError::Validation(format!(
            "Payload does not match `{}` schema: {}",
            schema.schema_name(),
            detail_str
        )));
    }

    Ok(())
}

/// Find the first well-formed JSON object embedded in free-form model text.
///
/// Every `{` is tried as a start position in order; the streaming
/// deserializer stops at the end of the first complete value, so prose or
/// code fences around the object are ignored.
pub fn scan_json_object(text: &str) -> Option<Map<String, Value>> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .find_map(|(start, _)| {
            let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
            match stream.next() {
                Some(Ok(Value::Object(map))) => Some(map),
                _ => None,
            }
        })
}

/// Schema-check and deserialize a JSON value into `T`.
pub fn decode_model_payload<T: CompletionSchema>(payload: &Value) -> Result<T> {
    let schema = T::schema();
    validate_structured_payload(schema, payload)?;

    serde_path_to_error::deserialize(payload).map_err(|err| {
        let path = err.path().to_string();
        let location = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        PlannerError::Validation(format!(
            "failed to deserialize `{}` at {}: {}",
            schema.schema_name(),
            location,
            err.inner()
        ))
    })
}

/// Best-effort decode of a typed payload out of raw model output.
pub fn decode_model_text<T: CompletionSchema>(text: &str) -> Result<T> {
    let object = scan_json_object(text).ok_or_else(|| {
        PlannerError::Validation(format!(
            "no JSON object found for `{}` in model output",
            T::schema().schema_name()
        ))
    })?;

    decode_model_payload(&Value::Object(object))
}
