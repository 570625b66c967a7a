mod completion_schema;
mod schema_extraction;

use proc_macro::TokenStream;

/// Attach a cached JSON schema to a named struct so model replies can be
/// validated against it before deserialization.
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// #[completion_schema(name = "trip_intent")]
/// pub struct TripIntent { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn completion_schema(attr: TokenStream, item: TokenStream) -> TokenStream {
    completion_schema::completion_schema(attr, item)
}
