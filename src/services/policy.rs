use crate::models::{CollectionSchema, FieldKind, FieldPolicy};
use crate::services::error::ReconcileError;

/// Resolves the access policy of a file field.
///
/// Fails when the field is unknown to the collection or is not a file field;
/// callers only ask about fields that received uploads.
pub fn resolve(schema: &CollectionSchema, field_name: &str) -> Result<FieldPolicy, ReconcileError> {
    let field = schema
        .field(field_name)
        .ok_or_else(|| ReconcileError::UnknownField {
            collection: schema.name.clone(),
            field: field_name.to_string(),
        })?;

    match &field.kind {
        FieldKind::File { options } => Ok(FieldPolicy {
            field: field.name.clone(),
            is_protected: options.protected,
        }),
        _ => Err(ReconcileError::NotAFileField {
            collection: schema.name.clone(),
            field: field_name.to_string(),
        }),
    }
}
