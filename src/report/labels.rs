//! Axis expression handling and human-readable labels.

use crate::domain::Dataset;

/// Reduce `expr [unit]` to `expr`; anything else is returned trimmed.
pub fn strip_unit_suffix(expression: &str) -> &str {
    let trimmed = expression.trim();
    if let Some(body) = trimmed.strip_suffix(']') {
        if let Some(open) = body.rfind('[') {
            return body[..open].trim_end();
        }
    }
    trimmed
}

/// `description [unit]` from column metadata, falling back to the
/// description alone and then to the expression text itself.
pub fn axis_label(dataset: &Dataset, expression: &str) -> String {
    let Some(meta) = dataset.meta(expression) else {
        return expression.to_string();
    };
    let description = if meta.description.is_empty() {
        expression
    } else {
        meta.description.as_str()
    };
    if meta.unit.is_empty() {
        description.to_string()
    } else {
        format!("{description} [{}]", meta.unit)
    }
}
