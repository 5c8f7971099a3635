//! Normalisation and parsing of the model's handle list.

use shopscribe_core::HandleEntry;

use crate::HandleError;

const FENCE: &str = "```";

/// Drop a surrounding code fence: when the text starts with a fence, the
/// first line and every bare fence line are removed.
pub fn strip_code_fence(text: &str) -> String {
    let text = text.trim();
    if !text.starts_with(FENCE) {
        return text.to_string();
    }
    text.split('\n')
        .skip(1)
        .filter(|line| line.trim() != FENCE)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a response as a JSON array of `{product_name, handle}` objects.
///
/// On failure the response is returned verbatim in
/// [`HandleError::ResponseFormat`].
pub fn parse_handles(response: &str) -> Result<Vec<HandleEntry>, HandleError> {
    let body = strip_code_fence(response);
    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(error = %e, "model response is not a handle array");
        HandleError::ResponseFormat {
            raw: response.to_string(),
        }
    })
}
