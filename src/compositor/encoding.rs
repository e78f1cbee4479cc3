/// Data-URI helpers
///
/// Encoded images travel through the engine as `data:<mime>;base64,...`
/// strings, the same shape the document store and the AI collaborators
/// consume. These helpers split, sniff and rebuild that shape.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::Result;

/// Mime type assumed when a source carries no `data:` header
pub const DEFAULT_MIME: &str = "image/jpeg";

/// True when the source string is a data URI
pub fn is_data_uri(source: &str) -> bool {
    source.starts_with("data:")
}

/// The base64 payload of a data URI, or the whole string when there is no
/// comma-separated header.
pub fn payload(data: &str) -> &str {
    match data.split_once(',') {
        Some((_, body)) => body,
        None => data,
    }
}

/// The mime type declared by a data URI header, defaulting to JPEG.
pub fn mime_type(data: &str) -> &str {
    if let Some(rest) = data.strip_prefix("data:") {
        if let Some(mime) = rest.split(';').next() {
            if mime.starts_with("image/") {
                return mime;
            }
        }
    }
    DEFAULT_MIME
}

/// Decode the base64 payload to raw bytes.
pub fn decode(data: &str) -> Result<Vec<u8>> {
    Ok(STANDARD.decode(payload(data))?)
}

/// Build a data URI from raw bytes.
pub fn to_data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
