//! Inline (`data:`) reference images

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::assets::LocalAsset;
use crate::error::{AppError, Result};

/// Decode a base64 payload, accepting either a bare string or a data URL
pub fn decode(encoded: &str) -> Result<Vec<u8>> {
    let data = match encoded.split_once(',') {
        Some((_, payload)) => payload,
        None => encoded,
    };

    STANDARD
        .decode(data.trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid base64 data: {}", e)))
}

/// MIME type declared in a data URL prefix, e.g. `image/png`
pub fn media_type(data_url: &str) -> Option<&str> {
    let rest = data_url.strip_prefix("data:")?;
    let end = rest.find([';', ','])?;
    let mime = &rest[..end];
    (!mime.is_empty()).then_some(mime)
}

/// Turn an inline upload into a pending local asset
pub fn to_local_asset(data_url: &str, file_name: Option<&str>) -> Result<LocalAsset> {
    let bytes = decode(data_url)?;
    let content_type = media_type(data_url).map(str::to_string);
    let file_name = file_name
        .map(str::to_string)
        .unwrap_or_else(|| default_file_name(content_type.as_deref()));

    Ok(LocalAsset::new(file_name, content_type, bytes))
}

fn default_file_name(content_type: Option<&str>) -> String {
    let extension = content_type
        .and_then(|mime| mime.strip_prefix("image/"))
        .unwrap_or("bin");
    format!("reference.{}", extension)
}
