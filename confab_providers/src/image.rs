//! Image reference resolution and data-URL inlining.
//!
//! Backends without a dedicated multimodal field receive local images
//! as `data:image/<fmt>;base64,...` URLs. Remote references are never
//! fetched here; they pass through to the backend untouched.

use std::io;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Whether the reference points at a remote image.
#[must_use]
pub fn is_remote(reference: &str) -> bool {
    reference.starts_with("http://") || reference.starts_with("https://")
}

/// Resolve an image reference to the path a backend should load.
///
/// URLs, absolute paths, explicitly relative (`./`, `../`) paths and
/// paths that already exist are passed through; anything else is joined
/// to `base_dir` when one is configured.
#[must_use]
pub fn resolve(reference: &str, base_dir: Option<&Path>) -> String {
    if is_remote(reference)
        || Path::new(reference).is_absolute()
        || reference.starts_with("./")
        || reference.starts_with("../")
        || Path::new(reference).exists()
    {
        return reference.to_string();
    }
    base_dir.map_or_else(
        || reference.to_string(),
        |base| base.join(reference).to_string_lossy().into_owned(),
    )
}

fn mime_for(path: &str) -> &'static str {
    let extension = path
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        _ => "image/png",
    }
}

/// Load a local image and encode it as a base64 data URL.
pub fn to_data_url(reference: &str, base_dir: Option<&Path>) -> io::Result<String> {
    let resolved = resolve(reference, base_dir);
    let bytes = std::fs::read(&resolved)?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for(&resolved),
        STANDARD.encode(bytes)
    ))
}
