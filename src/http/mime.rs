//! Content type lookup for served files.

use std::path::Path;

/// Maps a file path to the value of its `Content-Type` header.
pub trait MimeLookup: Send + Sync {
    fn content_type(&self, path: &Path) -> String;
}

/// Guesses the content type from the file extension, falling back to
/// `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMime;

impl MimeLookup for ExtensionMime {
    fn content_type(&self, path: &Path) -> String {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

impl<F> MimeLookup for F
where
    F: Fn(&Path) -> String + Send + Sync,
{
    fn content_type(&self, path: &Path) -> String {
        self(path)
    }
}
