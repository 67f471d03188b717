// src/engine/resource.rs
//
// ImageResource: an immutable encoded image plus its declared MIME type and name.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use std::time::SystemTime;

/// An encoded image payload. Cloning shares the bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageResource {
    data: Arc<Vec<u8>>,
    mime: String,
    name: String,
    last_modified: SystemTime,
}

impl ImageResource {
    /// Wrap bytes as a resource stamped with `last_modified = now`.
    pub fn new(data: impl Into<Vec<u8>>, mime: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data: Arc::new(data.into()),
            mime: mime.into(),
            name: name.into(),
            last_modified: SystemTime::now(),
        }
    }

    pub fn with_last_modified(mut self, last_modified: SystemTime) -> Self {
        self.last_modified = last_modified;
        self
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Declared MIME type. Never sniffed; decoding looks at magic bytes instead.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    /// `data:<mime>;base64,...` for inline previews.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime, STANDARD.encode(self.data.as_slice()))
    }
}

/// Swap the last `.ext` of `original` for `extension`.
pub fn replace_extension(original: &str, extension: &str) -> String {
    if original.trim().is_empty() {
        return format!("image.{extension}");
    }
    // Drop the last `.ext`, even when it is the whole name (".png").
    let stem = match original.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && !ext.contains('/') => stem,
        _ => original,
    };
    format!("{stem}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn clone_shares_payload() {
        let a = ImageResource::new(vec![1, 2, 3], "image/png", "a.png");
        let b = a.clone();
        assert!(std::ptr::eq(a.data().as_ptr(), b.data().as_ptr()));
        assert_eq!(b.size(), 3);
    }

    #[test]
    fn last_modified_can_be_pinned() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let r = ImageResource::new(vec![0], "image/png", "x.png").with_last_modified(t);
        assert_eq!(r.last_modified(), t);
    }

    #[test]
    fn data_url_encodes_payload() {
        let r = ImageResource::new(b"hi".to_vec(), "image/png", "x.png");
        assert_eq!(r.to_data_url(), "data:image/png;base64,aGk=");
    }

    #[test]
    fn replace_extension_swaps_suffix() {
        assert_eq!(replace_extension("photo.jpeg", "png"), "photo.png");
        assert_eq!(replace_extension("archive.tar.gz", "webp"), "archive.tar.webp");
        assert_eq!(replace_extension("noext", "jpg"), "noext.jpg");
        assert_eq!(replace_extension("", "jpg"), "image.jpg");
        assert_eq!(replace_extension(".png", "webp"), ".webp");
        assert_eq!(replace_extension("v1.2/shot", "png"), "v1.2/shot.png");
    }
}
