//! Attachment models
//!
//! Files picked by the user, the preview references rendered for them, and
//! the snapshots handed to renderers and to the submitting form.

use bytes::Bytes;
use mime::Mime;
use serde::{Deserialize, Serialize};

/// A file selected by the user that has not been uploaded yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    declared_type: Option<String>,
    data: Bytes,
}

impl FileHandle {
    /// Create a file handle with no declared content type
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            data: data.into(),
        }
    }

    /// Set the content type reported by the file picker
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        // Pickers report "" for unknown types
        self.declared_type = if content_type.trim().is_empty() {
            None
        } else {
            Some(content_type)
        };
        self
    }

    /// Original file name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw payload
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Resolved MIME type: the declared type if any, otherwise a guess from
    /// the file name.
    pub fn mime(&self) -> Option<Mime> {
        match &self.declared_type {
            Some(declared) => declared.trim().parse().ok(),
            None => mime_guess::from_path(&self.name).first(),
        }
    }

    /// Resolved content type without parameters, e.g. `image/jpeg`
    pub fn content_type(&self) -> Option<String> {
        self.mime().map(|m| m.essence_str().to_ascii_lowercase())
    }

    /// Check if this is an image
    pub fn is_image(&self) -> bool {
        self.mime().map(|m| m.type_() == mime::IMAGE).unwrap_or(false)
    }
}

/// A revocable handle used only to render a thumbnail of a pending file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewRef(String);

impl PreviewRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of a successful `add_files` call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddOutcome {
    /// Number of files appended to the pending list
    pub accepted: usize,
    /// Names of files dropped because they are not (allowed) images
    pub skipped: Vec<String>,
}

impl AddOutcome {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Render snapshot of one pending photo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingView {
    pub index: usize,
    pub name: String,
    pub preview_url: PreviewRef,
    pub size: usize,
}

/// Everything a renderer needs to draw thumbnails and remove buttons
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
    pub existing: Vec<String>,
    pub pending: Vec<PendingView>,
    pub total_count: usize,
    pub can_add_more: bool,
    pub capacity: usize,
}

/// What the form uploads and deletes when the user submits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    /// New files to upload, in selection order
    pub files: Vec<FileHandle>,
    /// Remote photos to keep
    pub retained_remote: Vec<String>,
    /// Remote photos the user asked to delete
    pub removed_remote: Vec<String>,
}

impl Submission {
    /// True if submitting would change the record's photos
    pub fn has_changes(&self) -> bool {
        !self.files.is_empty() || !self.removed_remote.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_image_type() {
        let file = FileHandle::new("IMG_0042", Bytes::from_static(b"\xff\xd8"))
            .with_content_type("image/jpeg");
        assert!(file.is_image());
        assert_eq!(file.content_type().as_deref(), Some("image/jpeg"));
        assert_eq!(file.size(), 2);
    }

    #[test]
    fn test_declared_type_wins_over_extension() {
        let file = FileHandle::new("notes.png", "plain text").with_content_type("text/plain");
        assert!(!file.is_image());
    }

    #[test]
    fn test_guess_from_extension_when_undeclared() {
        let photo = FileHandle::new("track-day.PNG", Vec::new());
        assert!(photo.is_image());
        assert_eq!(photo.content_type().as_deref(), Some("image/png"));

        let blank = FileHandle::new("route.gpx", Vec::new()).with_content_type("");
        assert!(!blank.is_image());

        let unknown = FileHandle::new("no-extension", Vec::new());
        assert!(unknown.mime().is_none());
        assert!(!unknown.is_image());
    }

    #[test]
    fn test_content_type_parameters_are_dropped() {
        let file = FileHandle::new("a.svg", Vec::new())
            .with_content_type("image/SVG+xml; charset=utf-8");
        assert!(file.is_image());
        assert_eq!(file.content_type().as_deref(), Some("image/svg+xml"));
    }

    #[test]
    fn test_garbage_content_type_is_not_image() {
        let file = FileHandle::new("a.jpg", Vec::new()).with_content_type("not a mime");
        assert!(!file.is_image());
    }

    #[test]
    fn test_submission_has_changes() {
        let mut submission = Submission {
            retained_remote: vec!["https://cdn.example.com/a.jpg".to_string()],
            ..Default::default()
        };
        assert!(!submission.has_changes());

        submission
            .removed_remote
            .push("https://cdn.example.com/b.jpg".to_string());
        assert!(submission.has_changes());
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let view = AttachmentView {
            existing: vec!["https://cdn.example.com/a.jpg".to_string()],
            pending: vec![PendingView {
                index: 0,
                name: "b.jpg".to_string(),
                preview_url: PreviewRef::new("blob:convoy/1"),
                size: 10,
            }],
            total_count: 2,
            can_add_more: true,
            capacity: 3,
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["totalCount"], 2);
        assert_eq!(json["canAddMore"], true);
        assert_eq!(json["pending"][0]["previewUrl"], "blob:convoy/1");
    }
}
