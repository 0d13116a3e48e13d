//! Attachment Manager
//!
//! Keeps the list of photos a user is about to attach to one record: the
//! ones already uploaded (by URL) and the ones just picked from disk, capped
//! at a fixed capacity across both.

use std::sync::Arc;

use cv_core::config::{AttachmentSettings, DEFAULT_ATTACHMENT_CAPACITY};
use cv_core::error::{CvError, ValidationErrors};
use mime::Mime;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::model::{AddOutcome, AttachmentView, FileHandle, PendingView, PreviewRef, Submission};
use crate::preview::{PreviewError, PreviewGuard, PreviewRegistry};

/// Manager errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Too many photos: {current} attached, {requested} selected, limit is {capacity}")]
    CapacityExceeded {
        capacity: usize,
        current: usize,
        requested: usize,
    },
    #[error("Capacity must be at least 1")]
    InvalidCapacity,
    #[error("{existing} existing photos exceed the capacity of {capacity}")]
    ExistingExceedsCapacity { existing: usize, capacity: usize },
    #[error("Preview error: {0}")]
    Preview(#[from] PreviewError),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

impl AttachmentError {
    /// Whether the user should see this as a blocking notification
    pub fn is_user_facing(&self) -> bool {
        matches!(self, Self::CapacityExceeded { .. })
    }

    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::CapacityExceeded { capacity, .. } => {
                Some(format!("You can only upload up to {} photos.", capacity))
            }
            _ => None,
        }
    }
}

impl From<AttachmentError> for CvError {
    fn from(err: AttachmentError) -> Self {
        match err.user_message() {
            Some(message) => CvError::Validation(ValidationErrors::single("attachments", message)),
            None => CvError::Internal(err.to_string()),
        }
    }
}

/// Manager configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentConfig {
    /// Maximum photos (remote + pending)
    pub capacity: usize,
    /// Image types refused even though they are images
    pub blocked_mime_types: Vec<String>,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_ATTACHMENT_CAPACITY,
            blocked_mime_types: Vec::new(),
        }
    }
}

impl From<&AttachmentSettings> for AttachmentConfig {
    fn from(settings: &AttachmentSettings) -> Self {
        Self {
            capacity: settings.capacity,
            blocked_mime_types: settings.blocked_mime_types.clone(),
        }
    }
}

impl AttachmentConfig {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Check if a file may take a slot
    pub fn accepts(&self, file: &FileHandle) -> bool {
        match file.mime() {
            Some(m) if m.type_() == mime::IMAGE => !self.is_blocked(&m),
            _ => false,
        }
    }

    fn is_blocked(&self, m: &Mime) -> bool {
        self.blocked_mime_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(m.essence_str()))
    }
}

/// A picked file together with its live preview
pub struct PendingImage<R: PreviewRegistry + ?Sized> {
    file: FileHandle,
    preview: PreviewGuard<R>,
}

impl<R: PreviewRegistry + ?Sized> PendingImage<R> {
    pub fn file(&self) -> &FileHandle {
        &self.file
    }

    pub fn preview(&self) -> &PreviewRef {
        self.preview.preview()
    }

    /// Give up the preview and keep the file
    pub fn into_file(self) -> FileHandle {
        let PendingImage { file, preview } = self;
        if let Err(e) = preview.release() {
            warn!(file = file.name(), error = %e, "Failed to revoke preview");
        }
        file
    }
}

impl<R: PreviewRegistry + ?Sized> std::fmt::Debug for PendingImage<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingImage")
            .field("file", &self.file.name())
            .field("preview", self.preview.preview())
            .finish()
    }
}

/// Photo attachments for a single record being edited.
///
/// Owned by the form that edits the record. Dropping the manager revokes every
/// preview it still holds.
pub struct AttachmentManager<R: PreviewRegistry + ?Sized> {
    registry: Arc<R>,
    config: AttachmentConfig,
    existing_remote: Vec<String>,
    removed_remote: Vec<String>,
    // Original position of each `removed_remote` entry
    removed_at: Vec<usize>,
    pending: Vec<PendingImage<R>>,
    revision: u64,
}

impl<R: PreviewRegistry + ?Sized> AttachmentManager<R> {
    /// Start editing a record that already has `existing_remote` photos
    pub fn new(
        registry: Arc<R>,
        existing_remote: Vec<String>,
        config: AttachmentConfig,
    ) -> AttachmentResult<Self> {
        if config.capacity == 0 {
            return Err(AttachmentError::InvalidCapacity);
        }
        if existing_remote.len() > config.capacity {
            return Err(AttachmentError::ExistingExceedsCapacity {
                existing: existing_remote.len(),
                capacity: config.capacity,
            });
        }

        Ok(Self {
            registry,
            config,
            existing_remote,
            removed_remote: Vec::new(),
            removed_at: Vec::new(),
            pending: Vec::new(),
            revision: 0,
        })
    }

    /// Add a batch of picked files.
    ///
    /// Files that are not images are skipped and reported back. The rest are
    /// accepted together or not at all.
    #[instrument(skip(self, candidates), fields(batch = candidates.len()))]
    pub fn add_files(&mut self, candidates: Vec<FileHandle>) -> AttachmentResult<AddOutcome> {
        let mut accepted = Vec::with_capacity(candidates.len());
        let mut skipped = Vec::new();
        for file in candidates {
            if self.config.accepts(&file) {
                accepted.push(file);
            } else {
                skipped.push(file.name().to_string());
            }
        }

        if !skipped.is_empty() {
            debug!(skipped = skipped.len(), "Skipped files that are not images");
        }

        let current = self.total_count();
        if current + accepted.len() > self.config.capacity {
            warn!(
                capacity = self.config.capacity,
                current,
                requested = accepted.len(),
                "Photo batch rejected"
            );
            return Err(AttachmentError::CapacityExceeded {
                capacity: self.config.capacity,
                current,
                requested: accepted.len(),
            });
        }

        // Previews staged here are revoked on drop if a later one fails
        let mut staged = Vec::with_capacity(accepted.len());
        for file in accepted {
            let preview = PreviewGuard::acquire(&self.registry, &file).map_err(|e| {
                warn!(
                    registry = self.registry.name(),
                    file = file.name(),
                    error = %e,
                    "Preview allocation failed"
                );
                e
            })?;
            staged.push(PendingImage { file, preview });
        }

        let count = staged.len();
        if count > 0 {
            self.pending.extend(staged);
            self.touch();
        }

        info!(accepted = count, total = self.total_count(), "Photos added");

        Ok(AddOutcome {
            accepted: count,
            skipped,
        })
    }

    /// Remove a pending photo. Out of range indexes are ignored.
    #[instrument(skip(self))]
    pub fn remove_pending_at(&mut self, index: usize) -> bool {
        if index >= self.pending.len() {
            debug!(len = self.pending.len(), "Ignoring out-of-range pending removal");
            return false;
        }

        let entry = &mut self.pending[index];
        if let Err(e) = entry.preview.release_now() {
            warn!(file = entry.file.name(), error = %e, "Failed to revoke preview");
        }
        let removed = self.pending.remove(index);
        let name = removed.file().name().to_string();
        self.touch();

        debug!(file = %name, "Pending photo removed");
        true
    }

    /// Mark an uploaded photo for deletion.
    ///
    /// The URL moves to [`removed_remote`](Self::removed_remote) and is handed
    /// to the submitter; the slot is free immediately.
    #[instrument(skip(self))]
    pub fn remove_existing_at(&mut self, index: usize) -> Option<String> {
        if index >= self.existing_remote.len() {
            debug!(len = self.existing_remote.len(), "Ignoring out-of-range remote removal");
            return None;
        }

        let url = self.existing_remote.remove(index);
        self.removed_remote.push(url.clone());
        self.removed_at.push(index);
        self.touch();

        info!(url = %url, "Remote photo marked for deletion");
        Some(url)
    }

    /// Undo [`remove_existing_at`](Self::remove_existing_at) for `url`.
    ///
    /// Returns `Ok(false)` if the URL was not marked. The photo goes back to
    /// the position it was removed from, clamped to the current list length.
    pub fn restore_existing(&mut self, url: &str) -> AttachmentResult<bool> {
        let Some(pos) = self.removed_remote.iter().position(|u| u == url) else {
            return Ok(false);
        };

        let current = self.total_count();
        if current >= self.config.capacity {
            return Err(AttachmentError::CapacityExceeded {
                capacity: self.config.capacity,
                current,
                requested: 1,
            });
        }

        let url = self.removed_remote.remove(pos);
        let index = self.removed_at.remove(pos).min(self.existing_remote.len());
        self.existing_remote.insert(index, url);
        self.touch();
        Ok(true)
    }

    /// Remove every pending photo
    pub fn clear(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let released = self.pending.len();
        for pending in self.pending.drain(..) {
            drop(pending.into_file());
        }
        self.touch();
        debug!(released, "Pending photos cleared");
    }

    /// Hand the files and removal intents to the submitter.
    ///
    /// Every preview is revoked; the files are returned in selection order.
    pub fn into_submission(self) -> Submission {
        let AttachmentManager {
            existing_remote,
            removed_remote,
            pending,
            ..
        } = self;

        let files: Vec<FileHandle> = pending.into_iter().map(PendingImage::into_file).collect();

        info!(
            files = files.len(),
            retained = existing_remote.len(),
            removed = removed_remote.len(),
            "Photos handed to submission"
        );

        Submission {
            files,
            retained_remote: existing_remote,
            removed_remote,
        }
    }

    pub fn existing_remote(&self) -> &[String] {
        &self.existing_remote
    }

    pub fn removed_remote(&self) -> &[String] {
        &self.removed_remote
    }

    pub fn pending(&self) -> &[PendingImage<R>] {
        &self.pending
    }

    /// Raw files waiting to be uploaded, in selection order
    pub fn pending_files(&self) -> impl Iterator<Item = &FileHandle> + '_ {
        self.pending.iter().map(PendingImage::file)
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn total_count(&self) -> usize {
        self.existing_remote.len() + self.pending.len()
    }

    pub fn can_add_more(&self) -> bool {
        self.total_count() < self.config.capacity
    }

    pub fn remaining_slots(&self) -> usize {
        self.config.capacity.saturating_sub(self.total_count())
    }

    /// Bumped on every change; renderers redraw when it moves
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Snapshot for rendering
    pub fn view(&self) -> AttachmentView {
        AttachmentView {
            existing: self.existing_remote.clone(),
            pending: self
                .pending
                .iter()
                .enumerate()
                .map(|(index, p)| PendingView {
                    index,
                    name: p.file().name().to_string(),
                    preview_url: p.preview().clone(),
                    size: p.file().size(),
                })
                .collect(),
            total_count: self.total_count(),
            can_add_more: self.can_add_more(),
            capacity: self.config.capacity,
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl<R: PreviewRegistry + ?Sized> std::fmt::Debug for AttachmentManager<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttachmentManager")
            .field("capacity", &self.config.capacity)
            .field("existing_remote", &self.existing_remote)
            .field("removed_remote", &self.removed_remote)
            .field("pending", &self.pending)
            .field("revision", &self.revision)
            .finish()
    }
}
