//! Preview references
//!
//! A preview reference is a local rendering handle for a file that has not
//! been uploaded yet. The runtime hands them out and must be told when one is
//! no longer needed, so every reference is owned by a [`PreviewGuard`] that
//! revokes it exactly once.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{FileHandle, PreviewRef};

/// Preview errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("Preview reference is not live: {0}")]
    NotLive(PreviewRef),
    #[error("Preview limit reached: {limit} live references")]
    Exhausted { limit: usize },
    #[error("Preview backend error: {0}")]
    Backend(String),
}

pub type PreviewResult<T> = Result<T, PreviewError>;

/// Allocator of preview references
#[cfg_attr(test, mockall::automock)]
pub trait PreviewRegistry: Send + Sync {
    /// Allocate a fresh reference for a file
    fn create(&self, file: &FileHandle) -> PreviewResult<PreviewRef>;

    /// Release a reference; it must not be rendered afterwards
    fn revoke(&self, preview: &PreviewRef) -> PreviewResult<()>;

    /// Check whether a reference is still usable
    fn is_live(&self, preview: &PreviewRef) -> bool;

    /// Registry name for logging
    fn name(&self) -> &'static str;
}

#[derive(Debug)]
struct LiveEntry {
    file_name: String,
    size: usize,
}

#[derive(Debug, Default)]
struct RegistryState {
    live: HashMap<PreviewRef, LiveEntry>,
    allocated: u64,
    revoked: u64,
}

/// In-process preview registry that mints `blob:` style URLs
#[derive(Debug, Default)]
pub struct MemoryPreviewRegistry {
    state: Mutex<RegistryState>,
    max_live: Option<usize>,
}

impl MemoryPreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to hold more than `limit` live references at once
    pub fn with_max_live(limit: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            max_live: Some(limit),
        }
    }

    /// Total references ever handed out
    pub fn allocated(&self) -> u64 {
        self.state.lock().allocated
    }

    /// Total references released
    pub fn revoked(&self) -> u64 {
        self.state.lock().revoked
    }

    /// References currently live
    pub fn live_count(&self) -> usize {
        self.state.lock().live.len()
    }

    /// Name of the file a live reference was created for
    pub fn file_name(&self, preview: &PreviewRef) -> Option<String> {
        self.state
            .lock()
            .live
            .get(preview)
            .map(|entry| entry.file_name.clone())
    }

    /// Bytes held by live references
    pub fn live_bytes(&self) -> usize {
        self.state.lock().live.values().map(|entry| entry.size).sum()
    }
}

impl PreviewRegistry for MemoryPreviewRegistry {
    fn create(&self, file: &FileHandle) -> PreviewResult<PreviewRef> {
        let mut state = self.state.lock();

        if let Some(limit) = self.max_live {
            if state.live.len() >= limit {
                return Err(PreviewError::Exhausted { limit });
            }
        }

        let preview = PreviewRef::new(format!("blob:convoy/{}", Uuid::new_v4()));
        state.live.insert(
            preview.clone(),
            LiveEntry {
                file_name: file.name().to_string(),
                size: file.size(),
            },
        );
        state.allocated += 1;

        debug!(preview = %preview, file = file.name(), "Preview created");
        Ok(preview)
    }

    fn revoke(&self, preview: &PreviewRef) -> PreviewResult<()> {
        let mut state = self.state.lock();
        match state.live.remove(preview) {
            Some(_) => {
                state.revoked += 1;
                debug!(preview = %preview, "Preview revoked");
                Ok(())
            }
            None => Err(PreviewError::NotLive(preview.clone())),
        }
    }

    fn is_live(&self, preview: &PreviewRef) -> bool {
        self.state.lock().live.contains_key(preview)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Owns one live preview reference and revokes it when dropped
pub struct PreviewGuard<R: PreviewRegistry + ?Sized> {
    registry: Arc<R>,
    preview: PreviewRef,
    released: bool,
}

impl<R: PreviewRegistry + ?Sized> PreviewGuard<R> {
    /// Allocate a reference for `file`
    pub fn acquire(registry: &Arc<R>, file: &FileHandle) -> PreviewResult<Self> {
        let preview = registry.create(file)?;
        Ok(Self {
            registry: Arc::clone(registry),
            preview,
            released: false,
        })
    }

    pub fn preview(&self) -> &PreviewRef {
        &self.preview
    }

    /// Revoke now instead of on drop, surfacing the registry's answer
    pub fn release(mut self) -> PreviewResult<()> {
        self.release_once()
    }

    /// Revoke while keeping the guard; later calls and the drop are no-ops
    pub fn release_now(&mut self) -> PreviewResult<()> {
        self.release_once()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    fn release_once(&mut self) -> PreviewResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        self.registry.revoke(&self.preview)
    }
}

impl<R: PreviewRegistry + ?Sized> Drop for PreviewGuard<R> {
    fn drop(&mut self) {
        if let Err(e) = self.release_once() {
            warn!(
                registry = self.registry.name(),
                preview = %self.preview,
                error = %e,
                "Failed to revoke preview"
            );
        }
    }
}

impl<R: PreviewRegistry + ?Sized> std::fmt::Debug for PreviewGuard<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewGuard")
            .field("preview", &self.preview)
            .field("released", &self.released)
            .finish()
    }
}
