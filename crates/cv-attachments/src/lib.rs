//! # cv-attachments
//!
//! Photo attachment handling for Convoy RS.
//!
//! ## Features
//!
//! - Capacity-limited photo lists for pitstops and other records
//! - Local preview references with guaranteed release
//! - Removal intents for photos that are already uploaded
//! - Submission hand-off of the picked files
//!
//! ## Example
//!
//! ```rust,ignore
//! use cv_attachments::{AttachmentConfig, AttachmentManager, FileHandle, MemoryPreviewRegistry};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MemoryPreviewRegistry::new());
//! let mut manager = AttachmentManager::new(registry, existing_urls, AttachmentConfig::default())?;
//!
//! // Attach what the user picked
//! let outcome = manager.add_files(vec![
//!     FileHandle::new("pitstop.jpg", bytes).with_content_type("image/jpeg"),
//! ])?;
//!
//! // On submit
//! let submission = manager.into_submission();
//! ```

pub mod manager;
pub mod model;
pub mod preview;

pub use manager::{
    AttachmentConfig, AttachmentError, AttachmentManager, AttachmentResult, PendingImage,
};
pub use model::{AddOutcome, AttachmentView, FileHandle, PendingView, PreviewRef, Submission};
pub use preview::{
    MemoryPreviewRegistry, PreviewError, PreviewGuard, PreviewRegistry, PreviewResult,
};
