//! In-browser-style HDR photo capture and editing engine for real-estate
//! photography.
//!
//! The crate is organized around three machines and the plumbing between
//! them:
//!
//! - [`capture`]: camera discovery, the countdown/exposure-ladder capture
//!   state machine and AI-enhanced HDR merging
//! - [`editor`]: the mask-paint + AI edit session with linear undo history
//! - [`compositor`] / [`watermark`] / [`geometry`]: deterministic raster
//!   compositing, JPEG serialization and overlay placement
//!
//! External collaborators (AI services, photo persistence, the platform
//! camera) live behind the traits in [`services`] and
//! [`capture::devices`]; everything else is pure and synchronous.

pub mod capture;
pub mod compositor;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod photo;
pub mod services;
pub mod theme;
pub mod watermark;

pub use capture::{CaptureConfig, CaptureController, CaptureState};
pub use editor::{EditSession, EditorPhase};
pub use error::{Error, Result};
pub use photo::{Photo, PhotoKind};
pub use services::{EditMode, Enhancer, HdrProfile, PhotoEditorService, PhotoStore};
