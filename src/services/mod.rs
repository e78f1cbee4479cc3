/// External collaborator seams
///
/// The engine never talks to a network or a document store directly; it
/// goes through these traits. The `Unconfigured*` implementations mirror
/// the production behavior when no AI credentials are present: a no-op
/// passthrough that always succeeds with the input image.

use async_trait::async_trait;

use crate::error::Result;
use crate::photo::Photo;

/// Enhancement profile hint forwarded to the AI collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HdrProfile {
    Interior,
    Exterior,
}

impl Default for HdrProfile {
    fn default() -> Self {
        HdrProfile::Interior
    }
}

impl HdrProfile {
    /// Wire-level profile identifier
    pub fn as_hint(&self) -> &'static str {
        match self {
            HdrProfile::Interior => "hp_hdr_interior",
            HdrProfile::Exterior => "hp_hdr_exterior",
        }
    }
}

/// Which editing tool produced an edit request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditMode {
    /// Object removal guided by the painted mask
    Erase,
    /// Virtual staging guided by a text instruction
    Stage,
}

/// AI enhancement of a captured image (the "HDR merge" collaborator).
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Returns an enhanced image, or fails. Callers treat failure and
    /// degenerate responses as non-fatal and keep their input.
    async fn enhance(&self, image: &str, profile: HdrProfile) -> Result<String>;
}

/// AI-driven image editing (erase / staging).
#[async_trait]
pub trait PhotoEditorService: Send + Sync {
    async fn edit(&self, image: &str, instruction: &str, mode: EditMode) -> Result<String>;
}

/// Photo persistence collaborator.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Persist a freshly captured photo. The capture machine awaits this
    /// before declaring the session saved.
    async fn on_photo_captured(&self, photo: &Photo) -> Result<()>;

    /// Persist an edited photo; may return a server-assigned merged copy.
    async fn on_photo_saved(&self, photo: &Photo) -> Result<Photo>;
}

/// Platform dark-mode preference, read synchronously on demand.
pub trait ThemeSource: Send {
    fn prefers_dark(&self) -> bool;
}

/// Enhancer used when no AI credentials are configured: input passthrough.
pub struct UnconfiguredEnhancer;

#[async_trait]
impl Enhancer for UnconfiguredEnhancer {
    async fn enhance(&self, image: &str, _profile: HdrProfile) -> Result<String> {
        Ok(image.to_string())
    }
}

/// Edit service used when no AI credentials are configured.
pub struct UnconfiguredEditor;

#[async_trait]
impl PhotoEditorService for UnconfiguredEditor {
    async fn edit(&self, image: &str, _instruction: &str, _mode: EditMode) -> Result<String> {
        Ok(image.to_string())
    }
}
