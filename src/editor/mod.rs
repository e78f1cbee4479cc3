/// Mask/edit state machine
///
/// One session per editor-open-to-close cycle on a single photo. Holds a
/// linear undo history of encoded images, the transient mask layer, and
/// the Processing guard that serializes edit requests — a second apply
/// while one is in flight is rejected, never queued.

use crate::compositor::{self, Layer};
use crate::error::{Error, Result};
use crate::photo::Photo;
use crate::services::{EditMode, PhotoEditorService, PhotoStore};

pub mod mask;

use mask::MaskLayer;

/// Instruction sent when the erase prompt is left empty
pub const DEFAULT_ERASE_INSTRUCTION: &str = "Remove the red marked object.";

/// Session phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorPhase {
    /// Image loaded, accepting strokes/prompts/undo/apply
    Ready,
    /// An edit request is in flight; everything else is locked out
    Processing,
}

/// A prepared edit request: what goes to the collaborator.
#[derive(Debug)]
pub struct EditRequest {
    pub image: String,
    pub instruction: String,
    pub mode: EditMode,
}

/// Editing session over one photo.
///
/// Invariant: `history` is never empty and `current_index` always points
/// inside it; `history[current_index]` is the displayed/save candidate.
pub struct EditSession {
    photo: Photo,
    history: Vec<String>,
    current_index: usize,
    mask: MaskLayer,
    mode: EditMode,
    prompt: String,
    phase: EditorPhase,
}

impl EditSession {
    /// Open a session on a photo, seeding history with its current image.
    ///
    /// The source is validated by attempting a decode; when that fails the
    /// raw url string is still used as the seed (display may yet succeed
    /// downstream), matching the fetch-then-fallback load behavior.
    pub fn open(photo: Photo, display_width: u32, display_height: u32) -> Self {
        if let Err(e) = compositor::load_image(&photo.url) {
            log::warn!("editor: source not decodable, using raw url: {}", e);
        }

        let seed = photo.url.clone();
        EditSession {
            photo,
            history: vec![seed],
            current_index: 0,
            mask: MaskLayer::new(display_width, display_height),
            mode: EditMode::Erase,
            prompt: String::new(),
            phase: EditorPhase::Ready,
        }
    }

    pub fn phase(&self) -> EditorPhase {
        self.phase
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    /// Switch tools. Allowed only while Ready.
    pub fn set_mode(&mut self, mode: EditMode) {
        if self.phase == EditorPhase::Ready {
            self.mode = mode;
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn set_prompt(&mut self, text: impl Into<String>) {
        self.prompt = text.into();
    }

    /// The displayed/save-candidate image.
    pub fn current_image(&self) -> &str {
        &self.history[self.current_index]
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn mask(&self) -> &MaskLayer {
        &self.mask
    }

    /// Mutable mask access for stroke input. Strokes only make sense in
    /// erase mode and while no edit is processing.
    pub fn mask_mut(&mut self) -> Option<&mut MaskLayer> {
        if self.phase == EditorPhase::Ready && self.mode == EditMode::Erase {
            Some(&mut self.mask)
        } else {
            None
        }
    }

    pub fn can_undo(&self) -> bool {
        self.phase == EditorPhase::Ready && self.current_index > 0
    }

    /// Step back one history entry and drop the mask. No-op at index 0.
    pub fn undo(&mut self) -> bool {
        if !self.can_undo() {
            return false;
        }
        self.current_index -= 1;
        self.mask.clear();
        true
    }

    /// Prepare an edit request and enter Processing.
    ///
    /// Erase mode composites the mask onto the current image at native
    /// resolution; stage mode sends the image as-is and requires a
    /// non-empty instruction. Either way the outgoing image is downscaled
    /// for the collaborator before it leaves the session.
    pub fn begin_apply(&mut self) -> Result<EditRequest> {
        match self.phase {
            EditorPhase::Processing => return Err(Error::EditInProgress),
            EditorPhase::Ready => {}
        }

        let (image, instruction) = match self.mode {
            EditMode::Erase => {
                let image = if self.mask.is_empty() {
                    self.current_image().to_string()
                } else {
                    self.composite_with_mask()?
                };
                let prompt = self.prompt.trim();
                let instruction = if prompt.is_empty() {
                    DEFAULT_ERASE_INSTRUCTION.to_string()
                } else {
                    format!("Remove {}.", prompt)
                };
                (image, instruction)
            }
            EditMode::Stage => {
                let prompt = self.prompt.trim();
                if prompt.is_empty() {
                    return Err(Error::InvalidState {
                        operation: "stage".to_string(),
                        state: "empty instruction".to_string(),
                    });
                }
                (
                    self.current_image().to_string(),
                    format!("Add {}. Realistic shadows and light.", prompt),
                )
            }
        };

        self.phase = EditorPhase::Processing;
        Ok(EditRequest {
            // The collaborator never needs full native resolution
            image: compositor::resize_for_ai(&image, compositor::AI_MAX_WIDTH),
            instruction,
            mode: self.mode,
        })
    }

    /// Fold the collaborator's outcome back into the session.
    ///
    /// Success truncates any undone future, appends the result and clears
    /// the mask and prompt. Failure leaves history untouched and is
    /// propagated for the UI to surface.
    pub fn complete_apply(&mut self, outcome: Result<String>) -> Result<()> {
        if self.phase != EditorPhase::Processing {
            return Err(Error::InvalidState {
                operation: "complete_apply".to_string(),
                state: "not processing".to_string(),
            });
        }
        self.phase = EditorPhase::Ready;

        let result = outcome?;

        self.history.truncate(self.current_index + 1);
        self.history.push(result);
        self.current_index = self.history.len() - 1;
        self.mask.clear();
        self.prompt.clear();
        Ok(())
    }

    /// Run one full edit cycle against the collaborator.
    pub async fn apply(&mut self, service: &dyn PhotoEditorService) -> Result<()> {
        let request = self.begin_apply()?;
        let outcome = service
            .edit(&request.image, &request.instruction, request.mode)
            .await;
        self.complete_apply(outcome)
    }

    /// Persist the current image as the photo's new url with a refreshed
    /// timestamp. `original_url` is never touched.
    pub async fn save(&mut self, store: &dyn PhotoStore) -> Result<Photo> {
        if self.phase != EditorPhase::Ready {
            return Err(Error::EditInProgress);
        }

        let updated = self.photo.with_saved_url(self.current_image().to_string());
        let stored = store.on_photo_saved(&updated).await?;
        self.photo = stored.clone();
        Ok(stored)
    }

    /// Draw the mask over the current image at native resolution and
    /// encode the composite for the edit collaborator.
    fn composite_with_mask(&self) -> Result<String> {
        let base = compositor::load_image(self.current_image())?;
        let mask_raster = self.mask.render_scaled(base.width(), base.height());

        let composed = compositor::composite_layers(
            &base,
            &[Layer {
                raster: &mask_raster,
                x: 0.0,
                y: 0.0,
                width: base.width() as f32,
                height: base.height() as f32,
                alpha: 1.0,
            }],
        );

        compositor::encode_jpeg(&composed, compositor::QUALITY_MASK_COMPOSITE)
    }
}
