//! Drag-and-drop controller.
//!
//! Owns the in-memory section sequence of the open page and the descriptor of the
//! drag gesture in progress. Every mutation installs a fresh `Arc<[Section]>`, so
//! observers detect change with `Arc::ptr_eq`; no-ops keep the current value.

use std::sync::Arc;

use crate::{
    models::{Section, SectionId, SectionKind, SectionPatch},
    permissions::{Capabilities, Permission},
};

/// Pointer travel (in px) required before a press turns into a drag.
pub const DRAG_ACTIVATION_DISTANCE: f32 = 8.0;

/// DragSource
///
/// What is being dragged: a palette entry that creates a new section, or an
/// existing section on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    Palette(SectionKind),
    Existing(SectionId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerPosition {
    pub x: f32,
    pub y: f32,
}

impl PointerPosition {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn distance_to(&self, other: PointerPosition) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// ActiveDrag
///
/// Descriptor of the gesture in progress. Cleared when the gesture ends.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub source: DragSource,
    pub origin: PointerPosition,
    pub activated: bool,
    pub over: Option<SectionId>,
}

/// DragOutcome
///
/// Result of resolving a drag completion against the sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Inserted { id: SectionId },
    Moved { id: SectionId, from: usize, to: usize },
    Denied(Permission),
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct DragController {
    sections: Arc<[Section]>,
    active: Option<ActiveDrag>,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DragController {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            sections: Arc::from(sections),
            active: None,
        }
    }

    /// The current sequence. Clone the `Arc` to keep a snapshot for change detection.
    pub fn sections(&self) -> &Arc<[Section]> {
        &self.sections
    }

    pub fn active_drag(&self) -> Option<&ActiveDrag> {
        self.active.as_ref()
    }

    /// Replaces the whole sequence. Used at load boundaries only.
    pub fn replace(&mut self, sections: Vec<Section>) {
        self.active = None;
        self.sections = Arc::from(sections);
    }

    // --- Gesture tracking ---

    pub fn begin_drag(&mut self, source: DragSource, origin: PointerPosition) {
        tracing::debug!(?source, "drag pending");
        self.active = Some(ActiveDrag {
            source,
            origin,
            activated: false,
            over: None,
        });
    }

    /// drag_move
    ///
    /// Activates the pending drag once the pointer has travelled at least
    /// `DRAG_ACTIVATION_DISTANCE`. Returns whether a drag is active.
    pub fn drag_move(&mut self, position: PointerPosition) -> bool {
        match self.active.as_mut() {
            Some(drag) => {
                if !drag.activated && drag.origin.distance_to(position) >= DRAG_ACTIVATION_DISTANCE
                {
                    drag.activated = true;
                }
                drag.activated
            }
            None => false,
        }
    }

    pub fn drag_over(&mut self, target: Option<SectionId>) {
        if let Some(drag) = self.active.as_mut() {
            drag.over = target;
        }
    }

    pub fn cancel_drag(&mut self) {
        self.active = None;
    }

    /// end_drag
    ///
    /// Ends the gesture. A press that never passed the activation distance is a
    /// click and leaves the sequence untouched.
    pub fn end_drag(&mut self, capabilities: &Capabilities) -> DragOutcome {
        match self.active.take() {
            Some(drag) if drag.activated => {
                self.complete_drag(&drag.source, drag.over.as_ref(), capabilities)
            }
            _ => DragOutcome::Unchanged,
        }
    }

    // --- Sequence mutations ---

    /// complete_drag
    ///
    /// Palette sources append a new default section (CREATE required, target ignored).
    /// Existing sources move to the target's current index; unknown or equal ids are
    /// no-ops.
    pub fn complete_drag(
        &mut self,
        source: &DragSource,
        target: Option<&SectionId>,
        capabilities: &Capabilities,
    ) -> DragOutcome {
        let outcome = match source {
            DragSource::Palette(kind) => {
                if !capabilities.can_create {
                    DragOutcome::Denied(Permission::Create)
                } else {
                    self.insert(*kind)
                }
            }
            DragSource::Existing(id) => match target {
                Some(target) => self.reorder(id, target),
                None => DragOutcome::Unchanged,
            },
        };
        tracing::debug!(?outcome, "drag completed");
        outcome
    }

    fn insert(&mut self, kind: SectionKind) -> DragOutcome {
        let id = self.fresh_id();
        let mut next = self.sections.to_vec();
        next.push(Section::with_defaults(kind, id.clone()));
        self.sections = Arc::from(next);
        DragOutcome::Inserted { id }
    }

    fn reorder(&mut self, source: &SectionId, target: &SectionId) -> DragOutcome {
        if source == target {
            return DragOutcome::Unchanged;
        }
        let (Some(from), Some(to)) = (self.position(source), self.position(target)) else {
            return DragOutcome::Unchanged;
        };

        let mut next = self.sections.to_vec();
        let moved = next.remove(from);
        next.insert(to, moved);
        self.sections = Arc::from(next);

        DragOutcome::Moved {
            id: source.clone(),
            from,
            to,
        }
    }

    /// Merges `patch` into the section with `id`. Returns whether anything changed.
    pub fn update_section(&mut self, id: &SectionId, patch: &SectionPatch) -> bool {
        let Some(index) = self.position(id) else {
            return false;
        };
        let updated = self.sections[index].patched(patch);
        if updated == self.sections[index] {
            return false;
        }

        let mut next = self.sections.to_vec();
        next[index] = updated;
        self.sections = Arc::from(next);
        true
    }

    /// Removes the section with `id`. Returns whether it existed.
    pub fn delete_section(&mut self, id: &SectionId) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        let next: Vec<Section> = self
            .sections
            .iter()
            .filter(|section| section.id() != id)
            .cloned()
            .collect();
        self.sections = Arc::from(next);
        true
    }

    fn position(&self, id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|section| section.id() == id)
    }

    fn fresh_id(&self) -> SectionId {
        loop {
            let id = SectionId::generate();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }
}
