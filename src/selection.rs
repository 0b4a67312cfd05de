//! Scratch state for the task being recorded: which list elements are
//! picked, which are suggested, and where the action lands.

use std::fmt::Debug;
use std::hash::Hash;

use tracing::debug;

use crate::config::ScoringWeights;
use crate::element::Document;
use crate::marker::{self, Marker, Renderer};
use crate::matcher;

/// Exemplars and suggestions. The two lists never share an element.
#[derive(Debug, Clone)]
pub struct SelectionSet<Id> {
    selected: Vec<Id>,
    suggested: Vec<Id>,
}

impl<Id> Default for SelectionSet<Id> {
    fn default() -> Self {
        Self {
            selected: Vec::new(),
            suggested: Vec::new(),
        }
    }
}

impl<Id: Copy + Eq + Hash + Debug> SelectionSet<Id> {
    pub fn selected(&self) -> &[Id] {
        &self.selected
    }

    pub fn suggested(&self) -> &[Id] {
        &self.suggested
    }

    pub fn is_selected(&self, id: Id) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_suggested(&self, id: Id) -> bool {
        self.suggested.contains(&id)
    }

    pub fn total_elements(&self) -> usize {
        self.selected.len() + self.suggested.len()
    }

    /// Add `id` to the exemplars.
    ///
    /// Structural anchors and already selected elements are ignored. A
    /// suggested element is promoted. From two exemplars on, suggestions are
    /// recomputed from scratch.
    pub fn select_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id) -> bool
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        if doc.is_structural_anchor(id) || !doc.contains(id) {
            debug!(?id, "ignoring structural element");
            return false;
        }
        if self.is_selected(id) {
            return false;
        }
        if self.is_suggested(id) {
            self.suggested.retain(|s| *s != id);
            renderer.remove_markers(id, marker::SUGGESTED);
        }

        renderer.apply_markers(id, marker::SELECTED);
        self.selected.push(id);
        self.refresh_suggestions(doc, renderer);
        true
    }

    /// Remove `id` from the exemplars and refresh suggestions.
    pub fn deselect_element<D, R>(&mut self, doc: &D, renderer: &mut R, id: Id) -> bool
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        let before = self.selected.len();
        self.selected.retain(|s| *s != id);
        if self.selected.len() == before {
            return false;
        }
        renderer.remove_markers(id, &Marker::ALL);
        self.refresh_suggestions(doc, renderer);
        true
    }

    /// Accept every suggestion as an exemplar.
    pub fn move_suggestions_into_selection<R>(&mut self, renderer: &mut R)
    where
        R: Renderer<Id> + ?Sized,
    {
        for id in self.suggested.drain(..) {
            renderer.remove_markers(id, marker::SUGGESTED);
            renderer.apply_markers(id, marker::SELECTED);
            self.selected.push(id);
        }
    }

    /// Exemplars become clickable so a target can be picked inside them.
    pub fn arm_for_targeting<R>(&self, renderer: &mut R)
    where
        R: Renderer<Id> + ?Sized,
    {
        for id in self.selected.iter().chain(&self.suggested) {
            renderer.remove_markers(*id, &[Marker::NotClickable]);
        }
    }

    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: Renderer<Id> + ?Sized,
    {
        for id in self.selected.drain(..).chain(self.suggested.drain(..)) {
            renderer.remove_markers(id, &Marker::ALL);
        }
    }

    fn refresh_suggestions<D, R>(&mut self, doc: &D, renderer: &mut R)
    where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        for id in self.suggested.drain(..) {
            renderer.remove_markers(id, marker::SUGGESTED);
        }
        if self.selected.len() < 2 {
            return;
        }
        self.suggested = matcher::suggestions_for(doc, &self.selected);
        for id in &self.suggested {
            renderer.apply_markers(*id, marker::SUGGESTED);
        }
    }
}

/// The picked target plus its inferred counterparts in the other exemplars.
#[derive(Debug, Clone)]
pub struct TargetBinding<Id> {
    target: Option<Id>,
    loop_targets: Vec<Id>,
}

impl<Id> Default for TargetBinding<Id> {
    fn default() -> Self {
        Self {
            target: None,
            loop_targets: Vec::new(),
        }
    }
}

impl<Id: Copy + Eq + Hash + Debug> TargetBinding<Id> {
    pub fn target(&self) -> Option<Id> {
        self.target
    }

    pub fn loop_targets(&self) -> &[Id] {
        &self.loop_targets
    }

    /// Target first, then loop targets.
    pub fn all_targets(&self) -> Vec<Id> {
        self.target.into_iter().chain(self.loop_targets.iter().copied()).collect()
    }

    /// Point the action at `target` and generalize it across `exemplars`.
    ///
    /// The exemplar holding `target` is skipped. Exemplars without a close
    /// enough analogue simply contribute nothing.
    pub fn bind<D, R>(
        &mut self,
        doc: &D,
        renderer: &mut R,
        target: Id,
        exemplars: &[Id],
        weights: &ScoringWeights,
    ) where
        D: Document<Id = Id>,
        R: Renderer<Id> + ?Sized,
    {
        self.clear(renderer);

        self.target = Some(target);
        renderer.apply_markers(target, &[Marker::ActionTarget]);

        for exemplar in exemplars {
            if doc.is_within(target, *exemplar) {
                continue;
            }
            let Some(analogue) = matcher::find_analogue(doc, *exemplar, target, weights) else {
                continue;
            };
            if analogue == target || self.loop_targets.contains(&analogue) {
                continue;
            }
            renderer.apply_markers(analogue, &[Marker::LoopTarget]);
            self.loop_targets.push(analogue);
        }
        debug!(
            ?target,
            exemplars = exemplars.len(),
            matched = self.loop_targets.len(),
            "bound action target"
        );
    }

    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: Renderer<Id> + ?Sized,
    {
        if let Some(target) = self.target.take() {
            renderer.remove_markers(target, &[Marker::ActionTarget]);
        }
        for id in self.loop_targets.drain(..) {
            renderer.remove_markers(id, &[Marker::LoopTarget]);
        }
    }
}
