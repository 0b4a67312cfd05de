//! Structural similarity inference.
//!
//! Two independent questions are answered here:
//!
//! - given a few exemplars, which siblings look like "more of the same"
//!   ([`suggestions_for`]);
//! - given a target the user picked inside one exemplar, which descendant of
//!   another exemplar plays the same role ([`find_analogue`]).
//!
//! Both are pure functions of the document.

use tracing::debug;

use crate::config::ScoringWeights;
use crate::element::Document;

/// Same-tag children of the exemplars' common parent, minus the exemplars.
///
/// Returns nothing unless every exemplar has the same parent and the same
/// tag. No ranking beyond document order.
pub fn suggestions_for<D: Document>(doc: &D, elements: &[D::Id]) -> Vec<D::Id> {
    let Some(first) = elements.first().copied() else {
        return Vec::new();
    };
    let Some(parent) = doc.parent(first) else {
        return Vec::new();
    };
    let Some(tag) = doc.tag(first) else {
        return Vec::new();
    };

    let parents: Vec<_> = elements.iter().map(|e| doc.parent(*e)).collect();
    let tags: Vec<_> = elements.iter().map(|e| doc.tag(*e)).collect();
    if !all_equal(&parents) || !all_equal(&tags) {
        debug!(
            exemplars = elements.len(),
            "exemplars do not share a parent and tag, no suggestions"
        );
        return Vec::new();
    }

    let suggestions: Vec<_> = doc
        .children_matching_tag(parent, tag)
        .into_iter()
        .filter(|child| !elements.contains(child))
        .collect();
    debug!(tag, count = suggestions.len(), "suggested siblings");
    suggestions
}

/// Similarity of `candidate` to `reference` under `weights`.
pub fn similarity_score<D: Document>(
    doc: &D,
    candidate: D::Id,
    reference: D::Id,
    weights: &ScoringWeights,
) -> u32 {
    let reference_classes = doc.classes(reference);
    let shared = doc
        .classes(candidate)
        .iter()
        .filter(|c| reference_classes.contains(c))
        .count() as u32;

    let same_text = doc.text_content(candidate) == doc.text_content(reference);

    let candidate_parent_tag = doc.parent(candidate).and_then(|p| doc.tag(p));
    let reference_parent_tag = doc.parent(reference).and_then(|p| doc.tag(p));
    let same_parent_tag = candidate_parent_tag.is_some() && candidate_parent_tag == reference_parent_tag;

    // configured weights may be arbitrarily large
    weights
        .class_overlap
        .saturating_mul(shared)
        .saturating_add(if same_text { weights.text_match } else { 0 })
        .saturating_add(if same_parent_tag { weights.parent_tag } else { 0 })
}

/// Descendant of `container` most similar to `reference`, if similar enough.
///
/// Only descendants sharing the reference's tag are considered. Ties keep the
/// first candidate in document order. A best score that does not exceed
/// `weights.threshold` yields `None`.
pub fn find_analogue<D: Document>(
    doc: &D,
    container: D::Id,
    reference: D::Id,
    weights: &ScoringWeights,
) -> Option<D::Id> {
    let tag = doc.tag(reference)?;
    let mut best: Option<(D::Id, u32)> = None;
    for candidate in doc.descendants_matching_tag(container, tag) {
        let score = similarity_score(doc, candidate, reference, weights);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((candidate, score));
        }
    }

    match best {
        Some((candidate, score)) if score > weights.threshold => {
            debug!(?container, ?candidate, score, "analogue found");
            Some(candidate)
        }
        Some((_, score)) => {
            debug!(?container, score, threshold = weights.threshold, "best candidate below threshold");
            None
        }
        None => {
            debug!(?container, tag, "no candidate with the target's tag");
            None
        }
    }
}

fn all_equal<T: PartialEq>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] == w[1])
}
