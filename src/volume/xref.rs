// WHY: cross-references are resolved only after the whole tree exists, since a
// "See" may point forward to a heading that has not been read yet

use serde::Serialize;
use tracing::debug;

use super::abstracts::{Abstract, AbstractCollection, AbstractId, Metadata};
use super::headings::{CrossReference, HeadingLine, HeadingTarget, HeadingVariant};
use super::intervals::IntervalIndex;
use super::nesting::{HeadingNode, HeadingRef, HeadingTree, NodeId};
use crate::diagnostics::{Diagnostics, Issue};
use crate::source::LineNum;

/// Parsed SeeAbstract metadata and what it resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Placeholder {
    pub metadata: Metadata,
    pub matches: Vec<AbstractId>,
    pub synthetic_id: Option<AbstractId>,
}

/// A See, SeeAlso or SeeAbstract line with its resolution state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrossReferenceEntry {
    pub start_line: LineNum,
    pub variant: HeadingVariant,
    pub text: String,
    pub slug: String,
    pub targets: Vec<CrossReference>,
    pub attached_to: Option<NodeId>,
    pub placeholder: Option<Placeholder>,
}

impl CrossReferenceEntry {
    /// None for lines that are not cross-references
    pub fn from_line(line: &HeadingLine) -> Option<Self> {
        if !line.variant.is_cross_reference() {
            return None;
        }
        Some(Self {
            start_line: line.start_line,
            variant: line.variant,
            text: line.text.clone(),
            slug: line.slug.clone(),
            targets: line.targets.clone(),
            attached_to: None,
            placeholder: line.placeholder.clone().map(|metadata| Placeholder {
                metadata,
                matches: Vec::new(),
                synthetic_id: None,
            }),
        })
    }

    pub fn is_resolved(&self) -> bool {
        let targets_resolved = self
            .targets
            .iter()
            .filter_map(CrossReference::structural)
            .all(|target| target.resolved_path.is_some());
        let placeholder_resolved = self.placeholder.as_ref().map_or(true, |p| !p.matches.is_empty());
        targets_resolved && placeholder_resolved
    }
}

/// Read-only view over the finished tree and abstracts
pub struct CrossReferenceResolver<'a> {
    tree: &'a HeadingTree,
    abstracts: &'a AbstractCollection,
    headings: &'a IntervalIndex<HeadingRef>,
}

impl<'a> CrossReferenceResolver<'a> {
    pub fn new(
        tree: &'a HeadingTree,
        abstracts: &'a AbstractCollection,
        headings: &'a IntervalIndex<HeadingRef>,
    ) -> Self {
        Self {
            tree,
            abstracts,
            headings,
        }
    }

    /// Top-level heading by slug, narrowed to a subheading when one is named
    pub fn target_node(&self, target: &HeadingTarget) -> Option<&'a HeadingNode> {
        let root = self.tree.find_root(&target.heading_slug)?;
        match &target.subheading_slug {
            Some(sub) => self
                .tree
                .children(root.id)
                .find(|node| node.variant == HeadingVariant::Subheading1 && node.slug == *sub),
            None => Some(root),
        }
    }

    /// Parsed abstracts inside a node's extent whose canonical metadata matches
    pub fn matching_abstracts(&self, node: &HeadingNode, normalized: &str) -> Vec<AbstractId> {
        self.abstracts
            .in_lines(node.start_line, node.end_line)
            .filter(|record| !record.synthetic && record.normalized_metadata == normalized)
            .map(|record| record.id)
            .collect()
    }

    pub fn resolve(&self, entry: &mut CrossReferenceEntry, diagnostics: &mut Diagnostics) {
        let mut matches: Vec<AbstractId> = Vec::new();
        let mut reported = false;

        for reference in entry.targets.iter_mut() {
            let CrossReference::Structural(target) = reference else {
                continue;
            };
            match self.target_node(target) {
                Some(node) => {
                    target.resolved_path = Some(node.path.clone());
                    if let Some(placeholder) = &entry.placeholder {
                        matches.extend(self.matching_abstracts(node, &placeholder.metadata.normalized));
                    }
                }
                None => {
                    reported = true;
                    diagnostics.record(
                        entry.start_line,
                        entry.text.clone(),
                        Issue::UnresolvedReference {
                            target: target.text.clone(),
                        },
                    );
                }
            }
        }

        if let Some(placeholder) = entry.placeholder.as_mut() {
            matches.sort();
            matches.dedup();
            if matches.is_empty() && !reported {
                diagnostics.record(
                    entry.start_line,
                    entry.text.clone(),
                    Issue::UnresolvedReference {
                        target: placeholder.metadata.normalized.clone(),
                    },
                );
            }
            debug!(line = entry.start_line, matches = matches.len(), "Resolved SeeAbstract");
            placeholder.matches = matches;
        }

        if entry.variant == HeadingVariant::SeeAlso {
            entry.attached_to = self.headings.find(entry.start_line).map(|interval| interval.payload.node);
            if entry.attached_to.is_none() {
                diagnostics.record(entry.start_line, entry.text.clone(), Issue::OrphanSeeAlso);
            }
        }
    }
}

/// Build the synthetic record standing in for a resolved SeeAbstract line
pub fn materialize(entry: &mut CrossReferenceEntry, abstracts: &AbstractCollection) -> Option<Abstract> {
    let placeholder = entry.placeholder.as_mut()?;
    if placeholder.matches.is_empty() {
        return None;
    }
    let id = abstracts.next_insertion_id(entry.start_line);
    placeholder.synthetic_id = Some(id);

    let mut record = Abstract::from_metadata(
        id,
        entry.start_line,
        placeholder.metadata.clone(),
        vec![entry.text.clone()],
        0,
    );
    record.synthetic = true;
    record.references = placeholder.matches.clone();
    Some(record)
}
