// WHY: the flat heading sequence becomes a tree by rolling children up from the
// bottom, so each parent sees its complete child list the moment it is reached

use std::collections::BTreeMap;

use serde::Serialize;

use super::abstracts::AbstractId;
use super::headings::{CrossReference, HeadingLine, HeadingVariant};
use super::intervals::{Interval, IntervalIndex, LineKeyed};
use crate::diagnostics::{Diagnostics, Issue};
use crate::source::LineNum;

/// Index of a node in the heading arena
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl From<NodeId> for usize {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Governing heading of an abstract: arena index plus slug path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeadingRef {
    pub node: NodeId,
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadingNode {
    pub id: NodeId,
    pub variant: HeadingVariant,
    pub text: String,
    pub slug: String,
    pub path: String,
    pub start_line: LineNum,
    /// Start of the next node at the same or a shallower level
    pub end_line: Option<LineNum>,
    /// Start of the next node at any level
    pub direct_end_line: Option<LineNum>,
    pub depth: usize,
    pub parent: Option<NodeId>,
    pub parents: Vec<String>,
    pub children: Vec<NodeId>,
    pub abstracts: Vec<AbstractId>,
    pub see_also: Vec<CrossReference>,
    pub source_page: Option<u32>,
    pub editorial: bool,
}

impl HeadingNode {
    fn from_line(id: NodeId, line: &HeadingLine) -> Self {
        Self {
            id,
            variant: line.variant,
            text: line.text.clone(),
            slug: line.slug.clone(),
            path: line.slug.clone(),
            start_line: line.start_line,
            end_line: None,
            direct_end_line: None,
            depth: 0,
            parent: None,
            parents: Vec::new(),
            children: Vec::new(),
            abstracts: Vec::new(),
            see_also: Vec::new(),
            source_page: None,
            editorial: line.editorial,
        }
    }
}

impl LineKeyed for HeadingNode {
    fn line_num(&self) -> LineNum {
        self.start_line
    }
}

/// Arena of heading nodes in source-line order
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeadingTree {
    nodes: Vec<HeadingNode>,
    roots: Vec<NodeId>,
}

impl HeadingTree {
    pub fn node(&self, id: NodeId) -> &HeadingNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&HeadingNode> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut HeadingNode {
        &mut self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[HeadingNode] {
        &self.nodes
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut [HeadingNode] {
        &mut self.nodes
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level nodes keyed by their start line
    pub fn roots_by_start_line(&self) -> BTreeMap<LineNum, NodeId> {
        self.roots
            .iter()
            .map(|&id| (self.node(id).start_line, id))
            .collect()
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &HeadingNode> {
        self.node(id).children.iter().map(move |&child| self.node(child))
    }

    pub fn find_root(&self, slug: &str) -> Option<&HeadingNode> {
        self.roots
            .iter()
            .map(|&id| self.node(id))
            .find(|node| node.slug == slug)
    }

    pub fn find_child(&self, parent: NodeId, slug: &str) -> Option<&HeadingNode> {
        self.children(parent).find(|node| node.slug == slug)
    }

    /// Walk a `heading/sub/sub` slug path from the roots
    pub fn find_path(&self, path: &str) -> Option<&HeadingNode> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let mut node = self.find_root(segments.next()?)?;
        for segment in segments {
            node = self.find_child(node.id, segment)?;
        }
        Some(node)
    }

    /// Abstracts directly under a node plus those of all its descendants
    pub fn all_abstracts(&self, id: NodeId) -> Vec<AbstractId> {
        let mut collected = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            collected.extend(node.abstracts.iter().copied());
            stack.extend(node.children.iter().rev().copied());
        }
        collected.sort();
        collected
    }

    pub fn count(&self, variant: HeadingVariant) -> usize {
        self.nodes.iter().filter(|n| n.variant == variant).count()
    }

    /// Exclusive association intervals: each node owns the lines up to the
    /// next node at any level
    pub fn heading_intervals(&self) -> IntervalIndex<HeadingRef> {
        IntervalIndex::from_intervals(
            self.nodes
                .iter()
                .map(|node| Interval {
                    start: node.start_line,
                    end: node.direct_end_line,
                    payload: HeadingRef {
                        node: node.id,
                        path: node.path.clone(),
                    },
                })
                .collect(),
        )
    }
}

#[derive(Debug, Default)]
pub struct NestOutcome {
    pub tree: HeadingTree,
    pub diagnostics: Diagnostics,
}

/// Build the heading tree from classified lines in source order
///
/// Only the three structural variants become nodes. Cross-reference lines
/// take part in sequence validation but never break an interval.
pub fn nest(lines: &[HeadingLine]) -> NestOutcome {
    let mut diagnostics = Diagnostics::new();
    validate_sequence(lines, &mut diagnostics);

    let mut structural: Vec<&HeadingLine> = lines.iter().filter(|l| l.variant.is_structural()).collect();
    structural.sort_by_key(|line| line.start_line);

    let mut nodes: Vec<HeadingNode> = structural
        .iter()
        .enumerate()
        .map(|(index, line)| HeadingNode::from_line(NodeId(index), line))
        .collect();

    let mut sub2_buffer: Vec<NodeId> = Vec::new();
    let mut sub1_buffer: Vec<NodeId> = Vec::new();
    let mut roots: Vec<NodeId> = Vec::new();

    for index in (0..nodes.len()).rev() {
        let id = NodeId(index);
        match nodes[index].variant {
            HeadingVariant::Subheading2 => sub2_buffer.push(id),
            HeadingVariant::Subheading1 => {
                let children = drain_forward(&mut sub2_buffer);
                adopt(&mut nodes, id, children);
                sub1_buffer.push(id);
            }
            _ => {
                // sub2s met before any sub1 hang directly off the heading
                let mut children = drain_forward(&mut sub2_buffer);
                children.extend(drain_forward(&mut sub1_buffer));
                adopt(&mut nodes, id, children);
                roots.push(id);
            }
        }
    }
    // anything left preceded the first heading and stays top-level
    roots.extend(sub2_buffer);
    roots.extend(sub1_buffer);
    roots.sort();

    for index in 0..nodes.len() {
        nodes[index].direct_end_line = nodes.get(index + 1).map(|next| next.start_line);
    }
    assign_paths(&mut nodes, &roots);
    assign_end_lines(&mut nodes, &roots);

    NestOutcome {
        tree: HeadingTree { nodes, roots },
        diagnostics,
    }
}

fn drain_forward(buffer: &mut Vec<NodeId>) -> Vec<NodeId> {
    buffer.drain(..).rev().collect()
}

fn adopt(nodes: &mut [HeadingNode], parent: NodeId, children: Vec<NodeId>) {
    for child in &children {
        nodes[child.0].parent = Some(parent);
    }
    nodes[parent.0].children = children;
}

fn assign_paths(nodes: &mut [HeadingNode], roots: &[NodeId]) {
    let mut stack: Vec<(NodeId, usize)> = roots.iter().rev().map(|&id| (id, 0)).collect();
    while let Some((id, depth)) = stack.pop() {
        let (parents, path) = match nodes[id.0].parent {
            Some(parent) => {
                let parent = &nodes[parent.0];
                let mut parents = parent.parents.clone();
                parents.push(parent.text.clone());
                (parents, format!("{}/{}", parent.path, nodes[id.0].slug))
            }
            None => (Vec::new(), nodes[id.0].slug.clone()),
        };
        let node = &mut nodes[id.0];
        node.depth = depth;
        node.parents = parents;
        node.path = path;
        stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
    }
}

fn assign_end_lines(nodes: &mut [HeadingNode], roots: &[NodeId]) {
    let mut pending: Vec<(Vec<NodeId>, Option<LineNum>)> = vec![(roots.to_vec(), None)];
    while let Some((siblings, inherited)) = pending.pop() {
        for (position, &id) in siblings.iter().enumerate() {
            let end = siblings
                .get(position + 1)
                .map(|next| nodes[next.0].start_line)
                .or(inherited);
            nodes[id.0].end_line = end;
            if !nodes[id.0].children.is_empty() {
                pending.push((nodes[id.0].children.clone(), end));
            }
        }
    }
}

fn validate_sequence(lines: &[HeadingLine], diagnostics: &mut Diagnostics) {
    let sequence: Vec<&HeadingLine> = lines
        .iter()
        .filter(|l| l.variant.is_structural() || l.variant == HeadingVariant::See)
        .collect();

    if let Some(first) = sequence.first() {
        if !matches!(first.variant, HeadingVariant::Heading | HeadingVariant::See) {
            diagnostics.record(
                first.start_line,
                first.raw.clone(),
                Issue::HeadingSequence {
                    detail: format!("first heading entry is {:?}, not a top-level heading", first.variant),
                },
            );
        }
    }

    for pair in sequence.windows(2) {
        if pair[0].variant == HeadingVariant::Heading && pair[1].variant == HeadingVariant::Subheading2 {
            diagnostics.record(
                pair[1].start_line,
                pair[1].raw.clone(),
                Issue::HeadingSequence {
                    detail: format!("second-level subheading directly under heading {:?}", pair[0].text),
                },
            );
        }
    }
}
