//! Highlight node tree
//!
//! Rule files describe an outline: categories at the top, the tags that
//! belong to each category underneath. The tree stores that outline in an
//! arena of nodes addressed by [`NodeId`]. Children and next-siblings are
//! owned through the arena, the parent link is a plain index used only for
//! navigation.

use std::io::{self, Write};

/// Index of a node inside a [`HighlightTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    tag: String,
    value: Option<String>,
    parent: Option<NodeId>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

/// Tree of tag/value pairs read from one rule file
///
/// The root node carries no tag; its children are the rule categories.
#[derive(Debug, Clone)]
pub struct HighlightTree {
    name: String,
    nodes: Vec<NodeData>,
}

impl HighlightTree {
    /// Create a tree holding only the root node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: vec![NodeData {
                tag: String::new(),
                value: None,
                parent: None,
                first_child: None,
                next_sibling: None,
            }],
        }
    }

    /// Name of the tree, normally the language it describes
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes, including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[0].first_child.is_none()
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.nodes[id.index()].tag
    }

    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.nodes[id.index()].value.as_deref()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].first_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].next_sibling
    }

    /// Last node of the sibling chain starting at `id`
    pub fn last_sibling(&self, id: NodeId) -> NodeId {
        let mut node = id;
        while let Some(next) = self.next_sibling(node) {
            node = next;
        }
        node
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.first_child(id).map(|child| self.last_sibling(child))
    }

    /// Iterate the direct children of `id` in insertion order
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.first_child(id),
        }
    }

    fn push(&mut self, tag: &str, value: Option<&str>, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData {
            tag: resolve_escapes(tag),
            value: value.map(resolve_escapes).filter(|v| !v.is_empty()),
            parent,
            first_child: None,
            next_sibling: None,
        });
        id
    }

    /// Append a child at the tail of `parent`'s child list
    pub fn add_child(&mut self, parent: NodeId, tag: &str, value: Option<&str>) -> NodeId {
        let tail = self.last_child(parent);
        let id = self.push(tag, value, Some(parent));
        match tail {
            Some(last) => self.nodes[last.index()].next_sibling = Some(id),
            None => self.nodes[parent.index()].first_child = Some(id),
        }
        id
    }

    /// Append a sibling at the tail of `node`'s sibling chain
    pub fn add_sibling(&mut self, node: NodeId, tag: &str, value: Option<&str>) -> NodeId {
        let last = self.last_sibling(node);
        let parent = self.parent(last);
        let id = self.push(tag, value, parent);
        self.nodes[last.index()].next_sibling = Some(id);
        id
    }

    /// Install a new node as `parent`'s first child without walking the list
    ///
    /// Any previous child chain becomes unreachable. Only valid while the
    /// caller is extending the frontier of an empty child list.
    pub fn direct_add_child(&mut self, parent: NodeId, tag: &str, value: Option<&str>) -> NodeId {
        let id = self.push(tag, value, Some(parent));
        self.nodes[parent.index()].first_child = Some(id);
        id
    }

    /// Install a new node as `node`'s next sibling without walking the chain
    ///
    /// Only valid when `node` is the current tail of its chain.
    pub fn direct_add_sibling(&mut self, node: NodeId, tag: &str, value: Option<&str>) -> NodeId {
        let parent = self.parent(node);
        let id = self.push(tag, value, parent);
        self.nodes[node.index()].next_sibling = Some(id);
        id
    }

    /// Exact-match search along the sibling chain starting at `from`
    pub fn seek_sibling(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        let mut node = Some(from);
        while let Some(id) = node {
            if self.tag(id) == tag {
                return Some(id);
            }
            node = self.next_sibling(id);
        }
        None
    }

    /// Exact-match search among the children of `id`
    pub fn seek_child(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.first_child(id)
            .and_then(|child| self.seek_sibling(child, tag))
    }

    /// Fold a node's tag to ASCII lower case
    ///
    /// Values are left alone since they name markup classes.
    pub fn fold_tag_case(&mut self, id: NodeId) {
        self.nodes[id.index()].tag.make_ascii_lowercase();
    }

    /// Write the tree as an indented outline, one quoted node per line
    pub fn write_outline<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "/")?;
        self.write_level(out, self.first_child(self.root()), 1)
    }

    fn write_level<W: Write>(&self, out: &mut W, first: Option<NodeId>, level: usize) -> io::Result<()> {
        let mut node = first;
        while let Some(id) = node {
            write!(out, "{:width$}\"{}\"", "", self.tag(id), width = level * 3)?;
            match self.value(id) {
                Some(value) => writeln!(out, ": \"{}\"", value)?,
                None => writeln!(out)?,
            }
            self.write_level(out, self.first_child(id), level + 1)?;
            node = self.next_sibling(id);
        }
        Ok(())
    }
}

/// Iterator over a sibling chain
pub struct Siblings<'a> {
    tree: &'a HighlightTree,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.next?;
        self.next = self.tree.next_sibling(id);
        Some(id)
    }
}

/// Resolve backslash escapes in rule text
///
/// `\X` yields `X` literally. The control escapes `\n`, `\r` and `\t` keep
/// their backslash so they survive as two characters. A trailing lone
/// backslash is kept.
pub fn resolve_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('n' | 'r' | 't')) => {
                out.push('\\');
                out.push(escaped);
            }
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}
