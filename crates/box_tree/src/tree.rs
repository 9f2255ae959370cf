//! Mirrored box tree.
//!
//! The tree is built from incoming [`TreeUpdate`]s sent by the host and then
//! mutated by the layout engine. Every engine-side mutation is journaled as an
//! outgoing `TreeUpdate` so the host can replay it onto the live document.

use crate::BoxKey;
use crate::descriptor::{BoxDescriptor, BoxKind, CollapseState, SectionRole};
use crate::style::InlineStyle;
use anyhow::{Context as _, Error, anyhow, bail};
use core::mem::take;
use log::{debug, trace};
use std::collections::HashMap;

/// A batchable update, exchanged with the host in both directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeUpdate {
    /// A new element under `parent` at child index `pos`.
    InsertElement {
        parent: BoxKey,
        node: BoxKey,
        tag: String,
        pos: usize,
    },
    /// A new text node under `parent` at child index `pos`.
    InsertText {
        parent: BoxKey,
        node: BoxKey,
        text: String,
        pos: usize,
    },
    /// Set an attribute; `style` carries a CSS declaration list.
    SetAttr {
        node: BoxKey,
        name: String,
        value: String,
    },
    /// Remove an attribute.
    RemoveAttr { node: BoxKey, name: String },
    /// Reparent an existing node under `parent` at child index `pos`.
    MoveNode {
        node: BoxKey,
        parent: BoxKey,
        pos: usize,
    },
    /// Replace the text content of a node.
    SetText { node: BoxKey, text: String },
    /// Remove a node and its subtree.
    RemoveNode { node: BoxKey },
    /// The host finished streaming the initial document.
    EndOfDocument,
}

/// A subscriber that mirrors `TreeUpdate`s into its own state.
pub trait TreeSubscriber {
    /// Apply a single update.
    ///
    /// # Errors
    ///
    /// Returns an error when the update references unknown nodes or carries
    /// malformed marker values.
    fn apply_update(&mut self, update: TreeUpdate) -> Result<(), Error>;

    /// Apply a batch of updates in order.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing update.
    fn apply_updates<I: IntoIterator<Item = TreeUpdate>>(&mut self, updates: I) -> Result<(), Error> {
        for update in updates {
            self.apply_update(update)?;
        }
        Ok(())
    }
}

/// A node of the box tree.
#[derive(Debug, Clone)]
pub struct BoxNode {
    pub kind: BoxKind,
    pub tag: String,
    /// Raw attributes as received (markers are also parsed into `descriptor`).
    pub attrs: HashMap<String, String>,
    pub descriptor: BoxDescriptor,
    pub style: InlineStyle,
    /// Text content for text nodes and engine-written glyphs.
    pub text: Option<String>,
    pub parent: Option<BoxKey>,
    pub children: Vec<BoxKey>,
}

impl BoxNode {
    fn new_document() -> Self {
        Self::new_element(BoxKind::Document, "#document".to_owned())
    }

    fn new_element(kind: BoxKind, tag: String) -> Self {
        Self {
            kind,
            tag,
            attrs: HashMap::new(),
            descriptor: BoxDescriptor::new(),
            style: InlineStyle::default(),
            text: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Attribute value by case-insensitive name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    fn new_text(text: String) -> Self {
        let mut node = Self::new_element(BoxKind::Text, "#text".to_owned());
        node.text = Some(text);
        node
    }
}

/// The box tree mirror.
#[derive(Debug)]
pub struct BoxTree {
    nodes: HashMap<BoxKey, BoxNode>,
    next_minted: u64,
    /// Outgoing updates not yet taken by the host.
    journal: Vec<TreeUpdate>,
}

impl Default for BoxTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxTree {
    /// Create a tree seeded with the document root.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(BoxKey::ROOT, BoxNode::new_document());
        Self {
            nodes,
            next_minted: BoxKey::MINTED_BASE,
            journal: Vec::new(),
        }
    }

    pub const fn root(&self) -> BoxKey {
        BoxKey::ROOT
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds only the root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn contains(&self, key: BoxKey) -> bool {
        self.nodes.contains_key(&key)
    }

    pub fn get(&self, key: BoxKey) -> Option<&BoxNode> {
        self.nodes.get(&key)
    }

    /// Look up a node.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn node(&self, key: BoxKey) -> Result<&BoxNode, Error> {
        self.nodes
            .get(&key)
            .ok_or_else(|| anyhow!("unknown box {key:?}"))
    }

    fn node_mut(&mut self, key: BoxKey) -> Result<&mut BoxNode, Error> {
        self.nodes
            .get_mut(&key)
            .ok_or_else(|| anyhow!("unknown box {key:?}"))
    }

    pub fn kind(&self, key: BoxKey) -> Option<BoxKind> {
        self.nodes.get(&key).map(|node| node.kind)
    }

    pub fn parent(&self, key: BoxKey) -> Option<BoxKey> {
        self.nodes.get(&key).and_then(|node| node.parent)
    }

    /// Children in document order; empty for unknown keys.
    pub fn children(&self, key: BoxKey) -> &[BoxKey] {
        self.nodes
            .get(&key)
            .map_or(&[], |node| node.children.as_slice())
    }

    /// Children of the given kind, in document order.
    pub fn children_of_kind(&self, key: BoxKey, kind: BoxKind) -> Vec<BoxKey> {
        self.children(key)
            .iter()
            .copied()
            .filter(|child| self.kind(*child) == Some(kind))
            .collect()
    }

    /// First section of `role` directly under `grid`.
    pub fn section(&self, grid: BoxKey, role: SectionRole) -> Option<BoxKey> {
        self.children(grid)
            .iter()
            .copied()
            .find(|child| self.kind(*child) == Some(BoxKind::Section(role)))
    }

    /// Rows of a grid, header then body then footer, regardless of child order.
    pub fn grid_rows(&self, grid: BoxKey) -> Vec<BoxKey> {
        let mut rows = Vec::new();
        for role in SectionRole::ALL {
            for section in self.children_of_kind(grid, BoxKind::Section(role)) {
                rows.extend(self.children_of_kind(section, BoxKind::Row));
            }
            if role == SectionRole::Body {
                rows.extend(self.children_of_kind(grid, BoxKind::Row));
            }
        }
        rows
    }

    /// Nearest ancestor (excluding `key`) of the given kind.
    pub fn ancestor_of_kind(&self, key: BoxKey, kind: BoxKind) -> Option<BoxKey> {
        let mut current = self.parent(key);
        while let Some(candidate) = current {
            if self.kind(candidate) == Some(kind) {
                return Some(candidate);
            }
            current = self.parent(candidate);
        }
        None
    }

    /// Whether `ancestor` is a strict ancestor of `key`.
    pub fn is_ancestor(&self, ancestor: BoxKey, key: BoxKey) -> bool {
        let mut current = self.parent(key);
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            current = self.parent(candidate);
        }
        false
    }

    /// Whether the box renders: neither it nor an ancestor is `display: none` or non-rendering.
    pub fn is_displayed(&self, key: BoxKey) -> bool {
        let mut current = Some(key);
        while let Some(candidate) = current {
            let Some(node) = self.nodes.get(&candidate) else {
                return false;
            };
            if node.style.hidden || !node.kind.is_rendered() {
                return false;
            }
            current = node.parent;
        }
        true
    }

    /// Pre-order descendants of `scope`, excluding `scope` itself.
    pub fn descendants(&self, scope: BoxKey) -> Vec<BoxKey> {
        let mut out = Vec::new();
        let mut stack: Vec<BoxKey> = self.children(scope).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            out.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        out
    }

    /// Inline style of a box; default for unknown keys.
    pub fn style(&self, key: BoxKey) -> InlineStyle {
        self.nodes.get(&key).map(|node| node.style).unwrap_or_default()
    }

    /// Mutable access to runtime descriptor fields. Not journaled.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn descriptor_mut(&mut self, key: BoxKey) -> Result<&mut BoxDescriptor, Error> {
        Ok(&mut self.node_mut(key)?.descriptor)
    }

    /// Mint a key in the engine-owned range.
    pub fn mint_key(&mut self) -> BoxKey {
        let key = BoxKey(self.next_minted);
        self.next_minted = self.next_minted.wrapping_add(1);
        key
    }

    /// Drain the outgoing updates recorded since the last call.
    pub fn take_changes(&mut self) -> Vec<TreeUpdate> {
        take(&mut self.journal)
    }

    /// Outgoing updates not yet drained.
    pub fn pending_changes(&self) -> &[TreeUpdate] {
        &self.journal
    }

    // ------------------------------------------------------------------
    // Engine-side mutation (journaled)
    // ------------------------------------------------------------------

    /// Create an element under `parent`, appended or inserted at `pos`.
    ///
    /// # Errors
    ///
    /// Returns an error if `parent` is unknown.
    pub fn create_element(
        &mut self,
        parent: BoxKey,
        pos: Option<usize>,
        tag: &str,
    ) -> Result<BoxKey, Error> {
        self.node(parent)?;
        let node = self.mint_key();
        self.nodes.insert(
            node,
            BoxNode::new_element(BoxKind::from_tag(tag), tag.to_owned()),
        );
        let index = self.attach(parent, node, pos)?;
        self.journal.push(TreeUpdate::InsertElement {
            parent,
            node,
            tag: tag.to_owned(),
            pos: index,
        });
        Ok(node)
    }

    /// Move `node` to the end of `parent`'s children.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or when `parent` lies inside `node`.
    pub fn append_child(&mut self, parent: BoxKey, node: BoxKey) -> Result<(), Error> {
        let pos = self.attach(parent, node, None)?;
        self.journal.push(TreeUpdate::MoveNode { node, parent, pos });
        Ok(())
    }

    /// Move `node` directly before `anchor`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys, a detached anchor, or cycles.
    pub fn insert_before(&mut self, anchor: BoxKey, node: BoxKey) -> Result<(), Error> {
        let parent = self
            .parent(anchor)
            .ok_or_else(|| anyhow!("anchor {anchor:?} has no parent"))?;
        self.detach(node)?;
        let index = self
            .children(parent)
            .iter()
            .position(|child| *child == anchor)
            .ok_or_else(|| anyhow!("anchor {anchor:?} missing from its parent"))?;
        let pos = self.attach(parent, node, Some(index))?;
        self.journal.push(TreeUpdate::MoveNode { node, parent, pos });
        Ok(())
    }

    /// Remove a node and its subtree.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or the root.
    pub fn remove(&mut self, key: BoxKey) -> Result<(), Error> {
        self.remove_subtree(key)?;
        self.journal.push(TreeUpdate::RemoveNode { node: key });
        Ok(())
    }

    /// Set an attribute, updating typed markers.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or malformed marker values.
    pub fn set_attr(&mut self, key: BoxKey, name: &str, value: &str) -> Result<(), Error> {
        self.ingest_attr(key, name.to_owned(), value.to_owned())?;
        self.journal.push(TreeUpdate::SetAttr {
            node: key,
            name: name.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    /// Remove an attribute, forgetting the marker it carried.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn remove_attr(&mut self, key: BoxKey, name: &str) -> Result<(), Error> {
        let node = self.node_mut(key)?;
        node.descriptor.clear_attr(name);
        node.attrs.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
        self.journal.push(TreeUpdate::RemoveAttr {
            node: key,
            name: name.to_owned(),
        });
        Ok(())
    }

    /// Remove and return the `id` of a box so it can be relocated.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn take_id(&mut self, key: BoxKey) -> Result<Option<String>, Error> {
        let node = self.node_mut(key)?;
        let id = node.descriptor.id.take();
        node.attrs.retain(|existing, _| !existing.eq_ignore_ascii_case("id"));
        if id.is_some() {
            self.journal.push(TreeUpdate::RemoveAttr {
                node: key,
                name: "id".to_owned(),
            });
        }
        Ok(id)
    }

    /// Store a row's collapse state.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn set_collapse_state(&mut self, key: BoxKey, state: CollapseState) -> Result<(), Error> {
        self.set_attr(key, "collapseState", state.as_attr())
    }

    /// Replace the text content of a box.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn set_text(&mut self, key: BoxKey, text: &str) -> Result<(), Error> {
        self.node_mut(key)?.text = Some(text.to_owned());
        self.journal.push(TreeUpdate::SetText {
            node: key,
            text: text.to_owned(),
        });
        Ok(())
    }

    /// Edit the inline style of a box, journaling the result if it changed.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn update_style<F: FnOnce(&mut InlineStyle)>(
        &mut self,
        key: BoxKey,
        edit: F,
    ) -> Result<bool, Error> {
        let node = self.node_mut(key)?;
        let before = node.style;
        edit(&mut node.style);
        let after = node.style;
        if before == after {
            return Ok(false);
        }
        trace!("style {key:?}: {after}");
        self.journal.push(TreeUpdate::SetAttr {
            node: key,
            name: "style".to_owned(),
            value: after.to_string(),
        });
        Ok(true)
    }

    /// Toggle `display: none`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys.
    pub fn set_hidden(&mut self, key: BoxKey, hidden: bool) -> Result<bool, Error> {
        self.update_style(key, |style| style.hidden = hidden)
    }

    // ------------------------------------------------------------------
    // Host-side convenience (not journaled)
    // ------------------------------------------------------------------

    /// Append an element with attributes as if the host had streamed it.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown parent or malformed marker values.
    pub fn insert_element(
        &mut self,
        parent: BoxKey,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> Result<BoxKey, Error> {
        let node = self.mint_key();
        let pos = self.children(parent).len();
        self.apply_update(TreeUpdate::InsertElement {
            parent,
            node,
            tag: tag.to_owned(),
            pos,
        })?;
        for (name, value) in attrs {
            self.ingest_attr(node, (*name).to_owned(), (*value).to_owned())?;
        }
        Ok(node)
    }

    /// Append a text node as if the host had streamed it.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown parent.
    pub fn insert_text(&mut self, parent: BoxKey, text: &str) -> Result<BoxKey, Error> {
        let node = self.mint_key();
        let pos = self.children(parent).len();
        self.apply_update(TreeUpdate::InsertText {
            parent,
            node,
            text: text.to_owned(),
            pos,
        })?;
        Ok(node)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ingest_attr(&mut self, key: BoxKey, name: String, value: String) -> Result<(), Error> {
        let node = self.node_mut(key)?;
        node.descriptor
            .apply_attr(&name, &value)
            .with_context(|| format!("attribute {name} on {key:?}"))?;
        node.attrs.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        node.attrs.insert(name, value);
        Ok(())
    }

    /// Attach `node` under `parent`, detaching it first. Returns the child index used.
    fn attach(&mut self, parent: BoxKey, node: BoxKey, pos: Option<usize>) -> Result<usize, Error> {
        if node == parent || self.is_ancestor(node, parent) {
            bail!("cannot move {node:?} under its own descendant {parent:?}");
        }
        self.node(node)?;
        self.detach(node)?;
        let parent_node = self.node_mut(parent)?;
        let len = parent_node.children.len();
        let index = pos.map_or(len, |wanted| wanted.min(len));
        parent_node.children.insert(index, node);
        self.node_mut(node)?.parent = Some(parent);
        Ok(index)
    }

    fn detach(&mut self, node: BoxKey) -> Result<(), Error> {
        let parent = self.node(node)?.parent;
        if let Some(parent_node) = parent.and_then(|key| self.nodes.get_mut(&key)) {
            parent_node.children.retain(|child| *child != node);
        }
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    fn remove_subtree(&mut self, key: BoxKey) -> Result<(), Error> {
        if key == BoxKey::ROOT {
            bail!("the document root cannot be removed");
        }
        self.detach(key)?;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.children);
            }
        }
        Ok(())
    }
}

impl TreeSubscriber for BoxTree {
    fn apply_update(&mut self, update: TreeUpdate) -> Result<(), Error> {
        match update {
            TreeUpdate::InsertElement {
                parent,
                node,
                tag,
                pos,
            } => {
                trace!("InsertElement parent={parent:?} node={node:?} tag={tag} pos={pos}");
                if self.contains(node) {
                    bail!("box {node:?} already exists");
                }
                self.node(parent)?;
                self.nodes
                    .insert(node, BoxNode::new_element(BoxKind::from_tag(&tag), tag));
                self.attach(parent, node, Some(pos))?;
            }
            TreeUpdate::InsertText {
                parent,
                node,
                text,
                pos,
            } => {
                trace!("InsertText parent={parent:?} node={node:?} pos={pos}");
                if self.contains(node) {
                    bail!("box {node:?} already exists");
                }
                self.node(parent)?;
                self.nodes.insert(node, BoxNode::new_text(text));
                self.attach(parent, node, Some(pos))?;
            }
            TreeUpdate::SetAttr { node, name, value } => {
                trace!("SetAttr node={node:?} {name}='{value}'");
                self.ingest_attr(node, name, value)?;
            }
            TreeUpdate::RemoveAttr { node, name } => {
                trace!("RemoveAttr node={node:?} {name}");
                let entry = self.node_mut(node)?;
                entry.descriptor.clear_attr(&name);
                entry.attrs.retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
            }
            TreeUpdate::MoveNode { node, parent, pos } => {
                trace!("MoveNode node={node:?} parent={parent:?} pos={pos}");
                self.attach(parent, node, Some(pos))?;
            }
            TreeUpdate::SetText { node, text } => {
                self.node_mut(node)?.text = Some(text);
            }
            TreeUpdate::RemoveNode { node } => {
                trace!("RemoveNode node={node:?}");
                self.remove_subtree(node)?;
            }
            TreeUpdate::EndOfDocument => {
                debug!("EndOfDocument received by box tree ({} boxes)", self.len());
            }
        }
        Ok(())
    }
}
