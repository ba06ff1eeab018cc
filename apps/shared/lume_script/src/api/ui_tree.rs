//! UI Tree
//!
//! Read-derived hierarchical index over a flat widget list. The tree is rebuilt
//! wholesale whenever the widget set changes; nodes are never patched in place.
//!
//! Nodes live in an arena and refer to each other through [`NodeId`], so the
//! parent back-reference is a plain index used for lookup only.

use std::collections::HashMap;

use tracing::warn;

use super::widget::{Widget, WidgetInfo, WidgetType};

/// Id of the synthetic root created when there is not exactly one top-level widget
pub const SYNTHETIC_ROOT_ID: &str = "root";

/// Index of a node inside its [`UiTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// One node mirroring one widget, or the synthetic root
#[derive(Debug, Clone)]
pub struct UiTreeNode {
    pub node_id: NodeId,
    pub id: String,
    /// `None` only for the synthetic root
    pub widget: Option<WidgetInfo>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl UiTreeNode {
    pub fn widget_type(&self) -> Option<WidgetType> {
        self.widget.as_ref().map(|w| w.widget_type)
    }

    pub fn is_synthetic(&self) -> bool {
        self.widget.is_none()
    }
}

/// Hierarchical index over a widget set
#[derive(Debug, Clone)]
pub struct UiTree {
    nodes: Vec<UiTreeNode>,
    by_id: HashMap<String, NodeId>,
    root: NodeId,
}

impl UiTree {
    /// Build a tree from a flat widget list
    ///
    /// Widgets whose parent is empty, `"root"`, unknown or would close a cycle
    /// become top-level nodes. Exactly one top-level node becomes the root;
    /// otherwise a synthetic `"root"` node adopts all of them.
    pub fn build<W: Widget>(widgets: &[W]) -> Self {
        let mut nodes: Vec<UiTreeNode> = Vec::with_capacity(widgets.len() + 1);
        let mut by_id = HashMap::with_capacity(widgets.len());

        for widget in widgets {
            let info = WidgetInfo::snapshot(widget);
            if by_id.contains_key(&info.id) {
                warn!("Duplicate widget id '{}' ignored while building UI tree", info.id);
                continue;
            }
            let node_id = NodeId(nodes.len());
            by_id.insert(info.id.clone(), node_id);
            nodes.push(UiTreeNode {
                node_id,
                id: info.id.clone(),
                widget: Some(info),
                parent: None,
                children: Vec::new(),
            });
        }

        let mut top_level = Vec::new();
        for index in 0..nodes.len() {
            let node_id = NodeId(index);
            let parent = nodes[index]
                .widget
                .as_ref()
                .and_then(|w| w.parent_id.as_deref())
                .filter(|p| !p.is_empty() && *p != SYNTHETIC_ROOT_ID)
                .and_then(|p| by_id.get(p).copied());

            match parent {
                Some(parent_id) if !Self::reaches(&nodes, parent_id, node_id) => {
                    nodes[index].parent = Some(parent_id);
                    nodes[parent_id.0].children.push(node_id);
                }
                _ => top_level.push(node_id),
            }
        }

        let root = if top_level.len() == 1 {
            top_level[0]
        } else {
            let root = NodeId(nodes.len());
            for child in &top_level {
                nodes[child.0].parent = Some(root);
            }
            nodes.push(UiTreeNode {
                node_id: root,
                id: SYNTHETIC_ROOT_ID.to_string(),
                widget: None,
                parent: None,
                children: top_level,
            });
            root
        };

        Self { nodes, by_id, root }
    }

    /// Whether walking up from `from` hits `target`
    fn reaches(nodes: &[UiTreeNode], from: NodeId, target: NodeId) -> bool {
        let mut current = Some(from);
        while let Some(id) = current {
            if id == target {
                return true;
            }
            current = nodes[id.0].parent;
        }
        false
    }

    pub fn root(&self) -> &UiTreeNode {
        &self.nodes[self.root.0]
    }

    pub fn node(&self, node_id: NodeId) -> Option<&UiTreeNode> {
        self.nodes.get(node_id.0)
    }

    /// Number of nodes that mirror a real widget
    pub fn widget_count(&self) -> usize {
        self.by_id.len()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&UiTreeNode> {
        self.by_id.get(id).map(|n| &self.nodes[n.0])
    }

    /// Find the node mirroring `widget`; widgets are identified by id
    pub fn find_by_widget<W: Widget + ?Sized>(&self, widget: &W) -> Option<&UiTreeNode> {
        self.find_by_id(widget.id())
            .filter(|node| node.widget_type() == Some(widget.widget_type()))
    }

    pub fn children(&self, node_id: NodeId) -> Vec<&UiTreeNode> {
        self.node(node_id)
            .map(|node| node.children.iter().map(|c| &self.nodes[c.0]).collect())
            .unwrap_or_default()
    }

    pub fn parent(&self, node_id: NodeId) -> Option<&UiTreeNode> {
        self.node(node_id)
            .and_then(|node| node.parent)
            .map(|p| &self.nodes[p.0])
    }

    /// True when the node has no parent or its parent is the synthetic root
    pub fn is_root(&self, node_id: NodeId) -> bool {
        match self.parent(node_id) {
            None => true,
            Some(parent) => parent.is_synthetic(),
        }
    }

    /// Every node below `node_id` in pre-order, excluding the node itself
    pub fn all_descendants(&self, node_id: NodeId) -> Vec<&UiTreeNode> {
        let mut out = Vec::new();
        self.collect_descendants(node_id, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, node_id: NodeId, out: &mut Vec<&'a UiTreeNode>) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        for child in &node.children {
            out.push(&self.nodes[child.0]);
            self.collect_descendants(*child, out);
        }
    }

    /// Nodes sharing the same parent, excluding `node_id`
    pub fn siblings(&self, node_id: NodeId) -> Vec<&UiTreeNode> {
        match self.parent(node_id) {
            Some(parent) => parent
                .children
                .iter()
                .filter(|c| **c != node_id)
                .map(|c| &self.nodes[c.0])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Distance to the nearest ancestor without a backing widget (top-level = 0)
    pub fn depth(&self, node_id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(node_id);
        while let Some(node) = current.filter(|n| !n.is_synthetic()) {
            depth += 1;
            current = self.parent(node.node_id);
        }
        depth
    }

    /// Ids from the outermost real-widget ancestor down to `node_id`
    pub fn path(&self, node_id: NodeId) -> Vec<String> {
        let mut path = Vec::new();
        let mut current = self.node(node_id);
        while let Some(node) = current.filter(|n| !n.is_synthetic()) {
            path.push(node.id.clone());
            current = self.parent(node.node_id);
        }
        path.reverse();
        path
    }

    /// Search the subtree rooted at `node_id` (inclusive) for `id`
    pub fn find_descendant(&self, node_id: NodeId, id: &str) -> Option<&UiTreeNode> {
        let node = self.node(node_id)?;
        if node.id == id {
            return Some(node);
        }
        node.children
            .iter()
            .find_map(|child| self.find_descendant(*child, id))
    }

    /// All real-widget nodes of the given type, in build order
    pub fn nodes_of_type(&self, widget_type: WidgetType) -> Vec<&UiTreeNode> {
        self.nodes
            .iter()
            .filter(|n| n.widget_type() == Some(widget_type))
            .collect()
    }

    /// All nodes, synthetic root included
    pub fn iter(&self) -> impl Iterator<Item = &UiTreeNode> {
        self.nodes.iter()
    }
}
