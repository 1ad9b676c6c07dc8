use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rusty_vault_runtime::{
    HostTree, ListenerId, NodeId, Notification, NotificationHandler, PortError,
};

use crate::markup::{self, escape_attribute, escape_text, MarkupNode};

const ROOT_TAG: &str = "body";

#[derive(Debug, Clone)]
enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        styles: Vec<String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Listener {
    node: NodeId,
    name: String,
    handler: NotificationHandler,
}

struct DocumentState {
    nodes: Vec<Option<NodeData>>,
    /// Slots of discarded nodes, reused by later insertions.
    free: Vec<NodeId>,
    root: NodeId,
    listeners: BTreeMap<ListenerId, Listener>,
    next_listener: u64,
}

/// In-memory presentation tree implementing [`HostTree`].
///
/// Nodes live in an arena. Detached subtrees simply have no parent until they
/// are discarded, which frees their slots for reuse. Cloning yields another
/// handle to the same document.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<DocumentState>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.lock() {
            Ok(g) => f
                .debug_struct("Document")
                .field("nodes", &g.live_nodes())
                .field("listeners", &g.listeners.len())
                .finish(),
            Err(_) => f.write_str("Document(<poisoned>)"),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        let root = NodeData {
            kind: NodeKind::Element {
                tag: ROOT_TAG.to_owned(),
                attributes: Vec::new(),
                styles: Vec::new(),
            },
            parent: None,
            children: Vec::new(),
        };
        Self {
            inner: Arc::new(Mutex::new(DocumentState {
                nodes: vec![Some(root)],
                free: Vec::new(),
                root: NodeId(0),
                listeners: BTreeMap::new(),
                next_listener: 0,
            })),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// A document whose root holds the given markup.
    pub fn parse(markup: &str) -> Result<Self, PortError> {
        let document = Self::default();
        let root = document.root()?;
        document.append_markup(root, markup)?;
        Ok(document)
    }

    fn lock(&self) -> Result<MutexGuard<'_, DocumentState>, PortError> {
        self.inner
            .lock()
            .map_err(|e| PortError::Transport(format!("document lock poisoned: {e}")))
    }

    /// First element with `tag` anywhere in the document, in document order.
    pub fn find_first(&self, tag: &str) -> Result<Option<NodeId>, PortError> {
        let root = self.root()?;
        Ok(self.descendants_by_tag(root, tag)?.into_iter().next())
    }

    pub fn children(&self, node: NodeId) -> Result<Vec<NodeId>, PortError> {
        let g = self.lock()?;
        Ok(g.node(node)?.children.clone())
    }

    pub fn text_content(&self, node: NodeId) -> Result<String, PortError> {
        let g = self.lock()?;
        let mut out = String::new();
        g.collect_text(node, &mut out)?;
        Ok(out)
    }

    pub fn outer_markup(&self, node: NodeId) -> Result<String, PortError> {
        let g = self.lock()?;
        let mut out = String::new();
        g.serialize(node, &mut out)?;
        Ok(out)
    }

    pub fn is_attached(&self, node: NodeId) -> Result<bool, PortError> {
        let g = self.lock()?;
        let mut current = Some(node);
        while let Some(id) = current {
            if id == g.root {
                return Ok(true);
            }
            current = g.node(id)?.parent;
        }
        Ok(false)
    }

    pub fn listener_count(&self) -> Result<usize, PortError> {
        Ok(self.lock()?.listeners.len())
    }

    /// Nodes currently allocated, attached or not.
    pub fn node_count(&self) -> Result<usize, PortError> {
        Ok(self.lock()?.live_nodes())
    }
}

impl DocumentState {
    fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    fn node(&self, id: NodeId) -> Result<&NodeData, PortError> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| PortError::NotFound(format!("node {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut NodeData, PortError> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| PortError::NotFound(format!("node {id}")))
    }

    fn element_mut(
        &mut self,
        id: NodeId,
    ) -> Result<(&mut Vec<(String, String)>, &mut Vec<String>), PortError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element {
                attributes, styles, ..
            } => Ok((attributes, styles)),
            NodeKind::Text(_) => Err(PortError::Validation(format!("{id} is a text node"))),
        }
    }

    fn push(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let data = NodeData {
            kind,
            parent,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.0] = Some(data);
                id
            }
            None => {
                self.nodes.push(Some(data));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    fn push_child(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.push(kind, Some(parent));
        if let Some(Some(data)) = self.nodes.get_mut(parent.0) {
            data.children.push(id);
        }
        id
    }

    /// Frees `id` and its subtree, returning the listeners that targeted them.
    fn free_subtree(&mut self, id: NodeId) -> Result<Vec<Listener>, PortError> {
        if id == self.root {
            return Err(PortError::Validation("the document root cannot be discarded".to_owned()));
        }
        self.detach(id)?;
        let mut doomed = self.preorder(id)?;
        doomed.push(id);
        for node in &doomed {
            self.nodes[node.0] = None;
            self.free.push(*node);
        }
        let stale: Vec<ListenerId> = self
            .listeners
            .iter()
            .filter(|(_, l)| doomed.contains(&l.node))
            .map(|(id, _)| *id)
            .collect();
        Ok(stale
            .into_iter()
            .filter_map(|id| self.listeners.remove(&id))
            .collect())
    }

    fn detach(&mut self, id: NodeId) -> Result<(), PortError> {
        if let Some(parent) = self.node_mut(id)?.parent.take() {
            self.node_mut(parent)?.children.retain(|c| *c != id);
        }
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> Result<bool, PortError> {
        let mut current = Some(of);
        while let Some(id) = current {
            if id == candidate {
                return Ok(true);
            }
            current = self.node(id)?.parent;
        }
        Ok(false)
    }

    fn preorder(&self, scope: NodeId) -> Result<Vec<NodeId>, PortError> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.node(scope)?.children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.node(id)?.children.iter().rev().copied());
        }
        Ok(out)
    }

    fn instantiate(&mut self, parent: NodeId, markup: &MarkupNode) -> NodeId {
        match markup {
            MarkupNode::Text(text) => {
                self.push_child(parent, NodeKind::Text(text.clone()))
            }
            MarkupNode::Element {
                tag,
                attributes,
                children,
            } => {
                let mut styles = Vec::new();
                let mut plain = Vec::with_capacity(attributes.len());
                for (name, value) in attributes {
                    if name == "class" {
                        for style in value.split_whitespace() {
                            if !styles.iter().any(|s: &String| s == style) {
                                styles.push(style.to_owned());
                            }
                        }
                    } else {
                        plain.push((name.clone(), value.clone()));
                    }
                }
                let id = self.push_child(
                    parent,
                    NodeKind::Element {
                        tag: tag.clone(),
                        attributes: plain,
                        styles,
                    },
                );
                for child in children {
                    self.instantiate(id, child);
                }
                id
            }
        }
    }

    fn collect_text(&self, id: NodeId, out: &mut String) -> Result<(), PortError> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out)?;
                }
            }
        }
        Ok(())
    }

    fn serialize(&self, id: NodeId, out: &mut String) -> Result<(), PortError> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Text(text) => out.push_str(&escape_text(text)),
            NodeKind::Element {
                tag,
                attributes,
                styles,
            } => {
                out.push('<');
                out.push_str(tag);
                if !styles.is_empty() {
                    out.push_str(&format!(r#" class="{}""#, escape_attribute(&styles.join(" "))));
                }
                for (name, value) in attributes {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(r#" {name}="{}""#, escape_attribute(value)));
                    }
                }
                out.push('>');
                if markup::is_void(tag) {
                    return Ok(());
                }
                for child in &node.children {
                    self.serialize(*child, out)?;
                }
                out.push_str(&format!("</{tag}>"));
            }
        }
        Ok(())
    }
}

impl HostTree for Document {
    fn root(&self) -> Result<NodeId, PortError> {
        Ok(self.lock()?.root)
    }

    fn tag_name(&self, node: NodeId) -> Result<String, PortError> {
        let g = self.lock()?;
        match &g.node(node)?.kind {
            NodeKind::Element { tag, .. } => Ok(tag.clone()),
            NodeKind::Text(_) => Ok("#text".to_owned()),
        }
    }

    fn parent(&self, node: NodeId) -> Result<Option<NodeId>, PortError> {
        Ok(self.lock()?.node(node)?.parent)
    }

    fn descendants_by_tag(&self, scope: NodeId, tag: &str) -> Result<Vec<NodeId>, PortError> {
        let g = self.lock()?;
        let mut out = Vec::new();
        for id in g.preorder(scope)? {
            if let NodeKind::Element { tag: t, .. } = &g.node(id)?.kind {
                if t == tag {
                    out.push(id);
                }
            }
        }
        Ok(out)
    }

    fn first_with_attribute(
        &self,
        scope: NodeId,
        name: &str,
    ) -> Result<Option<NodeId>, PortError> {
        let g = self.lock()?;
        for id in g.preorder(scope)? {
            if let NodeKind::Element { attributes, .. } = &g.node(id)?.kind {
                if attributes.iter().any(|(n, _)| n == name) {
                    return Ok(Some(id));
                }
            }
        }
        Ok(None)
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, PortError> {
        let g = self.lock()?;
        match &g.node(node)?.kind {
            NodeKind::Element {
                attributes, styles, ..
            } => {
                if name == "class" {
                    return Ok((!styles.is_empty()).then(|| styles.join(" ")));
                }
                Ok(attributes
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|(_, v)| v.clone()))
            }
            NodeKind::Text(_) => Ok(None),
        }
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let (attributes, styles) = g.element_mut(node)?;
        if name == "class" {
            styles.clear();
            styles.extend(value.split_whitespace().map(str::to_owned));
            return Ok(());
        }
        match attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => attributes.push((name.to_owned(), value.to_owned())),
        }
        Ok(())
    }

    fn remove_attribute(&self, node: NodeId, name: &str) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let (attributes, styles) = g.element_mut(node)?;
        if name == "class" {
            styles.clear();
        } else {
            attributes.retain(|(n, _)| n != name);
        }
        Ok(())
    }

    fn styles(&self, node: NodeId) -> Result<Vec<String>, PortError> {
        let g = self.lock()?;
        match &g.node(node)?.kind {
            NodeKind::Element { styles, .. } => Ok(styles.clone()),
            NodeKind::Text(_) => Ok(Vec::new()),
        }
    }

    fn add_style(&self, node: NodeId, style: &str) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let (_, styles) = g.element_mut(node)?;
        if !styles.iter().any(|s| s == style) {
            styles.push(style.to_owned());
        }
        Ok(())
    }

    fn remove_style(&self, node: NodeId, style: &str) -> Result<(), PortError> {
        let mut g = self.lock()?;
        let (_, styles) = g.element_mut(node)?;
        styles.retain(|s| s != style);
        Ok(())
    }

    fn take_children(&self, node: NodeId) -> Result<Vec<NodeId>, PortError> {
        let mut g = self.lock()?;
        let children = std::mem::take(&mut g.node_mut(node)?.children);
        for child in &children {
            g.node_mut(*child)?.parent = None;
        }
        Ok(children)
    }

    fn append_children(&self, node: NodeId, children: &[NodeId]) -> Result<(), PortError> {
        let mut g = self.lock()?;
        if let NodeKind::Text(_) = g.node(node)?.kind {
            return Err(PortError::Validation(format!("{node} is a text node")));
        }
        for child in children {
            if g.is_ancestor_or_self(*child, node)? {
                return Err(PortError::Validation(format!(
                    "cannot append {child} into its own subtree at {node}"
                )));
            }
            g.detach(*child)?;
            g.node_mut(*child)?.parent = Some(node);
            g.node_mut(node)?.children.push(*child);
        }
        Ok(())
    }

    fn append_markup(&self, node: NodeId, markup: &str) -> Result<(), PortError> {
        let parsed = markup::parse_fragment(markup)
            .map_err(|e| PortError::Validation(format!("invalid markup: {e}")))?;
        let mut g = self.lock()?;
        if let NodeKind::Text(_) = g.node(node)?.kind {
            return Err(PortError::Validation(format!("{node} is a text node")));
        }
        for item in &parsed {
            g.instantiate(node, item);
        }
        Ok(())
    }

    fn inner_markup(&self, node: NodeId) -> Result<String, PortError> {
        let g = self.lock()?;
        let mut out = String::new();
        for child in &g.node(node)?.children {
            g.serialize(*child, &mut out)?;
        }
        Ok(out)
    }

    fn has_content(&self, node: NodeId) -> Result<bool, PortError> {
        let g = self.lock()?;
        for child in &g.node(node)?.children {
            match &g.node(*child)?.kind {
                NodeKind::Element { .. } => return Ok(true),
                NodeKind::Text(text) if !text.trim().is_empty() => return Ok(true),
                NodeKind::Text(_) => {}
            }
        }
        Ok(false)
    }

    fn create_detached(&self, tag: &str) -> Result<NodeId, PortError> {
        let mut g = self.lock()?;
        Ok(g.push(
            NodeKind::Element {
                tag: tag.to_owned(),
                attributes: Vec::new(),
                styles: Vec::new(),
            },
            None,
        ))
    }

    fn discard(&self, nodes: &[NodeId]) -> Result<(), PortError> {
        let mut stale = Vec::new();
        {
            let mut g = self.lock()?;
            for node in nodes {
                // Already freed as part of an earlier subtree.
                if g.node(*node).is_err() {
                    continue;
                }
                stale.extend(g.free_subtree(*node)?);
            }
        }
        // Listener handlers are dropped outside the lock.
        drop(stale);
        Ok(())
    }

    fn subscribe(
        &self,
        node: NodeId,
        name: &str,
        handler: NotificationHandler,
    ) -> Result<ListenerId, PortError> {
        let mut g = self.lock()?;
        g.node(node)?;
        g.next_listener = g.next_listener.saturating_add(1);
        let id = ListenerId(g.next_listener);
        g.listeners.insert(
            id,
            Listener {
                node,
                name: name.to_owned(),
                handler,
            },
        );
        Ok(id)
    }

    fn unsubscribe(&self, listener: ListenerId) -> Result<(), PortError> {
        // The handler is dropped outside the lock; its captures may call back in.
        let removed = self.lock()?.listeners.remove(&listener);
        removed
            .map(|_| ())
            .ok_or_else(|| PortError::NotFound(format!("listener {}", listener.0)))
    }

    fn dispatch(&self, notification: Notification) -> Result<(), PortError> {
        let queued: Vec<(ListenerId, NotificationHandler)> = {
            let g = self.lock()?;
            let mut path = vec![notification.target];
            if notification.bubbles {
                let mut current = g.node(notification.target)?.parent;
                while let Some(id) = current {
                    path.push(id);
                    current = g.node(id)?.parent;
                }
            } else {
                g.node(notification.target)?;
            }
            let mut queued = Vec::new();
            for node in path {
                for (id, listener) in &g.listeners {
                    if listener.node == node && listener.name == notification.name {
                        queued.push((*id, Arc::clone(&listener.handler)));
                    }
                }
            }
            queued
        };

        if queued.is_empty() {
            tracing::trace!(name = %notification.name, target_node = %notification.target, "notification had no listeners");
        }
        for (id, handler) in queued {
            // Listeners removed by an earlier handler in this dispatch are skipped.
            let live = self.lock()?.listeners.contains_key(&id);
            if live {
                handler(&notification);
            }
        }
        Ok(())
    }
}
