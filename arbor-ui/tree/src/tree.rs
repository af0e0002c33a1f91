//! Arena of tree nodes with expansion state and event routing.

use std::collections::HashSet;
use std::fmt;
use std::mem;
use std::sync::{Arc, Weak};

use log::{debug, trace};
use parking_lot::{Mutex, RwLock};
use slotmap::{Key, SlotMap, new_key_type};

use crate::error::{Result, TreeError};
use crate::event::{
    MouseButton, NodeEventHandler, PointEvent, Refresh, RefreshListener,
    TapHandler, TapTarget,
};
use crate::list::ChildList;
use crate::model::{IconResource, TreeNodeModel};

new_key_type! {
    /// Stable handle of a node inside a [`Tree`].
    ///
    /// The null id and ids of released nodes are rejected with
    /// [`TreeError::NilArgument`].
    pub struct NodeId;
}

#[derive(Debug, Default)]
struct NodeState {
    expanded: bool,
    leaf: bool,
    /// Set while `before_expand` runs so a concurrent expand is a no-op.
    expanding: bool,
}

#[derive(Default)]
struct Handlers {
    icon_tapped: Option<TapHandler>,
    label_tapped: Option<TapHandler>,
    tapped_secondary: Option<TapHandler>,
    double_tapped: Option<TapHandler>,
    before_expand: Option<NodeEventHandler>,
    after_condense: Option<NodeEventHandler>,
}

/// Clears `expanding` if `before_expand` unwinds, so the node can be
/// expanded again.
struct ExpandGuard<'a> {
    state: &'a Mutex<NodeState>,
}

impl ExpandGuard<'_> {
    fn disarm(self) {
        mem::forget(self);
    }
}

impl Drop for ExpandGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().expanding = false;
    }
}

pub(crate) struct Node<M> {
    model: Arc<M>,
    children: ChildList<NodeId>,
    parent: Mutex<Option<NodeId>>,
    state: Mutex<NodeState>,
    handlers: Mutex<Handlers>,
}

impl<M: TreeNodeModel> Node<M> {
    fn new(model: Arc<M>, id: NodeId, shared: Weak<Shared<M>>) -> Self {
        let children = ChildList::new();

        let on_addition = shared.clone();
        children.set_on_after_addition(move |child| {
            if let Some(shared) = on_addition.upgrade() {
                shared.adopt(id, child);
            }
        });
        children.set_on_after_removal(move |child| {
            if let Some(shared) = shared.upgrade() {
                shared.disown(id, child);
            }
        });

        Self {
            model,
            children,
            parent: Mutex::new(None),
            state: Mutex::new(NodeState::default()),
            handlers: Mutex::new(Handlers::default()),
        }
    }
}

pub(crate) struct Shared<M> {
    nodes: RwLock<SlotMap<NodeId, Arc<Node<M>>>>,
    roots: ChildList<NodeId>,
    listeners: Mutex<Vec<RefreshListener>>,
}

impl<M: TreeNodeModel> Shared<M> {
    pub(crate) fn node(&self, id: NodeId) -> Result<Arc<Node<M>>> {
        if id.is_null() {
            return Err(TreeError::NilArgument);
        }
        self.nodes
            .read()
            .get(id)
            .cloned()
            .ok_or(TreeError::NilArgument)
    }

    fn emit(&self, refresh: Refresh) {
        let listeners = self.listeners.lock().clone();
        trace!("refresh {refresh:?} -> {} listeners", listeners.len());
        for listener in listeners {
            listener(refresh);
        }
    }

    fn adopt(&self, parent: NodeId, child: NodeId) {
        if let Ok(node) = self.node(child) {
            *node.parent.lock() = Some(parent);
        }
        trace!("node {child:?} attached to {parent:?}");
        self.emit(Refresh::Node(parent));
    }

    fn disown(&self, parent: NodeId, child: NodeId) {
        if let Ok(node) = self.node(child) {
            *node.parent.lock() = None;
        }
        trace!("node {child:?} detached from {parent:?}");
        self.emit(Refresh::Node(parent));
    }

    fn adopt_root(&self, root: NodeId) {
        if let Ok(node) = self.node(root) {
            *node.parent.lock() = None;
        }
        self.emit(Refresh::Roots);
    }

    fn disown_root(&self, root: NodeId) {
        if let Ok(node) = self.node(root) {
            *node.parent.lock() = None;
        }
        self.emit(Refresh::Roots);
    }

    fn sort_key(&self, id: NodeId) -> String {
        self.node(id)
            .map(|node| node.model.text().to_uppercase())
            .unwrap_or_default()
    }

    /// Drain `node` and every descendant, clearing their parents. Ids of the
    /// unlinked nodes are pushed to `unlinked` in visiting order.
    fn unlink_subtree(
        &self,
        node: &Node<M>,
        visited: &mut HashSet<NodeId>,
        unlinked: &mut Vec<NodeId>,
    ) {
        for child in node.children.drain() {
            let Ok(child_node) = self.node(child) else {
                continue;
            };
            *child_node.parent.lock() = None;
            if visited.insert(child) {
                unlinked.push(child);
                self.unlink_subtree(&child_node, visited, unlinked);
            }
        }
    }
}

/// Back-reference handed to a model through [`TreeNodeModel::bind`].
///
/// Holds the tree weakly, so a model keeping its handle does not keep the
/// tree alive.
pub struct NodeHandle<M> {
    tree: Weak<Shared<M>>,
    id: NodeId,
}

impl<M> Clone for NodeHandle<M> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            id: self.id,
        }
    }
}

impl<M> fmt::Debug for NodeHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeHandle").field("id", &self.id).finish()
    }
}

impl<M: TreeNodeModel> NodeHandle<M> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The owning tree, or `None` once every [`Tree`] handle is dropped.
    pub fn tree(&self) -> Option<Tree<M>> {
        self.tree.upgrade().map(|shared| Tree { shared })
    }
}

/// Read-only view of a single node.
///
/// Obtained from [`Tree::node`]. The view stays usable after the node is
/// released, but it no longer reflects a live tree entry.
pub struct NodeRef<M> {
    id: NodeId,
    node: Arc<Node<M>>,
    shared: Arc<Shared<M>>,
}

impl<M: TreeNodeModel> NodeRef<M> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn model(&self) -> &Arc<M> {
        &self.node.model
    }

    pub fn icon(&self) -> Option<IconResource> {
        self.node.model.icon()
    }

    pub fn text(&self) -> String {
        self.node.model.text()
    }

    pub fn is_leaf(&self) -> bool {
        self.node.state.lock().leaf
    }

    pub fn is_branch(&self) -> bool {
        !self.is_leaf()
    }

    pub fn is_expanded(&self) -> bool {
        self.node.state.lock().expanded
    }

    pub fn is_condensed(&self) -> bool {
        !self.is_expanded()
    }

    /// Whether a renderer should draw this node: roots and detached nodes
    /// are visible, children follow their parent's expansion.
    pub fn is_visible(&self) -> bool {
        match self.parent() {
            None => true,
            Some(parent) => self
                .shared
                .node(parent)
                .map(|parent| parent.state.lock().expanded)
                .unwrap_or(true),
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        *self.node.parent.lock()
    }

    pub fn children(&self) -> Vec<NodeId> {
        self.node.children.to_vec()
    }

    pub fn num_children(&self) -> usize {
        self.node.children.len()
    }
}

impl<M> fmt::Debug for NodeRef<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id)
            .field("state", &*self.node.state.lock())
            .field("parent", &*self.node.parent.lock())
            .field("children", &self.node.children)
            .finish_non_exhaustive()
    }
}

/// Hierarchy of model-bound nodes plus the root container that holds the
/// top-level rows.
///
/// `Tree` is a cheap handle: clones share the same nodes. Every operation
/// takes `&self` and may be called from any thread. No lock is held while
/// model code, hooks, handlers or refresh listeners run, so all of those may
/// call back into the tree.
pub struct Tree<M> {
    pub(crate) shared: Arc<Shared<M>>,
}

impl<M> Clone for Tree<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: TreeNodeModel> Default for Tree<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> fmt::Debug for Tree<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tree")
            .field("nodes", &self.shared.nodes.read().len())
            .field("roots", &self.shared.roots)
            .finish_non_exhaustive()
    }
}

impl<M: TreeNodeModel> Tree<M> {
    pub fn new() -> Self {
        let shared = Arc::new_cyclic(|weak: &Weak<Shared<M>>| {
            let roots = ChildList::new();

            let on_addition = weak.clone();
            roots.set_on_after_addition(move |root| {
                if let Some(shared) = on_addition.upgrade() {
                    shared.adopt_root(root);
                }
            });
            let on_removal = weak.clone();
            roots.set_on_after_removal(move |root| {
                if let Some(shared) = on_removal.upgrade() {
                    shared.disown_root(root);
                }
            });

            Shared {
                nodes: RwLock::new(SlotMap::with_key()),
                roots,
                listeners: Mutex::new(Vec::new()),
            }
        });

        Self { shared }
    }

    /// Bind `model` to a new, detached, condensed branch node.
    pub fn insert_node(&self, model: M) -> NodeId {
        self.insert_shared(Arc::new(model))
    }

    /// Like [`Tree::insert_node`] for a model the host keeps shared.
    pub fn insert_shared(&self, model: Arc<M>) -> NodeId {
        let weak = Arc::downgrade(&self.shared);
        let id = self.shared.nodes.write().insert_with_key(|id| {
            Arc::new(Node::new(Arc::clone(&model), id, weak.clone()))
        });
        trace!("node {id:?} created");

        model.bind(NodeHandle { tree: weak, id });
        id
    }

    /// Detach `id`, release its whole subtree and free the arena slots.
    ///
    /// Released ids are dropped from every child list and from the roots,
    /// then become stale. Returns the model that was bound to `id`.
    pub fn release(&self, id: NodeId) -> Result<Arc<M>> {
        let node = self.shared.node(id)?;

        let parent = *node.parent.lock();
        let detached = match parent {
            Some(parent) => self
                .shared
                .node(parent)
                .and_then(|parent| parent.children.remove(id)),
            None => self.shared.roots.remove(id),
        };
        if let Err(err) = detached {
            trace!("node {id:?} was not linked on release: {err}");
        }

        let mut visited = HashSet::from([id]);
        let mut released = vec![id];
        self.shared
            .unlink_subtree(&node, &mut visited, &mut released);
        self.purge_links(&visited);

        let freed: Vec<Arc<Node<M>>> = {
            let mut nodes = self.shared.nodes.write();
            released.iter().filter_map(|id| nodes.remove(*id)).collect()
        };
        for node in &freed {
            node.children.clear_hooks();
        }
        debug!("released {} nodes rooted at {id:?}", freed.len());

        Ok(Arc::clone(&node.model))
    }

    /// Scrub `released` from every other list that still holds them.
    /// Re-parenting never detaches, so a node may be listed more than once.
    fn purge_links(&self, released: &HashSet<NodeId>) {
        let survivors: Vec<(NodeId, Arc<Node<M>>)> = self
            .shared
            .nodes
            .read()
            .iter()
            .filter(|(id, _)| !released.contains(id))
            .map(|(id, node)| (id, Arc::clone(node)))
            .collect();

        for (id, node) in survivors {
            if node.children.purge(released) > 0 {
                trace!("dropped stale links below {id:?}");
                self.shared.emit(Refresh::Node(id));
            }
        }
        if self.shared.roots.purge(released) > 0 {
            self.shared.emit(Refresh::Roots);
        }
    }

    /// Number of live nodes in the arena.
    pub fn len(&self) -> usize {
        self.shared.nodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.nodes.read().is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.shared.node(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Result<NodeRef<M>> {
        Ok(NodeRef {
            id,
            node: self.shared.node(id)?,
            shared: Arc::clone(&self.shared),
        })
    }

    pub fn model(&self, id: NodeId) -> Result<Arc<M>> {
        Ok(Arc::clone(&self.shared.node(id)?.model))
    }

    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>> {
        Ok(*self.shared.node(id)?.parent.lock())
    }

    pub fn children_of(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.shared.node(id)?.children.to_vec())
    }

    pub fn num_children(&self, id: NodeId) -> Result<usize> {
        Ok(self.shared.node(id)?.children.len())
    }

    /// Subscribe to refresh notifications fired after every mutation.
    pub fn add_refresh_listener(
        &self,
        listener: impl Fn(Refresh) + Send + Sync + 'static,
    ) {
        self.shared.listeners.lock().push(Arc::new(listener));
    }

    pub fn clear_refresh_listeners(&self) {
        self.shared.listeners.lock().clear();
    }

    // Hierarchy

    /// Add `child` as the last child of `parent`.
    ///
    /// A child that already has a parent is not detached from it first.
    pub fn append(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let parent = self.shared.node(parent)?;
        self.shared.node(child)?;
        parent.children.append(child)
    }

    pub fn insert_at(
        &self,
        parent: NodeId,
        position: usize,
        child: NodeId,
    ) -> Result<()> {
        let parent = self.shared.node(parent)?;
        self.shared.node(child)?;
        parent.children.insert_at(position, child)
    }

    /// Insert `child` ordered by its case-insensitive text. Returns the
    /// position it landed at.
    pub fn insert_sorted(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<usize> {
        let parent = self.shared.node(parent)?;
        self.shared.node(child)?;
        parent
            .children
            .insert_sorted_by_key(child, |id| self.shared.sort_key(id))
    }

    pub fn remove_at(&self, parent: NodeId, position: usize) -> Result<NodeId> {
        self.shared.node(parent)?.children.remove_at(position)
    }

    pub fn remove(&self, parent: NodeId, child: NodeId) -> Result<NodeId> {
        self.shared.node(parent)?.children.remove(child)
    }

    pub fn index_of(
        &self,
        parent: NodeId,
        child: NodeId,
    ) -> Result<Option<usize>> {
        Ok(self.shared.node(parent)?.children.index_of(child))
    }

    /// Unlink every descendant of `id`, leaving each of them parentless
    /// and childless. Fires a single refresh for `id`.
    pub fn remove_all(&self, id: NodeId) -> Result<()> {
        let node = self.shared.node(id)?;
        let mut visited = HashSet::from([id]);
        let mut unlinked = Vec::new();
        self.shared
            .unlink_subtree(&node, &mut visited, &mut unlinked);
        trace!("removed {} descendants of {id:?}", unlinked.len());

        self.shared.emit(Refresh::Node(id));
        Ok(())
    }

    // Root container

    pub fn roots(&self) -> Vec<NodeId> {
        self.shared.roots.to_vec()
    }

    pub fn num_roots(&self) -> usize {
        self.shared.roots.len()
    }

    pub fn append_root(&self, root: NodeId) -> Result<()> {
        self.shared.node(root)?;
        self.shared.roots.append(root)
    }

    pub fn insert_root_at(&self, position: usize, root: NodeId) -> Result<()> {
        self.shared.node(root)?;
        self.shared.roots.insert_at(position, root)
    }

    pub fn insert_root_sorted(&self, root: NodeId) -> Result<usize> {
        self.shared.node(root)?;
        self.shared
            .roots
            .insert_sorted_by_key(root, |id| self.shared.sort_key(id))
    }

    pub fn remove_root_at(&self, position: usize) -> Result<NodeId> {
        self.shared.roots.remove_at(position)
    }

    pub fn remove_root(&self, root: NodeId) -> Result<NodeId> {
        self.shared.roots.remove(root)
    }

    pub fn root_index_of(&self, root: NodeId) -> Option<usize> {
        self.shared.roots.index_of(root)
    }

    /// Empty the root container and unlink every subtree below it.
    pub fn remove_all_roots(&self) {
        let mut visited = HashSet::new();
        let mut unlinked = Vec::new();
        for root in self.shared.roots.drain() {
            let Ok(node) = self.shared.node(root) else {
                continue;
            };
            *node.parent.lock() = None;
            if visited.insert(root) {
                self.shared
                    .unlink_subtree(&node, &mut visited, &mut unlinked);
            }
        }
        trace!("cleared roots, {} descendants unlinked", unlinked.len());

        self.shared.emit(Refresh::Roots);
    }

    // Expansion

    /// Expand a condensed branch.
    ///
    /// Runs `before_expand` first, which may populate children. No-op for
    /// leaves and already expanded nodes.
    pub fn expand(&self, id: NodeId) -> Result<()> {
        let node = self.shared.node(id)?;
        {
            let mut state = node.state.lock();
            if state.leaf || state.expanded || state.expanding {
                return Ok(());
            }
            state.expanding = true;
        }

        let guard = ExpandGuard { state: &node.state };
        let before_expand = node.handlers.lock().before_expand.clone();
        if let Some(before_expand) = before_expand {
            before_expand();
        }
        guard.disarm();

        {
            let mut state = node.state.lock();
            state.expanding = false;
            if state.leaf {
                return Ok(());
            }
            state.expanded = true;
        }
        debug!("node {id:?} expanded");

        self.shared.emit(Refresh::Node(id));
        Ok(())
    }

    /// Condense an expanded branch, hiding its children, then run
    /// `after_condense`. No-op when already condensed.
    pub fn condense(&self, id: NodeId) -> Result<()> {
        let node = self.shared.node(id)?;
        {
            let mut state = node.state.lock();
            if state.leaf || !state.expanded {
                return Ok(());
            }
            state.expanded = false;
        }

        let after_condense = node.handlers.lock().after_condense.clone();
        if let Some(after_condense) = after_condense {
            after_condense();
        }
        debug!("node {id:?} condensed");

        self.shared.emit(Refresh::Node(id));
        Ok(())
    }

    pub fn toggle_expand(&self, id: NodeId) -> Result<()> {
        let expanded = self.shared.node(id)?.state.lock().expanded;
        if expanded {
            self.condense(id)
        } else {
            self.expand(id)
        }
    }

    /// Turn `id` into a leaf, condensing it first.
    pub fn set_leaf(&self, id: NodeId) -> Result<()> {
        self.condense(id)?;
        let node = self.shared.node(id)?;
        {
            let mut state = node.state.lock();
            state.leaf = true;
            state.expanded = false;
        }
        self.shared.emit(Refresh::Node(id));
        Ok(())
    }

    pub fn set_branch(&self, id: NodeId) -> Result<()> {
        self.shared.node(id)?.state.lock().leaf = false;
        self.shared.emit(Refresh::Node(id));
        Ok(())
    }

    // Handlers

    pub fn on_icon_tapped(
        &self,
        id: NodeId,
        handler: impl Fn(&PointEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().icon_tapped =
            Some(Arc::new(handler));
        Ok(())
    }

    pub fn on_label_tapped(
        &self,
        id: NodeId,
        handler: impl Fn(&PointEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().label_tapped =
            Some(Arc::new(handler));
        Ok(())
    }

    pub fn on_tapped_secondary(
        &self,
        id: NodeId,
        handler: impl Fn(&PointEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().tapped_secondary =
            Some(Arc::new(handler));
        Ok(())
    }

    pub fn on_double_tapped(
        &self,
        id: NodeId,
        handler: impl Fn(&PointEvent) + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().double_tapped =
            Some(Arc::new(handler));
        Ok(())
    }

    /// Hook run before the node expands; the place to lazily load children.
    pub fn on_before_expand(
        &self,
        id: NodeId,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().before_expand =
            Some(Arc::new(handler));
        Ok(())
    }

    /// Hook run after the node condensed; the place to unload children.
    pub fn on_after_condense(
        &self,
        id: NodeId,
        handler: impl Fn() + Send + Sync + 'static,
    ) -> Result<()> {
        self.shared.node(id)?.handlers.lock().after_condense =
            Some(Arc::new(handler));
        Ok(())
    }

    // Interaction call-ins used by renderers

    /// Primary tap on a part of the row for `id`.
    pub fn tapped(
        &self,
        id: NodeId,
        target: TapTarget,
        event: PointEvent,
    ) -> Result<()> {
        let node = self.shared.node(id)?;
        let handler = {
            let handlers = node.handlers.lock();
            match target {
                TapTarget::Handle => None,
                TapTarget::Icon => handlers.icon_tapped.clone(),
                TapTarget::Label => handlers.label_tapped.clone(),
            }
        };

        match target {
            TapTarget::Handle => self.toggle_expand(id),
            TapTarget::Icon | TapTarget::Label => {
                if let Some(handler) = handler {
                    handler(&event);
                }
                Ok(())
            },
        }
    }

    pub fn tapped_secondary(
        &self,
        id: NodeId,
        event: PointEvent,
    ) -> Result<()> {
        let node = self.shared.node(id)?;
        let handler = node.handlers.lock().tapped_secondary.clone();
        if let Some(handler) = handler {
            handler(&event);
        }
        Ok(())
    }

    pub fn double_tapped(&self, id: NodeId, event: PointEvent) -> Result<()> {
        let node = self.shared.node(id)?;
        let handler = node.handlers.lock().double_tapped.clone();
        if let Some(handler) = handler {
            handler(&event);
        }
        Ok(())
    }

    /// Raw button press on the icon or label: left presses route like
    /// [`Tree::tapped`], right presses like [`Tree::tapped_secondary`].
    pub fn mouse_down(
        &self,
        id: NodeId,
        target: TapTarget,
        button: MouseButton,
        event: PointEvent,
    ) -> Result<()> {
        match (target, button) {
            (TapTarget::Handle, _) => {
                self.shared.node(id)?;
                Ok(())
            },
            (_, MouseButton::Left) => self.tapped(id, target, event),
            (_, MouseButton::Right) => self.tapped_secondary(id, event),
            (_, MouseButton::Middle) => {
                self.shared.node(id)?;
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::model::StaticModel;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hook_count = Arc::clone(&count);
        (count, move || {
            hook_count.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn node(tree: &Tree<StaticModel>, text: &str) -> NodeId {
        tree.insert_node(StaticModel::new(None, text))
    }

    #[test]
    fn new_nodes_are_condensed_detached_branches() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let view = tree.node(id).unwrap();

        assert!(view.is_branch());
        assert!(view.is_condensed());
        assert!(view.is_visible());
        assert_eq!(view.parent(), None);
        assert_eq!(view.num_children(), 0);
        assert_eq!(view.text(), "A");
        assert_eq!(view.icon(), None);
    }

    #[test]
    fn expand_runs_hook_once_and_condense_runs_hook_once() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let (expands, before_expand) = counter();
        let (condenses, after_condense) = counter();
        tree.on_before_expand(id, before_expand).unwrap();
        tree.on_after_condense(id, after_condense).unwrap();

        tree.condense(id).unwrap();
        assert_eq!(condenses.load(Ordering::SeqCst), 0);

        tree.expand(id).unwrap();
        tree.expand(id).unwrap();
        assert_eq!(expands.load(Ordering::SeqCst), 1);
        assert!(tree.node(id).unwrap().is_expanded());

        tree.condense(id).unwrap();
        tree.condense(id).unwrap();
        assert_eq!(condenses.load(Ordering::SeqCst), 1);
        assert!(tree.node(id).unwrap().is_condensed());
    }

    #[test]
    fn leaf_never_expands() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let (expands, before_expand) = counter();
        tree.on_before_expand(id, before_expand).unwrap();

        tree.set_leaf(id).unwrap();
        tree.expand(id).unwrap();
        tree.toggle_expand(id).unwrap();

        let view = tree.node(id).unwrap();
        assert!(view.is_leaf());
        assert!(view.is_condensed());
        assert_eq!(expands.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn set_leaf_condenses_an_expanded_branch() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let (condenses, after_condense) = counter();
        tree.on_after_condense(id, after_condense).unwrap();

        tree.expand(id).unwrap();
        tree.set_leaf(id).unwrap();

        assert!(tree.node(id).unwrap().is_condensed());
        assert_eq!(condenses.load(Ordering::SeqCst), 1);

        tree.set_branch(id).unwrap();
        let view = tree.node(id).unwrap();
        assert!(view.is_branch());
        assert!(view.is_condensed());
    }

    #[test]
    fn toggle_expand_alternates_states() {
        let tree = Tree::new();
        let id = node(&tree, "A");

        tree.toggle_expand(id).unwrap();
        assert!(tree.node(id).unwrap().is_expanded());
        tree.toggle_expand(id).unwrap();
        assert!(tree.node(id).unwrap().is_condensed());
    }

    #[test]
    fn children_visibility_follows_parent_expansion() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let child = node(&tree, "child");
        tree.append(parent, child).unwrap();

        assert!(!tree.node(child).unwrap().is_visible());
        tree.expand(parent).unwrap();
        assert!(tree.node(child).unwrap().is_visible());
        tree.condense(parent).unwrap();
        assert!(!tree.node(child).unwrap().is_visible());
    }

    #[test]
    fn before_expand_can_populate_children() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let hook_tree = tree.clone();
        tree.on_before_expand(parent, move || {
            if hook_tree.num_children(parent).unwrap_or(0) == 0 {
                let child =
                    hook_tree.insert_node(StaticModel::new(None, "lazy"));
                hook_tree.append(parent, child).unwrap();
            }
        })
        .unwrap();

        tree.expand(parent).unwrap();

        let children = tree.children_of(parent).unwrap();
        assert_eq!(children.len(), 1);
        assert!(tree.node(children[0]).unwrap().is_visible());
    }

    #[test]
    fn refresh_fires_for_every_mutation_kind() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let child = node(&tree, "child");
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        tree.add_refresh_listener(move |refresh| sink.lock().push(refresh));

        tree.append_root(parent).unwrap();
        tree.append(parent, child).unwrap();
        tree.expand(parent).unwrap();
        tree.condense(parent).unwrap();
        tree.set_leaf(child).unwrap();
        tree.set_branch(child).unwrap();
        tree.remove(parent, child).unwrap();
        tree.remove_all(parent).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                Refresh::Roots,
                Refresh::Node(parent),
                Refresh::Node(parent),
                Refresh::Node(parent),
                Refresh::Node(child),
                Refresh::Node(child),
                Refresh::Node(parent),
                Refresh::Node(parent),
            ]
        );
    }

    #[test]
    fn noop_transitions_do_not_refresh() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        tree.add_refresh_listener(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        tree.condense(id).unwrap();
        tree.expand(id).unwrap();
        tree.expand(id).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn refresh_listener_may_query_the_tree() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let child = node(&tree, "child");
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener_tree = tree.clone();
        tree.add_refresh_listener(move |refresh| {
            if let Refresh::Node(id) = refresh {
                sink.lock().push(listener_tree.num_children(id).unwrap());
            }
        });

        tree.append(parent, child).unwrap();
        tree.remove_at(parent, 0).unwrap();

        assert_eq!(*seen.lock(), vec![1, 0]);
    }

    #[test]
    fn tap_routing_dispatches_to_handlers() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let taps = Arc::new(Mutex::new(Vec::new()));

        let record = |name: &'static str| {
            let sink = Arc::clone(&taps);
            move |event: &PointEvent| sink.lock().push((name, *event))
        };
        tree.on_icon_tapped(id, record("icon")).unwrap();
        tree.on_label_tapped(id, record("label")).unwrap();
        tree.on_tapped_secondary(id, record("secondary")).unwrap();
        tree.on_double_tapped(id, record("double")).unwrap();

        let at = PointEvent::new(3.0, 4.0);
        tree.tapped(id, TapTarget::Icon, at).unwrap();
        tree.tapped(id, TapTarget::Label, at).unwrap();
        tree.tapped_secondary(id, at).unwrap();
        tree.double_tapped(id, at).unwrap();
        tree.mouse_down(id, TapTarget::Icon, MouseButton::Right, at)
            .unwrap();
        tree.mouse_down(id, TapTarget::Label, MouseButton::Left, at)
            .unwrap();
        tree.mouse_down(id, TapTarget::Label, MouseButton::Middle, at)
            .unwrap();

        let names: Vec<&str> =
            taps.lock().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec!["icon", "label", "secondary", "double", "secondary", "label"]
        );
        assert!(taps.lock().iter().all(|(_, event)| *event == at));
    }

    #[test]
    fn handle_tap_toggles_without_handlers() {
        let tree = Tree::new();
        let id = node(&tree, "A");

        tree.tapped(id, TapTarget::Icon, PointEvent::default()).unwrap();
        assert!(tree.node(id).unwrap().is_condensed());

        tree.tapped(id, TapTarget::Handle, PointEvent::default()).unwrap();
        assert!(tree.node(id).unwrap().is_expanded());
        tree.tapped(id, TapTarget::Handle, PointEvent::default()).unwrap();
        assert!(tree.node(id).unwrap().is_condensed());
    }

    #[test]
    fn stale_and_null_ids_are_nil_arguments() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let gone = node(&tree, "gone");
        tree.release(gone).unwrap();

        assert_eq!(tree.append(parent, gone), Err(TreeError::NilArgument));
        assert_eq!(
            tree.append(parent, NodeId::null()),
            Err(TreeError::NilArgument)
        );
        assert_eq!(tree.expand(gone), Err(TreeError::NilArgument));
        assert_eq!(tree.append_root(gone), Err(TreeError::NilArgument));
        assert!(tree.node(gone).is_err());
        assert!(!tree.contains(gone));
        assert_eq!(tree.num_children(parent), Ok(0));
    }

    #[test]
    fn release_drops_the_node_from_every_list_holding_it() {
        let tree = Tree::new();
        let a = node(&tree, "a");
        let b = node(&tree, "b");
        let c = node(&tree, "c");
        tree.append_root(c).unwrap();
        tree.append(a, c).unwrap();
        tree.append(b, c).unwrap();

        tree.release(c).unwrap();

        assert_eq!(tree.children_of(a), Ok(Vec::new()));
        assert_eq!(tree.children_of(b), Ok(Vec::new()));
        assert!(tree.roots().is_empty());
    }

    #[test]
    fn release_drops_descendants_listed_elsewhere() {
        let tree = Tree::new();
        let keep = node(&tree, "keep");
        let gone = node(&tree, "gone");
        let shared = node(&tree, "shared");
        let sibling = node(&tree, "sibling");
        tree.append(keep, shared).unwrap();
        tree.append(keep, sibling).unwrap();
        tree.append(gone, shared).unwrap();

        let refreshes = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&refreshes);
        tree.add_refresh_listener(move |refresh| sink.lock().push(refresh));

        tree.release(gone).unwrap();

        assert!(!tree.contains(shared));
        assert_eq!(tree.children_of(keep), Ok(vec![sibling]));
        assert!(refreshes.lock().contains(&Refresh::Node(keep)));
    }

    #[test]
    fn expand_recovers_after_before_expand_panics() {
        let tree = Tree::new();
        let id = node(&tree, "A");
        let calls = Arc::new(AtomicUsize::new(0));
        let hook_calls = Arc::clone(&calls);
        tree.on_before_expand(id, move || {
            if hook_calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("loading children failed");
            }
        })
        .unwrap();

        let expand_tree = tree.clone();
        let unwound = std::panic::catch_unwind(
            std::panic::AssertUnwindSafe(|| expand_tree.expand(id)),
        );
        assert!(unwound.is_err());
        assert!(tree.node(id).unwrap().is_condensed());

        tree.expand(id).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(tree.node(id).unwrap().is_expanded());
    }

    #[test]
    fn failed_mutations_fire_no_refresh() {
        let tree = Tree::new();
        let parent = node(&tree, "parent");
        let child = node(&tree, "child");
        let stranger = node(&tree, "stranger");
        tree.append(parent, child).unwrap();

        let refreshes = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&refreshes);
        tree.add_refresh_listener(move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
        });

        assert!(tree.remove_at(parent, 9).is_err());
        assert_eq!(tree.remove(parent, stranger), Err(TreeError::NotFound));
        assert_eq!(
            tree.append(parent, NodeId::null()),
            Err(TreeError::NilArgument)
        );
        assert!(tree.insert_at(parent, 5, stranger).is_err());
        assert!(tree.remove_root(stranger).is_err());

        assert_eq!(refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(tree.children_of(parent), Ok(vec![child]));
    }
}
