//! Expandable tree of model-bound nodes with a lightweight [`iced`] renderer.
//!
//! This crate is split into two layers:
//! - the tree core ([`Tree`], [`ChildList`], [`TreeNodeModel`]) that is
//!   UI-agnostic and safe to drive from several threads;
//! - view helpers ([`TreeView`], [`TreeRowContext`]) that render the visible
//!   rows in `iced` and turn pointer input into host messages.
//!
//! Nodes live in an arena owned by [`Tree`] and are addressed by [`NodeId`].
//! Every mutation (insert, remove, expand, condense, leaf/branch toggle) is
//! followed by a [`Refresh`] notification, delivered with no lock held.
//!
//! # Quick Example
//!
//! ```
//! use arbor_ui_tree::{StaticModel, TapTarget, PointEvent, Tree};
//!
//! let tree = Tree::new();
//! let docs = tree.insert_node(StaticModel::new(None, "Docs"));
//! let readme = tree.insert_node(StaticModel::new(None, "README"));
//! tree.append_root(docs).unwrap();
//! tree.append(docs, readme).unwrap();
//! tree.set_leaf(readme).unwrap();
//!
//! assert_eq!(tree.visible_rows().len(), 1);
//!
//! // A tap on the expand handle toggles the branch.
//! tree.tapped(docs, TapTarget::Handle, PointEvent::default()).unwrap();
//! assert_eq!(tree.visible_rows().len(), 2);
//! assert_eq!(tree.parent_of(readme).unwrap(), Some(docs));
//! ```

mod error;
mod event;
mod flatten;
mod list;
mod model;
mod settings;
mod tree;
mod view;

pub use error::{Result, TreeError};
pub use event::{
    MouseButton, NodeEventHandler, PointEvent, Refresh, RefreshListener,
    TapHandler, TapTarget,
};
pub use flatten::VisibleRow;
pub use list::{ChildList, ListHook};
pub use model::{IconResource, StaticModel, TreeNodeModel};
pub use settings::TreeViewSettings;
pub use tree::{NodeHandle, NodeId, NodeRef, Tree};
pub use view::{TreeRowContext, TreeView};
