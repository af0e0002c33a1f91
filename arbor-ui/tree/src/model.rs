use std::fmt;
use std::sync::Arc;

use crate::tree::NodeHandle;

/// Named, immutable icon payload supplied by a model.
///
/// The tree never decodes the content; renderers decide how to draw it (for
/// example as an SVG or raster image handle).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct IconResource {
    name: Arc<str>,
    content: Arc<[u8]>,
}

impl IconResource {
    pub fn new(
        name: impl Into<Arc<str>>,
        content: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    pub fn from_static(name: &'static str, content: &'static [u8]) -> Self {
        Self::new(name, content)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }
}

impl fmt::Debug for IconResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconResource")
            .field("name", &self.name)
            .field("len", &self.content.len())
            .finish()
    }
}

/// Contract between host data and the tree.
///
/// The tree only reads from the model and never mutates it. Models are shared
/// between the host and the node, so they are held behind an `Arc`.
pub trait TreeNodeModel: Send + Sync + 'static {
    /// Icon shown next to the label, or `None` when no icon is needed.
    fn icon(&self) -> Option<IconResource>;

    /// Text displayed for the node. Also the key for sorted insertion.
    fn text(&self) -> String;

    /// Called exactly once while the node is created, before its id is
    /// handed to the caller. Models that need to drive tree operations on
    /// themselves (open a context menu, lazily load children) keep the
    /// handle.
    fn bind(&self, node: NodeHandle<Self>)
    where
        Self: Sized,
    {
        let _ = node;
    }
}

/// Minimal model with a fixed label and optional icon.
#[derive(Debug, Clone, Default)]
pub struct StaticModel {
    text: String,
    icon: Option<IconResource>,
}

impl StaticModel {
    pub fn new(icon: Option<IconResource>, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            icon,
        }
    }
}

impl TreeNodeModel for StaticModel {
    fn icon(&self) -> Option<IconResource> {
        self.icon.clone()
    }

    fn text(&self) -> String {
        self.text.clone()
    }
}
