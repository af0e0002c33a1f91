use std::sync::Arc;

use crate::tree::NodeId;

/// Pointer position delivered with tap interactions, relative to the tapped
/// part of the row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointEvent {
    pub x: f32,
    pub y: f32,
}

impl PointEvent {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Part of a rendered row that received an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapTarget {
    /// The expand/condense affordance. Always toggles expansion.
    Handle,
    Icon,
    Label,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Payload of the "model changed" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Refresh {
    /// State or children of this node changed.
    Node(NodeId),
    /// The root container changed.
    Roots,
}

/// Zero-argument hook such as `before_expand` or `after_condense`.
pub type NodeEventHandler = Arc<dyn Fn() + Send + Sync>;

/// Handler for tap-like interactions.
pub type TapHandler = Arc<dyn Fn(&PointEvent) + Send + Sync>;

/// Subscriber of [`Refresh`] notifications.
pub type RefreshListener = Arc<dyn Fn(Refresh) + Send + Sync>;
