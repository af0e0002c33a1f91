use std::collections::HashSet;

use crate::model::TreeNodeModel;
use crate::tree::{NodeId, Tree};

/// One row a renderer should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRow {
    pub id: NodeId,
    /// Zero-based tree depth (`0` for root-level rows).
    pub depth: usize,
}

impl<M: TreeNodeModel> Tree<M> {
    /// Flatten the tree into a depth-first list of visible rows.
    ///
    /// Roots are always listed; children are included only below expanded
    /// branches. Rows keep the order of the underlying child lists. A node
    /// reachable twice (possible because re-parenting never auto-detaches)
    /// is listed once.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        let mut visited = HashSet::new();
        for root in self.roots() {
            self.push_row(root, 0, &mut visited, &mut rows);
        }
        rows
    }

    fn push_row(
        &self,
        id: NodeId,
        depth: usize,
        visited: &mut HashSet<NodeId>,
        rows: &mut Vec<VisibleRow>,
    ) {
        if !visited.insert(id) {
            return;
        }
        let Ok(node) = self.node(id) else {
            return;
        };

        rows.push(VisibleRow { id, depth });

        if node.is_branch() && node.is_expanded() {
            for child in node.children() {
                self.push_row(child, depth + 1, visited, rows);
            }
        }
    }
}
