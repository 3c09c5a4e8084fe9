//! Node pool and open list used by the cell searches
//!
//! Nodes are allocated from a [`PathNodePool`] and referenced by [`NodeId`].
//! A node's G cost is the sum of the local costs along its parent chain, so
//! re-parenting a node updates its cost without touching any other node.

use std::collections::{HashMap, HashSet};

use crate::{CellId, TriCell};
use nav_common::Vec3;

/// Index of a node within its [`PathNodePool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

#[derive(Debug, Clone)]
struct PathNode {
    cell: CellId,
    parent: Option<NodeId>,
    /// Cost from the parent to this node
    local_g: f32,
    /// Estimated cost from this node to the goal
    h: f32,
}

/// Storage for the nodes of a single search
#[derive(Debug, Default)]
pub(crate) struct PathNodePool {
    nodes: Vec<PathNode>,
}

impl PathNodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every node, keeping the allocation for reuse
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Adds a node without a parent
    pub fn add_root(&mut self, cell: CellId) -> NodeId {
        self.push(PathNode {
            cell,
            parent: None,
            local_g: 0.0,
            h: 0.0,
        })
    }

    /// Adds a node reached from `parent` through the parent cell's `exit_wall`.
    pub fn add_child(
        &mut self,
        cell: CellId,
        parent: NodeId,
        parent_cell: &TriCell,
        exit_wall: usize,
        start: Vec3,
    ) -> NodeId {
        let local_g = self.local_g(parent, parent_cell, exit_wall, start);
        self.push(PathNode {
            cell,
            parent: Some(parent),
            local_g,
            h: 0.0,
        })
    }

    fn push(&mut self, node: PathNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn cell(&self, node: NodeId) -> CellId {
        self.nodes[node.0].cell
    }

    pub fn set_h(&mut self, node: NodeId, h: f32) {
        self.nodes[node.0].h = h;
    }

    /// Total cost from the search start to `node`
    pub fn g(&self, node: NodeId) -> f32 {
        let mut total = 0.0;
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.0];
            total += n.local_g;
            current = n.parent;
        }
        total
    }

    /// Estimated total cost of a path through `node`
    pub fn f(&self, node: NodeId) -> f32 {
        self.g(node) + self.nodes[node.0].h
    }

    /// Number of cells in the path ending at `node`
    pub fn path_size(&self, node: NodeId) -> usize {
        let mut size = 0;
        let mut current = Some(node);
        while let Some(id) = current {
            size += 1;
            current = self.nodes[id.0].parent;
        }
        size
    }

    /// G cost `node` would have if it were reached from `parent` instead
    pub fn estimate_new_g(
        &self,
        parent: NodeId,
        parent_cell: &TriCell,
        exit_wall: usize,
        start: Vec3,
    ) -> f32 {
        self.g(parent) + self.local_g(parent, parent_cell, exit_wall, start)
    }

    pub fn set_parent(
        &mut self,
        node: NodeId,
        parent: NodeId,
        parent_cell: &TriCell,
        exit_wall: usize,
        start: Vec3,
    ) {
        let local_g = self.local_g(parent, parent_cell, exit_wall, start);
        let n = &mut self.nodes[node.0];
        n.parent = Some(parent);
        n.local_g = local_g;
    }

    /// Cost of crossing the parent's cell toward `exit_wall`.
    ///
    /// From the root this is the straight distance from the start point to
    /// the exit wall's midpoint. Otherwise it is the distance between the
    /// midpoints of the wall the parent was entered through and the exit wall.
    fn local_g(&self, parent: NodeId, parent_cell: &TriCell, exit_wall: usize, start: Vec3) -> f32 {
        let entry_wall = self.nodes[parent.0]
            .parent
            .and_then(|grandparent| parent_cell.link_index(self.nodes[grandparent.0].cell));
        match entry_wall {
            Some(entry_wall) => parent_cell.midpoint_distance(entry_wall, exit_wall),
            None => parent_cell.midpoint_distance_sq(start, exit_wall).sqrt(),
        }
    }

    /// Cells from the root to `node`, inclusive
    pub fn load_path(&self, node: NodeId) -> Vec<CellId> {
        let mut path = Vec::with_capacity(self.path_size(node));
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.0];
            path.push(n.cell);
            current = n.parent;
        }
        path.reverse();
        path
    }
}

/// Binary min-heap of nodes ordered by F cost
///
/// Nodes with equal cost are not reordered, so ties go to whichever node
/// reached its position first.
#[derive(Debug, Default)]
pub(crate) struct PathNodeHeap {
    heap: Vec<NodeId>,
}

impl PathNodeHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[cfg(test)]
    pub fn peek(&self) -> Option<NodeId> {
        self.heap.first().copied()
    }

    pub fn add(&mut self, pool: &PathNodePool, node: NodeId) {
        self.heap.push(node);
        self.restack_toward_root(pool, self.heap.len() - 1);
    }

    /// Removes and returns the node with the lowest F cost
    pub fn poll(&mut self, pool: &PathNodePool) -> Option<NodeId> {
        if self.heap.is_empty() {
            return None;
        }
        let result = self.heap.swap_remove(0);
        if !self.heap.is_empty() {
            self.restack_toward_leaf(pool, 0);
        }
        Some(result)
    }

    /// Restores heap order after the cost of `node` changed
    pub fn restack(&mut self, pool: &PathNodePool, node: NodeId) {
        let Some(index) = self.heap.iter().position(|&n| n == node) else {
            return;
        };
        if self.restack_toward_root(pool, index) != index {
            return;
        }
        self.restack_toward_leaf(pool, index);
    }

    fn restack_toward_root(&mut self, pool: &PathNodePool, mut index: usize) -> usize {
        while index > 0 {
            let parent = (index - 1) / 2;
            if pool.f(self.heap[index]) >= pool.f(self.heap[parent]) {
                break;
            }
            self.heap.swap(index, parent);
            index = parent;
        }
        index
    }

    fn restack_toward_leaf(&mut self, pool: &PathNodePool, mut index: usize) {
        loop {
            let left = index * 2 + 1;
            let right = left + 1;
            let mut selected = index;
            if left < self.heap.len() && pool.f(self.heap[index]) > pool.f(self.heap[left]) {
                selected = left;
            }
            if right < self.heap.len() && pool.f(self.heap[selected]) > pool.f(self.heap[right]) {
                selected = right;
            }
            if selected == index {
                break;
            }
            self.heap.swap(index, selected);
            index = selected;
        }
    }
}

/// Open and closed sets shared by the searches
#[derive(Debug, Default)]
pub(crate) struct SearchFrontier {
    pub pool: PathNodePool,
    open: PathNodeHeap,
    open_map: HashMap<CellId, NodeId>,
    closed: HashSet<CellId>,
}

impl SearchFrontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.pool.clear();
        self.open.clear();
        self.open_map.clear();
        self.closed.clear();
    }

    pub fn is_open_empty(&self) -> bool {
        self.open.is_empty()
    }

    pub fn push_root(&mut self, cell: CellId) {
        let root = self.pool.add_root(cell);
        self.open.add(&self.pool, root);
        self.open_map.insert(cell, root);
    }

    /// Takes the cheapest open node and closes its cell
    pub fn pop(&mut self) -> Option<NodeId> {
        let node = self.open.poll(&self.pool)?;
        let cell = self.pool.cell(node);
        self.closed.insert(cell);
        self.open_map.remove(&cell);
        Some(node)
    }

    pub fn is_closed(&self, cell: CellId) -> bool {
        self.closed.contains(&cell)
    }

    pub fn close(&mut self, cell: CellId) {
        self.closed.insert(cell);
    }

    /// Opens `linked` as a child of `current`, or re-parents it if it is
    /// already open and the route through `current` is cheaper.
    pub fn relax(
        &mut self,
        current: NodeId,
        current_cell: &TriCell,
        linked: CellId,
        exit_wall: usize,
        start: Vec3,
        heuristic: impl FnOnce() -> f32,
    ) {
        if let Some(&entry) = self.open_map.get(&linked) {
            let new_g = self.pool.estimate_new_g(current, current_cell, exit_wall, start);
            if new_g < self.pool.g(entry) {
                self.pool.set_parent(entry, current, current_cell, exit_wall, start);
                self.open.restack(&self.pool, entry);
            }
        } else {
            let entry = self.pool.add_child(linked, current, current_cell, exit_wall, start);
            self.pool.set_h(entry, heuristic());
            self.open.add(&self.pool, entry);
            self.open_map.insert(linked, entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_mesh_helpers::corridor_cells;

    /// Two-step nodes (cell -> neighbor -> neighbor's neighbor) for every
    /// pair of links in the corridor mesh, rooted at the first cell's centroid.
    fn build_nodes(cells: &[TriCell], pool: &mut PathNodePool) -> Vec<NodeId> {
        let mut nodes = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            for wall in 0..3 {
                let Some(child_cell) = cell.links()[wall] else {
                    break;
                };
                let child_tri = &cells[child_cell.index()];
                for next_wall in 0..3 {
                    let Some(grandchild_cell) = child_tri.links()[next_wall] else {
                        break;
                    };
                    let start = cell.centroid();
                    let root = pool.add_root(CellId(i));
                    let child = pool.add_child(child_cell, root, cell, wall, start);
                    let grandchild =
                        pool.add_child(grandchild_cell, child, child_tri, next_wall, start);
                    nodes.push(grandchild);
                    nodes.push(child);
                }
            }
        }
        nodes
    }

    #[test]
    fn test_costs() {
        let cells = corridor_cells();
        let mut pool = PathNodePool::new();
        let start = cells[0].centroid();
        let root = pool.add_root(CellId(0));
        assert_eq!(pool.g(root), 0.0);
        assert_eq!(pool.path_size(root), 1);

        // Cell 0 links to cell 1 across wall 0 and cell 1 links to cell 2 across wall 1.
        let child = pool.add_child(CellId(1), root, &cells[0], 0, start);
        let expected = start.distance(cells[0].wall_midpoint(0).unwrap());
        assert!((pool.g(child) - expected).abs() < 1e-5);

        let grandchild = pool.add_child(CellId(2), child, &cells[1], 1, start);
        let expected_gc = expected + cells[1].link_point_distance(2, 1).unwrap();
        assert!((pool.g(grandchild) - expected_gc).abs() < 1e-5);

        pool.set_h(grandchild, 2.5);
        assert!((pool.f(grandchild) - (expected_gc + 2.5)).abs() < 1e-5);
        assert_eq!(pool.path_size(grandchild), 3);
        assert_eq!(
            pool.load_path(grandchild),
            vec![CellId(0), CellId(1), CellId(2)]
        );

        // Re-parent the grandchild directly onto the root.
        let new_g = pool.estimate_new_g(root, &cells[0], 0, start);
        pool.set_parent(grandchild, root, &cells[0], 0, start);
        assert!((pool.g(grandchild) - new_g).abs() < 1e-5);
        assert_eq!(pool.path_size(grandchild), 2);
    }

    #[test]
    fn test_heap_basics() {
        let cells = corridor_cells();
        let mut pool = PathNodePool::new();
        let nodes = build_nodes(&cells, &mut pool);
        assert!(nodes.len() > 7);

        let mut heap = PathNodeHeap::new();
        assert!(heap.is_empty());
        assert_eq!(heap.peek(), None);
        assert_eq!(heap.poll(&pool), None);

        let mut expected_root = nodes[0];
        for (i, &node) in nodes.iter().enumerate() {
            heap.add(&pool, node);
            assert_eq!(heap.len(), i + 1);
            if pool.f(node) < pool.f(expected_root) {
                expected_root = node;
            }
            assert_eq!(heap.peek(), Some(expected_root));
        }

        heap.clear();
        assert!(heap.is_empty());
        assert_eq!(heap.poll(&pool), None);
    }

    #[test]
    fn test_heap_poll_order() {
        let cells = corridor_cells();
        let mut pool = PathNodePool::new();
        let nodes = build_nodes(&cells, &mut pool);

        let mut heap = PathNodeHeap::new();
        for &node in &nodes {
            heap.add(&pool, node);
        }

        let mut last = f32::MIN;
        let mut polled = 0;
        while let Some(node) = heap.poll(&pool) {
            let f = pool.f(node);
            assert!(f >= last);
            last = f;
            polled += 1;
        }
        assert_eq!(polled, nodes.len());
    }

    #[test]
    fn test_heap_restack() {
        let cells = corridor_cells();
        let mut pool = PathNodePool::new();
        let nodes = build_nodes(&cells, &mut pool);

        let mut heap = PathNodeHeap::new();
        let mut max_f = 0.0f32;
        let mut min_f = f32::MAX;
        for &node in &nodes {
            heap.add(&pool, node);
            max_f = max_f.max(pool.f(node));
            min_f = min_f.min(pool.f(node));
        }

        // Push the root down, then pull a leaf up.
        let root = heap.peek().unwrap();
        pool.set_h(root, max_f + 1.0);
        heap.restack(&pool, root);
        assert_ne!(heap.peek(), Some(root));

        let target = nodes[nodes.len() / 2];
        pool.set_h(target, -(max_f + min_f + 100.0));
        heap.restack(&pool, target);
        assert_eq!(heap.peek(), Some(target));

        let mut last = f32::MIN;
        while let Some(node) = heap.poll(&pool) {
            assert!(pool.f(node) >= last);
            last = pool.f(node);
        }
    }
}
