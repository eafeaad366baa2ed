//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Nodes live in a flat arena and refer to each other by index. Leaves
//! refer to a contiguous range of `indices`, which in turn index the
//! primitive slice the tree was built over. The tree does not own the
//! primitives, so every query is handed the same slice again.

use crate::primitive::{Intersection, Primitive};
use rayon::prelude::*;
use verdant_math::{Aabb, Interval, Ray, Vec3};

/// Maximum primitives per leaf node before splitting.
pub const DEFAULT_LEAF_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
#[derive(Debug, Clone, Copy)]
enum BvhNode {
    /// Internal node with two children.
    Branch { bbox: Aabb, left: u32, right: u32 },
    /// Leaf node covering `indices[start..end]`.
    Leaf { bbox: Aabb, start: u32, end: u32 },
}

impl BvhNode {
    #[inline]
    fn bbox(&self) -> &Aabb {
        match self {
            BvhNode::Branch { bbox, .. } | BvhNode::Leaf { bbox, .. } => bbox,
        }
    }
}

/// Per-primitive data needed while building.
#[derive(Debug, Clone, Copy)]
struct BuildItem {
    bbox: Aabb,
    centroid: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    indices: Vec<u32>,
    root: Option<u32>,
}

impl Bvh {
    /// Build a BVH over `primitives`, splitting until a node holds at most
    /// `leaf_size` items.
    pub fn build(primitives: &[Primitive], leaf_size: usize) -> Self {
        let leaf_size = leaf_size.max(1);
        if primitives.is_empty() {
            return Self::default();
        }

        let items: Vec<BuildItem> = primitives
            .par_iter()
            .map(|p| {
                let bbox = p.bounding_box();
                BuildItem {
                    bbox,
                    centroid: bbox.centroid(),
                }
            })
            .collect();

        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * primitives.len() / leaf_size + 1),
            indices: (0..primitives.len() as u32).collect(),
            root: None,
        };
        let root = bvh.build_range(&items, 0, primitives.len(), leaf_size);
        bvh.root = Some(root);

        log::debug!(
            "BVH built: {} primitives, {} nodes, {} leaves (leaf size {})",
            primitives.len(),
            bvh.nodes.len(),
            bvh.leaf_count(),
            leaf_size
        );
        bvh
    }

    /// Recursive construction over `indices[start..end]`. Children are
    /// pushed before their parent, so the returned index is the subtree root.
    fn build_range(&mut self, items: &[BuildItem], start: usize, end: usize, leaf_size: usize) -> u32 {
        let range = &mut self.indices[start..end];

        let mut bounds = Aabb::EMPTY;
        let mut centroid_bounds = Aabb::EMPTY;
        for &i in range.iter() {
            let item = &items[i as usize];
            bounds = Aabb::surrounding(&bounds, &item.bbox);
            centroid_bounds = centroid_bounds.include_point(item.centroid);
        }

        let n = end - start;
        if n <= leaf_size {
            return self.push(BvhNode::Leaf {
                bbox: bounds,
                start: start as u32,
                end: end as u32,
            });
        }

        // Split at the midpoint of the widest centroid extent
        let axis = centroid_bounds.longest_axis();
        let extent = centroid_bounds.axis_interval(axis);
        let midpoint = 0.5 * (extent.min + extent.max);
        let key = |i: u32| items[i as usize].centroid[axis];

        let mut split = partition(range, |&i| key(i) < midpoint);

        // Every centroid landed on one side (coincident centroids); fall back
        // to an even split by order along the axis
        if split == 0 || split == n {
            split = n / 2;
            range.select_nth_unstable_by(split, |&a, &b| key(a).total_cmp(&key(b)));
        }

        let left = self.build_range(items, start, start + split, leaf_size);
        let right = self.build_range(items, start + split, end, leaf_size);
        self.push(BvhNode::Branch {
            bbox: bounds,
            left,
            right,
        })
    }

    fn push(&mut self, node: BvhNode) -> u32 {
        self.nodes.push(node);
        (self.nodes.len() - 1) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, BvhNode::Leaf { .. }))
            .count()
    }

    /// Bounds of everything in the tree; [`Aabb::EMPTY`] when empty.
    pub fn bounding_box(&self) -> Aabb {
        self.root
            .map_or(Aabb::EMPTY, |root| *self.nodes[root as usize].bbox())
    }

    /// Closest hit within `ray_t`.
    ///
    /// `primitives` must be the slice the tree was built from.
    pub fn intersect<'a>(
        &self,
        primitives: &'a [Primitive],
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<Intersection<'a>> {
        let root = self.root?;
        self.intersect_node(root, primitives, ray, ray_t)
    }

    fn intersect_node<'a>(
        &self,
        node: u32,
        primitives: &'a [Primitive],
        ray: &Ray,
        ray_t: Interval,
    ) -> Option<Intersection<'a>> {
        let node = &self.nodes[node as usize];
        if !node.bbox().hit(ray, ray_t) {
            return None;
        }

        match *node {
            BvhNode::Leaf { start, end, .. } => {
                let mut closest = None;
                let mut closest_t = ray_t.max;
                for &i in &self.indices[start as usize..end as usize] {
                    if let Some(hit) = primitives[i as usize].intersect(ray, ray_t.with_max(closest_t)) {
                        closest_t = hit.t;
                        closest = Some(hit);
                    }
                }
                closest
            }
            BvhNode::Branch { left, right, .. } => {
                // Boxes may overlap, so both children are always visited; the
                // right child only needs to beat the left child's hit
                let hit_left = self.intersect_node(left, primitives, ray, ray_t);
                let right_t = hit_left.map_or(ray_t, |h| ray_t.with_max(h.t));
                let hit_right = self.intersect_node(right, primitives, ray, right_t);
                hit_right.or(hit_left)
            }
        }
    }
}

/// Move every element matching `pred` to the front; returns how many matched.
fn partition<T>(items: &mut [T], mut pred: impl FnMut(&T) -> bool) -> usize {
    let mut split = 0;
    for i in 0..items.len() {
        if pred(&items[i]) {
            items.swap(i, split);
            split += 1;
        }
    }
    split
}
