use arrayvec::ArrayVec;

use crate::{
    geometry::{FloatType, Ray, Segment},
    tracer::TraceEpsilons,
};

use super::{MAX_TREE_DEPTH, Node, NodeIdx, SahTree};

/// Far child waiting to be visited, with the end of its part of the segment.
#[derive(Copy, Clone, Debug)]
struct StackEntry {
    node: NodeIdx,
    end: FloatType,
}

impl SahTree {
    /// Walks the leaves pierced by the ray in front to back order.
    ///
    /// `intersect_leaf` gets the objects of each visited leaf together with the part of the
    /// segment inside that leaf, and returns true if it found a hit (narrowing the segment).
    /// The walk stops at the first leaf with a hit, since every leaf after it is further away.
    /// On return `segment.max` is the hit parameter if there was a hit, `segment.min` is
    /// moved along the ray in both cases.
    pub fn traverse<F>(
        &self,
        ray: &Ray,
        segment: &mut Segment,
        epsilons: &TraceEpsilons,
        mut intersect_leaf: F,
    ) -> bool
    where
        F: FnMut(&[u32], &mut Segment) -> bool,
    {
        self.traverse_subtree(self.root(), ray, segment, epsilons, &mut intersect_leaf)
    }

    fn traverse_subtree<F>(
        &self,
        subtree: NodeIdx,
        ray: &Ray,
        segment: &mut Segment,
        epsilons: &TraceEpsilons,
        intersect_leaf: &mut F,
    ) -> bool
    where
        F: FnMut(&[u32], &mut Segment) -> bool,
    {
        let mut stack = ArrayVec::<StackEntry, MAX_TREE_DEPTH>::new();
        let mut node = subtree;

        loop {
            let found = match self.nodes[node] {
                Node::Leaf { .. } => {
                    let objects = self.leaf_objects(node);
                    !objects.is_empty() && intersect_leaf(objects, segment)
                }
                Node::Inner { axis, split, left } => {
                    let axis = axis as usize;
                    let right = left + 1;
                    let direction = ray.direction[axis];
                    let parallel = direction.abs() <= epsilons.direction;

                    if parallel && (ray.origin[axis] - split).abs() <= epsilons.node {
                        // Ray lies in the plane, objects touching it from either side count
                        self.traverse_in_plane(left, ray, segment, epsilons, intersect_leaf)
                    } else {
                        let (d, front, back) = if !parallel {
                            let d = (split - ray.origin[axis]) / direction;
                            if direction > 0.0 {
                                (d, left, right)
                            } else {
                                (d, right, left)
                            }
                        } else if ray.origin[axis] < split {
                            // Parallel to the plane, never crosses it
                            (FloatType::MAX, left, right)
                        } else {
                            (-FloatType::MAX, left, right)
                        };

                        let tolerance = epsilons.node + epsilons.node * d.abs();
                        if d < segment.min - tolerance {
                            node = back;
                        } else if segment.max + tolerance < d {
                            node = front;
                        } else {
                            stack.push(StackEntry {
                                node: back,
                                end: segment.max,
                            });
                            segment.max = d;
                            node = front;
                        }
                        continue;
                    }
                }
            };

            if found {
                return true;
            }

            let Some(entry) = stack.pop() else {
                return false;
            };
            node = entry.node;
            segment.min = segment.max;
            segment.max = entry.end;
        }
    }

    /// Walks both children of a node whose split plane contains the ray.
    ///
    /// The children overlap along the whole segment, so the second one is searched up to
    /// the hit in the first. Any hit it reports is at least as near, and `intersect_leaf`
    /// sees it last.
    fn traverse_in_plane<F>(
        &self,
        left: NodeIdx,
        ray: &Ray,
        segment: &mut Segment,
        epsilons: &TraceEpsilons,
        intersect_leaf: &mut F,
    ) -> bool
    where
        F: FnMut(&[u32], &mut Segment) -> bool,
    {
        let mut left_segment = *segment;
        let left_found = self.traverse_subtree(left, ray, &mut left_segment, epsilons, intersect_leaf);

        let right_end = if left_found {
            left_segment.max
        } else {
            segment.max
        };
        let mut right_segment = Segment::new(segment.min, right_end);
        let right_found =
            self.traverse_subtree(left + 1, ray, &mut right_segment, epsilons, intersect_leaf);

        if right_found {
            segment.max = right_segment.max;
        } else if left_found {
            segment.max = left_segment.max;
        }
        left_found || right_found
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        geometry::{
            Triangle, WorldPoint, WorldVector, clip_segment,
            test::{NonzeroWorldVectorWrapper, TriangleWrapper, WorldPointWrapper},
        },
        tree::{
            TreeSettings,
            test::{TriangleSoup, triangle_grid},
        },
    };
    use assert2::{assert, let_assert};
    use test_strategy::proptest;

    fn trace_tree(soup: &TriangleSoup, tree: &SahTree, ray: &Ray) -> Option<(u32, f32)> {
        let mut segment = Segment::new(0.0, FloatType::MAX);
        clip_segment(&mut segment, ray, tree.bounding_box());
        if segment.is_empty_strict() {
            return None;
        }

        let mut found = None;
        let hit = tree.traverse(ray, &mut segment, &TraceEpsilons::default(), |objects, segment| {
            let mut hit = false;
            for &object in objects {
                if soup.accels[object as usize]
                    .intersect(ray, segment, 1e-6)
                    .is_some()
                {
                    found = Some(object);
                    hit = true;
                }
            }
            hit
        });

        if hit {
            found.map(|object| (object, segment.max))
        } else {
            None
        }
    }

    fn trace_brute_force(soup: &TriangleSoup, ray: &Ray) -> Option<(u32, f32)> {
        let mut segment = Segment::new(0.0, FloatType::MAX);
        let mut found = None;
        for (object, accel) in soup.accels.iter().enumerate() {
            if accel.intersect(ray, &mut segment, 1e-6).is_some() {
                found = Some(object as u32);
            }
        }
        found.map(|object| (object, segment.max))
    }

    #[test]
    fn finds_front_layer() {
        let soup = TriangleSoup::new(triangle_grid(8, &[0.0, 2.0, 4.0]));
        let tree = soup.build(&TreeSettings::default());

        let ray = Ray::new(
            WorldPoint::new(3.2, 5.2, 10.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let_assert!(Some((object, t)) = trace_tree(&soup, &tree, &ray));
        // Third layer starts at index 128, cell (3, 5)
        assert!(object == 128 + 3 * 8 + 5);
        assert!((t - 6.0).abs() < 1e-4);

        let reverse = Ray::new(
            WorldPoint::new(3.2, 5.2, -10.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let_assert!(Some((object, t)) = trace_tree(&soup, &tree, &reverse));
        assert!(object == 3 * 8 + 5);
        assert!((t - 10.0).abs() < 1e-4);
    }

    #[test]
    fn axis_parallel_ray_between_cells_misses() {
        let soup = TriangleSoup::new(triangle_grid(8, &[0.0, 2.0]));
        let tree = soup.build(&TreeSettings::default());

        let ray = Ray::new(
            WorldPoint::new(3.9, 5.9, 10.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        assert!(trace_tree(&soup, &tree, &ray).is_none());
    }

    #[test]
    fn ray_along_layer() {
        let soup = TriangleSoup::new(triangle_grid(8, &[0.0, 2.0]));
        let tree = soup.build(&TreeSettings::default());

        // Runs through the gaps of the grid, parallel to the split planes
        let ray = Ray::new(
            WorldPoint::new(-5.0, 0.9, 1.0),
            WorldVector::new(1.0, 0.0, 0.0),
        );
        assert!(trace_tree(&soup, &tree, &ray).is_none());
    }

    fn triangle(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> Triangle<WorldPoint> {
        Triangle::new(a.into(), b.into(), c.into())
    }

    #[test]
    fn ray_in_split_plane_hits_edge_on_left() {
        // Equal costs at x = 1 and x = 3, the root splits at x = 1 with the
        // first triangle's edge lying in the plane
        let soup = TriangleSoup::new(vec![
            triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
            triangle([3.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 1.0, 0.0]),
        ]);
        let tree = soup.build(&TreeSettings::default());
        let_assert!(Node::Inner { axis: 0, split, .. } = tree.node(tree.root()));
        assert!(*split == 1.0);

        let ray = Ray::new(
            WorldPoint::new(1.0, 0.5, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let_assert!(Some((0, t)) = trace_brute_force(&soup, &ray));
        assert!(t == 5.0);
        let_assert!(Some((0, t)) = trace_tree(&soup, &tree, &ray));
        assert!(t == 5.0);
    }

    #[test]
    fn ray_in_split_plane_finds_nearest_side() {
        // Edges of both triangles lie in x = 1, one on each side at different depths
        let soup = TriangleSoup::new(vec![
            triangle([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]),
            triangle([1.0, 0.0, 2.0], [2.0, 0.0, 2.0], [1.0, 1.0, 2.0]),
            triangle([3.0, 0.0, 0.0], [4.0, 0.0, 0.0], [4.0, 1.0, 0.0]),
        ]);
        let tree = soup.build(&TreeSettings::default());

        let down = Ray::new(
            WorldPoint::new(1.0, 0.5, 5.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let_assert!(Some((1, t)) = trace_tree(&soup, &tree, &down));
        assert!((t - 3.0).abs() < 1e-5);

        let up = Ray::new(
            WorldPoint::new(1.0, 0.5, -5.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );
        let_assert!(Some((0, t)) = trace_tree(&soup, &tree, &up));
        assert!((t - 5.0).abs() < 1e-5);
    }

    #[proptest(cases = 128)]
    fn matches_brute_force(
        #[strategy(proptest::collection::vec(proptest::prelude::any::<TriangleWrapper>(), 1..40))]
        triangles: Vec<TriangleWrapper>,
        origin: WorldPointWrapper,
        direction: NonzeroWorldVectorWrapper,
    ) {
        let soup = TriangleSoup::new(triangles.into_iter().map(|t| t.0).collect());
        let tree = soup.build(&TreeSettings::default());
        let ray = Ray::new(*origin, direction.normalize());

        let expected = trace_brute_force(&soup, &ray);
        let actual = trace_tree(&soup, &tree, &ray);

        match (expected, actual) {
            (None, None) => {}
            (Some((_, expected_t)), Some((_, actual_t))) => {
                assert!((expected_t - actual_t).abs() < 1e-3 * expected_t.max(1.0));
            }
            (expected, actual) => {
                assert!(expected == actual, "tree and brute force disagree");
            }
        }
    }
}
