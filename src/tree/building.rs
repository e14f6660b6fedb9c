use assert2::debug_assert;
use index_vec::IndexVec;
use itertools::Itertools as _;
use ordered_float::OrderedFloat;

use crate::geometry::{FloatType, WorldBox};

use super::{Clipper, MAX_TREE_DEPTH, Node, NodeIdx, SahTree, TreeSettings};

impl SahTree {
    /// Builds the tree over objects `0..object_count`, bounding boxes are obtained from the clipper.
    pub fn compile<C: Clipper>(object_count: usize, clipper: &C, settings: &TreeSettings) -> SahTree {
        let boxes: Vec<WorldBox> = (0..object_count as u32)
            .map(|object| clipper.bounding_box(object))
            .collect();
        Self::compile_with_boxes(&boxes, clipper, settings)
    }

    /// Builds the tree over objects `0..boxes.len()` with precomputed bounding boxes.
    /// Objects with empty boxes are left out.
    pub fn compile_with_boxes<C: Clipper>(
        boxes: &[WorldBox],
        clipper: &C,
        settings: &TreeSettings,
    ) -> SahTree {
        let mut bounding_box = WorldBox::empty();
        let mut events = Vec::with_capacity(6 * boxes.len());
        for (object, object_box) in boxes.iter().enumerate() {
            if object_box.is_empty() {
                log::debug!("Object {object} has an empty bounding box, leaving it out");
                continue;
            }
            bounding_box.extend_box(object_box);
            generate_events(
                &mut events,
                object_box,
                object as u32,
                settings.same_position_eps,
            );
        }
        events.sort_unstable_by_key(Event::sort_key);

        let mut builder = TreeBuilder {
            clipper,
            boxes,
            settings,
            max_depth: settings.max_depth.min(MAX_TREE_DEPTH),
            sides: vec![Side::Left; boxes.len()],
            nodes: IndexVec::new(),
            objects: Vec::new(),
        };

        let root = builder.nodes.push(Node::EMPTY_LEAF);
        builder.build_node(root, events, bounding_box.clone(), 0);

        let tree = SahTree {
            bounding_box,
            nodes: builder.nodes,
            objects: builder.objects,
        };
        log::debug!(
            "Built tree over {} objects: {} nodes, {} leaf references",
            boxes.len(),
            tree.nodes.len(),
            tree.objects.len()
        );
        tree
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    End,
    Flat,
    Begin,
}

/// Potential split plane position generated by an object's bounding box.
#[derive(Copy, Clone, Debug)]
struct Event {
    position: FloatType,
    axis: u8,
    kind: EventKind,
    object: u32,
}

impl Event {
    /// Events are ordered by position, then axis, then kind (End < Flat < Begin).
    fn sort_key(&self) -> (OrderedFloat<FloatType>, u8, EventKind) {
        (OrderedFloat(self.position), self.axis, self.kind)
    }

    /// Events that appear exactly once per object in a node.
    fn is_object_start(&self) -> bool {
        self.axis == 0 && self.kind != EventKind::End
    }
}

/// Side of the split plane where an object ends up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Side {
    Left,
    Right,
    Both,
}

#[derive(Clone, Debug)]
struct Split {
    cost: FloatType,
    axis: usize,
    position: FloatType,
    flat_side: Side,
}

struct TreeBuilder<'a, C: Clipper> {
    clipper: &'a C,
    boxes: &'a [WorldBox],
    settings: &'a TreeSettings,
    max_depth: usize,

    /// Classification of objects relative to the current split, indexed by object
    sides: Vec<Side>,

    nodes: IndexVec<NodeIdx, Node>,
    objects: Vec<u32>,
}

impl<C: Clipper> TreeBuilder<'_, C> {
    fn build_node(&mut self, node: NodeIdx, events: Vec<Event>, node_box: WorldBox, depth: usize) {
        let object_count = events.iter().filter(|e| e.is_object_start()).count();

        if depth >= self.max_depth || object_count == 0 {
            self.build_leaf(node, &events);
            return;
        }

        let split = self.find_split(&events, &node_box, object_count);
        let leaf_cost = self.settings.intersection_cost * object_count as FloatType;
        if !(split.cost < leaf_cost) {
            self.build_leaf(node, &events);
            return;
        }

        self.classify(&events, &split);

        let mut left_box = node_box.clone();
        let mut right_box = node_box;
        left_box.set_max(split.axis, split.position);
        right_box.set_min(split.axis, split.position);

        let (left_events, right_events) = self.distribute(events, &left_box, &right_box);

        let left = self.nodes.push(Node::EMPTY_LEAF);
        let right = self.nodes.push(Node::EMPTY_LEAF);
        debug_assert!(right == left + 1);

        self.nodes[node] = Node::Inner {
            axis: split.axis as u8,
            split: split.position,
            left,
        };

        // Smaller child first, the larger event list waits in the meantime
        if left_events.len() < right_events.len() {
            self.build_node(left, left_events, left_box, depth + 1);
            self.build_node(right, right_events, right_box, depth + 1);
        } else {
            self.build_node(right, right_events, right_box, depth + 1);
            self.build_node(left, left_events, left_box, depth + 1);
        }
    }

    fn build_leaf(&mut self, node: NodeIdx, events: &[Event]) {
        let first = self.objects.len();
        self.objects.extend(
            events
                .iter()
                .filter(|e| e.is_object_start())
                .map(|e| e.object),
        );
        let count = self.objects.len() - first;

        self.nodes[node] = if count == 0 {
            Node::EMPTY_LEAF
        } else {
            Node::Leaf {
                first: first as u32,
                count: count as u32,
            }
        };
    }

    /// Sweeps the sorted events and returns the cheapest split plane.
    /// Returns a split with cost FloatType::MAX if no plane is acceptable.
    fn find_split(&self, events: &[Event], node_box: &WorldBox, object_count: usize) -> Split {
        let eps = self.settings.same_position_eps;
        let extent = node_box.extent();
        let inv_half_area = 1.0 / node_box.half_area();
        let side_lengths = [
            extent.y + extent.z,
            extent.z + extent.x,
            extent.x + extent.y,
        ];

        // Objects on the left and right of the current plane, per axis
        let mut n_left = [0usize; 3];
        let mut n_right = [object_count; 3];

        let is_flat_node = (0..3).any(|axis| extent[axis] < eps);

        let mut best = Split {
            cost: FloatType::MAX,
            axis: 0,
            position: 0.0,
            flat_side: Side::Left,
        };

        let mut i = 0;
        while i < events.len() {
            let axis = events[i].axis as usize;
            let position = events[i].position;

            let p_end = count_run(events, &mut i, axis, position, EventKind::End);
            let p_flat = count_run(events, &mut i, axis, position, EventKind::Flat);
            let p_begin = count_run(events, &mut i, axis, position, EventKind::Begin);

            // Objects ending or lying on the plane are no longer on the right
            n_right[axis] -= p_flat + p_end;

            let strictly_inside =
                position - node_box.min[axis] > eps && node_box.max[axis] - position > eps;
            if !is_flat_node || strictly_inside {
                let (cost, flat_side) = self.split_cost(
                    node_box.min[axis],
                    node_box.max[axis],
                    position,
                    [n_left[axis], p_flat, n_right[axis]],
                    inv_half_area,
                    side_lengths[axis],
                );

                if cost < best.cost {
                    best = Split {
                        cost,
                        axis,
                        position,
                        flat_side,
                    };
                }
            }

            // Objects starting or lying on the plane are on the left from now on
            n_left[axis] += p_begin + p_flat;
        }

        best
    }

    /// SAH cost of splitting at `position`, with the flat objects on the cheaper side.
    /// `counts` are objects left of, on, and right of the plane.
    fn split_cost(
        &self,
        min: FloatType,
        max: FloatType,
        position: FloatType,
        counts: [usize; 3],
        inv_half_area: FloatType,
        side_length: FloatType,
    ) -> (FloatType, Side) {
        let [n_left, n_flat, n_right] = counts;
        let cuts_off_empty_space = position != min && position != max;

        let p_left = 1.0 - side_length * (max - position) * inv_half_area;
        let p_right = 1.0 - side_length * (position - min) * inv_half_area;

        let cost_left =
            self.inner_cost(p_left, p_right, n_left + n_flat, n_right, cuts_off_empty_space);
        let cost_right =
            self.inner_cost(p_left, p_right, n_left, n_flat + n_right, cuts_off_empty_space);

        if cost_left < cost_right {
            (cost_left, Side::Left)
        } else {
            (cost_right, Side::Right)
        }
    }

    fn inner_cost(
        &self,
        p_left: FloatType,
        p_right: FloatType,
        n_left: usize,
        n_right: usize,
        cuts_off_empty_space: bool,
    ) -> FloatType {
        let cost = self.settings.traversal_cost
            + self.settings.intersection_cost
                * (p_left * n_left as FloatType + p_right * n_right as FloatType);

        if cuts_off_empty_space && (n_left == 0 || n_right == 0) {
            cost * self.settings.empty_space_bonus
        } else {
            cost
        }
    }

    /// Assigns a side to every object in the node, looking only at events on the split axis.
    fn classify(&mut self, events: &[Event], split: &Split) {
        for event in events.iter().filter(|e| e.axis as usize == split.axis) {
            let side = &mut self.sides[event.object as usize];
            if event.position < split.position {
                *side = if event.kind == EventKind::Begin {
                    Side::Both
                } else {
                    Side::Left
                };
            } else if event.position == split.position {
                *side = match event.kind {
                    EventKind::End => Side::Left,
                    EventKind::Flat => split.flat_side,
                    EventKind::Begin => Side::Right,
                };
            } else if event.kind != EventKind::End {
                *side = Side::Right;
            }
        }
    }

    /// Splits the node's events between the children.
    /// Objects on one side keep their events, objects on both sides are clipped to
    /// each child and get new events.
    fn distribute(
        &self,
        events: Vec<Event>,
        left_box: &WorldBox,
        right_box: &WorldBox,
    ) -> (Vec<Event>, Vec<Event>) {
        let eps = self.settings.same_position_eps;

        let mut old_left = Vec::new();
        let mut old_right = Vec::new();
        let mut new_left = Vec::new();
        let mut new_right = Vec::new();

        for event in events {
            match self.sides[event.object as usize] {
                Side::Left => old_left.push(event),
                Side::Right => old_right.push(event),
                Side::Both if event.is_object_start() => {
                    if let Some(clipped) = self.clip_to_child(event.object, left_box) {
                        generate_events(&mut new_left, &clipped, event.object, eps);
                    }
                    if let Some(clipped) = self.clip_to_child(event.object, right_box) {
                        generate_events(&mut new_right, &clipped, event.object, eps);
                    }
                }
                Side::Both => {}
            }
        }

        new_left.sort_unstable_by_key(Event::sort_key);
        new_right.sort_unstable_by_key(Event::sort_key);

        (merge_events(old_left, new_left), merge_events(old_right, new_right))
    }

    fn clip_to_child(&self, object: u32, child_box: &WorldBox) -> Option<WorldBox> {
        let clipped = self.clipper.clip(object, child_box);
        if !clipped.is_empty() {
            debug_assert!(child_box.contains_box(&clipped));
            return Some(clipped);
        }

        // The clipper can lose objects that only graze the child box.
        // Their bounding box still touches it, so keep them conservatively.
        let fallback = self.boxes[object as usize].intersection(child_box);
        if fallback.is_empty() {
            None
        } else {
            Some(fallback)
        }
    }
}

fn generate_events(dst: &mut Vec<Event>, object_box: &WorldBox, object: u32, eps: FloatType) {
    debug_assert!(!object_box.is_empty());

    for axis in 0..3 {
        let min = object_box.min[axis];
        let max = object_box.max[axis];
        if max - min < eps {
            dst.push(Event {
                position: min,
                axis: axis as u8,
                kind: EventKind::Flat,
                object,
            });
        } else {
            dst.push(Event {
                position: min,
                axis: axis as u8,
                kind: EventKind::Begin,
                object,
            });
            dst.push(Event {
                position: max,
                axis: axis as u8,
                kind: EventKind::End,
                object,
            });
        }
    }
}

/// Counts events of the given kind on the given plane, advancing the cursor past them.
fn count_run(
    events: &[Event],
    cursor: &mut usize,
    axis: usize,
    position: FloatType,
    kind: EventKind,
) -> usize {
    let start = *cursor;
    while let Some(e) = events.get(*cursor) {
        if e.axis as usize != axis || e.position != position || e.kind != kind {
            break;
        }
        *cursor += 1;
    }
    *cursor - start
}

fn merge_events(a: Vec<Event>, b: Vec<Event>) -> Vec<Event> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    merged.extend(
        a.into_iter()
            .merge_by(b, |x, y| x.sort_key() <= y.sort_key()),
    );
    merged
}
