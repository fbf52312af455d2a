use crate::rect::Rect;

/// Maximum number of entries or children per node before it splits.
const MAX_ENTRIES: usize = 8;
/// Minimum number each group must receive during a split.
const MIN_ENTRIES: usize = 3;

/// An insert-only 2-D R-tree mapping bounding boxes to item indices.
///
/// Triangle bounding boxes are heterogeneous in size; a uniform grid would
/// either over-count small boxes or balloon for large ones. The tree only
/// needs insert and search: the tiler resets it wholesale every frame.
#[derive(Debug)]
pub struct RTree {
    root: Node,
    len: usize,
}

impl RTree {
    pub fn new() -> Self {
        Self {
            root: Node::leaf(),
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.root = Node::leaf();
        self.len = 0;
    }

    /// Inserts `index` keyed by `bounds` in O(log n).
    pub fn insert(&mut self, bounds: Rect, index: usize) {
        self.len += 1;

        if let Some(sibling) = self.root.insert(Entry { bounds, index }) {
            let bounds = self.root.bounds.union(sibling.bounds);
            let old_root = std::mem::replace(&mut self.root, Node::leaf());

            self.root = Node {
                bounds,
                kind: NodeKind::Branch(vec![old_root, sibling]),
            };
        }
    }

    /// Visits the index of every entry whose bounds intersect `rect`.
    pub fn search<F>(&self, rect: Rect, visitor: &mut F)
    where
        F: FnMut(usize),
    {
        if self.len != 0 {
            self.root.search(rect, visitor);
        }
    }
}

impl Default for RTree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug)]
struct Entry {
    bounds: Rect,
    index: usize,
}

#[derive(Debug)]
struct Node {
    bounds: Rect,
    kind: NodeKind,
}

#[derive(Debug)]
enum NodeKind {
    Leaf(Vec<Entry>),
    Branch(Vec<Node>),
}

impl Node {
    fn leaf() -> Self {
        Self {
            bounds: EMPTY_BOUNDS,
            kind: NodeKind::Leaf(Vec::new()),
        }
    }

    /// Inserts the entry below this node. Returns a new sibling if the node
    /// had to split.
    fn insert(&mut self, entry: Entry) -> Option<Node> {
        self.bounds = self.bounds.union(entry.bounds);

        match &mut self.kind {
            NodeKind::Leaf(entries) => {
                entries.push(entry);
                if entries.len() <= MAX_ENTRIES {
                    return None;
                }

                let (kept, split) = split_groups(std::mem::take(entries), |e| e.bounds);
                self.bounds = group_bounds(&kept, |e| e.bounds);
                *entries = kept;

                Some(Node {
                    bounds: group_bounds(&split, |e| e.bounds),
                    kind: NodeKind::Leaf(split),
                })
            }
            NodeKind::Branch(children) => {
                let target = choose_child(children, entry.bounds);
                if let Some(sibling) = children[target].insert(entry) {
                    children.push(sibling);
                    if children.len() > MAX_ENTRIES {
                        let (kept, split) = split_groups(std::mem::take(children), |c| c.bounds);
                        self.bounds = group_bounds(&kept, |c| c.bounds);
                        *children = kept;

                        return Some(Node {
                            bounds: group_bounds(&split, |c| c.bounds),
                            kind: NodeKind::Branch(split),
                        });
                    }
                }

                None
            }
        }
    }

    fn search<F>(&self, rect: Rect, visitor: &mut F)
    where
        F: FnMut(usize),
    {
        match &self.kind {
            NodeKind::Leaf(entries) => {
                for entry in entries {
                    if entry.bounds.intersects(rect) {
                        visitor(entry.index);
                    }
                }
            }
            NodeKind::Branch(children) => {
                for child in children {
                    if child.bounds.intersects(rect) {
                        child.search(rect, visitor);
                    }
                }
            }
        }
    }
}

const EMPTY_BOUNDS: Rect = Rect {
    min: glam::Vec2::splat(f32::MAX),
    max: glam::Vec2::splat(f32::MIN),
};

fn area(rect: Rect) -> f32 {
    (rect.max.x - rect.min.x).max(0.0) * (rect.max.y - rect.min.y).max(0.0)
}

fn group_bounds<T>(items: &[T], bounds_of: impl Fn(&T) -> Rect) -> Rect {
    items
        .iter()
        .map(&bounds_of)
        .fold(EMPTY_BOUNDS, |acc, bounds| acc.union(bounds))
}

/// Index of the child needing the least enlargement to cover `bounds`,
/// breaking ties by smaller area.
fn choose_child(children: &[Node], bounds: Rect) -> usize {
    let mut best = 0;
    let mut best_enlargement = f32::MAX;
    let mut best_area = f32::MAX;

    for (index, child) in children.iter().enumerate() {
        let child_area = area(child.bounds);
        let enlargement = area(child.bounds.union(bounds)) - child_area;

        if enlargement < best_enlargement
            || (enlargement == best_enlargement && child_area < best_area)
        {
            best = index;
            best_enlargement = enlargement;
            best_area = child_area;
        }
    }

    best
}

/// Guttman's quadratic split: seed with the pair wasting the most area
/// together, then assign the rest by least enlargement.
fn split_groups<T>(mut items: Vec<T>, bounds_of: impl Fn(&T) -> Rect) -> (Vec<T>, Vec<T>) {
    debug_assert!(items.len() >= 2);

    let (seed_a, seed_b) = pick_seeds(&items, &bounds_of);

    // Remove the higher index first so the lower one stays valid.
    let item_b = items.remove(seed_b.max(seed_a));
    let item_a = items.remove(seed_b.min(seed_a));

    let mut bounds_a = bounds_of(&item_a);
    let mut bounds_b = bounds_of(&item_b);
    let mut group_a = vec![item_a];
    let mut group_b = vec![item_b];

    while let Some(item) = items.pop() {
        let remaining = items.len() + 1;

        // One group must absorb everything left to reach the minimum fill.
        if group_a.len() + remaining <= MIN_ENTRIES {
            bounds_a = bounds_a.union(bounds_of(&item));
            group_a.push(item);
            continue;
        }
        if group_b.len() + remaining <= MIN_ENTRIES {
            bounds_b = bounds_b.union(bounds_of(&item));
            group_b.push(item);
            continue;
        }

        let bounds = bounds_of(&item);
        let enlargement_a = area(bounds_a.union(bounds)) - area(bounds_a);
        let enlargement_b = area(bounds_b.union(bounds)) - area(bounds_b);

        if enlargement_a < enlargement_b
            || (enlargement_a == enlargement_b && group_a.len() <= group_b.len())
        {
            bounds_a = bounds_a.union(bounds);
            group_a.push(item);
        } else {
            bounds_b = bounds_b.union(bounds);
            group_b.push(item);
        }
    }

    (group_a, group_b)
}

fn pick_seeds<T>(items: &[T], bounds_of: impl Fn(&T) -> Rect) -> (usize, usize) {
    let mut seeds = (0, 1);
    let mut worst_waste = f32::MIN;

    for a in 0..items.len() {
        for b in a + 1..items.len() {
            let bounds_a = bounds_of(&items[a]);
            let bounds_b = bounds_of(&items[b]);
            let waste = area(bounds_a.union(bounds_b)) - area(bounds_a) - area(bounds_b);

            if waste > worst_waste {
                worst_waste = waste;
                seeds = (a, b);
            }
        }
    }

    seeds
}
