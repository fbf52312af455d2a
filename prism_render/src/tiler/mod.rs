mod rtree;

use glam::IVec2;
use rayon::ThreadPool;

use crate::rasterizer::Rasterizer;
use crate::rect::Rect;
use crate::stage::FragmentResources;

use self::rtree::RTree;

/// Number of tiles along each axis of the dirty rect.
const TILE_GRID: i32 = 16;
/// Smallest allowed tile side, in pixels.
const MIN_TILE_SIDE: i32 = 256;

/// Bins fragment work items by screen region.
///
/// Items are kept in submission order; the R-tree indexes their bounding
/// boxes so dispatch only replays the items that can touch a given tile.
#[derive(Debug)]
pub(crate) struct Tiler {
    items: Vec<FragmentResources>,
    tree: RTree,
    /// Dirty rect over all item bounds. `min` inclusive, `max` exclusive.
    min: IVec2,
    max: IVec2,
}

impl Tiler {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            tree: RTree::new(),
            min: IVec2::MAX,
            max: IVec2::MIN,
        }
    }

    pub fn reset(&mut self) {
        self.items.clear();
        self.tree.clear();
        self.min = IVec2::MAX;
        self.max = IVec2::MIN;
    }

    pub fn add(&mut self, item: FragmentResources) {
        let bounds = item.bounds;
        self.tree.insert(bounds, self.items.len());
        self.items.push(item);

        self.min = self.min.min(bounds.min.floor().as_ivec2());
        self.max = self.max.max(bounds.max.ceil().as_ivec2() + 1);
    }

    /// Replays all binned work through the rasterizer, one task per tile.
    ///
    /// Tiles are disjoint half-open regions, so two workers never touch the
    /// same pixel. Within a tile, items run in ascending submission order;
    /// that ordering is what makes blending deterministic.
    pub fn dispatch(&self, rasterizer: &Rasterizer, pool: &ThreadPool) {
        if self.tree.is_empty() {
            return;
        }

        let span = self.max - self.min;
        if span.x <= 0 || span.y <= 0 {
            return;
        }

        let side = (span.x / TILE_GRID).max(MIN_TILE_SIDE);

        pool.scope(|scope| {
            let mut y = self.min.y;
            while y < self.max.y {
                let mut x = self.min.x;
                while x < self.max.x {
                    let tile = Rect::from_ltrb(
                        x as f32,
                        y as f32,
                        (x + side) as f32,
                        (y + side) as f32,
                    );

                    scope.spawn(move |_| {
                        let mut hits = Vec::new();
                        self.tree.search(tile, &mut |index| hits.push(index));
                        if hits.is_empty() {
                            return;
                        }

                        hits.sort_unstable();
                        for index in hits {
                            rasterizer.shade_fragments(&self.items[index], tile);
                        }
                    });

                    x += side;
                }
                y += side;
            }
        });
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[cfg(test)]
    pub fn hits(&self, tile: Rect) -> Vec<usize> {
        let mut hits = Vec::new();
        self.tree.search(tile, &mut |index| hits.push(index));
        hits.sort_unstable();
        hits
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{IVec2, Vec3};

    use crate::buffer::BufferView;
    use crate::pipeline::Pipeline;
    use crate::rect::Rect;
    use crate::shaders::ColorShader;
    use crate::stage::{DispatchResources, FragmentResources, Uniforms};

    use super::Tiler;

    fn item(bounds: Rect) -> FragmentResources {
        FragmentResources {
            bounds,
            ndc: [Vec3::ZERO; 3],
            pipeline: Arc::new(Pipeline::new(Arc::new(ColorShader))),
            resources: Arc::new(DispatchResources {
                vertex: BufferView::default(),
                index: None,
                uniforms: Uniforms::default(),
            }),
            stencil_reference: 0,
            varyings: Vec::new(),
        }
    }

    #[test]
    fn tiler_tracks_the_dirty_rect() {
        let mut tiler = Tiler::new();
        tiler.add(item(Rect::from_ltrb(10.0, 20.0, 30.0, 40.0)));
        tiler.add(item(Rect::from_ltrb(5.0, 25.0, 15.0, 60.0)));

        assert_eq!(tiler.min, IVec2::new(5, 20));
        assert_eq!(tiler.max, IVec2::new(31, 61));
    }

    #[test]
    fn tiler_hits_preserve_submission_order() {
        let mut tiler = Tiler::new();

        // Insert far apart so tree order differs from submission order.
        for index in 0..64 {
            let offset = ((index * 37) % 64) as f32 * 10.0;
            tiler.add(item(Rect::from_ltrb(offset, 0.0, offset + 9.0, 9.0)));
        }

        let hits = tiler.hits(Rect::from_ltrb(0.0, 0.0, 640.0, 9.0));
        assert_eq!(hits, (0..64).collect::<Vec<_>>());
    }

    #[test]
    fn tiler_reset_clears_items_and_dirty_rect() {
        let mut tiler = Tiler::new();
        tiler.add(item(Rect::from_ltrb(0.0, 0.0, 10.0, 10.0)));
        tiler.reset();

        assert_eq!(tiler.len(), 0);
        assert!(tiler.hits(Rect::from_ltrb(0.0, 0.0, 100.0, 100.0)).is_empty());
        assert_eq!(tiler.min, IVec2::MAX);
    }
}
