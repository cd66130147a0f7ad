//! Dispatch sizing: how many workgroups cover a render target or a linear buffer.

/// Edge of a tiled deferred lighting tile, in pixels.
pub const LIGHTING_TILE_SIZE: u32 = 16;
/// Edge of a tiled image based lighting tile, in pixels. Probe culling uses AABBs,
/// which cost more than the lighting frustum test, so the tile is larger.
pub const IBL_TILE_SIZE: u32 = 32;
/// Threads along each edge of an IBL workgroup; each covers a square block of the tile.
pub const IBL_GROUP_SIZE: u32 = 16;
/// Elements written per clear thread along each axis.
pub const CLEAR_TILE_SIZE: u32 = 4;
/// Clear threads per workgroup along each axis.
pub const CLEAR_NUM_THREADS: u32 = 8;

/// Workgroup grid of a compute dispatch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileGrid {
    pub tiles_x: u32,
    pub tiles_y: u32,
}

fn checked_tile_size(tile_size: u32) -> u32 {
    debug_assert!(tile_size > 0, "tile size must be positive");
    tile_size.max(1)
}

impl TileGrid {
    /// Tiles of `tile_size` pixels covering a `width` x `height` target. Edge tiles are
    /// partial; the shader bounds-checks against the target size.
    pub fn cover(width: u32, height: u32, tile_size: u32) -> Self {
        let tile_size = checked_tile_size(tile_size);
        Self {
            tiles_x: width.div_ceil(tile_size),
            tiles_y: height.div_ceil(tile_size),
        }
    }

    /// One row of groups for `element_count` elements, each group handling
    /// `threads_per_group * tile_size^2` elements.
    pub fn linear(element_count: u32, threads_per_group: u32, tile_size: u32) -> Self {
        let tile_size = checked_tile_size(tile_size) as u64;
        let per_group = (threads_per_group.max(1) as u64) * tile_size * tile_size;
        Self {
            tiles_x: (element_count as u64).div_ceil(per_group) as u32,
            tiles_y: 1,
        }
    }

    pub fn workgroups(&self) -> (u32, u32, u32) {
        (self.tiles_x, self.tiles_y, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.tiles_x == 0 || self.tiles_y == 0
    }

    pub fn dispatch(&self, pass: &mut wgpu::ComputePass<'_>) {
        if self.is_empty() {
            return;
        }
        let (x, y, z) = self.workgroups();
        pass.dispatch_workgroups(x, y, z);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd_lighting_grid() {
        assert_eq!(TileGrid::cover(1920, 1080, 16), TileGrid { tiles_x: 120, tiles_y: 68 });
        assert_eq!(TileGrid::cover(1921, 1080, 16).tiles_x, 121);
        assert_eq!(TileGrid::cover(1920, 1080, IBL_TILE_SIZE), TileGrid { tiles_x: 60, tiles_y: 34 });
    }

    #[test]
    fn grid_covers_without_extra_tiles() {
        for tile in [1u32, 3, 16, 32, 33] {
            for size in (1u32..200).chain([1023, 1024, 1025, 4097]) {
                let grid = TileGrid::cover(size, size + 7, tile);
                assert!(grid.tiles_x * tile >= size);
                assert!((grid.tiles_x - 1) * tile < size);
                assert!(grid.tiles_y * tile >= size + 7);
                assert!((grid.tiles_y - 1) * tile < size + 7);
            }
        }
    }

    #[test]
    fn zero_size_is_empty() {
        let grid = TileGrid::cover(0, 720, 16);
        assert_eq!(grid.tiles_x, 0);
        assert!(grid.is_empty());
    }

    #[test]
    fn clear_sizing() {
        let group_edge = CLEAR_NUM_THREADS * CLEAR_TILE_SIZE;
        assert_eq!(TileGrid::cover(100, 50, group_edge).workgroups(), (4, 2, 1));

        let threads = CLEAR_NUM_THREADS * CLEAR_NUM_THREADS;
        assert_eq!(TileGrid::linear(1024, threads, CLEAR_TILE_SIZE).workgroups(), (1, 1, 1));
        assert_eq!(TileGrid::linear(1025, threads, CLEAR_TILE_SIZE).workgroups(), (2, 1, 1));
        assert_eq!(TileGrid::linear(u32::MAX, threads, CLEAR_TILE_SIZE).tiles_x, 4_194_304);
    }
}
