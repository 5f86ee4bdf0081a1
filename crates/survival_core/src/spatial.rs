//! Spatial queries consumed by the resolvers and arbiters.
//!
//! Gameplay code only talks to [`SpatialQuery`] and [`HeightSource`].
//! [`SpatialIndex`] is the in-process implementation used by the
//! simulation: a per-tick snapshot of entity and building bounds over a
//! [`TerrainProfile`].

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::buildings::BuildingRegistry;
use crate::components::EntityId;
use crate::math::{horizontal_distance, Aabb, Ray};
use crate::world::EntityStorage;

/// Terrain height lookup.
pub trait HeightSource {
    /// Ground height at world `(x, z)`.
    fn height_at(&self, x: f64, z: f64) -> f64;
}

/// First (or every) collider a ray passes through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    /// Hit entity or building.
    pub id: EntityId,
    /// Distance along the ray.
    pub distance: f64,
    /// World-space hit point.
    pub point: DVec3,
}

/// A collider found by a region query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionHit {
    /// Found entity or building.
    pub id: EntityId,
    /// Distance from the query origin to the collider center, measured as
    /// the shape measures it.
    pub distance: f64,
    /// Collider center.
    pub position: DVec3,
}

/// Volume searched by [`SpatialQuery::query_region`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegionShape {
    /// Full 3D distance.
    Sphere {
        /// Search radius.
        radius: f64,
    },
    /// Horizontal distance only.
    Cylinder {
        /// Search radius.
        radius: f64,
    },
}

/// Ray and shape queries against world colliders.
///
/// `filter` restricts candidates by id; results of the multi-hit queries
/// come back in ascending distance order, ties in ascending id order.
pub trait SpatialQuery: HeightSource {
    /// Nearest collider along the ray.
    fn probe(
        &self,
        ray: &Ray,
        max_distance: f64,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Option<ProbeHit> {
        self.probe_all(ray, max_distance, filter).into_iter().next()
    }

    /// Every collider along the ray.
    fn probe_all(
        &self,
        ray: &Ray,
        max_distance: f64,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<ProbeHit>;

    /// Every collider whose center lies inside the shape around `origin`.
    fn query_region(
        &self,
        origin: DVec3,
        shape: RegionShape,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<RegionHit>;
}

// ============================================================================
// Terrain
// ============================================================================

/// Regular height grid sampled bilinearly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightGrid {
    /// World x/z of sample (0, 0).
    pub origin: (f64, f64),
    /// Distance between samples.
    pub cell_size: f64,
    /// Samples along x.
    pub width: usize,
    /// Samples along z.
    pub depth: usize,
    /// Row-major heights, `depth` rows of `width`.
    pub heights: Vec<f64>,
}

impl HeightGrid {
    fn sample(&self, ix: usize, iz: usize) -> f64 {
        let ix = ix.min(self.width.saturating_sub(1));
        let iz = iz.min(self.depth.saturating_sub(1));
        self.heights.get(iz * self.width + ix).copied().unwrap_or(0.0)
    }

    fn height_at(&self, x: f64, z: f64) -> f64 {
        if self.width == 0 || self.depth == 0 || self.cell_size <= 0.0 {
            return 0.0;
        }
        let max_x = (self.width - 1) as f64;
        let max_z = (self.depth - 1) as f64;
        let gx = ((x - self.origin.0) / self.cell_size).clamp(0.0, max_x);
        let gz = ((z - self.origin.1) / self.cell_size).clamp(0.0, max_z);

        let (x0, z0) = (gx.floor() as usize, gz.floor() as usize);
        let (fx, fz) = (gx - gx.floor(), gz - gz.floor());

        let h00 = self.sample(x0, z0);
        let h10 = self.sample(x0 + 1, z0);
        let h01 = self.sample(x0, z0 + 1);
        let h11 = self.sample(x0 + 1, z0 + 1);

        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        near + (far - near) * fz
    }
}

/// Ground shape of a world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerrainProfile {
    /// Level ground.
    Flat(f64),
    /// Tilted plane `base + slope_x * x + slope_z * z`.
    Plane {
        /// Height at the origin.
        base: f64,
        /// Rise per unit x.
        slope_x: f64,
        /// Rise per unit z.
        slope_z: f64,
    },
    /// Sampled heights.
    Grid(HeightGrid),
}

impl Default for TerrainProfile {
    fn default() -> Self {
        Self::Flat(0.0)
    }
}

impl HeightSource for TerrainProfile {
    fn height_at(&self, x: f64, z: f64) -> f64 {
        match self {
            Self::Flat(height) => *height,
            Self::Plane {
                base,
                slope_x,
                slope_z,
            } => base + slope_x * x + slope_z * z,
            Self::Grid(grid) => grid.height_at(x, z),
        }
    }
}

impl<F> HeightSource for F
where
    F: Fn(f64, f64) -> f64,
{
    fn height_at(&self, x: f64, z: f64) -> f64 {
        self(x, z)
    }
}

// ============================================================================
// Spatial Index
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Collider {
    id: EntityId,
    bounds: Aabb,
}

/// Snapshot of world colliders for one tick.
///
/// Later mutations of the entity table (knockback, removals) are not seen
/// until the next snapshot.
pub struct SpatialIndex<'t> {
    colliders: Vec<Collider>,
    terrain: &'t dyn HeightSource,
}

impl<'t> SpatialIndex<'t> {
    /// Snapshot entities and placed buildings.
    #[must_use]
    pub fn build(
        entities: &EntityStorage,
        buildings: &BuildingRegistry,
        terrain: &'t dyn HeightSource,
    ) -> Self {
        let mut colliders: Vec<Collider> = entities
            .iter()
            .map(|(&id, entity)| Collider {
                id,
                bounds: entity.bounds(),
            })
            .chain(buildings.iter().map(|building| Collider {
                id: building.id,
                bounds: building.bounds(),
            }))
            .collect();
        colliders.sort_unstable_by_key(|collider| collider.id);
        Self { colliders, terrain }
    }

    /// Index over explicit colliders, mainly for tests.
    #[must_use]
    pub fn from_bounds(bounds: &[(EntityId, Aabb)], terrain: &'t dyn HeightSource) -> Self {
        let mut colliders: Vec<Collider> = bounds
            .iter()
            .map(|&(id, bounds)| Collider { id, bounds })
            .collect();
        colliders.sort_unstable_by_key(|collider| collider.id);
        Self { colliders, terrain }
    }

    /// Number of colliders in the snapshot.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Whether the snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }
}

impl HeightSource for SpatialIndex<'_> {
    fn height_at(&self, x: f64, z: f64) -> f64 {
        self.terrain.height_at(x, z)
    }
}

impl SpatialQuery for SpatialIndex<'_> {
    fn probe_all(
        &self,
        ray: &Ray,
        max_distance: f64,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<ProbeHit> {
        let mut hits: Vec<ProbeHit> = self
            .colliders
            .iter()
            .filter(|collider| filter(collider.id))
            .filter_map(|collider| {
                collider
                    .bounds
                    .ray_intersection(ray, max_distance)
                    .map(|distance| ProbeHit {
                        id: collider.id,
                        distance,
                        point: ray.at(distance),
                    })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits
    }

    fn query_region(
        &self,
        origin: DVec3,
        shape: RegionShape,
        filter: &dyn Fn(EntityId) -> bool,
    ) -> Vec<RegionHit> {
        let mut hits: Vec<RegionHit> = self
            .colliders
            .iter()
            .filter(|collider| filter(collider.id))
            .filter_map(|collider| {
                let center = collider.bounds.center();
                let (distance, radius) = match shape {
                    RegionShape::Sphere { radius } => (origin.distance(center), radius),
                    RegionShape::Cylinder { radius } => {
                        (horizontal_distance(origin, center), radius)
                    }
                };
                (distance <= radius).then_some(RegionHit {
                    id: collider.id,
                    distance,
                    position: center,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.id.cmp(&b.id)));
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box(center: DVec3) -> Aabb {
        Aabb::from_center(center, DVec3::splat(0.5))
    }

    fn any(_: EntityId) -> bool {
        true
    }

    #[test]
    fn test_flat_and_plane_heights() {
        assert_eq!(TerrainProfile::Flat(2.5).height_at(10.0, -4.0), 2.5);
        let plane = TerrainProfile::Plane {
            base: 1.0,
            slope_x: 0.5,
            slope_z: 0.0,
        };
        assert_eq!(plane.height_at(2.0, 99.0), 2.0);
    }

    #[test]
    fn test_grid_bilinear_interpolation() {
        let grid = TerrainProfile::Grid(HeightGrid {
            origin: (0.0, 0.0),
            cell_size: 1.0,
            width: 2,
            depth: 2,
            heights: vec![0.0, 2.0, 0.0, 2.0],
        });
        assert!((grid.height_at(0.5, 0.5) - 1.0).abs() < 1e-12);
        // Clamped outside the grid.
        assert_eq!(grid.height_at(-5.0, 0.0), 0.0);
        assert_eq!(grid.height_at(5.0, 0.0), 2.0);
    }

    #[test]
    fn test_probe_returns_nearest() {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::from_bounds(
            &[
                (1, unit_box(DVec3::new(0.0, 0.0, 6.0))),
                (2, unit_box(DVec3::new(0.0, 0.0, 3.0))),
            ],
            &terrain,
        );
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        let hit = index.probe(&ray, 10.0, &any).unwrap();
        assert_eq!(hit.id, 2);
        assert!((hit.distance - 2.5).abs() < 1e-12);
        assert!((hit.point.z - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_probe_respects_filter() {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::from_bounds(
            &[
                (1, unit_box(DVec3::new(0.0, 0.0, 6.0))),
                (2, unit_box(DVec3::new(0.0, 0.0, 3.0))),
            ],
            &terrain,
        );
        let ray = Ray::new(DVec3::ZERO, DVec3::Z);
        let hit = index.probe(&ray, 10.0, &|id| id == 1).unwrap();
        assert_eq!(hit.id, 1);
    }

    #[test]
    fn test_cylinder_ignores_height() {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::from_bounds(&[(1, unit_box(DVec3::new(1.0, 40.0, 0.0)))], &terrain);
        let cylinder = index.query_region(DVec3::ZERO, RegionShape::Cylinder { radius: 1.5 }, &any);
        let sphere = index.query_region(DVec3::ZERO, RegionShape::Sphere { radius: 1.5 }, &any);
        assert_eq!(cylinder.len(), 1);
        assert!(sphere.is_empty());
    }

    #[test]
    fn test_region_sorted_by_distance() {
        let terrain = TerrainProfile::default();
        let index = SpatialIndex::from_bounds(
            &[
                (1, unit_box(DVec3::new(2.0, 0.0, 0.0))),
                (2, unit_box(DVec3::new(1.0, 0.0, 0.0))),
                (3, unit_box(DVec3::new(9.0, 0.0, 0.0))),
            ],
            &terrain,
        );
        let hits = index.query_region(DVec3::ZERO, RegionShape::Sphere { radius: 5.0 }, &any);
        let ids: Vec<_> = hits.iter().map(|hit| hit.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }
}
