//! Ray casting against pickable scene objects.
//!
//! - [`Ray`]: a 3D ray with origin and direction, built from the pointer position
//! - [`Collider`]: the shape a ray is tested against: box, sphere, or the triangles of a mesh
//! - [`RayHit`]: the entity hit, and where
//!
//! Only entities listed in the pickable set are tested. Each entity is tested on its own;
//! nothing is inherited from parents or children.
//!
//! ```
//! use marblewalk::{Collider, Ray, Transform, Vec3, raycast};
//!
//! let mut world = hecs::World::new();
//! let crate_box = world.spawn((
//!     Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
//!     Collider::box_collider(Vec3::ONE),
//! ));
//!
//! let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
//! let hit = raycast(&world, &[crate_box], &ray).unwrap();
//! assert_eq!(hit.entity, crate_box);
//! assert!((hit.distance - 4.5).abs() < 1e-5);
//! ```

use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::geometry::RawGeometry;
use crate::mesh::Transform;

/// A ray in 3D space, used for raycasting and picking.
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    /// Normalized direction.
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Create a ray through a point in normalized device coordinates.
    ///
    /// `ndc` is in `[-1, 1]` on both axes with +Y up. The ray starts on the near plane and
    /// points toward the matching point on the far plane.
    pub fn from_ndc(ndc: Vec2, view_matrix: Mat4, projection_matrix: Mat4) -> Self {
        let near_clip = Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far_clip = Vec4::new(ndc.x, ndc.y, 1.0, 1.0);

        let inv_view_proj = (projection_matrix * view_matrix).inverse();

        let near_world = inv_view_proj * near_clip;
        let far_world = inv_view_proj * far_clip;

        // Perspective divide
        let near_point = near_world.truncate() / near_world.w;
        let far_point = far_world.truncate() / far_world.w;

        Self {
            origin: near_point,
            direction: (far_point - near_point).normalize_or_zero(),
        }
    }

    /// Get a point along the ray at the given distance from the origin.
    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Test intersection with an axis-aligned bounding box (AABB).
    ///
    /// Returns the distance along the ray to the nearest intersection in front of the
    /// origin. A ray starting inside the box hits its far side.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for i in 0..3 {
            let origin = self.origin[i];
            let dir = self.direction[i];

            if dir.abs() < f32::EPSILON {
                // Parallel to this slab
                if origin < min[i] || origin > max[i] {
                    return None;
                }
            } else {
                let inv_dir = 1.0 / dir;
                let mut t1 = (min[i] - origin) * inv_dir;
                let mut t2 = (max[i] - origin) * inv_dir;

                if t1 > t2 {
                    std::mem::swap(&mut t1, &mut t2);
                }

                t_min = t_min.max(t1);
                t_max = t_max.min(t2);

                if t_min > t_max {
                    return None;
                }
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    /// Test intersection with a sphere.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;

        if discriminant < 0.0 || a == 0.0 {
            return None;
        }

        let sqrt_disc = discriminant.sqrt();
        let t1 = (-b - sqrt_disc) / (2.0 * a);
        let t2 = (-b + sqrt_disc) / (2.0 * a);

        if t1 > 0.0 {
            Some(t1)
        } else if t2 > 0.0 {
            Some(t2)
        } else {
            None
        }
    }

    /// Test intersection with a triangle (Möller–Trumbore). Both faces are hit.
    ///
    /// Barycentric bounds are widened slightly so a ray through an edge shared by two
    /// triangles hits at least one of them.
    pub fn intersect_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        const EPSILON: f32 = 1e-7;

        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(-EDGE_TOLERANCE..=1.0 + EDGE_TOLERANCE).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < -EDGE_TOLERANCE || u + v > 1.0 + EDGE_TOLERANCE {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t > EPSILON).then_some(t)
    }
}

/// Slack on barycentric coordinates in [`Ray::intersect_triangle`].
const EDGE_TOLERANCE: f32 = 1e-5;

/// A collision shape for picking.
///
/// Box and sphere colliders are centered on the entity's position and scaled by its
/// transform (rotation is ignored). Mesh colliders test the actual triangles under the full
/// transform.
#[derive(Clone, Debug)]
pub enum Collider {
    /// Axis-aligned box defined by half-extents.
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// Triangle mesh with its model-space bounds for a cheap rejection test.
    Mesh {
        geometry: Arc<RawGeometry>,
        min: Vec3,
        max: Vec3,
    },
}

impl Collider {
    /// Create a box collider from full dimensions.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            half_extents: size * 0.5,
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Collider that tests every triangle of `geometry`.
    pub fn mesh(geometry: Arc<RawGeometry>) -> Self {
        let (min, max) = geometry.bounds();
        Self::Mesh { geometry, min, max }
    }

    /// Test a world-space ray against this collider placed by `transform`.
    ///
    /// Returns the world-space distance along the ray to the nearest hit.
    pub fn intersect(&self, ray: &Ray, transform: &Transform) -> Option<f32> {
        match self {
            Collider::Box { half_extents } => {
                let scaled_half = *half_extents * transform.scale;
                ray.intersect_aabb(transform.position - scaled_half, transform.position + scaled_half)
            }
            Collider::Sphere { radius } => {
                let avg_scale = (transform.scale.x + transform.scale.y + transform.scale.z) / 3.0;
                ray.intersect_sphere(transform.position, radius * avg_scale)
            }
            Collider::Mesh { geometry, min, max } => {
                // The local ray keeps an unnormalized direction so that `t` measures
                // world-space distance in both spaces.
                let inverse = transform.matrix().inverse();
                let local = Ray {
                    origin: inverse.transform_point3(ray.origin),
                    direction: inverse.transform_vector3(ray.direction),
                };
                if !local.origin.is_finite() || !local.direction.is_finite() {
                    return None;
                }

                // Triangles lying on the bounds must not be rejected early.
                let pad = Vec3::splat(1e-4);
                local.intersect_aabb(*min - pad, *max + pad)?;

                geometry
                    .triangles()
                    .filter_map(|tri| local.intersect_triangle(tri))
                    .min_by(f32::total_cmp)
            }
        }
    }
}

/// Information about a ray-collider intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: hecs::Entity,
    /// Distance from ray origin to the hit point.
    pub distance: f32,
    /// World-space position of the hit point.
    pub point: Vec3,
}

/// Cast a ray against the given pickable entities and return the nearest hit.
///
/// Entities without both a [`Transform`] and a [`Collider`], or that no longer exist, are
/// skipped. An empty slice never hits.
pub fn raycast(world: &hecs::World, pickables: &[hecs::Entity], ray: &Ray) -> Option<RayHit> {
    let mut nearest: Option<RayHit> = None;

    for &entity in pickables {
        let Ok(mut query) = world.query_one::<(&Transform, &Collider)>(entity) else {
            continue;
        };
        let Some((transform, collider)) = query.get() else {
            continue;
        };
        let Some(distance) = collider.intersect(ray, transform) else {
            continue;
        };
        if nearest.is_none_or(|hit| distance < hit.distance) {
            nearest = Some(RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            });
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::Vertex3d;
    use glam::Quat;

    fn unit_quad() -> Arc<RawGeometry> {
        // A 2x2 square in the XY plane facing +Z.
        let n = [0.0, 0.0, 1.0];
        let vertices = vec![
            Vertex3d::new([-1.0, -1.0, 0.0], n, [0.0, 0.0]),
            Vertex3d::new([1.0, -1.0, 0.0], n, [1.0, 0.0]),
            Vertex3d::new([1.0, 1.0, 0.0], n, [1.0, 1.0]),
            Vertex3d::new([-1.0, 1.0, 0.0], n, [0.0, 1.0]),
        ];
        Arc::new(RawGeometry::new(vertices, vec![0, 1, 2, 2, 3, 0]))
    }

    #[test]
    fn center_ndc_ray_points_forward() {
        let camera = crate::Camera::new().at(Vec3::new(0.0, 0.2, 2.0)).with_aspect(1.6);
        let ray = Ray::from_ndc(Vec2::ZERO, camera.view_matrix(), camera.projection_matrix());
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.z - (2.0 - camera.near)).abs() < 1e-3);
    }

    #[test]
    fn off_center_ndc_ray_tilts_toward_pointer() {
        let camera = crate::Camera::new().at(Vec3::ZERO).with_aspect(1.0);
        let ray = Ray::from_ndc(
            Vec2::new(1.0, -1.0),
            camera.view_matrix(),
            camera.projection_matrix(),
        );
        assert!(ray.direction.x > 0.0 && ray.direction.y < 0.0 && ray.direction.z < 0.0);
    }

    #[test]
    fn aabb_miss_and_hit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert_eq!(
            ray.intersect_aabb(Vec3::new(-1.0, -1.0, -6.0), Vec3::new(1.0, 1.0, -4.0)),
            Some(4.0)
        );
        assert_eq!(
            ray.intersect_aabb(Vec3::new(2.0, -1.0, -6.0), Vec3::new(3.0, 1.0, -4.0)),
            None
        );
        // Behind the origin
        assert_eq!(
            ray.intersect_aabb(Vec3::new(-1.0, -1.0, 4.0), Vec3::new(1.0, 1.0, 6.0)),
            None
        );
    }

    #[test]
    fn sphere_hit_distance() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let t = ray.intersect_sphere(Vec3::new(5.0, 0.0, 0.0), 1.0).unwrap();
        assert!((t - 4.0).abs() < 1e-5);
    }

    #[test]
    fn triangle_hit_is_two_sided() {
        let tri = [
            Vec3::new(-1.0, -1.0, 0.0),
            Vec3::new(1.0, -1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ];
        let front = Ray::new(Vec3::new(0.0, 0.0, 3.0), Vec3::NEG_Z);
        let back = Ray::new(Vec3::new(0.0, 0.0, -3.0), Vec3::Z);
        assert!((front.intersect_triangle(tri).unwrap() - 3.0).abs() < 1e-5);
        assert!((back.intersect_triangle(tri).unwrap() - 3.0).abs() < 1e-5);

        let beside = Ray::new(Vec3::new(2.0, 0.0, 3.0), Vec3::NEG_Z);
        assert_eq!(beside.intersect_triangle(tri), None);
    }

    #[test]
    fn mesh_collider_respects_transform() {
        let collider = Collider::mesh(unit_quad());
        let transform = Transform::new()
            .position(Vec3::new(0.0, 0.0, -10.0))
            .rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4))
            .uniform_scale(2.0);

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let t = collider.intersect(&ray, &transform).unwrap();
        assert!((t - 10.0).abs() < 1e-4, "distance was {t}");

        // Scaled quad spans 2 units either side; 1.0 * cos(45deg) * 2 covers x = 1.
        let near_edge = Ray::new(Vec3::new(1.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(collider.intersect(&near_edge, &transform).is_some());
        let outside = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::NEG_Z);
        assert!(collider.intersect(&outside, &transform).is_none());
    }

    #[test]
    fn rays_through_a_shared_edge_always_hit() {
        // The quad's two triangles meet along the diagonal from (-1, -1) to (1, 1).
        let collider = Collider::mesh(unit_quad());
        let transform = Transform::from_position(Vec3::new(0.0, 0.0, -5.0));
        let eye = Vec3::new(0.37, 0.21, 0.0);

        let misses = (0..1000)
            .filter(|&i| {
                let s = -0.999 + 1.998 * i as f32 / 999.0;
                let target = Vec3::new(s, s, -5.0);
                let ray = Ray::new(eye, target - eye);
                collider.intersect(&ray, &transform).is_none()
            })
            .count();
        assert_eq!(misses, 0);
    }

    #[test]
    fn raycast_returns_nearest_and_skips_unlisted() {
        let mut world = hecs::World::new();
        let far = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -10.0)),
            Collider::box_collider(Vec3::ONE),
        ));
        let near = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -5.0)),
            Collider::sphere(0.5),
        ));
        let unlisted = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),
            Collider::box_collider(Vec3::ONE),
        ));
        let no_collider = world.spawn((Transform::from_position(Vec3::new(0.0, 0.0, -1.0)),));

        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        let hit = raycast(&world, &[far, near, no_collider], &ray).unwrap();
        assert_eq!(hit.entity, near);
        assert!((hit.distance - 4.5).abs() < 1e-5);
        assert!((hit.point - Vec3::new(0.0, 0.0, -4.5)).length() < 1e-5);
        assert_ne!(hit.entity, unlisted);
    }

    #[test]
    fn raycast_empty_set_misses() {
        let world = hecs::World::new();
        let ray = Ray::new(Vec3::ZERO, Vec3::NEG_Z);
        assert!(raycast(&world, &[], &ray).is_none());
    }

    #[test]
    fn despawned_pickable_is_skipped() {
        let mut world = hecs::World::new();
        let gone = world.spawn((Transform::new(), Collider::sphere(1.0)));
        world.despawn(gone).unwrap();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(raycast(&world, &[gone], &ray).is_none());
    }
}
