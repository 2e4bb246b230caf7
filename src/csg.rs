//! Boolean subtraction of a tracked cutout volume from the lake plane.
//!
//! The lake surface is a flat plane with a boat-shaped hole in it, and the
//! hole follows the boat. [`CutoutTracker`] holds the base plane, a convex
//! hull-footprint volume with a transform, and the derived combined geometry.
//! `sync` copies the tracked object's position and orientation onto the
//! volume and recomputes the combined geometry from scratch. The result is
//! never cached across transform changes, so the cutout can never lag the
//! boat by more than the sync that produced it.
//!
//! The boolean itself works in the plane: every base triangle is clipped
//! against the volume's world-space footprint polygon edge by edge. Pieces
//! that fall outside any edge are part of the result; a piece inside every
//! edge is under the boat and is discarded. Clipping a convex piece by a
//! half-plane yields convex pieces, so each survivor fan-triangulates
//! directly.

use crate::geometry::RawGeometry;
use crate::mesh::{Transform, Vertex3d};
use glam::{Vec2, Vec3};

const AREA_EPSILON: f32 = 1e-6;

/// A convex boat-hull outline in local XZ space, bow toward +Z.
///
/// `length` is the bow-to-stern extent, `beam` the width amidships.
pub fn hull_footprint(length: f32, beam: f32) -> Vec<Vec2> {
    let l = length * 0.5;
    let b = beam * 0.5;
    // Counter-clockwise when viewed from +Y (shoelace area positive).
    vec![
        Vec2::new(0.0, l),
        Vec2::new(-b, l * 0.45),
        Vec2::new(-b, -l * 0.65),
        Vec2::new(-b * 0.55, -l),
        Vec2::new(b * 0.55, -l),
        Vec2::new(b, -l * 0.65),
        Vec2::new(b, l * 0.45),
    ]
}

/// Signed shoelace area of a polygon in the XZ plane (positive = CCW).
pub(crate) fn polygon_area(poly: &[Vec2]) -> f32 {
    let mut twice = 0.0;
    for (i, a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

/// Split a convex polygon by the half-plane left of the directed edge a→b.
///
/// Returns `(inside, outside)`; either may be `None` when the polygon lies
/// entirely on one side.
fn split_convex(poly: &[Vec2], a: Vec2, b: Vec2) -> (Option<Vec<Vec2>>, Option<Vec<Vec2>>) {
    let edge = b - a;
    let side = |p: Vec2| edge.perp_dot(p - a);

    let mut inside = Vec::new();
    let mut outside = Vec::new();

    for (i, &p) in poly.iter().enumerate() {
        let q = poly[(i + 1) % poly.len()];
        let sp = side(p);
        let sq = side(q);

        if sp >= 0.0 {
            inside.push(p);
        }
        if sp <= 0.0 {
            outside.push(p);
        }
        // Crossing edges contribute the intersection point to both halves.
        if (sp > 0.0 && sq < 0.0) || (sp < 0.0 && sq > 0.0) {
            let t = sp / (sp - sq);
            let cut = p + (q - p) * t;
            inside.push(cut);
            outside.push(cut);
        }
    }

    let keep = |part: Vec<Vec2>| {
        (part.len() >= 3 && polygon_area(&part).abs() > AREA_EPSILON).then_some(part)
    };
    (keep(inside), keep(outside))
}

/// Subtract a convex CCW polygon from a triangle, returning convex pieces.
fn subtract_convex(tri: [Vec2; 3], poly: &[Vec2]) -> Vec<Vec<Vec2>> {
    let mut result = Vec::new();
    let mut pending = vec![tri.to_vec()];

    for (i, &a) in poly.iter().enumerate() {
        let b = poly[(i + 1) % poly.len()];
        let mut still_inside = Vec::new();

        for piece in pending {
            let (inside, outside) = split_convex(&piece, a, b);
            if let Some(out) = outside {
                // Outside this edge means outside the convex cutout for good.
                result.push(out);
            }
            if let Some(inn) = inside {
                still_inside.push(inn);
            }
        }

        pending = still_inside;
        if pending.is_empty() {
            break;
        }
    }

    // Anything still inside every edge is under the cutout: dropped.
    result
}

/// Maintains the lake plane, the tracked cutout volume, and their difference.
pub struct CutoutTracker {
    base: RawGeometry,
    plane_size: f32,
    footprint: Vec<Vec2>,
    volume: Transform,
    tracked: bool,
    combined: RawGeometry,
}

impl CutoutTracker {
    /// Create a tracker over a `plane_size`×`plane_size` lake plane with the
    /// given local-space cutout footprint.
    ///
    /// Until the first successful [`sync`](Self::sync), the combined geometry
    /// is the unmodified base plane.
    pub fn new(plane_size: f32, footprint: Vec<Vec2>) -> Self {
        let base = RawGeometry::plane(plane_size);
        let combined = base.clone();
        Self {
            base,
            plane_size,
            footprint,
            volume: Transform::new(),
            tracked: false,
            combined,
        }
    }

    /// Copy the tracked object's transform onto the cutout volume and
    /// recompute the combined geometry.
    ///
    /// `None` means the tracked object has not been placed yet; the call is a
    /// no-op and the previous combined geometry stays in place. Returns
    /// whether a recompute happened.
    pub fn sync(&mut self, tracked: Option<Transform>) -> bool {
        let Some(transform) = tracked else {
            return false;
        };

        self.volume = transform;
        self.tracked = true;
        self.recompute();
        true
    }

    /// The cutout volume's current transform.
    pub fn volume_transform(&self) -> Transform {
        self.volume
    }

    /// The lake geometry with the cutout applied (the base plane before any
    /// sync has run).
    pub fn combined(&self) -> &RawGeometry {
        &self.combined
    }

    /// The untouched base plane.
    pub fn base(&self) -> &RawGeometry {
        &self.base
    }

    /// The volume's footprint in world XZ space under its current transform.
    fn world_footprint(&self) -> Vec<Vec2> {
        let mut poly: Vec<Vec2> = self
            .footprint
            .iter()
            .map(|p| {
                let world =
                    self.volume.rotation * Vec3::new(p.x, 0.0, p.y) + self.volume.position;
                Vec2::new(world.x, world.z)
            })
            .collect();

        // A rotation can mirror the projected outline; the clipper needs CCW.
        if polygon_area(&poly) < 0.0 {
            poly.reverse();
        }
        poly
    }

    fn recompute(&mut self) {
        let poly = self.world_footprint();

        // An edge-on volume has no footprint to subtract.
        if polygon_area(&poly) < AREA_EPSILON {
            self.combined = self.base.clone();
            return;
        }

        let (poly_min, poly_max) = poly.iter().fold(
            (Vec2::splat(f32::INFINITY), Vec2::splat(f32::NEG_INFINITY)),
            |(min, max), &p| (min.min(p), max.max(p)),
        );

        let mut vertices = Vec::new();
        let mut indices = Vec::new();

        for tri in self.base.indices.chunks(3) {
            let corners = [
                Vec3::from(self.base.vertices[tri[0] as usize].position),
                Vec3::from(self.base.vertices[tri[1] as usize].position),
                Vec3::from(self.base.vertices[tri[2] as usize].position),
            ];
            let tri2 = [
                Vec2::new(corners[0].x, corners[0].z),
                Vec2::new(corners[1].x, corners[1].z),
                Vec2::new(corners[2].x, corners[2].z),
            ];

            let tri_min = tri2[0].min(tri2[1]).min(tri2[2]);
            let tri_max = tri2[0].max(tri2[1]).max(tri2[2]);
            let overlaps = tri_min.x <= poly_max.x
                && tri_max.x >= poly_min.x
                && tri_min.y <= poly_max.y
                && tri_max.y >= poly_min.y;

            if !overlaps {
                Self::emit_polygon(&tri2, self.plane_size, &mut vertices, &mut indices);
                continue;
            }

            for piece in subtract_convex(tri2, &poly) {
                Self::emit_polygon(&piece, self.plane_size, &mut vertices, &mut indices);
            }
        }

        log::debug!(
            "cutout recompute: {} triangles from {} base",
            indices.len() / 3,
            self.base.indices.len() / 3
        );

        self.combined = RawGeometry::new(vertices, indices);
    }

    /// Fan-triangulate a convex XZ polygon into plane vertices.
    fn emit_polygon(
        poly: &[Vec2],
        plane_size: f32,
        vertices: &mut Vec<Vertex3d>,
        indices: &mut Vec<u32>,
    ) {
        let base = vertices.len() as u32;
        for p in poly {
            // Same position-derived UV mapping as the base plane, so the cut
            // edges sample the distortion map continuously.
            vertices.push(Vertex3d::new(
                [p.x, 0.0, p.y],
                [0.0, 1.0, 0.0],
                [p.x / plane_size + 0.5, p.y / plane_size + 0.5],
            ));
        }
        for i in 1..poly.len() as u32 - 1 {
            indices.extend_from_slice(&[base, base + i, base + i + 1]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn point_in_combined(geom: &RawGeometry, point: Vec2) -> bool {
        geom.indices.chunks(3).any(|tri| {
            let a = Vec3::from(geom.vertices[tri[0] as usize].position);
            let b = Vec3::from(geom.vertices[tri[1] as usize].position);
            let c = Vec3::from(geom.vertices[tri[2] as usize].position);
            let (a, b, c) = (
                Vec2::new(a.x, a.z),
                Vec2::new(b.x, b.z),
                Vec2::new(c.x, c.z),
            );
            let d0 = (b - a).perp_dot(point - a);
            let d1 = (c - b).perp_dot(point - b);
            let d2 = (a - c).perp_dot(point - c);
            (d0 >= 0.0 && d1 >= 0.0 && d2 >= 0.0) || (d0 <= 0.0 && d1 <= 0.0 && d2 <= 0.0)
        })
    }

    fn tracker() -> CutoutTracker {
        CutoutTracker::new(252.0, hull_footprint(12.0, 5.0))
    }

    #[test]
    fn footprint_is_ccw() {
        assert!(polygon_area(&hull_footprint(12.0, 5.0)) > 0.0);
    }

    #[test]
    fn sync_without_tracked_object_is_a_noop() {
        let mut tracker = tracker();
        assert!(!tracker.sync(None));
        assert_eq!(
            tracker.combined().vertices.len(),
            tracker.base().vertices.len()
        );
        assert!((tracker.combined().area() - tracker.base().area()).abs() < 1e-3);
    }

    #[test]
    fn sync_copies_position_and_orientation_exactly() {
        let mut tracker = tracker();
        let pose = Transform::from_position(Vec3::new(10.0, 0.0, 5.0))
            .rotation(Quat::from_rotation_y(0.37));
        assert!(tracker.sync(Some(pose)));
        assert_eq!(tracker.volume_transform().position, pose.position);
        assert_eq!(tracker.volume_transform().rotation, pose.rotation);
    }

    #[test]
    fn combined_area_drops_by_footprint_area() {
        let mut tracker = tracker();
        tracker.sync(Some(Transform::from_position(Vec3::new(10.0, 0.0, 5.0))));

        let removed = polygon_area(&hull_footprint(12.0, 5.0));
        let expected = tracker.base().area() - removed;
        assert!(
            (tracker.combined().area() - expected).abs() < 1.0,
            "area {} vs expected {}",
            tracker.combined().area(),
            expected
        );
    }

    #[test]
    fn cutout_region_has_no_surface() {
        let mut tracker = tracker();
        tracker.sync(Some(Transform::from_position(Vec3::new(10.0, 0.0, 5.0))));

        // Center of the cutout is open water. . . or rather, open hole.
        assert!(!point_in_combined(tracker.combined(), Vec2::new(10.0, 5.0)));
        // Well away from the boat, the plane is intact.
        assert!(point_in_combined(tracker.combined(), Vec2::new(-60.0, -60.0)));
    }

    #[test]
    fn cutout_follows_the_tracked_object_without_lag() {
        let mut tracker = tracker();
        tracker.sync(Some(Transform::from_position(Vec3::new(10.0, 0.0, 5.0))));
        tracker.sync(Some(Transform::from_position(Vec3::new(12.0, 0.0, 5.0))));

        assert_eq!(
            tracker.volume_transform().position,
            Vec3::new(12.0, 0.0, 5.0)
        );
        // The hole is at the new position only.
        assert!(!point_in_combined(tracker.combined(), Vec2::new(12.0, 5.0)));
        assert!(point_in_combined(tracker.combined(), Vec2::new(10.0 - 4.0, 5.0)));
    }

    #[test]
    fn rotated_cutout_removes_the_same_area() {
        let mut tracker = tracker();
        tracker.sync(Some(
            Transform::from_position(Vec3::new(-20.0, 0.0, 30.0))
                .rotation(Quat::from_rotation_y(std::f32::consts::FRAC_PI_2)),
        ));

        let removed = polygon_area(&hull_footprint(12.0, 5.0));
        let expected = tracker.base().area() - removed;
        assert!((tracker.combined().area() - expected).abs() < 1.0);
    }

    #[test]
    fn recompute_happens_on_every_sync() {
        let mut tracker = tracker();
        tracker.sync(Some(Transform::from_position(Vec3::new(0.0, 0.0, 0.0))));
        let first = tracker.combined().vertices.len();
        // Same transform again still rebuilds rather than reusing a cache.
        tracker.sync(Some(Transform::from_position(Vec3::new(0.0, 0.0, 0.0))));
        assert_eq!(tracker.combined().vertices.len(), first);
        tracker.sync(Some(Transform::from_position(Vec3::new(100.0, 0.0, 100.0))));
        assert!(!point_in_combined(tracker.combined(), Vec2::new(100.0, 100.0)));
        assert!(point_in_combined(tracker.combined(), Vec2::new(0.0, 0.0)));
    }

    #[test]
    fn split_convex_partitions_area() {
        let tri = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(4.0, 0.0),
            Vec2::new(0.0, 4.0),
        ];
        let (inside, outside) = split_convex(&tri, Vec2::new(2.0, -1.0), Vec2::new(2.0, 5.0));
        let inside = inside.expect("left part");
        let outside = outside.expect("right part");
        let total = polygon_area(&inside).abs() + polygon_area(&outside).abs();
        assert!((total - 8.0).abs() < 1e-4);
    }
}
