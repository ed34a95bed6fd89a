//! Collision detection between movers and world colliders
//!
//! Boxes are axis-aligned and recomputed from the world on every probe run:
//! the target slides along its path and the arrow turns as it flies, so
//! nothing is cached between frames. Walls are infinite planes.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn from_center_half_extents(center: Vec3, half: Vec3) -> Self {
        let half = half.abs();
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Touching boxes count as intersecting
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && self.max.cmpge(other.min).all()
    }

    /// Overlap with `other`, with the normal along the axis of least
    /// penetration pointing from `other` towards `self`
    pub fn contact(&self, other: &Aabb) -> Option<Contact> {
        if !self.intersects(other) {
            return None;
        }
        let overlap = self.max.min(other.max) - self.min.max(other.min);
        let offset = self.center() - other.center();

        let (axis, penetration) = [(Vec3::X, overlap.x), (Vec3::Y, overlap.y), (Vec3::Z, overlap.z)]
            .into_iter()
            .fold((Vec3::X, f32::INFINITY), |best, candidate| {
                if candidate.1 < best.1 { candidate } else { best }
            });

        let side = if axis.dot(offset) < 0.0 { -1.0 } else { 1.0 };
        Some(Contact {
            normal: axis * side,
            penetration,
        })
    }
}

/// Half-space boundary `normal . p = offset`; the normal faces the open side
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vec3,
    pub offset: f32,
}

impl Plane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        Self {
            normal: normal.normalize_or(Vec3::Y),
            offset,
        }
    }

    /// Plane through `point`
    pub fn through(point: Vec3, normal: Vec3) -> Self {
        let normal = normal.normalize_or(Vec3::Y);
        Self {
            normal,
            offset: normal.dot(point),
        }
    }

    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) - self.offset
    }

    /// Box touches or crosses the plane
    pub fn contact(&self, aabb: &Aabb) -> Option<Contact> {
        // Projected radius of the box onto the normal
        let radius = self.normal.abs().dot(aabb.half_extents());
        let distance = self.signed_distance(aabb.center());
        if distance > radius {
            return None;
        }
        Some(Contact {
            normal: self.normal,
            penetration: radius - distance,
        })
    }
}

/// Result of a successful test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    /// Unit normal pointing from the collider towards the mover
    pub normal: Vec3,
    pub penetration: f32,
}

/// Shapes a mover can be tested against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Collider {
    Box(Aabb),
    Plane(Plane),
}

impl Collider {
    pub fn contact(&self, mover: &Aabb) -> Option<Contact> {
        match self {
            Collider::Box(aabb) => mover.contact(aabb),
            Collider::Plane(plane) => plane.contact(mover),
        }
    }
}

/// Anything that can report current boxes and colliders by key
pub trait CollisionWorld {
    type Key: Copy;

    /// Current box of a mover, `None` if it does not exist right now
    fn mover_box(&self, key: Self::Key) -> Option<Aabb>;

    /// Current collider of a candidate, `None` if it does not exist right now
    fn collider(&self, key: Self::Key) -> Option<Collider>;
}

/// A mover and the fixed list of candidates it is tested against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Probe<K> {
    pub mover: K,
    pub candidates: Vec<K>,
}

impl<K: Copy> Probe<K> {
    pub fn new(mover: K, candidates: Vec<K>) -> Self {
        Self { mover, candidates }
    }

    /// Test the mover against every candidate with freshly computed shapes.
    /// `on_hit` runs once per intersecting candidate; there is no early exit.
    /// Returns the number of hits.
    pub fn run<W>(&self, world: &W, mut on_hit: impl FnMut(K, Contact)) -> usize
    where
        W: CollisionWorld<Key = K>,
    {
        let Some(mover) = world.mover_box(self.mover) else {
            return 0;
        };
        let mut hits = 0;
        for &candidate in &self.candidates {
            let Some(collider) = world.collider(candidate) else {
                continue;
            };
            if let Some(contact) = collider.contact(&mover) {
                on_hit(candidate, contact);
                hits += 1;
            }
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_intersects_inclusive() {
        let a = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::from_center_half_extents(Vec3::new(2.0, 0.0, 0.0), Vec3::ONE);
        let c = Aabb::from_center_half_extents(Vec3::new(2.1, 0.0, 0.0), Vec3::ONE);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_aabb_contact_uses_least_penetration_axis() {
        let mover = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, -1.5), Vec3::ONE);
        let wall = Aabb::from_center_half_extents(Vec3::ZERO, Vec3::new(5.0, 5.0, 1.0));
        let contact = mover.contact(&wall).unwrap();
        assert_eq!(contact.normal, Vec3::NEG_Z);
        assert!((contact.penetration - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_plane_contact_within_projected_radius() {
        // Wall at z = 10 facing back into the field
        let plane = Plane::through(Vec3::new(0.0, 0.0, 10.0), Vec3::NEG_Z);
        let near = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 7.0), Vec3::splat(4.0));
        let far = Aabb::from_center_half_extents(Vec3::new(0.0, 0.0, 5.0), Vec3::splat(4.0));
        let contact = plane.contact(&near).unwrap();
        assert_eq!(contact.normal, Vec3::NEG_Z);
        assert!((contact.penetration - 1.0).abs() < 1e-5);
        assert!(plane.contact(&far).is_none());
    }

    #[derive(Clone, Copy, Debug, PartialEq)]
    enum Key {
        Mover,
        A,
        B,
        Gone,
    }

    struct World {
        mover: Vec3,
    }

    impl CollisionWorld for World {
        type Key = Key;

        fn mover_box(&self, key: Key) -> Option<Aabb> {
            (key == Key::Mover).then(|| Aabb::from_center_half_extents(self.mover, Vec3::ONE))
        }

        fn collider(&self, key: Key) -> Option<Collider> {
            match key {
                Key::A => Some(Collider::Box(Aabb::from_center_half_extents(
                    Vec3::ZERO,
                    Vec3::ONE,
                ))),
                Key::B => Some(Collider::Plane(Plane::new(Vec3::Y, 0.0))),
                _ => None,
            }
        }
    }

    #[test]
    fn test_probe_reports_every_hit() {
        let probe = Probe::new(Key::Mover, vec![Key::A, Key::Gone, Key::B]);
        let world = World { mover: Vec3::new(0.5, 0.5, 0.0) };
        let mut seen = Vec::new();
        let hits = probe.run(&world, |key, _| seen.push(key));
        assert_eq!(hits, 2);
        assert_eq!(seen, vec![Key::A, Key::B]);
    }

    #[test]
    fn test_probe_recomputes_boxes_each_run() {
        let probe = Probe::new(Key::Mover, vec![Key::A]);
        let mut world = World { mover: Vec3::new(0.5, 0.0, 0.0) };
        assert_eq!(probe.run(&world, |_, _| {}), 1);
        world.mover = Vec3::new(10.0, 0.0, 0.0);
        assert_eq!(probe.run(&world, |_, _| {}), 0);
    }
}
