//! Scene collaborator for ray casting
//!
//! Interactive objects are referred to by opaque handles. The renderer (or
//! [`BoxScene`] when there is none) owns the geometry behind them.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::camera::Ray;

/// Opaque id of a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectHandle(pub u32);

/// One ray hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    pub handle: ObjectHandle,
    pub distance: f32,
    pub point: Vec3,
}

/// Ray casting against scene objects
pub trait SceneQuery {
    /// Hits among `candidates`, nearest first
    fn intersect(&self, ray: &Ray, candidates: &[ObjectHandle]) -> Vec<Intersection>;
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
        }
    }

    pub fn from_center(center: Vec3, size: Vec3) -> Self {
        let half = size.abs() * 0.5;
        Self::new(center - half, center + half)
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn translated(&self, offset: Vec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Slab test; returns the entry distance (0 when the origin is inside)
    pub fn ray_distance(&self, ray: &Ray) -> Option<f32> {
        let mut t_min = 0.0f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = ray.origin[axis];
            let dir = ray.direction[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);

            if dir.abs() < 1e-8 {
                if origin < lo || origin > hi {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let mut t0 = (lo - origin) * inv;
            let mut t1 = (hi - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

/// Arena of boxes standing in for rendered meshes
#[derive(Debug, Clone, Default)]
pub struct BoxScene {
    boxes: Vec<Option<Aabb>>,
}

impl BoxScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, bounds: Aabb) -> ObjectHandle {
        self.boxes.push(Some(bounds));
        ObjectHandle((self.boxes.len() - 1) as u32)
    }

    pub fn bounds(&self, handle: ObjectHandle) -> Option<Aabb> {
        self.boxes.get(handle.0 as usize).copied().flatten()
    }

    pub fn set_bounds(&mut self, handle: ObjectHandle, bounds: Aabb) {
        if let Some(slot) = self.boxes.get_mut(handle.0 as usize) {
            if slot.is_some() {
                *slot = Some(bounds);
            }
        }
    }

    /// Recenter an object, keeping its size
    pub fn move_to(&mut self, handle: ObjectHandle, center: Vec3) {
        if let Some(bounds) = self.bounds(handle) {
            self.set_bounds(handle, bounds.translated(center - bounds.center()));
        }
    }

    /// Remove an object; its handle is never reused
    pub fn remove(&mut self, handle: ObjectHandle) {
        if let Some(slot) = self.boxes.get_mut(handle.0 as usize) {
            *slot = None;
        }
    }

    pub fn contains(&self, handle: ObjectHandle) -> bool {
        self.bounds(handle).is_some()
    }
}

impl SceneQuery for BoxScene {
    fn intersect(&self, ray: &Ray, candidates: &[ObjectHandle]) -> Vec<Intersection> {
        let mut hits: Vec<Intersection> = candidates
            .iter()
            .filter_map(|&handle| {
                let distance = self.bounds(handle)?.ray_distance(ray)?;
                Some(Intersection {
                    handle,
                    distance,
                    point: ray.at(distance),
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
