//! Perspective camera and pointer rays

use glam::{Mat4, Vec2, Vec3};

/// A world-space ray
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Intersection with the horizontal plane `y = height`, in front of the origin
    pub fn intersect_horizontal_plane(&self, height: f32) -> Option<Vec3> {
        if self.direction.y.abs() < 1e-6 {
            return None;
        }
        let t = (height - self.origin.y) / self.direction.y;
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Canvas rectangle in CSS pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Pointer position to normalized device coordinates (Y up)
    pub fn to_ndc(&self, pointer: Vec2) -> Vec2 {
        let w = self.width.max(1.0);
        let h = self.height.max(1.0);
        Vec2::new(
            (pointer.x - self.left) / w * 2.0 - 1.0,
            -((pointer.y - self.top) / h) * 2.0 + 1.0,
        )
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1.0) / self.height.max(1.0)
    }
}

/// Right-handed perspective camera looking down its forward axis
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub forward: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    /// Vertical field of view (radians)
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3, fov_y_degrees: f32, aspect: f32) -> Self {
        let forward = (target - position).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward).normalize_or_zero();
        Self {
            position,
            forward,
            up,
            right,
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near: 0.1,
            far: 100.0,
        }
    }

    /// The cake table view: above and in front, looking at the origin
    pub fn cake_view(aspect: f32) -> Self {
        Self::new(Vec3::new(0.0, 8.0, 12.0), Vec3::ZERO, 45.0, aspect)
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect.max(1e-6);
    }

    #[inline]
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward, self.up)
    }

    #[inline]
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect.max(1e-6), self.near, self.far)
    }

    #[inline]
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Ray from the camera through an NDC point
    pub fn ray_from_ndc(&self, ndc: Vec2) -> Ray {
        let tan_half = (self.fov_y * 0.5).tan();
        let dx = ndc.x * tan_half * self.aspect;
        let dy = ndc.y * tan_half;
        let direction = (self.right * dx + self.up * dy + self.forward).normalize();
        Ray {
            origin: self.position,
            direction,
        }
    }
}
