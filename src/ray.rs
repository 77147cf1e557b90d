//! Picking rays: screen-space unprojection and ray-sphere intersection.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit length
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Ray through pixel (x, y) of a `width` x `height` viewport, y down.
    ///
    /// Works for perspective and orthographic projections with 0..1 depth.
    pub fn from_screen(view: Mat4, proj: Mat4, x: f32, y: f32, width: f32, height: f32) -> Self {
        let ndc_x = (x / (width * 0.5)) - 1.0;
        let ndc_y = 1.0 - (y / (height * 0.5));
        let inverse_vp = (proj * view).inverse();

        let near = inverse_vp.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let mid = inverse_vp.project_point3(Vec3::new(ndc_x, ndc_y, 0.5));
        Self::new(near, mid - near)
    }

    /// Distance along the ray to the first intersection with a sphere, if
    /// any lies ahead of the origin. An origin inside the sphere hits at 0.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let to_center = center - self.origin;
        let c = to_center.length_squared() - radius * radius;
        if c <= 0.0 {
            return Some(0.0);
        }

        let b = to_center.dot(self.direction);
        if b < 0.0 {
            return None; // Sphere behind the origin
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        Some(b - discriminant.sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-4;

    #[test]
    fn test_sphere_hit_and_miss() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);

        let t = ray.intersect_sphere(Vec3::ZERO, 1.0).unwrap();
        assert!((t - 4.0).abs() < EPSILON, "t = {}", t);
        assert!(ray.at(t).distance(Vec3::new(0.0, 0.0, 1.0)) < EPSILON);

        assert_eq!(ray.intersect_sphere(Vec3::new(3.0, 0.0, 0.0), 1.0), None);
        // Behind the origin
        assert_eq!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 10.0), 1.0), None);
        // Origin inside
        assert_eq!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 5.5), 1.0), Some(0.0));
    }

    #[test]
    fn test_new_normalizes_direction() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0));
        assert!((ray.direction.length() - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_screen_center_ray_points_at_target() {
        let eye = Vec3::new(0.0, 1.0, 4.0);
        let target = Vec3::new(0.0, 0.5, 0.0);
        let view = Mat4::look_at_rh(eye, target, Vec3::Y);
        let proj = Mat4::perspective_rh(45f32.to_radians(), 16.0 / 9.0, 0.1, 100.0);

        let ray = Ray::from_screen(view, proj, 800.0, 450.0, 1600.0, 900.0);
        let expected = (target - eye).normalize();
        assert!(ray.direction.dot(expected) > 0.9999, "direction {:?}", ray.direction);
        // Origin lies on the near plane, in front of the eye
        assert!((ray.origin.distance(eye) - 0.1).abs() < 1e-3, "origin {:?}", ray.origin);
    }

    #[test]
    fn test_screen_ray_passes_through_projected_point() {
        let eye = Vec3::new(2.0, 1.5, 3.0);
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(50f32.to_radians(), 1.0, 0.1, 50.0);
        let point = Vec3::new(0.3, 0.2, -0.1);

        let ndc = (proj * view).project_point3(point);
        let x = (ndc.x + 1.0) * 0.5 * 512.0;
        let y = (1.0 - ndc.y) * 0.5 * 512.0;

        let ray = Ray::from_screen(view, proj, x, y, 512.0, 512.0);
        let hit = ray.intersect_sphere(point, 0.01);
        assert!(hit.is_some(), "ray {:?} misses {:?}", ray, point);
    }
}
