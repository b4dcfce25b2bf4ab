//! Pointer and touch interaction
//!
//! Converts pointer positions into domain events by casting rays into the
//! scene: balloon pops, opening the gift, and the knife drag that cuts the
//! cake. Events are pure functions of camera, pointer and scene. The reveal's
//! scratch card is a flat screen overlay and is hit-tested in screen space.

pub mod camera;
pub mod layout;
pub mod scene;
pub mod scratch;

pub use camera::{Camera, Ray, Viewport};
pub use layout::SceneLayout;
pub use scene::{Aabb, BoxScene, Intersection, ObjectHandle, SceneQuery};
pub use scratch::{ScratchCard, ScreenRect};

use glam::{Vec2, Vec3};

use crate::consts::*;

/// Domain event produced by an interaction
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    /// A balloon was tapped (balloon id)
    BalloonPopped(usize),
    /// The gift box was tapped
    GiftOpened,
    /// A knife drag session began
    KnifeGrabbed,
    /// The dragged knife moved
    KnifeMoved { position: Vec3, tilt: f32 },
    /// The knife reached the cake; fires once
    CakeCut,
    /// Scratch stroke at `uv` (0..1 across the card)
    Scratched { uv: Vec2 },
}

/// Handles the detector hit-tests against
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractiveObjects {
    /// Scene handle paired with balloon id
    pub balloons: Vec<(ObjectHandle, usize)>,
    pub gift: Option<ObjectHandle>,
    pub knife: Option<ObjectHandle>,
    pub cake_center: Vec3,
    /// On-screen scratch card, while it can still be scratched
    pub scratch_card: Option<ScreenRect>,
}

/// An in-progress knife drag
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DragSession {
    /// Last pointer projection on the drag plane
    pub current_plane_point: Option<Vec3>,
}

/// First object the ray through `ndc` hits among `candidates`
pub fn hit_test(
    scene: &dyn SceneQuery,
    camera: &Camera,
    ndc: Vec2,
    candidates: &[ObjectHandle],
) -> Option<ObjectHandle> {
    if candidates.is_empty() {
        return None;
    }
    let ray = camera.ray_from_ndc(ndc);
    scene.intersect(&ray, candidates).first().map(|hit| hit.handle)
}

/// Whether `point` is horizontally within the cut radius of `center`
pub fn within_cut_radius(point: Vec3, center: Vec3) -> bool {
    let dx = point.x - center.x;
    let dz = point.z - center.z;
    (dx * dx + dz * dz).sqrt() < CUT_RADIUS
}

/// Tracks pointer input and the knife drag session
#[derive(Debug, Clone)]
pub struct InteractionDetector {
    camera: Camera,
    viewport: Viewport,
    objects: InteractiveObjects,
    drag: Option<DragSession>,
    cut: bool,
    scratching: bool,
}

impl InteractionDetector {
    pub fn new(camera: Camera, viewport: Viewport) -> Self {
        let mut camera = camera;
        camera.set_aspect(viewport.aspect());
        Self {
            camera,
            viewport,
            objects: InteractiveObjects::default(),
            drag: None,
            cut: false,
            scratching: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.camera.set_aspect(viewport.aspect());
    }

    pub fn objects(&self) -> &InteractiveObjects {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut InteractiveObjects {
        &mut self.objects
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn has_cut(&self) -> bool {
        self.cut
    }

    pub fn is_scratching(&self) -> bool {
        self.scratching
    }

    /// Forget the drag session, scratch stroke and cut flag (new cake scene)
    pub fn reset(&mut self) {
        self.drag = None;
        self.cut = false;
        self.scratching = false;
    }

    /// Pointer pressed at `pointer` (CSS pixels)
    pub fn on_press_start(
        &mut self,
        scene: &dyn SceneQuery,
        pointer: Vec2,
    ) -> Option<InteractionEvent> {
        // The card overlays the scene
        if let Some(uv) = self.objects.scratch_card.and_then(|rect| rect.to_uv(pointer)) {
            self.scratching = true;
            return Some(InteractionEvent::Scratched { uv });
        }

        let ndc = self.viewport.to_ndc(pointer);

        if !self.cut {
            if let Some(knife) = self.objects.knife {
                if hit_test(scene, &self.camera, ndc, &[knife]).is_some() {
                    self.drag = Some(DragSession::default());
                    log::debug!("Knife grabbed");
                    return Some(InteractionEvent::KnifeGrabbed);
                }
            }
        }

        let mut candidates: Vec<ObjectHandle> =
            self.objects.balloons.iter().map(|(h, _)| *h).collect();
        candidates.extend(self.objects.gift);

        let hit = hit_test(scene, &self.camera, ndc, &candidates)?;
        if Some(hit) == self.objects.gift {
            return Some(InteractionEvent::GiftOpened);
        }
        self.objects
            .balloons
            .iter()
            .find(|(h, _)| *h == hit)
            .map(|&(_, id)| InteractionEvent::BalloonPopped(id))
    }

    /// Pointer moved while pressed
    pub fn on_press_move(&mut self, pointer: Vec2) -> Option<InteractionEvent> {
        if self.scratching {
            // Leaving the card ends the stroke
            let uv = self.objects.scratch_card.and_then(|rect| rect.to_uv(pointer));
            self.scratching = uv.is_some();
            return uv.map(|uv| InteractionEvent::Scratched { uv });
        }

        let session = self.drag.as_mut()?;

        let ray = self.camera.ray_from_ndc(self.viewport.to_ndc(pointer));
        let point = ray.intersect_horizontal_plane(DRAG_PLANE_HEIGHT)?;
        if point.x.abs() > DRAG_PLANE_HALF_EXTENT || point.z.abs() > DRAG_PLANE_HALF_EXTENT {
            return None;
        }
        session.current_plane_point = Some(point);

        if within_cut_radius(point, self.objects.cake_center) {
            self.drag = None;
            self.cut = true;
            log::info!("Cake cut at ({:.2}, {:.2})", point.x, point.z);
            return Some(InteractionEvent::CakeCut);
        }

        Some(InteractionEvent::KnifeMoved {
            position: Vec3::new(point.x, KNIFE_HEIGHT, point.z),
            tilt: KNIFE_TILT,
        })
    }

    /// Pointer released; returns whether a drag session was discarded
    pub fn on_press_end(&mut self) -> bool {
        self.scratching = false;
        self.drag.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::layout::{KNIFE_GRAB_SIZE, KNIFE_REST};
    use super::*;

    fn viewport() -> Viewport {
        Viewport::new(0.0, 0.0, 1280.0, 720.0)
    }

    /// Screen position of a world point
    fn pointer_for(detector: &InteractionDetector, world: Vec3) -> Vec2 {
        let clip = detector.camera().view_projection().project_point3(world);
        let vp = viewport();
        Vec2::new(
            (clip.x + 1.0) * 0.5 * vp.width + vp.left,
            (1.0 - clip.y) * 0.5 * vp.height + vp.top,
        )
    }

    fn cake_scene() -> (BoxScene, InteractionDetector) {
        let mut scene = BoxScene::new();
        let knife = scene.insert(Aabb::from_center(KNIFE_REST, KNIFE_GRAB_SIZE));
        let mut detector = InteractionDetector::new(Camera::cake_view(1.0), viewport());
        detector.objects_mut().knife = Some(knife);
        (scene, detector)
    }

    #[test]
    fn test_knife_cut_within_radius_fires_once() {
        let (scene, mut detector) = cake_scene();
        let grab = pointer_for(&detector, KNIFE_REST);
        assert_eq!(
            detector.on_press_start(&scene, grab),
            Some(InteractionEvent::KnifeGrabbed)
        );

        let near = pointer_for(&detector, Vec3::new(1.4, DRAG_PLANE_HEIGHT, 0.0));
        assert_eq!(detector.on_press_move(near), Some(InteractionEvent::CakeCut));
        assert!(!detector.is_dragging());
        assert!(detector.has_cut());

        // Further moves and presses do nothing
        assert_eq!(detector.on_press_move(near), None);
        assert!(!detector.on_press_end());
        assert_eq!(detector.on_press_start(&scene, grab), None);
    }

    #[test]
    fn test_knife_outside_radius_then_release_fires_nothing() {
        let (scene, mut detector) = cake_scene();
        let grab = pointer_for(&detector, KNIFE_REST);
        detector.on_press_start(&scene, grab);

        let far = pointer_for(&detector, Vec3::new(1.6, DRAG_PLANE_HEIGHT, 0.0));
        match detector.on_press_move(far) {
            Some(InteractionEvent::KnifeMoved { position, tilt }) => {
                assert!((position.x - 1.6).abs() < 1e-3);
                assert!(position.z.abs() < 1e-3);
                assert_eq!(position.y, KNIFE_HEIGHT);
                assert_eq!(tilt, KNIFE_TILT);
            }
            other => panic!("expected knife move, got {other:?}"),
        }
        let session = detector.drag_session().unwrap();
        assert!(session.current_plane_point.is_some());

        assert!(detector.on_press_end());
        assert!(!detector.has_cut());
        assert_eq!(detector.on_press_move(far), None);
    }

    #[test]
    fn test_move_without_session_is_ignored() {
        let (_, mut detector) = cake_scene();
        let p = pointer_for(&detector, Vec3::new(0.0, DRAG_PLANE_HEIGHT, 0.0));
        assert_eq!(detector.on_press_move(p), None);
    }

    #[test]
    fn test_press_on_empty_space() {
        let (scene, mut detector) = cake_scene();
        let p = pointer_for(&detector, Vec3::new(-6.0, 0.0, -6.0));
        assert_eq!(detector.on_press_start(&scene, p), None);
        assert!(!detector.is_dragging());
    }

    #[test]
    fn test_balloons_and_gift() {
        let mut scene = BoxScene::new();
        let mut detector = InteractionDetector::new(Camera::cake_view(1.0), viewport());
        let centers = [Vec3::new(-3.0, 2.0, 0.0), Vec3::ZERO, Vec3::new(3.0, 2.0, 0.0)];
        for (id, center) in centers.iter().enumerate() {
            let h = scene.insert(Aabb::from_center(*center, Vec3::ONE));
            detector.objects_mut().balloons.push((h, id));
        }

        let p = pointer_for(&detector, centers[2]);
        assert_eq!(
            detector.on_press_start(&scene, p),
            Some(InteractionEvent::BalloonPopped(2))
        );

        let gift = scene.insert(Aabb::from_center(Vec3::new(0.0, 0.0, 4.0), Vec3::ONE));
        detector.objects_mut().gift = Some(gift);
        let p = pointer_for(&detector, Vec3::new(0.0, 0.0, 4.0));
        assert_eq!(
            detector.on_press_start(&scene, p),
            Some(InteractionEvent::GiftOpened)
        );
    }

    #[test]
    fn test_scratch_stroke_stays_on_the_card() {
        let (scene, mut detector) = cake_scene();
        detector.objects_mut().knife = None;
        detector.objects_mut().scratch_card = Some(ScreenRect::new(490.0, 270.0, 300.0, 180.0));

        assert_eq!(
            detector.on_press_start(&scene, Vec2::new(640.0, 360.0)),
            Some(InteractionEvent::Scratched {
                uv: Vec2::new(0.5, 0.5)
            })
        );
        assert!(detector.is_scratching());
        assert_eq!(
            detector.on_press_move(Vec2::new(490.0, 270.0)),
            Some(InteractionEvent::Scratched { uv: Vec2::ZERO })
        );

        // Off the card: the stroke ends and does not resume on re-entry
        assert_eq!(detector.on_press_move(Vec2::new(100.0, 100.0)), None);
        assert!(!detector.is_scratching());
        assert_eq!(detector.on_press_move(Vec2::new(640.0, 360.0)), None);

        detector.on_press_start(&scene, Vec2::new(640.0, 360.0));
        assert!(!detector.on_press_end());
        assert!(!detector.is_scratching());
        assert_eq!(detector.on_press_start(&scene, Vec2::new(10.0, 10.0)), None);
    }

    #[test]
    fn test_hit_test_is_pure() {
        let mut scene = BoxScene::new();
        let h = scene.insert(Aabb::from_center(Vec3::ZERO, Vec3::ONE));
        let camera = Camera::cake_view(1.0);
        assert_eq!(hit_test(&scene, &camera, Vec2::ZERO, &[h]), Some(h));
        assert_eq!(hit_test(&scene, &camera, Vec2::ZERO, &[h]), Some(h));
        assert_eq!(hit_test(&scene, &camera, Vec2::ZERO, &[]), None);
        assert_eq!(hit_test(&scene, &camera, Vec2::new(0.9, 0.9), &[h]), None);
    }

    #[test]
    fn test_cut_radius_boundary() {
        assert!(within_cut_radius(Vec3::new(1.4, 3.0, 0.0), Vec3::ZERO));
        assert!(!within_cut_radius(Vec3::new(1.5, 0.0, 0.0), Vec3::ZERO));
        assert!(!within_cut_radius(Vec3::new(1.2, 0.0, 1.2), Vec3::ZERO));
    }
}
