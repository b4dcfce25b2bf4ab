//! Hit volumes for the interactive objects
//!
//! Stands in for rendered meshes: balloons over the landing, the gift box and
//! the knife's grab box beside the cake. The scratch card's screen rectangle
//! is supplied by whoever lays out the page.

use glam::Vec3;

use super::InteractiveObjects;
use super::scene::{Aabb, BoxScene, ObjectHandle};
use super::scratch::ScreenRect;
use crate::consts::BALLOON_COUNT;
use crate::sim::{ExperienceController, ExperienceStage};

/// Knife position before it is grabbed
pub const KNIFE_REST: Vec3 = Vec3::new(3.5, 2.0, 2.0);
/// Knife grab box (larger than the blade)
pub const KNIFE_GRAB_SIZE: Vec3 = Vec3::new(4.0, 2.0, 2.0);
pub const GIFT_CENTER: Vec3 = Vec3::new(0.0, 1.0, 3.0);
pub const CAKE_CENTER: Vec3 = Vec3::ZERO;

/// Where balloon `id` floats
pub fn balloon_center(id: usize) -> Vec3 {
    Vec3::new((id as f32 - 1.0) * 3.0, 2.5, 0.0)
}

/// Box scene holding every interactive object
#[derive(Debug, Clone)]
pub struct SceneLayout {
    pub scene: BoxScene,
    pub balloons: [ObjectHandle; BALLOON_COUNT],
    pub gift: ObjectHandle,
    pub knife: ObjectHandle,
    /// Where the scratch card is drawn, once known
    pub scratch_rect: Option<ScreenRect>,
}

impl Default for SceneLayout {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneLayout {
    pub fn new() -> Self {
        let mut scene = BoxScene::new();
        let balloons = std::array::from_fn(|id| {
            scene.insert(Aabb::from_center(balloon_center(id), Vec3::new(1.6, 2.0, 1.6)))
        });
        let gift = scene.insert(Aabb::from_center(GIFT_CENTER, Vec3::splat(1.5)));
        let knife = scene.insert(Aabb::from_center(KNIFE_REST, KNIFE_GRAB_SIZE));
        Self {
            scene,
            balloons,
            gift,
            knife,
            scratch_rect: None,
        }
    }

    /// Objects that can be touched in the controller's current state
    pub fn targets(&self, controller: &ExperienceController) -> InteractiveObjects {
        let mut objects = InteractiveObjects {
            cake_center: CAKE_CENTER,
            ..InteractiveObjects::default()
        };
        match controller.stage() {
            ExperienceStage::Landing => {
                objects.balloons = controller
                    .balloons()
                    .iter()
                    .filter(|b| !b.popped)
                    .map(|b| (self.balloons[b.id], b.id))
                    .collect();
            }
            ExperienceStage::CakeCutting => {
                if controller.can_cut() {
                    objects.knife = Some(self.knife);
                }
                if controller.gift_available() {
                    objects.gift = Some(self.gift);
                }
            }
            ExperienceStage::Reveal => {
                if !controller.scratch_card().is_revealed() {
                    objects.scratch_card = self.scratch_rect;
                }
            }
            _ => {}
        }
        objects
    }

    /// Follow the dragged knife
    pub fn move_knife(&mut self, position: Vec3) {
        self.scene.move_to(self.knife, position);
    }

    pub fn reset_knife(&mut self) {
        self.scene.move_to(self.knife, KNIFE_REST);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use crate::audio::{LoggingPlayback, ScriptedCapture};
    use crate::persistence::MemoryStore;
    use crate::record::SurpriseRecord;
    use crate::settings::ExperienceSettings;
    use crate::sim::Collaborators;

    fn controller() -> ExperienceController {
        ExperienceController::new(
            SurpriseRecord::demo(),
            ExperienceSettings::default(),
            true,
            Collaborators {
                store: Box::new(MemoryStore::new()),
                capture: Box::new(ScriptedCapture::granted()),
                playback: Box::new(LoggingPlayback::new()),
            },
            1,
        )
    }

    #[test]
    fn test_landing_targets_only_unpopped_balloons() {
        let layout = SceneLayout::new();
        let mut c = controller();
        assert_eq!(layout.targets(&c).balloons.len(), BALLOON_COUNT);

        c.pop_balloon(1);
        let targets = layout.targets(&c);
        assert_eq!(
            targets.balloons,
            vec![(layout.balloons[0], 0), (layout.balloons[2], 2)]
        );
        assert_eq!(targets.knife, None);
        assert_eq!(targets.gift, None);
    }

    /// Walk the demo to the reveal with long frames
    fn reveal(c: &mut ExperienceController) {
        for id in 0..BALLOON_COUNT {
            c.pop_balloon(id);
        }
        c.start_journey();
        c.tick(10_000.0);
        c.tick(10_000.0);
        c.confirm_intro_seen();
        c.spin_wheel();
        c.tick(10_000.0);
        c.accept_spin_result();
        c.manual_blow();
        c.tick(10_000.0);
        c.cut_cake();
        c.tick(10_000.0);
        c.open_gift();
        assert_eq!(c.stage(), ExperienceStage::Reveal);
    }

    #[test]
    fn test_scratch_card_targeted_until_revealed() {
        let mut layout = SceneLayout::new();
        let rect = ScreenRect::new(0.0, 0.0, 300.0, 180.0);
        layout.scratch_rect = Some(rect);
        let mut c = controller();
        assert_eq!(layout.targets(&c).scratch_card, None);

        reveal(&mut c);
        assert_eq!(layout.targets(&c).scratch_card, Some(rect));

        for row in 0..9 {
            for step in 0..31 {
                let uv = Vec2::new(step as f32 / 30.0, (10.0 + row as f32 * 20.0) / 180.0);
                c.scratch(uv);
            }
        }
        assert!(c.scratch_card().is_revealed());
        assert_eq!(layout.targets(&c).scratch_card, None);
    }

    #[test]
    fn test_knife_follows_and_resets() {
        let mut layout = SceneLayout::new();
        layout.move_knife(Vec3::new(1.0, 2.0, 1.0));
        assert_eq!(
            layout.scene.bounds(layout.knife).unwrap().center(),
            Vec3::new(1.0, 2.0, 1.0)
        );
        layout.reset_knife();
        assert_eq!(layout.scene.bounds(layout.knife).unwrap().center(), KNIFE_REST);
    }
}
