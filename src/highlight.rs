//! Hover highlighting.
//!
//! At most one entity is highlighted at a time. When an entity enters the slot its current
//! emissive color is saved and replaced by the highlight color; when it leaves, the saved
//! color is written back before anything else takes the slot.

use hecs::{Entity, World};

use crate::draw2d::Color;
use crate::ecs::Material;

/// Which entity, if any, currently shows the highlight.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum HighlightState {
    #[default]
    Idle,
    Highlighted {
        entity: Entity,
        /// Emissive color the entity had when it entered the slot.
        saved: Color,
    },
}

/// Drives [`HighlightState`] from the nearest pick result each frame.
#[derive(Clone, Debug)]
pub struct Highlighter {
    state: HighlightState,
    pub color: Color,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new(Color::RED)
    }
}

impl Highlighter {
    pub fn new(color: Color) -> Self {
        Self {
            state: HighlightState::Idle,
            color,
        }
    }

    pub fn state(&self) -> HighlightState {
        self.state
    }

    /// The highlighted entity, if any.
    pub fn current(&self) -> Option<Entity> {
        match self.state {
            HighlightState::Idle => None,
            HighlightState::Highlighted { entity, .. } => Some(entity),
        }
    }

    /// Apply this frame's nearest hit.
    ///
    /// Staying on the same entity is a no-op so the saved color is never replaced by the
    /// highlight color.
    pub fn update(&mut self, world: &mut World, hit: Option<Entity>) {
        if let HighlightState::Highlighted { entity, .. } = self.state
            && hit == Some(entity)
        {
            return;
        }

        self.release(world);

        if let Some(entity) = hit {
            self.state = self.capture(world, entity);
        }
    }

    /// Restore the highlighted entity, if any, and return to idle.
    pub fn release(&mut self, world: &mut World) {
        if let HighlightState::Highlighted { entity, saved } = self.state {
            match world.get::<&mut Material>(entity) {
                Ok(mut material) => material.emissive = saved,
                Err(e) => log::debug!("cannot restore highlight on {entity:?}: {e}"),
            }
        }
        self.state = HighlightState::Idle;
    }

    fn capture(&self, world: &mut World, entity: Entity) -> HighlightState {
        match world.get::<&mut Material>(entity) {
            Ok(mut material) => {
                let saved = material.emissive;
                material.emissive = self.color;
                HighlightState::Highlighted { entity, saved }
            }
            Err(e) => {
                log::debug!("cannot highlight {entity:?}: {e}");
                HighlightState::Idle
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emissive(world: &World, entity: Entity) -> Color {
        world.get::<&Material>(entity).unwrap().emissive
    }

    fn setup() -> (World, Entity, Entity) {
        let mut world = World::new();
        let a = world.spawn((Material::new(Color::WHITE).emissive(Color::rgb(0.1, 0.2, 0.3)),));
        let b = world.spawn((Material::new(Color::WHITE),));
        (world, a, b)
    }

    #[test]
    fn idle_to_highlighted_saves_original() {
        let (mut world, a, _) = setup();
        let mut highlighter = Highlighter::default();

        highlighter.update(&mut world, Some(a));

        assert_eq!(
            highlighter.state(),
            HighlightState::Highlighted {
                entity: a,
                saved: Color::rgb(0.1, 0.2, 0.3)
            }
        );
        assert_eq!(emissive(&world, a), Color::RED);
    }

    #[test]
    fn staying_on_same_entity_keeps_saved_color() {
        let (mut world, a, _) = setup();
        let mut highlighter = Highlighter::default();

        highlighter.update(&mut world, Some(a));
        highlighter.update(&mut world, Some(a));
        highlighter.update(&mut world, None);

        assert_eq!(emissive(&world, a), Color::rgb(0.1, 0.2, 0.3));
    }

    #[test]
    fn switching_restores_previous_first() {
        let (mut world, a, b) = setup();
        let mut highlighter = Highlighter::default();

        highlighter.update(&mut world, Some(a));
        highlighter.update(&mut world, Some(b));

        assert_eq!(emissive(&world, a), Color::rgb(0.1, 0.2, 0.3));
        assert_eq!(emissive(&world, b), Color::RED);
        assert_eq!(
            highlighter.state(),
            HighlightState::Highlighted {
                entity: b,
                saved: Color::BLACK
            }
        );
    }

    #[test]
    fn miss_returns_to_idle() {
        let (mut world, _, b) = setup();
        let mut highlighter = Highlighter::default();

        highlighter.update(&mut world, Some(b));
        highlighter.update(&mut world, None);

        assert_eq!(highlighter.state(), HighlightState::Idle);
        assert_eq!(emissive(&world, b), Color::BLACK);
    }

    #[test]
    fn entity_without_material_stays_idle() {
        let mut world = World::new();
        let bare = world.spawn((0u8,));
        let mut highlighter = Highlighter::default();
        highlighter.update(&mut world, Some(bare));
        assert_eq!(highlighter.state(), HighlightState::Idle);
    }

    #[test]
    fn custom_highlight_color() {
        let (mut world, a, _) = setup();
        let mut highlighter = Highlighter::new(Color::from_hex(0x00ff00));
        highlighter.update(&mut world, Some(a));
        assert_eq!(emissive(&world, a), Color::from_hex(0x00ff00));
    }
}
