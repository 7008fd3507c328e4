//! On-screen overlay: the blocker shown while disengaged, and the debug panel.
//!
//! The debug panel exposes one property, the floor's metalness, as a horizontal slider in
//! the top-right corner. It can be dragged with the mouse while the cursor is free, or
//! nudged with `[` and `]` at any time.

use glam::Vec2;
use winit::event::MouseButton;
use winit::keyboard::KeyCode;

use crate::draw2d::{Color, Draw2d, Rect};
use crate::input::Input;
use crate::scene::SceneWorld;

const PANEL_WIDTH: f32 = 240.0;
const PANEL_HEIGHT: f32 = 40.0;
const PANEL_MARGIN: f32 = 12.0;
const TRACK_INSET: f32 = 12.0;
const TRACK_HEIGHT: f32 = 8.0;
const KNOB_WIDTH: f32 = 6.0;
const KEY_STEP: f32 = 0.05;

const BLOCKER: Color = Color::rgba(0.0, 0.0, 0.0, 0.5);
const CARD: Color = Color::rgba(0.08, 0.08, 0.1, 0.9);
const TRACK: Color = Color::rgba(0.25, 0.25, 0.28, 1.0);
const FILL: Color = Color::rgba(0.18, 0.55, 0.95, 1.0);

/// Mouse and key state the HUD reacts to.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HudInput {
    /// Cursor in window pixels.
    pub cursor: Vec2,
    pub pressed: bool,
    pub down: bool,
    pub decrease: bool,
    pub increase: bool,
}

impl HudInput {
    pub fn from_input(input: &Input) -> Self {
        Self {
            cursor: input.mouse_position(),
            pressed: input.mouse_pressed(MouseButton::Left),
            down: input.mouse_down(MouseButton::Left),
            decrease: input.key_pressed(KeyCode::BracketLeft),
            increase: input.key_pressed(KeyCode::BracketRight),
        }
    }
}

/// Panel geometry for a given viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanelLayout {
    pub panel: Rect,
    pub track: Rect,
}

impl PanelLayout {
    pub fn new(width: u32, _height: u32) -> Self {
        let panel = Rect::new(
            (width as f32 - PANEL_WIDTH - PANEL_MARGIN).max(0.0),
            PANEL_MARGIN,
            PANEL_WIDTH,
            PANEL_HEIGHT,
        );
        let track = Rect::new(
            panel.x + TRACK_INSET,
            panel.y + (PANEL_HEIGHT - TRACK_HEIGHT) * 0.5,
            PANEL_WIDTH - 2.0 * TRACK_INSET,
            TRACK_HEIGHT,
        );
        Self { panel, track }
    }

    /// Slider value under a cursor x position.
    pub fn value_at(&self, x: f32) -> f32 {
        ((x - self.track.x) / self.track.width).clamp(0.0, 1.0)
    }

    /// The filled part of the track. Its width is the only readout of the value.
    pub fn fill(&self, value: f32) -> Rect {
        let value = value.clamp(0.0, 1.0);
        Rect::new(self.track.x, self.track.y, self.track.width * value, self.track.height)
    }

    /// Knob centered on the end of the fill.
    pub fn knob(&self, value: f32) -> Rect {
        let fill = self.fill(value);
        Rect::new(
            fill.x + fill.width - KNOB_WIDTH * 0.5,
            self.track.y - 4.0,
            KNOB_WIDTH,
            self.track.height + 8.0,
        )
    }
}

/// The HUD's interaction state.
#[derive(Debug, Default)]
pub struct Hud {
    dragging: bool,
}

impl Hud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// Apply this frame's input to the debug panel.
    ///
    /// Returns `true` when a click landed on the panel, so the caller does not treat it as
    /// a request to engage.
    pub fn update(
        &mut self,
        input: HudInput,
        scene: &mut SceneWorld,
        engaged: bool,
        viewport: (u32, u32),
    ) -> bool {
        let layout = PanelLayout::new(viewport.0, viewport.1);
        let on_panel = !engaged && layout.panel.contains(input.cursor.x, input.cursor.y);

        if engaged || !input.down {
            self.dragging = false;
        }
        if on_panel && input.pressed {
            self.dragging = true;
        }

        let current = scene.floor_metalness();
        let mut target = current;
        if self.dragging {
            target = layout.value_at(input.cursor.x);
        }
        if input.decrease {
            target -= KEY_STEP;
        }
        if input.increase {
            target += KEY_STEP;
        }

        if target != current {
            let stored = scene.set_floor_metalness(target);
            log::debug!("floor metalness {current:.2} -> {stored:.2}");
        }

        on_panel && input.pressed
    }

    /// Queue the overlay's rectangles.
    pub fn draw(&self, draw2d: &mut Draw2d, scene: &SceneWorld, engaged: bool, viewport: (u32, u32)) {
        let (width, height) = (viewport.0 as f32, viewport.1 as f32);

        if !engaged {
            draw2d.rect(Rect::new(0.0, 0.0, width, height), BLOCKER);
            let card = Rect::new(0.0, 0.0, width, height).centered(220.0, 120.0);
            draw2d.rect(card, CARD);
            draw2d.outline(card, 1.0, Color::DEBUG_BORDER);
            draw_play_icon(draw2d, card);
        }

        let layout = PanelLayout::new(viewport.0, viewport.1);
        draw2d.rect(layout.panel, Color::DEBUG_BG);
        draw2d.outline(layout.panel, 1.0, Color::DEBUG_BORDER);
        draw2d.rect(layout.track, TRACK);

        let value = scene.floor_metalness();
        draw2d.rect(layout.fill(value), FILL);
        draw2d.rect(layout.knob(value), Color::WHITE);
    }
}

/// A right-pointing triangle built from horizontal strips, centered in `card`.
fn draw_play_icon(draw2d: &mut Draw2d, card: Rect) {
    const SIZE: f32 = 48.0;
    const STRIPS: usize = 12;

    let strip_height = SIZE / STRIPS as f32;
    let left = card.x + (card.width - SIZE * 0.8) * 0.5;
    let top = card.y + (card.height - SIZE) * 0.5;

    for i in 0..STRIPS {
        let mid = (i as f32 + 0.5) / STRIPS as f32;
        let length = SIZE * 0.8 * (1.0 - (mid - 0.5).abs() * 2.0);
        draw2d.rect(
            Rect::new(left, top + i as f32 * strip_height, length, strip_height),
            Color::WHITE,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LightsConfig, SceneConfig};

    const VIEWPORT: (u32, u32) = (1280, 720);

    fn scene() -> SceneWorld {
        SceneWorld::new(&SceneConfig::default(), &LightsConfig::default())
    }

    fn track() -> Rect {
        PanelLayout::new(VIEWPORT.0, VIEWPORT.1).track
    }

    #[test]
    fn panel_sits_in_top_right() {
        let layout = PanelLayout::new(1280, 720);
        assert_eq!(layout.panel.x + layout.panel.width + PANEL_MARGIN, 1280.0);
        assert_eq!(layout.panel.y, PANEL_MARGIN);
        assert!(layout.panel.contains(layout.track.x, layout.track.y));
    }

    #[test]
    fn fill_and_knob_track_the_value() {
        let layout = PanelLayout::new(VIEWPORT.0, VIEWPORT.1);
        let track = layout.track;

        assert_eq!(layout.fill(0.0).width, 0.0);
        assert_eq!(layout.fill(1.0), track);
        assert_eq!(layout.fill(2.0), track);

        let fill = layout.fill(0.13);
        assert!((fill.width - track.width * 0.13).abs() < 1e-4);
        let knob = layout.knob(0.13);
        assert!((knob.x + knob.width * 0.5 - (fill.x + fill.width)).abs() < 1e-4);
        assert!((layout.value_at(knob.x + knob.width * 0.5) - 0.13).abs() < 1e-4);
    }

    #[test]
    fn click_and_drag_sets_metalness() {
        let mut scene = scene();
        let mut hud = Hud::new();
        let track = track();

        let press = HudInput {
            cursor: Vec2::new(track.x + track.width * 0.5, track.y),
            pressed: true,
            down: true,
            ..Default::default()
        };
        assert!(hud.update(press, &mut scene, false, VIEWPORT));
        assert!((scene.floor_metalness() - 0.5).abs() < 1e-5);

        // Dragging past the end clamps, even outside the panel.
        let drag = HudInput {
            cursor: Vec2::new(track.x + track.width * 3.0, 400.0),
            down: true,
            ..Default::default()
        };
        assert!(!hud.update(drag, &mut scene, false, VIEWPORT));
        assert_eq!(scene.floor_metalness(), 1.0);

        let release = HudInput {
            cursor: Vec2::new(track.x, track.y),
            ..Default::default()
        };
        hud.update(release, &mut scene, false, VIEWPORT);
        assert!(!hud.is_dragging());
        assert_eq!(scene.floor_metalness(), 1.0);
    }

    #[test]
    fn mouse_ignored_while_engaged() {
        let mut scene = scene();
        let mut hud = Hud::new();
        let track = track();
        let press = HudInput {
            cursor: Vec2::new(track.x, track.y),
            pressed: true,
            down: true,
            ..Default::default()
        };
        assert!(!hud.update(press, &mut scene, true, VIEWPORT));
        assert_eq!(scene.floor_metalness(), 0.13);
    }

    #[test]
    fn bracket_keys_step_and_clamp() {
        let mut scene = scene();
        let mut hud = Hud::new();
        let increase = HudInput {
            increase: true,
            ..Default::default()
        };
        hud.update(increase, &mut scene, true, VIEWPORT);
        assert!((scene.floor_metalness() - 0.18).abs() < 1e-5);

        let decrease = HudInput {
            decrease: true,
            ..Default::default()
        };
        for _ in 0..10 {
            hud.update(decrease, &mut scene, false, VIEWPORT);
        }
        assert_eq!(scene.floor_metalness(), 0.0);
    }

    #[test]
    fn click_outside_panel_is_not_consumed() {
        let mut scene = scene();
        let mut hud = Hud::new();
        let press = HudInput {
            cursor: Vec2::new(640.0, 360.0),
            pressed: true,
            down: true,
            ..Default::default()
        };
        assert!(!hud.update(press, &mut scene, false, VIEWPORT));
        assert!(!hud.is_dragging());
    }
}
