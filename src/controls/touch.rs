use super::{InputSource, NormalizedInput};
use crate::config::GameConfig;
use crate::controls::settings::ControlSettings;
use crate::debug::DebugLog;
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

const JOYSTICK_SIZE_PX: f32 = 140.0;
const JOYSTICK_KNOB_SIZE_PX: f32 = 56.0;
const JOYSTICK_KNOB_MARGIN_PX: f32 = 20.0;
const SCREEN_MARGIN_PX: f32 = 30.0;
const BUTTON_SIZE_PX: f32 = 96.0;
const BUTTON_GAP_PX: f32 = 16.0;
const TOUCH_BUTTON_IDLE_ALPHA: f32 = 0.18;
const TOUCH_BUTTON_ACTIVE_ALPHA: f32 = 0.42;
const TOUCH_UI_Z_INDEX: i32 = 260;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub id: u64,
    pub position: Vec2,
    pub just_pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchLayout {
    pub joystick_center: Vec2,
    pub joystick_radius: f32,
    pub accelerate_rect: Rect,
    pub brake_rect: Rect,
}

impl TouchLayout {
    pub fn for_window(width: f32, height: f32) -> Self {
        let half_joystick = JOYSTICK_SIZE_PX * 0.5;
        let accelerate_max = Vec2::new(width - SCREEN_MARGIN_PX, height - SCREEN_MARGIN_PX);
        let accelerate_min = accelerate_max - Vec2::splat(BUTTON_SIZE_PX);
        let brake_shift = Vec2::new(BUTTON_SIZE_PX + BUTTON_GAP_PX, 0.0);

        Self {
            joystick_center: Vec2::new(
                SCREEN_MARGIN_PX + half_joystick,
                height - SCREEN_MARGIN_PX - half_joystick,
            ),
            joystick_radius: half_joystick - JOYSTICK_KNOB_MARGIN_PX,
            accelerate_rect: Rect::from_corners(accelerate_min, accelerate_max),
            brake_rect: Rect::from_corners(
                accelerate_min - brake_shift,
                accelerate_max - brake_shift,
            ),
        }
    }

    fn grabs_joystick(&self, position: Vec2) -> bool {
        position.distance(self.joystick_center) <= JOYSTICK_SIZE_PX * 0.5
    }
}

pub fn joystick_steering(delta_x: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (delta_x / radius).clamp(-1.0, 1.0)
}

#[derive(Resource, Debug, Clone, Default)]
pub struct TouchControls {
    enabled: bool,
    joystick_touch: Option<u64>,
    input: NormalizedInput,
}

impl TouchControls {
    pub fn enable(&mut self, log: &mut DebugLog) {
        if self.enabled {
            return;
        }
        self.enabled = true;
        log.success("Touch controls enabled", "");
    }

    pub fn disable(&mut self, log: &mut DebugLog) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        self.joystick_touch = None;
        self.input = NormalizedInput::default();
        log.success("Touch controls disabled", "");
    }

    pub fn toggle(&mut self, log: &mut DebugLog) {
        if self.enabled {
            self.disable(log);
        } else {
            self.enable(log);
        }
    }

    pub fn update(
        &mut self,
        layout: &TouchLayout,
        touches: &[TouchPoint],
        joystick_sensitivity: f32,
    ) {
        if !self.enabled {
            return;
        }

        if let Some(id) = self.joystick_touch {
            if !touches.iter().any(|touch| touch.id == id) {
                self.joystick_touch = None;
            }
        }
        if self.joystick_touch.is_none() {
            self.joystick_touch = touches
                .iter()
                .find(|touch| touch.just_pressed && layout.grabs_joystick(touch.position))
                .map(|touch| touch.id);
        }

        self.input.steering = self
            .joystick_touch
            .and_then(|id| touches.iter().find(|touch| touch.id == id))
            .map(|touch| {
                let delta_x = (touch.position.x - layout.joystick_center.x) * joystick_sensitivity;
                joystick_steering(delta_x, layout.joystick_radius)
            })
            .unwrap_or(0.0);

        let pressing = |rect: Rect| {
            touches
                .iter()
                .any(|touch| Some(touch.id) != self.joystick_touch && rect.contains(touch.position))
        };
        self.input.throttle = if pressing(layout.accelerate_rect) { 1.0 } else { 0.0 };
        self.input.brake = if pressing(layout.brake_rect) { 1.0 } else { 0.0 };
    }
}

impl InputSource for TouchControls {
    fn game_input(&self) -> NormalizedInput {
        if self.enabled {
            self.input
        } else {
            NormalizedInput::default()
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[derive(Component)]
pub(super) struct TouchControlsRoot;

#[derive(Component)]
pub(super) struct TouchJoystickKnob;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TouchButtonKind {
    Accelerate,
    Brake,
}

pub(super) fn read_touch_controls(
    touches: Res<Touches>,
    config: Res<GameConfig>,
    settings: Option<Res<ControlSettings>>,
    window_query: Query<&Window, With<PrimaryWindow>>,
    mut log: ResMut<DebugLog>,
    mut controls: ResMut<TouchControls>,
    mut forced: Local<bool>,
) {
    let force = config.game.app.force_touch_controls && !*forced;
    if force {
        *forced = true;
    }
    if !controls.is_enabled() && (force || touches.iter_just_pressed().next().is_some()) {
        controls.enable(&mut log);
    }

    let Ok(window) = window_query.single() else {
        return;
    };

    let points: Vec<TouchPoint> = touches
        .iter()
        .map(|touch| TouchPoint {
            id: touch.id(),
            position: touch.position(),
            just_pressed: touches.just_pressed(touch.id()),
        })
        .collect();
    let joystick_sensitivity = settings
        .map(|settings| settings.touch().joystick_sensitivity)
        .unwrap_or(1.0);
    let layout = TouchLayout::for_window(window.width(), window.height());

    controls.update(&layout, &points, joystick_sensitivity);
}

pub(super) fn spawn_touch_controls_ui(
    mut commands: Commands,
    existing_query: Query<Entity, With<TouchControlsRoot>>,
) {
    if !existing_query.is_empty() {
        return;
    }

    let knob_offset = (JOYSTICK_SIZE_PX - JOYSTICK_KNOB_SIZE_PX) * 0.5;

    commands
        .spawn((
            Name::new("TouchControlsRoot"),
            TouchControlsRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(0.0),
                right: Val::Px(0.0),
                top: Val::Px(0.0),
                bottom: Val::Px(0.0),
                ..default()
            },
            Visibility::Hidden,
            ZIndex(TOUCH_UI_Z_INDEX),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Name::new("TouchJoystickBase"),
                    Node {
                        position_type: PositionType::Absolute,
                        left: Val::Px(SCREEN_MARGIN_PX),
                        bottom: Val::Px(SCREEN_MARGIN_PX),
                        width: Val::Px(JOYSTICK_SIZE_PX),
                        height: Val::Px(JOYSTICK_SIZE_PX),
                        border: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.12, 0.16, TOUCH_BUTTON_IDLE_ALPHA)),
                    BorderColor::all(Color::srgba(0.72, 0.80, 0.86, 0.38)),
                ))
                .with_children(|base| {
                    base.spawn((
                        Name::new("TouchJoystickKnob"),
                        TouchJoystickKnob,
                        Node {
                            position_type: PositionType::Absolute,
                            left: Val::Px(knob_offset),
                            top: Val::Px(knob_offset),
                            width: Val::Px(JOYSTICK_KNOB_SIZE_PX),
                            height: Val::Px(JOYSTICK_KNOB_SIZE_PX),
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.86, 0.92, 0.96, 0.55)),
                    ));
                });

            for (kind, label, right) in [
                (TouchButtonKind::Accelerate, "ACCEL", SCREEN_MARGIN_PX),
                (
                    TouchButtonKind::Brake,
                    "BRAKE",
                    SCREEN_MARGIN_PX + BUTTON_SIZE_PX + BUTTON_GAP_PX,
                ),
            ] {
                parent
                    .spawn((
                        Name::new(format!("TouchButton{kind:?}")),
                        kind,
                        Node {
                            position_type: PositionType::Absolute,
                            right: Val::Px(right),
                            bottom: Val::Px(SCREEN_MARGIN_PX),
                            width: Val::Px(BUTTON_SIZE_PX),
                            height: Val::Px(BUTTON_SIZE_PX),
                            border: UiRect::all(Val::Px(1.0)),
                            justify_content: JustifyContent::Center,
                            align_items: AlignItems::Center,
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.08, 0.12, 0.16, TOUCH_BUTTON_IDLE_ALPHA)),
                        BorderColor::all(Color::srgba(0.72, 0.80, 0.86, 0.38)),
                    ))
                    .with_children(|button| {
                        button.spawn((
                            Text::new(label),
                            TextFont {
                                font_size: 20.0,
                                ..default()
                            },
                            TextColor(Color::srgba(0.92, 0.96, 0.99, 0.78)),
                        ));
                    });
            }
        });
}

pub(super) fn cleanup_touch_controls_ui(
    mut commands: Commands,
    root_query: Query<Entity, With<TouchControlsRoot>>,
) {
    for entity in &root_query {
        commands.entity(entity).try_despawn();
    }
}

pub(super) fn update_touch_controls_ui(
    controls: Res<TouchControls>,
    mut root_query: Query<&mut Visibility, With<TouchControlsRoot>>,
    mut knob_query: Query<&mut Node, With<TouchJoystickKnob>>,
    mut button_query: Query<(&TouchButtonKind, &mut BackgroundColor)>,
) {
    let Ok(mut root_visibility) = root_query.single_mut() else {
        return;
    };

    if !controls.is_enabled() {
        *root_visibility = Visibility::Hidden;
        return;
    }
    *root_visibility = Visibility::Inherited;

    let input = controls.game_input();
    let joystick_radius = JOYSTICK_SIZE_PX * 0.5 - JOYSTICK_KNOB_MARGIN_PX;
    if let Ok(mut knob) = knob_query.single_mut() {
        let rest = (JOYSTICK_SIZE_PX - JOYSTICK_KNOB_SIZE_PX) * 0.5;
        knob.left = Val::Px(rest + input.steering * joystick_radius);
    }

    for (kind, mut background) in &mut button_query {
        let pressed = match kind {
            TouchButtonKind::Accelerate => input.throttle > 0.0,
            TouchButtonKind::Brake => input.brake > 0.0,
        };
        let alpha = if pressed {
            TOUCH_BUTTON_ACTIVE_ALPHA
        } else {
            TOUCH_BUTTON_IDLE_ALPHA
        };
        *background = BackgroundColor(Color::srgba(0.10, 0.20, 0.28, alpha));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_controls() -> TouchControls {
        let mut controls = TouchControls::default();
        controls.enable(&mut DebugLog::default());
        controls
    }

    fn point(id: u64, position: Vec2, just_pressed: bool) -> TouchPoint {
        TouchPoint {
            id,
            position,
            just_pressed,
        }
    }

    #[test]
    fn joystick_steering_is_clamped() {
        assert_eq!(joystick_steering(25.0, 50.0), 0.5);
        assert_eq!(joystick_steering(-200.0, 50.0), -1.0);
        assert_eq!(joystick_steering(200.0, 50.0), 1.0);
        assert_eq!(joystick_steering(10.0, 0.0), 0.0);
    }

    #[test]
    fn joystick_touch_is_tracked_until_released() {
        let layout = TouchLayout::for_window(800.0, 600.0);
        let mut controls = enabled_controls();
        let center = layout.joystick_center;

        controls.update(&layout, &[point(7, center, true)], 1.0);
        assert_eq!(controls.game_input().steering, 0.0);

        let moved = center + Vec2::new(layout.joystick_radius * 0.5, 12.0);
        controls.update(&layout, &[point(7, moved, false)], 1.0);
        assert!((controls.game_input().steering - 0.5).abs() < 1e-5);

        controls.update(&layout, &[], 1.0);
        assert_eq!(controls.game_input().steering, 0.0);
    }

    #[test]
    fn buttons_set_full_throttle_and_brake_while_held() {
        let layout = TouchLayout::for_window(800.0, 600.0);
        let mut controls = enabled_controls();

        controls.update(
            &layout,
            &[
                point(1, layout.accelerate_rect.center(), true),
                point(2, layout.brake_rect.center(), true),
            ],
            1.0,
        );
        let input = controls.game_input();
        assert_eq!(input.throttle, 1.0);
        assert_eq!(input.brake, 1.0);

        controls.update(&layout, &[point(2, layout.brake_rect.center(), false)], 1.0);
        let input = controls.game_input();
        assert_eq!(input.throttle, 0.0);
        assert_eq!(input.brake, 1.0);
    }

    #[test]
    fn disabled_controls_report_zero_input() {
        let layout = TouchLayout::for_window(800.0, 600.0);
        let mut log = DebugLog::default();
        let mut controls = enabled_controls();
        controls.update(&layout, &[point(1, layout.accelerate_rect.center(), true)], 1.0);
        assert_eq!(controls.game_input().throttle, 1.0);

        controls.disable(&mut log);
        assert!(!controls.is_enabled());
        assert_eq!(controls.game_input(), NormalizedInput::default());
    }

    #[test]
    fn toggle_switches_off_then_back_on_with_cleared_input() {
        let layout = TouchLayout::for_window(800.0, 600.0);
        let mut log = DebugLog::default();
        let mut controls = enabled_controls();
        let joystick_grab = point(3, layout.joystick_center + Vec2::X * 30.0, true);
        controls.update(&layout, &[joystick_grab], 1.0);
        assert!(controls.game_input().steering > 0.0);

        controls.toggle(&mut log);
        assert!(!controls.is_enabled());
        assert_eq!(controls.game_input(), NormalizedInput::default());

        controls.toggle(&mut log);
        assert!(controls.is_enabled());
        assert_eq!(controls.game_input(), NormalizedInput::default());

        let names: Vec<_> = log.recent(2).map(|entry| entry.name.clone()).collect();
        assert_eq!(names, vec!["Touch controls disabled", "Touch controls enabled"]);
    }
}
