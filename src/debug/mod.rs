mod log;

pub use log::{CheckpointStatus, DebugEntry, DebugLog};

use crate::config::GameConfig;
use crate::controls::settings::{
    ControlPreset, ControlSettings, GamepadSensitivity, GeneralSettings, KeyboardSensitivity,
    TouchSensitivity,
};
use crate::gameplay::physics::PhysicsWorld;
use crate::controls::NormalizedInput;
use crate::gameplay::vehicle::{VehicleController, VehicleTelemetry};
use crate::gameplay::world::InteractiveWorld;
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};

const OVERLAY_LOG_LINES: usize = 10;
const GIZMO_CHASSIS_COLOR: Color = Color::srgb(0.2, 1.0, 0.4);
const GIZMO_WHEEL_COLOR: Color = Color::srgb(1.0, 0.9, 0.2);
const GIZMO_RAMP_COLOR: Color = Color::srgb(0.3, 0.7, 1.0);

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugLog>()
            .init_resource::<DebugOverlayState>()
            .init_resource::<KeybindOverlayState>()
            .init_resource::<ControlSettingsPanelState>()
            .add_systems(First, log::advance_debug_log_clock)
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, toggle_control_settings_panel)
            .add_systems(Update, sync_overlay_visibility)
            .add_systems(
                Update,
                (update_debug_overlay_text, draw_physics_gizmos)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                control_settings_panel_ui.run_if(resource_exists::<ControlSettings>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

#[derive(Resource, Debug, Clone, Default)]
struct DebugOverlayState {
    visible: Option<bool>,
}

impl DebugOverlayState {
    fn is_visible(&self) -> bool {
        self.visible.unwrap_or(false)
    }
}

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

#[derive(Resource, Debug, Clone, Default)]
struct ControlSettingsPanelState {
    visible: bool,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    mut overlay: ResMut<DebugOverlayState>,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };
    let visible = *overlay.visible.get_or_insert(config.game.app.debug_overlay);

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.92, 0.95, 0.97)),
        BackgroundColor(Color::srgba(0.02, 0.03, 0.04, 0.6)),
        Node {
            position_type: PositionType::Absolute,
            left: Val::Px(12.0),
            top: Val::Px(12.0),
            padding: UiRect::all(Val::Px(6.0)),
            ..default()
        },
        visibility_for(visible),
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            bottom: Val::Px(12.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        visibility_for(keybind_overlay.visible),
        ZIndex(100),
    ));
}

fn visibility_for(visible: bool) -> Visibility {
    if visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    }
}

fn toggle_debug_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut overlay: ResMut<DebugOverlayState>,
) {
    if !keyboard.just_pressed(KeyCode::KeyP) {
        return;
    }

    let visible = !overlay.is_visible();
    overlay.visible = Some(visible);
    info!(
        "Debug overlay and physics gizmos {}.",
        if visible { "shown" } else { "hidden" }
    );
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
) {
    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Keybind help panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn toggle_control_settings_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<ControlSettingsPanelState>,
) {
    if !keyboard.just_pressed(KeyCode::KeyV) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    info!(
        "Control settings panel {}.",
        if panel_state.visible { "shown" } else { "hidden" }
    );
}

fn sync_overlay_visibility(
    overlay: Res<DebugOverlayState>,
    keybind_overlay: Res<KeybindOverlayState>,
    mut overlay_query: Query<
        &mut Visibility,
        (With<DebugOverlayText>, Without<KeybindOverlayText>),
    >,
    mut keybind_query: Query<
        &mut Visibility,
        (With<KeybindOverlayText>, Without<DebugOverlayText>),
    >,
) {
    if overlay.is_changed() {
        for mut visibility in &mut overlay_query {
            *visibility = visibility_for(overlay.is_visible());
        }
    }

    if keybind_overlay.is_changed() {
        for mut visibility in &mut keybind_query {
            *visibility = visibility_for(keybind_overlay.visible);
        }
    }
}

fn update_debug_overlay_text(
    diagnostics: Res<DiagnosticsStore>,
    overlay: Res<DebugOverlayState>,
    telemetry: Res<VehicleTelemetry>,
    world: Option<Res<InteractiveWorld>>,
    log: Res<DebugLog>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    if !overlay.is_visible() {
        return;
    }
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);
    let score = world.map(|world| world.score()).unwrap_or(0);

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nScore: {score}\n{vehicle}\n-- log ({logged} entries)\n{entries}",
        vehicle = format_vehicle_telemetry(&telemetry),
        logged = log.entry_count(),
        entries = format_recent_entries(&log, OVERLAY_LOG_LINES),
    ));
}

fn format_vehicle_telemetry(telemetry: &VehicleTelemetry) -> String {
    let position = telemetry.position;
    let mut lines = vec![
        format!("Model: {}", telemetry.authority.label()),
        format!(
            "Position: ({:.1}, {:.1}, {:.1})",
            position.x, position.y, position.z
        ),
        format!("Speed: {:>5.0} km/h", telemetry.speed_kmh),
        format!("Raw input: {}", format_input(telemetry.raw_input)),
        format!("Input: {}", format_input(telemetry.input)),
    ];
    if let Some(forces) = telemetry.drive_forces {
        lines.push(format!(
            "Drive: engine={:.0} N steer={:+.2} rad brake={:.0} N",
            forces.engine, forces.steer_angle, forces.brake
        ));
    }
    lines.push(format!(
        "Drifting: {}",
        if telemetry.drifting { "yes" } else { "no" }
    ));
    lines.join("\n")
}

fn format_input(input: NormalizedInput) -> String {
    format!(
        "throttle={:+.2} steer={:+.2} brake={:.2}",
        input.throttle, input.steering, input.brake
    )
}

fn format_recent_entries(log: &DebugLog, count: usize) -> String {
    log.recent(count)
        .map(|entry| {
            if entry.details.is_empty() {
                format!(
                    "[{:>7.2}s {}] {}",
                    entry.elapsed_s,
                    entry.status.marker(),
                    entry.name
                )
            } else {
                format!(
                    "[{:>7.2}s {}] {}: {}",
                    entry.elapsed_s,
                    entry.status.marker(),
                    entry.name,
                    entry.details
                )
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn draw_physics_gizmos(
    mut gizmos: Gizmos,
    overlay: Res<DebugOverlayState>,
    physics: Option<Res<PhysicsWorld>>,
    controller: Option<Res<VehicleController>>,
) {
    if !overlay.is_visible() {
        return;
    }
    let Some(physics) = physics else {
        return;
    };

    for ramp in physics.ramps() {
        let (Some(translation), Some(rotation)) = (
            physics.body_translation(ramp.handle),
            physics.body_rotation(ramp.handle),
        ) else {
            continue;
        };
        gizmos.cuboid(
            Transform::from_translation(translation)
                .with_rotation(rotation)
                .with_scale(ramp.half_extents * 2.0),
            GIZMO_RAMP_COLOR,
        );
    }

    let Some(rigid) = controller.as_deref().and_then(VehicleController::rigid) else {
        return;
    };
    if let Some((translation, rotation)) = rigid.pose(&physics) {
        gizmos.cuboid(
            Transform::from_translation(translation)
                .with_rotation(rotation)
                .with_scale(rigid.chassis_half_extents() * 2.0),
            GIZMO_CHASSIS_COLOR,
        );
    }
    for (translation, rotation) in rigid.wheel_poses(&physics) {
        gizmos.sphere(
            Isometry3d::new(translation, rotation),
            rigid.wheel_radius(),
            GIZMO_WHEEL_COLOR,
        );
    }
}

fn control_settings_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<ControlSettingsPanelState>,
    mut settings: ResMut<ControlSettings>,
    mut log: ResMut<DebugLog>,
) {
    if !panel_state.visible {
        return;
    }

    let mut keyboard = settings.keyboard();
    let mut touch = settings.touch();
    let mut gamepad = settings.gamepad();
    let mut general = settings.general();
    let mut keyboard_changed = false;
    let mut touch_changed = false;
    let mut gamepad_changed = false;
    let mut general_changed = false;
    let mut preset_clicked: Option<ControlPreset> = None;
    let mut reset_clicked = false;
    let mut window_open = panel_state.visible;

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Control Settings")
        .open(&mut window_open)
        .resizable(true)
        .default_width(460.0)
        .show(ctx, |ui| {
            ui.label("Changes are saved immediately.");
            ui.separator();

            ui.collapsing("Keyboard", |ui| {
                keyboard_changed |= keyboard_rows(ui, &mut keyboard);
            });
            ui.collapsing("Touch", |ui| {
                touch_changed |= touch_rows(ui, &mut touch);
            });
            ui.collapsing("Gamepad", |ui| {
                gamepad_changed |= gamepad_rows(ui, &mut gamepad);
            });
            ui.collapsing("General", |ui| {
                general_changed |= general_rows(ui, &mut general);
            });

            ui.separator();
            ui.horizontal(|ui| {
                for preset in ControlPreset::ALL {
                    if ui.button(preset.name()).clicked() {
                        preset_clicked = Some(preset);
                    }
                }
                if ui.button("Reset to defaults").clicked() {
                    reset_clicked = true;
                }
            });
        });

    panel_state.visible = window_open;

    if keyboard_changed {
        settings.set_keyboard(keyboard, &mut log);
    }
    if touch_changed {
        settings.set_touch(touch, &mut log);
    }
    if gamepad_changed {
        settings.set_gamepad(gamepad, &mut log);
    }
    if general_changed {
        settings.set_general(general, &mut log);
    }
    if let Some(preset) = preset_clicked {
        settings.apply_preset(preset.name(), &mut log);
    }
    if reset_clicked {
        settings.reset_to_defaults(&mut log);
    }
}

fn keyboard_rows(ui: &mut egui::Ui, keyboard: &mut KeyboardSensitivity) -> bool {
    sensitivity_rows(
        ui,
        [
            ("throttle", &mut keyboard.throttle_sensitivity),
            ("steering", &mut keyboard.steering_sensitivity),
            ("brake", &mut keyboard.brake_sensitivity),
        ],
    )
}

fn touch_rows(ui: &mut egui::Ui, touch: &mut TouchSensitivity) -> bool {
    sensitivity_rows(
        ui,
        [
            ("throttle", &mut touch.throttle_sensitivity),
            ("steering", &mut touch.steering_sensitivity),
            ("brake", &mut touch.brake_sensitivity),
            ("joystick", &mut touch.joystick_sensitivity),
        ],
    )
}

fn gamepad_rows(ui: &mut egui::Ui, gamepad: &mut GamepadSensitivity) -> bool {
    let mut changed = sensitivity_rows(
        ui,
        [
            ("throttle", &mut gamepad.throttle_sensitivity),
            ("steering", &mut gamepad.steering_sensitivity),
            ("brake", &mut gamepad.brake_sensitivity),
        ],
    );
    let dead_zones = [
        ("stick dead zone", &mut gamepad.dead_zone),
        ("trigger dead zone", &mut gamepad.trigger_dead_zone),
    ];
    for (label, value) in dead_zones {
        changed |= tuning_slider_row(ui, label, value, 0.0..=0.5, 0.005);
    }
    changed
}

fn general_rows(ui: &mut egui::Ui, general: &mut GeneralSettings) -> bool {
    let mut changed = ui
        .checkbox(&mut general.invert_steering, "invert steering")
        .changed();
    changed |= tuning_slider_row(ui, "smoothing", &mut general.smoothing, 0.0..=0.95, 0.01);
    changed |= tuning_slider_row(
        ui,
        "response time",
        &mut general.response_time,
        0.01..=1.0,
        0.01,
    );
    changed
}

fn sensitivity_rows<const N: usize>(ui: &mut egui::Ui, rows: [(&str, &mut f32); N]) -> bool {
    let mut changed = false;
    for (label, value) in rows {
        changed |= tuning_slider_row(ui, label, value, 0.1..=2.0, 0.01);
    }
    changed
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
W / Up - Accelerate\n\
S / Down - Reverse\n\
A D / Left Right - Steer\n\
Space - Brake\n\
R - Reset car\n\
T - Touch controls on/off\n\
1 / 2 / 3 - Casual / Sport / Precise preset\n\
0 - Reset control settings\n\
V - Control settings panel\n\
P - Debug overlay + physics gizmos\n\
H - Toggle this panel\n\
F5 - Reload config\n\
Esc - Pause"
}
