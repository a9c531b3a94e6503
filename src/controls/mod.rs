pub mod gamepad;
pub mod keyboard;
pub mod settings;
pub mod touch;
pub mod unify;

use crate::config::GameConfig;
use crate::debug::DebugLog;
use crate::gameplay::{tick_seconds, TickSystems};
use crate::states::GameState;
use bevy::prelude::*;
use gamepad::GamepadControls;
use keyboard::KeyboardControls;
use settings::{ControlPreset, ControlSettings, FileSettingsStore};
use touch::TouchControls;
use unify::InputUnifier;

const RESET_KEY: KeyCode = KeyCode::KeyR;
const PRESET_KEYS: [(KeyCode, ControlPreset); 3] = [
    (KeyCode::Digit1, ControlPreset::Casual),
    (KeyCode::Digit2, ControlPreset::Sport),
    (KeyCode::Digit3, ControlPreset::Precise),
];
const RESET_SETTINGS_KEY: KeyCode = KeyCode::Digit0;
const TOUCH_TOGGLE_KEY: KeyCode = KeyCode::KeyT;

/// `throttle` is in [-1, 1] (negative reverses), `steering` in [-1, 1] (positive turns
/// toward -X at zero yaw), `brake` in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedInput {
    pub throttle: f32,
    pub steering: f32,
    pub brake: f32,
}

pub trait InputSource {
    fn game_input(&self) -> NormalizedInput;
    fn is_enabled(&self) -> bool;
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ResetVehicleRequested;

pub struct ControlsPlugin;

impl Plugin for ControlsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeyboardControls>()
            .init_resource::<TouchControls>()
            .init_resource::<GamepadControls>()
            .init_resource::<InputUnifier>()
            .add_message::<ResetVehicleRequested>()
            .add_systems(OnEnter(GameState::Loading), init_control_settings)
            .add_systems(OnEnter(GameState::InRun), touch::spawn_touch_controls_ui)
            .add_systems(OnExit(GameState::InRun), touch::cleanup_touch_controls_ui)
            .add_systems(
                Update,
                (
                    keyboard::read_keyboard_controls,
                    toggle_touch_controls,
                    touch::read_touch_controls,
                    gamepad::read_gamepad_controls,
                    unify_inputs,
                    request_vehicle_reset,
                    touch::update_touch_controls_ui,
                )
                    .chain()
                    .in_set(TickSystems::Input)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                control_preset_hotkeys.run_if(resource_exists::<ControlSettings>),
            );
    }
}

fn init_control_settings(
    mut commands: Commands,
    config: Res<GameConfig>,
    existing: Option<Res<ControlSettings>>,
    mut log: ResMut<DebugLog>,
) {
    if existing.is_some() {
        return;
    }

    let store = FileSettingsStore::new(&config.game.app.settings_dir);
    commands.insert_resource(ControlSettings::load(Box::new(store), &mut log));
}

fn unify_inputs(
    time: Res<Time>,
    settings: Option<Res<ControlSettings>>,
    keyboard: Res<KeyboardControls>,
    touch: Res<TouchControls>,
    gamepad: Res<GamepadControls>,
    mut unifier: ResMut<InputUnifier>,
) {
    unifier.update(
        settings.as_deref().map(ControlSettings::profile),
        keyboard.game_input(),
        touch.game_input(),
        gamepad.game_input(),
        tick_seconds(&time),
    );
}

fn request_vehicle_reset(
    keys: Res<ButtonInput<KeyCode>>,
    gamepad_controls: Res<GamepadControls>,
    gamepads: Query<&Gamepad>,
    mut reset_writer: MessageWriter<ResetVehicleRequested>,
) {
    let pad_reset = gamepad_controls
        .active()
        .and_then(|entity| gamepads.get(entity).ok())
        .is_some_and(|gamepad| gamepad.just_pressed(GamepadButton::North));

    if keys.just_pressed(RESET_KEY) || pad_reset {
        reset_writer.write(ResetVehicleRequested);
    }
}

fn toggle_touch_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut controls: ResMut<TouchControls>,
    mut log: ResMut<DebugLog>,
) {
    if keys.just_pressed(TOUCH_TOGGLE_KEY) {
        controls.toggle(&mut log);
    }
}

fn control_preset_hotkeys(
    keys: Res<ButtonInput<KeyCode>>,
    mut settings: ResMut<ControlSettings>,
    mut log: ResMut<DebugLog>,
) {
    for (key, preset) in PRESET_KEYS {
        if keys.just_pressed(key) {
            settings.apply_preset(preset.name(), &mut log);
        }
    }

    if keys.just_pressed(RESET_SETTINGS_KEY) {
        settings.reset_to_defaults(&mut log);
    }
}
