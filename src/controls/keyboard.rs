use super::{InputSource, NormalizedInput};
use bevy::prelude::*;

const FORWARD_KEYS: [KeyCode; 2] = [KeyCode::KeyW, KeyCode::ArrowUp];
const REVERSE_KEYS: [KeyCode; 2] = [KeyCode::KeyS, KeyCode::ArrowDown];
const LEFT_KEYS: [KeyCode; 2] = [KeyCode::KeyA, KeyCode::ArrowLeft];
const RIGHT_KEYS: [KeyCode; 2] = [KeyCode::KeyD, KeyCode::ArrowRight];
const BRAKE_KEYS: [KeyCode; 1] = [KeyCode::Space];
const REVERSE_THROTTLE: f32 = -0.5;

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct KeyboardControls {
    input: NormalizedInput,
}

impl KeyboardControls {
    pub fn read(&mut self, keys: &ButtonInput<KeyCode>) {
        self.input = keyboard_input(keys);
    }
}

impl InputSource for KeyboardControls {
    fn game_input(&self) -> NormalizedInput {
        self.input
    }

    fn is_enabled(&self) -> bool {
        true
    }
}

pub fn keyboard_input(keys: &ButtonInput<KeyCode>) -> NormalizedInput {
    let mut input = NormalizedInput::default();

    if keys.any_pressed(FORWARD_KEYS) {
        input.throttle = 1.0;
    }
    if keys.any_pressed(REVERSE_KEYS) {
        input.throttle = REVERSE_THROTTLE;
    }
    if keys.any_pressed(LEFT_KEYS) {
        input.steering = -1.0;
    }
    if keys.any_pressed(RIGHT_KEYS) {
        input.steering = 1.0;
    }
    if keys.any_pressed(BRAKE_KEYS) {
        input.brake = 1.0;
    }

    input
}

pub(super) fn read_keyboard_controls(
    keys: Res<ButtonInput<KeyCode>>,
    mut controls: ResMut<KeyboardControls>,
) {
    controls.read(&keys);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasd_maps_to_normalized_channels() {
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyW);
        keys.press(KeyCode::KeyA);

        let input = keyboard_input(&keys);
        assert_eq!(input.throttle, 1.0);
        assert_eq!(input.steering, -1.0);
        assert_eq!(input.brake, 0.0);
    }

    #[test]
    fn reverse_and_right_take_precedence() {
        let mut keys = ButtonInput::<KeyCode>::default();
        keys.press(KeyCode::KeyW);
        keys.press(KeyCode::KeyS);
        keys.press(KeyCode::KeyA);
        keys.press(KeyCode::KeyD);
        keys.press(KeyCode::Space);

        let input = keyboard_input(&keys);
        assert_eq!(input.throttle, -0.5);
        assert_eq!(input.steering, 1.0);
        assert_eq!(input.brake, 1.0);
    }

    #[test]
    fn released_keys_report_zero() {
        let keys = ButtonInput::<KeyCode>::default();
        assert_eq!(keyboard_input(&keys), NormalizedInput::default());
    }
}
