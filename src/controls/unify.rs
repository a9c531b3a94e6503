use super::settings::SensitivityProfile;
use super::NormalizedInput;
use bevy::prelude::*;

pub fn merge_by_priority(
    keyboard: NormalizedInput,
    touch: NormalizedInput,
    gamepad: NormalizedInput,
) -> NormalizedInput {
    NormalizedInput {
        throttle: first_non_zero([gamepad.throttle, touch.throttle, keyboard.throttle]),
        steering: first_non_zero([gamepad.steering, touch.steering, keyboard.steering]),
        brake: first_non_zero([gamepad.brake, touch.brake, keyboard.brake]),
    }
}

fn first_non_zero(values: [f32; 3]) -> f32 {
    values
        .into_iter()
        .find(|value| *value != 0.0)
        .unwrap_or(0.0)
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct InputUnifier {
    raw: NormalizedInput,
    smoothed: NormalizedInput,
}

impl InputUnifier {
    pub fn update(
        &mut self,
        profile: Option<&SensitivityProfile>,
        keyboard: NormalizedInput,
        touch: NormalizedInput,
        gamepad: NormalizedInput,
        dt: f32,
    ) -> NormalizedInput {
        let Some(profile) = profile else {
            self.raw = merge_by_priority(keyboard, touch, gamepad);
            self.smoothed = self.raw;
            return self.smoothed;
        };

        self.raw = merge_by_priority(
            profile.apply_keyboard_sensitivity(keyboard),
            profile.apply_touch_sensitivity(touch),
            profile.apply_gamepad_sensitivity(gamepad),
        );
        self.smoothed = profile.smooth_input(self.smoothed, self.raw, dt);
        self.smoothed
    }

    pub fn raw(&self) -> NormalizedInput {
        self.raw
    }

    pub fn smoothed(&self) -> NormalizedInput {
        self.smoothed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(throttle: f32, steering: f32, brake: f32) -> NormalizedInput {
        NormalizedInput {
            throttle,
            steering,
            brake,
        }
    }

    #[test]
    fn gamepad_wins_then_touch_then_keyboard() {
        let keyboard = input(0.5, 0.0, 0.0);
        let touch = input(0.0, 0.0, 0.0);

        let merged = merge_by_priority(keyboard, touch, input(0.8, 0.0, 0.0));
        assert_eq!(merged.throttle, 0.8);

        let merged = merge_by_priority(keyboard, input(0.3, 0.0, 0.0), input(0.0, 0.0, 0.0));
        assert_eq!(merged.throttle, 0.3);

        let merged = merge_by_priority(keyboard, touch, input(0.0, 0.0, 0.0));
        assert_eq!(merged.throttle, 0.5);
    }

    #[test]
    fn channels_are_chosen_independently() {
        let keyboard = input(0.0, -1.0, 0.0);
        let gamepad = input(0.0, 0.0, 0.7);

        let merged = merge_by_priority(keyboard, input(0.0, 0.0, 0.0), gamepad);
        assert_eq!(merged, input(0.0, -1.0, 0.7));
    }

    #[test]
    fn missing_profile_passes_raw_input_through() {
        let mut unifier = InputUnifier::default();
        let out = unifier.update(
            None,
            input(1.0, 1.0, 0.0),
            input(0.0, 0.0, 0.0),
            input(0.0, 0.0, 0.0),
            1.0 / 60.0,
        );
        assert_eq!(out, input(1.0, 1.0, 0.0));
    }

    #[test]
    fn profile_scales_then_smooths() {
        let profile = SensitivityProfile::default();
        let mut unifier = InputUnifier::default();
        let dt = 0.05;

        let out = unifier.update(
            Some(&profile),
            input(0.0, 1.0, 0.0),
            input(0.0, 0.0, 0.0),
            input(0.0, 0.0, 0.0),
            dt,
        );

        // default response time 0.2 -> factor 0.25 toward a keyboard steering of 1.0
        assert!((unifier.raw().steering - 1.0).abs() < 1e-6);
        assert!((out.steering - 0.25).abs() < 1e-6);
        assert_eq!(out, unifier.smoothed());
    }
}
