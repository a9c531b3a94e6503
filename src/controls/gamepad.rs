use super::settings::apply_dead_zone;
use super::{InputSource, NormalizedInput};
use crate::debug::DebugLog;
use bevy::prelude::*;

const STICK_DEAD_ZONE: f32 = 0.1;

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct GamepadControls {
    active: Option<Entity>,
    input: NormalizedInput,
}

impl GamepadControls {
    pub fn active(&self) -> Option<Entity> {
        self.active
    }

    pub fn select(&mut self, connected: &[Entity], log: &mut DebugLog) -> Option<Entity> {
        if let Some(current) = self.active {
            if connected.contains(&current) {
                return Some(current);
            }
            self.active = None;
            self.input = NormalizedInput::default();
            log.warning("Gamepad disconnected", format!("{current}"));
        }

        if let Some(&first) = connected.first() {
            self.active = Some(first);
            log.success("Gamepad connected", format!("{first}"));
        }
        self.active
    }

    pub fn set_axes(&mut self, stick_x: f32, right_trigger: f32, left_trigger: f32) {
        self.input = gamepad_input(stick_x, right_trigger, left_trigger);
    }
}

impl InputSource for GamepadControls {
    fn game_input(&self) -> NormalizedInput {
        self.input
    }

    fn is_enabled(&self) -> bool {
        self.active.is_some()
    }
}

pub fn gamepad_input(stick_x: f32, right_trigger: f32, left_trigger: f32) -> NormalizedInput {
    NormalizedInput {
        throttle: right_trigger.clamp(0.0, 1.0),
        steering: apply_dead_zone(stick_x.clamp(-1.0, 1.0), STICK_DEAD_ZONE),
        brake: left_trigger.clamp(0.0, 1.0),
    }
}

pub(super) fn read_gamepad_controls(
    gamepads: Query<(Entity, &Gamepad)>,
    mut log: ResMut<DebugLog>,
    mut controls: ResMut<GamepadControls>,
) {
    let connected: Vec<Entity> = gamepads.iter().map(|(entity, _)| entity).collect();
    let Some(active) = controls.select(&connected, &mut log) else {
        return;
    };
    let Ok((_, gamepad)) = gamepads.get(active) else {
        return;
    };

    controls.set_axes(
        gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0),
        gamepad.get(GamepadButton::RightTrigger2).unwrap_or(0.0),
        gamepad.get(GamepadButton::LeftTrigger2).unwrap_or(0.0),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stick_dead_zone_is_applied_before_the_profile() {
        assert_eq!(gamepad_input(0.05, 0.0, 0.0).steering, 0.0);
        assert!((gamepad_input(-0.55, 0.0, 0.0).steering + 0.5).abs() < 1e-5);
        assert_eq!(gamepad_input(1.0, 0.0, 0.0).steering, 1.0);
    }

    #[test]
    fn triggers_map_to_throttle_and_brake() {
        let input = gamepad_input(0.0, 0.75, 0.25);
        assert_eq!(input.throttle, 0.75);
        assert_eq!(input.brake, 0.25);
    }

    #[test]
    fn first_pad_is_adopted_and_kept() {
        let mut log = DebugLog::default();
        let mut controls = GamepadControls::default();
        let mut world = World::new();
        let first = world.spawn_empty().id();
        let second = world.spawn_empty().id();

        assert_eq!(controls.select(&[first, second], &mut log), Some(first));
        assert_eq!(controls.select(&[second, first], &mut log), Some(first));
        assert!(controls.is_enabled());
    }

    #[test]
    fn disconnect_clears_input_and_logs_once() {
        let mut log = DebugLog::default();
        let mut controls = GamepadControls::default();
        let pad = World::new().spawn_empty().id();

        controls.select(&[pad], &mut log);
        controls.set_axes(1.0, 1.0, 0.0);
        assert_eq!(controls.select(&[], &mut log), None);
        assert_eq!(controls.select(&[], &mut log), None);

        assert_eq!(controls.game_input(), NormalizedInput::default());
        let disconnects = log
            .recent(10)
            .filter(|entry| entry.name == "Gamepad disconnected")
            .count();
        assert_eq!(disconnects, 1);
    }
}
