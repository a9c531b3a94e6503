pub mod physics;
pub mod vehicle;
pub mod world;

use bevy::prelude::*;
use vehicle::VehicleGameplayPlugin;
use world::WorldInteractionPlugin;

const FALLBACK_TICK_SECONDS: f32 = 0.016;
const MAX_TICK_SECONDS: f32 = 0.1;

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TickSystems {
    Input,
    Motion,
    Interaction,
    Physics,
    Sync,
}

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            Update,
            (
                TickSystems::Input,
                TickSystems::Motion,
                TickSystems::Interaction,
                TickSystems::Physics,
                TickSystems::Sync,
            )
                .chain(),
        )
        .add_plugins(VehicleGameplayPlugin)
        .add_plugins(WorldInteractionPlugin);
    }
}

pub fn tick_seconds(time: &Time) -> f32 {
    let dt = time.delta_secs();
    if dt.is_finite() && dt > 0.0 {
        dt.min(MAX_TICK_SECONDS)
    } else {
        FALLBACK_TICK_SECONDS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn tick_seconds_falls_back_on_zero_delta() {
        let mut time = Time::<()>::default();
        assert_eq!(tick_seconds(&time), FALLBACK_TICK_SECONDS);

        time.advance_by(Duration::from_millis(20));
        assert!((tick_seconds(&time) - 0.02).abs() < 1e-6);
    }

    #[test]
    fn tick_seconds_caps_long_frames() {
        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_millis(250));

        assert_eq!(tick_seconds(&time), MAX_TICK_SECONDS);
    }
}
