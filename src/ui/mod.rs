use crate::gameplay::vehicle::VehicleTelemetry;
use crate::gameplay::world::{CollectibleCollected, InteractiveWorld};
use crate::states::GameState;
use bevy::prelude::*;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.06, 0.09, 0.12, 0.86);
const HUD_PANEL_BORDER: Color = Color::srgba(0.58, 0.68, 0.76, 0.92);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_TEXT_MUTED: Color = Color::srgb(0.76, 0.83, 0.9);
const HUD_SCORE_FLASH: Color = Color::srgb(1.0, 0.84, 0.0);
const SCORE_FLASH_SECONDS: f32 = 0.4;

pub struct GameHudPlugin;

impl Plugin for GameHudPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HudScoreFlash>()
            .add_systems(OnEnter(GameState::InRun), spawn_game_hud)
            .add_systems(OnExit(GameState::InRun), cleanup_game_hud)
            .add_systems(
                Update,
                (track_collectible_pickups, update_game_hud)
                    .chain()
                    .run_if(in_state(GameState::InRun)),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudTextKind {
    Score,
    Speed,
}

#[derive(Resource, Debug, Clone, Default)]
struct HudScoreFlash {
    remaining_s: f32,
}

impl HudScoreFlash {
    fn trigger(&mut self) {
        self.remaining_s = SCORE_FLASH_SECONDS;
    }

    fn advance(&mut self, dt: f32) {
        self.remaining_s = (self.remaining_s - dt).max(0.0);
    }

    fn score_color(&self) -> Color {
        if self.remaining_s <= 0.0 {
            return HUD_TEXT_PRIMARY;
        }
        let t = (self.remaining_s / SCORE_FLASH_SECONDS).clamp(0.0, 1.0);
        HUD_TEXT_PRIMARY.mix(&HUD_SCORE_FLASH, t)
    }
}

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                right: Val::Px(12.0),
                top: Val::Px(10.0),
                min_width: Val::Px(220.0),
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(6.0),
                padding: UiRect::all(Val::Px(12.0)),
                border: UiRect::all(Val::Px(1.0)),
                ..default()
            },
            BackgroundColor(HUD_PANEL_BG),
            BorderColor::all(HUD_PANEL_BORDER),
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|panel| {
            panel.spawn((
                HudTextKind::Score,
                Text::new("SCORE 0"),
                TextFont {
                    font_size: 30.0,
                    ..default()
                },
                TextColor(HUD_TEXT_PRIMARY),
            ));
            panel.spawn((
                HudTextKind::Speed,
                Text::new("SPEED 0 km/h"),
                TextFont {
                    font_size: 20.0,
                    ..default()
                },
                TextColor(HUD_TEXT_MUTED),
            ));
        });
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn track_collectible_pickups(
    time: Res<Time>,
    mut pickups: MessageReader<CollectibleCollected>,
    mut flash: ResMut<HudScoreFlash>,
) {
    flash.advance(time.delta_secs());
    if pickups.read().count() > 0 {
        flash.trigger();
    }
}

fn update_game_hud(
    world: Option<Res<InteractiveWorld>>,
    telemetry: Res<VehicleTelemetry>,
    flash: Res<HudScoreFlash>,
    mut text_query: Query<(&HudTextKind, &mut Text, &mut TextColor)>,
) {
    let score = world.map(|world| world.score()).unwrap_or(0);

    for (kind, mut text, mut color) in &mut text_query {
        match kind {
            HudTextKind::Score => {
                *text = Text::new(format!("SCORE {score}"));
                color.0 = flash.score_color();
            }
            HudTextKind::Speed => {
                *text = Text::new(format!("SPEED {:.0} km/h", telemetry.speed_kmh));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_flash_fades_back_to_the_normal_color() {
        let mut flash = HudScoreFlash::default();
        assert_eq!(flash.score_color(), HUD_TEXT_PRIMARY);

        flash.trigger();
        assert_eq!(flash.score_color(), HUD_TEXT_PRIMARY.mix(&HUD_SCORE_FLASH, 1.0));

        flash.advance(SCORE_FLASH_SECONDS * 2.0);
        assert_eq!(flash.remaining_s, 0.0);
        assert_eq!(flash.score_color(), HUD_TEXT_PRIMARY);
    }
}
