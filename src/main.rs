mod config;
mod controls;
mod debug;
mod gameplay;
mod states;
mod ui;
mod web;

use bevy::diagnostic::FrameTimeDiagnosticsPlugin;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use config::ConfigPlugin;
use controls::ControlsPlugin;
use debug::DebugOverlayPlugin;
use gameplay::GameplayPlugin;
use states::{GameState, GameStatePlugin};
use ui::GameHudPlugin;
use web::WebSupportPlugin;

fn main() {
    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Carrinho 3D".to_string(),
            resolution: (1280, 720).into(),
            ..default()
        }),
        ..default()
    }))
    .add_plugins(EguiPlugin::default())
    .add_plugins(FrameTimeDiagnosticsPlugin::default())
    .add_plugins(WebSupportPlugin)
    .add_plugins(ConfigPlugin)
    .add_plugins(DebugOverlayPlugin)
    .add_plugins(ControlsPlugin)
    .add_plugins(GameplayPlugin)
    .add_plugins(GameHudPlugin)
    .init_state::<GameState>()
    .add_plugins(GameStatePlugin);

    app.run();
}
