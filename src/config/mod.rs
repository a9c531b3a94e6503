use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<ConfigReloaded>()
            .add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

#[derive(Message, Debug, Clone, Copy)]
pub struct ConfigReloaded;

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
    mut reloaded: MessageWriter<ConfigReloaded>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
            reloaded.write(ConfigReloaded);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: motion model {:?}, {} collectibles, {} obstacles, {} ramps, {} boundaries.",
        config.game.app.motion_model,
        config.world.collectibles.len(),
        config.world.obstacles.len(),
        config.world.ramps.len(),
        config.world.boundaries.len()
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub world: WorldFile,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let world: WorldFile = read_toml(&config_dir.join("world.toml"))?;

        let config = Self { game, world };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        ensure_unique_ids("world.toml::collectibles", &self.world.collectibles)?;
        ensure_unique_ids("world.toml::obstacles", &self.world.obstacles)?;
        ensure_unique_ids("world.toml::ramps", &self.world.ramps)?;
        ensure_unique_ids("world.toml::boundaries", &self.world.boundaries)?;

        let app = &self.game.app;
        if app.min_loading_seconds < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::app.min_loading_seconds must be >= 0".to_string(),
            ));
        }
        if app.settings_dir.trim().is_empty() {
            return Err(ConfigError::Validation(
                "game.toml::app.settings_dir must not be empty".to_string(),
            ));
        }
        if app.spawn_position.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Validation(
                "game.toml::app.spawn_position must be finite".to_string(),
            ));
        }

        let kinematic = &self.game.kinematic;
        if kinematic.max_speed <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::kinematic.max_speed must be > 0".to_string(),
            ));
        }
        if kinematic.acceleration <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::kinematic.acceleration must be > 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&kinematic.deceleration) {
            return Err(ConfigError::Validation(
                "game.toml::kinematic.deceleration must be in [0, 1)".to_string(),
            ));
        }
        if kinematic.turn_speed < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::kinematic.turn_speed must be >= 0".to_string(),
            ));
        }

        let rigid = &self.game.rigid;
        if rigid.wheel_offsets.len() != 4 {
            return Err(ConfigError::Validation(format!(
                "game.toml::rigid.wheel_offsets must list exactly 4 wheels, found {}",
                rigid.wheel_offsets.len()
            )));
        }
        if rigid.chassis_mass <= 0.0 || rigid.cabin_mass <= 0.0 || rigid.wheel_mass <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::rigid masses must be > 0".to_string(),
            ));
        }
        if rigid.wheel_radius <= 0.0 || rigid.wheel_width <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::rigid.wheel_radius and wheel_width must be > 0".to_string(),
            ));
        }
        if rigid.chassis_half_extents.iter().any(|v| *v <= 0.0)
            || rigid.cabin_half_extents.iter().any(|v| *v <= 0.0)
        {
            return Err(ConfigError::Validation(
                "game.toml::rigid half extents must be > 0".to_string(),
            ));
        }
        if rigid.guard_half_extent <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::rigid.guard_half_extent must be > 0".to_string(),
            ));
        }
        if rigid.max_traction < 0.0 || rigid.traction_coefficient < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::rigid traction values must be >= 0".to_string(),
            ));
        }

        let interaction = &self.game.interaction;
        if interaction.collect_radius <= 0.0
            || interaction.obstacle_radius <= 0.0
            || interaction.boundary_radius <= 0.0
        {
            return Err(ConfigError::Validation(
                "game.toml::interaction radii must be > 0".to_string(),
            ));
        }
        for (label, factor) in [
            ("obstacle_speed_factor", interaction.obstacle_speed_factor),
            ("boundary_speed_factor", interaction.boundary_speed_factor),
        ] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(ConfigError::Validation(format!(
                    "game.toml::interaction.{label} must be in [0, 1]"
                )));
            }
        }
        if interaction.collect_fade_seconds < 0.0 || interaction.obstacle_flash_seconds < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::interaction timers must be >= 0".to_string(),
            ));
        }

        for (index, ramp) in self.world.ramps.iter().enumerate() {
            if ramp.size.iter().any(|v| *v <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "world.toml::ramps[{index}].size must be > 0 on every axis"
                )));
            }
        }
        for (index, boundary) in self.world.boundaries.iter().enumerate() {
            if boundary.size.iter().any(|v| *v <= 0.0) {
                return Err(ConfigError::Validation(format!(
                    "world.toml::boundaries[{index}].size must be > 0 on every axis"
                )));
            }
        }

        Ok(())
    }

    pub fn spawn_position(&self) -> Vec3 {
        Vec3::from_array(self.game.app.spawn_position)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

fn ensure_unique_ids<T: HasId>(label: &str, rows: &[T]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for row in rows {
        let id = row.id();
        if id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{label} contains an empty id"
            )));
        }

        if !seen.insert(id) {
            return Err(ConfigError::Validation(format!(
                "{label} contains duplicate id `{id}`"
            )));
        }
    }

    Ok(())
}

trait HasId {
    fn id(&self) -> &str;
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub kinematic: KinematicConfig,
    pub rigid: RigidVehicleConfig,
    pub physics: PhysicsConfig,
    pub interaction: InteractionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionModelKind {
    Rigid,
    Kinematic,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub debug_overlay: bool,
    pub motion_model: MotionModelKind,
    pub spawn_position: [f32; 3],
    #[serde(default = "default_min_loading_seconds")]
    pub min_loading_seconds: f32,
    #[serde(default)]
    pub force_touch_controls: bool,
    #[serde(default = "default_settings_dir")]
    pub settings_dir: String,
}

fn default_min_loading_seconds() -> f32 {
    2.0
}

fn default_settings_dir() -> String {
    "saves".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct KinematicConfig {
    pub acceleration: f32,
    pub deceleration: f32,
    pub max_speed: f32,
    pub turn_speed: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RigidVehicleConfig {
    pub chassis_half_extents: [f32; 3],
    pub chassis_mass: f32,
    pub cabin_half_extents: [f32; 3],
    pub cabin_mass: f32,
    pub cabin_anchor_on_chassis: [f32; 3],
    pub cabin_anchor_on_cabin: [f32; 3],
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub wheel_radius: f32,
    pub wheel_width: f32,
    pub wheel_mass: f32,
    /// Wheel hardpoints as `[x, z]` in chassis space. The first two are the front axle.
    pub wheel_offsets: Vec<[f32; 2]>,
    pub wheel_anchor_y: f32,
    pub suspension_rest_length: f32,
    pub suspension_stiffness: f32,
    pub suspension_damping: f32,
    pub max_engine_force: f32,
    pub engine_response: f32,
    pub max_steer_angle: f32,
    pub steer_response: f32,
    pub steer_force: f32,
    pub max_brake_force: f32,
    pub brake_response: f32,
    pub traction_coefficient: f32,
    pub max_traction: f32,
    pub drift_threshold: f32,
    pub guard_floor_y: f32,
    pub guard_half_extent: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub wheel_friction: f32,
    pub wheel_restitution: f32,
    pub car_friction: f32,
    pub car_restitution: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InteractionConfig {
    pub collect_radius: f32,
    pub obstacle_radius: f32,
    pub boundary_radius: f32,
    pub collect_score: u32,
    pub obstacle_speed_factor: f32,
    pub boundary_push: f32,
    pub boundary_speed_factor: f32,
    pub collect_fade_seconds: f32,
    pub obstacle_flash_seconds: f32,
    #[serde(default = "default_collectible_spin")]
    pub collectible_spin_per_tick: f32,
    #[serde(default = "default_collectible_base_y")]
    pub collectible_base_y: f32,
    #[serde(default = "default_collectible_bob_amplitude")]
    pub collectible_bob_amplitude: f32,
    #[serde(default = "default_collectible_bob_frequency")]
    pub collectible_bob_frequency: f32,
}

fn default_collectible_spin() -> f32 {
    0.05
}

fn default_collectible_base_y() -> f32 {
    1.5
}

fn default_collectible_bob_amplitude() -> f32 {
    0.2
}

fn default_collectible_bob_frequency() -> f32 {
    3.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorldFile {
    #[serde(default)]
    pub collectibles: Vec<CollectibleConfig>,
    #[serde(default)]
    pub obstacles: Vec<ObstacleConfig>,
    #[serde(default)]
    pub ramps: Vec<RampConfig>,
    #[serde(default)]
    pub boundaries: Vec<BoundaryConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectibleConfig {
    pub id: String,
    pub x: f32,
    pub z: f32,
}

impl HasId for CollectibleConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObstacleConfig {
    pub id: String,
    pub x: f32,
    pub z: f32,
    #[serde(default = "default_obstacle_size")]
    pub size: [f32; 3],
}

fn default_obstacle_size() -> [f32; 3] {
    [1.0, 2.0, 1.0]
}

impl HasId for ObstacleConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RampConfig {
    pub id: String,
    pub x: f32,
    pub z: f32,
    pub yaw_degrees: f32,
    #[serde(default = "default_ramp_tilt_degrees")]
    pub tilt_degrees: f32,
    #[serde(default = "default_ramp_size")]
    pub size: [f32; 3],
}

fn default_ramp_tilt_degrees() -> f32 {
    -22.5
}

fn default_ramp_size() -> [f32; 3] {
    [6.0, 1.0, 4.0]
}

impl HasId for RampConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

impl RampConfig {
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x, self.size[1] * 0.5, self.z)
    }

    /// Yaw first, then the tilt about the ramp's local X axis.
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw_degrees.to_radians())
            * Quat::from_rotation_x(self.tilt_degrees.to_radians())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryConfig {
    pub id: String,
    pub x: f32,
    pub z: f32,
    pub size: [f32; 3],
}

impl HasId for BoundaryConfig {
    fn id(&self) -> &str {
        &self.id
    }
}

impl BoundaryConfig {
    pub fn center(&self) -> Vec3 {
        Vec3::new(self.x, self.size[1] * 0.5, self.z)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> GameConfig {
    GameConfig {
        game: GameFile {
            app: AppConfig {
                debug_overlay: true,
                motion_model: MotionModelKind::Rigid,
                spawn_position: [0.0, 2.0, 0.0],
                min_loading_seconds: 0.0,
                force_touch_controls: false,
                settings_dir: "saves".to_string(),
            },
            kinematic: KinematicConfig {
                acceleration: 0.3,
                deceleration: 0.85,
                max_speed: 0.5,
                turn_speed: 0.08,
            },
            rigid: RigidVehicleConfig {
                chassis_half_extents: [1.75, 0.4, 3.5],
                chassis_mass: 150.0,
                cabin_half_extents: [1.4, 0.5, 1.75],
                cabin_mass: 50.0,
                cabin_anchor_on_chassis: [0.0, 0.8, -0.5],
                cabin_anchor_on_cabin: [0.0, -0.5, 0.0],
                linear_damping: 0.3,
                angular_damping: 0.6,
                wheel_radius: 0.5,
                wheel_width: 0.3,
                wheel_mass: 10.0,
                wheel_offsets: vec![[-1.0, 1.5], [1.0, 1.5], [-1.0, -1.5], [1.0, -1.5]],
                wheel_anchor_y: -0.9,
                suspension_rest_length: 0.5,
                suspension_stiffness: 400.0,
                suspension_damping: 30.0,
                max_engine_force: 1200.0,
                engine_response: 2400.0,
                max_steer_angle: 0.5,
                steer_response: 3.0,
                steer_force: 3000.0,
                max_brake_force: 600.0,
                brake_response: 2400.0,
                traction_coefficient: 0.2,
                max_traction: 80.0,
                drift_threshold: 3.0,
                guard_floor_y: -10.0,
                guard_half_extent: 100.0,
            },
            physics: PhysicsConfig {
                gravity: -9.82,
                wheel_friction: 0.8,
                wheel_restitution: 0.1,
                car_friction: 0.6,
                car_restitution: 0.2,
            },
            interaction: InteractionConfig {
                collect_radius: 2.0,
                obstacle_radius: 2.0,
                boundary_radius: 3.0,
                collect_score: 10,
                obstacle_speed_factor: 0.5,
                boundary_push: 0.3,
                boundary_speed_factor: 0.8,
                collect_fade_seconds: 0.5,
                obstacle_flash_seconds: 0.2,
                collectible_spin_per_tick: 0.05,
                collectible_base_y: 1.5,
                collectible_bob_amplitude: 0.2,
                collectible_bob_frequency: 3.0,
            },
        },
        world: WorldFile {
            collectibles: vec![CollectibleConfig {
                id: "coin_a".to_string(),
                x: 10.0,
                z: 10.0,
            }],
            obstacles: vec![ObstacleConfig {
                id: "barrier_a".to_string(),
                x: 5.0,
                z: 5.0,
                size: default_obstacle_size(),
            }],
            ramps: vec![RampConfig {
                id: "ramp_a".to_string(),
                x: 0.0,
                z: 15.0,
                yaw_degrees: 0.0,
                tilt_degrees: default_ramp_tilt_degrees(),
                size: default_ramp_size(),
            }],
            boundaries: vec![BoundaryConfig {
                id: "north".to_string(),
                x: 0.0,
                z: 25.0,
                size: [50.0, 3.0, 1.0],
            }],
        },
    }
}
