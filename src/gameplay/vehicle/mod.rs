pub mod kinematic;
pub mod rigid;

use crate::config::{ConfigReloaded, GameConfig, MotionModelKind};
use crate::controls::unify::InputUnifier;
use crate::controls::{NormalizedInput, ResetVehicleRequested};
use crate::debug::DebugLog;
use crate::gameplay::physics::PhysicsWorld;
use crate::gameplay::world::InteractionOutcome;
use crate::gameplay::{tick_seconds, TickSystems};
use crate::states::GameState;
use bevy::prelude::*;
use kinematic::KinematicVehicle;
use rigid::RigidVehicle;
use std::f32::consts::FRAC_PI_2;

const CAMERA_FOLLOW_OFFSET: Vec3 = Vec3::new(8.0, 6.0, 8.0);
const CHASSIS_COLOR: Color = Color::srgb(0.85, 0.12, 0.12);
const CABIN_COLOR: Color = Color::srgb(0.2, 0.2, 0.25);
const WHEEL_COLOR: Color = Color::srgb(0.08, 0.08, 0.08);
const KINEMATIC_WHEEL_SPIN_PER_M: f32 = 2.0;

pub struct VehicleGameplayPlugin;

impl Plugin for VehicleGameplayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<VehicleTelemetry>()
            .add_systems(OnEnter(GameState::InRun), start_driving_session)
            .add_systems(
                Update,
                rebuild_vehicle_on_reload.run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                (reset_vehicle_on_request, drive_vehicle)
                    .chain()
                    .in_set(TickSystems::Motion)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<VehicleController>),
            )
            .add_systems(
                Update,
                step_vehicle_physics
                    .in_set(TickSystems::Physics)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<VehicleController>),
            )
            .add_systems(
                Update,
                (
                    sync_vehicle_visuals,
                    update_vehicle_telemetry,
                    camera_follow_vehicle,
                )
                    .chain()
                    .in_set(TickSystems::Sync)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<VehicleController>),
            );
    }
}

pub(super) fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta.copysign(delta)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionAuthority {
    Rigid,
    Kinematic,
}

impl MotionAuthority {
    pub fn label(self) -> &'static str {
        match self {
            Self::Rigid => "rigid",
            Self::Kinematic => "kinematic",
        }
    }
}

#[derive(Debug, Clone)]
enum VehicleMotion {
    Rigid(RigidVehicle),
    Kinematic(KinematicVehicle),
}

/// The single authority for the car pose. Exactly one motion model is live at a time.
#[derive(Resource, Debug, Clone)]
pub struct VehicleController {
    motion: VehicleMotion,
    spawn: Vec3,
}

impl VehicleController {
    pub fn new(config: &GameConfig, physics: &mut PhysicsWorld, log: &mut DebugLog) -> Self {
        let spawn = config.spawn_position();
        let kinematic_spawn = Vec3::new(spawn.x, kinematic_ride_height(config), spawn.z);

        let motion = match config.game.app.motion_model {
            MotionModelKind::Rigid => {
                match RigidVehicle::build(physics, &config.game.rigid, spawn) {
                    Ok(vehicle) => {
                        log.success("Vehicle created", "rigid chassis with 4 wheels");
                        VehicleMotion::Rigid(vehicle)
                    }
                    Err(error) => {
                        log.warning("Rigid vehicle unavailable", error.to_string());
                        warn!("Rigid vehicle build failed, falling back to kinematic: {error}");
                        VehicleMotion::Kinematic(KinematicVehicle::new(
                            config.game.kinematic.clone(),
                            kinematic_spawn,
                        ))
                    }
                }
            }
            MotionModelKind::Kinematic => {
                log.success("Vehicle created", "kinematic");
                VehicleMotion::Kinematic(KinematicVehicle::new(
                    config.game.kinematic.clone(),
                    kinematic_spawn,
                ))
            }
        };

        let spawn = match &motion {
            VehicleMotion::Rigid(_) => spawn,
            VehicleMotion::Kinematic(_) => kinematic_spawn,
        };
        Self { motion, spawn }
    }

    pub fn authority(&self) -> MotionAuthority {
        match self.motion {
            VehicleMotion::Rigid(_) => MotionAuthority::Rigid,
            VehicleMotion::Kinematic(_) => MotionAuthority::Kinematic,
        }
    }

    pub fn rigid(&self) -> Option<&RigidVehicle> {
        match &self.motion {
            VehicleMotion::Rigid(vehicle) => Some(vehicle),
            VehicleMotion::Kinematic(_) => None,
        }
    }

    pub fn kinematic(&self) -> Option<&KinematicVehicle> {
        match &self.motion {
            VehicleMotion::Kinematic(vehicle) => Some(vehicle),
            VehicleMotion::Rigid(_) => None,
        }
    }

    pub fn drive(
        &mut self,
        physics: &mut PhysicsWorld,
        input: NormalizedInput,
        dt: f32,
        log: &mut DebugLog,
    ) {
        match &mut self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.drive(physics, input, dt, log),
            VehicleMotion::Kinematic(vehicle) => vehicle.update(input, dt),
        }
    }

    pub fn enforce_validity(&mut self, physics: &mut PhysicsWorld, log: &mut DebugLog) -> bool {
        match &mut self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.enforce_validity(physics, log),
            VehicleMotion::Kinematic(vehicle) => {
                if vehicle.position().is_finite() && vehicle.current_speed().is_finite() {
                    return false;
                }
                vehicle.reset(self.spawn);
                log.warning("Vehicle reset", "kinematic state was not finite");
                true
            }
        }
    }

    pub fn pose(&self, physics: &PhysicsWorld) -> Option<(Vec3, Quat)> {
        match &self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.pose(physics),
            VehicleMotion::Kinematic(vehicle) => Some((vehicle.position(), vehicle.rotation())),
        }
    }

    pub fn position(&self, physics: &PhysicsWorld) -> Option<Vec3> {
        self.pose(physics).map(|(position, _)| position)
    }

    pub fn speed_kmh(&self, physics: &PhysicsWorld) -> f32 {
        match &self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.speed_kmh(physics),
            VehicleMotion::Kinematic(vehicle) => vehicle.speed_kmh(),
        }
    }

    pub fn is_drifting(&self) -> bool {
        match &self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.is_drifting(),
            VehicleMotion::Kinematic(_) => false,
        }
    }

    pub fn apply_interaction(&mut self, physics: &mut PhysicsWorld, outcome: &InteractionOutcome) {
        match &mut self.motion {
            VehicleMotion::Rigid(vehicle) => {
                if outcome.speed_factor != 1.0 {
                    vehicle.scale_velocity(physics, outcome.speed_factor);
                }
                if outcome.push != Vec3::ZERO {
                    vehicle.translate(physics, outcome.push);
                }
            }
            VehicleMotion::Kinematic(vehicle) => {
                if outcome.speed_factor != 1.0 {
                    vehicle.scale_speed(outcome.speed_factor);
                }
                if outcome.push != Vec3::ZERO {
                    vehicle.translate(outcome.push);
                }
            }
        }
    }

    pub fn reset(&mut self, physics: &mut PhysicsWorld) {
        match &mut self.motion {
            VehicleMotion::Rigid(vehicle) => vehicle.reset(physics, self.spawn),
            VehicleMotion::Kinematic(vehicle) => vehicle.reset(self.spawn),
        }
    }
}

fn kinematic_ride_height(config: &GameConfig) -> f32 {
    -config.game.rigid.wheel_anchor_y + config.game.rigid.wheel_radius
}

#[derive(Resource, Debug, Clone)]
pub struct VehicleTelemetry {
    pub authority: MotionAuthority,
    pub position: Vec3,
    pub speed_kmh: f32,
    pub drifting: bool,
    pub input: NormalizedInput,
    pub raw_input: NormalizedInput,
    pub drive_forces: Option<DriveForces>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveForces {
    pub engine: f32,
    pub steer_angle: f32,
    pub brake: f32,
}

impl DriveForces {
    fn of(rigid: &RigidVehicle) -> Self {
        Self {
            engine: rigid.engine_force(),
            steer_angle: rigid.steer_angle(),
            brake: rigid.brake_force(),
        }
    }
}

impl Default for VehicleTelemetry {
    fn default() -> Self {
        Self {
            authority: MotionAuthority::Kinematic,
            position: Vec3::ZERO,
            speed_kmh: 0.0,
            drifting: false,
            input: NormalizedInput::default(),
            raw_input: NormalizedInput::default(),
            drive_forces: None,
        }
    }
}

#[derive(Component)]
pub struct PlayerCar;

#[derive(Component)]
struct VehicleSceneEntity;

#[derive(Component, Debug, Clone, Copy)]
struct WheelVisual {
    index: usize,
    local_offset: Vec3,
}

fn start_driving_session(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    existing: Option<Res<VehicleController>>,
    mut log: ResMut<DebugLog>,
) {
    if existing.is_some() {
        return;
    }

    build_vehicle_session(&mut commands, &mut meshes, &mut materials, &config, &mut log);
}

fn rebuild_vehicle_on_reload(
    mut commands: Commands,
    mut reloaded: MessageReader<ConfigReloaded>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    existing: Option<Res<VehicleController>>,
    scene_query: Query<Entity, With<VehicleSceneEntity>>,
    mut log: ResMut<DebugLog>,
) {
    if reloaded.read().count() == 0 || existing.is_none() {
        return;
    }

    for entity in &scene_query {
        commands.entity(entity).try_despawn();
    }
    build_vehicle_session(&mut commands, &mut meshes, &mut materials, &config, &mut log);
}

fn build_vehicle_session(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    config: &GameConfig,
    log: &mut DebugLog,
) {
    let mut physics = PhysicsWorld::new(&config.game.physics, &config.world.ramps);
    let controller = VehicleController::new(config, &mut physics, log);
    let rig = &config.game.rigid;
    let (position, rotation) = controller
        .pose(&physics)
        .unwrap_or((controller.spawn, Quat::IDENTITY));

    let chassis_half = Vec3::from_array(rig.chassis_half_extents);
    let cabin_half = Vec3::from_array(rig.cabin_half_extents);
    let cabin_offset =
        Vec3::from_array(rig.cabin_anchor_on_chassis) - Vec3::from_array(rig.cabin_anchor_on_cabin);

    commands
        .spawn((
            Name::new("PlayerCar"),
            PlayerCar,
            VehicleSceneEntity,
            Mesh3d(meshes.add(Cuboid::from_size(chassis_half * 2.0))),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color: CHASSIS_COLOR,
                ..default()
            })),
            Transform::from_translation(position).with_rotation(rotation),
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("PlayerCabin"),
                Mesh3d(meshes.add(Cuboid::from_size(cabin_half * 2.0))),
                MeshMaterial3d(materials.add(StandardMaterial {
                    base_color: CABIN_COLOR,
                    ..default()
                })),
                Transform::from_translation(cabin_offset),
            ));
        });

    let wheel_mesh = meshes.add(Cylinder::new(rig.wheel_radius, rig.wheel_width));
    let wheel_material = materials.add(StandardMaterial {
        base_color: WHEEL_COLOR,
        perceptual_roughness: 0.95,
        ..default()
    });
    for (index, [x, z]) in rig.wheel_offsets.iter().copied().enumerate() {
        let local_offset = Vec3::new(x, rig.wheel_anchor_y, z);
        commands.spawn((
            Name::new(format!("PlayerWheel{index}")),
            VehicleSceneEntity,
            WheelVisual {
                index,
                local_offset,
            },
            Mesh3d(wheel_mesh.clone()),
            MeshMaterial3d(wheel_material.clone()),
            Transform::from_translation(position + rotation * local_offset)
                .with_rotation(rotation * Quat::from_rotation_z(FRAC_PI_2)),
        ));
    }

    info!(
        "Driving session started with the {} motion model.",
        controller.authority().label()
    );
    commands.insert_resource(physics);
    commands.insert_resource(controller);
}

fn reset_vehicle_on_request(
    mut requests: MessageReader<ResetVehicleRequested>,
    mut controller: ResMut<VehicleController>,
    mut physics: ResMut<PhysicsWorld>,
    mut log: ResMut<DebugLog>,
) {
    if requests.read().count() == 0 {
        return;
    }

    controller.reset(&mut physics);
    log.success("Vehicle reset", "back to spawn");
}

fn drive_vehicle(
    time: Res<Time>,
    unifier: Res<InputUnifier>,
    mut controller: ResMut<VehicleController>,
    mut physics: ResMut<PhysicsWorld>,
    mut log: ResMut<DebugLog>,
) {
    controller.drive(&mut physics, unifier.smoothed(), tick_seconds(&time), &mut log);
}

fn step_vehicle_physics(
    time: Res<Time>,
    mut controller: ResMut<VehicleController>,
    mut physics: ResMut<PhysicsWorld>,
    mut log: ResMut<DebugLog>,
) {
    if controller.authority() == MotionAuthority::Rigid {
        physics.step(tick_seconds(&time));
    }
    controller.enforce_validity(&mut physics, &mut log);
}

fn sync_vehicle_visuals(
    controller: Res<VehicleController>,
    physics: Res<PhysicsWorld>,
    mut car_query: Query<&mut Transform, With<PlayerCar>>,
    mut wheel_query: Query<(&WheelVisual, &mut Transform), Without<PlayerCar>>,
) {
    let Some((position, rotation)) = controller.pose(&physics) else {
        return;
    };
    let Ok(mut car_transform) = car_query.single_mut() else {
        return;
    };
    car_transform.translation = position;
    car_transform.rotation = rotation;

    let axle = Quat::from_rotation_z(FRAC_PI_2);
    if let Some(rigid) = controller.rigid() {
        let poses = rigid.wheel_poses(&physics);
        for (wheel, mut transform) in &mut wheel_query {
            if let Some((wheel_position, wheel_rotation)) = poses.get(wheel.index) {
                transform.translation = *wheel_position;
                transform.rotation = *wheel_rotation * axle;
            }
        }
    } else if let Some(kinematic) = controller.kinematic() {
        let roll =
            Quat::from_rotation_x(kinematic.distance_travelled() * KINEMATIC_WHEEL_SPIN_PER_M);
        for (wheel, mut transform) in &mut wheel_query {
            transform.translation = position + rotation * wheel.local_offset;
            transform.rotation = rotation * roll * axle;
        }
    }
}

fn update_vehicle_telemetry(
    controller: Res<VehicleController>,
    physics: Res<PhysicsWorld>,
    unifier: Res<InputUnifier>,
    mut telemetry: ResMut<VehicleTelemetry>,
) {
    telemetry.authority = controller.authority();
    telemetry.position = controller.position(&physics).unwrap_or(telemetry.position);
    telemetry.speed_kmh = controller.speed_kmh(&physics);
    telemetry.drifting = controller.is_drifting();
    telemetry.input = unifier.smoothed();
    telemetry.raw_input = unifier.raw();
    telemetry.drive_forces = controller.rigid().map(DriveForces::of);
}

fn camera_follow_vehicle(
    telemetry: Res<VehicleTelemetry>,
    mut camera_query: Query<&mut Transform, (With<Camera3d>, Without<PlayerCar>)>,
) {
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let target = telemetry.position;
    *camera_transform =
        Transform::from_translation(target + CAMERA_FOLLOW_OFFSET).looking_at(target, Vec3::Y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    #[test]
    fn move_towards_steps_by_at_most_max_delta() {
        assert_eq!(move_towards(0.0, 10.0, 3.0), 3.0);
        assert_eq!(move_towards(0.0, -10.0, 3.0), -3.0);
        assert_eq!(move_towards(9.0, 10.0, 3.0), 10.0);
        assert_eq!(move_towards(5.0, 5.0, 0.0), 5.0);
    }

    #[test]
    fn rigid_config_builds_the_rigid_controller() {
        let config = test_config();
        let mut physics = PhysicsWorld::new(&config.game.physics, &config.world.ramps);
        let mut log = DebugLog::default();

        let controller = VehicleController::new(&config, &mut physics, &mut log);

        assert_eq!(controller.authority(), MotionAuthority::Rigid);
        assert!(controller.rigid().is_some());
        assert!(controller.kinematic().is_none());
    }

    #[test]
    fn broken_rigid_tuning_falls_back_to_kinematic() {
        let mut config = test_config();
        config.game.rigid.wheel_radius = -1.0;
        let mut physics = PhysicsWorld::new(&config.game.physics, &[]);
        let mut log = DebugLog::default();

        let controller = VehicleController::new(&config, &mut physics, &mut log);

        assert_eq!(controller.authority(), MotionAuthority::Kinematic);
        assert!(log
            .recent(4)
            .any(|entry| entry.name == "Rigid vehicle unavailable"));
        assert!(controller.position(&physics).is_some_and(|p| p.is_finite()));
    }

    #[test]
    fn interaction_slows_and_pushes_the_kinematic_car() {
        let mut config = test_config();
        config.game.app.motion_model = MotionModelKind::Kinematic;
        let mut physics = PhysicsWorld::new(&config.game.physics, &[]);
        let mut log = DebugLog::default();
        let mut controller = VehicleController::new(&config, &mut physics, &mut log);
        let throttle = NormalizedInput {
            throttle: 1.0,
            ..default()
        };
        for _ in 0..30 {
            controller.drive(&mut physics, throttle, 1.0 / 60.0, &mut log);
        }
        let speed_before = controller.speed_kmh(&physics);
        let position_before = controller.position(&physics).expect("kinematic pose");

        let outcome = InteractionOutcome {
            speed_factor: 0.5,
            push: Vec3::new(0.0, 0.0, -0.3),
            ..default()
        };
        controller.apply_interaction(&mut physics, &outcome);

        assert!((controller.speed_kmh(&physics) - speed_before * 0.5).abs() < 1e-4);
        let position_after = controller.position(&physics).expect("kinematic pose");
        assert!((position_after - position_before - outcome.push).length() < 1e-5);
    }

    #[test]
    fn reset_returns_the_car_to_spawn() {
        let mut config = test_config();
        config.game.app.motion_model = MotionModelKind::Kinematic;
        let mut physics = PhysicsWorld::new(&config.game.physics, &[]);
        let mut log = DebugLog::default();
        let mut controller = VehicleController::new(&config, &mut physics, &mut log);
        let spawn = controller.position(&physics).expect("kinematic pose");

        for _ in 0..60 {
            controller.drive(
                &mut physics,
                NormalizedInput {
                    throttle: 1.0,
                    steering: 0.5,
                    brake: 0.0,
                },
                1.0 / 60.0,
                &mut log,
            );
        }
        controller.reset(&mut physics);

        assert_eq!(controller.position(&physics), Some(spawn));
        assert_eq!(controller.speed_kmh(&physics), 0.0);
    }
}
