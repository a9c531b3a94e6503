use super::move_towards;
use crate::config::RigidVehicleConfig;
use crate::controls::NormalizedInput;
use crate::debug::DebugLog;
use crate::gameplay::physics::{to_bevy_quat, to_bevy_vec3, to_rapier_vector, PhysicsWorld};
use bevy::prelude::*;
use rapier3d::dynamics::{
    FixedJointBuilder, RigidBodyBuilder, RigidBodyHandle, SphericalJointBuilder,
    SpringJointBuilder,
};
use rapier3d::geometry::ColliderBuilder;
use rapier3d::math::{Point, Real};
use rapier3d::na::{point, vector, UnitQuaternion};
use std::error::Error;
use std::f32::consts::FRAC_PI_2;
use std::fmt::{Display, Formatter};

const WHEEL_COUNT: usize = 4;
const FRONT_WHEEL_COUNT: usize = 2;
const BRAKE_WHEEL_LINEAR_RETAIN: f32 = 0.95;
const BRAKE_WHEEL_ANGULAR_RETAIN: f32 = 0.9;
const STEER_FULL_EFFECT_SPEED_MPS: f32 = 5.0;
const TRACTION_BASELINE_TICKS_PER_SECOND: f32 = 60.0;
const KMH_PER_MPS: f32 = 3.6;

#[derive(Debug, Clone, PartialEq)]
pub enum VehicleBuildError {
    NonPositive { parameter: &'static str, value: f32 },
    NonFinite { parameter: &'static str },
    WheelCount(usize),
}

impl Display for VehicleBuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositive { parameter, value } => {
                write!(f, "vehicle parameter `{parameter}` must be > 0 (got {value})")
            }
            Self::NonFinite { parameter } => {
                write!(f, "vehicle parameter `{parameter}` must be finite")
            }
            Self::WheelCount(count) => {
                write!(f, "vehicle needs exactly {WHEEL_COUNT} wheels, got {count}")
            }
        }
    }
}

impl Error for VehicleBuildError {}

#[derive(Debug, Clone, Copy)]
struct WheelBody {
    handle: RigidBodyHandle,
    offset: Vec3,
    front: bool,
}

#[derive(Debug, Clone)]
pub struct RigidVehicle {
    tuning: RigidVehicleConfig,
    spawn: Vec3,
    chassis: RigidBodyHandle,
    cabin: RigidBodyHandle,
    cabin_offset: Vec3,
    wheels: Vec<WheelBody>,
    engine_force: f32,
    steer_angle: f32,
    brake_force: f32,
    drifting: bool,
}

impl RigidVehicle {
    pub fn build(
        world: &mut PhysicsWorld,
        tuning: &RigidVehicleConfig,
        spawn: Vec3,
    ) -> Result<Self, VehicleBuildError> {
        validate_tuning(tuning, spawn)?;

        let materials = world.materials().clone();
        let chassis_half = Vec3::from_array(tuning.chassis_half_extents);
        let cabin_half = Vec3::from_array(tuning.cabin_half_extents);

        let chassis = world.bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(to_rapier_vector(spawn))
                .linear_damping(tuning.linear_damping)
                .angular_damping(tuning.angular_damping)
                .can_sleep(false)
                .build(),
        );
        world.colliders.insert_with_parent(
            ColliderBuilder::cuboid(chassis_half.x, chassis_half.y, chassis_half.z)
                .mass(tuning.chassis_mass)
                .friction(materials.car_friction)
                .restitution(materials.car_restitution)
                .build(),
            chassis,
            &mut world.bodies,
        );

        let cabin_anchor_on_chassis = Vec3::from_array(tuning.cabin_anchor_on_chassis);
        let cabin_anchor_on_cabin = Vec3::from_array(tuning.cabin_anchor_on_cabin);
        let cabin_offset = cabin_anchor_on_chassis - cabin_anchor_on_cabin;
        let cabin = world.bodies.insert(
            RigidBodyBuilder::dynamic()
                .translation(to_rapier_vector(spawn + cabin_offset))
                .linear_damping(tuning.linear_damping)
                .angular_damping(tuning.angular_damping)
                .can_sleep(false)
                .build(),
        );
        world.colliders.insert_with_parent(
            ColliderBuilder::cuboid(cabin_half.x, cabin_half.y, cabin_half.z)
                .mass(tuning.cabin_mass)
                .friction(materials.car_friction)
                .restitution(materials.car_restitution)
                .build(),
            cabin,
            &mut world.bodies,
        );
        world.impulse_joints.insert(
            chassis,
            cabin,
            FixedJointBuilder::new()
                .local_anchor1(to_point(cabin_anchor_on_chassis))
                .local_anchor2(to_point(cabin_anchor_on_cabin))
                .contacts_enabled(false),
            true,
        );

        let mut wheels = Vec::with_capacity(WHEEL_COUNT);
        for (index, [x, z]) in tuning.wheel_offsets.iter().copied().enumerate() {
            let offset = Vec3::new(x, tuning.wheel_anchor_y, z);
            let handle = world.bodies.insert(
                RigidBodyBuilder::dynamic()
                    .translation(to_rapier_vector(spawn + offset))
                    .can_sleep(false)
                    .build(),
            );
            // Cylinders are Y-aligned; roll the axle onto X.
            world.colliders.insert_with_parent(
                ColliderBuilder::cylinder(tuning.wheel_width * 0.5, tuning.wheel_radius)
                    .rotation(vector![0.0, 0.0, FRAC_PI_2])
                    .mass(tuning.wheel_mass)
                    .friction(materials.wheel_friction)
                    .restitution(materials.wheel_restitution)
                    .build(),
                handle,
                &mut world.bodies,
            );

            world.impulse_joints.insert(
                chassis,
                handle,
                SphericalJointBuilder::new()
                    .local_anchor1(to_point(offset))
                    .local_anchor2(point![0.0, 0.0, 0.0])
                    .contacts_enabled(false),
                true,
            );
            world.impulse_joints.insert(
                chassis,
                handle,
                SpringJointBuilder::new(
                    tuning.suspension_rest_length,
                    tuning.suspension_stiffness,
                    tuning.suspension_damping,
                )
                .local_anchor1(to_point(
                    offset + Vec3::Y * tuning.suspension_rest_length,
                ))
                .local_anchor2(point![0.0, 0.0, 0.0])
                .contacts_enabled(false),
                true,
            );

            wheels.push(WheelBody {
                handle,
                offset,
                front: index < FRONT_WHEEL_COUNT,
            });
        }

        let handles = [chassis, cabin]
            .into_iter()
            .chain(wheels.iter().map(|wheel: &WheelBody| wheel.handle));
        for handle in handles {
            if let Some(body) = world.bodies.get_mut(handle) {
                body.recompute_mass_properties_from_colliders(&world.colliders);
            }
        }

        Ok(Self {
            tuning: tuning.clone(),
            spawn,
            chassis,
            cabin,
            cabin_offset,
            wheels,
            engine_force: 0.0,
            steer_angle: 0.0,
            brake_force: 0.0,
            drifting: false,
        })
    }

    pub fn drive(
        &mut self,
        world: &mut PhysicsWorld,
        input: NormalizedInput,
        dt: f32,
        log: &mut DebugLog,
    ) {
        self.enforce_validity(world, log);

        let tuning = &self.tuning;
        self.engine_force = move_towards(
            self.engine_force,
            input.throttle * tuning.max_engine_force,
            tuning.engine_response * dt,
        );
        self.steer_angle = move_towards(
            self.steer_angle,
            input.steering * tuning.max_steer_angle,
            tuning.steer_response * dt,
        );
        self.brake_force = move_towards(
            self.brake_force,
            input.brake * tuning.max_brake_force,
            tuning.brake_response * dt,
        );

        let Some(chassis) = world.bodies.get(self.chassis) else {
            return;
        };
        let rotation = to_bevy_quat(chassis.rotation());
        let forward = rotation * Vec3::Z;
        let lateral_axis = rotation * Vec3::X;
        let velocity = to_bevy_vec3(chassis.linvel());
        let chassis_mass = chassis.mass();
        let forward_speed = velocity.dot(forward);
        let lateral_speed = velocity.dot(lateral_axis);

        let engine_impulse = forward * self.engine_force * dt;
        let steer_effect = (forward_speed / STEER_FULL_EFFECT_SPEED_MPS).clamp(-1.0, 1.0);
        let steer_impulse =
            -lateral_axis * self.steer_angle * tuning.steer_force * steer_effect * dt;
        let braking = self.brake_force > 0.0;

        for wheel in &self.wheels {
            let Some(body) = world.bodies.get_mut(wheel.handle) else {
                continue;
            };

            if wheel.front {
                body.apply_impulse(to_rapier_vector(steer_impulse), true);
            } else {
                body.apply_impulse(to_rapier_vector(engine_impulse), true);
            }

            if braking {
                let linvel = *body.linvel() * BRAKE_WHEEL_LINEAR_RETAIN;
                let angvel = *body.angvel() * BRAKE_WHEEL_ANGULAR_RETAIN;
                body.set_linvel(linvel, true);
                body.set_angvel(angvel, true);
            }
        }

        let Some(chassis) = world.bodies.get_mut(self.chassis) else {
            return;
        };

        if braking {
            // Capped at the chassis mass so the counter-impulse can stop but never reverse it.
            let brake_scale = (self.brake_force * dt).min(chassis_mass);
            chassis.apply_impulse(to_rapier_vector(-velocity * brake_scale), true);
        }

        // Slip left after braking; the impulse may cancel it but never flip it.
        let remaining_slip = to_bevy_vec3(chassis.linvel()).dot(lateral_axis);
        let traction_limit = tuning.max_traction.min(remaining_slip.abs() * chassis_mass);
        let traction_scale = (dt * TRACTION_BASELINE_TICKS_PER_SECOND).min(1.0);
        let traction =
            (remaining_slip * chassis_mass * tuning.traction_coefficient * traction_scale)
                .clamp(-traction_limit, traction_limit);
        chassis.apply_impulse(to_rapier_vector(-lateral_axis * traction), true);

        let drifting = lateral_speed.abs() > tuning.drift_threshold;
        if drifting != self.drifting {
            self.drifting = drifting;
            if drifting {
                log.success("Drift started", format!("lateral {lateral_speed:.2} m/s"));
            } else {
                log.success("Drift ended", "");
            }
        }
    }

    /// Resets the whole rig to the spawn layout when the chassis state is non-finite or
    /// outside the safety box. Returns whether a reset happened.
    pub fn enforce_validity(&mut self, world: &mut PhysicsWorld, log: &mut DebugLog) -> bool {
        let Some(chassis) = world.bodies.get(self.chassis) else {
            return false;
        };

        let position = to_bevy_vec3(chassis.translation());
        let finite = position.is_finite()
            && to_bevy_vec3(chassis.linvel()).is_finite()
            && to_bevy_vec3(chassis.angvel()).is_finite()
            && to_bevy_quat(chassis.rotation()).is_finite();
        let half_extent = self.tuning.guard_half_extent;
        let in_bounds = position.y >= self.tuning.guard_floor_y
            && position.x.abs() <= half_extent
            && position.z.abs() <= half_extent;

        if finite && in_bounds {
            return false;
        }

        self.reset(world, self.spawn);
        log.warning(
            "Vehicle physics reset",
            format!("chassis left the safe volume at {position}"),
        );
        true
    }

    pub fn reset(&mut self, world: &mut PhysicsWorld, spawn: Vec3) {
        self.spawn = spawn;
        let layout = std::iter::once((self.chassis, Vec3::ZERO))
            .chain(std::iter::once((self.cabin, self.cabin_offset)))
            .chain(self.wheels.iter().map(|wheel| (wheel.handle, wheel.offset)));

        for (handle, offset) in layout {
            let Some(body) = world.bodies.get_mut(handle) else {
                continue;
            };
            body.set_translation(to_rapier_vector(spawn + offset), true);
            body.set_rotation(UnitQuaternion::identity(), true);
            body.set_linvel(vector![0.0, 0.0, 0.0], true);
            body.set_angvel(vector![0.0, 0.0, 0.0], true);
        }

        self.engine_force = 0.0;
        self.steer_angle = 0.0;
        self.brake_force = 0.0;
        self.drifting = false;
    }

    pub fn pose(&self, world: &PhysicsWorld) -> Option<(Vec3, Quat)> {
        Some((
            world.body_translation(self.chassis)?,
            world.body_rotation(self.chassis)?,
        ))
    }

    pub fn wheel_poses(&self, world: &PhysicsWorld) -> Vec<(Vec3, Quat)> {
        self.wheels
            .iter()
            .filter_map(|wheel| {
                Some((
                    world.body_translation(wheel.handle)?,
                    world.body_rotation(wheel.handle)?,
                ))
            })
            .collect()
    }

    pub fn velocity(&self, world: &PhysicsWorld) -> Vec3 {
        world
            .bodies
            .get(self.chassis)
            .map(|body| to_bevy_vec3(body.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    pub fn speed_kmh(&self, world: &PhysicsWorld) -> f32 {
        self.velocity(world).length() * KMH_PER_MPS
    }

    pub fn scale_velocity(&self, world: &mut PhysicsWorld, factor: f32) {
        for handle in self.body_handles() {
            if let Some(body) = world.bodies.get_mut(handle) {
                let linvel = *body.linvel() * factor;
                body.set_linvel(linvel, true);
            }
        }
    }

    pub fn translate(&self, world: &mut PhysicsWorld, offset: Vec3) {
        for handle in self.body_handles() {
            if let Some(body) = world.bodies.get_mut(handle) {
                let translation = *body.translation() + to_rapier_vector(offset);
                body.set_translation(translation, true);
            }
        }
    }

    fn body_handles(&self) -> impl Iterator<Item = RigidBodyHandle> + '_ {
        [self.chassis, self.cabin]
            .into_iter()
            .chain(self.wheels.iter().map(|wheel| wheel.handle))
    }

    pub fn is_drifting(&self) -> bool {
        self.drifting
    }

    pub fn engine_force(&self) -> f32 {
        self.engine_force
    }

    pub fn steer_angle(&self) -> f32 {
        self.steer_angle
    }

    pub fn brake_force(&self) -> f32 {
        self.brake_force
    }

    pub fn chassis_handle(&self) -> RigidBodyHandle {
        self.chassis
    }

    pub fn chassis_half_extents(&self) -> Vec3 {
        Vec3::from_array(self.tuning.chassis_half_extents)
    }

    pub fn wheel_radius(&self) -> f32 {
        self.tuning.wheel_radius
    }
}

fn validate_tuning(tuning: &RigidVehicleConfig, spawn: Vec3) -> Result<(), VehicleBuildError> {
    if !spawn.is_finite() {
        return Err(VehicleBuildError::NonFinite {
            parameter: "spawn_position",
        });
    }
    if tuning.wheel_offsets.len() != WHEEL_COUNT {
        return Err(VehicleBuildError::WheelCount(tuning.wheel_offsets.len()));
    }

    let positive = [
        ("chassis_mass", tuning.chassis_mass),
        ("cabin_mass", tuning.cabin_mass),
        ("wheel_mass", tuning.wheel_mass),
        ("wheel_radius", tuning.wheel_radius),
        ("wheel_width", tuning.wheel_width),
        ("chassis_half_extents.x", tuning.chassis_half_extents[0]),
        ("chassis_half_extents.y", tuning.chassis_half_extents[1]),
        ("chassis_half_extents.z", tuning.chassis_half_extents[2]),
        ("cabin_half_extents.x", tuning.cabin_half_extents[0]),
        ("cabin_half_extents.y", tuning.cabin_half_extents[1]),
        ("cabin_half_extents.z", tuning.cabin_half_extents[2]),
        ("suspension_rest_length", tuning.suspension_rest_length),
        ("guard_half_extent", tuning.guard_half_extent),
    ];
    for (parameter, value) in positive {
        if !value.is_finite() {
            return Err(VehicleBuildError::NonFinite { parameter });
        }
        if value <= 0.0 {
            return Err(VehicleBuildError::NonPositive { parameter, value });
        }
    }

    Ok(())
}

fn to_point(value: Vec3) -> Point<Real> {
    point![value.x, value.y, value.z]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    const DT: f32 = 1.0 / 60.0;

    fn rig() -> (PhysicsWorld, RigidVehicle, DebugLog) {
        let config = test_config();
        let mut world = PhysicsWorld::new(&config.game.physics, &[]);
        let vehicle = RigidVehicle::build(&mut world, &config.game.rigid, config.spawn_position())
            .expect("test tuning builds");
        (world, vehicle, DebugLog::default())
    }

    fn tick(
        world: &mut PhysicsWorld,
        vehicle: &mut RigidVehicle,
        input: NormalizedInput,
        log: &mut DebugLog,
    ) {
        vehicle.drive(world, input, DT, log);
        world.step(DT);
        vehicle.enforce_validity(world, log);
    }

    fn set_chassis_translation(world: &mut PhysicsWorld, vehicle: &RigidVehicle, value: Vec3) {
        let body = world
            .bodies
            .get_mut(vehicle.chassis_handle())
            .expect("chassis exists");
        body.set_translation(to_rapier_vector(value), true);
    }

    fn assert_finite_and_in_bounds(world: &PhysicsWorld, vehicle: &RigidVehicle) {
        let (position, rotation) = vehicle.pose(world).expect("chassis exists");
        let velocity = vehicle.velocity(world);
        assert!(position.is_finite() && rotation.is_finite() && velocity.is_finite());
        assert!(position.y >= vehicle.tuning.guard_floor_y);
        assert!(position.x.abs() <= vehicle.tuning.guard_half_extent);
        assert!(position.z.abs() <= vehicle.tuning.guard_half_extent);
    }

    #[test]
    fn build_creates_chassis_cabin_and_four_wheels() {
        let (world, vehicle, _) = rig();

        assert_eq!(world.bodies.len(), 6);
        assert_eq!(vehicle.wheels.len(), WHEEL_COUNT);
        assert_eq!(vehicle.wheels.iter().filter(|wheel| wheel.front).count(), 2);
        // fixed cabin joint plus a spherical and a spring joint per wheel
        assert_eq!(world.impulse_joints.len(), 1 + 2 * WHEEL_COUNT);
        let (position, _) = vehicle.pose(&world).expect("chassis exists");
        assert_eq!(position, test_config().spawn_position());
    }

    #[test]
    fn build_rejects_bad_tuning() {
        let config = test_config();
        let mut world = PhysicsWorld::new(&config.game.physics, &[]);

        let mut tuning = config.game.rigid.clone();
        tuning.wheel_offsets.pop();
        assert_eq!(
            RigidVehicle::build(&mut world, &tuning, Vec3::ZERO).err(),
            Some(VehicleBuildError::WheelCount(3))
        );

        let mut tuning = config.game.rigid.clone();
        tuning.chassis_mass = 0.0;
        assert!(matches!(
            RigidVehicle::build(&mut world, &tuning, Vec3::ZERO),
            Err(VehicleBuildError::NonPositive {
                parameter: "chassis_mass",
                ..
            })
        ));

        assert!(matches!(
            RigidVehicle::build(&mut world, &config.game.rigid, Vec3::splat(f32::NAN)),
            Err(VehicleBuildError::NonFinite { .. })
        ));
        assert_eq!(world.bodies.len(), 0);
    }

    #[test]
    fn non_finite_chassis_is_recovered_within_one_tick() {
        let (mut world, mut vehicle, mut log) = rig();
        set_chassis_translation(&mut world, &vehicle, Vec3::new(f32::NAN, 1.0, f32::INFINITY));

        tick(&mut world, &mut vehicle, NormalizedInput::default(), &mut log);

        assert_finite_and_in_bounds(&world, &vehicle);
        assert!(log
            .recent(4)
            .any(|entry| entry.name == "Vehicle physics reset"));
    }

    #[test]
    fn escaped_chassis_is_reset_to_spawn_at_rest() {
        let (mut world, mut vehicle, mut log) = rig();
        set_chassis_translation(&mut world, &vehicle, Vec3::new(500.0, 1.0, 0.0));

        assert!(vehicle.enforce_validity(&mut world, &mut log));

        let (position, rotation) = vehicle.pose(&world).expect("chassis exists");
        assert_eq!(position, test_config().spawn_position());
        assert!(rotation.angle_between(Quat::IDENTITY) < 1e-6);
        assert_eq!(vehicle.velocity(&world), Vec3::ZERO);
        assert!(!vehicle.enforce_validity(&mut world, &mut log));
    }

    #[test]
    fn throttle_drives_the_car_forward_along_positive_z() {
        let (mut world, mut vehicle, mut log) = rig();
        let start = vehicle.pose(&world).expect("chassis exists").0;
        let throttle = NormalizedInput {
            throttle: 1.0,
            ..default()
        };

        for _ in 0..180 {
            tick(&mut world, &mut vehicle, throttle, &mut log);
        }

        let end = vehicle.pose(&world).expect("chassis exists").0;
        assert!(end.z > start.z + 1.0, "moved from {start} to {end}");
        assert_finite_and_in_bounds(&world, &vehicle);
    }

    #[test]
    fn controls_ramp_toward_targets_at_bounded_rates() {
        let (mut world, mut vehicle, mut log) = rig();
        let full = NormalizedInput {
            throttle: 1.0,
            steering: 1.0,
            brake: 1.0,
        };

        vehicle.drive(&mut world, full, DT, &mut log);

        let tuning = &vehicle.tuning;
        assert!((vehicle.engine_force() - tuning.engine_response * DT).abs() < 1e-3);
        assert!((vehicle.steer_angle() - tuning.steer_response * DT).abs() < 1e-5);
        assert!((vehicle.brake_force() - tuning.brake_response * DT).abs() < 1e-3);
    }

    #[test]
    fn drift_flag_follows_lateral_speed_with_logged_transitions() {
        let (mut world, mut vehicle, mut log) = rig();
        let chassis = vehicle.chassis_handle();
        let set_linvel = move |world: &mut PhysicsWorld, velocity: Vec3| {
            let body = world.bodies.get_mut(chassis).expect("chassis exists");
            body.set_linvel(to_rapier_vector(velocity), true);
        };

        set_linvel(&mut world, Vec3::new(6.0, 0.0, 0.0));
        vehicle.drive(&mut world, NormalizedInput::default(), DT, &mut log);
        assert!(vehicle.is_drifting());

        set_linvel(&mut world, Vec3::new(0.5, 0.0, 4.0));
        vehicle.drive(&mut world, NormalizedInput::default(), DT, &mut log);
        assert!(!vehicle.is_drifting());

        let transitions: Vec<_> = log
            .recent(10)
            .filter(|entry| entry.name.starts_with("Drift"))
            .map(|entry| entry.name.clone())
            .collect();
        assert_eq!(transitions, vec!["Drift started", "Drift ended"]);
    }

    #[test]
    fn traction_opposes_sideways_slip() {
        let (mut world, mut vehicle, mut log) = rig();
        let body = world
            .bodies
            .get_mut(vehicle.chassis_handle())
            .expect("chassis exists");
        body.set_linvel(vector![2.0, 0.0, 0.0], true);

        vehicle.drive(&mut world, NormalizedInput::default(), DT, &mut log);

        assert!(vehicle.velocity(&world).x < 2.0);
        assert!(vehicle.velocity(&world).x > 0.0);
    }

    #[test]
    fn brake_never_reverses_the_chassis() {
        let (mut world, mut vehicle, mut log) = rig();
        vehicle.brake_force = vehicle.tuning.max_brake_force * 1_000.0;
        let body = world
            .bodies
            .get_mut(vehicle.chassis_handle())
            .expect("chassis exists");
        body.set_linvel(vector![0.0, 0.0, 3.0], true);

        let braking = NormalizedInput {
            brake: 1.0,
            ..default()
        };
        vehicle.drive(&mut world, braking, 1.0, &mut log);

        assert!(vehicle.velocity(&world).z >= -1e-4);
    }

    #[test]
    fn long_braking_frame_never_flips_sideways_slip() {
        let (mut world, mut vehicle, mut log) = rig();
        vehicle.brake_force = vehicle.tuning.max_brake_force * 1_000.0;
        let body = world
            .bodies
            .get_mut(vehicle.chassis_handle())
            .expect("chassis exists");
        body.set_linvel(vector![2.0, 0.0, 1.0], true);

        let braking = NormalizedInput {
            brake: 1.0,
            ..default()
        };
        vehicle.drive(&mut world, braking, 0.25, &mut log);

        let velocity = vehicle.velocity(&world);
        assert!(velocity.x >= -1e-4 && velocity.x <= 2.0, "lateral {}", velocity.x);
        assert!(velocity.z >= -1e-4);
    }

    #[test]
    fn traction_alone_cannot_push_past_zero_slip() {
        let (mut world, mut vehicle, mut log) = rig();
        vehicle.tuning.traction_coefficient = 5.0;
        vehicle.tuning.max_traction = f32::MAX;
        let body = world
            .bodies
            .get_mut(vehicle.chassis_handle())
            .expect("chassis exists");
        body.set_linvel(vector![2.0, 0.0, 0.0], true);

        vehicle.drive(&mut world, NormalizedInput::default(), 0.25, &mut log);

        assert!(vehicle.velocity(&world).x >= -1e-4);
    }

    #[test]
    fn slowing_scales_every_rig_body() {
        let (mut world, vehicle, _) = rig();
        let handles: Vec<_> = vehicle.body_handles().collect();
        for handle in &handles {
            let body = world.bodies.get_mut(*handle).expect("rig body exists");
            body.set_linvel(vector![0.0, 0.0, 4.0], true);
        }

        vehicle.scale_velocity(&mut world, 0.5);

        for handle in &handles {
            let body = world.bodies.get(*handle).expect("rig body exists");
            assert!((to_bevy_vec3(body.linvel()).z - 2.0).abs() < 1e-5);
        }
        assert_eq!(handles.len(), 2 + WHEEL_COUNT);
    }
}
