use crate::config::{PhysicsConfig, RampConfig};
use bevy::prelude::*;
use rapier3d::dynamics::{
    CCDSolver, CoefficientCombineRule, ImpulseJointSet, IntegrationParameters, IslandManager,
    MultibodyJointSet, RigidBodyBuilder, RigidBodyHandle, RigidBodySet,
};
use rapier3d::geometry::{BroadPhaseBvh, ColliderBuilder, ColliderSet, NarrowPhase};
use rapier3d::math::{Real, Vector};
use rapier3d::na::{vector, Isometry3, Quaternion, Translation3, UnitQuaternion};
use rapier3d::pipeline::PhysicsPipeline;

#[derive(Resource)]
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub pipeline: PhysicsPipeline,
    pub islands: IslandManager,
    pub broad_phase: BroadPhaseBvh,
    pub narrow_phase: NarrowPhase,
    pub bodies: RigidBodySet,
    pub colliders: ColliderSet,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd: CCDSolver,
    materials: PhysicsConfig,
    ramps: Vec<RampBody>,
}

#[derive(Debug, Clone)]
pub struct RampBody {
    pub id: String,
    pub handle: RigidBodyHandle,
    pub half_extents: Vec3,
}

impl PhysicsWorld {
    pub fn new(materials: &PhysicsConfig, ramps: &[RampConfig]) -> Self {
        let mut bodies = RigidBodySet::new();
        let mut colliders = ColliderSet::new();

        let ground = ColliderBuilder::halfspace(Vector::y_axis())
            .friction(1.0)
            .friction_combine_rule(CoefficientCombineRule::Multiply)
            .restitution(0.0)
            .restitution_combine_rule(CoefficientCombineRule::Max)
            .build();
        colliders.insert(ground);

        let ramps = ramps
            .iter()
            .map(|ramp| {
                let half_extents = Vec3::from_array(ramp.size) * 0.5;
                let body = RigidBodyBuilder::fixed()
                    .pose(to_rapier_isometry(ramp.center(), ramp.rotation()))
                    .build();
                let handle = bodies.insert(body);
                let collider =
                    ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
                        .friction(1.0)
                        .friction_combine_rule(CoefficientCombineRule::Multiply)
                        .build();
                colliders.insert_with_parent(collider, handle, &mut bodies);

                RampBody {
                    id: ramp.id.clone(),
                    handle,
                    half_extents,
                }
            })
            .collect();

        Self {
            gravity: vector![0.0, materials.gravity, 0.0],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhaseBvh::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            materials: materials.clone(),
            ramps,
        }
    }

    pub fn materials(&self) -> &PhysicsConfig {
        &self.materials
    }

    pub fn ramps(&self) -> &[RampBody] {
        &self.ramps
    }

    /// One atomic advance; no sub-stepping. Non-positive or non-finite `dt` is ignored.
    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }

        self.integration_parameters.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            &(),
            &(),
        );
    }

    pub fn body_translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies
            .get(handle)
            .map(|body| to_bevy_vec3(body.translation()))
    }

    pub fn body_rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|body| to_bevy_quat(body.rotation()))
    }
}

pub fn to_rapier_vector(value: Vec3) -> Vector<Real> {
    vector![value.x, value.y, value.z]
}

pub fn to_bevy_vec3(value: &Vector<Real>) -> Vec3 {
    Vec3::new(value.x, value.y, value.z)
}

pub fn to_rapier_rotation(rotation: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::from_quaternion(Quaternion::new(
        rotation.w, rotation.x, rotation.y, rotation.z,
    ))
}

pub fn to_bevy_quat(rotation: &UnitQuaternion<Real>) -> Quat {
    let coords = rotation.coords;
    Quat::from_xyzw(coords.x, coords.y, coords.z, coords.w)
}

pub fn to_rapier_isometry(translation: Vec3, rotation: Quat) -> Isometry3<Real> {
    Isometry3::from_parts(
        Translation3::new(translation.x, translation.y, translation.z),
        to_rapier_rotation(rotation),
    )
}
