use crate::config::KinematicConfig;
use crate::controls::NormalizedInput;
use bevy::prelude::*;

const REVERSE_SPEED_SCALE: f32 = 0.6;
const BRAKE_TARGET_ATTENUATION: f32 = 0.8;
const SPEED_SNAP_THRESHOLD: f32 = 0.01;
const MIN_STEERING_SPEED: f32 = 0.05;
const BASELINE_TICKS_PER_SECOND: f32 = 60.0;
const KMH_PER_SPEED_UNIT: f32 = 200.0;

/// Hand-rolled arcade integrator; `current_speed` is distance per tick along the heading.
#[derive(Debug, Clone)]
pub struct KinematicVehicle {
    tuning: KinematicConfig,
    position: Vec3,
    velocity: Vec3,
    current_speed: f32,
    rotation_y: f32,
    distance_travelled: f32,
}

impl KinematicVehicle {
    pub fn new(tuning: KinematicConfig, spawn: Vec3) -> Self {
        Self {
            tuning,
            position: spawn,
            velocity: Vec3::ZERO,
            current_speed: 0.0,
            rotation_y: 0.0,
            distance_travelled: 0.0,
        }
    }

    pub fn update(&mut self, input: NormalizedInput, dt: f32) {
        let frames = dt * BASELINE_TICKS_PER_SECOND;
        let max_speed = self.tuning.max_speed;

        let mut target_speed = if input.throttle >= 0.0 {
            input.throttle * max_speed
        } else {
            input.throttle * max_speed * REVERSE_SPEED_SCALE
        };
        target_speed *= 1.0 - input.brake * BRAKE_TARGET_ATTENUATION;

        if target_speed != 0.0 {
            self.current_speed +=
                (target_speed - self.current_speed) * self.tuning.acceleration * frames;
        } else {
            self.current_speed *= self.tuning.deceleration.powf(frames);
            if self.current_speed.abs() < SPEED_SNAP_THRESHOLD {
                self.current_speed = 0.0;
            }
        }

        // Moves along the heading held at the start of the tick, then turns.
        self.velocity = self.forward() * self.current_speed;
        self.position += self.velocity;
        self.distance_travelled += self.current_speed;

        if self.current_speed.abs() > MIN_STEERING_SPEED {
            // Ratio never exceeds 1, so turn authority only grows with speed.
            let speed_ratio = (self.current_speed.abs() / max_speed).min(1.0);
            let turn_rate = self.tuning.turn_speed * speed_ratio * input.steering;
            self.rotation_y -= turn_rate * frames;
        }
    }

    pub fn forward(&self) -> Vec3 {
        Vec3::new(self.rotation_y.sin(), 0.0, self.rotation_y.cos())
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(self.rotation_y)
    }

    pub fn rotation_y(&self) -> f32 {
        self.rotation_y
    }

    pub fn current_speed(&self) -> f32 {
        self.current_speed
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn distance_travelled(&self) -> f32 {
        self.distance_travelled
    }

    pub fn speed_kmh(&self) -> f32 {
        self.current_speed.abs() * KMH_PER_SPEED_UNIT
    }

    pub fn scale_speed(&mut self, factor: f32) {
        self.current_speed *= factor;
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.position += offset;
    }

    pub fn reset(&mut self, spawn: Vec3) {
        self.position = spawn;
        self.velocity = Vec3::ZERO;
        self.current_speed = 0.0;
        self.rotation_y = 0.0;
        self.distance_travelled = 0.0;
    }
}
