use crate::config::{ConfigReloaded, GameConfig, InteractionConfig, WorldFile};
use crate::debug::DebugLog;
use crate::gameplay::physics::PhysicsWorld;
use crate::gameplay::vehicle::VehicleController;
use crate::gameplay::{tick_seconds, TickSystems};
use crate::states::GameState;
use bevy::prelude::*;

const GROUND_SIZE_M: f32 = 100.0;
const COLLECTIBLE_RADIUS_M: f32 = 0.5;
const COLLECTIBLE_THICKNESS_M: f32 = 0.2;
const COLLECTED_MIN_SCALE: f32 = 0.1;
const GROUND_COLOR: Color = Color::srgb(0.24, 0.42, 0.22);
const COLLECTIBLE_COLOR: Color = Color::srgb(1.0, 0.84, 0.0);
const OBSTACLE_COLOR: Color = Color::srgb(0.55, 0.27, 0.07);
const OBSTACLE_FLASH_COLOR: Color = Color::srgb(1.0, 0.45, 0.45);
const RAMP_COLOR: Color = Color::srgb(0.5, 0.5, 0.55);
const BOUNDARY_COLOR: Color = Color::srgb(0.8, 0.1, 0.1);

pub struct WorldInteractionPlugin;

impl Plugin for WorldInteractionPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<CollectibleCollected>()
            .add_systems(OnEnter(GameState::InRun), spawn_world_scene)
            .add_systems(
                Update,
                respawn_world_scene_on_reload.run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                Update,
                apply_world_interaction
                    .in_set(TickSystems::Interaction)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<InteractiveWorld>)
                    .run_if(resource_exists::<VehicleController>),
            )
            .add_systems(
                Update,
                (sync_collectible_visuals, sync_obstacle_visuals)
                    .in_set(TickSystems::Sync)
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<InteractiveWorld>),
            );
    }
}

#[derive(Message, Debug, Clone)]
pub struct CollectibleCollected {
    pub id: String,
    pub score: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InteractionOutcome {
    pub score_delta: u32,
    /// Product of every slow-down hit this tick; 1.0 when nothing was touched.
    pub speed_factor: f32,
    pub push: Vec3,
    pub collected: Vec<String>,
    pub obstacle_hits: Vec<String>,
    pub boundary_hits: Vec<String>,
    pub new_contacts: Vec<String>,
}

impl Default for InteractionOutcome {
    fn default() -> Self {
        Self {
            score_delta: 0,
            speed_factor: 1.0,
            push: Vec3::ZERO,
            collected: Vec::new(),
            obstacle_hits: Vec::new(),
            boundary_hits: Vec::new(),
            new_contacts: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CollectibleState {
    pub id: String,
    pub position: Vec3,
    pub spin: f32,
    collected: bool,
    fade_remaining_s: f32,
    removed: bool,
}

impl CollectibleState {
    pub fn is_collected(&self) -> bool {
        self.collected
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }
}

#[derive(Debug, Clone)]
pub struct ObstacleState {
    pub id: String,
    pub position: Vec3,
    flash_remaining_s: f32,
    in_contact: bool,
}

impl ObstacleState {
    pub fn is_flashing(&self) -> bool {
        self.flash_remaining_s > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct BoundaryState {
    pub id: String,
    pub position: Vec3,
    in_contact: bool,
}

#[derive(Resource, Debug, Clone)]
pub struct InteractiveWorld {
    tuning: InteractionConfig,
    collectibles: Vec<CollectibleState>,
    obstacles: Vec<ObstacleState>,
    boundaries: Vec<BoundaryState>,
    score: u32,
}

impl InteractiveWorld {
    pub fn new(tuning: &InteractionConfig, layout: &WorldFile) -> Self {
        Self {
            tuning: tuning.clone(),
            collectibles: layout
                .collectibles
                .iter()
                .map(|row| CollectibleState {
                    id: row.id.clone(),
                    position: Vec3::new(row.x, tuning.collectible_base_y, row.z),
                    spin: 0.0,
                    collected: false,
                    fade_remaining_s: 0.0,
                    removed: false,
                })
                .collect(),
            obstacles: layout
                .obstacles
                .iter()
                .map(|row| ObstacleState {
                    id: row.id.clone(),
                    position: Vec3::new(row.x, row.size[1] * 0.5, row.z),
                    flash_remaining_s: 0.0,
                    in_contact: false,
                })
                .collect(),
            boundaries: layout
                .boundaries
                .iter()
                .map(|row| BoundaryState {
                    id: row.id.clone(),
                    position: row.center(),
                    in_contact: false,
                })
                .collect(),
            score: 0,
        }
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn collectibles(&self) -> &[CollectibleState] {
        &self.collectibles
    }

    pub fn obstacles(&self) -> &[ObstacleState] {
        &self.obstacles
    }

    pub fn boundaries(&self) -> &[BoundaryState] {
        &self.boundaries
    }

    pub fn remaining_collectibles(&self) -> usize {
        self.collectibles.iter().filter(|c| !c.collected).count()
    }

    pub fn collect(&mut self, index: usize) -> bool {
        let Some(collectible) = self.collectibles.get_mut(index) else {
            return false;
        };
        if collectible.collected {
            return false;
        }

        collectible.collected = true;
        collectible.fade_remaining_s = self.tuning.collect_fade_seconds;
        self.score += self.tuning.collect_score;
        true
    }

    pub fn interact(&mut self, car_position: Vec3) -> InteractionOutcome {
        let mut outcome = InteractionOutcome::default();

        for index in 0..self.collectibles.len() {
            let collectible = &self.collectibles[index];
            if collectible.collected
                || collectible.position.distance(car_position) >= self.tuning.collect_radius
            {
                continue;
            }
            let id = collectible.id.clone();
            if self.collect(index) {
                outcome.score_delta += self.tuning.collect_score;
                outcome.collected.push(id);
            }
        }

        for obstacle in &mut self.obstacles {
            let touching = obstacle.position.distance(car_position) < self.tuning.obstacle_radius;
            if touching {
                outcome.speed_factor *= self.tuning.obstacle_speed_factor;
                obstacle.flash_remaining_s = self.tuning.obstacle_flash_seconds;
                outcome.obstacle_hits.push(obstacle.id.clone());
                if !obstacle.in_contact {
                    outcome.new_contacts.push(obstacle.id.clone());
                }
            }
            obstacle.in_contact = touching;
        }

        // Pushes accumulate on a local copy so later walls see the corrected position.
        let mut position = car_position;
        for boundary in &mut self.boundaries {
            let touching = boundary.position.distance(position) < self.tuning.boundary_radius;
            if touching {
                // Horizontal only; a vertical component would press the car into the ground.
                let toward_origin = Vec3::new(-position.x, 0.0, -position.z).normalize_or_zero();
                let step = toward_origin * self.tuning.boundary_push;
                position += step;
                outcome.push += step;
                outcome.speed_factor *= self.tuning.boundary_speed_factor;
                outcome.boundary_hits.push(boundary.id.clone());
                if !boundary.in_contact {
                    outcome.new_contacts.push(boundary.id.clone());
                }
            }
            boundary.in_contact = touching;
        }

        outcome
    }

    pub fn advance_timers(&mut self, dt: f32) {
        for collectible in &mut self.collectibles {
            if !collectible.collected || collectible.removed {
                continue;
            }
            collectible.fade_remaining_s -= dt;
            if collectible.fade_remaining_s <= 0.0 {
                collectible.fade_remaining_s = 0.0;
                collectible.removed = true;
            }
        }

        for obstacle in &mut self.obstacles {
            obstacle.flash_remaining_s = (obstacle.flash_remaining_s - dt).max(0.0);
        }
    }

    pub fn animate(&mut self, elapsed_s: f32) {
        let tuning = &self.tuning;
        for collectible in self.collectibles.iter_mut().filter(|c| !c.collected) {
            collectible.spin += tuning.collectible_spin_per_tick;
            collectible.position.y = tuning.collectible_base_y
                + (elapsed_s * tuning.collectible_bob_frequency).sin()
                    * tuning.collectible_bob_amplitude;
        }
    }

    pub fn fade_progress(&self, index: usize) -> f32 {
        let Some(collectible) = self.collectibles.get(index) else {
            return 0.0;
        };
        if !collectible.collected {
            return 0.0;
        }
        if self.tuning.collect_fade_seconds <= 0.0 {
            return 1.0;
        }
        1.0 - (collectible.fade_remaining_s / self.tuning.collect_fade_seconds).clamp(0.0, 1.0)
    }
}

#[derive(Component)]
pub struct WorldSceneEntity;

#[derive(Component, Debug, Clone, Copy)]
struct CollectibleVisual {
    index: usize,
}

#[derive(Component, Debug, Clone, Copy)]
struct ObstacleVisual {
    index: usize,
}

#[derive(Component)]
pub struct RampVisual;

#[derive(Component)]
pub struct BoundaryVisual;

fn spawn_world_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    existing: Option<Res<InteractiveWorld>>,
    mut log: ResMut<DebugLog>,
) {
    if existing.is_some() {
        return;
    }

    build_world_scene(&mut commands, &mut meshes, &mut materials, &config, &mut log);
}

fn respawn_world_scene_on_reload(
    mut commands: Commands,
    mut reloaded: MessageReader<ConfigReloaded>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<GameConfig>,
    existing: Option<Res<InteractiveWorld>>,
    scene_query: Query<Entity, With<WorldSceneEntity>>,
    mut log: ResMut<DebugLog>,
) {
    if reloaded.read().count() == 0 || existing.is_none() {
        return;
    }

    for entity in &scene_query {
        commands.entity(entity).try_despawn();
    }
    build_world_scene(&mut commands, &mut meshes, &mut materials, &config, &mut log);
}

fn build_world_scene(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    config: &GameConfig,
    log: &mut DebugLog,
) {
    let world = InteractiveWorld::new(&config.game.interaction, &config.world);

    commands.spawn((
        Name::new("Ground"),
        WorldSceneEntity,
        Mesh3d(meshes.add(Plane3d::default().mesh().size(GROUND_SIZE_M, GROUND_SIZE_M))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: GROUND_COLOR,
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::default(),
    ));

    let coin_mesh = meshes.add(Cylinder::new(COLLECTIBLE_RADIUS_M, COLLECTIBLE_THICKNESS_M));
    for (index, collectible) in world.collectibles().iter().enumerate() {
        let material = materials.add(StandardMaterial {
            base_color: COLLECTIBLE_COLOR,
            emissive: LinearRgba::rgb(0.4, 0.3, 0.0),
            alpha_mode: AlphaMode::Blend,
            ..default()
        });
        commands.spawn((
            Name::new(format!("Collectible {}", collectible.id)),
            WorldSceneEntity,
            CollectibleVisual { index },
            Mesh3d(coin_mesh.clone()),
            MeshMaterial3d(material),
            Transform::from_translation(collectible.position)
                .with_rotation(Quat::from_rotation_x(std::f32::consts::FRAC_PI_2)),
        ));
    }

    for (index, (obstacle, row)) in world
        .obstacles()
        .iter()
        .zip(&config.world.obstacles)
        .enumerate()
    {
        let material = materials.add(StandardMaterial {
            base_color: OBSTACLE_COLOR,
            ..default()
        });
        commands.spawn((
            Name::new(format!("Obstacle {}", obstacle.id)),
            WorldSceneEntity,
            ObstacleVisual { index },
            Mesh3d(meshes.add(Cuboid::from_size(Vec3::from_array(row.size)))),
            MeshMaterial3d(material),
            Transform::from_translation(obstacle.position),
        ));
    }

    let ramp_material = materials.add(StandardMaterial {
        base_color: RAMP_COLOR,
        ..default()
    });
    for ramp in &config.world.ramps {
        commands.spawn((
            Name::new(format!("Ramp {}", ramp.id)),
            WorldSceneEntity,
            RampVisual,
            Mesh3d(meshes.add(Cuboid::from_size(Vec3::from_array(ramp.size)))),
            MeshMaterial3d(ramp_material.clone()),
            Transform::from_translation(ramp.center()).with_rotation(ramp.rotation()),
        ));
    }

    let boundary_material = materials.add(StandardMaterial {
        base_color: BOUNDARY_COLOR,
        ..default()
    });
    for boundary in &config.world.boundaries {
        commands.spawn((
            Name::new(format!("Boundary {}", boundary.id)),
            WorldSceneEntity,
            BoundaryVisual,
            Mesh3d(meshes.add(Cuboid::from_size(Vec3::from_array(boundary.size)))),
            MeshMaterial3d(boundary_material.clone()),
            Transform::from_translation(boundary.center()),
        ));
    }

    log.success(
        "World created",
        format!(
            "{} collectibles, {} obstacles, {} ramps, {} boundaries",
            config.world.collectibles.len(),
            config.world.obstacles.len(),
            config.world.ramps.len(),
            config.world.boundaries.len()
        ),
    );
    commands.insert_resource(world);
}

fn apply_world_interaction(
    time: Res<Time>,
    mut world: ResMut<InteractiveWorld>,
    mut controller: ResMut<VehicleController>,
    mut physics: ResMut<PhysicsWorld>,
    mut log: ResMut<DebugLog>,
    mut collected_writer: MessageWriter<CollectibleCollected>,
) {
    if let Some(car_position) = controller.position(&physics) {
        let outcome = world.interact(car_position);
        controller.apply_interaction(&mut physics, &outcome);

        for id in &outcome.collected {
            log.success(
                "Collectible collected",
                format!("{id}: score {} ({} left)", world.score(), world.remaining_collectibles()),
            );
            collected_writer.write(CollectibleCollected {
                id: id.clone(),
                score: world.score(),
            });
        }
        for id in &outcome.new_contacts {
            if outcome.boundary_hits.contains(id) {
                log.warning("Boundary hit", id.clone());
            } else {
                log.warning("Obstacle hit", id.clone());
            }
        }
    }

    world.advance_timers(tick_seconds(&time));
    world.animate(time.elapsed_secs());
}

fn sync_collectible_visuals(
    mut commands: Commands,
    world: Res<InteractiveWorld>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut visual_query: Query<(
        Entity,
        &CollectibleVisual,
        &mut Transform,
        &MeshMaterial3d<StandardMaterial>,
    )>,
) {
    for (entity, visual, mut transform, material_handle) in &mut visual_query {
        let Some(collectible) = world.collectibles().get(visual.index) else {
            continue;
        };

        if collectible.is_removed() {
            commands.entity(entity).try_despawn();
            continue;
        }

        transform.translation = collectible.position;
        transform.rotation = Quat::from_rotation_y(collectible.spin)
            * Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);

        if collectible.is_collected() {
            let progress = world.fade_progress(visual.index);
            transform.scale = Vec3::splat(1.0 + (COLLECTED_MIN_SCALE - 1.0) * progress);
            if let Some(material) = materials.get_mut(&material_handle.0) {
                material.base_color = COLLECTIBLE_COLOR.with_alpha(1.0 - progress);
            }
        }
    }
}

fn sync_obstacle_visuals(
    world: Res<InteractiveWorld>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    visual_query: Query<(&ObstacleVisual, &MeshMaterial3d<StandardMaterial>)>,
) {
    for (visual, material_handle) in &visual_query {
        let Some(obstacle) = world.obstacles().get(visual.index) else {
            continue;
        };
        let Some(material) = materials.get_mut(&material_handle.0) else {
            continue;
        };

        let color = if obstacle.is_flashing() {
            OBSTACLE_FLASH_COLOR
        } else {
            OBSTACLE_COLOR
        };
        if material.base_color != color {
            material.base_color = color;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn world() -> InteractiveWorld {
        let config = test_config();
        InteractiveWorld::new(&config.game.interaction, &config.world)
    }

    #[test]
    fn collecting_twice_scores_once() {
        let mut world = world();

        assert!(world.collect(0));
        assert!(!world.collect(0));
        assert_eq!(world.score(), 10);
    }

    #[test]
    fn reentering_a_collected_coin_never_rescores() {
        let mut world = world();
        let coin = world.collectibles()[0].position;

        let first = world.interact(coin);
        let second = world.interact(coin);

        assert_eq!(first.score_delta, 10);
        assert_eq!(first.collected, vec!["coin_a".to_string()]);
        assert_eq!(second.score_delta, 0);
        assert!(second.collected.is_empty());
        assert_eq!(world.score(), 10);
    }

    #[test]
    fn coin_is_removed_after_the_fade_delay() {
        let mut world = world();
        world.collect(0);

        for _ in 0..29 {
            world.advance_timers(1.0 / 60.0);
        }
        assert!(!world.collectibles()[0].is_removed());
        assert!(world.fade_progress(0) > 0.9);

        for _ in 0..2 {
            world.advance_timers(1.0 / 60.0);
        }
        assert!(world.collectibles()[0].is_removed());
    }

    #[test]
    fn obstacle_slows_every_tick_in_range() {
        let mut world = world();
        let obstacle = world.obstacles()[0].position;

        let first = world.interact(obstacle);
        let second = world.interact(obstacle);

        assert_eq!(first.speed_factor, 0.5);
        assert_eq!(second.speed_factor, 0.5);
        assert_eq!(first.new_contacts, vec!["barrier_a".to_string()]);
        assert!(second.new_contacts.is_empty());
        assert!(world.obstacles()[0].is_flashing());

        world.advance_timers(0.25);
        assert!(!world.obstacles()[0].is_flashing());
    }

    #[test]
    fn boundary_push_moves_the_car_toward_the_origin() {
        let mut world = world();
        let wall = world.boundaries()[0].position;
        let mut car = Vec3::new(wall.x + 0.5, 1.0, wall.z - 3.5);
        let outcome = world.interact(car);
        assert!(outcome.boundary_hits.is_empty(), "started outside the threshold");

        for _ in 0..5 {
            car.z += 0.3;
            let before = car.length();
            let outcome = world.interact(car);
            if outcome.boundary_hits.is_empty() {
                continue;
            }
            assert_eq!(outcome.push.y, 0.0);
            car += outcome.push;
            assert!(car.length() < before);
            assert!((outcome.speed_factor - 0.8).abs() < 1e-6);
            return;
        }
        panic!("car never reached the boundary");
    }

    #[test]
    fn idle_car_far_from_everything_is_untouched() {
        let mut world = world();
        let outcome = world.interact(Vec3::new(-40.0, 1.0, -40.0));
        assert_eq!(outcome, InteractionOutcome::default());
    }

    #[test]
    fn uncollected_coins_spin_and_bob() {
        let mut world = world();
        world.animate(0.5);

        let coin = &world.collectibles()[0];
        assert!((coin.spin - 0.05).abs() < 1e-6);
        let expected_y = 1.5 + (0.5_f32 * 3.0).sin() * 0.2;
        assert!((coin.position.y - expected_y).abs() < 1e-6);
    }
}
