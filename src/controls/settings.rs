use super::NormalizedInput;
use crate::debug::DebugLog;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const SETTINGS_STORAGE_KEY: &str = "carrinho3d-controls";
const MIN_RESPONSE_TIME_S: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KeyboardSensitivity {
    pub throttle_sensitivity: f32,
    pub steering_sensitivity: f32,
    pub brake_sensitivity: f32,
}

impl Default for KeyboardSensitivity {
    fn default() -> Self {
        Self {
            throttle_sensitivity: 1.0,
            steering_sensitivity: 1.0,
            brake_sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TouchSensitivity {
    pub throttle_sensitivity: f32,
    pub steering_sensitivity: f32,
    pub brake_sensitivity: f32,
    pub joystick_sensitivity: f32,
}

impl Default for TouchSensitivity {
    fn default() -> Self {
        Self {
            throttle_sensitivity: 1.0,
            steering_sensitivity: 0.8,
            brake_sensitivity: 1.0,
            joystick_sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GamepadSensitivity {
    pub throttle_sensitivity: f32,
    pub steering_sensitivity: f32,
    pub brake_sensitivity: f32,
    pub dead_zone: f32,
    pub trigger_dead_zone: f32,
}

impl Default for GamepadSensitivity {
    fn default() -> Self {
        Self {
            throttle_sensitivity: 1.0,
            steering_sensitivity: 0.9,
            brake_sensitivity: 1.0,
            dead_zone: 0.1,
            trigger_dead_zone: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneralSettings {
    pub invert_steering: bool,
    pub smoothing: f32,
    pub response_time: f32,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            invert_steering: false,
            smoothing: 0.1,
            response_time: 0.2,
        }
    }
}

/// Every category falls back to its defaults when absent from a saved blob, and every
/// field inside a category does the same. Unknown categories are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensitivityProfile {
    pub keyboard: KeyboardSensitivity,
    pub touch: TouchSensitivity,
    pub gamepad: GamepadSensitivity,
    pub general: GeneralSettings,
}

impl SensitivityProfile {
    fn steering_sign(&self) -> f32 {
        if self.general.invert_steering {
            -1.0
        } else {
            1.0
        }
    }

    pub fn apply_keyboard_sensitivity(&self, raw: NormalizedInput) -> NormalizedInput {
        let settings = &self.keyboard;
        NormalizedInput {
            throttle: raw.throttle * settings.throttle_sensitivity,
            steering: raw.steering * settings.steering_sensitivity * self.steering_sign(),
            brake: raw.brake * settings.brake_sensitivity,
        }
    }

    pub fn apply_touch_sensitivity(&self, raw: NormalizedInput) -> NormalizedInput {
        let settings = &self.touch;
        NormalizedInput {
            throttle: raw.throttle * settings.throttle_sensitivity,
            steering: raw.steering * settings.steering_sensitivity * self.steering_sign(),
            brake: raw.brake * settings.brake_sensitivity,
        }
    }

    pub fn apply_gamepad_sensitivity(&self, raw: NormalizedInput) -> NormalizedInput {
        let settings = &self.gamepad;
        NormalizedInput {
            throttle: apply_dead_zone(raw.throttle, settings.trigger_dead_zone)
                * settings.throttle_sensitivity,
            steering: apply_dead_zone(raw.steering, settings.dead_zone)
                * settings.steering_sensitivity
                * self.steering_sign(),
            brake: apply_dead_zone(raw.brake, settings.trigger_dead_zone)
                * settings.brake_sensitivity,
        }
    }

    pub fn smooth_input(
        &self,
        current: NormalizedInput,
        target: NormalizedInput,
        dt: f32,
    ) -> NormalizedInput {
        let smooth_speed = 1.0 / self.general.response_time.max(MIN_RESPONSE_TIME_S);
        let factor = (smooth_speed * dt.max(0.0)).min(1.0);

        NormalizedInput {
            throttle: lerp(current.throttle, target.throttle, factor),
            steering: lerp(current.steering, target.steering, factor),
            brake: lerp(current.brake, target.brake, factor),
        }
    }
}

/// Zeroes `|value| < dead_zone` and rescales the remainder back onto the full range.
pub fn apply_dead_zone(value: f32, dead_zone: f32) -> f32 {
    if value.abs() < dead_zone || value == 0.0 {
        return 0.0;
    }

    let span = (1.0 - dead_zone).max(f32::EPSILON);
    value.signum() * (value.abs() - dead_zone) / span
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPreset {
    Casual,
    Sport,
    Precise,
}

impl ControlPreset {
    pub const ALL: [ControlPreset; 3] = [Self::Casual, Self::Sport, Self::Precise];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "casual" => Some(Self::Casual),
            "sport" => Some(Self::Sport),
            "precise" => Some(Self::Precise),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Casual => "casual",
            Self::Sport => "sport",
            Self::Precise => "precise",
        }
    }

    pub fn apply_to(self, profile: &mut SensitivityProfile) {
        // [throttle, steering, brake] per device, then [smoothing, response_time].
        let (keyboard, touch, gamepad, general) = match self {
            Self::Casual => ([0.8, 0.7, 0.8], [0.8, 0.6, 0.8], [0.8, 0.7, 0.8], [0.2, 0.3]),
            Self::Sport => ([1.2, 1.1, 1.0], [1.1, 0.9, 1.0], [1.1, 1.0, 1.0], [0.05, 0.1]),
            Self::Precise => ([0.6, 0.5, 0.7], [0.6, 0.4, 0.7], [0.6, 0.5, 0.7], [0.3, 0.4]),
        };

        [
            profile.keyboard.throttle_sensitivity,
            profile.keyboard.steering_sensitivity,
            profile.keyboard.brake_sensitivity,
        ] = keyboard;
        [
            profile.touch.throttle_sensitivity,
            profile.touch.steering_sensitivity,
            profile.touch.brake_sensitivity,
        ] = touch;
        [
            profile.gamepad.throttle_sensitivity,
            profile.gamepad.steering_sensitivity,
            profile.gamepad.brake_sensitivity,
        ] = gamepad;
        [profile.general.smoothing, profile.general.response_time] = general;
    }
}

#[derive(Debug)]
pub enum SettingsStoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize(serde_json::Error),
    Deserialize(serde_json::Error),
    Poisoned,
}

impl Display for SettingsStoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "settings storage at `{}` failed: {source}", path.display())
            }
            Self::Serialize(source) => write!(f, "failed to serialize settings: {source}"),
            Self::Deserialize(source) => write!(f, "failed to parse saved settings: {source}"),
            Self::Poisoned => write!(f, "settings storage lock was poisoned"),
        }
    }
}

impl Error for SettingsStoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize(source) | Self::Deserialize(source) => Some(source),
            Self::Poisoned => None,
        }
    }
}

pub trait SettingsStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsStoreError>;
    fn save(&mut self, key: &str, blob: &str) -> Result<(), SettingsStoreError>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsStoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(raw)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(SettingsStoreError::Io { path, source }),
        }
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), SettingsStoreError> {
        fs::create_dir_all(&self.dir).map_err(|source| SettingsStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let path = self.path_for(key);
        fs::write(&path, blob).map_err(|source| SettingsStoreError::Io { path, source })
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    blobs: Arc<Mutex<HashMap<String, String>>>,
}

impl MemorySettingsStore {
    pub fn with_blob(key: &str, blob: &str) -> Self {
        let store = Self::default();
        if let Ok(mut blobs) = store.blobs.lock() {
            blobs.insert(key.to_string(), blob.to_string());
        }
        store
    }

    pub fn blob(&self, key: &str) -> Option<String> {
        self.blobs.lock().ok()?.get(key).cloned()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self, key: &str) -> Result<Option<String>, SettingsStoreError> {
        let blobs = self.blobs.lock().map_err(|_| SettingsStoreError::Poisoned)?;
        Ok(blobs.get(key).cloned())
    }

    fn save(&mut self, key: &str, blob: &str) -> Result<(), SettingsStoreError> {
        let mut blobs = self.blobs.lock().map_err(|_| SettingsStoreError::Poisoned)?;
        blobs.insert(key.to_string(), blob.to_string());
        Ok(())
    }
}

pub fn parse_profile(blob: &str) -> Result<SensitivityProfile, SettingsStoreError> {
    serde_json::from_str(blob).map_err(SettingsStoreError::Deserialize)
}

#[derive(Resource)]
pub struct ControlSettings {
    profile: SensitivityProfile,
    store: Box<dyn SettingsStore>,
}

impl ControlSettings {
    pub fn load(store: Box<dyn SettingsStore>, log: &mut DebugLog) -> Self {
        let mut settings = Self {
            profile: SensitivityProfile::default(),
            store,
        };

        match settings.store.load(SETTINGS_STORAGE_KEY) {
            Ok(Some(blob)) => match parse_profile(&blob) {
                Ok(profile) => {
                    settings.profile = profile;
                    log.success("Control settings loaded", SETTINGS_STORAGE_KEY);
                }
                Err(error) => log.warning("Failed to load control settings", error.to_string()),
            },
            Ok(None) => log.success("Control settings using defaults", ""),
            Err(error) => log.warning("Failed to load control settings", error.to_string()),
        }

        log.success("Control settings initialized", "");
        settings
    }

    pub fn profile(&self) -> &SensitivityProfile {
        &self.profile
    }

    pub fn keyboard(&self) -> KeyboardSensitivity {
        self.profile.keyboard
    }

    pub fn touch(&self) -> TouchSensitivity {
        self.profile.touch
    }

    pub fn gamepad(&self) -> GamepadSensitivity {
        self.profile.gamepad
    }

    pub fn general(&self) -> GeneralSettings {
        self.profile.general
    }

    pub fn all_settings(&self) -> SensitivityProfile {
        self.profile
    }

    pub fn set_keyboard(&mut self, keyboard: KeyboardSensitivity, log: &mut DebugLog) {
        self.profile.keyboard = keyboard;
        self.save(log);
        log.success("Keyboard sensitivity updated", "");
    }

    pub fn set_touch(&mut self, touch: TouchSensitivity, log: &mut DebugLog) {
        self.profile.touch = touch;
        self.save(log);
        log.success("Touch sensitivity updated", "");
    }

    pub fn set_gamepad(&mut self, gamepad: GamepadSensitivity, log: &mut DebugLog) {
        self.profile.gamepad = gamepad;
        self.save(log);
        log.success("Gamepad sensitivity updated", "");
    }

    pub fn set_general(&mut self, general: GeneralSettings, log: &mut DebugLog) {
        self.profile.general = general;
        self.save(log);
        log.success("General control settings updated", "");
    }

    pub fn reset_to_defaults(&mut self, log: &mut DebugLog) {
        self.profile = SensitivityProfile::default();
        self.save(log);
        log.success("Control settings reset to defaults", "");
    }

    pub fn apply_preset(&mut self, name: &str, log: &mut DebugLog) {
        let Some(preset) = ControlPreset::from_name(name) else {
            log.warning(format!("Preset '{name}' not found"), "");
            return;
        };

        preset.apply_to(&mut self.profile);
        self.save(log);
        log.success(format!("Preset '{}' applied", preset.name()), "");
    }

    fn save(&mut self, log: &mut DebugLog) {
        let blob = match serde_json::to_string(&self.profile) {
            Ok(blob) => blob,
            Err(error) => {
                log.error(
                    "Failed to save control settings",
                    SettingsStoreError::Serialize(error).to_string(),
                );
                return;
            }
        };

        if let Err(error) = self.store.save(SETTINGS_STORAGE_KEY, &blob) {
            log.error("Failed to save control settings", error.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug::CheckpointStatus;

    const EPSILON: f32 = 1e-5;

    fn input(throttle: f32, steering: f32, brake: f32) -> NormalizedInput {
        NormalizedInput {
            throttle,
            steering,
            brake,
        }
    }

    #[test]
    fn dead_zone_zeroes_center_and_threshold_and_keeps_full_range() {
        for dead_zone in [0.0, 0.05, 0.1, 0.5, 0.95] {
            assert_eq!(apply_dead_zone(0.0, dead_zone), 0.0);
            assert!(apply_dead_zone(dead_zone, dead_zone).abs() < EPSILON);
            assert!(apply_dead_zone(-dead_zone, dead_zone).abs() < EPSILON);
            assert!((apply_dead_zone(1.0, dead_zone) - 1.0).abs() < EPSILON);
            assert!((apply_dead_zone(-1.0, dead_zone) + 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn dead_zone_rescales_and_preserves_sign() {
        assert!((apply_dead_zone(0.55, 0.1) - 0.5).abs() < EPSILON);
        assert!((apply_dead_zone(-0.55, 0.1) + 0.5).abs() < EPSILON);
        assert_eq!(apply_dead_zone(0.09, 0.1), 0.0);
    }

    #[test]
    fn gamepad_sensitivity_uses_separate_stick_and_trigger_dead_zones() {
        let profile = SensitivityProfile::default();
        let scaled = profile.apply_gamepad_sensitivity(input(0.04, 0.08, 1.0));

        assert_eq!(scaled.throttle, 0.0);
        assert_eq!(scaled.steering, 0.0);
        assert!((scaled.brake - 1.0).abs() < EPSILON);
    }

    #[test]
    fn inversion_flips_steering_for_every_device() {
        let mut profile = SensitivityProfile::default();
        profile.general.invert_steering = true;
        let raw = input(0.0, 1.0, 0.0);

        assert!((profile.apply_keyboard_sensitivity(raw).steering + 1.0).abs() < EPSILON);
        assert!((profile.apply_touch_sensitivity(raw).steering + 0.8).abs() < EPSILON);
        assert!((profile.apply_gamepad_sensitivity(raw).steering + 0.9).abs() < EPSILON);
    }

    #[test]
    fn smoothing_converges_without_overshoot() {
        let profile = SensitivityProfile::default();
        let start = input(-1.0, 0.5, 0.0);
        let target = input(1.0, -0.25, 1.0);
        let mut current = start;

        for _ in 0..600 {
            current = profile.smooth_input(current, target, 1.0 / 60.0);
            for (value, from, to) in [
                (current.throttle, start.throttle, target.throttle),
                (current.steering, start.steering, target.steering),
                (current.brake, start.brake, target.brake),
            ] {
                assert!(value >= from.min(to) - EPSILON && value <= from.max(to) + EPSILON);
            }
        }

        assert!((current.throttle - target.throttle).abs() < 1e-3);
        assert!((current.steering - target.steering).abs() < 1e-3);
        assert!((current.brake - target.brake).abs() < 1e-3);
    }

    #[test]
    fn smoothing_with_large_dt_snaps_to_target() {
        let profile = SensitivityProfile::default();
        let next = profile.smooth_input(input(0.0, 0.0, 0.0), input(1.0, -1.0, 0.5), 1.0);
        assert_eq!(next, input(1.0, -1.0, 0.5));
    }

    #[test]
    fn missing_gamepad_category_falls_back_to_defaults() {
        let blob = r#"{
            "keyboard": {"throttleSensitivity": 0.5, "steeringSensitivity": 0.6, "brakeSensitivity": 0.7},
            "touch": {"throttleSensitivity": 0.9, "steeringSensitivity": 0.4, "brakeSensitivity": 0.3, "joystickSensitivity": 1.2},
            "general": {"invertSteering": true, "smoothing": 0.3, "responseTime": 0.5},
            "legacyCategory": {"whatever": 1}
        }"#;

        let profile = parse_profile(blob).expect("blob should parse");

        assert_eq!(profile.gamepad, GamepadSensitivity::default());
        assert_eq!(profile.keyboard.throttle_sensitivity, 0.5);
        assert_eq!(profile.keyboard.steering_sensitivity, 0.6);
        assert_eq!(profile.keyboard.brake_sensitivity, 0.7);
        assert_eq!(profile.touch.joystick_sensitivity, 1.2);
        assert!(profile.general.invert_steering);
        assert_eq!(profile.general.response_time, 0.5);
    }

    #[test]
    fn partial_category_keeps_default_fields() {
        let profile =
            parse_profile(r#"{"gamepad": {"deadZone": 0.2}}"#).expect("blob should parse");
        assert_eq!(profile.gamepad.dead_zone, 0.2);
        assert_eq!(profile.gamepad.trigger_dead_zone, 0.05);
        assert_eq!(profile.gamepad.steering_sensitivity, 0.9);
    }

    #[test]
    fn corrupt_blob_falls_back_to_defaults_and_logs() {
        let store = MemorySettingsStore::with_blob(SETTINGS_STORAGE_KEY, "{not json");
        let mut log = DebugLog::default();

        let settings = ControlSettings::load(Box::new(store), &mut log);

        assert_eq!(settings.all_settings(), SensitivityProfile::default());
        assert!(log
            .recent(10)
            .any(|entry| entry.name == "Failed to load control settings"));
    }

    #[test]
    fn presets_override_sensitivities_and_general_timing() {
        let mut log = DebugLog::default();
        let mut settings =
            ControlSettings::load(Box::new(MemorySettingsStore::default()), &mut log);
        let mut gamepad = settings.gamepad();
        gamepad.dead_zone = 0.25;
        settings.set_gamepad(gamepad, &mut log);

        settings.apply_preset("sport", &mut log);

        let profile = settings.profile();
        assert_eq!(profile.keyboard.throttle_sensitivity, 1.2);
        assert_eq!(profile.touch.steering_sensitivity, 0.9);
        assert_eq!(profile.gamepad.steering_sensitivity, 1.0);
        assert_eq!(profile.general.smoothing, 0.05);
        assert_eq!(profile.general.response_time, 0.1);
        assert_eq!(profile.gamepad.dead_zone, 0.25);
    }

    #[test]
    fn unknown_preset_changes_nothing_and_warns() {
        let mut log = DebugLog::default();
        let mut settings =
            ControlSettings::load(Box::new(MemorySettingsStore::default()), &mut log);

        settings.apply_preset("turbo", &mut log);

        assert_eq!(settings.all_settings(), SensitivityProfile::default());
        assert!(log
            .recent(1)
            .any(|entry| entry.name == "Preset 'turbo' not found"));
    }

    #[test]
    fn setters_persist_and_reload_round_trips() {
        let mut log = DebugLog::default();
        let mut settings =
            ControlSettings::load(Box::new(MemorySettingsStore::default()), &mut log);
        settings.apply_preset("precise", &mut log);
        let mut general = settings.general();
        general.invert_steering = true;
        settings.set_general(general, &mut log);

        let blob = serde_json::to_string(settings.profile()).expect("profile serializes");
        let reloaded = ControlSettings::load(
            Box::new(MemorySettingsStore::with_blob(SETTINGS_STORAGE_KEY, &blob)),
            &mut log,
        );

        assert_eq!(reloaded.all_settings(), settings.all_settings());
    }

    #[test]
    fn setters_write_the_full_profile_to_the_store() {
        let store = MemorySettingsStore::default();
        let mut log = DebugLog::default();
        let mut settings = ControlSettings::load(Box::new(store.clone()), &mut log);
        assert!(store.blob(SETTINGS_STORAGE_KEY).is_none());

        let mut keyboard = settings.keyboard();
        keyboard.throttle_sensitivity = 0.4;
        settings.set_keyboard(keyboard, &mut log);

        let saved = store
            .blob(SETTINGS_STORAGE_KEY)
            .expect("setter should persist immediately");
        let saved = parse_profile(&saved).expect("saved blob parses");
        assert_eq!(saved, settings.all_settings());
        assert_eq!(saved.keyboard.throttle_sensitivity, 0.4);

        settings.reset_to_defaults(&mut log);
        let saved = parse_profile(&store.blob(SETTINGS_STORAGE_KEY).expect("saved"))
            .expect("saved blob parses");
        assert_eq!(saved, SensitivityProfile::default());
    }

    struct ReadOnlyStore;

    impl SettingsStore for ReadOnlyStore {
        fn load(&self, _key: &str) -> Result<Option<String>, SettingsStoreError> {
            Ok(None)
        }

        fn save(&mut self, key: &str, _blob: &str) -> Result<(), SettingsStoreError> {
            Err(SettingsStoreError::Io {
                path: PathBuf::from(key),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("carrinho3d-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn failed_save_is_logged_and_keeps_the_change_in_memory() {
        let mut log = DebugLog::default();
        let mut settings = ControlSettings::load(Box::new(ReadOnlyStore), &mut log);

        let mut keyboard = settings.keyboard();
        keyboard.steering_sensitivity = 0.3;
        settings.set_keyboard(keyboard, &mut log);

        assert_eq!(settings.keyboard().steering_sensitivity, 0.3);
        assert!(log.recent(4).any(|entry| {
            entry.name == "Failed to save control settings"
                && entry.status == CheckpointStatus::Error
        }));
    }

    #[test]
    fn file_store_reports_missing_blob_then_round_trips() {
        let dir = scratch_dir("file-store");
        let mut store = FileSettingsStore::new(&dir);

        assert!(store
            .load(SETTINGS_STORAGE_KEY)
            .expect("missing file is not an error")
            .is_none());

        store
            .save(SETTINGS_STORAGE_KEY, "{\"general\":{}}")
            .expect("save creates the directory");
        assert_eq!(
            store.load(SETTINGS_STORAGE_KEY).expect("file readable"),
            Some("{\"general\":{}}".to_string())
        );

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn settings_saved_to_disk_survive_a_reload() {
        let dir = scratch_dir("settings-reload");
        let mut log = DebugLog::default();

        let fresh = ControlSettings::load(Box::new(FileSettingsStore::new(&dir)), &mut log);
        assert_eq!(fresh.all_settings(), SensitivityProfile::default());

        let mut settings = fresh;
        settings.apply_preset("sport", &mut log);
        let reloaded = ControlSettings::load(Box::new(FileSettingsStore::new(&dir)), &mut log);

        assert_eq!(reloaded.all_settings(), settings.all_settings());
        assert_ne!(reloaded.all_settings(), SensitivityProfile::default());

        let _ = fs::remove_dir_all(&dir);
    }
}
