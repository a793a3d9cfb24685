use std::fs;
use std::path::{Path, PathBuf};

use glam::Vec3;
use passage_shared::pose::Pose;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use tracing::info;

use crate::error::SceneError;
use crate::player::PlayerRig;
use crate::portal::{
    PortalSettings, DEFAULT_COOLDOWN_SECONDS, DEFAULT_CROSSING_OFFSET, DEFAULT_DETECTION_RADIUS,
    DEFAULT_TRIGGER_HALF_EXTENTS,
};
use crate::render_target::{FrameBufferProvider, DEFAULT_RENDER_SCALE};
use crate::system::PortalSystem;

const MIN_RENDER_SCALE: f32 = 0.1;
const MAX_RENDER_SCALE: f32 = 4.0;

#[derive(Debug, Clone, Deserialize)]
pub struct SceneConfig {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub portals: Vec<PortalConfig>,
    #[serde(default)]
    pub script: Vec<ScriptStep>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_width")]
    pub width: u32,
    #[serde(default = "default_output_height")]
    pub height: u32,
    #[serde(default = "default_render_scale")]
    pub render_scale: f32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_output_width(),
            height: default_output_height(),
            render_scale: default_render_scale(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default = "default_eye_height")]
    pub eye_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            yaw_degrees: 0.0,
            eye_height: default_eye_height(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub name: String,
    pub position: [f32; 3],
    /// Heading of the portal's front about world up.
    #[serde(default)]
    pub yaw_degrees: f32,
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default = "default_detection_radius")]
    pub detection_radius: f32,
    #[serde(default)]
    pub inverted: bool,
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: f32,
    #[serde(default = "default_crossing_offset")]
    pub crossing_offset: f32,
    #[serde(default = "default_trigger_half_extents")]
    pub trigger_half_extents: [f32; 3],
}

/// Scripted player motion for headless runs; each step holds from `at`
/// seconds until the next one starts.
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptStep {
    pub at: f32,
    /// Velocity in the player's heading frame (+Z is straight ahead).
    #[serde(default)]
    pub walk: [f32; 3],
    #[serde(default)]
    pub turn_degrees_per_second: f32,
}

impl SceneConfig {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let contents = fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        let scene = Self::from_toml_str(&contents)?;
        info!(
            "Loaded scene {} with {} portals",
            path.display(),
            scene.portals.len()
        );
        Ok(scene)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, SceneError> {
        let parsed = toml::from_str::<Self>(contents)?;
        Ok(parsed.sanitize())
    }

    fn sanitize(mut self) -> Self {
        self.output.render_scale = finite_or(self.output.render_scale, DEFAULT_RENDER_SCALE)
            .clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE);
        self.player.eye_height = finite_or(self.player.eye_height, default_eye_height()).max(0.0);
        for portal in &mut self.portals {
            portal.detection_radius =
                finite_or(portal.detection_radius, DEFAULT_DETECTION_RADIUS).max(0.0);
            portal.cooldown_seconds =
                finite_or(portal.cooldown_seconds, DEFAULT_COOLDOWN_SECONDS).max(0.0);
            portal.crossing_offset = finite_or(portal.crossing_offset, DEFAULT_CROSSING_OFFSET);
            portal.trigger_half_extents = portal.trigger_half_extents.map(f32::abs);
        }
        self.script.sort_by(|a, b| a.at.total_cmp(&b.at));
        self
    }

    pub fn portal_settings(&self) -> Vec<PortalSettings> {
        self.portals
            .iter()
            .map(|portal| PortalSettings {
                name: portal.name.clone(),
                pose: Pose::standing(
                    Vec3::from_array(portal.position),
                    portal.yaw_degrees.to_radians(),
                ),
                detection_radius: portal.detection_radius,
                inverted: portal.inverted,
                cooldown_seconds: portal.cooldown_seconds,
                crossing_offset: portal.crossing_offset,
                trigger_half_extents: Vec3::from_array(portal.trigger_half_extents),
            })
            .collect()
    }

    pub fn player_rig(&self) -> PlayerRig {
        PlayerRig::new(
            Vec3::from_array(self.player.position),
            self.player.yaw_degrees.to_radians(),
            self.player.eye_height,
        )
    }

    /// Builds a system with every portal added, destinations linked by name,
    /// the configured player bound and render targets allocated.
    pub fn build_system<F: FrameBufferProvider>(
        &self,
        provider: F,
    ) -> Result<PortalSystem<PlayerRig, F>, SceneError> {
        let mut ids = FxHashMap::default();
        let mut system = PortalSystem::new(
            provider,
            self.output.width,
            self.output.height,
            self.output.render_scale,
        );

        for settings in self.portal_settings() {
            if ids.contains_key(&settings.name) {
                return Err(SceneError::DuplicatePortal(settings.name));
            }
            let name = settings.name.clone();
            ids.insert(name, system.add_portal(settings));
        }

        for portal in &self.portals {
            let Some(destination) = &portal.destination else {
                continue;
            };
            let Some(&destination_id) = ids.get(destination) else {
                return Err(SceneError::UnknownDestination {
                    portal: portal.name.clone(),
                    destination: destination.clone(),
                });
            };
            system.set_destination(ids[&portal.name], Some(destination_id));
        }

        system.bind_player(self.player_rig());
        system.setup_render_targets();
        Ok(system)
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn default_output_width() -> u32 {
    1920
}

fn default_output_height() -> u32 {
    1080
}

fn default_render_scale() -> f32 {
    DEFAULT_RENDER_SCALE
}

fn default_eye_height() -> f32 {
    1.6
}

fn default_detection_radius() -> f32 {
    DEFAULT_DETECTION_RADIUS
}

fn default_cooldown_seconds() -> f32 {
    DEFAULT_COOLDOWN_SECONDS
}

fn default_crossing_offset() -> f32 {
    DEFAULT_CROSSING_OFFSET
}

fn default_trigger_half_extents() -> [f32; 3] {
    DEFAULT_TRIGGER_HALF_EXTENTS.to_array()
}
