// config.rs - Viewer configuration: presets, JSON file, CLI overrides
use anyhow::{ensure, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::core::SurfaceOptions;
use crate::math::{hex_rgb, HOT_PINK, RED, WHITE};

/// Which scene assembly strategy to mount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// Procedural rotating cube
    Cube,
    /// Imported glTF city model with orbit navigation
    City,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 75.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmbientConfig {
    pub color: [f32; 3],
    pub intensity: f32,
}

impl Default for AmbientConfig {
    fn default() -> Self {
        Self {
            color: hex_rgb(0x404040),
            intensity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    pub map_size: u32,
    pub near: f32,
    pub far: f32,
    /// Half-width of the orthographic shadow frustum
    pub extent: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 1024,
            near: 0.5,
            far: 100.0,
            extent: 50.0,
        }
    }
}

impl ShadowConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(self.map_size > 0, "shadow map_size must be positive");
        ensure!(
            self.near >= 0.0 && self.near < self.far,
            "shadow near ({}) must be non-negative and below far ({})",
            self.near,
            self.far
        );
        ensure!(self.extent > 0.0, "shadow extent must be positive, got {}", self.extent);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectionalConfig {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Light position; it shines towards the origin
    pub position: [f32; 3],
    pub cast_shadow: bool,
    pub shadow: ShadowConfig,
}

impl Default for DirectionalConfig {
    fn default() -> Self {
        Self {
            color: WHITE,
            intensity: 1.0,
            position: Vec3::ONE.normalize().to_array(),
            cast_shadow: false,
            shadow: ShadowConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeConfig {
    pub size: f32,
    pub color: [f32; 3],
    /// Rotation added around X and Y every frame, radians
    pub spin_per_frame: f32,
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            size: 1.0,
            color: hex_rgb(0x4287f5),
            spin_per_frame: 0.01,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: 1.0e9,
        }
    }
}

impl ControlsConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.min_distance.is_nan() && !self.max_distance.is_nan(),
            "controls distance limits must be numbers"
        );
        ensure!(
            self.min_distance <= self.max_distance,
            "controls min_distance ({}) exceeds max_distance ({})",
            self.min_distance,
            self.max_distance
        );
        ensure!(
            self.damping_factor > 0.0 && self.damping_factor <= 1.0,
            "controls damping_factor must be in (0, 1], got {}",
            self.damping_factor
        );
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractiveConfig {
    pub position: [f32; 3],
    pub size: [f32; 3],
    pub idle_color: [f32; 3],
    pub hover_color: [f32; 3],
    pub label: String,
    /// Label anchor relative to the box centre
    pub label_offset: [f32; 3],
    /// Pointer travel in pixels beyond which a press is a drag, not a click
    pub drag_threshold: f32,
}

impl Default for InteractiveConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 150.0, 0.0],
            size: [200.0, 200.0, 10.0],
            idle_color: RED,
            hover_color: HOT_PINK,
            label: "Hello from the box!".to_string(),
            label_offset: [0.0, 105.0, 6.0],
            drag_threshold: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub scene: SceneKind,
    /// Static asset directory that `model_path` is resolved against
    pub asset_root: PathBuf,
    /// Well-known asset path, e.g. `/models/<name>/<name>.gltf`
    pub model_path: String,
    pub background: [f32; 3],
    pub antialias: bool,
    pub shadows: bool,
    pub camera: CameraConfig,
    pub ambient: AmbientConfig,
    pub directional: DirectionalConfig,
    pub cube: CubeConfig,
    pub controls: ControlsConfig,
    pub interactive: Option<InteractiveConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::cube()
    }
}

impl ViewerConfig {
    /// Rotating cube on a grey background
    pub fn cube() -> Self {
        Self {
            scene: SceneKind::Cube,
            asset_root: PathBuf::from("public"),
            model_path: "/models/small_city/small_city.gltf".to_string(),
            background: hex_rgb(0xaaaaaa),
            antialias: false,
            shadows: false,
            camera: CameraConfig::default(),
            ambient: AmbientConfig::default(),
            directional: DirectionalConfig::default(),
            cube: CubeConfig::default(),
            controls: ControlsConfig::default(),
            interactive: None,
        }
    }

    /// Imported city model with orbit controls and shadows
    pub fn city() -> Self {
        Self {
            scene: SceneKind::City,
            background: hex_rgb(0xcccccc),
            antialias: true,
            shadows: true,
            camera: CameraConfig {
                fov: 50.0,
                near: 0.1,
                far: 10000.0,
                position: [-1000.0, 1500.0, 1500.0],
                target: [0.0, 0.0, 0.0],
            },
            ambient: AmbientConfig {
                color: hex_rgb(0x404040),
                intensity: 1.5,
            },
            directional: DirectionalConfig {
                color: WHITE,
                intensity: 2.0,
                position: [30.0, 50.0, 20.0],
                cast_shadow: true,
                shadow: ShadowConfig::default(),
            },
            controls: ControlsConfig {
                enabled: true,
                ..ControlsConfig::default()
            },
            ..Self::cube()
        }
    }

    pub fn preset(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Cube => Self::cube(),
            SceneKind::City => Self::city(),
        }
    }

    /// Parse a JSON config; missing fields fall back to the cube preset
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).context("Invalid viewer config")?;
        config.validate().context("Invalid viewer config")?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_json(&json)
    }

    /// Preset (or config file) with command-line overrides applied
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_json_file(path)?,
            None => Self::preset(cli.scene.unwrap_or(SceneKind::Cube)),
        };

        if let Some(scene) = cli.scene {
            config.scene = scene;
        }
        if let Some(model) = &cli.model {
            config.model_path = model.clone();
        }
        if let Some(root) = &cli.asset_root {
            config.asset_root = root.clone();
        }
        if cli.interactive && config.interactive.is_none() {
            config.interactive = Some(InteractiveConfig::default());
        }
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would misbehave once the scene is running
    pub fn validate(&self) -> Result<()> {
        self.controls.validate()?;
        self.directional.shadow.validate()?;
        Ok(())
    }

    /// `model_path` joined onto the asset root
    pub fn resolved_model_path(&self) -> PathBuf {
        self.asset_root.join(self.model_path.trim_start_matches('/'))
    }

    pub fn surface_options(&self) -> SurfaceOptions {
        SurfaceOptions {
            antialias: self.antialias,
            shadows: self.shadows,
            clear_color: self.background,
        }
    }
}
