// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

use crate::config::SceneKind;

#[derive(Parser, Debug, Clone)]
#[command(name = "scene-viewer")]
#[command(about = "3D scene viewer: rotating cube or imported glTF city", long_about = None)]
pub struct Cli {
    /// Scene to mount (defaults to the cube)
    #[arg(long, value_enum)]
    pub scene: Option<SceneKind>,

    /// Asset path of the model, e.g. /models/small_city/small_city.gltf
    #[arg(long)]
    pub model: Option<String>,

    /// Directory static asset paths are resolved against
    #[arg(long = "asset-root")]
    pub asset_root: Option<PathBuf>,

    /// JSON config file; CLI flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Add the clickable box with its overlay label
    #[arg(long, default_value = "false")]
    pub interactive: bool,

    /// Disable the sidebar and overlay labels
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,

    /// Initial window width
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 600)]
    pub height: u32,
}
