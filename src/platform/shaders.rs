//! Shader source loading
//!
//! Sources arrive one at a time (asynchronously on the web), so loading is an
//! explicit state machine: ask for the next missing asset, supply it, and
//! finish once everything is in. The obstacle distance functions are spliced
//! into the scene shader at [`OBSTACLE_PLACEHOLDER`].

use crate::error::{GameError, Result};

/// Marker line in `scene.wgsl` replaced by `obstacles.wgsl`
pub const OBSTACLE_PLACEHOLDER: &str = "// @obstacle_shapes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderAsset {
    Vertex,
    Scene,
    Obstacles,
}

impl ShaderAsset {
    pub const ALL: [ShaderAsset; 3] = [ShaderAsset::Vertex, ShaderAsset::Scene, ShaderAsset::Obstacles];

    /// Path relative to the page
    pub fn path(self) -> &'static str {
        match self {
            ShaderAsset::Vertex => "shaders/vertex.wgsl",
            ShaderAsset::Scene => "shaders/scene.wgsl",
            ShaderAsset::Obstacles => "shaders/obstacles.wgsl",
        }
    }

    fn index(self) -> usize {
        match self {
            ShaderAsset::Vertex => 0,
            ShaderAsset::Scene => 1,
            ShaderAsset::Obstacles => 2,
        }
    }
}

/// Final shader sources handed to the renderer
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderBundle {
    pub vertex: String,
    /// Scene shader with obstacle shapes spliced in
    pub fragment: String,
}

#[derive(Debug, Default)]
pub struct ShaderLoader {
    sources: [Option<String>; 3],
    failure: Option<GameError>,
}

impl ShaderLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources compiled into the binary
    pub fn embedded() -> Result<ShaderBundle> {
        let mut loader = Self::new();
        loader.supply(ShaderAsset::Vertex, Ok(include_str!("../renderer/shaders/vertex.wgsl").to_string()));
        loader.supply(ShaderAsset::Scene, Ok(include_str!("../renderer/shaders/scene.wgsl").to_string()));
        loader.supply(
            ShaderAsset::Obstacles,
            Ok(include_str!("../renderer/shaders/obstacles.wgsl").to_string()),
        );
        loader.finish()
    }

    /// Next asset still missing, or None once all are in (or one failed)
    pub fn next_request(&self) -> Option<ShaderAsset> {
        if self.failure.is_some() {
            return None;
        }
        ShaderAsset::ALL
            .into_iter()
            .find(|asset| self.sources[asset.index()].is_none())
    }

    /// Record a fetched source, or the error fetching it. The first failure
    /// sticks.
    pub fn supply(&mut self, asset: ShaderAsset, source: Result<String>) {
        match source {
            Ok(text) => {
                log::debug!("Loaded {} ({} bytes)", asset.path(), text.len());
                self.sources[asset.index()] = Some(text);
            }
            Err(e) => {
                log::error!("Failed to load {}: {}", asset.path(), e);
                self.failure.get_or_insert(e);
            }
        }
    }

    pub fn finish(self) -> Result<ShaderBundle> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        let [vertex, scene, obstacles] = self.sources;
        let missing = |asset: ShaderAsset| GameError::AssetLoad {
            path: asset.path().to_string(),
            reason: "never supplied".to_string(),
        };
        let vertex = vertex.ok_or_else(|| missing(ShaderAsset::Vertex))?;
        let scene = scene.ok_or_else(|| missing(ShaderAsset::Scene))?;
        let obstacles = obstacles.ok_or_else(|| missing(ShaderAsset::Obstacles))?;

        if !scene.contains(OBSTACLE_PLACEHOLDER) {
            return Err(GameError::AssetLoad {
                path: ShaderAsset::Scene.path().to_string(),
                reason: format!("missing `{}` marker", OBSTACLE_PLACEHOLDER),
            });
        }

        Ok(ShaderBundle {
            vertex,
            fragment: scene.replacen(OBSTACLE_PLACEHOLDER, &obstacles, 1),
        })
    }
}
