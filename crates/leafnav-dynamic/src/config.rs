//! Configuration for live navigation meshes

use leafnav_common::Result;
use leafnav_gen::{GeneratorConfig, LogLevel};

/// Settings for a [`DynamicNavMesh`](crate::DynamicNavMesh)
#[derive(Debug, Clone)]
pub struct DynamicNavMeshConfig {
    /// Settings handed to every full build and re-split
    pub generator: GeneratorConfig,
    /// Split leaves around brush entities as part of each full build
    pub split_on_rebuild: bool,
    /// Lowest severity kept in the build context of a rebuild
    pub log_level: LogLevel,
    /// Record per-phase timers during rebuilds
    pub enable_timing: bool,
}

impl Default for DynamicNavMeshConfig {
    fn default() -> Self {
        Self {
            generator: GeneratorConfig::default(),
            split_on_rebuild: true,
            log_level: LogLevel::Info,
            enable_timing: true,
        }
    }
}

impl DynamicNavMeshConfig {
    pub fn new(generator: GeneratorConfig) -> Self {
        Self {
            generator,
            ..Self::default()
        }
    }

    pub fn with_generator(mut self, generator: GeneratorConfig) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_split_on_rebuild(mut self, split: bool) -> Self {
        self.split_on_rebuild = split;
        self
    }

    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    pub fn with_timing(mut self, enabled: bool) -> Self {
        self.enable_timing = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.generator.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leafnav_common::Error;

    #[test]
    fn test_builders() {
        let config = DynamicNavMeshConfig::default()
            .with_split_on_rebuild(false)
            .with_log_level(LogLevel::Warning)
            .with_timing(false);
        assert!(!config.split_on_rebuild);
        assert_eq!(config.log_level, LogLevel::Warning);
        assert!(!config.enable_timing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generator_errors_surface() {
        let config = DynamicNavMeshConfig::new(GeneratorConfig::default().with_octree_depth(0));
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}
