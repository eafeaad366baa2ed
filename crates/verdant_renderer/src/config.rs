//! Render settings.

use crate::bvh::DEFAULT_LEAF_SIZE;
use crate::error::{RenderError, RenderResult};
use crate::integrator::{
    DirectLightingIntegrator, Integrator, KajiyaIntegrator, PathIntegrator, PathTraceIntegrator,
};
use crate::tile::DEFAULT_TILE_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use verdant_tasks::WorkerPool;

/// Which radiance estimator to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorKind {
    /// Folded single-sample estimator ([`PathIntegrator`])
    #[default]
    Path,
    /// Direct + indirect estimator ([`PathTraceIntegrator`])
    PathTrace,
    /// First hit plus one bounce toward the sky ([`DirectLightingIntegrator`])
    Direct,
    /// Iterative estimator with a bounce cap ([`KajiyaIntegrator`])
    Kajiya,
}

impl FromStr for IntegratorKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "path" => Ok(IntegratorKind::Path),
            "path_trace" | "pathtrace" => Ok(IntegratorKind::PathTrace),
            "direct" => Ok(IntegratorKind::Direct),
            "kajiya" => Ok(IntegratorKind::Kajiya),
            other => Err(RenderError::InvalidConfig(format!(
                "unknown integrator '{}' (expected path, path_trace, direct or kajiya)",
                other
            ))),
        }
    }
}

/// Everything needed to turn a scene into an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    // Frame
    pub width: u32,
    pub height: u32,
    pub samples_per_pixel: u32,
    pub tile_size: u32,

    // Scheduling
    /// Worker threads; `None` uses the available parallelism
    pub worker_count: Option<usize>,
    /// Base seed for per-tile sample streams; `None` seeds from entropy
    pub seed: Option<u64>,

    // Integrator
    pub integrator: IntegratorKind,
    pub min_bounces: u32,
    pub continue_probability: f32,
    pub light_samples: u32,
    pub max_depth: Option<u32>,

    // Scene
    pub bvh_leaf_size: usize,
    pub hdr_sky: Option<PathBuf>,

    // Output
    pub output: PathBuf,
    pub exposure: f32,
    pub gamma: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 960,
            samples_per_pixel: 32,
            tile_size: DEFAULT_TILE_SIZE,
            worker_count: None,
            seed: None,
            integrator: IntegratorKind::Path,
            min_bounces: 3,
            continue_probability: 0.9,
            light_samples: 8,
            max_depth: None,
            bvh_leaf_size: DEFAULT_LEAF_SIZE,
            hdr_sky: None,
            output: PathBuf::from("verdant.ppm"),
            exposure: 3.0,
            gamma: 0.66,
        }
    }
}

impl RenderConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> RenderResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded render config from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> RenderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings that would produce an empty image or paths that only
    /// end by escaping the scene.
    pub fn validate(&self) -> RenderResult<()> {
        let invalid = |msg: String| Err(RenderError::InvalidConfig(msg));

        if self.width == 0 || self.height == 0 {
            return invalid(format!("image size must be non-zero, got {}x{}", self.width, self.height));
        }
        if self.samples_per_pixel == 0 {
            return invalid("samples_per_pixel must be at least 1".into());
        }
        if self.tile_size == 0 {
            return invalid("tile_size must be at least 1".into());
        }
        if self.worker_count == Some(0) {
            return invalid("worker_count must be at least 1".into());
        }
        if !(self.continue_probability > 0.0 && self.continue_probability <= 1.0) {
            return invalid(format!(
                "continue_probability must be in (0, 1], got {}",
                self.continue_probability
            ));
        }
        let uncapped_paths = matches!(self.integrator, IntegratorKind::Path | IntegratorKind::PathTrace);
        if uncapped_paths && self.continue_probability >= 1.0 && self.max_depth.is_none() {
            return invalid(format!(
                "{:?} integrator needs continue_probability below 1 or a max_depth to end paths",
                self.integrator
            ));
        }
        if self.bvh_leaf_size == 0 {
            return invalid("bvh_leaf_size must be at least 1".into());
        }
        if !(self.exposure > 0.0) || !(self.gamma > 0.0) {
            return invalid(format!(
                "exposure and gamma must be positive, got {} and {}",
                self.exposure, self.gamma
            ));
        }
        Ok(())
    }

    /// Resolved worker thread count.
    pub fn workers(&self) -> usize {
        self.worker_count.unwrap_or_else(WorkerPool::default_size)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Instantiate the configured integrator.
    pub fn build_integrator(&self) -> Arc<dyn Integrator> {
        match self.integrator {
            IntegratorKind::Path => Arc::new(
                PathIntegrator::new()
                    .with_continue_probability(self.continue_probability)
                    .with_min_bounces(self.min_bounces)
                    .with_max_depth(self.max_depth),
            ),
            IntegratorKind::PathTrace => Arc::new(
                PathTraceIntegrator::new()
                    .with_continue_probability(self.continue_probability)
                    .with_min_bounces(self.min_bounces)
                    .with_light_samples(self.light_samples)
                    .with_max_depth(self.max_depth),
            ),
            IntegratorKind::Direct => Arc::new(DirectLightingIntegrator),
            IntegratorKind::Kajiya => {
                let kajiya = KajiyaIntegrator::new().with_light_samples(self.light_samples);
                let max_bounces = self.max_depth.unwrap_or(kajiya.max_bounces);
                Arc::new(kajiya.with_max_bounces(max_bounces))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RenderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!((config.width, config.height), (1280, 960));
        assert_eq!(config.samples_per_pixel, 32);
        assert_eq!(config.integrator, IntegratorKind::Path);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = RenderConfig::from_json_str(
            r#"{ "width": 320, "height": 240, "integrator": "path_trace", "seed": 7 }"#,
        )
        .unwrap();
        assert_eq!((config.width, config.height), (320, 240));
        assert_eq!(config.integrator, IntegratorKind::PathTrace);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.samples_per_pixel, 32);
        assert_eq!(config.tile_size, DEFAULT_TILE_SIZE);
    }

    #[test]
    fn test_json_round_trip() {
        let config = RenderConfig {
            max_depth: Some(6),
            hdr_sky: Some(PathBuf::from("sky.hdr")),
            ..RenderConfig::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(RenderConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_malformed_json_is_a_config_error() {
        let err = RenderConfig::from_json_str("{ width: }").unwrap_err();
        assert!(matches!(err, RenderError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            RenderConfig { width: 0, ..Default::default() },
            RenderConfig { samples_per_pixel: 0, ..Default::default() },
            RenderConfig { tile_size: 0, ..Default::default() },
            RenderConfig { worker_count: Some(0), ..Default::default() },
            RenderConfig { continue_probability: 0.0, ..Default::default() },
            RenderConfig { continue_probability: 1.5, ..Default::default() },
            RenderConfig { continue_probability: f32::NAN, ..Default::default() },
            RenderConfig { continue_probability: 1.0, ..Default::default() },
            RenderConfig {
                integrator: IntegratorKind::PathTrace,
                continue_probability: 1.0,
                ..Default::default()
            },
            RenderConfig { bvh_leaf_size: 0, ..Default::default() },
            RenderConfig { exposure: 0.0, ..Default::default() },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(RenderError::InvalidConfig(_))),
                "{:?} should be rejected",
                config
            );
        }
    }

    #[test]
    fn test_certain_continuation_needs_a_cap() {
        let capped = RenderConfig {
            continue_probability: 1.0,
            max_depth: Some(8),
            ..Default::default()
        };
        assert!(capped.validate().is_ok());

        // The direct and kajiya estimators stop on their own
        for integrator in [IntegratorKind::Direct, IntegratorKind::Kajiya] {
            let config = RenderConfig {
                integrator,
                continue_probability: 1.0,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_kajiya_uses_depth_as_bounce_cap() {
        use crate::{Color, Primitive, Sampler, Scene, SkyLight, Sphere, Surface};
        use verdant_math::{Ray, Vec3};

        let mut scene = Scene::new();
        scene.set_sky_light(Some(SkyLight::Constant(Color::ONE)));
        scene.add_primitive(Primitive::new(
            Sphere::new(Vec3::ZERO, 1.0),
            Arc::new(Surface::glass(Color::ONE, 1.0)),
        ));
        let ray = Ray::new(Vec3::new(0.0, 0.1, 5.0), -Vec3::Z);
        let mut sampler = Sampler::new(1);

        let radiance = |max_depth| {
            RenderConfig {
                integrator: IntegratorKind::Kajiya,
                max_depth,
                ..Default::default()
            }
            .build_integrator()
        };
        // Passing through the sphere takes two bounces
        assert_eq!(radiance(Some(1)).radiance(&scene, &ray, &mut sampler), Color::ZERO);
        let open = radiance(None).radiance(&scene, &ray, &mut sampler);
        assert!((open - Color::ONE).abs().max_element() < 1e-4, "got {:?}", open);
    }

    #[test]
    fn test_integrator_kind_from_str() {
        assert_eq!("path".parse::<IntegratorKind>().unwrap(), IntegratorKind::Path);
        assert_eq!("path-trace".parse::<IntegratorKind>().unwrap(), IntegratorKind::PathTrace);
        assert_eq!("Direct".parse::<IntegratorKind>().unwrap(), IntegratorKind::Direct);
        assert_eq!("kajiya".parse::<IntegratorKind>().unwrap(), IntegratorKind::Kajiya);
        assert!("bidir".parse::<IntegratorKind>().is_err());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = RenderConfig::from_json_file("/nonexistent/verdant.json").unwrap_err();
        assert!(matches!(err, RenderError::Io(_)));
    }
}
