//! Verdant - CPU Monte Carlo path tracing.
//!
//! The pieces, leaf first:
//! - [`Sampler`] streams and hemisphere distributions
//! - [`Surface`] materials with importance sampling
//! - shapes, [`Primitive`] and the [`Bvh`] for closest-hit queries
//! - [`Scene`] with point lights and an optional sky
//! - the [`Integrator`]s estimating radiance along a ray
//! - [`Pipeline`], which renders tiles in parallel on a
//!   [`verdant_tasks::TaskQueue`]

mod bvh;
mod camera;
mod config;
mod environment;
mod error;
mod film;
pub mod fresnel;
mod integrator;
mod line_segment;
mod pipeline;
mod primitive;
mod sampler;
mod scene;
mod shape;
mod sphere;
mod surface;
mod tile;
mod triangle;

pub use bvh::{Bvh, DEFAULT_LEAF_SIZE};
pub use camera::Camera;
pub use config::{IntegratorKind, RenderConfig};
pub use environment::EnvironmentMap;
pub use error::{RenderError, RenderResult};
pub use film::{tone_map, Film};
pub use integrator::{
    DirectLightingIntegrator, Integrator, KajiyaIntegrator, PathIntegrator, PathTraceIntegrator,
};
pub use line_segment::LineSegment;
pub use pipeline::Pipeline;
pub use primitive::{Intersection, Primitive};
pub use sampler::{bernoulli, CosineHemisphere, Sampler, UniformHemisphere};
pub use scene::{PointLight, Scene, SkyLight};
pub use shape::{Hittable, Shape, ShapeHit};
pub use sphere::Sphere;
pub use surface::{Color, Ior, Surface, SurfaceKind, SurfaceSample};
pub use tile::{generate_tiles, Tile, DEFAULT_TILE_SIZE};
pub use triangle::Triangle;

/// Re-export Vec3 and common math types from verdant_math
pub use verdant_math::{Aabb, Frame, Interval, Ray, Vec2, Vec3};
