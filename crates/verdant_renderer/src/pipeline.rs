//! Tile-parallel rendering on the task scheduler.
//!
//! [`Pipeline::run`] turns the frame into one task per tile plus a barrier
//! task that depends on all of them. Each tile task renders into its own
//! [`Film`] and copies the result into the shared film under a short lock;
//! tiles never overlap, so the copy order does not matter.

use crate::camera::Camera;
use crate::config::RenderConfig;
use crate::error::RenderResult;
use crate::film::Film;
use crate::integrator::Integrator;
use crate::sampler::Sampler;
use crate::scene::Scene;
use crate::surface::Color;
use crate::tile::{generate_tiles, Tile};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use verdant_math::{Ray, Vec2};
use verdant_tasks::{TaskHandle, TaskQueue, WorkerPool};

/// Scene, camera, film, and integrator wired together.
pub struct Pipeline {
    config: RenderConfig,
    scene: Arc<Scene>,
    camera: Arc<Camera>,
    film: Arc<Mutex<Film>>,
    integrator: Arc<dyn Integrator>,
    stop: Arc<AtomicBool>,
}

/// Read-only state shared by every tile task of one run.
struct TileRenderer {
    scene: Arc<Scene>,
    camera: Arc<Camera>,
    integrator: Arc<dyn Integrator>,
    film: Arc<Mutex<Film>>,
    stop: Arc<AtomicBool>,
    samples_per_pixel: u32,
    seed: Option<u64>,
    width: u32,
    height: u32,
}

impl TileRenderer {
    /// Primary ray through a random point inside pixel (x, y).
    fn camera_ray(&self, x: u32, y: u32, sampler: &mut Sampler) -> Ray {
        let jitter = Vec2::new(sampler.next_f32(), sampler.next_f32());
        let uv = (Vec2::new(x as f32, y as f32) + jitter) / Vec2::new(self.width as f32, self.height as f32);
        self.camera.generate_ray_from_uv(uv)
    }

    fn sampler_for(&self, stream: u64) -> Sampler {
        match self.seed {
            Some(seed) => Sampler::for_stream(seed, stream),
            None => Sampler::from_entropy(),
        }
    }

    /// Average `samples_per_pixel` estimates for one pixel into `film` at
    /// (fx, fy). Returns how many non-finite estimates were dropped.
    fn render_pixel(&self, x: u32, y: u32, film: &mut Film, fx: u32, fy: u32, sampler: &mut Sampler) -> u32 {
        let mut dropped = 0;
        for _ in 0..self.samples_per_pixel {
            let ray = self.camera_ray(x, y, sampler);
            let li = self.integrator.radiance(&self.scene, &ray, sampler);
            if li.is_finite() {
                film.average_radiance(fx, fy, li);
            } else {
                dropped += 1;
            }
        }
        dropped
    }

    fn render_tile(&self, tile: &Tile) {
        let mut sampler = self.sampler_for(tile.index as u64);
        let mut local = Film::new(tile.width, tile.height);
        let mut dropped = 0;

        for (x, y) in tile.pixels() {
            if self.stop.load(Ordering::Relaxed) {
                log::debug!("Tile {} cancelled", tile.index);
                break;
            }
            dropped += self.render_pixel(x, y, &mut local, x - tile.x, y - tile.y, &mut sampler);
        }

        if dropped > 0 {
            log::warn!("Tile {} dropped {} non-finite samples", tile.index, dropped);
        }
        self.film.lock().write_tile(tile, &local);
        log::trace!("Tile {} done", tile.index);
    }
}

impl Pipeline {
    /// A pipeline over the demo scene with default settings.
    pub fn new(width: u32, height: u32, samples_per_pixel: u32) -> Self {
        Self::with_config(RenderConfig {
            width,
            height,
            samples_per_pixel,
            ..RenderConfig::default()
        })
    }

    /// A pipeline over the demo scene, seen from (0, 0, 5) looking down -Z
    /// with a 90 degree field of view.
    pub fn with_config(config: RenderConfig) -> Self {
        let camera = Camera::new().with_aspect_ratio(config.aspect_ratio());
        let mut scene = Scene::demo();
        scene.build_bvh(config.bvh_leaf_size);

        Self {
            film: Arc::new(Mutex::new(Film::new(config.width, config.height))),
            integrator: config.build_integrator(),
            scene: Arc::new(scene),
            camera: Arc::new(camera),
            stop: Arc::new(AtomicBool::new(false)),
            config,
        }
    }

    /// Replace the scene, building its BVH if it has none.
    pub fn with_scene(mut self, mut scene: Scene) -> Self {
        if !scene.has_bvh() {
            scene.build_bvh(self.config.bvh_leaf_size);
        }
        self.scene = Arc::new(scene);
        self
    }

    pub fn with_camera(mut self, camera: Camera) -> Self {
        self.camera = Arc::new(camera);
        self
    }

    pub fn with_integrator(mut self, integrator: Arc<dyn Integrator>) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn scene(&self) -> &Arc<Scene> {
        &self.scene
    }

    pub fn camera(&self) -> &Arc<Camera> {
        &self.camera
    }

    /// Shared film the tile tasks write into.
    pub fn film(&self) -> &Arc<Mutex<Film>> {
        &self.film
    }

    /// Ask in-flight tiles to stop at the next pixel. Tiles that have not
    /// started yet finish immediately.
    pub fn cancel(&self) {
        log::info!("Render cancelled");
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    fn tile_renderer(&self) -> Arc<TileRenderer> {
        Arc::new(TileRenderer {
            scene: self.scene.clone(),
            camera: self.camera.clone(),
            integrator: self.integrator.clone(),
            film: self.film.clone(),
            stop: self.stop.clone(),
            samples_per_pixel: self.config.samples_per_pixel,
            seed: self.config.seed,
            width: self.config.width,
            height: self.config.height,
        })
    }

    /// Enqueue one task per tile and a final task that runs `on_complete`
    /// with the finished film once every tile has retired.
    ///
    /// Returns the handle of the final task. Nothing runs until workers
    /// drain `queue`.
    pub fn run<F>(&self, queue: &TaskQueue, on_complete: F) -> TaskHandle
    where
        F: FnOnce(&Film) + Send + 'static,
    {
        let tiles = generate_tiles(self.config.width, self.config.height, self.config.tile_size);
        log::info!(
            "Rendering {}x{} at {} spp in {} tiles",
            self.config.width,
            self.config.height,
            self.config.samples_per_pixel,
            tiles.len()
        );

        let renderer = self.tile_renderer();
        let handles: Vec<TaskHandle> = tiles
            .into_iter()
            .map(|tile| {
                let renderer = renderer.clone();
                queue.enqueue(move || renderer.render_tile(&tile))
            })
            .collect();

        let film = self.film.clone();
        let started = Instant::now();
        queue.enqueue_after(
            move || {
                log::info!("All tiles finished in {:.2?}", started.elapsed());
                let film = film.lock();
                on_complete(&film);
            },
            &handles,
        )
    }

    /// Render the whole frame on a private worker pool and return a copy
    /// of the film.
    pub fn render(&self) -> RenderResult<Film> {
        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::new(queue.clone(), self.config.workers())?;
        log::info!("Using {} worker threads", pool.len());

        self.run(&queue, |_| {});
        pool.shutdown();

        Ok(self.film.lock().clone())
    }

    /// Render one pixel synchronously on the calling thread, store it in
    /// the film, and return its averaged radiance.
    pub fn single_pixel(&self, x: u32, y: u32) -> Color {
        let renderer = self.tile_renderer();
        let stream = y as u64 * self.config.width as u64 + x as u64;
        let mut sampler = renderer.sampler_for(stream);

        let mut film = self.film.lock();
        let dropped = renderer.render_pixel(x, y, &mut film, x, y, &mut sampler);
        if dropped > 0 {
            log::warn!("Pixel ({}, {}) dropped {} non-finite samples", x, y, dropped);
        }
        let li = film.radiance(x, y);
        log::info!("Pixel ({}, {}) = ({:.4}, {:.4}, {:.4})", x, y, li.x, li.y, li.z);
        li
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntegratorKind;
    use crate::scene::SkyLight;
    use std::sync::mpsc;

    fn small_config(workers: usize) -> RenderConfig {
        RenderConfig {
            width: 24,
            height: 18,
            samples_per_pixel: 2,
            tile_size: 8,
            worker_count: Some(workers),
            seed: Some(1234),
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_render_fills_every_pixel() {
        let pipeline = Pipeline::with_config(small_config(2));
        let film = pipeline.render().unwrap();

        assert_eq!((film.width(), film.height()), (24, 18));
        for y in 0..18 {
            for x in 0..24 {
                assert_eq!(film.sample_count(x, y), 2);
                assert!(film.radiance(x, y).is_finite());
            }
        }
        // The demo scene is lit by a white sky, so something must be bright
        assert!(film.as_rgb_f32().iter().any(|&c| c > 0.0));
    }

    #[test]
    fn test_seeded_render_is_independent_of_worker_count() {
        for kind in [IntegratorKind::Path, IntegratorKind::PathTrace, IntegratorKind::Kajiya] {
            let config = |workers| RenderConfig {
                integrator: kind,
                ..small_config(workers)
            };
            let one = Pipeline::with_config(config(1)).render().unwrap();
            let many = Pipeline::with_config(config(8)).render().unwrap();
            assert_eq!(one, many);
        }
    }

    #[test]
    fn test_barrier_runs_after_all_tiles() {
        let pipeline = Pipeline::with_config(small_config(4));
        let queue = Arc::new(TaskQueue::new());
        let pool = WorkerPool::new(queue.clone(), 4).unwrap();

        let (tx, rx) = mpsc::channel();
        pipeline.run(&queue, move |film| {
            let complete = (0..film.height())
                .all(|y| (0..film.width()).all(|x| film.sample_count(x, y) == 2));
            tx.send(complete).unwrap();
        });
        pool.shutdown();

        assert!(rx.recv().unwrap());
    }

    #[test]
    fn test_cancel_before_run_leaves_film_empty() {
        let pipeline = Pipeline::with_config(small_config(2));
        pipeline.cancel();
        assert!(pipeline.is_cancelled());

        let film = pipeline.render().unwrap();
        assert!(film.as_rgb_f32().iter().all(|&c| c == 0.0));
        assert_eq!(film.sample_count(12, 9), 0);
    }

    #[test]
    fn test_single_pixel_sees_sky() {
        let mut scene = Scene::new();
        scene.set_sky_light(Some(SkyLight::Constant(Color::new(0.5, 0.25, 1.0))));
        let pipeline = Pipeline::with_config(small_config(1)).with_scene(scene);

        let li = pipeline.single_pixel(3, 4);
        assert_eq!(li, Color::new(0.5, 0.25, 1.0));
        assert_eq!(pipeline.film().lock().sample_count(3, 4), 2);
    }

    #[test]
    fn test_center_pixel_of_demo_hits_glass() {
        let config = RenderConfig {
            integrator: IntegratorKind::Direct,
            ..small_config(1)
        };
        let pipeline = Pipeline::with_config(config);
        let ray = pipeline.camera().generate_ray_from_uv(Vec2::splat(0.5));
        let hit = pipeline.scene().intersect(&ray).unwrap();
        assert!(hit.surface.is_delta());
        assert!((hit.t - 4.0).abs() < 1e-4);
    }
}
