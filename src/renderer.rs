use crate::camera::Camera;
use crate::math::{ColorRGB, Matrix, Ray, Vec3};
use crate::scene::{LightType, Scene};
use crossterm::style::{self, Stylize};
use std::io::{self, Write};
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

/// Shadow rays start this far along the surface normal to avoid
/// re-intersecting the surface they leave.
pub const SHADOW_BIAS: f32 = 0.01;

// ─── Render Configuration ───────────────────────────────────────────────────

/// What the per-light accumulation contributes to a pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightingMode {
    /// Foreshortening only: white · max(0, n·l).
    ObservedArea,
    /// Incoming irradiance only.
    Radiance,
    /// Material response only.
    Brdf,
    /// radiance · BRDF · cos — the full direct-lighting product.
    Combined,
}

impl LightingMode {
    /// Steps to the next mode, wrapping after [`Combined`](Self::Combined).
    pub fn cycle(&mut self) {
        *self = match self {
            LightingMode::ObservedArea => LightingMode::Radiance,
            LightingMode::Radiance => LightingMode::Brdf,
            LightingMode::Brdf => LightingMode::Combined,
            LightingMode::Combined => LightingMode::ObservedArea,
        };
    }

    pub fn name(self) -> &'static str {
        match self {
            LightingMode::ObservedArea => "observed area",
            LightingMode::Radiance => "radiance",
            LightingMode::Brdf => "BRDF",
            LightingMode::Combined => "combined",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// ANSI 24-bit true-color using full-block characters.
    TrueColor,
    /// Half-block rendering with separate fg/bg colors, 2 vertical pixels
    /// per cell.
    HalfBlock,
    /// ASCII grayscale density ramp.
    Ascii,
}

pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    pub lighting_mode: LightingMode,
    pub shadows_enabled: bool,
    /// Worker count; 0 selects the hardware thread count.
    pub threads: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 160,
            height: 80,
            lighting_mode: LightingMode::Combined,
            shadows_enabled: true,
            threads: 0,
        }
    }
}

// ─── Framebuffer ────────────────────────────────────────────────────────────

/// Linear-RGB pixel storage; quantization to 8 bits happens on display or
/// file export.
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<ColorRGB>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![ColorRGB::BLACK; (width * height) as usize],
        }
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> ColorRGB {
        self.pixels[(y * self.width + x) as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: ColorRGB) {
        self.pixels[(y * self.width + x) as usize] = color;
    }

    /// Dumps the frame as a 24-bit image; the format follows the path's
    /// extension (the interactive host writes `RayTracing_Buffer.bmp`).
    pub fn save(&self, path: impl AsRef<Path>) -> image::ImageResult<()> {
        let mut img = image::RgbImage::new(self.width, self.height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            let (r, g, b) = self.get(x, y).to_rgb8();
            *pixel = image::Rgb([r, g, b]);
        }
        img.save(path.as_ref())?;
        log::info!("saved frame to {}", path.as_ref().display());
        Ok(())
    }
}

// ─── Render Statistics ──────────────────────────────────────────────────────

pub struct RenderStats {
    pub primary_rays: u64,
    pub elapsed_secs: f64,
    pub width: u32,
    pub height: u32,
    pub threads: usize,
}

impl RenderStats {
    pub fn mrays_per_sec(&self) -> f64 {
        self.primary_rays as f64 / self.elapsed_secs / 1e6
    }

    pub fn log_summary(&self) {
        log::info!(
            "rendered {}×{} on {} thread(s) in {:.3}s ({:.2} Mrays/s primary)",
            self.width,
            self.height,
            self.threads,
            self.elapsed_secs,
            self.mrays_per_sec()
        );
    }
}

// ─── Parallel Frame Driver ──────────────────────────────────────────────────

/// Per-frame constants shared read-only by every worker.
#[derive(Clone, Copy)]
struct FrameContext {
    camera_to_world: Matrix,
    camera_origin: Vec3,
    fov_scale: f32,
    aspect: f32,
    width: u32,
    height: u32,
    lighting_mode: LightingMode,
    shadows_enabled: bool,
}

/// Splits `0..total` into at most `workers` contiguous ranges: floor-sized
/// slices with the remainder handed out one pixel per worker from the front.
pub fn partition_pixels(total: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = total / workers;
    let remainder = total % workers;

    let mut ranges = Vec::with_capacity(workers.min(total));
    let mut start = 0;
    for i in 0..workers {
        let len = base + usize::from(i < remainder);
        if len == 0 {
            break;
        }
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

/// Renders one frame. Pixel indices are partitioned into contiguous ranges,
/// one rayon task per range, each writing its disjoint framebuffer slice;
/// the scope is the completion barrier. `threads == 1` renders inline.
pub fn render(scene: &Scene, camera: &mut Camera, config: &RenderConfig) -> (Framebuffer, RenderStats) {
    let ctx = FrameContext {
        camera_to_world: camera.camera_to_world(),
        camera_origin: camera.origin,
        fov_scale: camera.fov_scale(),
        aspect: config.width as f32 / config.height as f32,
        width: config.width,
        height: config.height,
        lighting_mode: config.lighting_mode,
        shadows_enabled: config.shadows_enabled,
    };

    let threads = if config.threads == 0 {
        rayon::current_num_threads()
    } else {
        config.threads
    };

    let mut fb = Framebuffer::new(config.width, config.height);
    let total = fb.pixels.len();
    let start = Instant::now();

    if threads <= 1 {
        render_range(scene, &ctx, 0..total, &mut fb.pixels);
    } else {
        let ranges = partition_pixels(total, threads);
        rayon::scope(|scope| {
            let mut rest: &mut [ColorRGB] = &mut fb.pixels;
            for range in ranges {
                let slice = std::mem::take(&mut rest);
                let (chunk, tail) = slice.split_at_mut(range.len());
                rest = tail;
                let ctx = &ctx;
                scope.spawn(move |_| render_range(scene, ctx, range, chunk));
            }
        });
    }

    let stats = RenderStats {
        primary_rays: total as u64,
        elapsed_secs: start.elapsed().as_secs_f64(),
        width: config.width,
        height: config.height,
        threads,
    };
    (fb, stats)
}

fn render_range(scene: &Scene, ctx: &FrameContext, range: Range<usize>, out: &mut [ColorRGB]) {
    debug_assert_eq!(out.len(), range.len());
    for (slot, index) in out.iter_mut().zip(range) {
        *slot = shade_pixel(scene, ctx, index);
    }
}

/// Casts the primary ray for pixel `index` and accumulates direct lighting.
fn shade_pixel(scene: &Scene, ctx: &FrameContext, index: usize) -> ColorRGB {
    let px = (index as u32 % ctx.width) as f32;
    let py = (index as u32 / ctx.width) as f32;

    let cx = (2.0 * (px + 0.5) / ctx.width as f32 - 1.0) * ctx.aspect * ctx.fov_scale;
    let cy = (1.0 - 2.0 * (py + 0.5) / ctx.height as f32) * ctx.fov_scale;
    let direction = ctx
        .camera_to_world
        .transform_vector(Vec3::new(cx, cy, 1.0))
        .normalized();
    let view_ray = Ray::new(ctx.camera_origin, direction);

    let Some(hit) = scene.closest_hit(&view_ray) else {
        return ColorRGB::BLACK;
    };

    let mut color = ColorRGB::BLACK;
    let shadow_origin = hit.point + hit.normal * SHADOW_BIAS;

    for light in &scene.lights {
        let to_light = light.direction_to(shadow_origin);
        // The squared range couples with the kernels' t² comparison; a
        // directional light has no endpoint to stop at.
        let range = match light.light_type {
            LightType::Point => to_light.magnitude_squared(),
            LightType::Directional => f32::MAX,
        };
        let l = to_light.normalized_or_zero();
        if l == Vec3::ZERO {
            continue;
        }

        if ctx.shadows_enabled && scene.does_hit(&Ray::with_max(shadow_origin, l, range)) {
            continue;
        }

        let observed_area = hit.normal.dot(l).max(0.0);
        match ctx.lighting_mode {
            LightingMode::ObservedArea => color += ColorRGB::WHITE * observed_area,
            LightingMode::Radiance => color += light.radiance(hit.point),
            LightingMode::Brdf => {
                color += scene.materials[hit.material_index as usize].shade(
                    &hit,
                    l,
                    -view_ray.direction,
                )
            }
            LightingMode::Combined => {
                color += light.radiance(hit.point)
                    * scene.materials[hit.material_index as usize].shade(
                        &hit,
                        l,
                        -view_ray.direction,
                    )
                    * observed_area
            }
        }
    }

    color.max_to_one()
}

// ─── Terminal Display Engine ────────────────────────────────────────────────

pub fn display_framebuffer(fb: &Framebuffer, mode: OutputMode) {
    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());

    match mode {
        OutputMode::TrueColor => display_truecolor(&mut out, fb),
        OutputMode::HalfBlock => display_halfblock(&mut out, fb),
        OutputMode::Ascii => display_ascii(&mut out, fb),
    }
    let _ = out.flush();
}

fn display_truecolor(out: &mut impl Write, fb: &Framebuffer) {
    for y in 0..fb.height {
        for x in 0..fb.width {
            let (r, g, b) = fb.get(x, y).to_rgb8();
            let _ = write!(out, "{}", "█".with(style::Color::Rgb { r, g, b }));
        }
        let _ = writeln!(out, "\r");
    }
}

fn display_halfblock(out: &mut impl Write, fb: &Framebuffer) {
    let rows = fb.height / 2;
    for row in 0..rows {
        for x in 0..fb.width {
            let (tr, tg, tb) = fb.get(x, row * 2).to_rgb8();
            let (br, bg, bb) = fb.get(x, row * 2 + 1).to_rgb8();
            let _ = write!(
                out,
                "{}",
                "▀"
                    .with(style::Color::Rgb {
                        r: tr,
                        g: tg,
                        b: tb
                    })
                    .on(style::Color::Rgb {
                        r: br,
                        g: bg,
                        b: bb
                    })
            );
        }
        let _ = writeln!(out, "\r");
    }
}

fn display_ascii(out: &mut impl Write, fb: &Framebuffer) {
    const RAMP: &[u8] = b" .:-=+*#%@";
    for y in 0..fb.height {
        for x in 0..fb.width {
            let c = fb.get(x, y);
            let lum = 0.2126 * c.r + 0.7152 * c.g + 0.0722 * c.b;
            let idx = (lum.clamp(0.0, 0.999) * RAMP.len() as f32) as usize;
            let _ = write!(out, "{}", RAMP[idx] as char);
        }
        let _ = writeln!(out, "\r");
    }
}
