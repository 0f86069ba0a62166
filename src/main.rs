//! # lumen-cli
//!
//! A CPU ray tracer built around three pieces of machinery:
//!
//! - **BVH engine**: a linear-array hierarchy with SAH construction,
//!   bottom-up refit for rigid transforms, and iterative front-to-back
//!   traversal over a fixed stack.
//! - **Intersection kernels**: analytic sphere/plane tests and
//!   Möller–Trumbore triangles with cull modes that invert for shadow rays.
//! - **Tile-parallel driver**: one primary ray per pixel, the pixel-index
//!   range partitioned across hardware threads, direct lighting from point
//!   and directional lights with optional shadow rays.
//!
//! Frames land in the terminal (true-color, half-block, or ASCII) and can
//! be dumped to a 24-bit BMP. The interactive mode drives the camera with
//! WASD + arrow keys and re-renders continuously, refitting mesh BVHs as
//! the geometry spins.

mod bvh;
mod camera;
mod geometry;
mod material;
mod math;
mod mesh;
mod presets;
mod renderer;
mod scene;

use camera::CameraInput;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Stylize;
use crossterm::{cursor, execute, terminal};
use presets::{SceneDescription, ScenePreset};
use renderer::{display_framebuffer, render, LightingMode, OutputMode, RenderConfig};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// File name of the interactive frame dump.
const FRAME_DUMP_PATH: &str = "RayTracing_Buffer.bmp";

/// lumen-cli — a BVH-accelerated direct-lighting ray tracer
#[derive(Parser, Debug)]
#[command(
    name = "lumen-cli",
    version,
    about = "A BVH-accelerated CPU ray tracer with physically-based direct lighting 🦀",
    long_about = "Casts one primary ray per pixel against spheres, planes, and \
                  BVH-accelerated triangle meshes, then evaluates direct lighting \
                  (Lambert, Phong, Cook-Torrance) from point and directional lights \
                  with optional shadow rays.",
    after_help = "EXAMPLES:\n  \
                  lumen-cli --scene reference --mode halfblock\n  \
                  lumen-cli --scene mesh --interactive\n  \
                  lumen-cli --obj bunny.obj --lighting observed-area\n  \
                  lumen-cli --scene stress --width 240 --height 120 --output frame.bmp\n\n\
                  INTERACTIVE KEYS:\n  \
                  WASD move · arrow keys look · F2 toggle shadows · F3 cycle lighting\n  \
                  P dump frame to RayTracing_Buffer.bmp · Q / Esc quit"
)]
struct Cli {
    /// Scene preset to render
    #[arg(short, long, value_enum, default_value_t = ScenePreset::Reference)]
    scene: ScenePreset,

    /// Render an OBJ mesh instead of a preset (vertices + triangle faces)
    #[arg(long, value_name = "FILE")]
    obj: Option<PathBuf>,

    /// Framebuffer width in pixels
    #[arg(short = 'W', long, default_value_t = 160)]
    width: u32,

    /// Framebuffer height in pixels
    #[arg(short = 'H', long, default_value_t = 80)]
    height: u32,

    /// Terminal output encoding mode
    #[arg(short, long, value_enum, default_value_t = CliOutputMode::Halfblock)]
    mode: CliOutputMode,

    /// Which part of the lighting equation to display
    #[arg(short, long, value_enum, default_value_t = CliLightingMode::Combined)]
    lighting: CliLightingMode,

    /// Disable shadow rays
    #[arg(long)]
    no_shadows: bool,

    /// Worker thread count (0 = hardware concurrency)
    #[arg(short, long, default_value_t = 0)]
    threads: usize,

    /// Also write the frame to an image file (format from extension)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Re-render continuously with keyboard camera controls
    #[arg(short, long)]
    interactive: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputMode {
    /// Full-block characters with 24-bit true color
    Truecolor,
    /// Half-block characters (▀), 2 vertical pixels per cell
    Halfblock,
    /// ASCII grayscale density ramp
    Ascii,
}

impl From<CliOutputMode> for OutputMode {
    fn from(m: CliOutputMode) -> Self {
        match m {
            CliOutputMode::Truecolor => OutputMode::TrueColor,
            CliOutputMode::Halfblock => OutputMode::HalfBlock,
            CliOutputMode::Ascii => OutputMode::Ascii,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliLightingMode {
    /// Foreshortening term only
    ObservedArea,
    /// Incoming irradiance only
    Radiance,
    /// Material BRDF only
    Brdf,
    /// Full direct-lighting product
    Combined,
}

impl From<CliLightingMode> for LightingMode {
    fn from(m: CliLightingMode) -> Self {
        match m {
            CliLightingMode::ObservedArea => LightingMode::ObservedArea,
            CliLightingMode::Radiance => LightingMode::Radiance,
            CliLightingMode::Brdf => LightingMode::Brdf,
            CliLightingMode::Combined => LightingMode::Combined,
        }
    }
}

fn print_header(desc: &SceneDescription, config: &RenderConfig) {
    eprintln!();
    eprintln!("  lumen-cli — BVH ray tracer");
    eprintln!("  Scene:      {}", desc.name);
    eprintln!("  Resolution: {}×{}", config.width, config.height);
    eprintln!("  Lighting:   {}", config.lighting_mode.name());
    eprintln!(
        "  Shadows:    {}",
        if config.shadows_enabled { "on" } else { "off" }
    );
    eprintln!();
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let mut desc = match &cli.obj {
        Some(path) => match presets::build_obj_scene(path) {
            Ok(desc) => desc,
            Err(err) => {
                log::error!("{err}");
                std::process::exit(1);
            }
        },
        None => cli.scene.build(),
    };

    let mut config = RenderConfig {
        width: cli.width,
        height: cli.height,
        lighting_mode: cli.lighting.into(),
        shadows_enabled: !cli.no_shadows,
        threads: cli.threads,
    };
    let mode: OutputMode = cli.mode.into();

    if cli.interactive {
        if let Err(err) = run_interactive(&mut desc, &mut config, mode) {
            log::error!("interactive session failed: {err}");
            std::process::exit(1);
        }
        return;
    }

    print_header(&desc, &config);

    let (fb, stats) = render(&desc.scene, &mut desc.camera, &config);
    stats.log_summary();
    display_framebuffer(&fb, mode);
    eprintln!(
        "  {:.2}s | {:.2} Mrays/s primary | {} thread(s)",
        stats.elapsed_secs,
        stats.mrays_per_sec(),
        stats.threads
    );

    if let Some(path) = &cli.output {
        if let Err(err) = fb.save(path) {
            log::error!("failed to save frame: {err}");
            std::process::exit(1);
        }
    }
}

// ─── Interactive Host ───────────────────────────────────────────────────────

fn run_interactive(
    desc: &mut SceneDescription,
    config: &mut RenderConfig,
    mode: OutputMode,
) -> io::Result<()> {
    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;

    let result = interactive_loop(&mut stdout, desc, config, mode);

    execute!(stdout, cursor::Show, terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn interactive_loop(
    stdout: &mut io::Stdout,
    desc: &mut SceneDescription,
    config: &mut RenderConfig,
    mode: OutputMode,
) -> io::Result<()> {
    let mut last_frame = Instant::now();
    let mut spin = 0.0f32;

    loop {
        // Long stalls (window hidden, debugger) must not teleport the camera.
        let dt = last_frame.elapsed().as_secs_f32().min(0.1);
        last_frame = Instant::now();

        // Meshes spin in place; the per-frame transform change exercises the
        // re-bake + refit path instead of a rebuild.
        spin += dt * 0.5;
        for scene_mesh in &mut desc.scene.meshes {
            scene_mesh.mesh.set_rotation_y(spin);
            scene_mesh.update_transforms();
        }

        let (fb, stats) = render(&desc.scene, &mut desc.camera, config);

        execute!(stdout, cursor::MoveTo(0, 0))?;
        display_framebuffer(&fb, mode);
        let status = format!(
            " {} | lighting: {} | shadows: {} | {:4.1} fps ",
            desc.name,
            config.lighting_mode.name(),
            if config.shadows_enabled { "on" } else { "off" },
            1.0 / stats.elapsed_secs.max(1e-6)
        );
        write!(stdout, "{}\r\n", status.dim())?;
        stdout.flush()?;

        let mut input = CameraInput::default();
        if event::poll(Duration::from_millis(15))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Release {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Char('w') => input.walk += 1.0,
                    KeyCode::Char('s') => input.walk -= 1.0,
                    KeyCode::Char('d') => input.strafe += 1.0,
                    KeyCode::Char('a') => input.strafe -= 1.0,
                    KeyCode::Right => input.yaw += 1.0,
                    KeyCode::Left => input.yaw -= 1.0,
                    KeyCode::Up => input.pitch -= 1.0,
                    KeyCode::Down => input.pitch += 1.0,
                    KeyCode::F(2) | KeyCode::Char('h') => {
                        config.shadows_enabled = !config.shadows_enabled;
                    }
                    KeyCode::F(3) | KeyCode::Char('l') => config.lighting_mode.cycle(),
                    KeyCode::Char('p') => {
                        if let Err(err) = fb.save(FRAME_DUMP_PATH) {
                            log::error!("frame dump failed: {err}");
                        }
                    }
                    _ => {}
                }
            }
        }

        // Key-repeat cadence is uneven; scale by a fixed step so motion
        // feels constant per press.
        desc.camera.update(&input, dt.max(1.0 / 30.0));
    }
}
