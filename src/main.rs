use std::env;
use std::fs;

use anyhow::{anyhow, Context, Result};
use glam::Vec3;

use furniture_ar::{
    ArViewer, FrameSnapshot, HeadlessSession, ModelAsset, Scene, SummaryRenderer, ToggleOutcome,
    Transform, ViewerConfig, ViewerPose,
};

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}

fn run() -> Result<()> {
    let options = CliOptions::parse()?;
    let xml = fs::read_to_string(&options.path)
        .with_context(|| format!("failed to read config {}", options.path))?;
    let config = ViewerConfig::from_xml(&xml).context("failed to parse viewer config")?;

    println!(
        "Loaded catalog with {} models (video: {:?}, hit-test: {})",
        config.models.len(),
        config.session.video,
        if config.session.require_hit_test {
            "required"
        } else {
            "optional"
        }
    );
    for model in &config.models {
        println!(" - {} ({}) scale={:.3}", model.name, model.path, model.scale);
    }

    if options.summary_only {
        return Ok(());
    }
    simulate(config, &options)
}

/// Drives one scripted session: a viewer standing 1.6m tall looking at a
/// floor hit one metre ahead.
fn simulate(config: ViewerConfig, options: &CliOptions) -> Result<()> {
    let mut viewer: ArViewer<HeadlessSession> = ArViewer::new(config);
    viewer.set_platform_support(true);
    let names: Vec<String> = viewer
        .catalog()
        .entries()
        .iter()
        .map(|entry| entry.name.clone())
        .collect();
    for (index, name) in names.into_iter().enumerate() {
        viewer.model_loaded(index, ModelAsset::empty(name))?;
    }
    viewer
        .select_model(options.select)
        .context("invalid --select index")?;

    match viewer.toggle_session() {
        ToggleOutcome::Start(init) => {
            println!(
                "Requesting session (required: [{}], optional: [{}])",
                init.required_features.join(", "),
                init.optional_features.join(", ")
            );
        }
        other => return Err(anyhow!("unexpected toggle outcome: {other:?}")),
    }
    viewer.session_started(HeadlessSession::new(), None, true)?;

    let frame = FrameSnapshot::default()
        .with_pose(ViewerPose {
            transform: Transform::from_translation(Vec3::new(0.0, 1.6, 0.0)),
            views: Vec::new(),
        })
        .with_hit(Transform::from_translation(Vec3::new(0.0, 0.0, -1.0)));
    let mut renderer = SummaryRenderer::default();
    for _ in 0..options.frames {
        let delivered = viewer
            .session_mut()
            .and_then(HeadlessSession::take_frame)
            .is_some();
        if !delivered {
            break;
        }
        viewer.on_frame(&frame, &mut renderer);
    }
    println!("Rendered {} frame(s)", renderer.frames);

    match viewer.place_selected() {
        Some(id) => {
            let name = viewer
                .scene()
                .object(id)
                .map(|object| object.name.clone())
                .unwrap_or_default();
            println!("Placed {name} as object #{}", id.0);
        }
        None => println!("Nothing placed"),
    }
    print_final_state(viewer.scene());

    viewer.toggle_session();
    viewer.on_session_end();
    println!("Session ended (state: {})", viewer.state());
    Ok(())
}

fn print_final_state(scene: &Scene) {
    println!("Final object states:");
    for object in &scene.objects {
        let t = object.transform.translation;
        println!(
            " - #{} {} pos=({:.2}, {:.2}, {:.2}) scale={:.3}",
            object.id.0, object.name, t.x, t.y, t.z, object.transform.scale.x
        );
    }
}

struct CliOptions {
    path: String,
    frames: u32,
    select: usize,
    summary_only: bool,
}

impl CliOptions {
    const USAGE: &'static str =
        "Usage: furniture-ar <viewer.xml> [--frames N] [--select INDEX] [--summary-only]";

    fn parse() -> Result<Self> {
        let mut args = env::args().skip(1);
        let Some(path) = args.next() else {
            return Err(anyhow!(Self::USAGE));
        };
        let mut options = Self {
            path,
            frames: 3,
            select: 0,
            summary_only: false,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--summary-only" => options.summary_only = true,
                "--frames" => {
                    let value = args.next().ok_or_else(|| anyhow!("--frames needs a value"))?;
                    options.frames = value
                        .parse()
                        .with_context(|| format!("invalid frame count `{value}`"))?;
                }
                "--select" => {
                    let value = args.next().ok_or_else(|| anyhow!("--select needs a value"))?;
                    options.select = value
                        .parse()
                        .with_context(|| format!("invalid model index `{value}`"))?;
                }
                other => {
                    return Err(anyhow!("Unknown argument: {other}. {}", Self::USAGE));
                }
            }
        }
        Ok(options)
    }
}
