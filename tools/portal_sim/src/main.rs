mod sim;

use std::env;
use std::path::PathBuf;

use passage_portal::config::SceneConfig;
use tracing::info;

use sim::Simulation;

fn main() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let mut scene_path: Option<PathBuf> = None;
    let mut fps: u32 = 60;
    let mut duration_s: f32 = 8.0;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--scene" => {
                let Some(value) = args.next() else {
                    eprintln!("--scene expects a path argument");
                    std::process::exit(2);
                };
                scene_path = Some(PathBuf::from(value));
            }
            "--fps" => {
                let Some(value) = args.next() else {
                    eprintln!("--fps expects a numeric argument");
                    std::process::exit(2);
                };
                match value.parse::<u32>() {
                    Ok(parsed) if parsed > 0 => fps = parsed,
                    Ok(_) => {
                        eprintln!("--fps must be positive");
                        std::process::exit(2);
                    }
                    Err(err) => {
                        eprintln!("invalid fps '{value}': {err}");
                        std::process::exit(2);
                    }
                }
            }
            "--duration" => {
                let Some(value) = args.next() else {
                    eprintln!("--duration expects a number of seconds");
                    std::process::exit(2);
                };
                match value.parse::<f32>() {
                    Ok(parsed) if parsed.is_finite() && parsed >= 0.0 => duration_s = parsed,
                    _ => {
                        eprintln!("invalid duration '{value}'");
                        std::process::exit(2);
                    }
                }
            }
            "--help" | "-h" => {
                println!("Usage: portal_sim --scene <path> [--fps <u32>] [--duration <secs>]");
                return;
            }
            other => {
                eprintln!("unknown argument: {other}");
                std::process::exit(2);
            }
        }
    }

    let Some(scene_path) = scene_path else {
        eprintln!("Usage: portal_sim --scene <path> [--fps <u32>] [--duration <secs>]");
        std::process::exit(2);
    };

    let scene = match SceneConfig::load(&scene_path) {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("portal_sim error: {err}");
            std::process::exit(1);
        }
    };
    let mut sim = match Simulation::new(&scene) {
        Ok(sim) => sim,
        Err(err) => {
            eprintln!("portal_sim error: {err}");
            std::process::exit(1);
        }
    };

    let dt_s = 1.0 / fps as f32;
    let frames = (duration_s * fps as f32).ceil() as u64;
    info!("Simulating {frames} frames at {fps} fps");
    for _ in 0..frames {
        sim.step(dt_s);
    }

    let summary = sim.summary();
    println!("Frames: {}", summary.frames);
    println!("Elapsed: {:.3}s", summary.elapsed_s);
    println!("Views rendered: {}", summary.views_rendered);
    println!("Teleports: {}", summary.teleports);
    for record in sim.teleports() {
        println!(
            "  {:.3}s {} -> {}: ({:.2}, {:.2}, {:.2}) -> ({:.2}, {:.2}, {:.2})",
            record.time_s,
            record.from,
            record.to,
            record.from_position.x,
            record.from_position.y,
            record.from_position.z,
            record.to_position.x,
            record.to_position.y,
            record.to_position.z
        );
    }
    let end = summary.final_position;
    println!("Final position: ({:.2}, {:.2}, {:.2})", end.x, end.y, end.z);
}
