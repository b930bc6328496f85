use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use image::{Rgba, RgbaImage};
use serde_json::Value;
use tempfile::TempDir;

const MANIFEST: &str = r#"
version = 1

[animation]
step = 0.125
max = 0.5
stop_threshold = 0.0625
refresh_interval = "10ms"

[[images]]
name = "checker"

[[images]]
name = "gradient"
file = "gradient.png"
status_style = "default"
"#;

struct Fixture {
    root: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let gallery = root.path().join("gallery");
        fs::create_dir_all(&gallery).unwrap();
        fs::create_dir_all(root.path().join("config")).unwrap();

        RgbaImage::from_fn(16, 8, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 0, 0, 255])
            }
        })
        .save(gallery.join("checker.png"))
        .unwrap();
        RgbaImage::from_fn(16, 8, |x, y| Rgba([(x * 16) as u8, (y * 32) as u8, 128, 255]))
            .save(gallery.join("gradient.png"))
            .unwrap();
        fs::write(gallery.join("gallery.toml"), MANIFEST).unwrap();

        Self { root }
    }

    fn manifest(&self) -> PathBuf {
        self.root.path().join("gallery/gallery.toml")
    }

    fn out(&self) -> PathBuf {
        self.root.path().join("frames")
    }

    fn scrambler(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_scrambler"))
            .env("SCRAMBLER_CONFIG_DIR", self.root.path().join("config"))
            .env("SCRAMBLER_ASSET_DIR", self.root.path().join("unused-assets"))
            .env("RUST_LOG", "warn")
            .arg("--gallery")
            .arg(self.manifest())
            .args(args)
            .output()
            .expect("failed to launch scrambler")
    }
}

fn frames_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "scrambler failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cpu_export_writes_one_frame_per_render() {
    let fixture = Fixture::new();
    let out = fixture.out();
    let output = fixture.scrambler(&[
        "export",
        "--out",
        out.to_str().unwrap(),
        "--backend",
        "cpu",
        "--script",
        "next,animate,frames:3",
    ]);
    assert_success(&output);

    // Initial image, the next press, then three animation ticks.
    assert_eq!(
        frames_in(&out),
        [
            "frame_00000.png",
            "frame_00001.png",
            "frame_00002.png",
            "frame_00003.png",
            "frame_00004.png"
        ]
    );

    let first = image::open(out.join("frame_00000.png")).unwrap().to_rgba8();
    let checker = image::open(fixture.root.path().join("gallery/checker.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(first, checker);

    let second = image::open(out.join("frame_00001.png")).unwrap().to_rgba8();
    let gradient = image::open(fixture.root.path().join("gallery/gradient.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(second, gradient);

    let pixelated = image::open(out.join("frame_00004.png")).unwrap().to_rgba8();
    assert_eq!(pixelated.dimensions(), (16, 8));
    assert_ne!(pixelated, gradient);
}

#[test]
fn cpu_export_respects_frame_limit() {
    let fixture = Fixture::new();
    let out = fixture.out();
    let output = fixture.scrambler(&[
        "export",
        "--out",
        out.to_str().unwrap(),
        "--backend",
        "cpu",
        "--max-frames",
        "4",
    ]);
    assert_success(&output);
    assert_eq!(frames_in(&out).len(), 4);
}

#[test]
fn full_cycle_ends_on_the_unpixelated_image() {
    let fixture = Fixture::new();
    let out = fixture.out();
    let output = fixture.scrambler(&[
        "export",
        "--out",
        out.to_str().unwrap(),
        "--backend",
        "cpu",
        "--script",
        "animate,wait,animate,wait",
    ]);
    assert_success(&output);

    let frames = frames_in(&out);
    assert!(frames.len() > 2, "expected animation frames, got {frames:?}");
    let last = image::open(out.join(frames.last().unwrap()))
        .unwrap()
        .to_rgba8();
    let checker = image::open(fixture.root.path().join("gallery/checker.png"))
        .unwrap()
        .to_rgba8();
    assert_eq!(last, checker);
}

#[test]
fn gallery_listing_reports_styles_as_json() {
    let fixture = Fixture::new();
    let output = fixture.scrambler(&["gallery", "--json"]);
    assert_success(&output);

    let listing: Value = serde_json::from_slice(&output.stdout).unwrap();
    let images = listing["images"].as_array().unwrap();
    assert_eq!(images.len(), 2);
    assert_eq!(images[0]["name"], "checker");
    assert_eq!(images[1]["name"], "gradient");
    assert_eq!(images[1]["width"], 16);
    assert_eq!(images[0]["status_style"], "light-content");
    assert_eq!(images[1]["status_style"], "default");
}

#[test]
fn rejects_unknown_script_steps() {
    let fixture = Fixture::new();
    let out = fixture.out();
    let output = fixture.scrambler(&["export", "--out", out.to_str().unwrap(), "--script", "jump"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown script step"));
}
