//! CLI integration tests
//!
//! Runs the figexport binary against generated figures.

use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use std::path::{Path, PathBuf};

const EPS_FIGURE: &str = "%!PS-Adobe-3.0 EPSF-3.0\n\
%%Creator: plotter\n\
%%BoundingBox: 0 0 200 100\n\
%%DocumentFonts: Arial\n\
%%EndComments\n\
/Arial findfont 10 scalefont setfont\n\
50 20 moveto 100 0 rlineto 0 60 rlineto -100 0 rlineto closepath fill\n\
showpage\n\
%%EOF\n";

fn figexport(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("figexport").unwrap();
    // Keep a local figexport.toml from leaking into the tests
    cmd.current_dir(dir);
    cmd
}

/// 20x10 white figure with a 5x4 red block at (5, 2)
fn write_png(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    let mut img = RgbImage::from_pixel(20, 10, Rgb([255, 255, 255]));
    for y in 2..=5 {
        for x in 5..=9 {
            img.put_pixel(x, y, Rgb([200, 0, 0]));
        }
    }
    img.save(&path).unwrap();
    path
}

#[test]
fn test_help_lists_commands() {
    let temp_dir = tempfile::tempdir().unwrap();
    figexport(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("crop"))
        .stdout(predicate::str::contains("info"));
}

#[test]
fn test_info() {
    let temp_dir = tempfile::tempdir().unwrap();
    figexport(temp_dir.path())
        .arg("info")
        .assert()
        .success()
        .stdout(predicate::str::contains("External Tools:"))
        .stdout(predicate::str::contains("Config File Locations:"))
        .stdout(predicate::str::contains("SVG: not supported"));
}

#[test]
fn test_config_init_and_show() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = temp_dir.path().join("figexport.toml");

    figexport(temp_dir.path())
        .args(["config", "--init", "--path", "figexport.toml"])
        .assert()
        .success();
    assert!(path.is_file());

    // A second init refuses to overwrite
    figexport(temp_dir.path())
        .args(["config", "--init", "--path", "figexport.toml"])
        .assert()
        .failure();

    figexport(temp_dir.path())
        .args(["config", "--show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[export]"))
        .stdout(predicate::str::contains("Loaded from"));
}

#[test]
fn test_config_without_action_prints_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    figexport(temp_dir.path())
        .arg("config")
        .assert()
        .code(2)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("--show"));
}

#[test]
fn test_export_bitmap() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_png(temp_dir.path(), "plot.png");
    let base = temp_dir.path().join("cropped");

    figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(&base)
        .args(["--png", "--bmp", "-p", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cropped.png"));

    let png = image::open(base.with_extension("png")).unwrap();
    assert_eq!((png.width(), png.height()), (9, 8));
    assert!(base.with_extension("bmp").is_file());
}

#[test]
fn test_export_json_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_png(temp_dir.path(), "plot.png");

    let output = figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(temp_dir.path().join("out.png"))
        .arg("--json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["outputs"][0]["format"], "png");
    assert_eq!(report["outputs"][0]["size"], serde_json::json!([5, 4]));
    assert_eq!(report["source_window"]["left"], 5);
}

#[test]
fn test_export_dry_run_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_png(temp_dir.path(), "plot.png");
    let base = temp_dir.path().join("out");

    figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(&base)
        .args(["--tiff", "--dry-run", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"step\": \"load_bitmap\""))
        .stdout(predicate::str::contains("\"step\": \"crop_borders\""));

    assert!(!base.with_extension("tif").exists());
}

#[test]
fn test_export_eps_without_crop() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("figure.eps");
    std::fs::write(&input, EPS_FIGURE).unwrap();
    let base = temp_dir.path().join("patched");

    figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(&base)
        .args(["--eps", "--no-crop"])
        .assert()
        .success();

    let written = std::fs::read_to_string(base.with_extension("eps")).unwrap();
    assert!(written.contains("/Helvetica findfont"));
    assert!(written.contains("%%BoundingBox: 0 0 200 100"));
}

#[test]
fn test_export_eps_crop_with_ghostscript() {
    if which::which("gs").is_err() {
        eprintln!("Ghostscript not installed, skipping");
        return;
    }
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("figure.eps");
    std::fs::write(&input, EPS_FIGURE).unwrap();

    figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(temp_dir.path().join("cropped"))
        .args(["--pdf", "--png"])
        .assert()
        .success();

    assert!(temp_dir.path().join("cropped.pdf").is_file());
    assert!(temp_dir.path().join("cropped.png").is_file());
}

#[test]
fn test_export_missing_input() {
    let temp_dir = tempfile::tempdir().unwrap();
    figexport(temp_dir.path())
        .args(["export", "does-not-exist.eps"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_export_svg_rejected() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_png(temp_dir.path(), "plot.png");

    figexport(temp_dir.path())
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(temp_dir.path().join("out"))
        .arg("--svg")
        .assert()
        .code(2);
}

#[test]
fn test_crop_batch() {
    let temp_dir = tempfile::tempdir().unwrap();
    let a = write_png(temp_dir.path(), "a.png");
    let b = write_png(temp_dir.path(), "b.png");
    let out_dir = temp_dir.path().join("cropped");

    figexport(temp_dir.path())
        .arg("crop")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out_dir)
        .args(["-b", "255,255,255"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Succeeded:    2"));

    for name in ["a.png", "b.png"] {
        let img = image::open(out_dir.join(name)).unwrap();
        assert_eq!((img.width(), img.height()), (5, 4));
    }
}

#[test]
fn test_crop_default_output_name() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_png(temp_dir.path(), "plot.png");

    figexport(temp_dir.path())
        .arg("crop")
        .arg(&input)
        .arg("-q")
        .assert()
        .success();

    assert!(temp_dir.path().join("plot_cropped.png").is_file());
}

#[test]
fn test_crop_missing_input() {
    let temp_dir = tempfile::tempdir().unwrap();
    figexport(temp_dir.path())
        .args(["crop", "missing.png"])
        .assert()
        .code(3);
}

#[test]
fn test_crop_rejects_colliding_outputs() {
    let temp_dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(temp_dir.path().join("left")).unwrap();
    std::fs::create_dir(temp_dir.path().join("right")).unwrap();
    let a = write_png(&temp_dir.path().join("left"), "plot.png");
    let b = write_png(&temp_dir.path().join("right"), "plot.png");
    let out_dir = temp_dir.path().join("out");

    figexport(temp_dir.path())
        .arg("crop")
        .arg(&a)
        .arg(&b)
        .arg("-o")
        .arg(&out_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("would both be written to"));

    assert!(!out_dir.exists());
}
