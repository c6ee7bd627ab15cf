use std::io::Write;
use std::path::Path;
use std::process::{Command, Output};

fn pgm_histo(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pgm-histo"))
        .args(args)
        .env("PGM_HISTO_CONFIG", dir.join("no-config.toml"))
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_image(dir: &Path, name: &str, header: &str, pixels: &[u8]) -> String {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(header.as_bytes()).unwrap();
    f.write_all(pixels).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn writes_csv_histogram() {
    let dir = tempfile::tempdir().unwrap();
    let mut pixels = [0u8; 16];
    pixels[0] = 7;
    pixels[15] = 7;
    let image = write_image(dir.path(), "a.pgm", "P5\n4 4\n255\n", &pixels);
    let out = dir.path().join("hist.csv");
    let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), "4", "--verify"]);
    assert!(res.status.success(), "{}", String::from_utf8_lossy(&res.stderr));
    let text = std::fs::read_to_string(&out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 256);
    assert_eq!(lines[0], "0,14");
    assert_eq!(lines[7], "7,2");
    assert_eq!(lines[255], "255,0");
    assert!(text.ends_with('\n'));
}

#[test]
fn bad_thread_count_falls_back_to_one() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "a.pgm", "P5\n2 1\n3\n", &[1, 3]);
    let out = dir.path().join("hist.csv");
    for threads in ["zero", "-5", "0"] {
        let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), threads]);
        assert!(res.status.success(), "thread count {threads}");
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "0,0\n1,1\n2,0\n3,1\n");
    }
}

#[test]
fn json_format() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "a.pgm", "P5\n1 2\n1\n", &[1, 1]);
    let out = dir.path().join("hist.json");
    let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), "2", "--format", "json"]);
    assert!(res.status.success());
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.contains("\"counts\""));
    assert!(text.contains("\"workers\""));
}

#[test]
fn wrong_argument_count_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let res = pgm_histo(dir.path(), &["only-one"]);
    assert!(!res.status.success());
    assert!(String::from_utf8_lossy(&res.stderr).contains("Usage"));
}

#[test]
fn invalid_header_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "bad.pgm", "P2\n1 1\n255\n", &[0]);
    let out = dir.path().join("hist.csv");
    let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), "2"]);
    assert_eq!(res.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&res.stderr).contains("Invalid PGM header."));
    assert!(!out.exists());
}

#[test]
fn sixteen_bit_image_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "deep.pgm", "P5\n1 1\n65535\n", &[0, 0]);
    let out = dir.path().join("hist.csv");
    let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), "2"]);
    assert_eq!(res.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&res.stderr).contains("maxval <= 255"));
    assert!(!out.exists());
}

#[test]
fn truncated_image_lenient_succeeds_strict_fails() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_image(dir.path(), "short.pgm", "P5\n4 4\n255\n", &[2; 6]);
    let out = dir.path().join("hist.csv");
    let res = pgm_histo(dir.path(), &[&image, out.to_str().unwrap(), "4"]);
    assert!(res.status.success());
    let text = std::fs::read_to_string(&out).unwrap();
    assert_eq!(text.lines().nth(2), Some("2,6"));

    let strict_out = dir.path().join("strict.csv");
    let res = pgm_histo(
        dir.path(),
        &[&image, strict_out.to_str().unwrap(), "4", "--strict"],
    );
    assert!(!res.status.success());
    assert!(!strict_out.exists());
}
