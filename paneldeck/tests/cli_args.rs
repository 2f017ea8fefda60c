//! CLI arg parsing and profile resolution tests for the paneldeck binary.
//! Everything runs with `--dry-run` (or `--help`) so no network is touched.

use assert_cmd::Command;

fn run(args: &[&str], config_home: &std::path::Path) -> (bool, String, String) {
    let output = Command::cargo_bin("paneldeck")
        .unwrap()
        .env("XDG_CONFIG_HOME", config_home)
        .args(args)
        .output()
        .expect("run paneldeck");
    (
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
    )
}

#[test]
fn help_mentions_short_and_long_flags() {
    let td = tempfile::tempdir().unwrap();
    let (ok, stdout, stderr) = run(&["--help"], td.path());
    assert!(ok);
    let text = format!("{stdout}{stderr}");
    assert!(
        text.contains("Usage:")
            && text.contains("--profile")
            && text.contains("-P")
            && text.contains("--refresh")
            && text.contains("--demo")
            && text.contains("--dry-run"),
        "help text missing expected flags\n{text}"
    );
}

#[test]
fn dry_run_reports_default_registry() {
    let td = tempfile::tempdir().unwrap();
    let (ok, stdout, _) = run(&["--dry-run"], td.path());
    assert!(ok);
    assert!(stdout.contains("registry: http://localhost:3210"), "{stdout}");
    assert!(stdout.contains("refresh: 15000ms"), "{stdout}");
}

#[test]
fn profile_created_on_first_use() {
    let td = tempfile::tempdir().unwrap();
    let (ok, stdout, _) = run(
        &[
            "--profile",
            "unittest",
            "--refresh",
            "5000",
            "http://example:3210",
            "--dry-run",
        ],
        td.path(),
    );
    assert!(ok);
    assert!(stdout.contains("registry: http://example:3210"), "{stdout}");
    assert!(stdout.contains("refresh: 5000ms"), "{stdout}");

    let data = std::fs::read_to_string(td.path().join("paneldeck/profiles.json"))
        .expect("profiles.json created");
    assert!(data.contains("unittest"), "{data}");
    assert!(data.contains("http://example:3210"), "{data}");
}

#[test]
fn saved_profile_loads_without_url() {
    let td = tempfile::tempdir().unwrap();
    let (ok, _, _) = run(
        &["--profile", "lab", "http://10.0.0.5:3210", "--dry-run"],
        td.path(),
    );
    assert!(ok);

    let (ok, stdout, _) = run(&["--profile", "lab", "--dry-run"], td.path());
    assert!(ok);
    assert!(stdout.contains("registry: http://10.0.0.5:3210"), "{stdout}");
}

#[test]
fn changed_profile_needs_save_flag() {
    let td = tempfile::tempdir().unwrap();
    run(&["--profile", "lab", "http://old:3210", "--dry-run"], td.path());

    // Without --save a dry run must not overwrite.
    run(&["--profile", "lab", "http://new:3210", "--dry-run"], td.path());
    let data = std::fs::read_to_string(td.path().join("paneldeck/profiles.json")).unwrap();
    assert!(data.contains("http://old:3210"), "{data}");

    run(
        &["--profile", "lab", "http://new:3210", "--save", "--dry-run"],
        td.path(),
    );
    let data = std::fs::read_to_string(td.path().join("paneldeck/profiles.json")).unwrap();
    assert!(data.contains("http://new:3210"), "{data}");
}
