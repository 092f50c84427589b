use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn linetally_bin() -> &'static str {
    env!("CARGO_BIN_EXE_linetally")
}

fn write_file(path: &Path, contents: &str) {
    fs::write(path, contents).expect("failed to write test file");
}

#[test]
fn cli_counts_a_single_file() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let file = temp_dir.path().join("sample.txt");
    write_file(&file, "one\ntwo\nthree\n");

    let output = Command::new(linetally_bin())
        .arg(&file)
        .output()
        .expect("failed to execute linetally");

    assert!(
        output.status.success(),
        "expected success, got status {:?}, stderr: {}",
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains(&format!("3 {}", file.display())),
        "stdout missing per-file count: {stdout}"
    );
    assert!(
        stdout.contains("3 total"),
        "stdout missing the total line: {stdout}"
    );
}

#[test]
fn cli_version_flag_prints_and_exits_cleanly() {
    let output = Command::new(linetally_bin())
        .arg("--version")
        .output()
        .expect("failed to execute linetally");

    assert!(output.status.success(), "version flag must exit zero");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("linetally"),
        "version output missing tool name: {stdout}"
    );
    assert!(
        stdout.contains(env!("CARGO_PKG_VERSION")),
        "version output missing version string: {stdout}"
    );
}

#[test]
fn cli_requires_at_least_one_file() {
    let output = Command::new(linetally_bin())
        .output()
        .expect("failed to execute linetally");

    assert!(
        !output.status.success(),
        "running without file arguments must fail"
    );
}

#[test]
fn cli_skips_directories_with_a_diagnostic() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let file = temp_dir.path().join("real.txt");
    write_file(&file, "a\nb\n");
    let sub_dir = temp_dir.path().join("sub");
    fs::create_dir(&sub_dir).expect("failed to create sub directory");

    let output = Command::new(linetally_bin())
        .arg(&file)
        .arg(&sub_dir)
        .output()
        .expect("failed to execute linetally");

    assert!(
        output.status.success(),
        "a skipped directory must not abort the run"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&sub_dir.display().to_string()),
        "stderr missing skip diagnostic: {stderr}"
    );
    assert!(
        stdout.contains("2 total"),
        "total must cover only the regular file: {stdout}"
    );
    assert!(
        !stdout.contains(&sub_dir.display().to_string()),
        "skipped path must not appear in the counts: {stdout}"
    );
}

#[cfg(unix)]
#[test]
fn cli_unreadable_file_reports_error_and_exits_one() {
    use std::fs::File;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let file = temp_dir.path().join("locked.txt");
    write_file(&file, "a\nb\n");
    let mut permissions = fs::metadata(&file)
        .expect("failed to stat test file")
        .permissions();
    permissions.set_mode(0o000);
    fs::set_permissions(&file, permissions).expect("failed to chmod test file");

    // Root bypasses permission bits; nothing to verify in that case.
    if File::open(&file).is_ok() {
        return;
    }

    let output = Command::new(linetally_bin())
        .arg(&file)
        .output()
        .expect("failed to execute linetally");

    assert_eq!(
        output.status.code(),
        Some(1),
        "an open failure on a regular file is fatal"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Error:"),
        "fatal failures must be reported as Error: on stderr: {stderr}"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        !stdout.contains(" total"),
        "an aborted run must not print a total: {stdout}"
    );
}

#[test]
fn cli_nonexistent_path_alone_still_totals_zero() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let missing = temp_dir.path().join("missing.txt");

    let output = Command::new(linetally_bin())
        .arg(&missing)
        .output()
        .expect("failed to execute linetally");

    assert!(
        output.status.success(),
        "a skipped path alone is still a valid, empty run"
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("0 total"),
        "empty run must print a zero total: {stdout}"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(&missing.display().to_string()),
        "stderr missing skip diagnostic: {stderr}"
    );
}
