use assert_cmd::Command;
use predicates::prelude::*;

fn bin() -> Command {
    Command::cargo_bin("yt-processor").unwrap()
}

#[test]
fn help_lists_commands() {
    bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("transcript"))
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("frames"));
}

#[test]
fn id_resolves_watch_url() {
    bin()
        .args(["id", "https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10s"])
        .assert()
        .success()
        .stdout("dQw4w9WgXcQ\n");
}

#[test]
fn id_resolves_short_url_and_bare_id() {
    bin()
        .args(["id", "https://youtu.be/GAuCQe2qqro"])
        .assert()
        .success()
        .stdout("GAuCQe2qqro\n");

    bin()
        .args(["id", "GAuCQe2qqro"])
        .assert()
        .success()
        .stdout("GAuCQe2qqro\n");
}

#[test]
fn id_rejects_invalid_reference() {
    bin()
        .args(["id", "https://example.com/watch"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid YouTube video ID or URL format"));
}

#[test]
fn unknown_format_is_rejected() {
    bin()
        .args(["transcript", "dQw4w9WgXcQ", "--format", "docx"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"));
}

#[cfg(target_os = "linux")]
#[test]
fn config_show_writes_and_prints_defaults() {
    let home = tempfile::tempdir().unwrap();

    bin()
        .args(["config", "--show"])
        .current_dir(home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env_remove("YT_PROCESSOR_DATABASE_URL")
        .env_remove("YT_PROCESSOR_DATABASE_KEY")
        .assert()
        .success()
        .stdout(predicate::str::contains("Current Configuration"))
        .stdout(predicate::str::contains("Bucket: youtube_frames"))
        .stdout(predicate::str::contains("Database: not configured"));

    assert!(home.path().join("yt-processor").join("config.yaml").exists());
}
