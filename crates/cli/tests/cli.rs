use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a config that keeps every file inside `dir` and never needs a secret
fn write_config(dir: &TempDir, feeds: &[(&str, &str)]) -> PathBuf {
    let mut content = format!(
        "[general]\ndatabase_path = \"{}\"\n\n[llm]\nprovider = \"stub\"\n\n[telegram]\nchannel_id = \"@courier_test\"\n",
        toml_path(&dir.path().join("courier.sqlite"))
    );
    for (name, url) in feeds {
        content.push_str(&format!(
            "\n[[feeds]]\nname = \"{}\"\nurl = \"{}\"\n",
            name, url
        ));
    }

    let path = dir.path().join("config.toml");
    fs::write(&path, content).expect("write config");
    path
}

fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

#[test]
fn config_init_writes_example_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .success();

    let content = fs::read_to_string(&config_path).expect("read config");
    assert!(content.contains("[telegram]"));
    assert!(content.contains("[[feeds]]"));
}

#[test]
fn config_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "# mine\n").expect("write config");

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.args(["config", "init", "--path"])
        .arg(&config_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "# mine\n");
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().expect("temp dir");

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["feeds", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn feeds_list_seeds_empty_database() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(
        &dir,
        &[
            ("Example", "https://example.com/feed.xml"),
            ("Other", "https://other.example/atom"),
        ],
    );

    let mut cmd = cargo_bin_cmd!("courier");
    let output = cmd
        .arg("--config")
        .arg(&config_path)
        .args(["feeds", "list", "--json"])
        .output()
        .expect("run feeds list");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let feeds = value.as_array().expect("array of feeds");
    assert_eq!(feeds.len(), 2);
    let urls: Vec<&str> = feeds.iter().filter_map(|f| f["url"].as_str()).collect();
    assert!(urls.contains(&"https://example.com/feed.xml"));
    assert!(urls.contains(&"https://other.example/atom"));
    assert!(dir.path().join("courier.sqlite").exists());
}

#[test]
fn run_once_with_outbox_and_no_feeds_succeeds() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &[]);
    let outbox = dir.path().join("outbox.jsonl");

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.arg("--config")
        .arg(&config_path)
        .args(["run", "--once", "--require-approval", "--outbox"])
        .arg(&outbox)
        .assert()
        .success();

    assert!(outbox.exists());
    assert_eq!(fs::read_to_string(&outbox).unwrap(), "");
}

#[test]
fn run_without_bot_token_fails() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &[]);

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.env_remove("TELEGRAM_BOT_TOKEN")
        .arg("--config")
        .arg(&config_path)
        .args(["run", "--once"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TELEGRAM_BOT_TOKEN"));
}

#[test]
fn unknown_provider_from_env_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &[]);

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.env("COURIER__LLM__PROVIDER", "carrier-pigeon")
        .arg("--config")
        .arg(&config_path)
        .args(["run", "--once", "--require-approval", "--outbox"])
        .arg(dir.path().join("outbox.jsonl"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown LLM provider"));
}

#[test]
fn doctor_outputs_valid_json() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &[("Example", "https://example.com/feed.xml")]);

    let mut cmd = cargo_bin_cmd!("courier");
    let output = cmd
        .env("TELEGRAM_BOT_TOKEN", "123:abc")
        .arg("--config")
        .arg(&config_path)
        .args(["doctor", "--json"])
        .output()
        .expect("run doctor");

    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["config"]["status"], "ok");
    assert_eq!(value["database"]["status"], "ok");
    assert_eq!(value["llm"]["status"], "ok");
    assert_eq!(value["telegram"]["status"], "ok");
    assert_eq!(value["overall"], "ok");
}

#[test]
fn log_path_sends_logs_to_rolling_file() {
    let dir = TempDir::new().expect("temp dir");
    let config_path = write_config(&dir, &[("Example", "https://example.com/feed.xml")]);
    let log_dir = dir.path().join("logs");
    let mut content = fs::read_to_string(&config_path).expect("read config");
    content = content.replacen(
        "[general]\n",
        &format!(
            "[general]\nlog_path = \"{}\"\n",
            toml_path(&log_dir.join("courier.log"))
        ),
        1,
    );
    fs::write(&config_path, content).expect("write config");

    let mut cmd = cargo_bin_cmd!("courier");
    cmd.env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config_path)
        .args(["feeds", "list"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Seeded feeds").not());

    let logs: Vec<String> = fs::read_dir(&log_dir)
        .expect("log directory created")
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with("courier.log"))
        .map(|entry| fs::read_to_string(entry.path()).expect("read log"))
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].contains("Seeded feeds into empty database"));
}
