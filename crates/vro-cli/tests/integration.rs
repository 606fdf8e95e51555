#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const PACKAGE: &str = "com.example.net";

fn vrocli(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vrocli").unwrap();
    cmd.current_dir(dir.path())
        .env("VROCLI_ROOT", dir.path())
        .env_remove("VRO_USER")
        .env_remove("VRO_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn write_config(dir: &TempDir, extra: &str) {
    std::fs::write(
        dir.path().join(".vrocli.yml"),
        format!("vrocli:\n  packages:\n    {PACKAGE}: {{}}\n{extra}"),
    )
    .unwrap();
}

fn utf16be(text: &str) -> Vec<u8> {
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

fn action_data(name: &str) -> Vec<u8> {
    utf16be(&format!(
        "<?xml version='1.0' encoding='UTF-16'?>\n<dunes-script-module name=\"{name}\" result-type=\"string\"><param n=\"host\" t=\"string\"><![CDATA[]]></param><script encoded=\"false\"><![CDATA[return host;]]></script></dunes-script-module>"
    ))
}

const CATEGORIES: &str =
    "<categories><category name=\"Network\"><name><![CDATA[Network]]></name></category></categories>";

fn package_bytes() -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let entries: Vec<(&str, Vec<u8>)> = vec![
        ("dunes-meta-inf", b"<properties/>".to_vec()),
        ("elements/net-001/categories", CATEGORIES.as_bytes().to_vec()),
        ("elements/net-001/data", action_data("getIp")),
        ("elements/wf-1/data", b"<workflow name=\"w\"/>".to_vec()),
    ];
    for (name, data) in entries {
        zip.start_file(name, SimpleFileOptions::default()).unwrap();
        zip.write_all(&data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_source_package(dir: &TempDir) {
    let path = dir.path().join("packages").join(format!("{PACKAGE}.package"));
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, package_bytes()).unwrap();
}

fn zip_entries(path: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
    archive.file_names().map(str::to_string).collect()
}

fn module_path(dir: &TempDir) -> std::path::PathBuf {
    dir.path().join("src").join(PACKAGE).join("Network.js")
}

// ---------------------------------------------------------------------------
// vrocli list / config
// ---------------------------------------------------------------------------

#[test]
fn missing_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    vrocli(&dir)
        .args(["list", "packages"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to load config"));
}

#[test]
fn list_packages_shows_resolved_paths() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir)
        .args(["list", "packages"])
        .assert()
        .success()
        .stdout(predicate::str::contains(PACKAGE))
        .stdout(predicate::str::contains("WORKING_DIR"));
}

#[test]
fn list_servers_json() {
    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        "  vro_servers:\n    vro.example.com:\n      user: admin\n      verify_ssl: false\n",
    );
    let out = vrocli(&dir)
        .args(["--json", "list", "servers"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value[0]["name"], "vro.example.com");
    assert_eq!(value[0]["url"], "https://vro.example.com");
    assert_eq!(value[0]["verify_ssl"], false);
}

#[test]
fn list_rejects_unknown_item() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir).args(["list", "workflows"]).assert().failure();
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "  log_level: loud\n");
    vrocli(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] unknown log_level 'loud'"));
}

#[test]
fn config_validate_clean() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

// ---------------------------------------------------------------------------
// vrocli expand / build
// ---------------------------------------------------------------------------

#[test]
fn expand_writes_modules_and_summary() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);

    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 converted, 1 skipped, 0 failed"));

    let js = std::fs::read_to_string(module_path(&dir)).unwrap();
    assert!(js.starts_with("/** @module Network */\n\n"));
    assert!(js.contains("/* id:net-001 */"));
    assert!(js.contains("function getIp () {\n    return host;\n};"));
}

#[test]
fn expand_prompt_can_cancel() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);

    vrocli(&dir)
        .args(["expand", "-p", PACKAGE])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cancelled"));
    assert!(!module_path(&dir).exists());
}

#[test]
fn expand_prompt_accepts_yes() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);

    vrocli(&dir)
        .args(["expand", "-p", PACKAGE])
        .write_stdin("yes\n")
        .assert()
        .success();
    assert!(module_path(&dir).exists());
}

#[test]
fn expand_unknown_package_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir)
        .args(["expand", "-p", "nope", "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package 'nope' is not configured"));
}

#[test]
fn expand_without_archive_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package archive not found"));
}

#[test]
fn expand_then_build_round_trip() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);

    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .success();

    let js = std::fs::read_to_string(module_path(&dir)).unwrap();
    std::fs::write(module_path(&dir), js.replace("return host;", "return host + \"!\";")).unwrap();

    vrocli(&dir)
        .args(["build", "-p", PACKAGE, "--yes", "--strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 converted"));

    let built = dir.path().join("build").join(format!("{PACKAGE}.package"));
    let entries = zip_entries(&built);
    assert!(entries.contains(&"dunes-meta-inf".to_string()));
    assert!(entries.contains(&"elements/net-001/data".to_string()));
    assert!(entries.contains(&"elements/wf-1/data".to_string()));

    let mut archive = ZipArchive::new(File::open(&built).unwrap()).unwrap();
    let mut data = Vec::new();
    archive
        .by_name("elements/net-001/data")
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    assert_eq!(&data[..2], &[0xFE, 0xFF]);
    let units: Vec<u16> = data[2..]
        .chunks_exact(2)
        .map(|c| u16::from_be_bytes([c[0], c[1]]))
        .collect();
    let xml = String::from_utf16(&units).unwrap();
    assert!(xml.contains("<![CDATA[return host + \"!\";]]>"));
}

#[test]
fn build_strict_fails_on_broken_action() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);
    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .success();

    let js = std::fs::read_to_string(module_path(&dir)).unwrap();
    std::fs::write(module_path(&dir), js.replace("function getIp () {", "function getIp (x) {")).unwrap();

    vrocli(&dir)
        .args(["build", "-p", PACKAGE, "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed"));

    vrocli(&dir)
        .args(["build", "-p", PACKAGE, "--yes", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("recorded 1 failed unit(s)"));
}

#[test]
fn build_json_report() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    write_source_package(&dir);
    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .success();

    let out = vrocli(&dir)
        .args(["-j", "build", "-p", PACKAGE, "--yes"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(value["command"], "build");
    assert_eq!(value["summary"]["converted"], 1);
    assert_eq!(value["outcomes"][0]["kind"], "converted");
    assert_eq!(value["outcomes"][0]["id"], "net-001");
}

// ---------------------------------------------------------------------------
// vrocli pull / push
// ---------------------------------------------------------------------------

fn server_config(url: &str) -> String {
    format!("  vro_servers:\n    local:\n      url: {url}\n")
}

#[test]
fn pull_without_credentials_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, &server_config("http://127.0.0.1:9"));
    vrocli(&dir)
        .args(["pull", "-s", "local", "-p", PACKAGE, "--yes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing credentials for server 'local'"));
}

#[test]
fn pull_unknown_server_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, "");
    vrocli(&dir)
        .args(["pull", "-s", "other", "-p", PACKAGE, "--yes", "--user", "u", "--password", "p"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("server 'other' is not configured"));
}

#[test]
fn pull_and_expand_from_server() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", format!("/vco/api/packages/{PACKAGE}").as_str())
        .match_header("accept", "application/zip")
        .with_status(200)
        .with_body(package_bytes())
        .create();

    let dir = TempDir::new().unwrap();
    write_config(&dir, &server_config(&server.url()));
    vrocli(&dir)
        .args(["pull", "-s", "local", "-p", PACKAGE, "-e", "--yes"])
        .env("VRO_USER", "admin")
        .env("VRO_PASSWORD", "secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pulled"))
        .stdout(predicate::str::contains("1 converted"));

    mock.assert();
    assert!(dir
        .path()
        .join("packages")
        .join(format!("{PACKAGE}.package"))
        .is_file());
    assert!(module_path(&dir).is_file());
}

#[test]
fn push_uploads_built_package() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/vco/api/packages/")
        .match_query(mockito::Matcher::UrlEncoded("overwrite".into(), "true".into()))
        .with_status(202)
        .create();

    let dir = TempDir::new().unwrap();
    write_config(
        &dir,
        &format!(
            "  vro_servers:\n    local:\n      url: {}\n      user: admin\n      pwd: secret\n",
            server.url()
        ),
    );
    write_source_package(&dir);
    vrocli(&dir)
        .args(["expand", "-p", PACKAGE, "--yes"])
        .assert()
        .success();

    vrocli(&dir)
        .args(["push", "-s", "local", "-p", PACKAGE, "-b", "--yes"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pushed"));
    mock.assert();
}

#[test]
fn push_without_build_archive_fails() {
    let dir = TempDir::new().unwrap();
    write_config(&dir, &server_config("http://127.0.0.1:9"));
    vrocli(&dir)
        .args(["push", "-s", "local", "-p", PACKAGE, "--yes", "--user", "u", "--password", "p"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("package archive not found"));
}
