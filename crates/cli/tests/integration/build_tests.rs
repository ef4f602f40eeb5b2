//! Build command integration tests.

use predicates::prelude::*;

use super::common::{TestEnv, release_archive};

fn archive_server(expected_downloads: usize) -> (mockito::ServerGuard, mockito::Mock) {
  let mut server = mockito::Server::new();
  let mock = server
    .mock("GET", "/openssl-3.3.2.tar.gz")
    .with_status(200)
    .with_body(release_archive("openssl-3.3.2"))
    .expect(expected_downloads)
    .create();
  (server, mock)
}

#[test]
fn build_produces_artifact_in_bin() {
  let (server, mock) = archive_server(1);
  let env = TestEnv::new(&server.url(), 0);

  env
    .cipherbuild_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Build complete"))
    .stdout(predicate::str::contains(env.bin_path("x64").display().to_string()))
    .stdout(predicate::str::contains("sqlite3.dll"))
    .stderr(predicate::str::contains("starting build"));

  assert!(env.bin_path("x64").join("sqlite3.dll").is_file());
  assert!(env.root_path().join("openssl-3.3.2").join("Configure").is_file());
  assert!(!env.root_path().join("openssl-3.3.2.tar").exists());

  let calls = env.calls();
  assert!(calls[0].starts_with("perl Configure VC-WIN64A"));
  assert_eq!(&calls[1..4], ["make clean", "make", "make install_sw"]);
  assert!(calls[4].starts_with("make /f ../../sqlcipher/Makefile.msc TOP=../../sqlcipher"));
  assert!(!calls.iter().any(|c| c.starts_with("pkg")));
  mock.assert();
}

#[test]
fn second_build_skips_download_and_dependency_build() {
  let (server, mock) = archive_server(1);
  let env = TestEnv::new(&server.url(), 0);

  env.cipherbuild_cmd().assert().success();
  let first = env.calls().len();

  env
    .cipherbuild_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("OpenSSL build: cached"));

  let calls = env.calls();
  assert_eq!(calls.len(), first + 1);
  assert!(calls[first].starts_with("make /f"));
  mock.assert();
}

#[test]
fn x86_uses_matching_configure_target() {
  let (server, _mock) = archive_server(1);
  let env = TestEnv::new(&server.url(), 0);

  env.cipherbuild_cmd().args(["--arch", "x86"]).assert().success();

  assert!(env.calls()[0].starts_with("perl Configure VC-WIN32"));
  assert!(env.root_path().join("install").join("x86").join(".cipherbuild-complete").is_file());
  assert!(env.bin_path("x86").join("sqlite3.dll").is_file());
  assert!(!env.bin_path("x64").exists());
}

#[test]
fn failing_target_build_exits_nonzero_without_artifact() {
  let (server, _mock) = archive_server(1);
  let env = TestEnv::new(&server.url(), 2);

  env
    .cipherbuild_cmd()
    .assert()
    .code(1)
    .stderr(predicate::str::contains("error: target build stage failed"))
    .stderr(predicate::str::contains("exit code 2"));

  assert!(!env.bin_path("x64").join("sqlite3.dll").exists());
}

#[test]
fn json_output_reports_outcomes() {
  let (server, _mock) = archive_server(1);
  let env = TestEnv::new(&server.url(), 0);

  let output = env.cipherbuild_cmd().args(["-o", "json"]).output().unwrap();

  assert!(output.status.success());
  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["archive"]["download"], "fetched");
  assert_eq!(json["repo"]["clone"], "cached");
  assert_eq!(json["dependency"], "built");
  assert_eq!(json["report"]["artifacts"][0]["name"], "sqlite3.dll");
}
