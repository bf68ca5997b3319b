use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use sha2::{Digest, Sha256};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOCK: &str = r#"
[[projects]]
  name = "golang.org/x/net"
  packages = ["context"]
  revision = "1e491301e022f8f977054da4c2d852decd59571f"

[[projects]]
  name = "github.com/pkg/errors"
  packages = ["."]
  revision = "645ef00459ed84a119197bfb8d8205042c6df63d"
  version = "v0.8.0"

[[projects]]
  name = "github.com/mycorp/secret"
  packages = ["."]
  revision = "c0ffee"
  source = "https://git.mycorp.com/secret.git"
"#;

async fn mount_module(server: &MockServer, module: &str, revision: &str, version: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/{module}/@v/{revision}.info")))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(r#"{{"Version":"{version}"}}"#)))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/{module}/@v/{version}.zip")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .expect(1)
        .mount(server)
        .await;
}

fn write_lock(dir: &Path) -> std::path::PathBuf {
    let lock = dir.join("Gopkg.lock");
    std::fs::write(&lock, LOCK).unwrap();
    lock
}

fn import(lock: &Path, proxy: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("autogazelle");
    cmd.env_remove("GOPROXY")
        .env_remove("GOPRIVATE")
        .env_remove("RUST_LOG")
        .arg("import")
        .arg(lock)
        .args(["--go-proxy", proxy, "--go-private", "github.com/mycorp/*"]);
    cmd
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_prints_sorted_starlark() {
    let server = MockServer::start().await;
    mount_module(&server, "golang.org/x/net", "1e491301e022f8f977054da4c2d852decd59571f", "v0.0.0-20180724234803-3673e40ba225", b"net").await;
    mount_module(&server, "github.com/pkg/errors", "645ef00459ed84a119197bfb8d8205042c6df63d", "v0.8.0", b"errors").await;
    let dir = tempfile::tempdir().unwrap();
    let lock = write_lock(dir.path());

    let output = import(&lock, &server.uri()).output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();

    let errors = stdout.find("name = \"com_github_pkg_errors\"").unwrap();
    let secret = stdout.find("name = \"com_github_mycorp_secret\"").unwrap();
    let net = stdout.find("name = \"org_golang_x_net\"").unwrap();
    assert!(secret < errors && errors < net, "unsorted output:\n{stdout}");

    assert!(stdout.contains("    commit = \"c0ffee\",\n"));
    assert!(stdout.contains("    remote = \"https://git.mycorp.com/secret.git\",\n"));
    assert!(stdout.contains("    vcs = \"git\",\n"));
    let digest = hex::encode(Sha256::digest(b"errors"));
    assert!(stdout.contains(&format!("    sha256 = \"{digest}\",\n")));
    assert!(stdout.contains(&format!(
        "    urls = [\"{}/github.com/pkg/errors/@v/v0.8.0.zip\"],\n",
        server.uri()
    )));
    assert!(stdout.contains("    strip_prefix = \"github.com/pkg/errors@v0.8.0\",\n"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_import_json_output() {
    let server = MockServer::start().await;
    mount_module(&server, "golang.org/x/net", "1e491301e022f8f977054da4c2d852decd59571f", "v0.1.0", b"net").await;
    mount_module(&server, "github.com/pkg/errors", "645ef00459ed84a119197bfb8d8205042c6df63d", "v0.8.0", b"errors").await;
    let dir = tempfile::tempdir().unwrap();
    let lock = write_lock(dir.path());

    let output = import(&lock, &format!("{},direct", server.uri()))
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rules: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let names: Vec<&str> = rules
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["com_github_mycorp_secret", "com_github_pkg_errors", "org_golang_x_net"]);
    assert_eq!(rules[2]["attrs"]["importpath"], "golang.org/x/net");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_private_only_lock_makes_no_requests() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("Gopkg.lock");
    std::fs::write(&lock, "[[projects]]\n  name = \"github.com/mycorp/a\"\n  revision = \"1\"\n").unwrap();

    import(&lock, &server.uri())
        .assert()
        .success()
        .stdout(predicate::str::contains("commit = \"1\""));

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_lock_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let lock = dir.path().join("Gopkg.lock");
    std::fs::write(&lock, "[[projects]\nname =").unwrap();

    import(&lock, "http://127.0.0.1:9")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("failed to parse"));
}
