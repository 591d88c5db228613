//! Integration tests for the mirror
//!
//! These tests use wiremock to stand in for the upstream repository and
//! run the full mirror cycle end-to-end against a temporary mirror root.

use flate2::write::GzEncoder;
use flate2::Compression;
use mirrorator::config::Config;
use mirrorator::crawler::run_mirror;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration pointing at the mock upstream and a temp workspace
fn create_test_config(upstream: &str, workspace: &Path, seeds: &[&str], aliases: Option<&[&str]>) -> Config {
    let packages_file = workspace.join("packages.txt");
    fs::write(&packages_file, seeds.join("\n")).unwrap();

    let index_path = workspace.join("package-index.txt");
    if let Some(names) = aliases {
        fs::write(&index_path, names.join("\n")).unwrap();
    }

    let mut config = Config::default();
    config.upstream.host = upstream.to_string();
    config.mirror.root = path_string(workspace.join("root"));
    config.mirror.packages_file = path_string(packages_file);
    config.mirror.report_path = path_string(workspace.join("requirement-tree.txt"));
    config.aliases.index_path = path_string(index_path);
    config.http.timeout_secs = 10;
    config.http.package_deadline_secs = 30;
    config
}

fn path_string(path: PathBuf) -> String {
    path.to_string_lossy().into_owned()
}

/// Builds a gzipped tarball holding a single setup.py
fn sdist(name: &str, setup_py: &str) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);

    let mut header = tar::Header::new_gnu();
    header.set_size(setup_py.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, format!("{}-1.0/setup.py", name), setup_py.as_bytes())
        .unwrap();

    builder.into_inner().unwrap().finish().unwrap()
}

fn setup_py(name: &str, requires: &[&str]) -> String {
    let quoted: Vec<String> = requires.iter().map(|r| format!("'{}'", r)).collect();
    format!(
        "from setuptools import setup\n\nsetup(\n    name='{}',\n    install_requires=[{}],\n)\n",
        name,
        quoted.join(", ")
    )
}

fn archive_path(name: &str) -> String {
    format!(
        "/packages/source/{}/{}/{}-1.0.tar.gz",
        &name[..1],
        name,
        name
    )
}

/// Mounts a listing with one source archive, and the archive itself
async fn mount_package(server: &MockServer, name: &str, requires: &[&str], archive_hits: u64) {
    let listing = format!(
        r#"<html><body>
        <a href="../../packages/source/{0}/{1}/{1}-1.0.tar.gz#md5=abc">{1}-1.0.tar.gz</a><br/>
        <a href="../../packages/source/{0}/{1}/{1}-2.0-alpha-1.tar.gz">{1}-2.0-alpha-1.tar.gz</a><br/>
        <a href="../../packages/2.7/{0}/{1}/{1}-1.0-py2.7.egg">{1}-1.0-py2.7.egg</a><br/>
        <a href="http://{1}.example.com/">home page</a>
        </body></html>"#,
        &name[..1],
        name
    );

    Mock::given(method("GET"))
        .and(path(format!("/simple/{}/", name)))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(archive_path(name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sdist(name, &setup_py(name, requires))))
        .expect(archive_hits)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_mirror_follows_declared_requirements() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    mount_package(&server, "alpha", &["beta>=1.0"], 1).await;
    mount_package(&server, "beta", &[], 1).await;

    let config = create_test_config(&server.uri(), workspace.path(), &["alpha"], Some(&["alpha", "beta"]));
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.packages_processed, 2);
    assert_eq!(stats.archives_downloaded, 2);
    assert_eq!(stats.packages_failed, 0);

    let root = workspace.path().join("root");
    assert!(root.join("packages/source/a/alpha/alpha-1.0.tar.gz").is_file());
    assert!(root.join("packages/source/b/beta/beta-1.0.tar.gz").is_file());
    assert!(!root.join("packages/source/a/alpha/alpha-2.0-alpha-1.tar.gz").exists());

    assert_eq!(
        fs::read_to_string(root.join("simple/alpha/index.html")).unwrap(),
        "<a href=\"/packages/source/a/alpha/alpha-1.0.tar.gz\">alpha-1.0.tar.gz</a>\n"
    );
    assert!(fs::read_to_string(root.join("simple/alpha/index-orig.html"))
        .unwrap()
        .contains("../../packages/source/a/alpha/alpha-1.0.tar.gz#md5=abc"));
    assert_eq!(
        fs::read_to_string(root.join("simple/index.html")).unwrap(),
        "<a href=\"/simple/alpha/\">alpha</a><br>\n<a href=\"/simple/beta/\">beta</a><br>\n"
    );
    assert_eq!(
        fs::read_to_string(root.join("index.html")).unwrap(),
        "alpha: <a href=\"/packages/source/a/alpha/alpha-1.0.tar.gz\">alpha-1.0.tar.gz</a><br>\n\
         beta: <a href=\"/packages/source/b/beta/beta-1.0.tar.gz\">beta-1.0.tar.gz</a><br>\n"
    );
    assert_eq!(
        fs::read_to_string(workspace.path().join("requirement-tree.txt")).unwrap(),
        "alpha <- beta\n"
    );
}

#[tokio::test]
async fn test_unavailable_package_is_not_retried() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    mount_package(&server, "alpha", &["missing"], 1).await;
    Mock::given(method("GET"))
        .and(path("/simple/missing/"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(
        &server.uri(),
        workspace.path(),
        &["missing", "alpha"],
        Some(&["alpha", "missing"]),
    );
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.packages_unavailable, 1);
    assert_eq!(stats.packages_processed, 1);
    assert_eq!(stats.packages_seen, 2);

    let root = workspace.path().join("root");
    assert!(!root.join("simple/missing").exists());
    assert_eq!(
        fs::read_to_string(root.join("simple/index.html")).unwrap(),
        "<a href=\"/simple/alpha/\">alpha</a><br>\n"
    );
}

#[tokio::test]
async fn test_rerun_downloads_nothing_and_is_byte_identical() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    mount_package(&server, "alpha", &["beta"], 1).await;
    mount_package(&server, "beta", &[], 1).await;

    let config = create_test_config(&server.uri(), workspace.path(), &["alpha"], Some(&["alpha", "beta"]));
    let root = workspace.path().join("root");

    let first = run_mirror(config.clone(), CancellationToken::new()).await.unwrap();
    assert_eq!(first.archives_downloaded, 2);
    let flat = fs::read(root.join("index.html")).unwrap();
    let simple = fs::read(root.join("simple/index.html")).unwrap();
    let report = fs::read(workspace.path().join("requirement-tree.txt")).unwrap();

    let second = run_mirror(config, CancellationToken::new()).await.unwrap();
    assert_eq!(second.archives_downloaded, 0);
    assert_eq!(second.archives_present, 2);

    assert_eq!(fs::read(root.join("index.html")).unwrap(), flat);
    assert_eq!(fs::read(root.join("simple/index.html")).unwrap(), simple);
    assert_eq!(fs::read(workspace.path().join("requirement-tree.txt")).unwrap(), report);
}

#[tokio::test]
async fn test_failed_listing_does_not_stop_crawl() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/simple/broken/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    mount_package(&server, "gamma", &[], 1).await;

    let config = create_test_config(
        &server.uri(),
        workspace.path(),
        &["broken", "gamma"],
        Some(&["broken", "gamma"]),
    );
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.packages_failed, 1);
    assert_eq!(stats.packages_processed, 1);
    assert!(workspace
        .path()
        .join("root/packages/source/g/gamma/gamma-1.0.tar.gz")
        .is_file());
}

#[tokio::test]
async fn test_failed_archive_skips_only_that_archive() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    let listing = r#"<a href="../../packages/source/d/delta/delta-1.0.tar.gz">delta-1.0.tar.gz</a>
        <a href="../../packages/source/d/delta/delta-1.1.tar.gz">delta-1.1.tar.gz</a>"#;
    Mock::given(method("GET"))
        .and(path("/simple/delta/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/packages/source/d/delta/delta-1.0.tar.gz"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/packages/source/d/delta/delta-1.1.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(sdist("delta", &setup_py("delta", &["epsilon"]))))
        .mount(&server)
        .await;

    let config = create_test_config(&server.uri(), workspace.path(), &["delta"], Some(&["delta"]));
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.archives_failed, 1);
    assert_eq!(stats.archives_downloaded, 1);

    let root = workspace.path().join("root");
    assert!(!root.join("packages/source/d/delta/delta-1.0.tar.gz").exists());
    assert!(!root.join("packages/source/d/delta/delta-1.0.tar.gz.part").exists());
    assert_eq!(
        fs::read_to_string(workspace.path().join("requirement-tree.txt")).unwrap(),
        "delta <- epsilon\n"
    );
}

#[tokio::test]
async fn test_dependency_cycle_terminates() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    mount_package(&server, "alpha", &["beta"], 1).await;
    mount_package(&server, "beta", &["Alpha"], 1).await;

    let config = create_test_config(&server.uri(), workspace.path(), &["alpha"], Some(&["alpha", "beta"]));
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.packages_processed, 2);
    assert_eq!(stats.packages_seen, 2);
    assert_eq!(
        fs::read_to_string(workspace.path().join("requirement-tree.txt")).unwrap(),
        "alpha <- beta\nbeta <- alpha\n"
    );
}

#[tokio::test]
async fn test_alias_index_downloaded_and_applied() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/simple/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><body><a href='PyYAML'>PyYAML</a><br/><a href='app'>app</a></body></html>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    mount_package(&server, "app", &["py_yaml>=3.0"], 1).await;
    mount_package(&server, "PyYAML", &[], 1).await;

    let config = create_test_config(&server.uri(), workspace.path(), &["app"], None);
    let stats = run_mirror(config, CancellationToken::new()).await.unwrap();

    assert_eq!(stats.packages_processed, 2);
    assert_eq!(
        fs::read_to_string(workspace.path().join("package-index.txt")).unwrap(),
        "PyYAML\napp\n"
    );
    assert_eq!(
        fs::read_to_string(workspace.path().join("requirement-tree.txt")).unwrap(),
        "app <- PyYAML\n"
    );
    assert!(workspace.path().join("root/simple/PyYAML/index.html").is_file());
}

#[tokio::test]
async fn test_missing_seed_file_is_fatal() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    let mut config = create_test_config(&server.uri(), workspace.path(), &[], Some(&[]));
    config.mirror.packages_file = path_string(workspace.path().join("absent.txt"));

    let result = run_mirror(config, CancellationToken::new()).await;
    assert!(matches!(
        result,
        Err(mirrorator::MirrorError::SeedInputMissing { .. })
    ));
}

#[tokio::test]
async fn test_cancelled_run_still_writes_indexes() {
    let server = MockServer::start().await;
    let workspace = TempDir::new().unwrap();

    let config = create_test_config(&server.uri(), workspace.path(), &["alpha"], Some(&["alpha"]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = run_mirror(config, cancel).await.unwrap();

    assert_eq!(stats.packages_processed, 0);
    assert_eq!(stats.packages_seen, 0);
    let root = workspace.path().join("root");
    assert_eq!(fs::read_to_string(root.join("simple/index.html")).unwrap(), "");
    assert_eq!(
        fs::read_to_string(workspace.path().join("requirement-tree.txt")).unwrap(),
        ""
    );
}
