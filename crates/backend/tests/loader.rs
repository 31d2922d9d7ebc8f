mod common;

use backend::loader::{is_cached_installer_valid, INSTALLER_MIN_CACHED_SIZE};
use common::*;

#[tokio::test]
async fn valid_cached_installer_is_reused() {
    let temp = TempDir::new("loader-cached");
    let server = TestServer::start();
    serve_game(&server, 0);

    let (installer, _receiver) = installer(&temp, local_mirrors(&server));
    let path = installer.ensure_loader_installer(MINECRAFT, FORGE).await.unwrap();
    assert_eq!(path, temp.join(format!("cache/forge-{MINECRAFT}-{FORGE}-installer.jar")));
    assert!(std::fs::metadata(&path).unwrap().len() > INSTALLER_MIN_CACHED_SIZE);

    installer.ensure_loader_installer(MINECRAFT, FORGE).await.unwrap();
    assert_eq!(server.hits(&format!("/forge/{MINECRAFT}-{FORGE}-installer.jar")), 1);
}

#[tokio::test]
async fn small_or_incomplete_installers_are_refetched() {
    let temp = TempDir::new("loader-refetch");
    let server = TestServer::start();
    serve_game(&server, 0);
    let (installer, _receiver) = installer(&temp, local_mirrors(&server));

    let cached = temp.join(format!("cache/forge-{MINECRAFT}-{FORGE}-installer.jar"));
    std::fs::create_dir_all(cached.parent().unwrap()).unwrap();

    // Structurally fine but below the size floor
    std::fs::write(&cached, zip_bytes(&[("install_profile.json", b"{}"), ("data/client.lzma", b"x")])).unwrap();
    assert!(!is_cached_installer_valid(&cached).await);
    installer.ensure_loader_installer(MINECRAFT, FORGE).await.unwrap();
    assert!(is_cached_installer_valid(&cached).await);

    // Large enough but missing a required entry
    let filler = vec![1u8; 200 * 1024];
    std::fs::write(&cached, zip_bytes(&[("install_profile.json", b"{}"), ("maven/filler.bin", &filler)])).unwrap();
    assert!(!is_cached_installer_valid(&cached).await);
    installer.ensure_loader_installer(MINECRAFT, FORGE).await.unwrap();

    assert_eq!(server.hits(&format!("/forge/{MINECRAFT}-{FORGE}-installer.jar")), 2);
    assert_eq!(std::fs::read(&cached).unwrap(), loader_installer());
}

#[tokio::test]
async fn installer_without_required_entries_is_not_accepted() {
    let temp = TempDir::new("loader-reject");
    let server = TestServer::start();
    let filler = vec![1u8; 200 * 1024];
    server.serve(&format!("/forge/{MINECRAFT}-{FORGE}-installer.jar"), zip_bytes(&[("maven/filler.bin", &filler)]));

    let (installer, _receiver) = installer(&temp, local_mirrors(&server));
    assert!(installer.ensure_loader_installer(MINECRAFT, FORGE).await.is_err());
    assert!(!temp.join(format!("cache/forge-{MINECRAFT}-{FORGE}-installer.jar")).exists());
}
