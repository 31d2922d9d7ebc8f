#![allow(dead_code)]

use std::{
    collections::HashMap, io::{Read, Write}, net::TcpListener, path::{Path, PathBuf},
    sync::{atomic::{AtomicUsize, Ordering}, Arc}, time::Duration,
};

use backend::{directories::LauncherDirectories, download::Downloader, installer::Installer, mirrors::MirrorResolver};
use bridge::{handle::FrontendHandle, message::MessageToFrontend};
use parking_lot::Mutex;
use schema::mirrors::{MirrorOverrides, UrlTemplates};
use sha1::{Digest, Sha1};
use tiny_http::{Response, Server};
use tokio::sync::mpsc::UnboundedReceiver;

pub const MINECRAFT: &str = "1.20.1";
pub const FORGE: &str = "47.3.0";
pub const ASSETS_ID: &str = "5";
pub const LIBRARY_PATH: &str = "org/example/lib/1.0/lib-1.0.jar";
pub const NATIVES_PATH: &str = "org/example/lib/1.0/lib-1.0-natives-linux.jar";

pub struct TempDir(pub PathBuf);

impl TempDir {
    pub fn new(prefix: &str) -> Self {
        let path = std::env::temp_dir().join(format!("eminium-it-{prefix}-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        Self(path)
    }
}

impl std::ops::Deref for TempDir {
    type Target = Path;

    fn deref(&self) -> &Path {
        &self.0
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

#[derive(Clone)]
struct Route {
    status: u16,
    body: Arc<[u8]>,
    delay: Duration,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<String, Route>>,
    hits: Mutex<HashMap<String, usize>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

/// Local HTTP server with per-path responses. Each request is answered on its own thread.
pub struct TestServer {
    base: String,
    state: Arc<ServerState>,
    server: Arc<Server>,
}

impl TestServer {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let address = server.server_addr().to_ip().unwrap();
        let state = Arc::new(ServerState::default());

        let accept = Arc::clone(&server);
        let accept_state = Arc::clone(&state);
        std::thread::spawn(move || {
            for request in accept.incoming_requests() {
                let state = Arc::clone(&accept_state);
                std::thread::spawn(move || {
                    let path = request.url().split('?').next().unwrap_or_default().to_string();
                    *state.hits.lock().entry(path.clone()).or_default() += 1;

                    let in_flight = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    state.max_in_flight.fetch_max(in_flight, Ordering::SeqCst);

                    let route = state.routes.lock().get(&path).cloned();
                    let response = match route {
                        Some(route) => {
                            std::thread::sleep(route.delay);
                            Response::from_data(route.body.to_vec()).with_status_code(route.status)
                        },
                        None => Response::from_data(b"not found".to_vec()).with_status_code(404),
                    };
                    state.in_flight.fetch_sub(1, Ordering::SeqCst);
                    let _ = request.respond(response);
                });
            }
        });

        Self {
            base: format!("http://{address}"),
            state,
            server,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn serve(&self, path: &str, body: impl Into<Vec<u8>>) {
        self.serve_with(path, 200, body, Duration::ZERO);
    }

    pub fn serve_with(&self, path: &str, status: u16, body: impl Into<Vec<u8>>, delay: Duration) {
        let route = Route { status, body: body.into().into(), delay };
        self.state.routes.lock().insert(path.to_string(), route);
    }

    pub fn hits(&self, path: &str) -> usize {
        self.state.hits.lock().get(path).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.hits.lock().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// Serves a response whose `Content-Length` promises more bytes than are sent.
pub fn truncated_server(promised: usize, sent: &'static [u8]) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&connections);

    std::thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else {
                continue;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            let mut buffer = [0u8; 4096];
            let _ = stream.read(&mut buffer);
            let header = format!("HTTP/1.1 200 OK\r\nContent-Length: {promised}\r\nConnection: close\r\n\r\n");
            let _ = stream.write_all(header.as_bytes());
            let _ = stream.write_all(sent);
            let _ = stream.flush();
        }
    });

    (format!("http://{address}"), connections)
}

pub fn sha1_hex(content: &[u8]) -> String {
    hex::encode(Sha1::digest(content))
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .last_modified_time(zip::DateTime::default());
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A stored jar comfortably above the archive size floor.
pub fn jar(marker: &str) -> Vec<u8> {
    let padding = vec![b'x'; 4096];
    zip_bytes(&[("META-INF/MANIFEST.MF", marker.as_bytes()), ("padding.bin", &padding)])
}

/// A loader installer larger than the cache floor with the entries it must contain.
pub fn loader_installer() -> Vec<u8> {
    let client = vec![7u8; 120 * 1024];
    zip_bytes(&[("install_profile.json", b"{\"version\": \"1.20.1-forge-47.3.0\"}"), ("data/client.lzma", &client)])
}

pub fn asset_content(index: usize) -> Vec<u8> {
    format!("asset object number {index}").into_bytes()
}

/// Mirror templates that route every resource class to `server` only.
pub fn local_mirrors(server: &TestServer) -> MirrorOverrides {
    let template = |path: &str| UrlTemplates(vec![server.url(path).into()]);
    MirrorOverrides {
        disable_defaults: true,
        version_json: template("/version/{mc}.json"),
        client_jar: template("/version/{mc}/client.jar"),
        assets_index: template("/assets/indexes/{id}.json"),
        asset_obj: template("/assets/objects/{sub}/{hash}"),
        manifest: template("/mc/game/version_manifest.json"),
        libraries: template("/maven/{path}"),
        loader_installer: template("/forge/{mc}-{loader}-installer.jar"),
    }
}

/// Serves a complete game: descriptor, client jar, an index of `assets` objects, two libraries and the installer.
pub fn serve_game(server: &TestServer, assets: usize) {
    let mut objects = serde_json::Map::new();
    for index in 0..assets {
        let content = asset_content(index);
        let hash = sha1_hex(&content);
        server.serve(&format!("/assets/objects/{}/{hash}", &hash[..2]), content.clone());
        objects.insert(format!("minecraft/sounds/{index}.ogg"), serde_json::json!({ "hash": hash, "size": content.len() }));
    }
    // A second name for the first object shares its file
    if assets > 0 {
        let hash = sha1_hex(&asset_content(0));
        objects.insert("minecraft/sounds/alias.ogg".to_string(), serde_json::json!({ "hash": hash, "size": 1 }));
    }
    server.serve(&format!("/assets/indexes/{ASSETS_ID}.json"), serde_json::to_vec(&serde_json::json!({ "objects": objects })).unwrap());

    server.serve(&format!("/version/{MINECRAFT}.json"), serde_json::to_vec(&game_descriptor(server)).unwrap());
    server.serve(&format!("/version/{MINECRAFT}/client.jar"), jar("client"));
    server.serve(&format!("/maven/{LIBRARY_PATH}"), jar("library"));
    server.serve(&format!("/maven/{NATIVES_PATH}"), jar("natives"));
    server.serve(&format!("/forge/{MINECRAFT}-{FORGE}-installer.jar"), loader_installer());
}

/// Version descriptor pointing at `server` for its client jar, asset index and libraries.
pub fn game_descriptor(server: &TestServer) -> serde_json::Value {
    serde_json::json!({
        "id": MINECRAFT,
        "mainClass": "net.minecraft.client.main.Main",
        "assetIndex": { "id": ASSETS_ID, "url": server.url(&format!("/assets/indexes/{ASSETS_ID}.json")) },
        "downloads": { "client": { "url": server.url(&format!("/version/{MINECRAFT}/client.jar")) } },
        "libraries": [
            {
                "name": "org.example:lib:1.0",
                "downloads": {
                    "artifact": { "path": LIBRARY_PATH, "url": server.url(&format!("/maven/{LIBRARY_PATH}")) },
                    "classifiers": {
                        "natives-linux": { "path": NATIVES_PATH, "url": server.url(&format!("/maven/{NATIVES_PATH}")) }
                    }
                }
            },
            { "name": "org.example:no-downloads:1.0" }
        ]
    })
}

pub fn installer(root: &Path, mirrors: MirrorOverrides) -> (Installer, UnboundedReceiver<MessageToFrontend>) {
    let (sender, receiver) = FrontendHandle::channel();
    let client = backend::create_http_client().unwrap();
    let installer = Installer::new(
        Arc::new(LauncherDirectories::new(root.to_path_buf())),
        Downloader::new(client),
        MirrorResolver::new(mirrors),
        sender,
    );
    (installer, receiver)
}

pub fn drain(receiver: &mut UnboundedReceiver<MessageToFrontend>) -> Vec<MessageToFrontend> {
    let mut messages = Vec::new();
    while let Ok(message) = receiver.try_recv() {
        messages.push(message);
    }
    messages
}
