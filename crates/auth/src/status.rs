use std::{sync::Arc, time::{Duration, Instant}};

use serde::{Deserialize, Serialize};

use crate::{authenticator::PlatformClient, constants};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerStatus {
    #[serde(default)]
    pub name: Option<Arc<str>>,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub players: u32,
    #[serde(default)]
    pub max_players: u32,
}

#[derive(thiserror::Error, Debug)]
pub enum PlatformError {
    #[error("Connection error: {0}")]
    ConnectionError(#[from] reqwest::Error),
    #[error("Non-OK Http Status: {0}")]
    NonOkHttpStatus(reqwest::StatusCode),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// The servers endpoint answers either with a bare list or with `{"data": [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ServerStatusResponse {
    List(Vec<ServerStatus>),
    Wrapped { data: Vec<ServerStatus> },
}

impl PlatformClient {
    pub async fn server_status(&self) -> Result<Vec<ServerStatus>, PlatformError> {
        let response = self.get(constants::SERVERS_PATH).send().await?;
        if !response.status().is_success() {
            return Err(PlatformError::NonOkHttpStatus(response.status()));
        }
        let bytes = response.bytes().await?;
        Ok(match serde_json::from_slice(&bytes)? {
            ServerStatusResponse::List(servers) => servers,
            ServerStatusResponse::Wrapped { data } => data,
        })
    }

    /// Round-trip time of the platform's ping endpoint.
    pub async fn ping(&self) -> Result<Duration, PlatformError> {
        let started = Instant::now();
        let response = self.get(constants::PING_PATH).send().await?;
        if !response.status().is_success() {
            return Err(PlatformError::NonOkHttpStatus(response.status()));
        }
        Ok(started.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serve(responses: Vec<(u16, &'static str)>) -> (u16, std::thread::JoinHandle<Vec<String>>) {
        let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
        let port = server.server_addr().to_ip().unwrap().port();
        let handle = std::thread::spawn(move || {
            let mut paths = Vec::new();
            for (status, body) in responses {
                let request = server.recv().unwrap();
                paths.push(request.url().to_string());
                request.respond(tiny_http::Response::from_string(body).with_status_code(status)).unwrap();
            }
            paths
        });
        (port, handle)
    }

    #[tokio::test]
    async fn reads_both_server_list_shapes() {
        let (port, handle) = serve(vec![
            (200, r#"[{"name": "Survie", "online": true, "players": 3, "max_players": 50}]"#),
            (200, r#"{"data": [{"online": false}]}"#),
            (200, "pong"),
            (503, ""),
        ]);
        let platform = PlatformClient::new(reqwest::Client::new(), &format!("http://127.0.0.1:{port}"));

        let servers = platform.server_status().await.unwrap();
        assert_eq!(servers[0].players, 3);
        assert!(servers[0].online);

        let servers = platform.server_status().await.unwrap();
        assert_eq!(servers, vec![ServerStatus { name: None, online: false, players: 0, max_players: 0 }]);

        assert!(platform.ping().await.is_ok());
        assert!(matches!(platform.ping().await, Err(PlatformError::NonOkHttpStatus(status)) if status.as_u16() == 503));

        assert_eq!(handle.join().unwrap(), ["/api/servers", "/api/servers", "/api/ping", "/api/ping"]);
    }
}
