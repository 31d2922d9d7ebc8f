use std::time::Duration;

pub const USER_AGENT: &str = "EminiumLauncher/1.0";
pub const AUTHENTICATE_PATH: &str = "/api/auth/authenticate";
pub const SERVERS_PATH: &str = "/api/servers";
pub const PING_PATH: &str = "/api/ping";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const FALLBACK_PLAYER_NAME: &str = "EminiumPlayer";
