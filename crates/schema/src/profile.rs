use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The authenticated identity persisted in `user.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<u64>,
    pub name: Arc<str>,
    pub uuid: Uuid,
    #[serde(default)]
    pub email: Option<Arc<str>>,
    #[serde(default)]
    pub role: Option<Arc<str>>,
    #[serde(default)]
    pub grade: Option<Arc<str>>,
    #[serde(default)]
    pub grade_color: Option<Arc<str>>,
    #[serde(default)]
    pub banned: bool,
    #[serde(default)]
    pub created_at: Option<Arc<str>>,
    pub access_token: Arc<str>,
    pub obtained_at: DateTime<Utc>,
}
