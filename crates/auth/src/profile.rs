use std::sync::Arc;

use chrono::{DateTime, Utc};
use schema::profile::UserProfile;
use serde_json::Value;
use uuid::Uuid;

use crate::constants::FALLBACK_PLAYER_NAME;

/// Offline-mode identity: MD5 of `OfflinePlayer:<name>` stamped as a version 3 UUID.
///
/// This matches the UUID a vanilla server in offline mode assigns to the same name.
pub fn offline_uuid(name: &str) -> Uuid {
    let digest = md5::compute(format!("OfflinePlayer:{name}"));
    uuid::Builder::from_md5_bytes(digest.0).into_uuid()
}

/// Builds a profile from a successful authenticate response.
///
/// Returns `None` when the body carries no access token.
pub fn profile_from_response(body: &Value, obtained_at: DateTime<Utc>) -> Option<UserProfile> {
    let access_token = string_field(body, &["access_token", "accessToken"])?;
    let user = body.get("user").filter(|user| user.is_object()).unwrap_or(body);

    let name = string_field(user, &["username", "name", "nickname"])
        .unwrap_or_else(|| FALLBACK_PLAYER_NAME.into());

    let uuid = string_field(user, &["uuid"])
        .and_then(|uuid| Uuid::parse_str(&uuid).ok())
        .unwrap_or_else(|| offline_uuid(&name));

    let role = user.get("role").and_then(|role| match role {
        Value::String(role) => Some(role.as_str().into()),
        Value::Object(_) => string_field(role, &["name", "title"]),
        _ => None,
    });

    let grade_color = ["grade_color", "gradeColor", "color"].iter()
        .find_map(|key| user.get(*key).and_then(Value::as_str))
        .or_else(|| user.get("grade").and_then(|grade| grade.get("color")).and_then(Value::as_str))
        .and_then(normalize_color);

    Some(UserProfile {
        id: user.get("id").and_then(Value::as_u64),
        name,
        uuid,
        email: string_field(user, &["email"]),
        role,
        grade: user.get("grade").and_then(normalize_grade),
        grade_color,
        banned: user.get("banned").map(is_truthy).unwrap_or(false),
        created_at: string_field(user, &["created_at", "createdAt"]),
        access_token,
        obtained_at,
    })
}

/// Grades arrive as a plain string, a list of strings, or an object.
pub fn normalize_grade(grade: &Value) -> Option<Arc<str>> {
    match grade {
        Value::String(grade) => Some(grade.trim()).filter(|grade| !grade.is_empty()).map(Into::into),
        Value::Array(grades) => {
            let names: Vec<&str> = grades.iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|grade| !grade.is_empty())
                .collect();
            if names.is_empty() {
                None
            } else {
                Some(names.join(", ").into())
            }
        },
        Value::Object(_) => string_field(grade, &["name", "title", "displayName", "label", "slug", "role"]),
        _ => None,
    }
}

/// Normalizes to `#RRGGBB`. Three-digit colours are expanded.
pub fn normalize_color(color: &str) -> Option<Arc<str>> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    let expanded = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect::<String>(),
        6 => hex.to_string(),
        _ => return None,
    };
    Some(format!("#{}", expanded.to_ascii_uppercase()).into())
}

fn string_field(value: &Value, keys: &[&str]) -> Option<Arc<str>> {
    keys.iter()
        .filter_map(|key| value.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(Into::into)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(value) => *value,
        Value::Number(number) => number.as_i64().is_some_and(|number| number != 0),
        Value::String(value) => matches!(value.as_str(), "1" | "true"),
        _ => false,
    }
}
