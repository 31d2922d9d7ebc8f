use serde::{Deserialize, Deserializer};

pub mod assets_index;
pub mod launch;
pub mod mirrors;
pub mod profile;
pub mod settings;
pub mod version;
pub mod version_manifest;

/// Deserializes a field, falling back to its default if the stored value is malformed.
pub(crate) fn try_deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a> + Default,
{
    try_deserialize_with(deserializer, T::default)
}

pub(crate) fn try_deserialize_with<'de, D, T>(deserializer: D, fallback: fn() -> T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: for<'a> Deserialize<'a>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|_| fallback()))
}
