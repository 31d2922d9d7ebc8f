use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_untagged::UntaggedEnumVisitor;

/// User-editable mirror configuration (`mirrors.json`).
///
/// Every template list accepts either a single string or an array of strings.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MirrorOverrides {
    #[serde(default)]
    pub disable_defaults: bool,
    #[serde(default)]
    pub version_json: UrlTemplates,
    #[serde(default)]
    pub client_jar: UrlTemplates,
    #[serde(default)]
    pub assets_index: UrlTemplates,
    #[serde(default)]
    pub asset_obj: UrlTemplates,
    #[serde(default)]
    pub manifest: UrlTemplates,
    #[serde(default, skip_serializing_if = "UrlTemplates::is_empty")]
    pub libraries: UrlTemplates,
    #[serde(default, skip_serializing_if = "UrlTemplates::is_empty")]
    pub loader_installer: UrlTemplates,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct UrlTemplates(pub Vec<Arc<str>>);

impl UrlTemplates {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|template| &**template)
    }
}

impl<'de> Deserialize<'de> for UrlTemplates {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        UntaggedEnumVisitor::new()
            .unit(|| Ok(UrlTemplates::default()))
            .string(|template| Ok(UrlTemplates(vec![template.into()])))
            .seq(|seq| seq.deserialize::<Vec<Arc<str>>>().map(UrlTemplates))
            .deserialize(deserializer)
    }
}
