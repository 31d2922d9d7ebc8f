use indexmap::IndexMap;
use serde::Deserialize;
use ustr::Ustr;

#[derive(Deserialize, Clone, Debug)]
pub struct AssetsIndex {
    pub objects: IndexMap<Ustr, AssetObject>,
    // Used for 1.7 and below, indicates that the objects should be stored
    // in assets/virtual/{assets_id}/ instead
    #[serde(default)]
    pub r#virtual: Option<bool>,
    // Used for 1.5 and below, indicates that the objects should be stored
    // in .minecraft/resources instead
    #[serde(default)]
    pub map_to_resources: Option<bool>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct AssetObject {
    pub hash: Ustr,
    pub size: u64,
}

impl AssetsIndex {
    /// Distinct object hashes in index order. Logical names sharing a hash share one file.
    pub fn unique_hashes(&self) -> Vec<Ustr> {
        let mut seen = indexmap::IndexSet::with_capacity(self.objects.len());
        for object in self.objects.values() {
            seen.insert(object.hash);
        }
        seen.into_iter().collect()
    }
}

/// Content-addressed objects are sharded by the first two hex characters of their hash.
pub fn is_valid_object_hash(hash: &str) -> bool {
    hash.len() == 40 && hash.bytes().all(|byte| byte.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_hashes_are_collapsed() {
        let index: AssetsIndex = serde_json::from_str(r#"{"objects": {
            "minecraft/sounds/a.ogg": {"hash": "1111111111111111111111111111111111111111", "size": 3},
            "minecraft/sounds/b.ogg": {"hash": "1111111111111111111111111111111111111111", "size": 3},
            "minecraft/lang/en_us.json": {"hash": "2222222222222222222222222222222222222222", "size": 9}
        }}"#).unwrap();

        let hashes = index.unique_hashes();
        assert_eq!(hashes.len(), 2);
        assert_eq!(hashes[0].as_str(), "1111111111111111111111111111111111111111");
    }

    #[test]
    fn rejects_traversal_hashes() {
        assert!(is_valid_object_hash("0123456789abcdef0123456789abcdef01234567"));
        assert!(!is_valid_object_hash("../../../../etc/passwd"));
        assert!(!is_valid_object_hash("abc"));
    }
}
