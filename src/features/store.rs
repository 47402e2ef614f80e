// Config Store
// The whole ambient configuration lives in one JSON document on disk.
// Every operation re-reads the file; there is no in-memory cache and no lock,
// so concurrent writers race and the last save wins.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::channel::{ChannelConfig, ConfigDocument};

/// Typed fields of a channel entry, in wire spelling
const CHANNEL_FIELDS: &[&str] = &[
    "location",
    "danger",
    "lore",
    "criteria",
    "enabled",
    "lastPostedAt",
    "updatedAt",
];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Reasons an uploaded config document is rejected
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("the file must have a .json extension")]
    WrongExtension,
    #[error("could not download the attachment: {0}")]
    Download(String),
    #[error("the file is not valid JSON: {0}")]
    InvalidJson(serde_json::Error),
    #[error("the document has the wrong shape: {0}")]
    WrongShape(String),
}

pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document. Missing, unreadable or non-JSON files yield an empty
    /// document. A bad channel entry never takes the other channels with it.
    pub fn load(&self) -> ConfigDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config at {}, starting empty", self.path.display());
                return ConfigDocument::default();
            }
            Err(e) => {
                warn!("Failed to read config {}: {:?}", self.path.display(), e);
                return ConfigDocument::default();
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(value) => decode_document(value),
            Err(e) => {
                warn!("Config {} is corrupt, treating as empty: {}", self.path.display(), e);
                ConfigDocument::default()
            }
        }
    }

    /// Overwrite the file with the full document
    pub fn save(&self, doc: &ConfigDocument) -> Result<(), StoreError> {
        let json = to_pretty_json(doc)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StoreError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        fs::write(&self.path, json).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })?;
        debug!("Saved {} channel(s) to {}", doc.channels.len(), self.path.display());
        Ok(())
    }

    /// Discard all prior state and store `doc` in its place
    pub fn replace(&self, doc: &ConfigDocument) -> Result<(), StoreError> {
        self.save(doc)
    }
}

fn decode_document(value: Value) -> ConfigDocument {
    let mut root = match value {
        Value::Object(root) => root,
        _ => {
            warn!("Config top level is not an object, treating as empty");
            return ConfigDocument::default();
        }
    };

    let mut channels = BTreeMap::new();
    match root.remove("channels") {
        Some(Value::Object(entries)) => {
            for (channel_id, entry) in entries {
                if let Some(config) = decode_channel(&channel_id, entry) {
                    channels.insert(channel_id, config);
                }
            }
        }
        Some(other) => warn!("Config \"channels\" is not an object, ignoring: {}", other),
        None => {}
    }

    ConfigDocument {
        channels,
        extra: root,
    }
}

/// Decode one entry, resetting fields with unusable values to their defaults
fn decode_channel(channel_id: &str, entry: Value) -> Option<ChannelConfig> {
    let mut fields = match entry {
        Value::Object(fields) => fields,
        other => {
            warn!("Skipping channel {}: entry is not an object: {}", channel_id, other);
            return None;
        }
    };

    match serde_json::from_value::<ChannelConfig>(Value::Object(fields.clone())) {
        Ok(config) => return Some(config),
        Err(e) => warn!("Channel {} has invalid fields, resetting them: {}", channel_id, e),
    }

    for key in CHANNEL_FIELDS {
        if let Some(value) = fields.get(*key) {
            let mut single = Map::new();
            single.insert((*key).to_string(), value.clone());
            if serde_json::from_value::<ChannelConfig>(Value::Object(single)).is_err() {
                warn!("Channel {}: dropping invalid {} = {}", channel_id, key, value);
                fields.remove(*key);
            }
        }
    }

    match serde_json::from_value(Value::Object(fields)) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!("Skipping channel {}: {}", channel_id, e);
            None
        }
    }
}

/// Human-readable serialization shared by `save` and `/ambient export`
pub fn to_pretty_json(doc: &ConfigDocument) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    Ok(json)
}

/// Uploads are only considered when the file name ends in `.json`
pub fn has_json_extension(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().ends_with(".json")
}

/// Validate uploaded bytes before they replace the store
pub fn parse_import(bytes: &[u8]) -> Result<ConfigDocument, ImportError> {
    let value: Value = serde_json::from_slice(bytes).map_err(ImportError::InvalidJson)?;

    let channels = value
        .as_object()
        .ok_or_else(|| ImportError::WrongShape("top level must be an object".to_string()))?
        .get("channels")
        .ok_or_else(|| ImportError::WrongShape("missing \"channels\"".to_string()))?;
    if !channels.is_object() {
        return Err(ImportError::WrongShape("\"channels\" must be an object".to_string()));
    }

    serde_json::from_value(value).map_err(|e| ImportError::WrongShape(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::channel::DangerLevel;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"{
  "channels": {
    "1001": {
      "location": "Ashen Road",
      "danger": "medium",
      "lore": "",
      "criteria": "",
      "enabled": true,
      "updatedAt": "2024-03-01T08:00:00.000Z"
    }
  }
}
"#;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("nope.json"));
        assert_eq!(store.load(), ConfigDocument::default());
    }

    #[test]
    fn test_load_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambient.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ConfigStore::new(&path).load().channels.is_empty());

        fs::write(&path, r#"{"other": 1}"#).unwrap();
        assert!(ConfigStore::new(&path).load().channels.is_empty());
    }

    #[test]
    fn test_save_load_is_stable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambient.json");
        fs::write(&path, SAMPLE).unwrap();

        let store = ConfigStore::new(&path);
        let doc = store.load();
        assert_eq!(doc.get("1001").unwrap().danger, DangerLevel::Medium);

        store.save(&doc).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("data").join("ambient.json"));

        let mut doc = ConfigDocument::default();
        doc.set_enabled("7", true);
        store.save(&doc).unwrap();

        assert!(store.load().get("7").unwrap().enabled);
    }

    #[test]
    fn test_save_write_error() {
        let dir = TempDir::new().unwrap();
        // A directory can't be overwritten as a file
        let store = ConfigStore::new(dir.path());
        let err = store.save(&ConfigDocument::default()).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
    }

    #[test]
    fn test_load_keeps_good_channels_beside_a_bad_one() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambient.json");
        fs::write(
            &path,
            r#"{
                "channels": {
                    "1": {"location": "Ashen Road", "danger": "low", "enabled": true},
                    "2": {"location": "Sunken Gate", "danger": "extreme", "enabled": "true", "emoji": "🌊"},
                    "3": "not an entry"
                },
                "version": 2
            }"#,
        )
        .unwrap();
        let store = ConfigStore::new(&path);

        let mut doc = store.load();
        let repaired = doc.get("2").unwrap();
        assert_eq!(repaired.location, "Sunken Gate");
        assert_eq!(repaired.danger, DangerLevel::Low);
        assert!(!repaired.enabled);
        assert_eq!(repaired.extra["emoji"], "🌊");
        assert!(doc.get("3").is_none());

        doc.set_enabled("4", true);
        store.save(&doc).unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded.get("1").unwrap().location, "Ashen Road");
        assert!(reloaded.get("1").unwrap().enabled);
        assert_eq!(reloaded.get("2").unwrap().location, "Sunken Gate");
        assert!(reloaded.get("4").unwrap().enabled);
        assert_eq!(reloaded.extra["version"], 2);
    }

    #[test]
    fn test_json_extension() {
        assert!(has_json_extension("backup.json"));
        assert!(has_json_extension("backup.JSON"));
        assert!(!has_json_extension("backup.txt"));
        assert!(!has_json_extension("json"));
    }

    #[test]
    fn test_parse_import_accepts_valid_document() {
        let doc = parse_import(SAMPLE.as_bytes()).unwrap();
        assert!(doc.get("1001").unwrap().enabled);
    }

    #[test]
    fn test_parse_import_rejections() {
        assert!(matches!(parse_import(b"{oops"), Err(ImportError::InvalidJson(_))));
        assert!(matches!(parse_import(b"[]"), Err(ImportError::WrongShape(_))));
        assert!(matches!(
            parse_import(br#"{"servers": {}}"#),
            Err(ImportError::WrongShape(_))
        ));
        assert!(matches!(
            parse_import(br#"{"channels": []}"#),
            Err(ImportError::WrongShape(_))
        ));
        assert!(matches!(
            parse_import(br#"{"channels": {"1": {"danger": "extreme"}}}"#),
            Err(ImportError::WrongShape(_))
        ));
    }

    #[test]
    fn test_export_import_round_trip_is_exact() {
        let exported = r#"{
  "channels": {
    "1001": {
      "location": "Ashen Road",
      "danger": "medium",
      "lore": "Caravans avoid it after dark",
      "criteria": "",
      "enabled": true,
      "lastPostedAt": "2024-03-02T09:30:00.000Z",
      "updatedAt": "2024-03-01T08:00:00.000Z",
      "emoji": "🛤️"
    },
    "1002": {
      "location": "Lantern Quay",
      "danger": "high",
      "lore": "",
      "criteria": "no sea monsters",
      "enabled": false
    },
    "1003": {
      "location": "",
      "danger": "low",
      "lore": "",
      "criteria": "",
      "enabled": false,
      "updatedAt": "2024-04-10T22:15:07.123Z",
      "notes": {
        "owner": "gm",
        "tags": [
          "town",
          "safe"
        ]
      }
    }
  },
  "exportedBy": "ambient-bot",
  "version": 2
}
"#;

        let doc = parse_import(exported.as_bytes()).unwrap();
        assert_eq!(doc.channels.len(), 3);
        assert_eq!(to_pretty_json(&doc).unwrap(), exported);

        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("ambient.json"));
        store.replace(&doc).unwrap();
        assert_eq!(to_pretty_json(&store.load()).unwrap(), exported);
    }

    #[test]
    fn test_null_timestamps_export_as_absent() {
        let doc = parse_import(
            br#"{"channels": {"5": {"location": "Mire", "lastPostedAt": null, "updatedAt": null}}}"#,
        )
        .unwrap();
        assert_eq!(doc.get("5").unwrap().last_posted_at, None);

        let exported = to_pretty_json(&doc).unwrap();
        assert!(!exported.contains("lastPostedAt"));
        assert!(!exported.contains("updatedAt"));

        let again = to_pretty_json(&parse_import(exported.as_bytes()).unwrap()).unwrap();
        assert_eq!(again, exported);
    }

    #[test]
    fn test_rejected_import_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambient.json");
        fs::write(&path, SAMPLE).unwrap();
        let store = ConfigStore::new(&path);

        let result = parse_import(br#"{"version": 3}"#).map(|doc| store.replace(&doc));
        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), SAMPLE);
    }

    #[test]
    fn test_replace_discards_prior_state() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ambient.json");
        fs::write(&path, SAMPLE).unwrap();
        let store = ConfigStore::new(&path);

        let incoming = parse_import(br#"{"channels": {"2002": {"location": "Quay"}}}"#).unwrap();
        store.replace(&incoming).unwrap();

        let doc = store.load();
        assert!(doc.get("1001").is_none());
        assert_eq!(doc.get("2002").unwrap().location, "Quay");
    }
}
