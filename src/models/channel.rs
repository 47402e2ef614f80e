// Channel configuration model
// Matches the persisted ambient config document structure

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How dangerous a location feels; biases the tone of generated events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, poise::ChoiceParameter)]
#[serde(rename_all = "lowercase")]
pub enum DangerLevel {
    #[name = "low"]
    Low,
    #[name = "medium"]
    Medium,
    #[name = "high"]
    High,
}

impl Default for DangerLevel {
    fn default() -> Self {
        DangerLevel::Low
    }
}

impl DangerLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DangerLevel::Low => "low",
            DangerLevel::Medium => "medium",
            DangerLevel::High => "high",
        }
    }

    /// Probability that a generated event takes an ominous tone
    pub fn ominous_chance(&self) -> f64 {
        match self {
            DangerLevel::Low => 0.08,
            DangerLevel::Medium => 0.2,
            DangerLevel::High => 0.4,
        }
    }
}

/// Per-channel ambient configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub danger: DangerLevel,
    #[serde(default)]
    pub lore: String,
    #[serde(default)]
    pub criteria: String,
    #[serde(default)]
    pub enabled: bool,
    /// Absent and `null` both mean "never"; saved documents omit the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_posted_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Fields written by other tools are kept as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Values supplied by `/ambient set`
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    pub location: String,
    pub danger: DangerLevel,
    pub lore: String,
    pub criteria: String,
}

/// The whole persisted state: channel id -> config
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub channels: BTreeMap<String, ChannelConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ConfigDocument {
    pub fn get(&self, channel_id: &str) -> Option<&ChannelConfig> {
        self.channels.get(channel_id)
    }

    /// Get a channel's config, creating it with defaults if absent
    pub fn entry(&mut self, channel_id: &str) -> &mut ChannelConfig {
        self.channels.entry(channel_id.to_string()).or_default()
    }

    /// Create-or-update a channel's settings, keeping its enabled flag
    pub fn apply_settings<Tz: TimeZone>(
        &mut self,
        channel_id: &str,
        settings: ChannelSettings,
        now: &DateTime<Tz>,
    ) -> &ChannelConfig {
        let config = self.entry(channel_id);
        config.location = settings.location;
        config.danger = settings.danger;
        config.lore = settings.lore;
        config.criteria = settings.criteria;
        config.updated_at = Some(iso_timestamp(now));
        config
    }

    pub fn set_enabled(&mut self, channel_id: &str, enabled: bool) -> &ChannelConfig {
        let config = self.entry(channel_id);
        config.enabled = enabled;
        config
    }

    /// Record a successful post. No-op for unknown channels.
    pub fn mark_posted<Tz: TimeZone>(&mut self, channel_id: &str, now: &DateTime<Tz>) {
        if let Some(config) = self.channels.get_mut(channel_id) {
            config.last_posted_at = Some(iso_timestamp(now));
        }
    }
}

/// ISO-8601 UTC timestamp with millisecond precision, e.g. `2024-05-01T12:00:00.000Z`
pub fn iso_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String {
    at.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ChannelSettings {
        ChannelSettings {
            location: "The Drowned Market".to_string(),
            danger: DangerLevel::Medium,
            lore: "A flooded bazaar".to_string(),
            criteria: String::new(),
        }
    }

    #[test]
    fn test_enable_then_disable_yields_defaults() {
        let mut doc = ConfigDocument::default();
        doc.set_enabled("42", true);
        doc.set_enabled("42", false);

        let expected = ChannelConfig::default();
        assert_eq!(doc.get("42"), Some(&expected));
        assert!(!doc.get("42").unwrap().enabled);
        assert_eq!(doc.get("42").unwrap().danger, DangerLevel::Low);
    }

    #[test]
    fn test_apply_settings_preserves_enabled() {
        let mut doc = ConfigDocument::default();
        doc.set_enabled("42", true);

        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let config = doc.apply_settings("42", settings(), &now);

        assert!(config.enabled);
        assert_eq!(config.location, "The Drowned Market");
        assert_eq!(config.danger, DangerLevel::Medium);
        assert_eq!(config.updated_at.as_deref(), Some("2024-05-01T12:00:00.000Z"));
        assert_eq!(config.last_posted_at, None);
    }

    #[test]
    fn test_mark_posted_ignores_unknown_channel() {
        let mut doc = ConfigDocument::default();
        doc.mark_posted("missing", &Utc::now());
        assert!(doc.channels.is_empty());
    }

    #[test]
    fn test_document_wire_format() {
        let raw = r#"{
            "channels": {
                "123": {
                    "location": "Old Mill",
                    "danger": "high",
                    "lore": "",
                    "criteria": "no dragons",
                    "enabled": true,
                    "lastPostedAt": "2024-01-02T03:04:05.000Z",
                    "emoji": "🌾"
                }
            },
            "version": 2
        }"#;

        let doc: ConfigDocument = serde_json::from_str(raw).unwrap();
        let config = doc.get("123").unwrap();
        assert_eq!(config.danger, DangerLevel::High);
        assert_eq!(config.criteria, "no dragons");
        assert_eq!(config.updated_at, None);

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["version"], 2);
        assert_eq!(value["channels"]["123"]["lastPostedAt"], "2024-01-02T03:04:05.000Z");
        assert_eq!(value["channels"]["123"]["emoji"], "🌾");
        assert!(value["channels"]["123"].get("updatedAt").is_none());
    }

    #[test]
    fn test_missing_channels_defaults_to_empty() {
        let doc: ConfigDocument = serde_json::from_str("{}").unwrap();
        assert!(doc.channels.is_empty());
    }

    #[test]
    fn test_ominous_chance() {
        assert_eq!(DangerLevel::Low.ominous_chance(), 0.08);
        assert_eq!(DangerLevel::Medium.ominous_chance(), 0.2);
        assert_eq!(DangerLevel::High.ominous_chance(), 0.4);
    }
}
