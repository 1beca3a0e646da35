use serde::Deserialize;
use std::fs;

use crate::reading::bubble::BubbleLayout;
use crate::reading::classifier::GranularityThresholds;

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub store_path: String,
    pub speech_lang: String,
    // The CLI has no window to measure, so the viewport width comes from here.
    pub viewport_width: f64,
    pub granularity: GranularityThresholds,
    pub bubble: BubbleLayout,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_url: "http://localhost:5000".to_string(),
            store_path: "storycoach-store.json".to_string(),
            speech_lang: "zh-CN".to_string(),
            viewport_width: 1024.0,
            granularity: GranularityThresholds::default(),
            bubble: BubbleLayout::default(),
        }
    }
}

pub fn load_config_from_file(file_path: &str) -> Result<Config, String> {
    match fs::read_to_string(file_path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("Failed to parse {}: {}", file_path, e)),
        Err(e) => Err(format!(
            "Failed to read {}: {}. Please ensure it exists.",
            file_path, e
        )),
    }
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    let config = toml::from_str::<Config>(contents).map_err(|e| e.to_string())?;
    config.granularity.validate()?;
    if config.viewport_width <= 0.0 {
        return Err(format!("viewport_width must be positive, got {}", config.viewport_width));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server_url, "http://localhost:5000");
        assert_eq!(config.granularity, GranularityThresholds::default());
        assert_eq!(config.bubble.edge_margin, 40.0);
        assert_eq!(config.bubble.vertical_offset, 14.0);
    }

    #[test]
    fn partial_tables_keep_other_defaults() {
        let config = parse_config(
            r#"
server_url = "http://reader.local"

[granularity]
phrase = 7

[bubble]
edge_margin = 24.0
"#,
        )
        .unwrap();
        assert_eq!(config.server_url, "http://reader.local");
        assert_eq!(config.granularity.phrase, 7);
        assert_eq!(config.granularity.clause, 20);
        assert_eq!(config.bubble.edge_margin, 24.0);
        assert_eq!(config.bubble.fallback_bottom, 220.0);
    }

    #[test]
    fn rejects_unordered_thresholds() {
        let err = parse_config("[granularity]\nword = 12\n").unwrap_err();
        assert!(err.contains("ascending"), "{}", err);
    }

    #[test]
    fn missing_file_is_reported() {
        let err = load_config_from_file("/definitely/not/here.toml").unwrap_err();
        assert!(err.starts_with("Failed to read"));
    }
}
