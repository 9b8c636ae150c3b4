//! 配置解析模块
//!
//! 支持 TOML (主要) 和 JSON (可选) 格式。

use contracts::{ContractError, StreamBlueprint};

/// 配置文件格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML 格式 (推荐)
    Toml,
    /// JSON 格式
    Json,
}

impl ConfigFormat {
    /// 从文件扩展名推断格式
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 解析 TOML 格式配置
pub fn parse_toml(content: &str) -> Result<StreamBlueprint, ContractError> {
    toml::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 解析 JSON 格式配置
pub fn parse_json(content: &str) -> Result<StreamBlueprint, ContractError> {
    serde_json::from_str(content).map_err(|e| ContractError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// 根据格式解析配置
pub fn parse(content: &str, format: ConfigFormat) -> Result<StreamBlueprint, ContractError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{CheckerSettings, SinkType};

    #[test]
    fn test_parse_toml_counter() {
        let content = r#"
[checker]
strategy = "sequence_counter"
sample_size = 8
frames_for_sync = 3
counter_step = 2
check_every = 4

[acquisition]
packet_size = 64

[[sinks]]
name = "log"
sink_type = "log"
"#;
        let bp = parse_toml(content).unwrap();
        match &bp.checker {
            CheckerSettings::SequenceCounter(s) => {
                assert_eq!(s.frames_for_sync, 3);
                assert_eq!(s.counter_step, 2);
                assert_eq!(s.check_every, Some(4));
                assert_eq!(s.first_counter, 1);
                assert_eq!(s.acquire_from, None);
            }
            other => panic!("unexpected checker: {other:?}"),
        }
        assert_eq!(bp.packet_size(), 64);
        assert_eq!(bp.sinks[0].sink_type, SinkType::Log);
    }

    #[test]
    fn test_parse_json_marker() {
        let content = r#"{
            "checker": {
                "strategy": "marker_bit",
                "sample_size": 4,
                "marker_mask": 2147483648,
                "reset_mask": 2147483648
            },
            "sinks": [{
                "name": "capture",
                "sink_type": "file",
                "params": { "base_path": "/tmp/out", "index": "true" }
            }]
        }"#;
        let bp = parse_json(content).unwrap();
        assert_eq!(bp.checker.strategy(), "marker_bit");
        assert_eq!(bp.packet_size(), 4);
        assert_eq!(bp.sinks[0].params["index"], "true");
    }

    #[test]
    fn test_parse_unknown_strategy() {
        let content = r#"
[checker]
strategy = "crc32"
sample_size = 4
frames_for_sync = 1
"#;
        let err = parse_toml(content).unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let content = "invalid toml [[[";
        let result = parse_toml(content);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ContractError::ConfigParse { .. }));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_extension("toml"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("TOML"),
            Some(ConfigFormat::Toml)
        );
        assert_eq!(
            ConfigFormat::from_extension("json"),
            Some(ConfigFormat::Json)
        );
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
