//! 配置校验模块
//!
//! 校验规则：
//! - 校验策略自身的不变量 (sample_size, frames_for_sync, counter_step ...)
//! - packet_size 为 sample_size 的正整数倍
//! - read_chunk > 0
//! - sink 名称非空且唯一
//! - queue_capacity > 0
//! - file sink 参数合法

use std::collections::HashSet;

use contracts::{ContractError, SinkType, StreamBlueprint};

/// 校验 StreamBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    blueprint.checker.validate()?;
    validate_acquisition(blueprint)?;
    validate_sink_names(blueprint)?;
    validate_sink_params(blueprint)?;
    Ok(())
}

/// 校验采集参数
fn validate_acquisition(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    let sample_size = blueprint.checker.config().sample_len();
    let packet_size = blueprint.packet_size();

    if packet_size == 0 || packet_size % sample_size != 0 {
        return Err(ContractError::config_validation(
            "acquisition.packet_size",
            format!(
                "packet_size ({packet_size}) must be a positive multiple of sample_size ({sample_size})"
            ),
        ));
    }

    if blueprint.acquisition.read_chunk == 0 {
        return Err(ContractError::config_validation(
            "acquisition.read_chunk",
            "read_chunk must be > 0",
        ));
    }

    Ok(())
}

/// 校验 sink 名称与队列容量
fn validate_sink_names(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in blueprint.sinks.iter().enumerate() {
        if sink.name.is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{}].name", idx),
                "sink name cannot be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
    }
    Ok(())
}

/// 校验 sink 特定参数
fn validate_sink_params(blueprint: &StreamBlueprint) -> Result<(), ContractError> {
    for sink in &blueprint.sinks {
        if sink.sink_type != SinkType::File {
            continue;
        }
        if let Some(path) = sink.params.get("base_path") {
            if path.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.base_path", sink.name),
                    "base_path cannot be empty",
                ));
            }
        }
        if let Some(index) = sink.params.get("index") {
            if index.parse::<bool>().is_err() {
                return Err(ContractError::config_validation(
                    format!("sinks[{}].params.index", sink.name),
                    format!("index must be \"true\" or \"false\", got \"{index}\""),
                ));
            }
        }
    }
    Ok(())
}
