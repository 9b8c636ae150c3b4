//! StreamBlueprint - Config Loader 输出
//!
//! 描述一次采集会话的完整配置：校验策略、采集参数、输出路由。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::CheckerSettings;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的采集会话配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 样本校验策略
    pub checker: CheckerSettings,

    /// 采集参数 (frame producer)
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// 输出路由配置
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

impl StreamBlueprint {
    /// Packet size with the default (one sample per packet) applied
    pub fn packet_size(&self) -> usize {
        self.acquisition
            .packet_size
            .unwrap_or_else(|| self.checker.config().sample_len())
    }
}

/// 采集参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// 每个数据包的字节数，包头即被校验的样本 (None = sample_size)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub packet_size: Option<usize>,

    /// 回放时每个采集周期读取的字节数
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,

    /// 连续同步失败的容忍次数 (0 = 不限)
    #[serde(default)]
    pub max_sync_failures: u32,

    /// 是否假设数据流从包边界开始
    #[serde(default = "default_start_locked")]
    pub start_locked: bool,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            packet_size: None,
            read_chunk: default_read_chunk(),
            max_sync_failures: 0,
            start_locked: default_start_locked(),
        }
    }
}

fn default_read_chunk() -> usize {
    4096
}

fn default_start_locked() -> bool {
    true
}

/// Sink 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink 名称 (唯一)
    pub name: String,

    /// Sink 类型
    pub sink_type: SinkType,

    /// 队列容量
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Sink 特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_queue_capacity() -> usize {
    256
}

/// Sink 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// 日志输出
    Log,
    /// 写入二进制文件
    File,
}
