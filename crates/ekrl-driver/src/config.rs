//! 连接配置
//!
//! 一台控制器在同一主机上暴露两个独立 TCP 端点：运动通道与安全
//! 通道。配置可以直接用 [`Default`] 内联构造，也可以从 TOML 文件
//! 加载。

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// 配置加载错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// 机器人连接配置
///
/// # 示例
///
/// ```
/// use ekrl_driver::RobotConfig;
///
/// let config = RobotConfig {
///     host: "10.181.116.41".to_string(),
///     ..RobotConfig::default()
/// };
/// assert_eq!(config.motion_port, 54602);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotConfig {
    /// 控制器主机地址
    pub host: String,

    /// 运动通道端口
    pub motion_port: u16,

    /// 安全（meta）通道端口
    pub meta_port: u16,

    /// 连接超时（毫秒）
    pub connect_timeout_ms: u64,

    /// 读取超时（毫秒）。读线程以此节拍轮询停机标志。
    pub receive_timeout_ms: u64,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            motion_port: 54602,
            meta_port: 54601,
            connect_timeout_ms: 3000,
            receive_timeout_ms: 100,
        }
    }
}

impl RobotConfig {
    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports_match_controller_side() {
        let config = RobotConfig::default();
        assert_eq!(config.motion_port, 54602);
        assert_eq!(config.meta_port, 54601);
        assert_eq!(config.connect_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: RobotConfig = toml::from_str("host = \"192.168.1.50\"").unwrap();
        assert_eq!(config.host, "192.168.1.50");
        assert_eq!(config.meta_port, 54601);
    }
}
