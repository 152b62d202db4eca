//! 驱动层错误类型定义

use crate::config::ConfigError;
use crate::points::PointStoreError;
use ekrl_protocol::ProtocolError;
use ekrl_tcp::TransportError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 通道层错误（连接失败、对端关闭、发送失败）
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// 协议解析错误
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 点位存储错误
    #[error("point store error: {0}")]
    PointStore(#[from] PointStoreError),

    /// 配置加载错误
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 尚未收到任何状态遥测
    #[error("no robot state received yet")]
    StateUnavailable,

    /// 无效输入（如空的运动序列）
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
