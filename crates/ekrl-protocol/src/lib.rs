//! # EKRL Protocol
//!
//! KUKA EthernetKRL 文本协议定义（无 I/O 依赖）
//!
//! ## 模块
//!
//! - `types`: 位姿、关节快照与协议枚举
//! - `control`: 控制文档构建（Move / Grip / Meta）
//! - `feedback`: 状态文档解析（RobotState）
//! - `framing`: 字节流到文档的帧重组
//!
//! ## 线格式
//!
//! 两条通道都使用同一包装：XML 声明 + `<EthernetKRL>` 根元素。线上
//! **没有长度前缀**，文档仅由起始/闭合标签定界，帧重组语义见
//! [`framing::DocumentAssembler`]。

pub mod control;
pub mod feedback;
pub mod framing;
pub mod types;

// 重新导出常用类型
pub use control::{
    CommandId, GripCommand, JawGrip, MetaCommand, MoveCommand, VacuumGrip, COMMAND_TYPE_GRIP,
    COMMAND_TYPE_MOVE,
};
pub use feedback::{decode_pose, RobotState};
pub use framing::{DocumentAssembler, FramingError};
pub use types::{GripDirection, GripperMode, JointState, MotionMode, Pose};

use thiserror::Error;

/// 状态文档解析错误
///
/// 解析失败是原子的：调用方不会看到半构造的位姿或关节快照。
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("state element <{element}> not found")]
    MissingElement { element: &'static str },

    #[error("attribute {attribute} missing on <{element}>")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("attribute {attribute}=\"{value}\" is not numeric")]
    InvalidNumber {
        attribute: &'static str,
        value: String,
    },
}
