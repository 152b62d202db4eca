//! 通道共享状态
//!
//! 读线程是唯一写入方，调用方通过 `ArcSwap` 做无锁读取，永远不会
//! 观察到半更新的位姿。
//!
//! 遥测采用 **latest-wins**：自上次读取以来到达多帧状态时只保留
//! 最新一帧，过期遥测被有意丢弃而不是排队。

use arc_swap::ArcSwapOption;
use ekrl_protocol::RobotState;
use std::sync::atomic::{AtomicU64, Ordering};

/// 每通道计数器（原子，Relaxed 足够：仅用于观测）
#[derive(Debug, Default)]
pub struct ChannelCounters {
    /// 成帧成功的文档数
    pub documents: AtomicU64,
    /// 解码失败被丢弃的文档数
    pub decode_errors: AtomicU64,
    /// 成帧错误（已重新同步）数
    pub framing_errors: AtomicU64,
}

/// 计数器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub documents: u64,
    pub decode_errors: u64,
    pub framing_errors: u64,
}

impl ChannelCounters {
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            documents: self.documents.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            framing_errors: self.framing_errors.load(Ordering::Relaxed),
        }
    }
}

/// 运动通道共享上下文
///
/// 读线程写入，会话与调用方无锁读取（`ArcSwapOption::load`）。
#[derive(Debug, Default)]
pub struct MotionContext {
    /// 最近一帧有效状态。解码失败时**不**写入，保留上一份有效值。
    pub robot_state: ArcSwapOption<RobotState>,
    pub counters: ChannelCounters,
}

/// 安全通道共享上下文
///
/// 入站 meta 文档没有规定的模式：只保留最新一份原始文档供诊断。
#[derive(Debug, Default)]
pub struct MetaContext {
    pub last_status: ArcSwapOption<String>,
    pub counters: ChannelCounters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekrl_protocol::{JointState, Pose};

    #[test]
    fn test_latest_wins_swap() {
        let ctx = MotionContext::default();
        assert!(ctx.robot_state.load_full().is_none());

        let first = RobotState {
            pose: Pose::unnamed(1.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            joints: JointState::default(),
        };
        let second = RobotState {
            pose: Pose::unnamed(2.0, 0.0, 0.0, 0.0, 0.0, 0.0),
            joints: JointState::default(),
        };
        ctx.robot_state.store(Some(std::sync::Arc::new(first)));
        ctx.robot_state.store(Some(std::sync::Arc::new(second)));

        let seen = ctx.robot_state.load_full().unwrap();
        assert_eq!(seen.pose.x, 2.0);
    }
}
