//! 安全通道会话
//!
//! 速度倍率与中止指令走独立的 TCP 通道：套接字、缓冲区、读线程
//! 都与运动通道分离，任何时刻（包括运动指令在途时）都可以发送，
//! 不会被运动通道 I/O 阻塞。
//!
//! 两条通道之间**没有顺序保证**：在某次 move 之后发出的 abort，
//! 到达控制器的时机可能在该 move 被执行之前、之中或之后。abort
//! 是带外安全信号，不是依赖队列位置的取消。
//!
//! 安全路径上的发送失败**永不降级**为警告：吞掉它意味着一条停不
//! 下来的运动流。

use crate::error::DriverError;
use crate::state::{CountersSnapshot, MetaContext};
use ekrl_protocol::MetaCommand;
use ekrl_tcp::TxChannel;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

struct MetaTx<T: TxChannel> {
    tx: T,
    /// 已发送指令数（Meta 文档线上不携带 Id，计数器保持每通道
    /// 单调序列的可观测性）
    commands_sent: u64,
}

/// 安全通道会话
pub struct OverrideSession<T: TxChannel> {
    shared: Mutex<MetaTx<T>>,
    ctx: Arc<MetaContext>,
}

impl<T: TxChannel> OverrideSession<T> {
    /// 从写半通道与共享上下文创建会话
    ///
    /// 一般由 [`RobotBuilder`](crate::RobotBuilder) 构建。
    pub fn new(tx: T, ctx: Arc<MetaContext>) -> Self {
        Self {
            shared: Mutex::new(MetaTx {
                tx,
                commands_sent: 0,
            }),
            ctx,
        }
    }

    /// 设置速度倍率
    ///
    /// 超出 `[0.0, 1.0]` 的值被钳制而不是拒绝：越界值永远不允许
    /// 到达控制器。
    pub fn set_override(&self, value: f64) -> Result<(), DriverError> {
        // NaN 按最安全的倍率处理
        let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        if clamped != value {
            warn!("Velocity override {} out of range, clamped to {}", value, clamped);
        }
        self.send(MetaCommand::new(clamped, false))
    }

    /// 紧急停止：倍率 0.0 + 中止在途指令
    pub fn emergency_stop(&self) -> Result<(), DriverError> {
        self.send(MetaCommand::emergency_stop())
    }

    /// 复位中止状态，倍率恢复 1.0
    pub fn reset_abort(&self) -> Result<(), DriverError> {
        self.send(MetaCommand::reset_abort())
    }

    fn send(&self, cmd: MetaCommand) -> Result<(), DriverError> {
        let doc = cmd.to_document();
        let mut shared = self.shared.lock();
        shared.tx.send(doc.as_bytes())?;
        shared.commands_sent += 1;
        info!(
            "Meta command sent: override={}, abort={}",
            cmd.velocity_override, cmd.abort as u8
        );
        Ok(())
    }

    /// 本会话已发送的指令数
    pub fn commands_sent(&self) -> u64 {
        self.shared.lock().commands_sent
    }

    /// 最近一份入站状态文档（原始文本）
    pub fn last_status(&self) -> Option<Arc<String>> {
        self.ctx.last_status.load_full()
    }

    /// 通道计数器快照
    pub fn counters(&self) -> CountersSnapshot {
        self.ctx.counters.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ekrl_tcp::TransportError;

    #[derive(Clone, Default)]
    struct CaptureTx(Arc<Mutex<Vec<u8>>>);

    impl CaptureTx {
        fn captured(&self) -> String {
            String::from_utf8(self.0.lock().clone()).unwrap()
        }
    }

    impl TxChannel for CaptureTx {
        fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
            self.0.lock().extend_from_slice(data);
            Ok(())
        }
    }

    struct FailTx;
    impl TxChannel for FailTx {
        fn send(&mut self, _data: &[u8]) -> Result<(), TransportError> {
            Err(TransportError::PeerClosed)
        }
    }

    fn session_with_capture() -> (OverrideSession<CaptureTx>, CaptureTx) {
        let tx = CaptureTx::default();
        let session = OverrideSession::new(tx.clone(), Arc::new(MetaContext::default()));
        (session, tx)
    }

    #[test]
    fn test_override_above_range_clamped_to_one() {
        let (session, tx) = session_with_capture();
        session.set_override(1.5).unwrap();
        assert!(tx.captured().contains("VelocityOverride=\"1\" AbortCommands=\"0\""));
    }

    #[test]
    fn test_override_below_range_clamped_to_zero() {
        let (session, tx) = session_with_capture();
        session.set_override(-0.3).unwrap();
        assert!(tx.captured().contains("VelocityOverride=\"0\" AbortCommands=\"0\""));
    }

    #[test]
    fn test_override_in_range_passes_through() {
        let (session, tx) = session_with_capture();
        session.set_override(0.4).unwrap();
        assert!(tx.captured().contains("VelocityOverride=\"0.4\""));
    }

    #[test]
    fn test_emergency_stop_and_reset_documents() {
        let (session, tx) = session_with_capture();
        session.emergency_stop().unwrap();
        session.reset_abort().unwrap();

        let wire = tx.captured();
        assert!(wire.contains("VelocityOverride=\"0\" AbortCommands=\"1\""));
        assert!(wire.contains("VelocityOverride=\"1\" AbortCommands=\"0\""));
        assert_eq!(session.commands_sent(), 2);
    }

    #[test]
    fn test_send_failure_propagates() {
        let session = OverrideSession::new(FailTx, Arc::new(MetaContext::default()));
        // 安全路径错误必须上抛，绝不吞掉
        assert!(session.emergency_stop().is_err());
        assert_eq!(session.commands_sent(), 0);
    }
}
