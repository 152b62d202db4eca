//! 关节状态回调
//!
//! 可视化/仿真等协作方通过 [`JointStateSink`] 订阅关节快照，每重组
//! 出一帧运动通道状态文档触发一次。
//!
//! # 设计原则
//!
//! - **非阻塞**：回调在读线程上执行，必须立即返回；需要重活的
//!   实现应当走通道异步处理（见 [`ChannelSink`]）
//! - **失败隔离**：回调不返回错误，解码失败的帧根本不会到达回调

use crossbeam_channel::{bounded, Receiver, Sender};
use ekrl_protocol::JointState;
use std::sync::Arc;

/// 关节状态回调 Trait
pub trait JointStateSink: Send + Sync {
    /// 每帧有效的运动通道状态文档调用一次
    fn on_joint_state(&self, joints: &JointState);
}

/// 回调注册表
///
/// 在构建期装配，运行期只读，读线程遍历触发。
#[derive(Default)]
pub struct SinkRegistry {
    sinks: Vec<Arc<dyn JointStateSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, sink: Arc<dyn JointStateSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// 触发全部回调
    pub fn notify_all(&self, joints: &JointState) {
        for sink in &self.sinks {
            sink.on_joint_state(joints);
        }
    }
}

/// 通道回调：把关节快照转发到 crossbeam 通道
///
/// 使用 `try_send`，接收方跟不上时丢弃最旧以外的帧——遥测是
/// latest-wins 的，堆积没有意义。
///
/// # 示例
///
/// ```
/// use ekrl_driver::hooks::{ChannelSink, JointStateSink};
/// use ekrl_protocol::JointState;
///
/// let (sink, rx) = ChannelSink::new(16);
/// sink.on_joint_state(&JointState::new(10.0, 0.0, 0.0, 0.0, 0.0, 0.0));
/// assert_eq!(rx.recv().unwrap().a1, 10.0);
/// ```
pub struct ChannelSink {
    tx: Sender<JointState>,
}

impl ChannelSink {
    pub fn new(capacity: usize) -> (Self, Receiver<JointState>) {
        let (tx, rx) = bounded(capacity);
        (Self { tx }, rx)
    }
}

impl JointStateSink for ChannelSink {
    fn on_joint_state(&self, joints: &JointState) {
        // 通道满时丢帧，绝不阻塞读线程
        let _ = self.tx.try_send(*joints);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_notifies_every_sink() {
        let (sink_a, rx_a) = ChannelSink::new(4);
        let (sink_b, rx_b) = ChannelSink::new(4);
        let mut registry = SinkRegistry::new();
        registry.add(Arc::new(sink_a));
        registry.add(Arc::new(sink_b));

        registry.notify_all(&JointState::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
        assert_eq!(rx_a.recv().unwrap().a3, 3.0);
        assert_eq!(rx_b.recv().unwrap().a6, 6.0);
    }

    #[test]
    fn test_full_channel_drops_instead_of_blocking() {
        let (sink, rx) = ChannelSink::new(1);
        sink.on_joint_state(&JointState::new(1.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        sink.on_joint_state(&JointState::new(2.0, 0.0, 0.0, 0.0, 0.0, 0.0));
        assert_eq!(rx.recv().unwrap().a1, 1.0);
        assert!(rx.try_recv().is_err());
    }
}
