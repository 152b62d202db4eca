//! Robot API 模块
//!
//! 对外的 [`Robot`] 结构体：一台控制器 = 两个会话 + 两个读线程。
//! 两条通道除了同一台物理机器人之外不共享任何进程内状态，跨通道
//! 协调（例如"abort 之后停发运动"）是上层的策略决定，本层不做。

use crate::meta::OverrideSession;
use crate::motion::MotionSession;
use ekrl_tcp::TcpTxChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};

/// 机器人连接（对外 API）
///
/// 由 [`RobotBuilder`](crate::RobotBuilder) 构建：构建即连接，两条
/// 通道各自拆分出读半（交给读线程）与写半（交给会话）。
///
/// # 生命周期
///
/// 连接期创建、断开时销毁，**不得跨重连复用**——重连必须构建新的
/// `Robot`，以获得新的指令计数器与成帧缓冲。
///
/// Drop 时翻转两条通道的运行标志并 join 读线程；读线程最多一个
/// 接收超时周期后退出。
pub struct Robot {
    pub(crate) motion: MotionSession<TcpTxChannel>,
    pub(crate) safety: OverrideSession<TcpTxChannel>,
    pub(crate) motion_rx: Option<JoinHandle<()>>,
    pub(crate) meta_rx: Option<JoinHandle<()>>,
    /// 运动通道运行标志（停机与通道死亡共用）
    pub(crate) motion_running: Arc<AtomicBool>,
    /// 安全通道运行标志
    pub(crate) meta_running: Arc<AtomicBool>,
}

impl Robot {
    /// 运动通道会话
    pub fn motion(&self) -> &MotionSession<TcpTxChannel> {
        &self.motion
    }

    /// 安全通道会话
    pub fn safety(&self) -> &OverrideSession<TcpTxChannel> {
        &self.safety
    }

    /// 检查两条通道的读线程健康状态
    ///
    /// # 返回
    /// - `(motion_alive, meta_alive)`
    pub fn check_health(&self) -> (bool, bool) {
        let motion_alive = self.motion_running.load(Ordering::Acquire)
            && self.motion_rx.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        let meta_alive = self.meta_running.load(Ordering::Acquire)
            && self.meta_rx.as_ref().map(|h| !h.is_finished()).unwrap_or(false);
        (motion_alive, meta_alive)
    }

    /// 两条通道都存活时返回 `true`
    pub fn is_healthy(&self) -> bool {
        let (motion_alive, meta_alive) = self.check_health();
        motion_alive && meta_alive
    }

    /// 显式关停（等价于 Drop，但给调用方一个明确的同步点）
    pub fn shutdown(mut self) {
        self.stop_readers();
    }

    fn stop_readers(&mut self) {
        // Release: 读线程看到 false 时能看到此前的全部写入
        self.motion_running.store(false, Ordering::Release);
        self.meta_running.store(false, Ordering::Release);

        let mut joined = false;
        if let Some(handle) = self.motion_rx.take() {
            joined = true;
            if handle.join().is_err() {
                warn!("Motion RX thread panicked during shutdown");
            }
        }
        if let Some(handle) = self.meta_rx.take() {
            joined = true;
            if handle.join().is_err() {
                warn!("Meta RX thread panicked during shutdown");
            }
        }
        if joined {
            info!("Robot shut down");
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        self.stop_readers();
    }
}
