//! 读线程循环模块
//!
//! 每条通道一个专属读线程，生命周期覆盖整个连接：
//!
//! - 运动通道：接收 → 帧重组 → 解码 RobotState → 交换状态单元 →
//!   触发关节回调
//! - 安全通道：接收 → 帧重组 → 保留最新原始状态文档
//!
//! 读线程以带超时的阻塞读轮询（超时是"暂无数据"，不是错误），
//! 通过 `AtomicBool` 响应停机；通道死亡（对端关闭、致命 I/O 错误）
//! 时翻转同一标志并退出，调用方由此观察到通道失效。
//!
//! 错误分层：成帧错误与解码错误在本循环内局部恢复（记录、计数、
//! 保留上一份有效状态），只有连接级错误才终止循环。

use crate::hooks::SinkRegistry;
use crate::state::{MetaContext, MotionContext};
use ekrl_protocol::{DocumentAssembler, RobotState};
use ekrl_tcp::{RxChannel, TransportError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// 读循环配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 单次接收的缓冲区大小
    pub read_chunk: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { read_chunk: 4096 }
    }
}

/// 运动通道读循环
///
/// # 参数
/// - `rx`: 通道读半（线程独占）
/// - `ctx`: 共享状态上下文
/// - `sinks`: 关节状态回调注册表
/// - `is_running`: 本通道的运行标志（停机与通道死亡共用）
pub fn motion_rx_loop(
    mut rx: impl RxChannel,
    ctx: Arc<MotionContext>,
    sinks: Arc<SinkRegistry>,
    is_running: Arc<AtomicBool>,
    config: PipelineConfig,
) {
    let mut asm = DocumentAssembler::new();
    let mut buf = vec![0u8; config.read_chunk];

    loop {
        // Acquire: 看到 false 时必须同时看到其他线程的清理写入
        if !is_running.load(Ordering::Acquire) {
            trace!("Motion RX: is_running flag is false, exiting");
            break;
        }

        let n = match rx.receive(&mut buf) {
            // 超时：暂无数据，回到循环顶部检查停机标志
            Ok(0) => continue,
            Ok(n) => n,
            Err(TransportError::PeerClosed) => {
                info!("Motion RX: peer closed connection");
                is_running.store(false, Ordering::Release);
                break;
            }
            Err(e) => {
                error!("Motion RX: receive error: {}", e);
                is_running.store(false, Ordering::Release);
                break;
            }
        };

        asm.feed(&buf[..n]);
        for doc in asm.documents() {
            match doc {
                Ok(doc) => match RobotState::from_document(&doc) {
                    Ok(state) => {
                        let joints = state.joints;
                        ctx.robot_state.store(Some(Arc::new(state)));
                        ctx.counters.documents.fetch_add(1, Ordering::Relaxed);
                        sinks.notify_all(&joints);
                    }
                    Err(e) => {
                        // 本帧丢弃，上一份有效状态保留，循环继续
                        warn!("Motion RX: dropping malformed state document: {}", e);
                        ctx.counters.decode_errors.fetch_add(1, Ordering::Relaxed);
                    }
                },
                Err(e) => {
                    warn!("Motion RX: framing error (resynced): {}", e);
                    ctx.counters.framing_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    trace!("Motion RX: loop exited");
}

/// 安全通道读循环
///
/// 入站 meta 文档没有规定的模式：成帧、计数、保留最新一份原始
/// 文档，不做解码。
pub fn meta_rx_loop(
    mut rx: impl RxChannel,
    ctx: Arc<MetaContext>,
    is_running: Arc<AtomicBool>,
    config: PipelineConfig,
) {
    let mut asm = DocumentAssembler::new();
    let mut buf = vec![0u8; config.read_chunk];

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Meta RX: is_running flag is false, exiting");
            break;
        }

        let n = match rx.receive(&mut buf) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(TransportError::PeerClosed) => {
                info!("Meta RX: peer closed connection");
                is_running.store(false, Ordering::Release);
                break;
            }
            Err(e) => {
                error!("Meta RX: receive error: {}", e);
                is_running.store(false, Ordering::Release);
                break;
            }
        };

        asm.feed(&buf[..n]);
        for doc in asm.documents() {
            match doc {
                Ok(doc) => {
                    debug!("Meta RX: status document ({} bytes)", doc.len());
                    ctx.last_status.store(Some(Arc::new(doc)));
                    ctx.counters.documents.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    warn!("Meta RX: framing error (resynced): {}", e);
                    ctx.counters.framing_errors.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    trace!("Meta RX: loop exited");
}
