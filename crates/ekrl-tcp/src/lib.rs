//! # EKRL TCP 通道层
//!
//! 通道抽象层，提供统一的字节流通道接口。
//!
//! 一台控制器暴露两个独立 TCP 端点（运动通道 / 安全通道），每条
//! 通道的套接字与缓冲区都归该通道私有——两条通道之间没有任何共享
//! I/O 状态，读取方永远不会阻塞发送方。

use std::time::Duration;

pub mod tcp;

pub use tcp::{TcpRxChannel, TcpTransport, TcpTxChannel};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use thiserror::Error;

/// 通道层统一错误类型
///
/// 连接类错误对会话是致命的：不做自动重连，直接上抛调用方。
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connect to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// 在 `connect()` 之前调用了传输操作
    #[error("not connected")]
    NotConnected,

    /// 对端关闭了连接（EOF）
    #[error("peer closed connection")]
    PeerClosed,
}

/// 字节流通道
///
/// # 接收语义
///
/// `receive` 最多阻塞到配置的超时：
/// - `Ok(n)`，n > 0：读到了 n 字节
/// - `Ok(0)`：超时内没有数据——**不是错误**，调用方以此轮询停机标志
/// - `Err(PeerClosed)`：对端关闭（EOF），通道翻转为未连接
///
/// # 发送语义
///
/// `send` 是完整写：内部处理部分写，绝不静默截断。
pub trait EkiTransport {
    /// 建立连接。已连接时幂等。
    fn connect(&mut self) -> Result<(), TransportError>;

    /// 断开连接。可重复调用。
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    fn set_receive_timeout(&mut self, _timeout: Duration) {}
}

/// 只读半通道（读线程独占）
pub trait RxChannel: Send {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// 只写半通道（发送方独占）
pub trait TxChannel: Send {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;
}

/// 可拆分通道：连接后拆成独立归属的读/写两半
///
/// 读线程拿走 RX 半，会话持有 TX 半，二者互不阻塞。
pub trait SplittableTransport: EkiTransport {
    type Rx: RxChannel;
    type Tx: TxChannel;

    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError>;
}
