//! Mock 通道（无网络依赖）
//!
//! 用 crossbeam 通道模拟一对相互连接的字节流端点，测试时一端扮演
//! 客户端、另一端扮演控制器。接收端保留部分消费缓冲，可以模拟任意
//! 粒度的 TCP 分片。

use crate::{EkiTransport, RxChannel, SplittableTransport, TransportError, TxChannel};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// 内存双工通道对
///
/// 返回 `(a, b)`：写入 `a` 的字节从 `b` 读出，反之亦然。
pub fn pair() -> (MockTransport, MockTransport) {
    let (a_tx, b_rx) = unbounded::<Vec<u8>>();
    let (b_tx, a_rx) = unbounded::<Vec<u8>>();
    (
        MockTransport::new(a_tx, a_rx),
        MockTransport::new(b_tx, b_rx),
    )
}

/// 内存通道端点
#[derive(Debug)]
pub struct MockTransport {
    tx: Sender<Vec<u8>>,
    rx: Receiver<Vec<u8>>,
    /// 上一块数据中尚未被 `receive` 消费的部分
    pending: Vec<u8>,
    connected: bool,
    receive_timeout: Duration,
}

impl MockTransport {
    fn new(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx,
            rx,
            pending: Vec::new(),
            connected: false,
            receive_timeout: Duration::from_millis(10),
        }
    }

    /// 取走对端已发送的全部字节（测试断言用）
    pub fn drain_sent(&mut self) -> Vec<u8> {
        let mut out = std::mem::take(&mut self.pending);
        while let Ok(chunk) = self.rx.try_recv() {
            out.extend_from_slice(&chunk);
        }
        out
    }
}

impl EkiTransport for MockTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::PeerClosed)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        if self.pending.is_empty() {
            match self.rx.recv_timeout(self.receive_timeout) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => {
                    self.connected = false;
                    return Err(TransportError::PeerClosed);
                }
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.receive_timeout = timeout;
    }
}

impl SplittableTransport for MockTransport {
    type Rx = MockRxChannel;
    type Tx = MockTxChannel;

    fn split(self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        if !self.connected {
            return Err(TransportError::NotConnected);
        }
        Ok((
            MockRxChannel {
                rx: self.rx,
                pending: self.pending,
                receive_timeout: self.receive_timeout,
            },
            MockTxChannel { tx: self.tx },
        ))
    }
}

/// Mock 读半通道
#[derive(Debug)]
pub struct MockRxChannel {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    receive_timeout: Duration,
}

impl RxChannel for MockRxChannel {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.pending.is_empty() {
            match self.rx.recv_timeout(self.receive_timeout) {
                Ok(chunk) => self.pending = chunk,
                Err(RecvTimeoutError::Timeout) => return Ok(0),
                Err(RecvTimeoutError::Disconnected) => return Err(TransportError::PeerClosed),
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }
}

/// Mock 写半通道
#[derive(Debug)]
pub struct MockTxChannel {
    tx: Sender<Vec<u8>>,
}

impl TxChannel for MockTxChannel {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.tx
            .send(data.to_vec())
            .map_err(|_| TransportError::PeerClosed)
    }
}
