//! TCP 通道实现
//!
//! 基于阻塞 `TcpStream`，带连接/读取超时。
//!
//! ## 超时语义
//!
//! 读超时通过 `set_read_timeout` 下沉到内核，读线程以阻塞读代替
//! 固定间隔轮询休眠：有数据立即返回，无数据最多等一个超时周期后
//! 返回 `Ok(0)`，调用方借此检查停机标志。

use crate::{EkiTransport, RxChannel, SplittableTransport, TransportError, TxChannel};
use std::io::{ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

/// 默认连接/读取超时（与控制器侧 EKI 配置一致）
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// TCP 通道
///
/// # 示例
///
/// ```no_run
/// use ekrl_tcp::{EkiTransport, TcpTransport};
///
/// let mut channel = TcpTransport::new("10.181.116.41", 54602);
/// channel.connect().unwrap();
/// channel.send(b"<EthernetKRL>...</EthernetKRL>\n").unwrap();
/// ```
#[derive(Debug)]
pub struct TcpTransport {
    host: String,
    port: u16,
    connect_timeout: Duration,
    receive_timeout: Duration,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: DEFAULT_TIMEOUT,
            receive_timeout: DEFAULT_TIMEOUT,
            stream: None,
        }
    }

    pub fn with_timeouts(mut self, connect: Duration, receive: Duration) -> Self {
        self.connect_timeout = connect;
        self.receive_timeout = receive;
        self
    }

    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl EkiTransport for TcpTransport {
    fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let addr = self.addr();
        let resolved = addr
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                addr: addr.clone(),
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Connect {
                addr: addr.clone(),
                source: std::io::Error::new(ErrorKind::NotFound, "no address resolved"),
            })?;

        let stream = TcpStream::connect_timeout(&resolved, self.connect_timeout).map_err(
            |source| TransportError::Connect {
                addr: addr.clone(),
                source,
            },
        )?;
        stream.set_read_timeout(Some(self.receive_timeout))?;
        info!("Connected to {}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(std::net::Shutdown::Both);
            debug!("Disconnected from {}", self.addr());
        }
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        // write_all 内部处理部分写
        stream.write_all(data)?;
        Ok(())
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        match stream.read(buf) {
            Ok(0) => {
                // EOF：对端关闭，通道翻转为未连接
                self.disconnect();
                Err(TransportError::PeerClosed)
            }
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(TransportError::Io(e)),
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.receive_timeout = timeout;
        if let Some(stream) = self.stream.as_ref() {
            let _ = stream.set_read_timeout(Some(timeout));
        }
    }
}

impl SplittableTransport for TcpTransport {
    type Rx = TcpRxChannel;
    type Tx = TcpTxChannel;

    /// 拆成独立的读/写两半
    ///
    /// 两半各持有一个套接字句柄克隆：读线程阻塞在 `read` 时，发送
    /// 方的 `write` 不受影响。
    fn split(mut self) -> Result<(Self::Rx, Self::Tx), TransportError> {
        let stream = self.stream.take().ok_or(TransportError::NotConnected)?;
        let rx_stream = stream.try_clone()?;
        Ok((
            TcpRxChannel { stream: rx_stream },
            TcpTxChannel { stream },
        ))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// TCP 读半通道
#[derive(Debug)]
pub struct TcpRxChannel {
    stream: TcpStream,
}

impl RxChannel for TcpRxChannel {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        match self.stream.read(buf) {
            Ok(0) => Err(TransportError::PeerClosed),
            Ok(n) => Ok(n),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(0),
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(TransportError::Io(e)),
        }
    }
}

/// TCP 写半通道
#[derive(Debug)]
pub struct TcpTxChannel {
    stream: TcpStream,
}

impl TxChannel for TcpTxChannel {
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream.write_all(data)?;
        Ok(())
    }
}
