//! Builder 模式实现
//!
//! 链式构造 [`Robot`] 实例：连接两条通道、拆分读写半、拉起读线程。

use crate::config::RobotConfig;
use crate::error::DriverError;
use crate::hooks::{JointStateSink, SinkRegistry};
use crate::meta::OverrideSession;
use crate::motion::MotionSession;
use crate::pipeline::{meta_rx_loop, motion_rx_loop, PipelineConfig};
use crate::robot::Robot;
use crate::state::{MetaContext, MotionContext};
use ekrl_tcp::{EkiTransport, SplittableTransport, TcpTransport, TransportError};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Robot Builder（链式构造）
///
/// # 示例
///
/// ```no_run
/// use ekrl_driver::RobotBuilder;
///
/// let robot = RobotBuilder::new("10.181.116.41")
///     .motion_port(54602)
///     .meta_port(54601)
///     .receive_timeout(std::time::Duration::from_millis(100))
///     .build()
///     .unwrap();
///
/// robot.safety().set_override(0.5).unwrap();
/// ```
pub struct RobotBuilder {
    host: String,
    motion_port: u16,
    meta_port: u16,
    connect_timeout: Duration,
    receive_timeout: Duration,
    pipeline: PipelineConfig,
    sinks: SinkRegistry,
}

impl RobotBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        let defaults = RobotConfig::default();
        Self {
            host: host.into(),
            motion_port: defaults.motion_port,
            meta_port: defaults.meta_port,
            connect_timeout: defaults.connect_timeout(),
            receive_timeout: defaults.receive_timeout(),
            pipeline: PipelineConfig::default(),
            sinks: SinkRegistry::new(),
        }
    }

    /// 从配置文件内容构造
    pub fn from_config(config: &RobotConfig) -> Self {
        Self {
            host: config.host.clone(),
            motion_port: config.motion_port,
            meta_port: config.meta_port,
            connect_timeout: config.connect_timeout(),
            receive_timeout: config.receive_timeout(),
            pipeline: PipelineConfig::default(),
            sinks: SinkRegistry::new(),
        }
    }

    /// 运动通道端口（默认 54602）
    pub fn motion_port(mut self, port: u16) -> Self {
        self.motion_port = port;
        self
    }

    /// 安全通道端口（默认 54601）
    pub fn meta_port(mut self, port: u16) -> Self {
        self.meta_port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// 读取超时：读线程响应停机的最大延迟
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline = config;
        self
    }

    /// 注册关节状态回调（每帧有效运动遥测触发一次）
    pub fn add_joint_sink(mut self, sink: Arc<dyn JointStateSink>) -> Self {
        self.sinks.add(sink);
        self
    }

    /// 连接两条通道并启动读线程
    ///
    /// 任一通道连接失败都使整个构建失败（已连接的通道随 Drop 关闭），
    /// 不会出现"半连接"的机器人。
    pub fn build(self) -> Result<Robot, DriverError> {
        // === 运动通道 ===
        let mut motion = TcpTransport::new(self.host.clone(), self.motion_port)
            .with_timeouts(self.connect_timeout, self.receive_timeout);
        motion.connect()?;

        // === 安全通道（独立套接字） ===
        let mut meta = TcpTransport::new(self.host.clone(), self.meta_port)
            .with_timeouts(self.connect_timeout, self.receive_timeout);
        meta.connect()?;

        let (motion_rx, motion_tx) = motion.split()?;
        let (meta_rx, meta_tx) = meta.split()?;

        let motion_ctx = Arc::new(MotionContext::default());
        let meta_ctx = Arc::new(MetaContext::default());
        let sinks = Arc::new(self.sinks);

        let motion_running = Arc::new(AtomicBool::new(true));
        let meta_running = Arc::new(AtomicBool::new(true));

        let motion_handle = {
            let ctx = motion_ctx.clone();
            let sinks = sinks.clone();
            let running = motion_running.clone();
            let pipeline = self.pipeline.clone();
            std::thread::Builder::new()
                .name("ekrl-motion-rx".to_string())
                .spawn(move || motion_rx_loop(motion_rx, ctx, sinks, running, pipeline))
                .map_err(TransportError::Io)?
        };

        let meta_handle = {
            let ctx = meta_ctx.clone();
            let running = meta_running.clone();
            let pipeline = self.pipeline.clone();
            std::thread::Builder::new()
                .name("ekrl-meta-rx".to_string())
                .spawn(move || meta_rx_loop(meta_rx, ctx, running, pipeline))
                .map_err(TransportError::Io)?
        };

        info!(
            "Robot connected: {} (motion :{}, meta :{})",
            self.host, self.motion_port, self.meta_port
        );

        Ok(Robot {
            motion: MotionSession::new(motion_tx, motion_ctx),
            safety: OverrideSession::new(meta_tx, meta_ctx),
            motion_rx: Some(motion_handle),
            meta_rx: Some(meta_handle),
            motion_running,
            meta_running,
        })
    }
}
