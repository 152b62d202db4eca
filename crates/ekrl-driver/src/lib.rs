//! # EKRL Driver
//!
//! 本模块提供 EthernetKRL 机器人的双通道会话驱动，包括：
//! - 每通道读线程（接收 → 帧重组 → 解码 → 状态同步）
//! - 状态同步（ArcSwap 无锁读取，latest-wins 遥测）
//! - 运动会话（指令 Id 序列、批量发送、示教存点）
//! - 安全会话（速度倍率钳制、急停、中止复位）
//! - 点位存储与关节状态回调的协作方接口
//!
//! # 通道模型
//!
//! 一台控制器、两条独立 TCP 通道：运动通道承载运动/夹爪指令与
//! 周期状态遥测，安全通道承载倍率/中止指令。两条通道之间没有
//! 顺序保证——abort 是带外安全信号，不是队列位置意义上的取消。
//!
//! # 使用场景
//!
//! ```no_run
//! use ekrl_driver::RobotBuilder;
//! use ekrl_protocol::Pose;
//!
//! let robot = RobotBuilder::new("10.181.116.41").build().unwrap();
//!
//! let target = Pose::unnamed(100.0, 200.0, 300.0, 0.0, 90.0, 180.0);
//! robot.motion().ptp(&target, 0.2).unwrap();
//!
//! // 任意时刻、与运动指令并发：
//! robot.safety().emergency_stop().unwrap();
//! ```

mod builder;
pub mod config;
mod error;
pub mod hooks;
pub mod meta;
pub mod motion;
pub mod pipeline;
pub mod points;
mod robot;
pub mod state;

pub use builder::RobotBuilder;
pub use config::{ConfigError, RobotConfig};
pub use error::DriverError;
pub use hooks::{ChannelSink, JointStateSink, SinkRegistry};
pub use meta::OverrideSession;
pub use motion::{MotionSession, MoveParams};
pub use pipeline::{meta_rx_loop, motion_rx_loop, PipelineConfig};
pub use points::{FilePointStore, MemoryPointStore, PointStore, PointStoreError};
pub use robot::Robot;
pub use state::{ChannelCounters, CountersSnapshot, MetaContext, MotionContext};
