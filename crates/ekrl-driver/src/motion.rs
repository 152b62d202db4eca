//! 运动通道会话
//!
//! 持有运动通道写半与指令 Id 计数器。写半和计数器在同一把锁下，
//! 线上顺序与 Id 顺序因此严格一致；Id 在写入成功之后才提交，
//! 失败的发送只中止当前指令、不烧号，每通道的 Id 序列保持严格
//! 递增且无空洞。
//!
//! 协议是 fire-and-forget：控制器按到达顺序处理指令，发送下一条
//! 指令之前不读任何确认。

use crate::error::DriverError;
use crate::points::PointStore;
use crate::state::{CountersSnapshot, MotionContext};
use ekrl_protocol::{
    CommandId, GripCommand, JawGrip, JointState, MotionMode, MoveCommand, Pose, RobotState,
    VacuumGrip,
};
use ekrl_tcp::TxChannel;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// 运动参数
///
/// 默认值沿用控制器侧的全局示教参数。
#[derive(Debug, Clone)]
pub struct MoveParams {
    pub mode: MotionMode,
    pub velocity: f64,
    pub acceleration: f64,
    pub blending: f64,
    pub base_index: i32,
    pub tool_index: i32,
    pub wait_for_gripper: bool,
}

impl Default for MoveParams {
    fn default() -> Self {
        Self {
            mode: MotionMode::Ptp,
            velocity: 0.2,
            acceleration: 0.2,
            blending: 0.0,
            base_index: 0,
            tool_index: 0,
            wait_for_gripper: false,
        }
    }
}

impl MoveParams {
    fn to_command(&self, target: Pose) -> MoveCommand {
        MoveCommand {
            mode: self.mode,
            base_index: self.base_index,
            tool_index: self.tool_index,
            velocity: self.velocity,
            acceleration: self.acceleration,
            blending: self.blending,
            wait_for_gripper: self.wait_for_gripper,
            target,
        }
    }
}

/// 写半 + 计数器：同一把锁保证线上顺序 == Id 顺序
struct MotionTx<T: TxChannel> {
    tx: T,
    /// 下一个待分配的指令 Id（从 1 开始）
    next_id: CommandId,
}

/// 运动通道会话
///
/// 会话与连接同生命周期：重连必须建新会话（新计数器、新缓冲），
/// 不得复用。
///
/// # 线程安全
///
/// 发送路径持锁（单写方纪律），状态读取无锁（`ArcSwap`），两者
/// 互不阻塞。
pub struct MotionSession<T: TxChannel> {
    shared: Mutex<MotionTx<T>>,
    ctx: Arc<MotionContext>,
}

impl<T: TxChannel> MotionSession<T> {
    /// 从写半通道与共享上下文创建会话
    ///
    /// 一般由 [`RobotBuilder`](crate::RobotBuilder) 构建；直接构造
    /// 用于自定义通道（如测试中的内存通道）。
    pub fn new(tx: T, ctx: Arc<MotionContext>) -> Self {
        Self {
            shared: Mutex::new(MotionTx { tx, next_id: 1 }),
            ctx,
        }
    }

    /// 发送一条运动指令，返回其 Id
    ///
    /// 同步发送：写入完成即返回，不等待控制器确认。
    pub fn send_move(&self, target: &Pose, params: &MoveParams) -> Result<CommandId, DriverError> {
        let cmd = params.to_command(target.clone());
        let mut shared = self.shared.lock();
        let id = shared.next_id;
        let doc = cmd.to_document(id);
        shared.tx.send(doc.as_bytes())?;
        shared.next_id += 1;
        debug!("Move sent: id={}, mode={:?}, target={}", id, params.mode, target.name);
        Ok(id)
    }

    /// 笛卡尔 PTP
    pub fn ptp(&self, target: &Pose, velocity: f64) -> Result<CommandId, DriverError> {
        self.send_move(
            target,
            &MoveParams {
                mode: MotionMode::Ptp,
                velocity,
                ..MoveParams::default()
            },
        )
    }

    /// 直线运动
    pub fn lin(&self, target: &Pose, velocity: f64) -> Result<CommandId, DriverError> {
        self.send_move(
            target,
            &MoveParams {
                mode: MotionMode::Lin,
                velocity,
                ..MoveParams::default()
            },
        )
    }

    /// 圆弧运动
    pub fn circ(&self, target: &Pose, velocity: f64) -> Result<CommandId, DriverError> {
        self.send_move(
            target,
            &MoveParams {
                mode: MotionMode::Circ,
                velocity,
                ..MoveParams::default()
            },
        )
    }

    /// 批量发送运动序列：N 个文档、N 个连续 Id、**一次写出**
    ///
    /// 大量小写会拖垮吞吐，整批拼接后单次写出；代价是对端的帧
    /// 重组必须正确处理文档拼接（见协议层 framing 的多文档语义）。
    ///
    /// 返回 `(first_id, last_id)`。
    pub fn send_sequence(
        &self,
        poses: &[Pose],
        params: &MoveParams,
    ) -> Result<(CommandId, CommandId), DriverError> {
        if poses.is_empty() {
            return Err(DriverError::InvalidInput("empty move sequence".to_string()));
        }
        let mut shared = self.shared.lock();
        let first = shared.next_id;
        let mut payload = String::new();
        for (i, pose) in poses.iter().enumerate() {
            let cmd = params.to_command(pose.clone());
            payload.push_str(&cmd.to_document(first + i as CommandId));
        }
        shared.tx.send(payload.as_bytes())?;
        shared.next_id = first + poses.len() as CommandId;
        let last = shared.next_id - 1;
        info!("Move sequence sent: ids {}..={} ({} bytes)", first, last, payload.len());
        Ok((first, last))
    }

    /// 发送夹爪指令（Type=3，无运动）
    pub fn grip(&self, cmd: &GripCommand) -> Result<CommandId, DriverError> {
        let mut shared = self.shared.lock();
        let id = shared.next_id;
        let doc = cmd.to_document(id);
        shared.tx.send(doc.as_bytes())?;
        shared.next_id += 1;
        debug!("Grip sent: id={}, mode={:?}", id, cmd.mode());
        Ok(id)
    }

    pub fn jaw_open(&self) -> Result<CommandId, DriverError> {
        self.grip(&GripCommand::Jaw(JawGrip::open()))
    }

    pub fn jaw_close(&self) -> Result<CommandId, DriverError> {
        self.grip(&GripCommand::Jaw(JawGrip::close()))
    }

    pub fn vacuum_on(&self, cylinder: f64) -> Result<CommandId, DriverError> {
        self.grip(&GripCommand::Vacuum(VacuumGrip::on(cylinder)))
    }

    pub fn vacuum_off(&self, cylinder: f64) -> Result<CommandId, DriverError> {
        self.grip(&GripCommand::Vacuum(VacuumGrip::off(cylinder)))
    }

    /// 最近一帧完整状态（无锁读取）
    pub fn robot_state(&self) -> Option<Arc<RobotState>> {
        self.ctx.robot_state.load_full()
    }

    /// 当前位姿，以 `name` 命名
    ///
    /// latest-wins：读到的是最近一帧遥测，期间到达的旧帧已被丢弃。
    pub fn current_pose(&self, name: &str) -> Result<Pose, DriverError> {
        let state = self.ctx.robot_state.load_full().ok_or(DriverError::StateUnavailable)?;
        Ok(state.pose.renamed(name))
    }

    /// 当前关节快照
    pub fn joint_state(&self) -> Result<JointState, DriverError> {
        let state = self.ctx.robot_state.load_full().ok_or(DriverError::StateUnavailable)?;
        Ok(state.joints)
    }

    /// 示教存点：读取当前位姿并以 `name` 持久化（覆盖同名点）
    pub fn touch_up(
        &self,
        name: &str,
        store: &mut dyn PointStore,
    ) -> Result<Pose, DriverError> {
        let pose = self.current_pose(name)?;
        store.save(name, &pose, true)?;
        info!("Touchup stored: {}", name);
        Ok(pose)
    }

    /// 按名称取点并发送运动指令
    pub fn move_named(
        &self,
        name: &str,
        store: &dyn PointStore,
        params: &MoveParams,
    ) -> Result<CommandId, DriverError> {
        let pose = store.load(name)?;
        self.send_move(&pose, params)
    }

    /// 下一个将被分配的指令 Id（诊断用）
    pub fn next_command_id(&self) -> CommandId {
        self.shared.lock().next_id
    }

    /// 通道计数器快照
    pub fn counters(&self) -> CountersSnapshot {
        self.ctx.counters.snapshot()
    }
}
