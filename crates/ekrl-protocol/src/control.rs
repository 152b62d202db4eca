//! 控制文档构建
//!
//! 将 Move / Grip / Meta 指令编码为 EthernetKRL 文本文档。
//!
//! # 文档形状
//!
//! 控制器固件期望**固定的文档形状**：属性顺序稳定，所有必需属性始终
//! 存在。即使某个逻辑字段不适用（例如纯 Grip 指令没有运动目标），
//! 对应的元素也以零值形式保留（`Cartesian_Aux`、`Joint`、未激活的
//! `Jaw`/`Vacuum` 块）。
//!
//! 浮点数按 Rust 最短往返表示输出（`100`、`0.2`），解码端按数值而非
//! 字面量比较。

use crate::types::{GripDirection, GripperMode, MotionMode, Pose};

/// 指令 Id（按通道独立的单调序列，从 1 开始）
pub type CommandId = u32;

/// `RobotCommand` 的 `Type` 属性：运动指令
pub const COMMAND_TYPE_MOVE: u8 = 1;
/// `RobotCommand` 的 `Type` 属性：夹爪指令（无运动）
pub const COMMAND_TYPE_GRIP: u8 = 3;

// === 夹爪默认参数（与控制器侧 KRL 程序的示教值一致） ===
pub const DEFAULT_JAW_TOLERANCE: u32 = 50;
pub const DEFAULT_JAW_VELOCITY: u32 = 50;
pub const DEFAULT_JAW_FORCE: u32 = 30;
pub const DEFAULT_JAW_BASE_POSITION: u32 = 75;
pub const DEFAULT_JAW_WORK_POSITION: u32 = 4875;
pub const DEFAULT_JAW_TEACH_POSITION: u32 = 3000;
pub const DEFAULT_JAW_SHIFT_POSITION: u32 = 500;

/// 文档包装：XML 声明 + `<EthernetKRL>` 根元素
///
/// 两个通道的出站文档使用同一包装。
fn wrap_document(body: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<EthernetKRL>\n{body}</EthernetKRL>\n")
}

/// 运动指令（`Type="1"`）
///
/// # 示例
///
/// ```
/// use ekrl_protocol::{MotionMode, MoveCommand, Pose};
///
/// let cmd = MoveCommand {
///     velocity: 0.5,
///     ..MoveCommand::new(Pose::unnamed(100.0, 0.0, 300.0, 0.0, 90.0, 0.0), MotionMode::Lin)
/// };
/// let doc = cmd.to_document(1);
/// assert!(doc.contains("Mode=\"3\""));
/// assert!(doc.contains("Velocity=\"0.5\""));
/// ```
#[derive(Debug, Clone)]
pub struct MoveCommand {
    pub mode: MotionMode,
    pub base_index: i32,
    pub tool_index: i32,
    pub velocity: f64,
    pub acceleration: f64,
    pub blending: f64,
    pub wait_for_gripper: bool,
    /// 目标位姿（毫米 / 度）
    pub target: Pose,
}

impl MoveCommand {
    /// 使用全局默认参数创建运动指令
    ///
    /// 默认值：velocity 0.2、acceleration 0.2、blending 0.0、
    /// base/tool 0、不等待夹爪。
    pub fn new(target: Pose, mode: MotionMode) -> Self {
        Self {
            mode,
            base_index: 0,
            tool_index: 0,
            velocity: 0.2,
            acceleration: 0.2,
            blending: 0.0,
            wait_for_gripper: false,
            target,
        }
    }

    /// 编码为完整的 EthernetKRL 文档
    pub fn to_document(&self, id: CommandId) -> String {
        let t = &self.target;
        let body = format!(
            "<RobotCommand Id=\"{id}\" Type=\"{ty}\">\n  \
             <Move Mode=\"{mode}\" BaseIndex=\"{base}\" ToolIndex=\"{tool}\" \
             Velocity=\"{vel}\" Acceleration=\"{acc}\" Blending=\"{blend}\" \
             WaitForGripper=\"{wait}\">\n    \
             <Cartesian X=\"{x}\" Y=\"{y}\" Z=\"{z}\" A=\"{a}\" B=\"{b}\" C=\"{c}\"/>\n    \
             <Cartesian_Aux X=\"0\" Y=\"0\" Z=\"0\" A=\"0\" B=\"0\" C=\"0\"/>\n    \
             <Joint A1=\"0\" A2=\"0\" A3=\"0\" A4=\"0\" A5=\"0\" A6=\"0\"/>\n  \
             </Move>\n</RobotCommand>\n",
            ty = COMMAND_TYPE_MOVE,
            mode = u8::from(self.mode),
            base = self.base_index,
            tool = self.tool_index,
            vel = self.velocity,
            acc = self.acceleration,
            blend = self.blending,
            wait = self.wait_for_gripper as u8,
            x = t.x,
            y = t.y,
            z = t.z,
            a = t.a,
            b = t.b,
            c = t.c,
        );
        wrap_document(&body)
    }
}

/// 平行夹爪参数
#[derive(Debug, Clone)]
pub struct JawGrip {
    pub tolerance: u32,
    pub velocity: u32,
    pub force: u32,
    pub base_position: u32,
    pub work_position: u32,
    pub teach_position: u32,
    pub shift_position: u32,
    pub direction: GripDirection,
}

impl JawGrip {
    /// 使用默认示教参数、指定开合方向
    pub fn new(direction: GripDirection) -> Self {
        Self {
            tolerance: DEFAULT_JAW_TOLERANCE,
            velocity: DEFAULT_JAW_VELOCITY,
            force: DEFAULT_JAW_FORCE,
            base_position: DEFAULT_JAW_BASE_POSITION,
            work_position: DEFAULT_JAW_WORK_POSITION,
            teach_position: DEFAULT_JAW_TEACH_POSITION,
            shift_position: DEFAULT_JAW_SHIFT_POSITION,
            direction,
        }
    }

    pub fn open() -> Self {
        Self::new(GripDirection::Open)
    }

    pub fn close() -> Self {
        Self::new(GripDirection::Close)
    }
}

/// 真空吸盘参数
#[derive(Debug, Clone, Copy)]
pub struct VacuumGrip {
    pub suction: bool,
    /// 气缸位置
    pub cylinder: f64,
}

impl VacuumGrip {
    pub fn on(cylinder: f64) -> Self {
        Self {
            suction: true,
            cylinder,
        }
    }

    pub fn off(cylinder: f64) -> Self {
        Self {
            suction: false,
            cylinder,
        }
    }
}

/// 夹爪指令（`Type="3"`，无运动）
///
/// 文档中 `Jaw` 与 `Vacuum` 两个块**始终同时存在**，未激活的一侧
/// 以零值输出（固定文档形状）。
#[derive(Debug, Clone)]
pub enum GripCommand {
    Jaw(JawGrip),
    Vacuum(VacuumGrip),
}

impl GripCommand {
    /// `Grip` 元素的 `Mode` 属性值
    pub fn mode(&self) -> GripperMode {
        match self {
            GripCommand::Jaw(_) => GripperMode::Jaw,
            GripCommand::Vacuum(_) => GripperMode::Vacuum,
        }
    }

    /// 编码为完整的 EthernetKRL 文档
    pub fn to_document(&self, id: CommandId) -> String {
        let zero_jaw = JawGrip {
            tolerance: 0,
            velocity: 0,
            force: 0,
            base_position: 0,
            work_position: 0,
            teach_position: 0,
            shift_position: 0,
            direction: GripDirection::Open,
        };
        let zero_vacuum = VacuumGrip {
            suction: false,
            cylinder: 0.0,
        };
        let (jaw, vacuum) = match self {
            GripCommand::Jaw(j) => (j.clone(), zero_vacuum),
            GripCommand::Vacuum(v) => (zero_jaw, *v),
        };
        let body = format!(
            "<RobotCommand Id=\"{id}\" Type=\"{ty}\">\n  \
             <Grip Mode=\"{mode}\">\n    \
             <Jaw Tolerance=\"{tol}\" Velocity=\"{vel}\" Force=\"{force}\" \
             BasePosition=\"{base}\" WorkPosition=\"{work}\" TeachPosition=\"{teach}\" \
             ShiftPosition=\"{shift}\" DirectionMode=\"{dir}\"/>\n    \
             <Vacuum Suction=\"{suction}\" Cylinder=\"{cyl}\"/>\n  \
             </Grip>\n</RobotCommand>\n",
            ty = COMMAND_TYPE_GRIP,
            mode = u8::from(self.mode()),
            tol = jaw.tolerance,
            vel = jaw.velocity,
            force = jaw.force,
            base = jaw.base_position,
            work = jaw.work_position,
            teach = jaw.teach_position,
            shift = jaw.shift_position,
            dir = u8::from(jaw.direction),
            suction = vacuum.suction as u8,
            cyl = vacuum.cylinder,
        );
        wrap_document(&body)
    }
}

/// 安全通道指令（速度倍率 + 中止标志）
///
/// 出于安全考虑，构造时即将倍率钳制到 `[0.0, 1.0]`，超范围的值
/// 永远不会到达控制器。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetaCommand {
    pub velocity_override: f64,
    pub abort: bool,
}

impl MetaCommand {
    /// 创建指令并钳制倍率到 `[0.0, 1.0]`
    pub fn new(velocity_override: f64, abort: bool) -> Self {
        Self {
            velocity_override: velocity_override.clamp(0.0, 1.0),
            abort,
        }
    }

    /// 紧急停止：倍率 0.0 + 中止
    pub fn emergency_stop() -> Self {
        Self::new(0.0, true)
    }

    /// 复位中止：倍率 1.0、清除中止标志
    pub fn reset_abort() -> Self {
        Self::new(1.0, false)
    }

    /// 编码为完整的 EthernetKRL 文档
    ///
    /// 注意：Meta 文档在线上不携带 `Id` 属性。
    pub fn to_document(&self) -> String {
        let body = format!(
            "<MetaCommand VelocityOverride=\"{ovr}\" AbortCommands=\"{abort}\"/>\n",
            ovr = self.velocity_override,
            abort = self.abort as u8,
        );
        wrap_document(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_document_shape() {
        let cmd = MoveCommand::new(
            Pose::unnamed(100.0, 200.0, 300.0, 0.0, 90.0, 180.0),
            MotionMode::Ptp,
        );
        let doc = cmd.to_document(1);

        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<EthernetKRL>\n"));
        assert!(doc.ends_with("</EthernetKRL>\n"));
        assert!(doc.contains("<RobotCommand Id=\"1\" Type=\"1\">"));
        assert!(doc.contains("Mode=\"2\""));
        assert!(doc.contains("X=\"100\" Y=\"200\" Z=\"300\" A=\"0\" B=\"90\" C=\"180\""));
        // 固定文档形状：零值块始终存在
        assert!(doc.contains("<Cartesian_Aux X=\"0\""));
        assert!(doc.contains("<Joint A1=\"0\""));
    }

    #[test]
    fn test_move_document_float_formatting() {
        let cmd = MoveCommand::new(Pose::unnamed(0.0, 0.0, 0.0, 0.0, 0.0, 0.0), MotionMode::Lin);
        let doc = cmd.to_document(7);
        // 0.2 保持小数表示，整数值无尾随 ".0"
        assert!(doc.contains("Velocity=\"0.2\""));
        assert!(doc.contains("Blending=\"0\""));
    }

    #[test]
    fn test_grip_document_carries_both_blocks() {
        let doc = GripCommand::Jaw(JawGrip::close()).to_document(4);
        assert!(doc.contains("<RobotCommand Id=\"4\" Type=\"3\">"));
        assert!(doc.contains("<Grip Mode=\"1\">"));
        assert!(doc.contains("DirectionMode=\"1\""));
        // 未激活的真空块以零值保留
        assert!(doc.contains("<Vacuum Suction=\"0\" Cylinder=\"0\"/>"));

        let doc = GripCommand::Vacuum(VacuumGrip::on(2.5)).to_document(5);
        assert!(doc.contains("<Grip Mode=\"2\">"));
        assert!(doc.contains("Suction=\"1\" Cylinder=\"2.5\""));
        // 未激活的夹爪块以零值保留
        assert!(doc.contains("<Jaw Tolerance=\"0\""));
    }

    #[test]
    fn test_meta_command_clamps_override() {
        assert_eq!(MetaCommand::new(1.5, false).velocity_override, 1.0);
        assert_eq!(MetaCommand::new(-0.3, false).velocity_override, 0.0);
        assert_eq!(MetaCommand::new(0.4, false).velocity_override, 0.4);
    }

    #[test]
    fn test_meta_document_shape() {
        let doc = MetaCommand::emergency_stop().to_document();
        assert!(doc.contains("<MetaCommand VelocityOverride=\"0\" AbortCommands=\"1\"/>"));

        let doc = MetaCommand::reset_abort().to_document();
        assert!(doc.contains("<MetaCommand VelocityOverride=\"1\" AbortCommands=\"0\"/>"));
    }
}
