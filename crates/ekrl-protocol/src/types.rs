//! 协议基础类型定义
//!
//! 位姿、关节快照以及协议枚举。所有数据类型构造后不可变：
//! 每次读取或每次用户输入都产生一个新值，绝不原地修改。

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 笛卡尔位姿（Point6D）
///
/// 6 自由度位姿：`x/y/z` 单位毫米，`a/b/c` 单位度（KUKA 欧拉角约定）。
///
/// # 设计特性
///
/// - **不可变**：构造后不提供修改接口，读取方永远拿到完整快照
/// - **命名**：`name` 为点位标识符，临时位姿可以使用合成名称
///
/// # 示例
///
/// ```
/// use ekrl_protocol::Pose;
///
/// let home = Pose::new("home", 100.0, 200.0, 300.0, 0.0, 90.0, 180.0);
/// assert_eq!(home.name, "home");
/// assert_eq!(home.b, 90.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    /// 点位名称（临时位姿可为合成名称）
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Pose {
    /// 创建命名位姿
    pub fn new(name: impl Into<String>, x: f64, y: f64, z: f64, a: f64, b: f64, c: f64) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            z,
            a,
            b,
            c,
        }
    }

    /// 创建未命名位姿（名称为 "unnamed"）
    pub fn unnamed(x: f64, y: f64, z: f64, a: f64, b: f64, c: f64) -> Self {
        Self::new("unnamed", x, y, z, a, b, c)
    }

    /// 返回同一坐标、不同名称的新位姿
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// 关节快照
///
/// 6 个关节角（度）。与 [`Pose`] 同样遵循不可变约定。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JointState {
    pub a1: f64,
    pub a2: f64,
    pub a3: f64,
    pub a4: f64,
    pub a5: f64,
    pub a6: f64,
}

impl JointState {
    pub fn new(a1: f64, a2: f64, a3: f64, a4: f64, a5: f64, a6: f64) -> Self {
        Self {
            a1,
            a2,
            a3,
            a4,
            a5,
            a6,
        }
    }

    /// 按 A1..A6 顺序返回数组视图
    pub fn as_array(&self) -> [f64; 6] {
        [self.a1, self.a2, self.a3, self.a4, self.a5, self.a6]
    }
}

/// 运动模式（`Move` 元素的 `Mode` 属性）
///
/// 数值与控制器侧 KRL 程序的分发表一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MotionMode {
    /// 关节空间 PTP
    PtpJoint = 1,
    /// 笛卡尔 PTP
    Ptp = 2,
    /// 直线运动
    Lin = 3,
    /// 圆弧运动
    Circ = 4,
}

/// 夹爪类型（`Grip` 元素的 `Mode` 属性）
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum GripperMode {
    Jaw = 1,
    Vacuum = 2,
}

/// 夹爪开合方向（`Jaw` 元素的 `DirectionMode` 属性）
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum GripDirection {
    Open = 0,
    Close = 1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_renamed_keeps_coordinates() {
        let p = Pose::unnamed(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let q = p.renamed("pick");
        assert_eq!(q.name, "pick");
        assert_eq!(q.x, 1.0);
        assert_eq!(q.c, 6.0);
    }

    #[test]
    fn test_motion_mode_wire_values() {
        assert_eq!(u8::from(MotionMode::PtpJoint), 1);
        assert_eq!(u8::from(MotionMode::Ptp), 2);
        assert_eq!(u8::from(MotionMode::Lin), 3);
        assert_eq!(u8::from(MotionMode::Circ), 4);
        assert_eq!(MotionMode::try_from(3u8).unwrap(), MotionMode::Lin);
    }

    #[test]
    fn test_grip_direction_wire_values() {
        assert_eq!(u8::from(GripDirection::Open), 0);
        assert_eq!(u8::from(GripDirection::Close), 1);
    }
}
