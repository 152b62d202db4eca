//! 状态文档解析
//!
//! 从入站遥测文档中按**属性名**提取笛卡尔位姿与关节快照。
//!
//! 解析是原子的：六个属性全部存在且为数值才构造出值，否则整体失败，
//! 调用方保留上一份有效状态。未知属性和未知元素不构成错误（控制器
//! 固件升级可能追加字段）。

use crate::types::{JointState, Pose};
use crate::ProtocolError;

/// 一帧机器人状态：笛卡尔位姿 + 关节快照
#[derive(Debug, Clone, PartialEq)]
pub struct RobotState {
    pub pose: Pose,
    pub joints: JointState,
}

impl RobotState {
    /// 从完整文档解析
    ///
    /// 优先在 `<RobotState>` 元素范围内查找子元素；若文档没有
    /// `RobotState` 包装（例如回环测试中的指令文档），退回到全文
    /// 查找，与原始协议端 `.//Cartesian` 的查找语义一致。
    ///
    /// # 错误
    ///
    /// - [`ProtocolError::MissingElement`]：`Cartesian` 或 `Joint` 缺失
    /// - [`ProtocolError::MissingAttribute`]：六个属性中任一缺失
    /// - [`ProtocolError::InvalidNumber`]：属性值不是数值
    pub fn from_document(doc: &str) -> Result<Self, ProtocolError> {
        let scope = element_scope(doc, "RobotState").unwrap_or(doc);
        let pose = decode_pose_in(scope, "unnamed")?;
        let joints = decode_joints_in(scope)?;
        Ok(Self { pose, joints })
    }
}

/// 从文档中解码笛卡尔位姿（`Cartesian` 元素，属性 `X..C`）
pub fn decode_pose(doc: &str, name: &str) -> Result<Pose, ProtocolError> {
    let scope = element_scope(doc, "RobotState").unwrap_or(doc);
    decode_pose_in(scope, name)
}

fn decode_pose_in(scope: &str, name: &str) -> Result<Pose, ProtocolError> {
    let attrs = start_tag_attrs(scope, "Cartesian").ok_or(ProtocolError::MissingElement {
        element: "Cartesian",
    })?;
    Ok(Pose {
        name: name.to_string(),
        x: numeric_attr(attrs, "Cartesian", "X")?,
        y: numeric_attr(attrs, "Cartesian", "Y")?,
        z: numeric_attr(attrs, "Cartesian", "Z")?,
        a: numeric_attr(attrs, "Cartesian", "A")?,
        b: numeric_attr(attrs, "Cartesian", "B")?,
        c: numeric_attr(attrs, "Cartesian", "C")?,
    })
}

fn decode_joints_in(scope: &str) -> Result<JointState, ProtocolError> {
    let attrs = start_tag_attrs(scope, "Joint").ok_or(ProtocolError::MissingElement {
        element: "Joint",
    })?;
    Ok(JointState {
        a1: numeric_attr(attrs, "Joint", "A1")?,
        a2: numeric_attr(attrs, "Joint", "A2")?,
        a3: numeric_attr(attrs, "Joint", "A3")?,
        a4: numeric_attr(attrs, "Joint", "A4")?,
        a5: numeric_attr(attrs, "Joint", "A5")?,
        a6: numeric_attr(attrs, "Joint", "A6")?,
    })
}

/// 返回 `name` 元素起始标签的属性区（`<name` 与 `>` 之间的文本）
///
/// 名称匹配要求完整单词边界，`Cartesian` 不会匹配 `Cartesian_Aux`。
/// 扫描 `>` 时跳过引号内的内容。
fn start_tag_attrs<'a>(hay: &'a str, name: &str) -> Option<&'a str> {
    let bytes = hay.as_bytes();
    let mut from = 0;
    while let Some(rel) = hay[from..].find('<') {
        let lt = from + rel;
        let after = lt + 1;
        if hay[after..].starts_with(name) {
            let boundary = after + name.len();
            match bytes.get(boundary) {
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'/')
                | Some(b'>') => {
                    let end = tag_end(hay, boundary)?;
                    return Some(&hay[boundary..end]);
                }
                _ => {}
            }
        }
        from = after;
    }
    None
}

/// 从 `from` 起定位起始标签的 `>`（引号内的 `>` 不算）
fn tag_end(hay: &str, from: usize) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (i, ch) in hay[from..].char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => return Some(from + i),
            _ => {}
        }
    }
    None
}

/// 在属性区内按名查找属性值
///
/// 逐对扫描 `name="value"`，未知属性被跳过而不是报错。
fn find_attr<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let bytes = attrs.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        // 跳过空白和自闭合斜杠
        while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        // 属性名
        let name_start = i;
        while i < bytes.len() && bytes[i] != b'=' && !bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        let attr_name = &attrs[name_start..i];
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || bytes[i] != b'=' {
            continue; // 无值属性，跳过
        }
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() || (bytes[i] != b'"' && bytes[i] != b'\'') {
            return None; // 属性区格式损坏
        }
        let quote = bytes[i];
        i += 1;
        let value_start = i;
        while i < bytes.len() && bytes[i] != quote {
            i += 1;
        }
        if i >= bytes.len() {
            return None; // 引号未闭合
        }
        let value = &attrs[value_start..i];
        i += 1;
        if attr_name == name {
            return Some(value);
        }
    }
    None
}

fn numeric_attr(
    attrs: &str,
    element: &'static str,
    attribute: &'static str,
) -> Result<f64, ProtocolError> {
    let raw = find_attr(attrs, attribute).ok_or(ProtocolError::MissingAttribute {
        element,
        attribute,
    })?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ProtocolError::InvalidNumber {
            attribute,
            value: raw.to_string(),
        })
}

/// 返回 `name` 元素的内容范围（起始标签之后到闭合标签之前）
///
/// 没有找到元素或元素未闭合时返回 `None`，调用方自行决定回退策略。
fn element_scope<'a>(hay: &'a str, name: &str) -> Option<&'a str> {
    let bytes = hay.as_bytes();
    let mut from = 0;
    let content_from = loop {
        let rel = hay[from..].find('<')?;
        let lt = from + rel;
        let after = lt + 1;
        if hay[after..].starts_with(name) {
            let boundary = after + name.len();
            match bytes.get(boundary) {
                Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'>') => {
                    let end = tag_end(hay, boundary)?;
                    break end + 1;
                }
                _ => {}
            }
        }
        from = after;
    };
    let close = format!("</{name}>");
    let close_at = hay[content_from..].find(&close)?;
    Some(&hay[content_from..content_from + close_at])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::MoveCommand;
    use crate::types::MotionMode;

    const STATE_DOC: &str = concat!(
        "<RobotState Ipoc=\"125634\">",
        "<Cartesian X=\"512.5\" Y=\"-80\" Z=\"301.25\" A=\"0\" B=\"90\" C=\"180\" Status=\"2\"/>",
        "<Joint A1=\"10\" A2=\"-45.5\" A3=\"90\" A4=\"0\" A5=\"30\" A6=\"-5\"/>",
        "</RobotState>",
    );

    #[test]
    fn test_state_decoding_by_attribute_name() {
        let state = RobotState::from_document(STATE_DOC).unwrap();
        assert_eq!(state.pose.x, 512.5);
        assert_eq!(state.pose.y, -80.0);
        assert_eq!(state.pose.c, 180.0);
        assert_eq!(state.joints.a2, -45.5);
        assert_eq!(state.joints.a6, -5.0);
    }

    #[test]
    fn test_unknown_attributes_tolerated() {
        // Ipoc 和 Status 属性未被协议核心使用，但不是错误
        assert!(RobotState::from_document(STATE_DOC).is_ok());
    }

    #[test]
    fn test_missing_attribute_fails_atomically() {
        let doc = STATE_DOC.replace(" C=\"180\"", "");
        let err = RobotState::from_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingAttribute {
                element: "Cartesian",
                attribute: "C"
            }
        ));
    }

    #[test]
    fn test_non_numeric_attribute_rejected() {
        let doc = STATE_DOC.replace("Z=\"301.25\"", "Z=\"nan?\"");
        let err = RobotState::from_document(&doc).unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidNumber { attribute: "Z", .. }));
    }

    #[test]
    fn test_missing_joint_element() {
        let doc = STATE_DOC.replace("<Joint ", "<Joints ");
        let err = RobotState::from_document(&doc).unwrap_err();
        assert!(matches!(err, ProtocolError::MissingElement { element: "Joint" }));
    }

    #[test]
    fn test_cartesian_not_confused_with_aux() {
        let doc = concat!(
            "<RobotState>",
            "<Cartesian_Aux X=\"9\" Y=\"9\" Z=\"9\" A=\"9\" B=\"9\" C=\"9\"/>",
            "<Cartesian X=\"1\" Y=\"2\" Z=\"3\" A=\"4\" B=\"5\" C=\"6\"/>",
            "<Joint A1=\"0\" A2=\"0\" A3=\"0\" A4=\"0\" A5=\"0\" A6=\"0\"/>",
            "</RobotState>",
        );
        let state = RobotState::from_document(doc).unwrap();
        assert_eq!(state.pose.x, 1.0);
        assert_eq!(state.pose.b, 5.0);
    }

    #[test]
    fn test_codec_roundtrip_recovers_coordinates() {
        let pose = Pose::unnamed(100.0, 200.5, -300.25, 0.0, 90.0, 180.0);
        let doc = MoveCommand::new(pose.clone(), MotionMode::Ptp).to_document(1);
        // 指令文档没有 RobotState 包装，解码退回全文查找
        let decoded = decode_pose(&doc, "roundtrip").unwrap();
        assert_eq!(decoded.x, pose.x);
        assert_eq!(decoded.y, pose.y);
        assert_eq!(decoded.z, pose.z);
        assert_eq!(decoded.a, pose.a);
        assert_eq!(decoded.b, pose.b);
        assert_eq!(decoded.c, pose.c);
    }
}
