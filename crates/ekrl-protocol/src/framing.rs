//! 文档帧重组
//!
//! EthernetKRL 线格式**没有长度前缀**：一个文档仅由已知的顶层起始
//! 标签和与之配对的闭合标签定界。TCP 按任意粒度交付字节流，一次
//! 读取可能拿到：半个文档、恰好一个文档、多个连续文档、或者一个
//! 完整文档加下一个文档的开头。
//!
//! [`DocumentAssembler`] 把字节流累积进可增长缓冲区，按需产出完整
//! 文档：
//!
//! - `feed()` 追加字节，`next_document()` / [`DocumentAssembler::documents`]
//!   惰性产出缓冲区中已完整的文档，尾部残片留待后续 `feed()`
//! - 缓冲区不会静默丢字节：每个字节要么成为产出文档的一部分，要么
//!   留在缓冲区，要么在报告帧错误时被显式计数丢弃
//! - 畸形段（闭合标签无起始标签、非 UTF-8）只报告该段的错误，随后
//!   **跳到下一个起始标签重新同步**继续工作，而不是中止整个流——
//!   否则同一次读取中靠后的文档会被一并丢掉

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tracing::{trace, warn};

/// 帧重组错误
///
/// 所有变体都是按段可恢复的：报告后重组器已经完成重新同步，
/// 可以继续 `feed()` / 轮询。
#[derive(Error, Debug)]
pub enum FramingError {
    /// 闭合标签出现在任何起始标签之前
    #[error("closing tag </{tag}> with no matching opening tag ({discarded} bytes discarded)")]
    UnmatchedClosingTag { tag: &'static str, discarded: usize },

    /// 提取出的文档不是合法 UTF-8
    #[error("document is not valid UTF-8 ({discarded} bytes discarded)")]
    InvalidUtf8 { discarded: usize },

    /// 缓冲区超限（对端持续发送无法成帧的数据）
    #[error("reassembly buffer overflow ({discarded} bytes discarded)")]
    BufferOverflow { discarded: usize },
}

/// 已知的顶层文档元素名
///
/// 出站指令与入站状态共用 `EthernetKRL` 包装；部分控制器固件直接
/// 发送裸 `RobotState` 帧，同样作为顶层文档处理。
const DOCUMENT_TAGS: [&str; 2] = ["EthernetKRL", "RobotState"];

/// 缓冲区上限。协议文档都在若干百字节量级，1 MiB 只会在对端
/// 持续发送无法成帧的垃圾时触达。
const MAX_BUFFERED: usize = 1024 * 1024;

/// 平衡扫描结果
enum Scan {
    /// 文档在缓冲区 `[start, end)` 处完整
    Complete(usize),
    /// 闭合标签尚未到达，保持缓冲
    Incomplete,
}

/// 文档帧重组器
///
/// # 示例
///
/// ```
/// use ekrl_protocol::DocumentAssembler;
///
/// let mut asm = DocumentAssembler::new();
/// asm.feed(b"<EthernetKRL>\n<MetaCommand VelocityOverride=\"1\" AbortCommands=\"0\"/>\n</Ethernet");
/// assert!(asm.next_document().is_none()); // 闭合标签还没到齐
///
/// asm.feed(b"KRL>\n<EthernetKRL>");
/// let doc = asm.next_document().unwrap().unwrap();
/// assert!(doc.starts_with("<EthernetKRL>"));
/// assert!(doc.ends_with("</EthernetKRL>"));
/// assert!(asm.next_document().is_none()); // 第二个文档只有开头，继续缓冲
/// ```
#[derive(Debug, Default)]
pub struct DocumentAssembler {
    buf: BytesMut,
}

impl DocumentAssembler {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// 追加一段从传输层读到的字节
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// 当前缓冲的字节数（诊断用）
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// 取出缓冲区中下一个完整文档
    ///
    /// - `None`：缓冲区中没有完整文档（残片保持缓冲，不丢失）
    /// - `Some(Ok(doc))`：一个完整的、字节精确的文档
    /// - `Some(Err(e))`：一个畸形段，已丢弃并重新同步，可继续轮询
    pub fn next_document(&mut self) -> Option<Result<String, FramingError>> {
        let open = find_first_open(&self.buf);
        let close = find_first_close(&self.buf);

        // 闭合标签先于任何起始标签出现：该段无法成帧。
        // 丢弃到闭合标签末尾（重新同步点），报告后继续。
        if let Some((close_at, tag)) = close
            && open.map_or(true, |(open_at, _)| close_at < open_at)
        {
            let resync = close_at + tag.len() + 3; // len("</") + len(">")
            self.buf.advance(resync);
            return Some(Err(FramingError::UnmatchedClosingTag {
                tag,
                discarded: resync,
            }));
        }

        let Some((start, tag)) = open else {
            return self.check_overflow();
        };
        match scan_balanced(&self.buf, start, tag) {
            Scan::Incomplete => self.check_overflow(),
            Scan::Complete(end) => {
                if start > 0 {
                    // 文档间的前导字节（XML 声明、空白）随文档一并消费
                    trace!("Skipping {} preamble bytes before <{}> document", start, tag);
                    self.buf.advance(start);
                }
                let doc_len = end - start;
                let raw = self.buf.split_to(doc_len);
                match String::from_utf8(raw.to_vec()) {
                    Ok(doc) => Some(Ok(doc)),
                    Err(_) => Some(Err(FramingError::InvalidUtf8 { discarded: doc_len })),
                }
            }
        }
    }

    /// 无法继续成帧且缓冲已超限时丢弃缓冲区（显式报错，绝不静默）
    ///
    /// 只在提取不出任何完整文档时检查：一次 `feed()` 进来的超大
    /// 合法文档批不受影响。
    fn check_overflow(&mut self) -> Option<Result<String, FramingError>> {
        if self.buf.len() > MAX_BUFFERED {
            let discarded = self.buf.len();
            self.buf.clear();
            warn!(
                "Frame buffer exceeded {} bytes without a complete document, dropping {} bytes",
                MAX_BUFFERED, discarded
            );
            return Some(Err(FramingError::BufferOverflow { discarded }));
        }
        None
    }

    /// 惰性产出当前缓冲区中的全部完整文档
    ///
    /// 迭代器耗尽后可以继续 `feed()` 再次调用，成帧进度不会丢失。
    pub fn documents(&mut self) -> Documents<'_> {
        Documents { asm: self }
    }
}

/// [`DocumentAssembler::documents`] 的迭代器
pub struct Documents<'a> {
    asm: &'a mut DocumentAssembler,
}

impl Iterator for Documents<'_> {
    type Item = Result<String, FramingError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.asm.next_document()
    }
}

fn find_subslice(hay: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from >= hay.len() || needle.is_empty() {
        return None;
    }
    hay[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

/// 起始标签名后必须跟随的边界字节（区分 `<RobotState` 与其他前缀相同的名字）
fn is_name_boundary(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'/' | b'>')
}

/// 查找 `from` 之后第一个已确认的 `<tag` 起始（边界字节必须已经到达）
fn find_open(hay: &[u8], tag: &str, from: usize) -> Option<usize> {
    let pat = format!("<{tag}");
    let mut pos = from;
    while let Some(at) = find_subslice(hay, pat.as_bytes(), pos) {
        match hay.get(at + pat.len()) {
            Some(&b) if is_name_boundary(b) => return Some(at),
            Some(_) => pos = at + 1,
            // 缓冲区恰好断在标签名处：尚无法确认，等下一次 feed
            None => return None,
        }
    }
    None
}

/// 所有已知文档标签中最早的起始位置
fn find_first_open(hay: &[u8]) -> Option<(usize, &'static str)> {
    DOCUMENT_TAGS
        .iter()
        .filter_map(|tag| find_open(hay, tag, 0).map(|at| (at, *tag)))
        .min_by_key(|(at, _)| *at)
}

/// 所有已知文档标签中最早的完整闭合标签位置
fn find_first_close(hay: &[u8]) -> Option<(usize, &'static str)> {
    DOCUMENT_TAGS
        .iter()
        .filter_map(|tag| {
            let pat = format!("</{tag}>");
            find_subslice(hay, pat.as_bytes(), 0).map(|at| (at, *tag))
        })
        .min_by_key(|(at, _)| *at)
}

/// 定位起始标签的 `>`，引号内的 `>` 不算
fn tag_end(hay: &[u8], from: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;
    for (i, &b) in hay.iter().enumerate().skip(from) {
        match (quote, b) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, b'"') | (None, b'\'') => quote = Some(b),
            (None, b'>') => return Some(i),
            _ => {}
        }
    }
    None
}

/// 从 `start` 处的起始标签扫描到配对的闭合标签
///
/// 按同名标签做深度计数（文档内不会出现同名嵌套，但计数扫描对
/// 这种输入同样正确），自闭合根元素也构成完整文档。
fn scan_balanced(hay: &[u8], start: usize, tag: &str) -> Scan {
    let open_pat_len = tag.len() + 1; // "<" + tag
    let close_pat = format!("</{tag}>");
    let mut pos = start;
    let mut depth = 0usize;

    loop {
        let next_open = find_open(hay, tag, pos);
        let next_close = find_subslice(hay, close_pat.as_bytes(), pos);

        match (next_open, next_close) {
            (Some(o), c) if c.map_or(true, |c| o < c) => {
                let Some(gt) = tag_end(hay, o + open_pat_len) else {
                    return Scan::Incomplete;
                };
                if hay[gt - 1] == b'/' {
                    // 自闭合元素：作为根时本身就是完整文档
                    if depth == 0 {
                        return Scan::Complete(gt + 1);
                    }
                } else {
                    depth += 1;
                }
                pos = gt + 1;
            }
            (_, Some(c)) => {
                depth = depth.saturating_sub(1);
                let end = c + close_pat.len();
                if depth == 0 {
                    return Scan::Complete(end);
                }
                pos = end;
            }
            (None, None) | (Some(_), None) => return Scan::Incomplete,
        }
    }
}
