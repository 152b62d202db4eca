//! 点位存储
//!
//! 命名点位（key → 位姿）的持久化协作方接口，以及两个实现：
//! 内存存储（测试、临时会话）和 TOML 文件存储（跨会话持久化，
//! 文件可手工编辑）。

use ekrl_protocol::Pose;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 点位存储错误
#[derive(Error, Debug)]
pub enum PointStoreError {
    #[error("point '{0}' not found")]
    NotFound(String),

    #[error("point '{0}' already exists")]
    AlreadyExists(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("point file parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("point file serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 命名点位存储
///
/// 运动会话在示教存点时写入、按名移动时读取。
pub trait PointStore {
    /// 保存点位。`overwrite = false` 且同名点存在时返回
    /// [`PointStoreError::AlreadyExists`]。
    fn save(&mut self, name: &str, pose: &Pose, overwrite: bool) -> Result<(), PointStoreError>;

    /// 按名读取点位
    fn load(&self, name: &str) -> Result<Pose, PointStoreError>;
}

/// 内存点位存储
#[derive(Debug, Default)]
pub struct MemoryPointStore {
    points: BTreeMap<String, Pose>,
}

impl MemoryPointStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl PointStore for MemoryPointStore {
    fn save(&mut self, name: &str, pose: &Pose, overwrite: bool) -> Result<(), PointStoreError> {
        if !overwrite && self.points.contains_key(name) {
            return Err(PointStoreError::AlreadyExists(name.to_string()));
        }
        self.points.insert(name.to_string(), pose.renamed(name));
        Ok(())
    }

    fn load(&self, name: &str) -> Result<Pose, PointStoreError> {
        self.points
            .get(name)
            .cloned()
            .ok_or_else(|| PointStoreError::NotFound(name.to_string()))
    }
}

/// 文件中的点位记录（名称即表键，不重复存储）
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct StoredPose {
    x: f64,
    y: f64,
    z: f64,
    a: f64,
    b: f64,
    c: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PointFile {
    #[serde(default)]
    points: BTreeMap<String, StoredPose>,
}

/// TOML 文件点位存储
///
/// 打开时整表载入，每次保存后整表重写。点位表在几十到几百条的
/// 量级，整表重写比追加式格式简单且保持文件可手工编辑。
///
/// # 示例
///
/// ```no_run
/// use ekrl_driver::points::{FilePointStore, PointStore};
/// use ekrl_protocol::Pose;
///
/// let mut store = FilePointStore::open("points.toml").unwrap();
/// store.save("home", &Pose::unnamed(0.0, 0.0, 500.0, 0.0, 90.0, 0.0), true).unwrap();
/// let home = store.load("home").unwrap();
/// ```
#[derive(Debug)]
pub struct FilePointStore {
    path: PathBuf,
    file: PointFile,
}

impl FilePointStore {
    /// 打开（或创建）点位文件
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PointStoreError> {
        let path = path.into();
        let file = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            // 文件还不存在：从空表开始，首次保存时落盘
            Err(e) if e.kind() == ErrorKind::NotFound => PointFile::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 已存点位名（字典序）
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.file.points.keys().map(String::as_str)
    }

    fn persist(&self) -> Result<(), PointStoreError> {
        let content = toml::to_string_pretty(&self.file)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl PointStore for FilePointStore {
    fn save(&mut self, name: &str, pose: &Pose, overwrite: bool) -> Result<(), PointStoreError> {
        if !overwrite && self.file.points.contains_key(name) {
            return Err(PointStoreError::AlreadyExists(name.to_string()));
        }
        self.file.points.insert(
            name.to_string(),
            StoredPose {
                x: pose.x,
                y: pose.y,
                z: pose.z,
                a: pose.a,
                b: pose.b,
                c: pose.c,
            },
        );
        self.persist()
    }

    fn load(&self, name: &str) -> Result<Pose, PointStoreError> {
        let p = self
            .file
            .points
            .get(name)
            .ok_or_else(|| PointStoreError::NotFound(name.to_string()))?;
        Ok(Pose::new(name, p.x, p.y, p.z, p.a, p.b, p.c))
    }
}
