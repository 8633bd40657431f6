//! カーネルレイアウトプロファイル
//!
//! 解析対象カーネルの構造体メンバのオフセット、シンボルアドレス、
//! イメージのマッピングをTOMLで記述します。
//!
//! ```toml
//! name = "kernel"
//! architecture = "intel64"
//!
//! [symbols]
//! init_task = "0xffffffff82a12940"
//!
//! [task_struct]
//! tasks = 0x4a8
//! pid = 0x5a0
//! comm = 0x740
//! cred = 0x728
//! thread_group = 0x610
//!
//! [cred]
//! uid = 4
//! gid = 8
//! euid = 20
//!
//! [[mappings]]
//! virtual = "0xffffffff81000000"
//! physical = "0x1000000"
//! length = "0x2000000"
//! ```

use crate::error::ImageError;
use crate::memory::Mapping;
use crate::Result;
use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::Path;
use threadscope_core::parse::parse_address;

/// TASK_COMM_LEN
pub const DEFAULT_COMM_LEN: usize = 16;

/// 対象アーキテクチャ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Intel32,
    Intel64,
}

impl Architecture {
    /// ポインタのサイズ（バイト数）
    pub fn pointer_size(self) -> usize {
        match self {
            Architecture::Intel32 => 4,
            Architecture::Intel64 => 8,
        }
    }
}

/// シンボルアドレス
#[derive(Debug, Clone, Deserialize)]
pub struct Symbols {
    #[serde(deserialize_with = "deserialize_address")]
    pub init_task: u64,
}

/// `task_struct` のメンバオフセット
#[derive(Debug, Clone, Deserialize)]
pub struct TaskStructLayout {
    /// `struct list_head tasks`
    pub tasks: u64,
    /// `pid_t pid`
    pub pid: u64,
    /// `char comm[TASK_COMM_LEN]`
    pub comm: u64,
    #[serde(default = "default_comm_len")]
    pub comm_len: usize,
    /// `const struct cred *cred`
    pub cred: u64,
    /// `struct list_head thread_group`
    pub thread_group: u64,
}

fn default_comm_len() -> usize {
    DEFAULT_COMM_LEN
}

/// `struct cred` のメンバオフセット
#[derive(Debug, Clone, Deserialize)]
pub struct CredLayout {
    pub uid: u64,
    pub gid: u64,
    pub euid: u64,
}

/// カーネルレイアウトプロファイル
#[derive(Debug, Clone, Deserialize)]
pub struct KernelLayout {
    /// カーネルモジュールの識別名
    #[serde(default = "default_name")]
    pub name: String,
    pub architecture: Architecture,
    pub symbols: Symbols,
    pub task_struct: TaskStructLayout,
    pub cred: CredLayout,
    #[serde(default)]
    pub mappings: Vec<Mapping>,
}

fn default_name() -> String {
    "kernel".to_string()
}

impl KernelLayout {
    /// TOML文字列からプロファイルを読み込む
    pub fn from_toml(content: &str) -> Result<Self> {
        let layout: KernelLayout = toml::from_str(content)
            .map_err(|e| ImageError::BadProfile(e.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    /// ファイルからプロファイルを読み込む
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read profile {}: {}", path.display(), e))?;
        Self::from_toml(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.mappings.is_empty() {
            return Err(ImageError::BadProfile("at least one [[mappings]] entry is required".into()).into());
        }
        if let Some(m) = self.mappings.iter().find(|m| m.length == 0) {
            return Err(ImageError::BadProfile(format!("mapping at 0x{:x} has zero length", m.virt)).into());
        }
        if self.task_struct.comm_len == 0 {
            return Err(ImageError::BadProfile("task_struct.comm_len must be non-zero".into()).into());
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Int(u64),
    Text(String),
}

/// 文字列（"0x..."）または整数で書かれたアドレスを読む
///
/// TOMLの整数は符号付き64bitのため、カーネルアドレスは文字列で記述します。
pub(crate) fn deserialize_address<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match AddressRepr::deserialize(deserializer)? {
        AddressRepr::Int(value) => Ok(value),
        AddressRepr::Text(text) => parse_address(&text).map_err(serde::de::Error::custom),
    }
}
