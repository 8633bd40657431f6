//! threadscope メモリイメージアクセス
//!
//! このクレートは、Linuxカーネルのメモリイメージからタスクを列挙する機能を提供します。
//! 仮想アドレスでのイメージ読み取り、カーネルレイアウトプロファイルの読み込み、
//! タスクリストとスレッドグループの走査などを行います。

pub mod error;
pub mod kernel;
pub mod layout;
pub mod list;
pub mod memory;
pub mod task;
pub mod utility;

pub use error::ImageError;
pub use kernel::{LinuxKernel, TaskList};
pub use layout::{Architecture, CredLayout, KernelLayout, Symbols, TaskStructLayout};
pub use list::ListWalker;
pub use memory::{ImageMemory, Mapping, MemoryReadable};
pub use task::{Task, ThreadGroup};
pub use utility::array_to_string;

/// イメージアクセスの結果型
pub type Result<T> = anyhow::Result<T>;
