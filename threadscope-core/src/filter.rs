//! プロセスIDフィルタ

use crate::Pid;
use std::collections::HashSet;

/// 対象プロセスIDの集合によるフィルタ
///
/// 集合が空の場合はすべてのプロセスを受け入れます。
/// 判定はプロセスIDに対して行い、スレッドIDは対象外です。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PidFilter {
    pids: HashSet<Pid>,
}

impl PidFilter {
    /// 指定したプロセスIDだけを受け入れるフィルタを作成する
    pub fn new<I: IntoIterator<Item = Pid>>(pids: I) -> Self {
        Self {
            pids: pids.into_iter().collect(),
        }
    }

    /// すべてのプロセスを受け入れるフィルタを作成する
    pub fn all() -> Self {
        Self::default()
    }

    /// プロセスIDがフィルタを通過するか判定する
    pub fn accepts(&self, pid: Pid) -> bool {
        self.pids.is_empty() || self.pids.contains(&pid)
    }

    /// フィルタが何も制限しないか
    pub fn is_unrestricted(&self) -> bool {
        self.pids.is_empty()
    }
}

impl From<Option<Vec<Pid>>> for PidFilter {
    fn from(pids: Option<Vec<Pid>>) -> Self {
        pids.map(Self::new).unwrap_or_default()
    }
}
