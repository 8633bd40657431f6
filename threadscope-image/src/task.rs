//! `task_struct` のビュー

use crate::list::ListWalker;
use crate::utility::array_to_string;
use crate::{LinuxKernel, Result};
use threadscope_core::{Address, Credentials, Pid, ProcessRecord, ThreadRecord};
use tracing::warn;

/// イメージ内の `task_struct` を指す読み取り専用ビュー
///
/// フィールドは呼び出しのたびにイメージから読み取ります。
#[derive(Clone, Copy)]
pub struct Task<'a> {
    kernel: &'a LinuxKernel,
    address: u64,
}

impl<'a> Task<'a> {
    /// `task_struct` のアドレスからビューを作成する
    pub fn new(kernel: &'a LinuxKernel, address: u64) -> Self {
        Self { kernel, address }
    }

    /// `task_struct` のアドレスを取得する
    pub fn address(&self) -> u64 {
        self.address
    }

    fn member(&self, offset: u64) -> u64 {
        self.address.wrapping_add(offset)
    }
}

impl<'a> ProcessRecord for Task<'a> {
    type Threads = ThreadGroup<'a>;

    fn pid(&self) -> Result<Pid> {
        let offset = self.kernel.layout().task_struct.pid;
        let raw = self.kernel.memory().read_u32(self.member(offset))?;
        Ok(raw as Pid)
    }

    fn name(&self) -> Result<String> {
        let layout = &self.kernel.layout().task_struct;
        let comm = self.kernel.memory().read(self.member(layout.comm), layout.comm_len)?;
        Ok(array_to_string(&comm))
    }

    fn credentials(&self) -> Result<Credentials> {
        let layout = self.kernel.layout();
        let cred = self.kernel.read_pointer(self.member(layout.task_struct.cred))?;
        let memory = self.kernel.memory();

        Ok(Credentials {
            uid: memory.read_u32(cred.wrapping_add(layout.cred.uid))?,
            gid: memory.read_u32(cred.wrapping_add(layout.cred.gid))?,
            euid: memory.read_u32(cred.wrapping_add(layout.cred.euid))?,
        })
    }

    fn group_offset(&self) -> Address {
        self.member(self.kernel.layout().task_struct.thread_group)
    }

    fn threads(&self) -> ThreadGroup<'a> {
        ThreadGroup {
            leader: Some(*self),
            members: ListWalker::new(
                self.kernel,
                self.group_offset(),
                self.kernel.layout().task_struct.thread_group,
            ),
            kernel: self.kernel,
            owner: *self,
            finished: false,
        }
    }
}

/// スレッドグループのイテレータ
///
/// グループリーダー自身を最初に返し、続いて `thread_group` リストの各メンバを返します。
/// リストが循環していた場合は、所有タスクのアドレスとともに警告を出します。
pub struct ThreadGroup<'a> {
    leader: Option<Task<'a>>,
    members: ListWalker<'a>,
    kernel: &'a LinuxKernel,
    owner: Task<'a>,
    finished: bool,
}

impl ThreadGroup<'_> {
    fn record(task: &Task<'_>) -> Result<ThreadRecord> {
        Ok(ThreadRecord::new(task.pid()?, task.group_offset()))
    }

    fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;

        if self.members.is_truncated() {
            match self.owner.pid() {
                Ok(pid) => warn!(
                    "thread list of task 0x{:x} (pid {}) is cyclic, thread rows are incomplete",
                    self.owner.address(),
                    pid
                ),
                Err(_) => warn!(
                    "thread list of task 0x{:x} is cyclic, thread rows are incomplete",
                    self.owner.address()
                ),
            }
        }
    }

    /// 循環を検出してスレッドの列挙を打ち切ったか
    pub fn is_truncated(&self) -> bool {
        self.members.is_truncated()
    }
}

impl Iterator for ThreadGroup<'_> {
    type Item = Result<ThreadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(leader) = self.leader.take() {
            return Some(Self::record(&leader));
        }

        let next = self.members.next();
        let address = match next {
            None => {
                self.finish();
                return None;
            }
            Some(Ok(address)) => address,
            Some(Err(e)) => return Some(Err(e)),
        };
        Some(Self::record(&Task::new(self.kernel, address)))
    }
}
