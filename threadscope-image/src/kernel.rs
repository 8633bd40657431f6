//! Linuxカーネルのタスクリスト走査

use crate::layout::KernelLayout;
use crate::list::ListWalker;
use crate::memory::ImageMemory;
use crate::task::Task;
use crate::Result;
use std::path::Path;
use threadscope_core::{PidFilter, ProcessRecord, ProcessSource};
use tracing::{debug, info};

/// 解析対象カーネル
///
/// メモリイメージとレイアウトプロファイルの組で、タスク列挙のコンテキストになります。
pub struct LinuxKernel {
    memory: ImageMemory,
    layout: KernelLayout,
}

impl LinuxKernel {
    /// イメージとプロファイルからカーネルを構築する
    pub fn new(memory: ImageMemory, layout: KernelLayout) -> Self {
        Self { memory, layout }
    }

    /// イメージファイルを開き、プロファイルのマッピングで読み取れるようにする
    pub fn open<P: AsRef<Path>>(image: P, layout: KernelLayout) -> Result<Self> {
        let memory = ImageMemory::open(image, layout.mappings.clone())?;
        info!(
            "Loaded {} image ({:?}), init_task @ 0x{:x}",
            layout.name, layout.architecture, layout.symbols.init_task
        );
        Ok(Self::new(memory, layout))
    }

    /// メモリイメージを取得する
    pub fn memory(&self) -> &ImageMemory {
        &self.memory
    }

    /// レイアウトプロファイルを取得する
    pub fn layout(&self) -> &KernelLayout {
        &self.layout
    }

    /// アーキテクチャのポインタ幅でポインタを読み取る
    pub fn read_pointer(&self, addr: u64) -> Result<u64> {
        match self.layout.architecture.pointer_size() {
            4 => self.memory.read_u32(addr).map(u64::from),
            _ => self.memory.read_u64(addr),
        }
    }

    /// タスクリストを走査する
    ///
    /// `init_task` 自体は返しません。`filter` に一致しないタスクは
    /// pid以外を読まずに読み飛ばします。
    pub fn list_tasks(&self, filter: PidFilter) -> TaskList<'_> {
        let head = self.layout.symbols.init_task.wrapping_add(self.layout.task_struct.tasks);
        debug!("Walking task list from 0x{:x}", head);
        TaskList {
            kernel: self,
            walker: ListWalker::new(self, head, self.layout.task_struct.tasks),
            filter,
            failed: false,
        }
    }
}

/// フィルタ済みタスクのイテレータ
pub struct TaskList<'a> {
    kernel: &'a LinuxKernel,
    walker: ListWalker<'a>,
    filter: PidFilter,
    failed: bool,
}

impl<'a> Iterator for TaskList<'a> {
    type Item = Result<Task<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            let address = match self.walker.next()? {
                Ok(address) => address,
                Err(e) => return Some(Err(e)),
            };

            let task = Task::new(self.kernel, address);
            let pid = match task.pid() {
                Ok(pid) => pid,
                Err(e) => {
                    self.failed = true;
                    return Some(Err(e));
                }
            };

            if self.filter.accepts(pid) {
                return Some(Ok(task));
            }
            debug!("Skipping task pid {} @ 0x{:x}", pid, address);
        }
    }
}

impl<'a> ProcessSource for &'a LinuxKernel {
    type Process = Task<'a>;
    type Processes = TaskList<'a>;

    fn processes(self, filter: PidFilter) -> TaskList<'a> {
        self.list_tasks(filter)
    }
}
