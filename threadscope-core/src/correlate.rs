//! プロセスとスレッドの相関処理
//!
//! プロセス列を受け取り、プロセスごとにスレッドを列挙して
//! 1スレッド1行のフラットな行列に組み立てます。

use crate::{Address, Credentials, Pid, PidFilter, ProcessRecord, ProcessSource, Result, ThreadRecord, ThreadRow};
use tracing::{debug, trace};

/// プロセスレベルのフィールドのスナップショット
///
/// スレッド列挙の前に一度だけ読み取り、そのプロセスの全行で共有します。
#[derive(Debug, Clone)]
struct ProcessSnapshot {
    offset: Address,
    pid: Pid,
    name: String,
    credentials: Credentials,
}

impl ProcessSnapshot {
    fn take<P: ProcessRecord>(process: &P) -> Result<Self> {
        Ok(Self {
            offset: process.group_offset(),
            pid: process.pid()?,
            name: process.name()?,
            credentials: process.credentials()?,
        })
    }

    fn row(&self, thread: &ThreadRecord) -> ThreadRow {
        ThreadRow {
            process_offset: self.offset,
            process_pid: self.pid,
            process_name: self.name.clone(),
            thread_pid: thread.pid,
            thread_name: thread.name(&self.name).to_string(),
            thread_offset: thread.offset,
            uid: self.credentials.uid,
            gid: self.credentials.gid,
            euid: self.credentials.euid,
        }
    }
}

/// スレッド行の遅延イテレータ
///
/// 上流で発生したエラーはそのまま1度だけ返し、以降は列挙を終了します。
/// 途中で破棄した場合、上流のイテレータも最後まで回さずに破棄されます。
pub struct ThreadRows<I, P: ProcessRecord> {
    processes: I,
    current: Option<(ProcessSnapshot, P::Threads)>,
    failed: bool,
}

impl<I, P> ThreadRows<I, P>
where
    I: Iterator<Item = Result<P>>,
    P: ProcessRecord,
{
    /// フィルタ済みのプロセス列から行イテレータを作成する
    pub fn new(processes: I) -> Self {
        Self {
            processes,
            current: None,
            failed: false,
        }
    }

    fn fail(&mut self, err: anyhow::Error) -> Option<Result<ThreadRow>> {
        self.failed = true;
        self.current = None;
        Some(Err(err))
    }
}

impl<I, P> Iterator for ThreadRows<I, P>
where
    I: Iterator<Item = Result<P>>,
    P: ProcessRecord,
{
    type Item = Result<ThreadRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        loop {
            if let Some((snapshot, threads)) = self.current.as_mut() {
                match threads.next() {
                    Some(Ok(thread)) => {
                        trace!("pid {} thread {} @ 0x{:x}", snapshot.pid, thread.pid, thread.offset);
                        return Some(Ok(snapshot.row(&thread)));
                    }
                    Some(Err(e)) => return self.fail(e),
                    None => self.current = None,
                }
            }

            let process = match self.processes.next()? {
                Ok(process) => process,
                Err(e) => return self.fail(e),
            };

            let snapshot = match ProcessSnapshot::take(&process) {
                Ok(snapshot) => snapshot,
                Err(e) => return self.fail(e),
            };
            debug!("Enumerating threads of pid {} ({})", snapshot.pid, snapshot.name);

            let threads = process.threads();
            self.current = Some((snapshot, threads));
        }
    }
}

impl<I, P> std::iter::FusedIterator for ThreadRows<I, P>
where
    I: Iterator<Item = Result<P>> + std::iter::FusedIterator,
    P: ProcessRecord,
{
}

/// プロセス供給元からスレッドレポートの行を生成する
///
/// フィルタの適用は供給元に任せ、ここでは一切の絞り込みを行いません。
pub fn report<S: ProcessSource>(source: S, filter: PidFilter) -> ThreadRows<S::Processes, S::Process> {
    ThreadRows::new(source.processes(filter))
}
