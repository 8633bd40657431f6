//! スレッド相関処理のテスト

use std::cell::RefCell;
use std::rc::Rc;
use threadscope_core::{
    report, Credentials, GridRow, Pid, PidFilter, ProcessRecord, ProcessSource, Result,
    ThreadRecord, ThreadRow, ThreadRows, TreeGrid, THREAD_COLUMNS,
};

/// threads() が呼ばれたプロセスIDの記録
type VisitLog = Rc<RefCell<Vec<Pid>>>;

#[derive(Clone)]
struct MockProcess {
    pid: Pid,
    name: &'static str,
    credentials: Credentials,
    offset: u64,
    threads: Vec<ThreadRecord>,
    /// この位置でスレッド列挙を失敗させる
    fail_at: Option<usize>,
    visits: VisitLog,
}

struct MockThreads {
    items: std::vec::IntoIter<ThreadRecord>,
    fail_at: Option<usize>,
    pos: usize,
}

impl Iterator for MockThreads {
    type Item = Result<ThreadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fail_at == Some(self.pos) {
            self.pos += 1;
            return Some(Err(anyhow::anyhow!("page not present")));
        }
        self.pos += 1;
        self.items.next().map(Ok)
    }
}

impl ProcessRecord for MockProcess {
    type Threads = MockThreads;

    fn pid(&self) -> Result<Pid> {
        Ok(self.pid)
    }

    fn name(&self) -> Result<String> {
        Ok(self.name.to_string())
    }

    fn credentials(&self) -> Result<Credentials> {
        Ok(self.credentials)
    }

    fn group_offset(&self) -> u64 {
        self.offset
    }

    fn threads(&self) -> MockThreads {
        self.visits.borrow_mut().push(self.pid);
        MockThreads {
            items: self.threads.clone().into_iter(),
            fail_at: self.fail_at,
            pos: 0,
        }
    }
}

#[derive(Clone)]
struct MockSource {
    processes: Vec<MockProcess>,
    /// 供給元自体がこの位置で失敗する
    fail_at: Option<usize>,
    pulled: Rc<RefCell<usize>>,
}

struct MockProcesses {
    inner: std::vec::IntoIter<MockProcess>,
    fail_at: Option<usize>,
    pos: usize,
    pulled: Rc<RefCell<usize>>,
}

impl Iterator for MockProcesses {
    type Item = Result<MockProcess>;

    fn next(&mut self) -> Option<Self::Item> {
        *self.pulled.borrow_mut() += 1;
        if self.fail_at == Some(self.pos) {
            self.pos += 1;
            return Some(Err(anyhow::anyhow!("invalid task list pointer")));
        }
        self.pos += 1;
        self.inner.next().map(Ok)
    }
}

impl ProcessSource for MockSource {
    type Process = MockProcess;
    type Processes = MockProcesses;

    fn processes(self, filter: PidFilter) -> MockProcesses {
        let selected: Vec<_> = self
            .processes
            .into_iter()
            .filter(|p| filter.accepts(p.pid))
            .collect();
        MockProcesses {
            inner: selected.into_iter(),
            fail_at: self.fail_at,
            pos: 0,
            pulled: self.pulled,
        }
    }
}

fn process(pid: Pid, name: &'static str, offset: u64, threads: &[(Pid, u64)], visits: &VisitLog) -> MockProcess {
    MockProcess {
        pid,
        name,
        credentials: Credentials::default(),
        offset,
        threads: threads.iter().map(|&(tid, off)| ThreadRecord::new(tid, off)).collect(),
        fail_at: None,
        visits: visits.clone(),
    }
}

fn source(processes: Vec<MockProcess>) -> MockSource {
    MockSource {
        processes,
        fail_at: None,
        pulled: Rc::new(RefCell::new(0)),
    }
}

/// init (pid 100) と bash (pid 200) の2プロセス構成
fn two_processes(visits: &VisitLog) -> MockSource {
    let mut bash = process(200, "bash", 0x2000, &[(200, 0x2000)], visits);
    bash.credentials = Credentials {
        uid: 1000,
        gid: 1000,
        euid: 0,
    };
    source(vec![
        process(100, "init", 0x1000, &[(100, 0x1000), (101, 0x1040)], visits),
        bash,
    ])
}

fn collect(rows: ThreadRows<MockProcesses, MockProcess>) -> Vec<ThreadRow> {
    rows.collect::<Result<Vec<_>>>().unwrap()
}

fn row(offset: u64, pid: Pid, name: &str, tid: Pid, toff: u64, creds: (u32, u32, u32)) -> ThreadRow {
    ThreadRow {
        process_offset: offset,
        process_pid: pid,
        process_name: name.to_string(),
        thread_pid: tid,
        thread_name: name.to_string(),
        thread_offset: toff,
        uid: creds.0,
        gid: creds.1,
        euid: creds.2,
    }
}

#[test]
fn test_init_scenario_without_filter() {
    let visits = VisitLog::default();
    let src = source(vec![process(100, "init", 0x1000, &[(100, 0x1000), (101, 0x1040)], &visits)]);

    let rows = collect(report(src, PidFilter::all()));

    assert_eq!(
        rows,
        vec![
            row(0x1000, 100, "init", 100, 0x1000, (0, 0, 0)),
            row(0x1000, 100, "init", 101, 0x1040, (0, 0, 0)),
        ]
    );
}

#[test]
fn test_filter_applies_to_process_pid_not_thread_pid() {
    let visits = VisitLog::default();
    let rows = collect(report(two_processes(&visits), PidFilter::new([101])));

    assert!(rows.is_empty());
    assert!(visits.borrow().is_empty());
}

#[test]
fn test_filtered_out_process_is_never_walked() {
    let visits = VisitLog::default();
    let rows = collect(report(two_processes(&visits), PidFilter::new([100])));

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.process_pid == 100));
    assert_eq!(*visits.borrow(), vec![100]);
}

#[test]
fn test_rows_are_grouped_in_source_order() {
    let visits = VisitLog::default();
    // pid順ではない走査順
    let src = source(vec![
        process(300, "sshd", 0x3000, &[(300, 0x3000), (302, 0x30c0), (301, 0x3080)], &visits),
        process(100, "init", 0x1000, &[(100, 0x1000)], &visits),
        process(200, "bash", 0x2000, &[(200, 0x2000), (201, 0x2040)], &visits),
    ]);

    let rows = collect(report(src, PidFilter::all()));
    let order: Vec<(Pid, Pid)> = rows.iter().map(|r| (r.process_pid, r.thread_pid)).collect();

    assert_eq!(
        order,
        vec![(300, 300), (300, 302), (300, 301), (100, 100), (200, 200), (200, 201)]
    );
}

#[test]
fn test_process_fields_repeat_and_thread_name_follows_owner() {
    let visits = VisitLog::default();
    let rows = collect(report(two_processes(&visits), PidFilter::all()));

    for r in rows.iter().filter(|r| r.process_pid == 100) {
        assert_eq!(r.process_offset, 0x1000);
        assert_eq!(r.process_name, "init");
        assert_eq!(r.thread_name, "init");
    }

    let bash = rows.iter().find(|r| r.process_pid == 200).unwrap();
    assert_eq!((bash.uid, bash.gid, bash.euid), (1000, 1000, 0));
}

#[test]
fn test_row_counts_match_thread_counts() {
    let visits = VisitLog::default();
    let src = two_processes(&visits);
    let expected: Vec<(Pid, usize)> = src.processes.iter().map(|p| (p.pid, p.threads.len())).collect();

    let rows = collect(report(src, PidFilter::all()));

    for (pid, count) in expected {
        assert_eq!(rows.iter().filter(|r| r.process_pid == pid).count(), count);
    }
}

#[test]
fn test_process_without_threads_yields_nothing() {
    let visits = VisitLog::default();
    let src = source(vec![
        process(100, "init", 0x1000, &[], &visits),
        process(200, "bash", 0x2000, &[(200, 0x2000)], &visits),
    ]);

    let rows = collect(report(src, PidFilter::all()));

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].process_pid, 200);
    assert_eq!(*visits.borrow(), vec![100, 200]);
}

#[test]
fn test_empty_source() {
    let rows = collect(report(source(Vec::new()), PidFilter::all()));
    assert!(rows.is_empty());
}

#[test]
fn test_replay_is_identical() {
    let visits = VisitLog::default();
    let src = two_processes(&visits);

    let first = collect(report(src.clone(), PidFilter::all()));
    let second = collect(report(src, PidFilter::all()));

    assert_eq!(first, second);
}

#[test]
fn test_thread_fault_aborts_enumeration() {
    let visits = VisitLog::default();
    let mut src = two_processes(&visits);
    src.processes[0].fail_at = Some(1);

    let mut rows = report(src, PidFilter::all());

    assert_eq!(rows.next().unwrap().unwrap().thread_pid, 100);
    assert!(rows.next().unwrap().is_err());
    assert!(rows.next().is_none());
    // 後続のプロセスには到達しない
    assert_eq!(*visits.borrow(), vec![100]);
}

#[test]
fn test_source_fault_aborts_enumeration() {
    let visits = VisitLog::default();
    let mut src = two_processes(&visits);
    src.fail_at = Some(1);

    let results: Vec<_> = report(src, PidFilter::all()).collect();

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    let err = results[2].as_ref().unwrap_err();
    assert!(err.to_string().contains("invalid task list pointer"));
}

#[test]
fn test_early_drop_does_not_drain_source() {
    let visits = VisitLog::default();
    let src = two_processes(&visits);
    let pulled = src.pulled.clone();

    let first: Vec<_> = report(src, PidFilter::all()).take(1).collect();

    assert_eq!(first.len(), 1);
    assert_eq!(*pulled.borrow(), 1);
    assert_eq!(*visits.borrow(), vec![100]);
}

#[test]
fn test_rows_fit_thread_grid() {
    let visits = VisitLog::default();
    let grid = TreeGrid::new(&THREAD_COLUMNS, report(two_processes(&visits), PidFilter::all()));

    let rows: Vec<_> = grid.collect::<Result<_>>().unwrap();
    assert_eq!(rows.len(), 3);

    let expected = row(0x2000, 200, "bash", 200, 0x2000, (1000, 1000, 0)).cells();
    assert_eq!(rows[2], expected);
}

/// 読むたびに名前と資格情報が変わるプロセス
struct ShiftingProcess {
    reads: Rc<RefCell<u32>>,
    threads: Vec<ThreadRecord>,
}

impl ProcessRecord for ShiftingProcess {
    type Threads = MockThreads;

    fn pid(&self) -> Result<Pid> {
        Ok(100)
    }

    fn name(&self) -> Result<String> {
        *self.reads.borrow_mut() += 1;
        Ok(format!("n{}", self.reads.borrow()))
    }

    fn credentials(&self) -> Result<Credentials> {
        let uid = *self.reads.borrow();
        Ok(Credentials { uid, gid: uid, euid: uid })
    }

    fn group_offset(&self) -> u64 {
        0x1000
    }

    fn threads(&self) -> MockThreads {
        MockThreads {
            items: self.threads.clone().into_iter(),
            fail_at: None,
            pos: 0,
        }
    }
}

#[test]
fn test_process_fields_are_read_once_per_process() {
    let reads = Rc::new(RefCell::new(0));
    let process = ShiftingProcess {
        reads: reads.clone(),
        threads: vec![
            ThreadRecord::new(100, 0x1000),
            ThreadRecord::new(101, 0x1040),
            ThreadRecord::new(102, 0x1080),
        ],
    };

    let rows: Vec<ThreadRow> = ThreadRows::new(vec![Ok(process)].into_iter())
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(*reads.borrow(), 1);
    assert_eq!(rows.len(), 3);
    for r in &rows {
        assert_eq!(r.process_name, "n1");
        assert_eq!(r.thread_name, "n1");
        assert_eq!((r.uid, r.gid, r.euid), (1, 1, 1));
    }
}
