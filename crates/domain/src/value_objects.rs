use std::sync::atomic::{AtomicU64, Ordering};

/// 已处理任务计数
///
/// 进程级可观测信号，不跨重启持久化。每个成功ack的任务恰好
/// 加一；原子读改写保证并发增量不丢失。
#[derive(Debug, Default)]
pub struct ProcessedCounter {
    count: AtomicU64,
}

impl ProcessedCounter {
    pub fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
        }
    }

    /// 加一并返回新值
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 读取当前值
    pub fn get(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }
}
