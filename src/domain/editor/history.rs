//! 撤销/重做历史
//!
//! 线性历史（不是树）：新的编辑会截断游标之后的"未来"条目。

use std::collections::VecDeque;

use super::Snapshot;

/// 默认历史容量
pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

/// 撤销历史环
///
/// 不变量:
/// - cursor ∈ [-1, len - 1]
/// - entries[cursor] 是下一次 undo 要恢复的快照
/// - 第一次从顶端撤销时会追加当前状态，使 redo 能回到撤销前
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<Snapshot>,
    cursor: isize,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            cursor: -1,
            capacity: capacity.max(1),
        }
    }

    /// 记录编辑前的快照
    pub fn record(&mut self, before: Snapshot) {
        let keep = (self.cursor + 1) as usize;
        self.entries.truncate(keep);
        self.entries.push_back(before);

        // 超出容量时丢弃最旧的条目
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
        self.cursor = self.entries.len() as isize - 1;
    }

    /// 撤销：返回要恢复的快照
    pub fn undo(&mut self, current: Snapshot) -> Option<Snapshot> {
        if self.cursor < 0 {
            return None;
        }
        if self.cursor == self.entries.len() as isize - 1 {
            self.entries.push_back(current);
        }
        let snapshot = self.entries.get(self.cursor as usize).cloned();
        self.cursor -= 1;
        snapshot
    }

    /// 重做：返回撤销前的快照
    pub fn redo(&mut self) -> Option<Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.entries.get((self.cursor + 1) as usize).cloned()
    }

    pub fn can_undo(&self) -> bool {
        self.cursor >= 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 2 < self.entries.len() as isize
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = -1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> isize {
        self.cursor
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
