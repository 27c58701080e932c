//! 编辑器会话
//!
//! - autosave: 带防抖自动保存的缓冲区
//! - session: 选择切换、编辑、撤销/重做、手动保存
//! - generation: AI 正文流式生成

mod autosave;
mod generation;
mod session;

pub use generation::GenerationOutcome;
pub use session::EditorSession;

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// 锁内不会 panic，中毒时直接取回数据

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
