//! Task queue: FIFO hand-off from the trigger thread to the worker.
//!
//! # 実装詳細
//! - `parking_lot::Mutex<VecDeque<Task>>` で排他制御
//! - `tokio::sync::Notify` で push 時に待機中の pop を起こす
//! - push は同期・ノンブロッキング（トリガースレッドは runtime を持たない）
//! - pop は timeout 付き（ワーカーは idle tick ごとにメッセージを drain したい）

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::domain::Task;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// The worker has shut down; nothing will consume this task.
    #[error("queue closed; task {0} dropped")]
    Closed(String),
}

#[derive(Default)]
struct QueueState {
    tasks: VecDeque<Task>,
    closed: bool,
}

#[derive(Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task. Never blocks on the consumer.
    pub fn push(&self, task: Task) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            if state.closed {
                return Err(QueueError::Closed(format!("{} ({})", task.id(), task.kind())));
            }
            state.tasks.push_back(task);
        }
        self.notify.notify_one();
        Ok(())
    }

    pub fn try_pop(&self) -> Option<Task> {
        let mut state = self.state.lock();
        if state.closed {
            return None;
        }
        state.tasks.pop_front()
    }

    /// Wait up to `timeout` for the next task.
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<Task> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(task) = self.try_pop() {
                return Some(task);
            }
            if self.is_closed() {
                return None;
            }
            // notify_one は待機者がいなければ permit を残すので取りこぼさない
            if tokio::time::timeout_at(deadline, self.notify.notified())
                .await
                .is_err()
            {
                return self.try_pop();
            }
        }
    }

    /// Close the queue and hand back whatever was still waiting.
    pub fn close(&self) -> Vec<Task> {
        let drained = {
            let mut state = self.state.lock();
            state.closed = true;
            state.tasks.drain(..).collect()
        };
        self.notify.notify_waiters();
        drained
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn len(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
