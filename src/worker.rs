// 该文件是 Fenlei （分类） 项目的一部分。
// src/worker.rs - 后台任务派发
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::{sync::mpsc, thread};

use thiserror::Error;
use tracing::{debug, error};

const WORKER_THREAD_NAME: &str = "fenlei-worker";

#[derive(Error, Debug)]
pub enum WorkerError {
  #[error("无法启动后台线程: {0}")]
  Spawn(std::io::Error),
  #[error("后台任务异常退出")]
  Lost,
}

/// 在后台线程执行 `job`，通过单槽通道取回结果
///
/// 调用线程只阻塞在结果接收上。`job` 可以借用调用者的数据。
pub fn dispatch<T, F>(job: F) -> Result<T, WorkerError>
where
  F: FnOnce() -> T + Send,
  T: Send,
{
  thread::scope(|scope| {
    let (tx, rx) = mpsc::sync_channel(1);

    let handle = thread::Builder::new()
      .name(WORKER_THREAD_NAME.to_string())
      .spawn_scoped(scope, move || {
        debug!("后台任务开始");
        let _ = tx.send(job());
      })
      .map_err(WorkerError::Spawn)?;

    let received = rx.recv();
    if handle.join().is_err() {
      error!("后台任务发生 panic");
      return Err(WorkerError::Lost);
    }
    received.map_err(|_| WorkerError::Lost)
  })
}
