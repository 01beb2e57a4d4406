// 该文件是 Fenlei （分类） 项目的一部分。
// src/output/status.rs - 状态行
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

use std::{fmt, io::Write, time::Duration};

use tracing::{error, info, warn};

use super::ranking::Ranking;
use crate::model::Evaluation;

/// 展示给用户的单条状态
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
  Loading { model: String },
  Predictions { elapsed: Duration, summary: String },
  Cancelled,
  Error(String),
}

impl Status {
  pub fn predictions(evaluation: &Evaluation, top: Option<usize>) -> Self {
    let ranking = Ranking::from_prediction(&evaluation.prediction);
    let ranking = match top {
      Some(n) => ranking.top(n),
      None => ranking,
    };
    Status::Predictions {
      elapsed: evaluation.elapsed,
      summary: ranking.summary(),
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Status::Loading { model } => write!(f, "正在加载 {}，请稍候...", model),
      Status::Predictions { elapsed, summary } => write!(
        f,
        "{} ms ,\nPredictions: {}.",
        elapsed.as_millis(),
        summary
      ),
      Status::Cancelled => write!(f, "未选择图片"),
      Status::Error(message) => write!(f, "error: {}", message),
    }
  }
}

/// 在交互线程上显示状态
pub trait StatusReporter {
  fn report(&mut self, status: &Status);
}

/// 把状态写到终端
pub struct ConsoleStatus<W> {
  writer: W,
}

impl ConsoleStatus<std::io::Stdout> {
  pub fn stdout() -> Self {
    Self {
      writer: std::io::stdout(),
    }
  }
}

impl<W: Write> ConsoleStatus<W> {
  pub fn new(writer: W) -> Self {
    Self { writer }
  }

  pub fn into_inner(self) -> W {
    self.writer
  }
}

impl<W: Write> StatusReporter for ConsoleStatus<W> {
  fn report(&mut self, status: &Status) {
    match status {
      Status::Error(_) => error!("{}", status),
      Status::Cancelled => warn!("{}", status),
      _ => info!("{}", status),
    }
    if let Err(e) = writeln!(self.writer, "{}", status).and_then(|_| self.writer.flush()) {
      error!("状态输出失败: {}", e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::Prediction;

  #[test]
  fn prediction_status_line() {
    let evaluation = Evaluation {
      prediction: Prediction::new(
        vec!["cat".into(), "dog".into(), "bird".into()],
        vec![
          ("bird".into(), 0.1),
          ("cat".into(), 0.7),
          ("dog".into(), 0.2),
        ],
      ),
      elapsed: Duration::from_millis(42),
    };

    let status = Status::predictions(&evaluation, None);
    assert_eq!(
      status.to_string(),
      "42 ms ,\nPredictions: cat 70.00%,  dog 20.00%,  bird 10.00%."
    );

    let status = Status::predictions(&evaluation, Some(1));
    assert_eq!(status.to_string(), "42 ms ,\nPredictions: cat 70.00%.");
  }

  #[test]
  fn console_writes_one_line_per_status() {
    let mut console = ConsoleStatus::new(Vec::new());
    console.report(&Status::Loading {
      model: "ArtModel_R6.onnx".into(),
    });
    console.report(&Status::Error("boom".into()));

    let text = String::from_utf8(console.into_inner()).unwrap();
    assert_eq!(text, "正在加载 ArtModel_R6.onnx，请稍候...\nerror: boom\n");
  }
}
