// 该文件是 Fenlei （分类） 项目的一部分。
// src/output.rs - 输出定义
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

use std::{cell::RefCell, io::Write};

use serde_json::json;
use thiserror::Error;

use crate::model::Evaluation;

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

impl<Frame, Output, R: Render<Frame, Output>> Render<Frame, Output> for &R {
  type Error = R::Error;

  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error> {
    (**self).render_result(frame, result)
  }
}

mod ranking;
mod status;

pub use self::ranking::{ENTRY_SEPARATOR, RankedEntry, Ranking, format_predictions};
pub use self::status::{ConsoleStatus, Status, StatusReporter};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("输出写入错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 以状态行文本输出
pub struct TextOutput<W> {
  writer: RefCell<W>,
  top: Option<usize>,
}

impl<W: Write> TextOutput<W> {
  pub fn new(writer: W, top: Option<usize>) -> Self {
    Self {
      writer: RefCell::new(writer),
      top,
    }
  }

  pub fn into_inner(self) -> W {
    self.writer.into_inner()
  }
}

impl<F, W: Write> Render<F, Evaluation> for TextOutput<W> {
  type Error = OutputError;

  fn render_result(&self, _frame: &F, result: &Evaluation) -> Result<(), Self::Error> {
    let status = Status::predictions(result, self.top);
    writeln!(self.writer.borrow_mut(), "{}", status)?;
    Ok(())
  }
}

/// 以单行 JSON 输出
pub struct JsonOutput<W> {
  writer: RefCell<W>,
  top: Option<usize>,
}

impl<W: Write> JsonOutput<W> {
  pub fn new(writer: W, top: Option<usize>) -> Self {
    Self {
      writer: RefCell::new(writer),
      top,
    }
  }

  pub fn into_inner(self) -> W {
    self.writer.into_inner()
  }
}

impl<F, W: Write> Render<F, Evaluation> for JsonOutput<W> {
  type Error = OutputError;

  fn render_result(&self, _frame: &F, result: &Evaluation) -> Result<(), Self::Error> {
    let ranking = Ranking::from_prediction(&result.prediction);
    let ranking = match self.top {
      Some(n) => ranking.top(n),
      None => ranking,
    };
    let value = json!({
      "elapsed_ms": result.elapsed.as_millis() as u64,
      "labels": result.prediction.labels(),
      "predictions": ranking.to_json(),
    });

    let mut writer = self.writer.borrow_mut();
    serde_json::to_writer(&mut *writer, &value)?;
    writeln!(writer)?;
    Ok(())
  }
}

pub enum OutputWrapper<W> {
  Text(TextOutput<W>),
  Json(JsonOutput<W>),
}

impl<W: Write> OutputWrapper<W> {
  pub fn new(writer: W, json: bool, top: Option<usize>) -> Self {
    if json {
      OutputWrapper::Json(JsonOutput::new(writer, top))
    } else {
      OutputWrapper::Text(TextOutput::new(writer, top))
    }
  }
}

impl<F, W: Write> Render<F, Evaluation> for OutputWrapper<W> {
  type Error = OutputError;

  fn render_result(&self, frame: &F, result: &Evaluation) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Text(output) => output.render_result(frame, result),
      OutputWrapper::Json(output) => output.render_result(frame, result),
    }
  }
}
