// 该文件是 Fenlei （分类） 项目的一部分。
// src/task.rs - 分类任务与应用控制
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

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::{
  frame::Bgra8Frame,
  input::{ImageFileInput, ImagePicker, InputError},
  model::{
    Evaluation, EvaluationError, LoadError, Model, OnnxModel, OnnxModelBuilder, Prediction,
  },
  output::{Render, Status, StatusReporter},
  worker::{self, WorkerError},
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = Prediction, Error = ME>,
  O: Render<F, Evaluation, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or(InputError::NoFrame)?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let prediction = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("推理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &Evaluation { prediction, elapsed })?;

    Ok(())
  }
}

/// 重复推理同一帧，统计平均耗时
pub struct RepeatShotTask {
  repeat: usize,
  warmup: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat: 1000,
      warmup: 2,
    }
  }
}

impl RepeatShotTask {
  pub fn new(repeat: usize, warmup: usize) -> Self {
    Self { repeat, warmup }
  }
}

/// 跳过预热轮次后的平均值，样本不足时返回 `None`
pub fn mean_after_warmup(times: &[Duration], warmup: usize) -> Option<Duration> {
  let measured = times.get(warmup..)?;
  if measured.is_empty() {
    return None;
  }
  Some(measured.iter().sum::<Duration>() / measured.len() as u32)
}

impl<
  F,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = Prediction, Error = ME>,
  O: Render<F, Evaluation, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or(InputError::NoFrame)?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.repeat);
    let mut last = None;
    for i in 0..self.repeat {
      let now = Instant::now();
      let prediction = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      times.push(elapsed);
      last = Some(Evaluation { prediction, elapsed });
    }

    if let Some(evaluation) = last {
      output.render_result(&frame, &evaluation)?;
    }

    match mean_after_warmup(&times, self.warmup) {
      Some(mean) => warn!("平均推理时间: {:.2?}", mean),
      None => warn!("推理次数不足，无法统计平均时间"),
    }

    Ok(())
  }
}

/// 创建模型句柄
pub trait ModelLoader {
  type Model: Model<Input = Bgra8Frame, Output = Prediction, Error = EvaluationError>;

  /// 用于状态显示的模型名
  fn describe(&self) -> String;
  fn load(&self) -> Result<Self::Model, LoadError>;
}

impl ModelLoader for OnnxModelBuilder {
  type Model = OnnxModel<Bgra8Frame>;

  fn describe(&self) -> String {
    self.model_name()
  }

  fn load(&self) -> Result<Self::Model, LoadError> {
    self.build()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
  Idle,
  Loading,
  Ready,
  Evaluating,
  /// 上一次操作失败，模型是否可用见 [`Classifier::is_loaded`]
  Failed(String),
}

#[derive(Error, Debug)]
pub enum ClassifyError {
  #[error("{0}")]
  Load(#[from] LoadError),
  #[error("{0}")]
  Evaluation(#[from] EvaluationError),
  #[error("{0}")]
  Input(#[from] InputError),
  #[error("模型尚未加载")]
  ModelNotLoaded,
  #[error("{0}")]
  Worker(#[from] WorkerError),
}

/// 应用控制器：持有可为空的模型槽，按需加载并在后台线程执行推理
pub struct Classifier<L: ModelLoader> {
  loader: L,
  model: Option<L::Model>,
  state: AppState,
  top: Option<usize>,
}

impl<L> Classifier<L>
where
  L: ModelLoader + Sync,
  L::Model: Send + Sync,
{
  pub fn new(loader: L) -> Self {
    Self {
      loader,
      model: None,
      state: AppState::Idle,
      top: None,
    }
  }

  pub fn with_top(mut self, top: Option<usize>) -> Self {
    self.top = top;
    self
  }

  pub fn state(&self) -> &AppState {
    &self.state
  }

  pub fn is_loaded(&self) -> bool {
    self.model.is_some()
  }

  /// 丢弃当前模型，下一次操作会重新加载
  pub fn unload(&mut self) {
    if self.model.take().is_some() {
      info!("模型已卸载");
    }
    self.state = AppState::Idle;
  }

  /// 模型为空时在后台线程加载，失败时模型槽保持为空
  pub fn ensure_loaded<R: StatusReporter>(
    &mut self,
    reporter: &mut R,
  ) -> Result<&L::Model, ClassifyError> {
    if self.model.is_none() {
      self.state = AppState::Loading;
      reporter.report(&Status::Loading {
        model: self.loader.describe(),
      });

      let loader = &self.loader;
      let loaded = worker::dispatch(|| loader.load());
      match loaded {
        Ok(Ok(model)) => self.model = Some(model),
        Ok(Err(e)) => {
          self.model = None;
          return Err(e.into());
        }
        Err(e) => {
          self.model = None;
          return Err(e.into());
        }
      }
      self.state = AppState::Ready;
    }

    self.model.as_ref().ok_or(ClassifyError::ModelNotLoaded)
  }

  /// 在后台线程推理一帧，计时包含结果回传
  pub fn evaluate(&self, frame: &Bgra8Frame) -> Result<Evaluation, ClassifyError> {
    let model = self.model.as_ref().ok_or(ClassifyError::ModelNotLoaded)?;
    let now = Instant::now();
    let prediction = worker::dispatch(|| model.infer(frame))??;
    Ok(Evaluation {
      prediction,
      elapsed: now.elapsed(),
    })
  }

  /// 一次用户操作：加载模型（如需要）、选择图片、推理、报告结果
  ///
  /// 所有错误都在这里转成状态，不会中断调用者。
  pub fn run_action<P: ImagePicker, R: StatusReporter>(
    &mut self,
    picker: &mut P,
    reporter: &mut R,
  ) -> Status {
    let status = match self.try_action(picker, reporter) {
      Ok(status) => {
        self.state = AppState::Ready;
        status
      }
      Err(e) => {
        error!("error: {}", e);
        self.state = AppState::Failed(e.to_string());
        Status::Error(e.to_string())
      }
    };
    reporter.report(&status);
    status
  }

  fn try_action<P: ImagePicker, R: StatusReporter>(
    &mut self,
    picker: &mut P,
    reporter: &mut R,
  ) -> Result<Status, ClassifyError> {
    let (width, height) = self.ensure_loaded(reporter)?.input_size();

    let Some(path) = picker.pick()? else {
      info!("用户取消选择图片");
      return Ok(Status::Cancelled);
    };

    let frame = ImageFileInput::open(&path)
      .map_err(InputError::from)?
      .into_frames(width, height)
      .next()
      .ok_or(InputError::NoFrame)?;

    self.state = AppState::Evaluating;
    let evaluation = self.evaluate(&frame)?;
    Ok(Status::predictions(&evaluation, self.top))
  }
}
