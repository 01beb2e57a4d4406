// 该文件是 Fenlei （分类） 项目的一部分。
// src/model.rs - 模型
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

use std::time::Duration;

use thiserror::Error;

/// 模型唯一的输入名
pub const INPUT_NAME: &str = "data";
/// 类别标签输出（字符串向量）
pub const CLASS_LABEL_OUTPUT: &str = "classLabel";
/// 概率输出（标签到概率的映射序列，取第一个）
pub const LOSS_OUTPUT: &str = "loss";

/// 随应用发布的模型文件
pub const DEFAULT_MODEL_FILE: &str = "ArtModel_R6.onnx";
pub const DEFAULT_ASSET_DIR: &str = "assets";

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
  /// 模型期望的输入尺寸 (宽, 高)
  fn input_size(&self) -> (u32, u32);
}

impl<M: Model> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }

  fn input_size(&self) -> (u32, u32) {
    (**self).input_size()
  }
}

#[derive(Error, Debug)]
pub enum LoadError {
  #[error("模型文件读取错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("ONNX Runtime 错误: {0}")]
  Runtime(String),
  #[error("模型不兼容: {0}")]
  Incompatible(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

#[derive(Error, Debug)]
pub enum EvaluationError {
  #[error("缺少模型输出: {0}")]
  MissingOutput(String),
  #[error("模型输出 {name} 类型错误: {reason}")]
  WrongType { name: String, reason: String },
  #[error("推理执行失败: {0}")]
  RuntimeFailure(String),
  #[error("输入帧尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  FrameShape {
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

impl EvaluationError {
  pub fn wrong_type(name: &str, reason: impl ToString) -> Self {
    EvaluationError::WrongType {
      name: name.to_string(),
      reason: reason.to_string(),
    }
  }
}

/// 一次推理及其耗时
#[derive(Debug, Clone)]
pub struct Evaluation {
  pub prediction: Prediction,
  pub elapsed: Duration,
}

mod onnx;
mod prediction;

pub use self::onnx::{OnnxModel, OnnxModelBuilder};
pub use self::prediction::{OutputSource, Prediction};
