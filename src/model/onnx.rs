// 该文件是 Fenlei （分类） 项目的一部分。
// src/model/onnx.rs - ONNX Runtime 分类模型
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

use std::{
  path::{Path, PathBuf},
  sync::Mutex,
  time::Instant,
};

use ort::{
  memory::Allocator,
  session::Session,
  value::{DynMapValueType, DynValue, TensorRef, ValueType},
};
use tracing::{debug, error, info};
use url::Url;

use super::{
  CLASS_LABEL_OUTPUT, DEFAULT_ASSET_DIR, DEFAULT_MODEL_FILE, EvaluationError, INPUT_NAME,
  LOSS_OUTPUT, LoadError, Model, OutputSource, Prediction,
};
use crate::{FromUrl, FromUrlWithScheme, frame::AsNchwTensor, url_file_path};

const ONNX_SCHEME: &str = "onnx";
/// 输入形状为动态时使用的尺寸
const DEFAULT_INPUT_SIZE: u32 = 224;

/// 已加载的分类模型，会话在加载时创建一次
pub struct OnnxModel<Frame> {
  session: Mutex<Session>,
  model_name: String,
  input_size: (u32, u32),
  _phantom: std::marker::PhantomData<Frame>,
}

impl<Frame> std::fmt::Debug for OnnxModel<Frame> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("OnnxModel")
      .field("model_name", &self.model_name)
      .field("input_size", &self.input_size)
      .finish()
  }
}

#[derive(Debug, Clone)]
pub struct OnnxModelBuilder {
  model_path: PathBuf,
  intra_threads: Option<usize>,
}

impl Default for OnnxModelBuilder {
  fn default() -> Self {
    Self::from_path(Path::new(DEFAULT_ASSET_DIR).join(DEFAULT_MODEL_FILE))
  }
}

impl FromUrl for OnnxModelBuilder {
  type Error = LoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != ONNX_SCHEME {
      return Err(LoadError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        ONNX_SCHEME
      )));
    }

    let path = url_file_path(url);
    if path.is_empty() {
      return Err(LoadError::ModelPathError("模型路径为空".to_string()));
    }
    Ok(Self::from_path(path))
  }
}

impl FromUrlWithScheme for OnnxModelBuilder {
  const SCHEME: &'static str = ONNX_SCHEME;
}

impl OnnxModelBuilder {
  pub fn from_path(path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: path.into(),
      intra_threads: None,
    }
  }

  pub fn intra_threads(mut self, threads: Option<usize>) -> Self {
    self.intra_threads = threads;
    self
  }

  pub fn model_path(&self) -> &Path {
    &self.model_path
  }

  /// 模型文件名，用于日志与状态显示
  pub fn model_name(&self) -> String {
    self
      .model_path
      .file_name()
      .map(|name| name.to_string_lossy().into_owned())
      .unwrap_or_else(|| self.model_path.display().to_string())
  }

  pub fn build<Frame>(&self) -> Result<OnnxModel<Frame>, LoadError> {
    info!("加载模型文件: {}", self.model_path.display());
    let now = Instant::now();
    let model_data = std::fs::read(&self.model_path).inspect_err(|e| {
      error!("无法读取模型文件 {}: {}", self.model_path.display(), e);
    })?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let model = self.build_from_memory(&model_data)?;
    info!(
      "{} 加载完成，耗时: {} ms",
      model.model_name,
      now.elapsed().as_millis()
    );
    Ok(model)
  }

  /// 从已读入内存的模型数据创建会话
  pub fn build_from_memory<Frame>(&self, model_data: &[u8]) -> Result<OnnxModel<Frame>, LoadError> {
    info!("创建 ONNX Runtime 推理会话");
    let mut builder = Session::builder().map_err(runtime_load_error)?;
    if let Some(threads) = self.intra_threads {
      builder = builder
        .with_intra_threads(threads)
        .map_err(runtime_load_error)?;
    }
    let session = builder
      .commit_from_memory(model_data)
      .map_err(runtime_load_error)?;

    check_io_names(
      session.inputs.iter().map(|input| input.name.as_str()),
      session.outputs.iter().map(|output| output.name.as_str()),
    )?;

    let input_size = session
      .inputs
      .iter()
      .find(|input| input.name == INPUT_NAME)
      .and_then(|input| match &input.input_type {
        ValueType::Tensor { shape, .. } => {
          let dims: Vec<i64> = shape.iter().copied().collect();
          debug!("模型输入形状: {:?}", dims);
          input_size_from_dims(&dims)
        }
        _ => None,
      })
      .unwrap_or((DEFAULT_INPUT_SIZE, DEFAULT_INPUT_SIZE));
    debug!("模型输入尺寸: {}x{}", input_size.0, input_size.1);

    Ok(OnnxModel {
      session: Mutex::new(session),
      model_name: self.model_name(),
      input_size,
      _phantom: std::marker::PhantomData,
    })
  }
}

fn runtime_load_error(e: impl std::fmt::Display) -> LoadError {
  error!("ONNX Runtime 无法加载模型: {}", e);
  LoadError::Runtime(e.to_string())
}

/// 模型必须声明 `data` 输入以及 `classLabel`、`loss` 两个输出
fn check_io_names<'a>(
  inputs: impl IntoIterator<Item = &'a str>,
  outputs: impl IntoIterator<Item = &'a str>,
) -> Result<(), LoadError> {
  let inputs: Vec<&str> = inputs.into_iter().collect();
  let outputs: Vec<&str> = outputs.into_iter().collect();
  debug!("模型输入: {:?}, 模型输出: {:?}", inputs, outputs);

  if !inputs.contains(&INPUT_NAME) {
    error!("模型缺少输入 {}", INPUT_NAME);
    return Err(LoadError::Incompatible(format!(
      "缺少输入 `{}`，实际输入 {:?}",
      INPUT_NAME, inputs
    )));
  }

  for name in [CLASS_LABEL_OUTPUT, LOSS_OUTPUT] {
    if !outputs.contains(&name) {
      error!("模型缺少输出 {}", name);
      return Err(LoadError::Incompatible(format!(
        "缺少输出 `{}`，实际输出 {:?}",
        name, outputs
      )));
    }
  }
  Ok(())
}

/// 从 NCHW 形状中取出 (宽, 高)，动态维度返回 `None`
fn input_size_from_dims(dims: &[i64]) -> Option<(u32, u32)> {
  match dims {
    [_, _, h, w] if *h > 0 && *w > 0 => Some((*w as u32, *h as u32)),
    _ => None,
  }
}

impl<Frame: AsNchwTensor> Model for OnnxModel<Frame> {
  type Input = Frame;
  type Output = Prediction;
  type Error = EvaluationError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let actual = input.dimensions();
    if actual != self.input_size {
      return Err(EvaluationError::FrameShape {
        expected: self.input_size,
        actual,
      });
    }

    // 设置输入
    debug!("设置模型输入");
    let tensor = input.as_nchw_tensor();
    let input_tensor = TensorRef::from_array_view(tensor.view())
      .map_err(|e| EvaluationError::RuntimeFailure(format!("输入张量转换失败: {}", e)))?;

    let mut session = self
      .session
      .lock()
      .map_err(|_| EvaluationError::RuntimeFailure("推理会话锁已损坏".to_string()))?;

    // 执行推理
    debug!("执行模型推理");
    let outputs = session
      .run(ort::inputs![INPUT_NAME => input_tensor])
      .map_err(|e| {
        error!("模型 {} 推理失败: {}", self.model_name, e);
        EvaluationError::RuntimeFailure(e.to_string())
      })?;

    // 获取输出
    debug!("获取模型输出");
    let values = SessionValues {
      values: [CLASS_LABEL_OUTPUT, LOSS_OUTPUT].map(|name| (name, outputs.get(name))),
    };
    Prediction::extract(&values)
  }

  fn input_size(&self) -> (u32, u32) {
    self.input_size
  }
}

/// 会话输出的只读视图
struct SessionValues<'v, const N: usize> {
  values: [(&'static str, Option<&'v DynValue>); N],
}

impl<const N: usize> SessionValues<'_, N> {
  fn get(&self, name: &str) -> Result<&DynValue, EvaluationError> {
    self
      .values
      .iter()
      .find(|(n, _)| *n == name)
      .and_then(|(_, value)| *value)
      .ok_or_else(|| EvaluationError::MissingOutput(name.to_string()))
  }
}

impl<const N: usize> OutputSource for SessionValues<'_, N> {
  fn string_vector(&self, name: &str) -> Result<Vec<String>, EvaluationError> {
    let (_, labels) = self
      .get(name)?
      .try_extract_strings()
      .map_err(|e| EvaluationError::wrong_type(name, e))?;
    Ok(labels)
  }

  fn score_maps(&self, name: &str) -> Result<Vec<Vec<(String, f32)>>, EvaluationError> {
    let allocator = Allocator::default();
    let maps = self
      .get(name)?
      .try_extract_sequence::<DynMapValueType>(&allocator)
      .map_err(|e| EvaluationError::wrong_type(name, e))?;

    maps
      .iter()
      .map(|map| {
        map
          .try_extract_key_values::<String, f32>()
          .map_err(|e| EvaluationError::wrong_type(name, e))
      })
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{frame::Bgra8Frame, output::Ranking};
  use image::{Rgba, RgbaImage};

  /// data: f32[1,3,2,2]；classLabel 为常量 [cat, dog, bird]；
  /// loss 为各通道均值经 Softmax 后的 ZipMap
  const TINY_CLASSIFIER: &[u8] = include_bytes!("../../testdata/tiny_classifier.onnx");

  fn tiny_model() -> OnnxModel<Bgra8Frame> {
    OnnxModelBuilder::from_path("tiny_classifier.onnx")
      .build_from_memory(TINY_CLASSIFIER)
      .unwrap()
  }

  fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> Bgra8Frame {
    Bgra8Frame::from(&RgbaImage::from_pixel(width, height, Rgba(rgba)))
  }

  #[test]
  fn default_builder_points_at_asset() {
    let builder = OnnxModelBuilder::default();
    assert_eq!(
      builder.model_path(),
      Path::new("assets").join("ArtModel_R6.onnx")
    );
  }

  #[test]
  fn url_scheme_is_checked() {
    let url = Url::parse("onnx:models/art.onnx").unwrap();
    let builder = OnnxModelBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), Path::new("models/art.onnx"));

    let url = Url::parse("rknn:models/art.onnx").unwrap();
    assert!(matches!(
      OnnxModelBuilder::from_url(&url),
      Err(LoadError::ModelPathError(_))
    ));
  }

  #[test]
  fn missing_file_is_load_error() {
    let builder = OnnxModelBuilder::from_path("/definitely/missing/ArtModel_R6.onnx");
    let result = builder.build::<Bgra8Frame>();
    assert!(matches!(result, Err(LoadError::Io(_))));
  }

  #[test]
  fn corrupt_model_is_runtime_error() {
    let builder = OnnxModelBuilder::from_path("garbage.onnx");
    let result = builder.build_from_memory::<Bgra8Frame>(b"this is not a protobuf graph");
    assert!(matches!(result, Err(LoadError::Runtime(_))));
  }

  #[test]
  fn io_contract() {
    assert!(check_io_names(["data"], ["classLabel", "loss"]).is_ok());
    assert!(matches!(
      check_io_names(["images"], ["classLabel", "loss"]),
      Err(LoadError::Incompatible(_))
    ));
    assert!(matches!(
      check_io_names(["data"], ["classLabel"]),
      Err(LoadError::Incompatible(_))
    ));
  }

  #[test]
  fn builds_and_reads_input_size() {
    let model = tiny_model();
    assert_eq!(model.input_size(), (2, 2));
    assert_eq!(model.model_name, "tiny_classifier.onnx");
  }

  #[test]
  fn builds_from_file() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/tiny_classifier.onnx");
    let model: OnnxModel<Bgra8Frame> = OnnxModelBuilder::from_path(path)
      .intra_threads(Some(1))
      .build()
      .unwrap();
    assert_eq!(model.input_size(), (2, 2));
  }

  #[test]
  fn evaluates_labels_and_scores() {
    let model = tiny_model();
    // 蓝色像素只落在 B 平面，对应第一个类别
    let prediction = model.infer(&solid_frame(2, 2, [0, 0, 255, 255])).unwrap();

    assert_eq!(prediction.labels(), ["cat", "dog", "bird"]);
    assert_eq!(prediction.scores().len(), 3);
    assert!(prediction.scores_within_labels());

    let total: f32 = prediction.scores().iter().map(|(_, p)| p).sum();
    assert!((total - 1.0).abs() < 1e-4);

    let ranking = Ranking::from_prediction(&prediction);
    assert_eq!(ranking.entries()[0].label, "cat");
    assert!(ranking.entries()[0].probability > 0.99);
  }

  #[test]
  fn equal_planes_give_equal_scores() {
    let model = tiny_model();
    let prediction = model.infer(&solid_frame(2, 2, [0, 0, 0, 255])).unwrap();
    for (_, probability) in prediction.scores() {
      assert!((probability - 1.0 / 3.0).abs() < 1e-4);
    }
  }

  #[test]
  fn wrong_frame_size_is_rejected() {
    let model = tiny_model();
    let err = model.infer(&solid_frame(3, 3, [0, 0, 255, 255])).unwrap_err();
    assert!(matches!(
      err,
      EvaluationError::FrameShape {
        expected: (2, 2),
        actual: (3, 3)
      }
    ));
  }

  #[test]
  fn input_size_from_shape() {
    assert_eq!(input_size_from_dims(&[-1, 3, 227, 224]), Some((224, 227)));
    assert_eq!(input_size_from_dims(&[1, 3, -1, -1]), None);
    assert_eq!(input_size_from_dims(&[3, 224, 224]), None);
  }
}
