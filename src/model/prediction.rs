// 该文件是 Fenlei （分类） 项目的一部分。
// src/model/prediction.rs - 模型输出提取
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

use tracing::{debug, error, warn};

use super::{CLASS_LABEL_OUTPUT, EvaluationError, LOSS_OUTPUT};

/// 按名字读取原始模型输出
pub trait OutputSource {
  /// 字符串向量输出
  fn string_vector(&self, name: &str) -> Result<Vec<String>, EvaluationError>;
  /// 映射序列输出，每个映射保持运行时给出的迭代顺序
  fn score_maps(&self, name: &str) -> Result<Vec<Vec<(String, f32)>>, EvaluationError>;
}

/// 一次推理的输出：类别标签与各标签的概率
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
  labels: Vec<String>,
  scores: Vec<(String, f32)>,
}

impl Prediction {
  pub fn new(labels: Vec<String>, scores: Vec<(String, f32)>) -> Self {
    Self { labels, scores }
  }

  /// 读取 `classLabel` 和 `loss` 两个输出
  ///
  /// 任一输出缺失或类型不符都整体失败，不会返回部分结果。
  pub fn extract<S: OutputSource + ?Sized>(source: &S) -> Result<Self, EvaluationError> {
    let labels = source
      .string_vector(CLASS_LABEL_OUTPUT)
      .inspect_err(log_extract_error)?;

    let maps = source
      .score_maps(LOSS_OUTPUT)
      .inspect_err(log_extract_error)?;
    let Some(scores) = maps.into_iter().next() else {
      let err = EvaluationError::wrong_type(LOSS_OUTPUT, "映射序列为空");
      log_extract_error(&err);
      return Err(err);
    };

    let prediction = Prediction { labels, scores };
    if !prediction.scores_within_labels() {
      warn!("概率映射中存在不属于 {} 的标签", CLASS_LABEL_OUTPUT);
    }
    debug!("模型输出: {:?}", prediction);
    Ok(prediction)
  }

  pub fn labels(&self) -> &[String] {
    &self.labels
  }

  pub fn scores(&self) -> &[(String, f32)] {
    &self.scores
  }

  /// 概率映射的键是否都出现在标签向量中
  pub fn scores_within_labels(&self) -> bool {
    self
      .scores
      .iter()
      .all(|(label, _)| self.labels.iter().any(|l| l == label))
  }
}

fn log_extract_error(err: &EvaluationError) {
  match err {
    EvaluationError::MissingOutput(name) => {
      error!("模型结果中没有输出 {}，放弃本次推理", name)
    }
    other => error!("读取模型输出失败: {}", other),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// 测试用的输出集合，缺省的名字视为缺失输出
  #[derive(Default)]
  struct FakeOutputs {
    strings: Vec<(&'static str, Vec<String>)>,
    maps: Vec<(&'static str, Vec<Vec<(String, f32)>>)>,
  }

  impl OutputSource for FakeOutputs {
    fn string_vector(&self, name: &str) -> Result<Vec<String>, EvaluationError> {
      if self.maps.iter().any(|(n, _)| *n == name) {
        return Err(EvaluationError::wrong_type(name, "不是字符串张量"));
      }
      self
        .strings
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| EvaluationError::MissingOutput(name.to_string()))
    }

    fn score_maps(&self, name: &str) -> Result<Vec<Vec<(String, f32)>>, EvaluationError> {
      if self.strings.iter().any(|(n, _)| *n == name) {
        return Err(EvaluationError::wrong_type(name, "不是映射序列"));
      }
      self
        .maps
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, v)| v.clone())
        .ok_or_else(|| EvaluationError::MissingOutput(name.to_string()))
    }
  }

  fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
  }

  fn map(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
  }

  #[test]
  fn extracts_labels_and_first_map() {
    let outputs = FakeOutputs {
      strings: vec![(CLASS_LABEL_OUTPUT, labels(&["cat", "dog"]))],
      maps: vec![(
        LOSS_OUTPUT,
        vec![map(&[("cat", 0.9), ("dog", 0.1)]), map(&[("cat", 0.0)])],
      )],
    };

    let prediction = Prediction::extract(&outputs).unwrap();
    assert_eq!(prediction.labels(), &labels(&["cat", "dog"])[..]);
    assert_eq!(prediction.scores(), &map(&[("cat", 0.9), ("dog", 0.1)])[..]);
    assert!(prediction.scores_within_labels());
  }

  #[test]
  fn missing_loss_fails_whole_extraction() {
    let outputs = FakeOutputs {
      strings: vec![(CLASS_LABEL_OUTPUT, labels(&["cat"]))],
      maps: vec![],
    };

    let err = Prediction::extract(&outputs).unwrap_err();
    assert!(matches!(err, EvaluationError::MissingOutput(name) if name == LOSS_OUTPUT));
  }

  #[test]
  fn missing_class_label_fails() {
    let outputs = FakeOutputs {
      strings: vec![],
      maps: vec![(LOSS_OUTPUT, vec![map(&[("cat", 1.0)])])],
    };

    let err = Prediction::extract(&outputs).unwrap_err();
    assert!(matches!(err, EvaluationError::MissingOutput(name) if name == CLASS_LABEL_OUTPUT));
  }

  #[test]
  fn wrong_type_is_reported() {
    let outputs = FakeOutputs {
      strings: vec![
        (CLASS_LABEL_OUTPUT, labels(&["cat"])),
        (LOSS_OUTPUT, labels(&["oops"])),
      ],
      maps: vec![],
    };

    let err = Prediction::extract(&outputs).unwrap_err();
    assert!(matches!(err, EvaluationError::WrongType { name, .. } if name == LOSS_OUTPUT));
  }

  #[test]
  fn empty_sequence_is_wrong_type() {
    let outputs = FakeOutputs {
      strings: vec![(CLASS_LABEL_OUTPUT, labels(&["cat"]))],
      maps: vec![(LOSS_OUTPUT, vec![])],
    };

    let err = Prediction::extract(&outputs).unwrap_err();
    assert!(matches!(err, EvaluationError::WrongType { .. }));
  }

  #[test]
  fn foreign_score_keys_are_detected() {
    let prediction = Prediction::new(labels(&["cat"]), map(&[("cat", 0.5), ("cow", 0.5)]));
    assert!(!prediction.scores_within_labels());
  }
}
