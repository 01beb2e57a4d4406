// 该文件是 Fenlei （分类） 项目的一部分。
// src/output/ranking.rs - 预测结果排序与格式化
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

use std::fmt;

use serde_json::{Value, json};

use crate::model::Prediction;

/// 预测项之间的分隔符
pub const ENTRY_SEPARATOR: &str = ",  ";

#[derive(Debug, Clone, PartialEq)]
pub struct RankedEntry {
  pub label: String,
  pub probability: f32,
}

impl fmt::Display for RankedEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {:.2}%", self.label, self.probability * 100.0)
  }
}

/// 按概率降序排列的预测，概率相同的保持原映射顺序
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Ranking {
  entries: Vec<RankedEntry>,
}

impl Ranking {
  pub fn from_scores<'a>(scores: impl IntoIterator<Item = (&'a str, f32)>) -> Self {
    let mut entries: Vec<RankedEntry> = scores
      .into_iter()
      .map(|(label, probability)| RankedEntry {
        label: label.to_string(),
        probability,
      })
      .collect();
    // sort_by 是稳定排序
    entries.sort_by(|a, b| sort_key(b.probability).total_cmp(&sort_key(a.probability)));
    Self { entries }
  }

  pub fn from_prediction(prediction: &Prediction) -> Self {
    Self::from_scores(
      prediction
        .scores()
        .iter()
        .map(|(label, probability)| (label.as_str(), *probability)),
    )
  }

  /// 只保留前 `n` 项
  pub fn top(mut self, n: usize) -> Self {
    self.entries.truncate(n);
    self
  }

  pub fn entries(&self) -> &[RankedEntry] {
    &self.entries
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// `"<label> <pct>%,  <label> <pct>%"`
  pub fn summary(&self) -> String {
    self
      .entries
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join(ENTRY_SEPARATOR)
  }

  pub fn to_json(&self) -> Value {
    Value::Array(
      self
        .entries
        .iter()
        .map(|entry| {
          json!({
            "label": entry.label,
            "probability": entry.probability,
          })
        })
        .collect(),
    )
  }
}

/// `-0.0` 与 `0.0` 视为相等，NaN 排在最后
fn sort_key(probability: f32) -> f32 {
  if probability.is_nan() {
    f32::NEG_INFINITY
  } else if probability == 0.0 {
    0.0
  } else {
    probability
  }
}

/// 预测结果的可读摘要
pub fn format_predictions(prediction: &Prediction) -> String {
  Ranking::from_prediction(prediction).summary()
}
