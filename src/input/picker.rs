// 该文件是 Fenlei （分类） 项目的一部分。
// src/input/picker.rs - 图片选择器
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
  io::{BufRead, Write},
  path::PathBuf,
};

use super::{InputError, SUPPORTED_EXTENSIONS};

pub trait ImagePicker {
  /// 返回 `None` 表示用户取消了选择
  fn pick(&mut self) -> Result<Option<PathBuf>, InputError>;
}

/// 从文本流逐行读取图片路径，空行或流结束视为取消
pub struct LinePicker<R, W> {
  reader: R,
  prompt: W,
}

impl<R: BufRead, W: Write> LinePicker<R, W> {
  pub fn new(reader: R, prompt: W) -> Self {
    Self { reader, prompt }
  }
}

impl<R: BufRead, W: Write> ImagePicker for LinePicker<R, W> {
  fn pick(&mut self) -> Result<Option<PathBuf>, InputError> {
    write!(
      self.prompt,
      "选择图片 ({})，留空取消: ",
      SUPPORTED_EXTENSIONS.join(", ")
    )?;
    self.prompt.flush()?;

    let mut line = String::new();
    if self.reader.read_line(&mut line)? == 0 {
      return Ok(None);
    }

    // 终端拖拽文件时可能带引号
    let path = line.trim().trim_matches(|c| c == '"' || c == '\'');
    if path.is_empty() {
      Ok(None)
    } else {
      Ok(Some(PathBuf::from(path)))
    }
  }
}

/// 预先给定的选择结果，只能取一次
#[derive(Debug, Default)]
pub struct PresetPicker {
  path: Option<PathBuf>,
}

impl PresetPicker {
  pub fn new(path: Option<PathBuf>) -> Self {
    Self { path }
  }
}

impl ImagePicker for PresetPicker {
  fn pick(&mut self) -> Result<Option<PathBuf>, InputError> {
    Ok(self.path.take())
  }
}
