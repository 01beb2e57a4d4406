// 该文件是 Fenlei （分类） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use std::path::{Path, PathBuf};

use image::{ImageReader, RgbaImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Bgra8Frame, url_file_path};

/// 选择器接受的图片扩展名
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["bmp", "jpeg", "jpg", "png"];

const READ_IMAGE_FILE_SCHEME: &str = "image";

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("Unsupported image type: {0}")]
  UnsupportedExtension(String),
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

pub fn is_supported_image(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| {
      SUPPORTED_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
    })
    .unwrap_or(false)
}

pub struct ImageFileInput {
  path: PathBuf,
  image: Option<RgbaImage>,
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != READ_IMAGE_FILE_SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        READ_IMAGE_FILE_SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    ImageFileInput::open(url_file_path(url))
  }
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = READ_IMAGE_FILE_SCHEME;
}

impl ImageFileInput {
  pub fn open(path: impl AsRef<Path>) -> Result<Self, ImageFileInputError> {
    let path = path.as_ref();
    if !is_supported_image(path) {
      return Err(ImageFileInputError::UnsupportedExtension(
        path.display().to_string(),
      ));
    }

    let image = ImageReader::open(path)?.decode()?.to_rgba8();
    debug!(
      "图片 {} 解码完成: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(ImageFileInput {
      path: path.to_path_buf(),
      image: Some(image),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn dimensions(&self) -> Option<(u32, u32)> {
    self.image.as_ref().map(|image| image.dimensions())
  }

  /// 缩放到模型输入尺寸后逐帧输出
  pub fn into_frames(self, width: u32, height: u32) -> ImageFileFrames {
    ImageFileFrames {
      inner: self,
      width,
      height,
    }
  }
}

pub struct ImageFileFrames {
  inner: ImageFileInput,
  width: u32,
  height: u32,
}

impl Iterator for ImageFileFrames {
  type Item = Bgra8Frame;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.inner.image.take()?;
    if image.dimensions() == (self.width, self.height) {
      return Some(Bgra8Frame::from(&image));
    }

    debug!(
      "缩放图片 {}x{} -> {}x{}",
      image.width(),
      image.height(),
      self.width,
      self.height
    );
    let resized = image::imageops::resize(&image, self.width, self.height, FilterType::Triangle);
    Some(Bgra8Frame::from(&resized))
  }
}
