// 该文件是 Fenlei （分类） 项目的一部分。
// src/frame.rs - BGRA8 帧定义
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

use image::RgbaImage;
use ndarray::Array4;

const BGRA_CHANNELS: usize = 4;
const TENSOR_CHANNELS: usize = 3;

/// 可以作为模型输入的帧
pub trait AsNchwTensor {
  /// 帧尺寸 (宽, 高)
  fn dimensions(&self) -> (u32, u32);
  /// 转换为 `[1, 3, H, W]` 的浮点张量，通道顺序 B, G, R，取值 0..=255
  fn as_nchw_tensor(&self) -> Array4<f32>;
}

/// 预乘 alpha 的 BGRA8 帧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bgra8Frame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl Bgra8Frame {
  pub fn with_shape(width: u32, height: u32) -> Self {
    let size = BGRA_CHANNELS * width as usize * height as usize;
    Self {
      width,
      height,
      data: vec![0u8; size].into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// 读取 (x, y) 处的 [B, G, R, A]
  pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
    let index = (y as usize * self.width as usize + x as usize) * BGRA_CHANNELS;
    [
      self.data[index],
      self.data[index + 1],
      self.data[index + 2],
      self.data[index + 3],
    ]
  }
}

fn premultiply(value: u8, alpha: u8) -> u8 {
  ((value as u32 * alpha as u32 + 127) / 255) as u8
}

impl From<&RgbaImage> for Bgra8Frame {
  fn from(image: &RgbaImage) -> Self {
    let (width, height) = image.dimensions();
    let mut frame = Bgra8Frame::with_shape(width, height);
    let slice = frame.as_mut();

    for (index, pixel) in image.pixels().enumerate() {
      let [r, g, b, a] = pixel.0;
      let base = index * BGRA_CHANNELS;
      slice[base] = premultiply(b, a);
      slice[base + 1] = premultiply(g, a);
      slice[base + 2] = premultiply(r, a);
      slice[base + 3] = a;
    }
    frame
  }
}

impl AsMut<[u8]> for Bgra8Frame {
  fn as_mut(&mut self) -> &mut [u8] {
    &mut self.data
  }
}

impl AsNchwTensor for Bgra8Frame {
  fn dimensions(&self) -> (u32, u32) {
    (self.width, self.height)
  }

  fn as_nchw_tensor(&self) -> Array4<f32> {
    let width = self.width as usize;
    let height = self.height as usize;
    // BGRA 的前三个通道正好是 B, G, R
    Array4::from_shape_fn((1, TENSOR_CHANNELS, height, width), |(_, c, h, w)| {
      self.data[(h * width + w) * BGRA_CHANNELS + c] as f32
    })
  }
}
