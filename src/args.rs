// 该文件是 Fenlei （分类） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Fenlei 交互式图片分类
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型位置，例如 onnx:assets/ArtModel_R6.onnx
  #[arg(long, value_name = "MODEL", default_value = "onnx:assets/ArtModel_R6.onnx")]
  pub model: Url,

  /// 推理线程数（默认由 ONNX Runtime 决定）
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,

  /// 只显示概率最高的若干项
  #[arg(long, value_name = "COUNT")]
  pub top: Option<usize>,

  /// 直接分类该图片后退出，不进入交互模式
  #[arg(long, value_name = "IMAGE")]
  pub image: Option<PathBuf>,
}
