// 该文件是 Fenlei （分类） 项目的一部分。
// src/bin/benchmark_repeatshot.rs - 重复推理性能测试
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use fenlei::{
  FromUrl,
  frame::Bgra8Frame,
  input::ImageFileInput,
  model::{Model, OnnxModel, OnnxModelBuilder},
  output::TextOutput,
  task::{RepeatShotTask, Task},
};
use tracing::info;

/// Fenlei 推理性能测试
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型位置
  #[arg(long, value_name = "MODEL", default_value = "onnx:assets/ArtModel_R6.onnx")]
  pub model: Url,
  /// 输入图片
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 推理次数
  #[arg(long, default_value = "1000", value_name = "COUNT")]
  pub repeat: usize,
  /// 不计入平均值的预热次数
  #[arg(long, default_value = "2", value_name = "COUNT")]
  pub warmup: usize,
  /// 推理线程数
  #[arg(long, value_name = "COUNT")]
  pub threads: Option<usize>,
}

fn main() -> Result<()> {
  fenlei::init_tracing();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("推理次数: {} (预热 {})", args.repeat, args.warmup);

  let model: OnnxModel<Bgra8Frame> = OnnxModelBuilder::from_url(&args.model)?
    .intra_threads(args.threads)
    .build()?;
  let (width, height) = model.input_size();
  let input = ImageFileInput::from_url(&args.input)?;
  let output = TextOutput::new(std::io::stdout(), Some(5));

  RepeatShotTask::new(args.repeat, args.warmup).run_task(
    input.into_frames(width, height),
    model,
    output,
  )?;

  Ok(())
}
