// 该文件是 Fenlei （分类） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::io::{self, BufRead, Write};

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing::info;

use fenlei::{
  FromUrl,
  input::{LinePicker, PresetPicker},
  model::OnnxModelBuilder,
  output::{ConsoleStatus, Status},
  task::Classifier,
};

fn main() -> Result<()> {
  fenlei::init_tracing();

  let args = args::Args::parse();
  info!("模型文件路径: {}", args.model);

  let builder = OnnxModelBuilder::from_url(&args.model)?.intra_threads(args.threads);
  let mut classifier = Classifier::new(builder).with_top(args.top);
  let mut reporter = ConsoleStatus::stdout();

  if let Some(image) = args.image {
    let status = classifier.run_action(&mut PresetPicker::new(Some(image)), &mut reporter);
    return one_shot_result(status);
  }

  let stdin = io::stdin();
  let mut stdin = stdin.lock();
  loop {
    print!("按回车开始分类，输入 q 退出: ");
    io::stdout().flush()?;

    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 || line.trim().eq_ignore_ascii_case("q") {
      break;
    }

    // 操作完成前不会再次提示，保证同一时间只有一个请求
    let mut picker = LinePicker::new(&mut stdin, io::stdout());
    classifier.run_action(&mut picker, &mut reporter);
  }

  info!("退出");
  Ok(())
}

/// 单次模式下分类失败时以非零状态退出
fn one_shot_result(status: Status) -> Result<()> {
  match status {
    Status::Error(message) => Err(anyhow!(message)),
    _ => Ok(()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn one_shot_failure_is_error() {
    let err = one_shot_result(Status::Error("模型文件读取错误".into())).unwrap_err();
    assert_eq!(err.to_string(), "模型文件读取错误");
    assert!(one_shot_result(Status::Cancelled).is_ok());
  }
}
