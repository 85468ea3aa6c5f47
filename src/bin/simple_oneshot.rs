// 该文件是 Huoyan （火眼） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧推理
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use huoyan::{
  FromUrl,
  input::InputWrapper,
  model::{ReplayEngine, YoloV8Builder},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// Huoyan 单帧推理参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 推理引擎，例如 replay:///path/to/output.json?size=640
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///path/to/frame.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 image:///path/to/out.png?view=both&font=/path/to/font.ttf
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 类别名称文件，每行一个名称
  #[arg(long, value_name = "LABELS")]
  pub labels: Option<PathBuf>,
  /// 置信度阈值
  #[arg(long, default_value_t = 0.25)]
  pub confidence: f32,
  /// 保留全部类别，而不仅是室内家居类别
  #[arg(long)]
  pub all_classes: bool,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let engine = ReplayEngine::from_url(&args.model)?;
  let model = YoloV8Builder::default()
    .confidence(args.confidence)
    .home_only(!args.all_classes)
    .labels(args.labels)
    .build(engine)?;
  let output = OutputWrapper::from_url(&args.output)?.with_labels(model.labels().clone());

  OneShotTask.run_task(input, model, output)?;

  Ok(())
}
