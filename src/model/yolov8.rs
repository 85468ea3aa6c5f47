// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/yolov8.rs - YOLOv8（图内 NMS 导出）检测器
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

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
  frame::{AsNhwcTensor, NhwcTensor, letterbox},
  model::{
    DetectError, DetectResult, DetectorConfig, Engine, Labels, Model, OUTPUT_ROW_LEN, decode,
    output_rows,
  },
};

/// 持有推理引擎与标签表的检测器，释放时一并释放引擎资源
pub struct YoloV8<E> {
  engine: E,
  labels: Labels,
  config: DetectorConfig,
}

#[derive(Error, Debug)]
pub enum YoloV8BuilderError {
  #[error("置信度阈值无效: {0}")]
  InvalidConfidence(f32),
  #[error("模型输出不符合约定: {0}")]
  Contract(#[from] DetectError),
}

#[derive(Debug, Default)]
pub struct YoloV8Builder {
  config: DetectorConfig,
  labels_path: Option<PathBuf>,
}

impl YoloV8Builder {
  pub fn confidence(mut self, confidence: f32) -> Self {
    self.config.confidence = confidence;
    self
  }

  pub fn home_only(mut self, home_only: bool) -> Self {
    self.config.home_only = home_only;
    self
  }

  pub fn labels(mut self, path: Option<PathBuf>) -> Self {
    self.labels_path = path;
    self
  }

  pub fn build<E: Engine>(self, engine: E) -> Result<YoloV8<E>, YoloV8BuilderError> {
    let confidence = self.config.confidence;
    if !(0.0..=1.0).contains(&confidence) {
      return Err(YoloV8BuilderError::InvalidConfidence(confidence));
    }

    // 提前检查输出约定，避免每帧都失败
    let rows = output_rows(engine.output_shape())?;
    info!(
      "检测器就绪: 输入 {}x{}, 输出 {} 行, 置信度阈值 {}, 仅家居类别 {}",
      engine.input_size(),
      engine.input_size(),
      rows,
      confidence,
      self.config.home_only
    );

    let labels = Labels::load_or_default(self.labels_path.as_deref());
    Ok(YoloV8 {
      engine,
      labels,
      config: self.config,
    })
  }
}

impl<E: Engine> YoloV8<E> {
  pub fn labels(&self) -> &Labels {
    &self.labels
  }

  pub fn config(&self) -> &DetectorConfig {
    &self.config
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }
}

impl<E: Engine> Model for YoloV8<E> {
  type Input = RgbImage;
  type Output = DetectResult;
  type Error = DetectError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let rows = output_rows(self.engine.output_shape())?;

    debug!("letterbox 预处理");
    let lb = letterbox(input, self.engine.input_size())?;
    let tensor = NhwcTensor::from(&lb.canvas);

    debug!("执行模型推理");
    let mut output = vec![0.0f32; rows * OUTPUT_ROW_LEN];
    self
      .engine
      .run(tensor.as_nhwc(), &mut output)
      .map_err(|e| DetectError::Engine(Box::new(e)))?;

    debug!("后处理模型输出");
    let result = decode(&output, rows, &lb.transform, &self.config)?;
    for (i, item) in result.iter().take(3).enumerate() {
      debug!(
        "#{} {} ({}) score={:.2} bbox={:?}",
        i,
        self.labels.name(item.class_id),
        item.class_id,
        item.score,
        item.bbox
      );
    }
    Ok(result)
  }
}
