// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model.rs - 模型
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

use thiserror::Error;

use crate::frame::FrameError;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 不透明的模型执行引擎
///
/// 输入为 `[1, S, S, 3]` 的 NHWC 浮点张量，输出为 `[1, N, 6]`，
/// 每行为 `(cx, cy, w, h, score, class_id)`，坐标位于画布像素空间，NMS 已在模型内部完成。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 正方形输入画布边长 S
  fn input_size(&self) -> u32;
  /// 模型声明的输出形状
  fn output_shape(&self) -> &[usize];
  fn run(&self, input: &[f32], output: &mut [f32]) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: i32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，源图像素坐标
}

impl DetectItem {
  pub fn width(&self) -> f32 {
    self.bbox[2] - self.bbox[0]
  }

  pub fn height(&self) -> f32 {
    self.bbox[3] - self.bbox[1]
  }

  pub fn center(&self) -> (f32, f32) {
    (
      (self.bbox[0] + self.bbox[2]) * 0.5,
      (self.bbox[1] + self.bbox[3]) * 0.5,
    )
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }

  /// 按置信度降序排列的副本，输出顺序本身保持解码顺序
  pub fn sorted_by_score(&self) -> Vec<DetectItem> {
    let mut items = self.items.to_vec();
    items.sort_by(|a, b| b.score.total_cmp(&a.score));
    items
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

#[derive(Error, Debug)]
pub enum DetectError {
  #[error("输入无效: {0}")]
  InvalidInput(String),
  #[error("模型输出不符合约定: {0}")]
  ModelContractViolation(String),
  #[error("推理引擎错误: {0}")]
  Engine(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<FrameError> for DetectError {
  fn from(err: FrameError) -> Self {
    match err {
      FrameError::InvalidInput(msg) => DetectError::InvalidInput(msg),
    }
  }
}

/// 检测器参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorConfig {
  /// 置信度阈值，低于该值的输出行被丢弃（包括模型输出中的填充行）
  pub confidence: f32,
  /// 仅保留室内家居类别
  pub home_only: bool,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      confidence: 0.35,
      home_only: true,
    }
  }
}

mod decode;
mod label;
#[cfg(feature = "engine_replay")]
mod replay;
mod yolov8;

pub use self::decode::{OUTPUT_ROW_LEN, decode, output_rows};
pub use self::label::{COCO_LABELS, HOME_CLASS_IDS, LabelError, Labels, is_home_class};
#[cfg(feature = "engine_replay")]
pub use self::replay::{ReplayEngine, ReplayEngineError};
pub use self::yolov8::{YoloV8, YoloV8Builder, YoloV8BuilderError};
