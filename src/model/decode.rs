// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/decode.rs - 模型输出解码
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

use tracing::{debug, error};

use crate::{
  frame::LetterboxTransform,
  model::{DetectError, DetectItem, DetectResult, DetectorConfig, is_home_class},
};

/// 每行 `(cx, cy, w, h, score, class_id)`
pub const OUTPUT_ROW_LEN: usize = 6;

/// 校验输出形状 `[1, N, 6]` 并返回行数 N
pub fn output_rows(shape: &[usize]) -> Result<usize, DetectError> {
  if shape.last() != Some(&OUTPUT_ROW_LEN) {
    error!("模型输出形状 {:?} 缺少末维 {}", shape, OUTPUT_ROW_LEN);
    return Err(DetectError::ModelContractViolation(format!(
      "期望输出末维为 {}, 实际形状为 {:?}",
      OUTPUT_ROW_LEN, shape
    )));
  }
  match shape {
    [1, n, _] => Ok(*n),
    _ => Err(DetectError::InvalidInput(format!(
      "输出形状格式错误: 期望 [1, N, {}], 实际 {:?}",
      OUTPUT_ROW_LEN, shape
    ))),
  }
}

/// 将模型输出行解码为源图坐标下的检测结果
///
/// 不做 NMS；填充行完全依赖置信度阈值剔除。输出保持行顺序，不按分数重排。
pub fn decode(
  output: &[f32],
  rows: usize,
  transform: &LetterboxTransform,
  config: &DetectorConfig,
) -> Result<DetectResult, DetectError> {
  let expected = rows * OUTPUT_ROW_LEN;
  if output.len() < expected {
    return Err(DetectError::InvalidInput(format!(
      "输出缓冲区长度不足: 期望 {}, 实际 {}",
      expected,
      output.len()
    )));
  }

  let mut items = Vec::new();
  for row in output[..expected].chunks_exact(OUTPUT_ROW_LEN) {
    let &[cx, cy, w, h, score, class_id] = row else {
      continue;
    };

    if !score.is_finite() || score < config.confidence {
      continue;
    }

    let class_id = class_id as i32;
    if config.home_only && !is_home_class(class_id) {
      continue;
    }

    if ![cx, cy, w, h].iter().all(|v| v.is_finite()) {
      debug!("丢弃非有限坐标的输出行: {:?}", row);
      continue;
    }

    let (x1, y1) = transform.to_source_clamped(cx - w / 2.0, cy - h / 2.0);
    let (x2, y2) = transform.to_source_clamped(cx + w / 2.0, cy + h / 2.0);

    items.push(DetectItem {
      class_id,
      score,
      bbox: [x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)],
    });
  }

  debug!("解码 {} 行输出，保留 {} 个检测", rows, items.len());
  Ok(DetectResult::from(items))
}
