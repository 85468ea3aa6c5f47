// 该文件是 Huoyan （火眼） 项目的一部分。
// src/frame/letterbox.rs - 等比缩放加边（letterbox）
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

//! # Letterbox 预处理
//!
//! 将任意尺寸的源图像等比缩放后居中放入 `S×S` 的黑色画布，
//! 同时记录缩放比例与偏移量，供检测框从画布坐标反算回源图坐标。
//!
//! 画布坐标与源图坐标之间的关系：
//!
//! ```text
//! canvas = src * scale + offset
//! src    = (canvas - offset) / scale
//! ```

use image::{RgbImage, imageops};
use tracing::debug;

use super::FrameError;

/// 画布坐标与源图坐标之间的映射参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
  /// 缩放比例 `min(S/srcW, S/srcH)`
  pub scale: f32,
  /// 水平方向左侧填充
  pub offset_x: f32,
  /// 垂直方向上侧填充
  pub offset_y: f32,
  /// 源图宽度
  pub src_width: u32,
  /// 源图高度
  pub src_height: u32,
}

impl LetterboxTransform {
  /// 画布坐标 -> 源图坐标
  pub fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
    (
      (x - self.offset_x) / self.scale,
      (y - self.offset_y) / self.scale,
    )
  }

  /// 源图坐标 -> 画布坐标
  pub fn to_canvas(&self, x: f32, y: f32) -> (f32, f32) {
    (
      x * self.scale + self.offset_x,
      y * self.scale + self.offset_y,
    )
  }

  /// 画布坐标 -> 源图坐标，并裁剪到源图范围内
  pub fn to_source_clamped(&self, x: f32, y: f32) -> (f32, f32) {
    let (sx, sy) = self.to_source(x, y);
    (
      sx.clamp(0.0, self.src_width as f32),
      sy.clamp(0.0, self.src_height as f32),
    )
  }
}

/// 一次推理调用内的 letterbox 结果
#[derive(Debug, Clone)]
pub struct Letterbox {
  pub canvas: RgbImage,
  pub transform: LetterboxTransform,
}

impl Letterbox {
  pub fn size(&self) -> u32 {
    self.canvas.width()
  }
}

pub fn letterbox(image: &RgbImage, size: u32) -> Result<Letterbox, FrameError> {
  let (src_w, src_h) = image.dimensions();
  if src_w == 0 || src_h == 0 {
    return Err(FrameError::InvalidInput(format!(
      "源图尺寸无效: {}x{}",
      src_w, src_h
    )));
  }
  if size == 0 {
    return Err(FrameError::InvalidInput("画布尺寸不能为 0".to_string()));
  }

  let scale = (size as f32 / src_w as f32).min(size as f32 / src_h as f32);
  // 极端长宽比下也保证至少一个像素
  let new_w = ((src_w as f32 * scale).round() as u32).clamp(1, size);
  let new_h = ((src_h as f32 * scale).round() as u32).clamp(1, size);
  let pad_x = (size - new_w) / 2;
  let pad_y = (size - new_h) / 2;

  debug!(
    "letterbox: {}x{} -> {}x{}, scale={:.4}, offset=({}, {})",
    src_w, src_h, new_w, new_h, scale, pad_x, pad_y
  );

  let mut canvas = RgbImage::new(size, size);
  if (new_w, new_h) == (src_w, src_h) {
    imageops::replace(&mut canvas, image, pad_x as i64, pad_y as i64);
  } else {
    let resized = imageops::resize(image, new_w, new_h, imageops::FilterType::Triangle);
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);
  }

  Ok(Letterbox {
    canvas,
    transform: LetterboxTransform {
      scale,
      offset_x: pad_x as f32,
      offset_y: pad_y as f32,
      src_width: src_w,
      src_height: src_h,
    },
  })
}
