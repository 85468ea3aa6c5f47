// 该文件是 Huoyan （火眼） 项目的一部分。
// src/heatmap.rs - 检测置信度热力图
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

//! # 热力图
//!
//! 在降采样的标量场上为每个检测框绘制各向异性高斯斑点，
//! 重叠处取最大值（置信度高者胜出，而非累加），
//! 归一化后经 jet 色表着色，再用双线性插值放大回原图尺寸。

use image::{Rgba, RgbaImage, imageops};
use thiserror::Error;
use tracing::debug;

use crate::model::DetectItem;

mod colormap;

pub use self::colormap::jet;

/// 高斯窗口半宽（以 sigma 计），更远处的贡献忽略不计
const GAUSSIAN_WINDOW_SIGMAS: f32 = 3.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HeatmapError {
  #[error("输入无效: {0}")]
  InvalidInput(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapConfig {
  /// 降采样倍数 d，标量场尺寸为原图的 1/d
  pub downsample: u32,
  /// 高斯 sigma 相对检测框尺寸的比例
  pub sigma_factor: f32,
  /// 叠加层透明度
  pub alpha: u8,
}

impl Default for HeatmapConfig {
  fn default() -> Self {
    Self {
      downsample: 4,
      sigma_factor: 0.25,
      alpha: 0x66,
    }
  }
}

impl HeatmapConfig {
  pub fn validate(&self) -> Result<(), HeatmapError> {
    if self.downsample == 0 {
      return Err(HeatmapError::InvalidInput("降采样倍数必须 >= 1".to_string()));
    }
    if !(self.sigma_factor.is_finite() && self.sigma_factor > 0.0) {
      return Err(HeatmapError::InvalidInput(format!(
        "sigma 比例必须为正数: {}",
        self.sigma_factor
      )));
    }
    Ok(())
  }
}

/// 低分辨率标量场，按行优先存储
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
  width: u32,
  height: u32,
  data: Box<[f32]>,
}

impl ScalarField {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      data: vec![0.0; width as usize * height as usize].into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn values(&self) -> &[f32] {
    &self.data
  }

  pub fn get(&self, x: u32, y: u32) -> f32 {
    self.data[y as usize * self.width as usize + x as usize]
  }

  /// 在场坐标 (cx, cy) 处以 max 方式叠加峰值为 `peak` 的高斯斑点
  pub fn splat(&mut self, cx: f32, cy: f32, sigma_x: f32, sigma_y: f32, peak: f32) {
    if self.data.is_empty() {
      return;
    }
    let two_sigma_x2 = 2.0 * sigma_x * sigma_x;
    let two_sigma_y2 = 2.0 * sigma_y * sigma_y;

    let max_x = self.width as i64 - 1;
    let max_y = self.height as i64 - 1;
    let x0 = ((cx - GAUSSIAN_WINDOW_SIGMAS * sigma_x).floor() as i64).max(0);
    let x1 = ((cx + GAUSSIAN_WINDOW_SIGMAS * sigma_x).ceil() as i64).min(max_x);
    let y0 = ((cy - GAUSSIAN_WINDOW_SIGMAS * sigma_y).floor() as i64).max(0);
    let y1 = ((cy + GAUSSIAN_WINDOW_SIGMAS * sigma_y).ceil() as i64).min(max_y);

    let width = self.width as usize;
    for y in y0..=y1 {
      let dy2 = (y as f32 - cy) * (y as f32 - cy);
      let row = &mut self.data[y as usize * width..(y as usize + 1) * width];
      for x in x0..=x1 {
        let dx2 = (x as f32 - cx) * (x as f32 - cx);
        let g = (-dx2 / two_sigma_x2 - dy2 / two_sigma_y2).exp();
        let cell = &mut row[x as usize];
        *cell = cell.max(g * peak);
      }
    }
  }

  /// 全局最小值与最大值，空场返回 (0, 0)
  pub fn min_max(&self) -> (f32, f32) {
    if self.data.is_empty() {
      return (0.0, 0.0);
    }
    self
      .data
      .iter()
      .fold((f32::INFINITY, f32::NEG_INFINITY), |(mn, mx), &v| {
        (mn.min(v), mx.max(v))
      })
  }

  /// 归一化到 [0, 1]；最大值等于最小值时除数取 1
  pub fn normalized(&self) -> ScalarField {
    let (mn, mx) = self.min_max();
    let range = if mx > mn { mx - mn } else { 1.0 };
    let data = self
      .data
      .iter()
      .map(|&v| ((v - mn) / range).clamp(0.0, 1.0))
      .collect();
    ScalarField {
      width: self.width,
      height: self.height,
      data,
    }
  }
}

pub struct Heatmap {
  config: HeatmapConfig,
}

impl Default for Heatmap {
  fn default() -> Self {
    Self {
      config: HeatmapConfig::default(),
    }
  }
}

impl Heatmap {
  pub fn new(config: HeatmapConfig) -> Result<Self, HeatmapError> {
    config.validate()?;
    Ok(Self { config })
  }

  pub fn config(&self) -> &HeatmapConfig {
    &self.config
  }

  /// 将检测结果光栅化为降采样标量场（未归一化）
  pub fn field<'a, I>(&self, width: u32, height: u32, detections: I) -> Result<ScalarField, HeatmapError>
  where
    I: IntoIterator<Item = &'a DetectItem>,
  {
    if width == 0 || height == 0 {
      return Err(HeatmapError::InvalidInput(format!(
        "图像尺寸无效: {}x{}",
        width, height
      )));
    }
    let d = self.config.downsample;
    let df = d as f32;
    let mut field = ScalarField::new((width / d).max(1), (height / d).max(1));

    let mut count = 0usize;
    for det in detections {
      let (cx, cy) = det.center();
      let bw = det.width() / df;
      let bh = det.height() / df;
      // sigma 下限为 1，避免极小或零面积的框退化
      let sigma_x = (bw * self.config.sigma_factor).max(1.0);
      let sigma_y = (bh * self.config.sigma_factor).max(1.0);
      field.splat(cx / df, cy / df, sigma_x, sigma_y, det.score);
      count += 1;
    }

    debug!(
      "热力图标量场 {}x{}, 绘制 {} 个检测",
      field.width(),
      field.height(),
      count
    );
    Ok(field)
  }

  /// 生成原图尺寸的 RGBA 热力图叠加层
  pub fn render<'a, I>(&self, width: u32, height: u32, detections: I) -> Result<RgbaImage, HeatmapError>
  where
    I: IntoIterator<Item = &'a DetectItem>,
  {
    let field = self.field(width, height, detections)?.normalized();
    let alpha = self.config.alpha;
    let small = RgbaImage::from_fn(field.width(), field.height(), |x, y| {
      let [r, g, b] = jet(field.get(x, y));
      Rgba([r, g, b, alpha])
    });

    if small.dimensions() == (width, height) {
      return Ok(small);
    }
    Ok(imageops::resize(
      &small,
      width,
      height,
      imageops::FilterType::Triangle,
    ))
  }
}
