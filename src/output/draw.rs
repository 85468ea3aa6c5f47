// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage, imageops};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  heatmap::{Heatmap, HeatmapConfig, HeatmapError},
  model::{DetectItem, DetectResult, Labels},
  output::View,
  query_value,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_PADDING: i32 = 2;
const BOX_THICKNESS: i32 = 3;
const BOX_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const LABEL_BACKGROUND: [u8; 3] = [0, 0, 0];
const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("参数错误: {0}")]
  InvalidQuery(String),
  #[error("字体文件读取失败: {0}")]
  FontIo(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(String),
  #[error("热力图错误: {0}")]
  Heatmap(#[from] HeatmapError),
}

/// 标签文本，置信度以截断后的百分比显示
pub fn label_text(name: &str, score: f32) -> String {
  format!("{} {}%", name, (score * 100.0) as i32)
}

pub struct Draw {
  view: View,
  font: Option<FontArc>,
  font_size: f32,
  labels: Labels,
  heatmap: Heatmap,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      view: View::default(),
      font: None,
      font_size: LABEL_FONT_SIZE,
      labels: Labels::default(),
      heatmap: Heatmap::default(),
    }
  }
}

impl Draw {
  /// 从输出 URL 的查询参数构造：
  /// `view`、`font`、`font_size`、`downsample`、`sigma`、`alpha`
  pub fn from_query(url: &Url) -> Result<Self, DrawError> {
    let view = query_value::<View>(url, "view")
      .map_err(DrawError::InvalidQuery)?
      .unwrap_or_default();

    let font = match query_value::<String>(url, "font").map_err(DrawError::InvalidQuery)? {
      Some(path) => Some(load_font(&path)?),
      None => {
        if view.boxes() {
          warn!("未指定字体 (font=<path>)，将只绘制检测框而不绘制标签");
        }
        None
      }
    };
    let font_size = query_value::<f32>(url, "font_size")
      .map_err(DrawError::InvalidQuery)?
      .unwrap_or(LABEL_FONT_SIZE);

    let defaults = HeatmapConfig::default();
    let config = HeatmapConfig {
      downsample: query_value(url, "downsample")
        .map_err(DrawError::InvalidQuery)?
        .unwrap_or(defaults.downsample),
      sigma_factor: query_value(url, "sigma")
        .map_err(DrawError::InvalidQuery)?
        .unwrap_or(defaults.sigma_factor),
      alpha: query_value(url, "alpha")
        .map_err(DrawError::InvalidQuery)?
        .unwrap_or(defaults.alpha),
    };

    Ok(Self {
      view,
      font,
      font_size,
      labels: Labels::default(),
      heatmap: Heatmap::new(config)?,
    })
  }

  pub fn with_labels(mut self, labels: Labels) -> Self {
    self.labels = labels;
    self
  }

  pub fn with_view(mut self, view: View) -> Self {
    self.view = view;
    self
  }

  pub fn view(&self) -> View {
    self.view
  }

  pub fn labels(&self) -> &Labels {
    &self.labels
  }

  /// 按视图设置生成渲染结果，原始帧不变
  pub fn draw(&self, frame: &RgbImage, result: &DetectResult) -> Result<RgbImage, DrawError> {
    let mut image = if self.view.heatmap() {
      self.overlay_heatmap(frame, result)?
    } else {
      frame.clone()
    };
    if self.view.boxes() {
      self.draw_detections(&mut image, result);
    }
    Ok(image)
  }

  /// 将热力图按其 alpha 通道混合到帧上
  pub fn overlay_heatmap(
    &self,
    frame: &RgbImage,
    result: &DetectResult,
  ) -> Result<RgbImage, DrawError> {
    let overlay = self
      .heatmap
      .render(frame.width(), frame.height(), result.iter())?;
    let mut canvas = DynamicImage::ImageRgb8(frame.clone()).into_rgba8();
    imageops::overlay(&mut canvas, &overlay, 0, 0);
    Ok(DynamicImage::ImageRgba8(canvas).into_rgb8())
  }

  pub fn draw_detections(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.iter() {
      self.draw_bbox_with_label(image, item);
    }
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem) {
    let x_min = item.bbox[0].floor() as i32;
    let y_min = item.bbox[1].floor() as i32;
    let x_max = item.bbox[2].ceil() as i32;
    let y_max = item.bbox[3].ceil() as i32;

    // 由外向内逐圈加粗
    for t in 0..BOX_THICKNESS {
      let w = x_max - x_min - 2 * t;
      let h = y_max - y_min - 2 * t;
      if w <= 0 || h <= 0 {
        break;
      }
      let rect = Rect::at(x_min + t, y_min + t).of_size(w as u32, h as u32);
      draw_hollow_rect_mut(image, rect, Rgb(BOX_COLOR));
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = label_text(&self.labels.name(item.class_id), item.score);
    let scale = PxScale::from(self.font_size);
    let (text_width, text_height) = text_size(scale, font, &label);
    let box_width = text_width as i32 + 2 * LABEL_PADDING;
    let box_height = text_height as i32 + 2 * LABEL_PADDING;

    // 优先放在框上方，空间不足时放在框内
    let label_x = x_min.max(0);
    let label_y = if y_min - box_height >= 0 {
      y_min - box_height
    } else {
      y_min.max(0)
    };

    if box_width > 0 && box_height > 0 {
      let rect = Rect::at(label_x, label_y).of_size(box_width as u32, box_height as u32);
      draw_filled_rect_mut(image, rect, Rgb(LABEL_BACKGROUND));
      draw_text_mut(
        image,
        Rgb(LABEL_TEXT_COLOR),
        label_x + LABEL_PADDING,
        label_y + LABEL_PADDING,
        scale,
        font,
        &label,
      );
    }
  }
}

fn load_font(path: &str) -> Result<FontArc, DrawError> {
  let data = std::fs::read(Path::new(path))?;
  let font = FontArc::try_from_vec(data).map_err(|e| DrawError::InvalidFont(e.to_string()))?;
  info!("加载字体 {}", path);
  Ok(font)
}

/// 检测结果文本记录，每行 `name, score, x1, y1, x2, y2`
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn lines(&self, labels: &Labels, result: &DetectResult) -> Vec<String> {
    result
      .iter()
      .map(|item| {
        let name = if self.label_with_name {
          labels.name(item.class_id).into_owned()
        } else {
          item.class_id.to_string()
        };
        format!(
          "{}, {:.4}, {:.4}, {:.4}, {:.4}, {:.4}",
          name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
        )
      })
      .collect()
  }

  /// 写入与图像同名的 `.txt` 文件
  pub fn record(
    &self,
    labels: &Labels,
    result: &DetectResult,
    path: &Path,
  ) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), self.lines(labels, result).join("\n"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn result(items: Vec<DetectItem>) -> DetectResult {
    DetectResult::from(items)
  }

  fn chair(bbox: [f32; 4], score: f32) -> DetectItem {
    DetectItem {
      class_id: 56,
      score,
      bbox,
    }
  }

  #[test]
  fn label_text_truncates_percentage() {
    assert_eq!(label_text("chair", 0.876), "chair 87%");
    assert_eq!(label_text("tv", 1.0), "tv 100%");
    assert_eq!(label_text("cls 99", 0.0), "cls 99 0%");
  }

  #[test]
  fn boxes_are_drawn_in_green_without_font() {
    let frame = RgbImage::new(64, 48);
    let detections = result(vec![chair([10.0, 10.0, 40.0, 30.0], 0.9)]);
    let image = Draw::default().draw(&frame, &detections).unwrap();

    assert_eq!(image.get_pixel(10, 20).0, BOX_COLOR);
    assert_eq!(image.get_pixel(25, 10).0, BOX_COLOR);
    // 框内部保持原样
    assert_eq!(image.get_pixel(25, 20).0, [0, 0, 0]);
    // 输入帧未被修改
    assert_eq!(frame.get_pixel(10, 20).0, [0, 0, 0]);
  }

  #[test]
  fn degenerate_and_out_of_frame_boxes_do_not_panic() {
    let mut image = RgbImage::new(16, 16);
    let detections = result(vec![
      chair([5.0, 5.0, 5.0, 5.0], 0.9),
      chair([-10.0, -10.0, 40.0, 40.0], 0.9),
    ]);
    Draw::default().draw_detections(&mut image, &detections);
  }

  #[test]
  fn heatmap_view_tints_frame() {
    let frame = RgbImage::new(32, 32);
    let detections = result(vec![chair([8.0, 8.0, 24.0, 24.0], 0.8)]);
    let draw = Draw::default().with_view(View::Heatmap);
    let image = draw.draw(&frame, &detections).unwrap();

    assert_eq!(image.dimensions(), (32, 32));
    // 热区中心偏红，角落偏蓝
    let center = image.get_pixel(16, 16).0;
    let corner = image.get_pixel(0, 0).0;
    assert!(center[0] > corner[0]);
    assert!(corner[2] > corner[0]);
  }

  #[test]
  fn from_query_reads_view_and_heatmap_settings() {
    let url = Url::parse("image:///tmp/out.png?view=both&downsample=2&alpha=200").unwrap();
    let draw = Draw::from_query(&url).unwrap();
    assert_eq!(draw.view(), View::Both);
    assert_eq!(draw.heatmap.config().downsample, 2);
    assert_eq!(draw.heatmap.config().alpha, 200);

    let url = Url::parse("image:///tmp/out.png?downsample=0").unwrap();
    assert!(matches!(
      Draw::from_query(&url),
      Err(DrawError::Heatmap(_))
    ));
    let url = Url::parse("image:///tmp/out.png?view=sideways").unwrap();
    assert!(matches!(
      Draw::from_query(&url),
      Err(DrawError::InvalidQuery(_))
    ));
  }

  #[test]
  fn missing_font_file_is_an_error() {
    let url = Url::parse("image:///tmp/out.png?font=/nonexistent/font.ttf").unwrap();
    assert!(matches!(Draw::from_query(&url), Err(DrawError::FontIo(_))));
  }

  #[test]
  fn record_lines_use_names_or_ids() {
    let detections = result(vec![chair([1.0, 2.0, 3.0, 4.0], 0.5)]);
    let labels = Labels::default();
    let by_name = Record {
      label_with_name: true,
    };
    let by_id = Record {
      label_with_name: false,
    };
    assert_eq!(
      by_name.lines(&labels, &detections),
      vec!["chair, 0.5000, 1.0000, 2.0000, 3.0000, 4.0000".to_string()]
    );
    assert_eq!(
      by_id.lines(&labels, &detections),
      vec!["56, 0.5000, 1.0000, 2.0000, 3.0000, 4.0000".to_string()]
    );
  }
}
