// 该文件是 Huoyan （火眼） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

//! 将每帧渲染结果保存到 `<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.png`。
//!
//! 查询参数：
//! - `record=id|name`：同时写入同名 `.txt` 检测记录；
//! - `always`：没有检测结果的帧也保存；
//! - 其余参数（`view`、`font` 等）与图像输出相同。

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, Labels},
  output::{
    Render,
    draw::{Draw, DrawError, Record},
  },
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("绘制错误: {0}")]
  DrawError(#[from] DrawError),
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  record: Option<Record>,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let record = uri
      .query_pairs()
      .find(|(k, _)| k == "record")
      .map(|(_, v)| Record {
        label_with_name: v != "id",
      });
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::from_query(uri)?,
      record,
      frame_counters: Arc::new(Mutex::new(0)),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  pub fn with_labels(mut self, labels: Labels) -> Self {
    self.draw = self.draw.with_labels(labels);
    self
  }

  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counters
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<RgbImage, DetectResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &DetectResult) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      return Ok(());
    }

    let path = self.frame_path()?;
    let image = self.draw.draw(frame, result)?;
    image.save(&path)?;
    if let Some(record) = &self.record {
      record.record(self.draw.labels(), result, &path)?;
    }
    debug!("保存帧 {}，检测数 {}", path.display(), result.len());
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;

  fn saved_files(root: &std::path::Path, ext: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          stack.push(path);
        } else if path.extension().is_some_and(|e| e == ext) {
          found.push(path);
        }
      }
    }
    found
  }

  #[test]
  fn skips_empty_frames_unless_always() {
    let dir = tempfile::tempdir().unwrap();
    let frame = RgbImage::new(8, 8);
    let empty = DetectResult::default();

    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &empty).unwrap();
    assert!(saved_files(dir.path(), "png").is_empty());

    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    output.render_result(&frame, &empty).unwrap();
    assert_eq!(saved_files(dir.path(), "png").len(), 1);
  }

  #[test]
  fn writes_text_record_next_to_frame() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?record=name", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();

    let frame = RgbImage::new(16, 16);
    let result = DetectResult::from(vec![DetectItem {
      class_id: 62,
      score: 0.9,
      bbox: [1.0, 2.0, 10.0, 12.0],
    }]);
    output.render_result(&frame, &result).unwrap();
    output.render_result(&frame, &result).unwrap();

    let images = saved_files(dir.path(), "png");
    let records = saved_files(dir.path(), "txt");
    assert_eq!(images.len(), 2);
    assert_eq!(records.len(), 2);
    let text = std::fs::read_to_string(&records[0]).unwrap();
    assert_eq!(text, "tv, 0.9000, 1.0000, 2.0000, 10.0000, 12.0000");
  }
}
