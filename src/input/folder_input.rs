// 该文件是 Huoyan （火眼） 项目的一部分。
// src/input/folder_input.rs - 目录图像序列输入
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

//! # 目录输入
//!
//! 按文件名顺序读取目录中的全部图像，作为一段帧序列。
//! 通过 `fps` 查询参数可按固定帧率放出图像，模拟实时相机：
//!
//! ```text
//! folder:///data/frames?fps=30
//! ```
//!
//! 无法解码的文件会记录错误并跳过，不影响后续帧。

use std::{
  path::PathBuf,
  time::{Duration, Instant},
};

use image::RgbImage;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use super::read_image_file::read_rgb_image;
use crate::{FromUrl, FromUrlWithScheme, query_value};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum FolderInputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("参数错误: {0}")]
  InvalidQuery(String),
}

pub struct FolderInput {
  files: std::vec::IntoIter<PathBuf>,
  interval: Option<Duration>,
  last_emit: Option<Instant>,
}

impl FromUrlWithScheme for FolderInput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for FolderInput {
  type Error = FolderInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(FolderInputError::SchemeMismatch);
    }

    let fps = query_value::<f64>(url, "fps").map_err(FolderInputError::InvalidQuery)?;
    let interval = match fps {
      Some(fps) if fps.is_finite() && fps > 0.0 => Some(Duration::from_secs_f64(1.0 / fps)),
      Some(fps) => {
        return Err(FolderInputError::InvalidQuery(format!(
          "帧率必须为正数: {}",
          fps
        )));
      }
      None => None,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(url.path())? {
      let path = entry?.path();
      let is_image = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
      if is_image && path.is_file() {
        files.push(path);
      }
    }
    files.sort();
    info!("目录 {} 中共有 {} 张图像", url.path(), files.len());

    Ok(FolderInput {
      files: files.into_iter(),
      interval,
      last_emit: None,
    })
  }
}

impl FolderInput {
  fn pace(&mut self) {
    if let (Some(interval), Some(last)) = (self.interval, self.last_emit) {
      let elapsed = last.elapsed();
      if elapsed < interval {
        std::thread::sleep(interval - elapsed);
      }
    }
    self.last_emit = Some(Instant::now());
  }
}

impl Iterator for FolderInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    for path in self.files.by_ref() {
      match read_rgb_image(&path) {
        Ok(image) => {
          debug!("读取帧 {}", path.display());
          self.pace();
          return Some(image);
        }
        Err(e) => error!("跳过无法读取的图像 {}: {}", path.display(), e),
      }
    }
    None
  }
}
