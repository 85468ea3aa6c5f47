// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/label.rs - 类别标签表
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

use std::{borrow::Cow, path::Path};

use thiserror::Error;
use tracing::{debug, warn};

/// COCO 数据集类别名称
pub const COCO_LABELS: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// 室内家居类别（chair 到 vase）
pub const HOME_CLASS_IDS: [i32; 20] = [
  56, 57, 58, 59, 60, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70, 71, 72, 73, 74, 75,
];

pub fn is_home_class(class_id: i32) -> bool {
  HOME_CLASS_IDS.contains(&class_id)
}

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("标签文件不可读: {0}")]
  ResourceUnavailable(#[from] std::io::Error),
  #[error("标签文件格式错误: {0}")]
  Malformed(String),
}

/// 类别标签表，下标即类别 ID
#[derive(Debug, Clone, PartialEq)]
pub struct Labels {
  names: Box<[String]>,
}

impl Default for Labels {
  fn default() -> Self {
    Self::coco()
  }
}

impl Labels {
  pub fn coco() -> Self {
    Self {
      names: COCO_LABELS.iter().map(|s| s.to_string()).collect(),
    }
  }

  /// 每行一个类别名，忽略空行
  pub fn parse(text: &str) -> Result<Self, LabelError> {
    let names: Box<[String]> = text
      .lines()
      .map(str::trim)
      .filter(|line| !line.is_empty())
      .map(str::to_string)
      .collect();
    if names.is_empty() {
      return Err(LabelError::Malformed("没有任何类别名".to_string()));
    }
    Ok(Self { names })
  }

  pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LabelError> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)
      .map_err(|e| LabelError::Malformed(format!("不是有效的 UTF-8: {}", e)))?;
    Self::parse(&text)
  }

  /// 读取标签文件，失败时退回内置的 COCO 表
  pub fn load_or_default(path: Option<&Path>) -> Self {
    let Some(path) = path else {
      debug!("未指定标签文件，使用内置 COCO 标签");
      return Self::coco();
    };
    match Self::from_file(path) {
      Ok(labels) => {
        debug!("从 {} 加载 {} 个类别", path.display(), labels.len());
        labels
      }
      Err(e) => {
        warn!("加载标签文件 {} 失败 ({}), 使用内置 COCO 标签", path.display(), e);
        Self::coco()
      }
    }
  }

  pub fn len(&self) -> usize {
    self.names.len()
  }

  pub fn is_empty(&self) -> bool {
    self.names.is_empty()
  }

  /// 越界或负数 ID 返回 `cls N`
  pub fn name(&self, class_id: i32) -> Cow<'_, str> {
    usize::try_from(class_id)
      .ok()
      .and_then(|idx| self.names.get(idx))
      .map(|name| Cow::Borrowed(name.as_str()))
      .unwrap_or_else(|| Cow::Owned(format!("cls {}", class_id)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn builtin_table_has_eighty_names() {
    let labels = Labels::coco();
    assert_eq!(labels.len(), 80);
    assert_eq!(labels.name(0), "person");
    assert_eq!(labels.name(56), "chair");
    assert_eq!(labels.name(79), "toothbrush");
  }

  #[test]
  fn out_of_range_ids_get_placeholder() {
    let labels = Labels::coco();
    assert_eq!(labels.name(80), "cls 80");
    assert_eq!(labels.name(-1), "cls -1");
  }

  #[test]
  fn home_ids_are_indoor_objects() {
    let labels = Labels::coco();
    assert_eq!(labels.name(HOME_CLASS_IDS[0]), "chair");
    assert_eq!(labels.name(HOME_CLASS_IDS[19]), "vase");
    assert!(is_home_class(62));
    assert!(!is_home_class(0));
    assert!(!is_home_class(76));
  }

  #[test]
  fn parse_skips_blank_lines() {
    let labels = Labels::parse("cat\n\n  dog  \n\r\nbird\n").unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels.name(1), "dog");
    assert_eq!(labels.name(3), "cls 3");
  }

  #[test]
  fn empty_file_is_malformed() {
    assert!(matches!(Labels::parse("\n \n"), Err(LabelError::Malformed(_))));
  }

  #[test]
  fn load_falls_back_to_coco() {
    let missing = Path::new("/nonexistent/labels.txt");
    assert!(matches!(
      Labels::from_file(missing),
      Err(LabelError::ResourceUnavailable(_))
    ));
    assert_eq!(Labels::load_or_default(Some(missing)), Labels::coco());
    assert_eq!(Labels::load_or_default(None), Labels::coco());

    let mut invalid = tempfile::NamedTempFile::new().unwrap();
    invalid.write_all(&[0xff, 0xfe, 0x00]).unwrap();
    assert_eq!(Labels::load_or_default(Some(invalid.path())), Labels::coco());
  }

  #[test]
  fn load_reads_custom_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "sofa\nlamp").unwrap();
    let labels = Labels::load_or_default(Some(file.path()));
    assert_eq!(labels.len(), 2);
    assert_eq!(labels.name(0), "sofa");
  }
}
