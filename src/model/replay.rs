// 该文件是 Huoyan （火眼） 项目的一部分。
// src/model/replay.rs - 回放推理引擎
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

//! # 回放引擎
//!
//! 从 JSON 文件读取一次已记录的模型输出，每次 `run` 都原样返回。
//! 用于在没有 NPU/GPU 运行时的机器上驱动完整的后处理流程。
//!
//! 支持两种文件格式：
//!
//! ```json
//! {"shape": [1, 2, 6], "data": [320, 320, 100, 100, 0.9, 62, 0, 0, 0, 0, 0, 0]}
//! ```
//!
//! ```json
//! [[320, 320, 100, 100, 0.9, 62]]
//! ```
//!
//! URL 形如 `replay:///path/to/output.json?size=640&rows=100`，
//! `rows` 会用全零行把输出补齐到固定行数，模拟带填充的导出模型。

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Engine, OUTPUT_ROW_LEN},
  query_value,
};

const REPLAY_DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Error, Debug)]
pub enum ReplayEngineError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("模型文件不可读: {0}")]
  ResourceUnavailable(#[from] std::io::Error),
  #[error("回放文件格式错误: {0}")]
  Malformed(String),
  #[error("JSON 解析错误: {0}")]
  Json(#[from] serde_json::Error),
  #[error("输入张量长度不匹配: 期望 {expected}, 实际 {actual}")]
  InputMismatch { expected: usize, actual: usize },
  #[error("输出缓冲区长度不匹配: 期望 {expected}, 实际 {actual}")]
  OutputMismatch { expected: usize, actual: usize },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReplayRecord {
  Tensor { shape: Vec<usize>, data: Vec<f32> },
  Rows(Vec<Vec<f32>>),
}

#[derive(Debug, Clone)]
pub struct ReplayEngine {
  input_size: u32,
  shape: Vec<usize>,
  data: Box<[f32]>,
}

impl FromUrlWithScheme for ReplayEngine {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayEngine {
  type Error = ReplayEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayEngineError::SchemeMismatch(format!(
        "期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      )));
    }

    let size = query_value::<u32>(url, "size")
      .map_err(ReplayEngineError::Malformed)?
      .unwrap_or(REPLAY_DEFAULT_INPUT_SIZE);
    let rows = query_value::<usize>(url, "rows").map_err(ReplayEngineError::Malformed)?;

    info!("加载回放文件: {}", url.path());
    let text = std::fs::read_to_string(url.path())?;
    let mut engine = Self::from_json(&text, size)?;
    if let Some(rows) = rows {
      engine = engine.pad_rows(rows)?;
    }
    Ok(engine)
  }
}

impl ReplayEngine {
  pub fn new(input_size: u32, shape: Vec<usize>, data: Vec<f32>) -> Result<Self, ReplayEngineError> {
    if input_size == 0 {
      return Err(ReplayEngineError::Malformed("输入尺寸不能为 0".to_string()));
    }
    let expected: usize = shape.iter().product();
    if shape.is_empty() || expected != data.len() {
      return Err(ReplayEngineError::Malformed(format!(
        "形状 {:?} 与数据长度 {} 不一致",
        shape,
        data.len()
      )));
    }
    Ok(Self {
      input_size,
      shape,
      data: data.into_boxed_slice(),
    })
  }

  pub fn from_json(text: &str, input_size: u32) -> Result<Self, ReplayEngineError> {
    match serde_json::from_str::<ReplayRecord>(text)? {
      ReplayRecord::Tensor { shape, data } => Self::new(input_size, shape, data),
      ReplayRecord::Rows(rows) => {
        if let Some(bad) = rows.iter().find(|row| row.len() != OUTPUT_ROW_LEN) {
          return Err(ReplayEngineError::Malformed(format!(
            "每行应有 {} 个值, 实际 {}",
            OUTPUT_ROW_LEN,
            bad.len()
          )));
        }
        let n = rows.len();
        let data = rows.into_iter().flatten().collect();
        Self::new(input_size, vec![1, n, OUTPUT_ROW_LEN], data)
      }
    }
  }

  /// 用全零行补齐到 `rows` 行
  pub fn pad_rows(mut self, rows: usize) -> Result<Self, ReplayEngineError> {
    let &[1, n, OUTPUT_ROW_LEN] = self.shape.as_slice() else {
      return Err(ReplayEngineError::Malformed(format!(
        "只能补齐 [1, N, {}] 形状的输出, 实际 {:?}",
        OUTPUT_ROW_LEN, self.shape
      )));
    };
    if rows < n {
      return Err(ReplayEngineError::Malformed(format!(
        "补齐行数 {} 小于已有行数 {}",
        rows, n
      )));
    }
    let mut data = self.data.into_vec();
    data.resize(rows * OUTPUT_ROW_LEN, 0.0);
    debug!("回放输出由 {} 行补齐到 {} 行", n, rows);
    self.shape = vec![1, rows, OUTPUT_ROW_LEN];
    self.data = data.into_boxed_slice();
    Ok(self)
  }
}

impl Engine for ReplayEngine {
  type Error = ReplayEngineError;

  fn input_size(&self) -> u32 {
    self.input_size
  }

  fn output_shape(&self) -> &[usize] {
    &self.shape
  }

  fn run(&self, input: &[f32], output: &mut [f32]) -> Result<(), Self::Error> {
    let side = self.input_size as usize;
    let expected = side * side * 3;
    if input.len() != expected {
      return Err(ReplayEngineError::InputMismatch {
        expected,
        actual: input.len(),
      });
    }
    if output.len() != self.data.len() {
      return Err(ReplayEngineError::OutputMismatch {
        expected: self.data.len(),
        actual: output.len(),
      });
    }
    output.copy_from_slice(&self.data);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn parses_both_formats() {
    let rows = ReplayEngine::from_json("[[1, 2, 3, 4, 0.5, 7], [5, 6, 7, 8, 0.1, 9]]", 320).unwrap();
    assert_eq!(rows.output_shape(), &[1, 2, 6]);
    assert_eq!(rows.input_size(), 320);

    let tensor =
      ReplayEngine::from_json(r#"{"shape": [1, 1, 6], "data": [1, 2, 3, 4, 0.5, 7]}"#, 640).unwrap();
    assert_eq!(tensor.output_shape(), &[1, 1, 6]);
  }

  #[test]
  fn rejects_ragged_rows_and_shape_mismatch() {
    assert!(matches!(
      ReplayEngine::from_json("[[1, 2, 3]]", 640),
      Err(ReplayEngineError::Malformed(_))
    ));
    assert!(matches!(
      ReplayEngine::from_json(r#"{"shape": [1, 2, 6], "data": [1, 2]}"#, 640),
      Err(ReplayEngineError::Malformed(_))
    ));
    assert!(matches!(
      ReplayEngine::from_json("not json", 640),
      Err(ReplayEngineError::Json(_))
    ));
  }

  #[test]
  fn keeps_declared_shape_even_when_off_contract() {
    let engine =
      ReplayEngine::from_json(r#"{"shape": [1, 2, 5], "data": [0,0,0,0,0, 0,0,0,0,0]}"#, 640).unwrap();
    assert_eq!(engine.output_shape(), &[1, 2, 5]);
  }

  #[test]
  fn pads_with_zero_rows() {
    let engine = ReplayEngine::from_json("[[1, 2, 3, 4, 0.5, 7]]", 4)
      .unwrap()
      .pad_rows(3)
      .unwrap();
    assert_eq!(engine.output_shape(), &[1, 3, 6]);
    let mut output = vec![9.0; 18];
    engine.run(&vec![0.0; 4 * 4 * 3], &mut output).unwrap();
    assert_eq!(&output[..6], &[1.0, 2.0, 3.0, 4.0, 0.5, 7.0]);
    assert!(output[6..].iter().all(|&v| v == 0.0));
  }

  #[test]
  fn run_checks_buffer_sizes() {
    let engine = ReplayEngine::from_json("[[1, 2, 3, 4, 0.5, 7]]", 4).unwrap();
    let mut output = vec![0.0; 6];
    assert!(matches!(
      engine.run(&[0.0; 3], &mut output),
      Err(ReplayEngineError::InputMismatch { .. })
    ));
    let mut short = vec![0.0; 5];
    assert!(matches!(
      engine.run(&vec![0.0; 48], &mut short),
      Err(ReplayEngineError::OutputMismatch { .. })
    ));
  }

  #[test]
  fn loads_from_url() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "[[320, 320, 100, 100, 0.9, 62]]").unwrap();
    let url = Url::parse(&format!("replay://{}?size=320&rows=10", file.path().display())).unwrap();
    let engine = ReplayEngine::from_url(&url).unwrap();
    assert_eq!(engine.input_size(), 320);
    assert_eq!(engine.output_shape(), &[1, 10, 6]);

    let missing = Url::parse("replay:///nonexistent/output.json").unwrap();
    assert!(matches!(
      ReplayEngine::from_url(&missing),
      Err(ReplayEngineError::ResourceUnavailable(_))
    ));
    let wrong = Url::parse("image:///tmp/a.json").unwrap();
    assert!(matches!(
      ReplayEngine::from_url(&wrong),
      Err(ReplayEngineError::SchemeMismatch(_))
    ));
  }
}
