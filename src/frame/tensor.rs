// 该文件是 Huoyan （火眼） 项目的一部分。
// src/frame/tensor.rs - NHWC 浮点输入张量
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

use image::RgbImage;

use super::{AsNhwcTensor, RGB_CHANNELS};

/// 按像素交错排列 (R, G, B) 的浮点张量，数值范围 [0, 1]
///
/// 布局必须与模型输入张量 `[1, H, W, 3]` 完全一致，否则模型只会静默地给出错误结果。
#[derive(Debug, Clone)]
pub struct NhwcTensor {
  data: Box<[f32]>,
  width: usize,
  height: usize,
}

impl NhwcTensor {
  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn len(&self) -> usize {
    self.data.len()
  }

  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }
}

impl From<&RgbImage> for NhwcTensor {
  fn from(image: &RgbImage) -> Self {
    let (width, height) = image.dimensions();
    // RgbImage 本身即为行优先、通道交错的存储
    let data = image
      .as_raw()
      .iter()
      .map(|&v| f32::from(v) / 255.0)
      .collect::<Vec<_>>()
      .into_boxed_slice();

    Self {
      data,
      width: width as usize,
      height: height as usize,
    }
  }
}

impl AsNhwcTensor for NhwcTensor {
  fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::Rgb;

  #[test]
  fn packs_interleaved_and_scaled() {
    let mut image = RgbImage::new(2, 2);
    image.put_pixel(0, 0, Rgb([255, 0, 51]));
    image.put_pixel(1, 0, Rgb([0, 255, 0]));
    image.put_pixel(0, 1, Rgb([0, 0, 255]));
    image.put_pixel(1, 1, Rgb([102, 153, 204]));

    let tensor = NhwcTensor::from(&image);
    assert_eq!(tensor.len(), 2 * 2 * 3);
    assert_eq!((tensor.width(), tensor.height(), tensor.channels()), (2, 2, 3));

    let data = tensor.as_nhwc();
    assert_eq!(&data[0..3], &[1.0, 0.0, 51.0 / 255.0]);
    assert_eq!(&data[3..6], &[0.0, 1.0, 0.0]);
    assert_eq!(&data[6..9], &[0.0, 0.0, 1.0]);
    assert_eq!(&data[9..12], &[102.0 / 255.0, 153.0 / 255.0, 204.0 / 255.0]);
  }

  #[test]
  fn values_stay_in_unit_range() {
    let image = RgbImage::from_fn(16, 16, |x, y| Rgb([(x * 16) as u8, (y * 16) as u8, 255]));
    let tensor = NhwcTensor::from(&image);
    assert!(tensor.as_nhwc().iter().all(|v| (0.0..=1.0).contains(v)));
  }
}
