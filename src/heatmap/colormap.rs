// 该文件是 Huoyan （火眼） 项目的一部分。
// src/heatmap/colormap.rs - jet 色表
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

/// 分段线性近似的 jet 色表，`v` 应位于 [0, 1]，越界值由调用方裁剪
pub fn jet(v: f32) -> [u8; 3] {
  let four = 4.0 * v;
  let ramp = |up: f32, down: f32| -> u8 {
    let c = (four + up).min(-four + down).min(1.0).max(0.0);
    (c * 255.0) as u8
  };
  [ramp(-1.5, 4.5), ramp(-0.5, 3.5), ramp(0.5, 2.5)]
}
