// 该文件是 Huoyan （火眼） 项目的一部分。
// tests/pipeline.rs - 端到端流水线测试
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

#![cfg(feature = "engine_replay")]

use image::{Rgb, RgbImage};

use huoyan::{
  frame::{AsNhwcTensor, NhwcTensor, letterbox},
  heatmap::Heatmap,
  model::{DetectItem, Model, ReplayEngine, YoloV8Builder},
};

/// 画布中心一个 100x100 的 tv，一个低分行，一个非家居类别（person）行
fn replay_rows() -> Vec<f32> {
  vec![
    320.0, 320.0, 100.0, 100.0, 0.9, 62.0, //
    100.0, 200.0, 50.0, 50.0, 0.1, 62.0, //
    400.0, 300.0, 80.0, 120.0, 0.95, 0.0,
  ]
}

#[test]
fn landscape_frame_maps_canvas_center_back_to_source_center() {
  let frame = RgbImage::from_pixel(1280, 720, Rgb([90, 90, 90]));
  let lb = letterbox(&frame, 640).unwrap();
  assert_eq!(lb.canvas.dimensions(), (640, 640));
  assert_eq!(lb.transform.scale, 0.5);
  assert_eq!(lb.transform.offset_x, 0.0);
  assert_eq!(lb.transform.offset_y, 140.0);

  let tensor = NhwcTensor::from(&lb.canvas);
  assert_eq!(tensor.len(), 640 * 640 * 3);
  // 填充区为黑色，内容区为源图像素
  assert_eq!(tensor.as_nhwc()[0], 0.0);
  let mid = (320 * 640 + 320) * 3;
  assert!((tensor.as_nhwc()[mid] - 90.0 / 255.0).abs() < 1e-6);

  let engine = ReplayEngine::new(640, vec![1, 3, 6], replay_rows()).unwrap();
  let model = YoloV8Builder::default().build(engine).unwrap();
  let result = model.infer(&frame).unwrap();

  assert_eq!(result.len(), 1);
  let item = &result.items[0];
  assert_eq!(item.class_id, 62);
  let (cx, cy) = item.center();
  assert!((cx - 640.0).abs() <= 1.0, "cx = {}", cx);
  assert!((cy - 360.0).abs() <= 1.0, "cy = {}", cy);
  assert!((item.width() - 200.0).abs() <= 1.0);
  assert!((item.height() - 200.0).abs() <= 1.0);
}

#[test]
fn all_classes_keeps_non_home_detections_in_order() {
  let frame = RgbImage::new(640, 640);
  let engine = ReplayEngine::new(640, vec![1, 3, 6], replay_rows()).unwrap();
  let model = YoloV8Builder::default()
    .confidence(0.25)
    .home_only(false)
    .build(engine)
    .unwrap();
  let result = model.infer(&frame).unwrap();

  let classes: Vec<i32> = result.iter().map(|d| d.class_id).collect();
  assert_eq!(classes, vec![62, 0]);
  assert_eq!(model.labels().name(0), "person");
  assert_eq!(result.sorted_by_score()[0].class_id, 0);
}

#[test]
fn padded_replay_rows_are_rejected_by_threshold() {
  let frame = RgbImage::new(320, 240);
  let engine = ReplayEngine::new(640, vec![1, 3, 6], replay_rows())
    .unwrap()
    .pad_rows(300)
    .unwrap();
  let model = YoloV8Builder::default().home_only(false).build(engine).unwrap();
  let result = model.infer(&frame).unwrap();
  assert_eq!(result.len(), 2);
}

#[test]
fn heatmap_of_detections_is_idempotent_under_duplicates() {
  let frame = RgbImage::new(1280, 720);
  let engine = ReplayEngine::new(640, vec![1, 3, 6], replay_rows()).unwrap();
  let model = YoloV8Builder::default().build(engine).unwrap();
  let result = model.infer(&frame).unwrap();

  let heatmap = Heatmap::default();
  let once = heatmap.field(1280, 720, result.iter()).unwrap();
  let doubled: Vec<DetectItem> = result.iter().chain(result.iter()).cloned().collect();
  let twice = heatmap.field(1280, 720, doubled.iter()).unwrap();
  assert_eq!(once, twice);

  let image = heatmap.render(1280, 720, result.iter()).unwrap();
  assert_eq!(image.dimensions(), (1280, 720));
  assert!(image.pixels().all(|p| p.0[3].abs_diff(0x66) <= 1));
}

#[cfg(all(feature = "read_image_file", feature = "save_image_file"))]
#[test]
fn one_shot_task_renders_file_to_file() {
  use huoyan::{
    FromUrl,
    input::InputWrapper,
    output::OutputWrapper,
    task::{OneShotTask, Task},
  };

  let dir = tempfile::tempdir().unwrap();
  let input_path = dir.path().join("in.png");
  let output_path = dir.path().join("out/rendered.png");
  RgbImage::from_pixel(1280, 720, Rgb([200, 200, 200]))
    .save(&input_path)
    .unwrap();

  let input = InputWrapper::from_url(
    &url::Url::parse(&format!("image://{}", input_path.display())).unwrap(),
  )
  .unwrap();
  let engine = ReplayEngine::new(640, vec![1, 3, 6], replay_rows()).unwrap();
  let model = YoloV8Builder::default().build(engine).unwrap();
  let output = OutputWrapper::from_url(
    &url::Url::parse(&format!("image://{}?view=both", output_path.display())).unwrap(),
  )
  .unwrap()
  .with_labels(model.labels().clone());

  OneShotTask.run_task(input, model, output).unwrap();

  let rendered = image::open(&output_path).unwrap().to_rgb8();
  assert_eq!(rendered.dimensions(), (1280, 720));
  // 检测框左边缘位于 x = 540
  assert_eq!(rendered.get_pixel(540, 360).0, [0, 255, 0]);
}
