// 该文件是 Huoyan （火眼） 项目的一部分。
// src/task.rs - 推理任务
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

use std::{
  sync::{
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use crate::{model::Model, output::Render};

/// 等待新帧时检查中断标志的间隔
const INTERRUPT_POLL: Duration = Duration::from_millis(100);

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    let now = Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

struct SlotState<T> {
  item: Option<T>,
  closed: bool,
  dropped: usize,
}

/// 只保留最新一帧的单元素信箱
///
/// 生产者 [`offer`](LatestSlot::offer) 时若上一帧尚未被取走，则直接替换并计为丢帧；
/// 消费者 [`take`](LatestSlot::take) 总是拿到最新的帧。关闭后不再接受新帧，
/// 但已放入的帧仍可取出。
pub struct LatestSlot<T> {
  state: Mutex<SlotState<T>>,
  ready: Condvar,
}

impl<T> Default for LatestSlot<T> {
  fn default() -> Self {
    Self {
      state: Mutex::new(SlotState {
        item: None,
        closed: false,
        dropped: 0,
      }),
      ready: Condvar::new(),
    }
  }
}

impl<T> LatestSlot<T> {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, SlotState<T>> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// 放入一帧，返回是否替换掉了未处理的旧帧。关闭后放入的帧被丢弃。
  pub fn offer(&self, item: T) -> bool {
    let mut state = self.lock();
    if state.closed {
      return false;
    }
    let replaced = state.item.replace(item).is_some();
    if replaced {
      state.dropped += 1;
    }
    drop(state);
    self.ready.notify_one();
    replaced
  }

  /// 阻塞直到有新帧；关闭且为空时返回 `None`
  pub fn take(&self) -> Option<T> {
    let state = self.lock();
    let mut state = self
      .ready
      .wait_while(state, |s| s.item.is_none() && !s.closed)
      .unwrap_or_else(PoisonError::into_inner);
    state.item.take()
  }

  /// 与 [`take`](LatestSlot::take) 相同，但最多等待 `timeout`
  pub fn take_timeout(&self, timeout: Duration) -> Option<T> {
    let state = self.lock();
    let (mut state, _) = self
      .ready
      .wait_timeout_while(state, timeout, |s| s.item.is_none() && !s.closed)
      .unwrap_or_else(PoisonError::into_inner);
    state.item.take()
  }

  pub fn close(&self) {
    self.lock().closed = true;
    self.ready.notify_all();
  }

  pub fn is_closed(&self) -> bool {
    self.lock().closed
  }

  /// 被新帧替换掉的帧数
  pub fn dropped(&self) -> usize {
    self.lock().dropped
  }
}

/// 流式任务：输入在独立线程中读取，推理线程只处理最新一帧，忙时到达的帧被丢弃
#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  interrupt: Option<Arc<AtomicBool>>,
}

impl ContinuousTask {
  /// 处理指定帧数后退出
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 外部中断标志，置位后任务尽快退出
  pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .map(|flag| flag.load(Ordering::Relaxed))
      .unwrap_or(false)
  }
}

impl<
  F: Send,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F> + Send,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let slot = LatestSlot::new();
    let interrupt = self.interrupt.clone();

    let processed = thread::scope(|scope| {
      let slot = &slot;
      let producer = scope.spawn(move || {
        let mut received = 0usize;
        for frame in input {
          let stop = interrupt
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false);
          if stop || slot.is_closed() {
            break;
          }
          received += 1;
          if slot.offer(frame) {
            debug!("推理繁忙，丢弃旧帧");
          }
        }
        slot.close();
        received
      });

      let mut frame_index = 0usize;
      loop {
        if self.interrupted() {
          warn!("中断信号接收，退出任务循环");
          break;
        }
        let Some(frame) = slot.take_timeout(INTERRUPT_POLL) else {
          if slot.is_closed() {
            break;
          }
          continue;
        };

        frame_index += 1;
        info!("处理第 {} 帧图像", frame_index);
        let now = Instant::now();
        match model.infer(&frame) {
          Ok(result) => {
            let elapsed_a = now.elapsed();
            if let Err(e) = output.render_result(&frame, &result) {
              error!("第 {} 帧渲染失败: {}", frame_index, e);
            }
            info!(
              "推理完成，耗时: {:.2?} / {:.2?}",
              elapsed_a,
              now.elapsed()
            );
          }
          Err(e) => error!("第 {} 帧推理失败: {}", frame_index, e),
        }

        if self.frame_number.is_some_and(|n| frame_index >= n) {
          info!("达到指定帧数 {}, 退出任务循环", frame_index);
          break;
        }
      }
      slot.close();

      match producer.join() {
        Ok(received) => debug!("输入线程结束，共读取 {} 帧", received),
        Err(_) => error!("输入线程异常退出"),
      }
      frame_index
    });

    info!(
      "任务完成，处理 {} 帧，丢弃 {} 帧",
      processed,
      slot.dropped()
    );
    Ok(())
  }
}
