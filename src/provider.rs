//! 姿勢推定・セグメンテーションとの境界
//!
//! 検出器本体は外部に置き、セッションはこのトレイト越しにフレームと
//! マスクを受け取る。マスクは非同期に届くので、毎フレーム no-op waker で
//! 一度だけポーリングし、未完了なら前回のマスクを使う。

use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use log::debug;

use crate::mask::SegMask;
use crate::pose::PoseFrame;
use crate::session::{Session, SessionEvent};

pub type MaskFuture = BoxFuture<'static, Option<SegMask>>;

pub trait PoseProvider {
    fn next_frame(&mut self) -> Option<PoseFrame>;
}

impl<I> PoseProvider for I
where
    I: Iterator<Item = PoseFrame>,
{
    fn next_frame(&mut self) -> Option<PoseFrame> {
        self.next()
    }
}

pub trait MaskProvider<F> {
    fn request_mask(&mut self, frame: &F) -> MaskFuture;
}

impl<F, G> MaskProvider<F> for G
where
    G: FnMut(&F) -> MaskFuture,
{
    fn request_mask(&mut self, frame: &F) -> MaskFuture {
        self(frame)
    }
}

/// 最新のマスクと未完了のリクエスト
///
/// 新しいリクエストは古い未完了のものを置き換える。
#[derive(Default)]
pub struct MaskSlot {
    pending: Option<MaskFuture>,
    latest: Option<SegMask>,
}

impl MaskSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 置き換える前に、古いリクエストが完了していれば回収する
    pub fn request(&mut self, future: MaskFuture) {
        self.poll_pending();
        if self.pending.is_some() {
            debug!("mask request superseded");
        }
        self.pending = Some(future);
    }

    /// 未完了でもブロックしない
    pub fn poll(&mut self) -> Option<&SegMask> {
        self.poll_pending();
        self.latest.as_ref()
    }

    fn poll_pending(&mut self) {
        let Some(future) = self.pending.as_mut() else {
            return;
        };
        let mut cx = Context::from_waker(noop_waker_ref());
        if let Poll::Ready(mask) = future.poll_unpin(&mut cx) {
            self.pending = None;
            // None は前回のマスクを維持
            if let Some(mask) = mask {
                self.latest = Some(mask);
            }
        }
    }

    pub fn latest(&self) -> Option<&SegMask> {
        self.latest.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.pending = None;
        self.latest = None;
    }
}

/// 1フレーム分: マスクを要求し、手元の最新マスクでセッションを進める
pub fn step_frame<M>(session: &mut Session, frame: &PoseFrame, masks: &mut M, slot: &mut MaskSlot) -> Vec<SessionEvent>
where
    M: MaskProvider<PoseFrame>,
{
    slot.request(masks.request_mask(frame));
    let mask = slot.poll();
    session.on_frame(frame, mask)
}

/// フレームが尽きるかDoneに達するまで進める
pub fn drive<P, M>(session: &mut Session, poses: &mut P, masks: &mut M) -> Vec<SessionEvent>
where
    P: PoseProvider,
    M: MaskProvider<PoseFrame>,
{
    let mut slot = MaskSlot::new();
    let mut events = Vec::new();
    while let Some(frame) = poses.next_frame() {
        events.extend(step_frame(session, &frame, masks, &mut slot));
        if session.is_complete() {
            break;
        }
    }
    events
}
