use log::debug;

use super::host::{FrameRequest, FrameScheduler};
use crate::frame::FrameInfo;

/// Handle to the single outstanding frame request of a running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelToken(FrameRequest);

impl CancelToken {
    pub fn request(&self) -> FrameRequest {
        self.0
    }
}

/// Cooperative frame driver: at most one pending request, re-armed each frame
#[derive(Debug, Default)]
pub struct AnimationLoop {
    pending: Option<FrameRequest>,
    running: bool,
    frames: u64,
    elapsed: f32,
}

impl AnimationLoop {
    /// Request the first frame
    pub fn start<S: FrameScheduler + ?Sized>(scheduler: &mut S) -> Self {
        Self {
            pending: Some(scheduler.request_frame()),
            running: true,
            frames: 0,
            elapsed: 0.0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn token(&self) -> Option<CancelToken> {
        self.pending.map(CancelToken)
    }

    /// Frames whose body was allowed to run
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Claim a delivered frame. Stale, foreign or post-stop requests are refused.
    pub fn accept(&mut self, request: FrameRequest, delta: f32) -> Option<FrameInfo> {
        if !self.running || self.pending != Some(request) {
            debug!("Dropping stale frame {:?}", request);
            return None;
        }
        self.pending = None;
        self.elapsed += delta;
        let info = FrameInfo::new(self.frames, self.elapsed, delta);
        self.frames += 1;
        Some(info)
    }

    /// Queue the next frame; done before the frame body so a failing body cannot end the loop
    pub fn rearm<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) {
        if self.running && self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }

    /// Cancel the pending request. No frame body runs after this returns.
    pub fn stop<S: FrameScheduler + ?Sized>(&mut self, scheduler: &mut S) -> bool {
        if let Some(request) = self.pending.take() {
            scheduler.cancel_frame(request);
        }
        std::mem::replace(&mut self.running, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct QueueScheduler {
        next: u64,
        pending: BTreeSet<FrameRequest>,
    }

    impl FrameScheduler for QueueScheduler {
        fn request_frame(&mut self) -> FrameRequest {
            self.next += 1;
            let request = FrameRequest(self.next);
            self.pending.insert(request);
            request
        }

        fn cancel_frame(&mut self, request: FrameRequest) {
            self.pending.remove(&request);
        }
    }

    impl QueueScheduler {
        fn fire(&mut self) -> Option<FrameRequest> {
            self.pending.pop_first()
        }
    }

    #[test]
    fn test_start_requests_one_frame() {
        let mut scheduler = QueueScheduler::default();
        let animation = AnimationLoop::start(&mut scheduler);
        assert!(animation.is_running());
        assert_eq!(scheduler.pending.len(), 1);
        assert_eq!(animation.token().map(|t| t.request()), scheduler.pending.first().copied());
    }

    #[test]
    fn test_each_frame_rearms_exactly_once() {
        let mut scheduler = QueueScheduler::default();
        let mut animation = AnimationLoop::start(&mut scheduler);

        for n in 0..5 {
            let request = scheduler.fire().unwrap();
            let info = animation.accept(request, 0.016).unwrap();
            assert_eq!(info.number, n);
            animation.rearm(&mut scheduler);
            animation.rearm(&mut scheduler);
            assert_eq!(scheduler.pending.len(), 1);
        }
        assert_eq!(animation.frames(), 5);
    }

    #[test]
    fn test_elapsed_accumulates_delta() {
        let mut scheduler = QueueScheduler::default();
        let mut animation = AnimationLoop::start(&mut scheduler);
        let first = scheduler.fire().unwrap();
        animation.accept(first, 0.5).unwrap();
        animation.rearm(&mut scheduler);
        let second = scheduler.fire().unwrap();
        let info = animation.accept(second, 0.25).unwrap();
        assert_eq!(info.time, 0.75);
        assert_eq!(info.delta, 0.25);
    }

    #[test]
    fn test_stop_cancels_pending_request() {
        let mut scheduler = QueueScheduler::default();
        let mut animation = AnimationLoop::start(&mut scheduler);
        assert!(animation.stop(&mut scheduler));
        assert!(scheduler.pending.is_empty());
        assert!(!animation.stop(&mut scheduler));
    }

    #[test]
    fn test_stale_frame_after_stop_is_refused() {
        let mut scheduler = QueueScheduler::default();
        let mut animation = AnimationLoop::start(&mut scheduler);
        let request = animation.token().unwrap().request();
        animation.stop(&mut scheduler);

        assert!(animation.accept(request, 0.016).is_none());
        animation.rearm(&mut scheduler);
        assert!(scheduler.pending.is_empty());
        assert_eq!(animation.frames(), 0);
    }

    #[test]
    fn test_foreign_request_is_refused() {
        let mut scheduler = QueueScheduler::default();
        let mut animation = AnimationLoop::start(&mut scheduler);
        assert!(animation.accept(FrameRequest(999), 0.016).is_none());
        assert!(animation.token().is_some());
    }
}
