//! Per-request playback session: a small state machine driven by a timer.
//!
//! `Session::tick` emits one frame into a `FrameSink`; `Session::cancel` ends
//! the session when the consumer goes away. Both are no-ops once the session
//! is `Closed` or `Errored`. The timer lives in [`drive`], which owns it for
//! exactly as long as the session is running.

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace, warn};

use crate::color::{RandomSource, XorShift64};
use crate::error::{Result, StreamError};
use crate::streamer::{FrameStreamer, Streamer};

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Created, no tick has fired yet.
    Idle,
    Running,
    /// Ended by cancellation or by finishing a one-pass playback.
    Closed,
    /// Ended by a failed emission.
    Errored,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Errored)
    }
}

/// Destination of rendered frame chunks (the response body).
pub trait FrameSink {
    /// Whether the consumer has gone away.
    fn is_closed(&self) -> bool;
    /// Deliver one chunk. `Err(StreamError::Disconnected)` means the consumer
    /// left; any other error is a failed emission.
    fn emit(&mut self, chunk: Bytes) -> Result<()>;
    /// End the output normally.
    fn close(&mut self);
    /// End the output with an error.
    fn fail(&mut self, err: StreamError);
}

pub struct Session<K, R = XorShift64> {
    streamer: FrameStreamer<R>,
    sink: K,
    state: SessionState,
}

impl<K: FrameSink, R: RandomSource> Session<K, R> {
    pub fn new(streamer: FrameStreamer<R>, sink: K) -> Self {
        Session {
            streamer,
            sink,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn streamer(&self) -> &FrameStreamer<R> {
        &self.streamer
    }

    /// Emit the next frame. A one-pass session closes right after its last
    /// frame, so no tick after that can emit.
    pub fn tick(&mut self) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.sink.is_closed() {
            return self.cancel();
        }
        self.state = SessionState::Running;

        let Some(rendered) = self.streamer.next() else {
            return self.finish(SessionState::Closed);
        };
        trace!(index = rendered.index, color = ?rendered.color, "emitting frame");
        match self.sink.emit(rendered.into_bytes()) {
            Ok(()) if self.streamer.is_finished() => self.finish(SessionState::Closed),
            Ok(()) => self.state,
            Err(StreamError::Disconnected) => self.cancel(),
            Err(err) => {
                warn!(error = %err, "stream failed");
                self.state = SessionState::Errored;
                self.sink.fail(err);
                self.state
            }
        }
    }

    /// Stop the session because the consumer went away.
    pub fn cancel(&mut self) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }
        debug!(emitted = self.streamer.emitted(), "client went away, closing stream");
        self.finish(SessionState::Closed)
    }

    fn finish(&mut self, state: SessionState) -> SessionState {
        self.state = state;
        self.sink.close();
        state
    }
}

/// Sink feeding a bounded channel whose receiver becomes the response body.
///
/// One slot is always kept free so a failure can still be delivered when the
/// consumer has stopped draining.
pub struct ChannelSink {
    tx: Option<mpsc::Sender<Result<Bytes>>>,
}

/// Create a sink and the receiving end of its channel. `capacity` is clamped
/// to at least 2: one frame plus the reserved error slot.
pub fn channel(capacity: usize) -> (ChannelSink, mpsc::Receiver<Result<Bytes>>) {
    let (tx, rx) = mpsc::channel(capacity.max(2));
    (ChannelSink { tx: Some(tx) }, rx)
}

impl ChannelSink {
    /// Resolves once the receiver has been dropped, or immediately if this
    /// sink was already closed.
    pub async fn closed(&self) {
        if let Some(tx) = &self.tx {
            tx.closed().await;
        }
    }
}

impl FrameSink for ChannelSink {
    fn is_closed(&self) -> bool {
        self.tx.as_ref().map_or(true, |tx| tx.is_closed())
    }

    fn emit(&mut self, chunk: Bytes) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(StreamError::Disconnected)?;
        if tx.is_closed() {
            return Err(StreamError::Disconnected);
        }
        if tx.capacity() < 2 {
            return Err(StreamError::Emission(
                "client is not reading the stream".to_string(),
            ));
        }
        tx.try_send(Ok(chunk)).map_err(|e| match e {
            TrySendError::Closed(_) => StreamError::Disconnected,
            TrySendError::Full(_) => {
                StreamError::Emission("client is not reading the stream".to_string())
            }
        })
    }

    fn close(&mut self) {
        self.tx = None;
    }

    fn fail(&mut self, err: StreamError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.try_send(Err(err));
        }
    }
}

/// Run a session on a fixed-period timer until it reaches a terminal state.
///
/// The first tick fires one `period` after the call. Cancellation is observed
/// between ticks as soon as the receiver is dropped; the timer is dropped with
/// this future.
pub async fn drive<R: RandomSource>(
    mut session: Session<ChannelSink, R>,
    period: Duration,
) -> SessionState {
    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        let state = tokio::select! {
            _ = session.sink().closed() => session.cancel(),
            _ = ticker.tick() => session.tick(),
        };
        if state.is_terminal() {
            debug!(?state, emitted = session.streamer().emitted(), "session ended");
            return state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoopMode, StreamConfig};
    use crate::frame::Frame;
    use crate::streamer::CLEAR_SCREEN;

    /// Records everything written to it; can be closed from the outside.
    #[derive(Default)]
    struct RecordingSink {
        chunks: Vec<String>,
        closed: bool,
        failed: Option<String>,
        consumer_gone: bool,
        fail_on: Option<usize>,
    }

    impl FrameSink for RecordingSink {
        fn is_closed(&self) -> bool {
            self.consumer_gone
        }

        fn emit(&mut self, chunk: Bytes) -> Result<()> {
            if self.fail_on == Some(self.chunks.len()) {
                return Err(StreamError::Emission("write failed".to_string()));
            }
            self.chunks.push(String::from_utf8(chunk.to_vec()).unwrap());
            Ok(())
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn fail(&mut self, err: StreamError) {
            self.failed = Some(err.to_string());
        }
    }

    fn streamer(texts: &[&str], loop_mode: LoopMode) -> FrameStreamer {
        let config = StreamConfig {
            loop_mode,
            colorize: false,
            ..StreamConfig::default()
        };
        let frames = texts.iter().map(|&t| Frame::from(t)).collect();
        FrameStreamer::new(frames, false, &config, XorShift64::new(11)).unwrap()
    }

    fn bodies(sink: &RecordingSink) -> Vec<String> {
        sink.chunks
            .iter()
            .map(|c| c.trim_start_matches(CLEAR_SCREEN).trim_end_matches('\n').to_string())
            .collect()
    }

    #[test]
    fn starts_idle_and_runs_on_first_tick() {
        let mut session = Session::new(streamer(&["A"], LoopMode::Loop), RecordingSink::default());
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.tick(), SessionState::Running);
    }

    #[test]
    fn looping_emits_in_cursor_order() {
        let mut session = Session::new(
            streamer(&["A", "B", "C"], LoopMode::Loop),
            RecordingSink::default(),
        );
        for _ in 0..7 {
            session.tick();
        }
        assert_eq!(bodies(session.sink()), vec!["A", "B", "C", "A", "B", "C", "A"]);
        assert!(!session.sink().closed);
    }

    #[test]
    fn one_pass_closes_after_last_frame() {
        let mut session = Session::new(
            streamer(&["A", "B", "C", "D"], LoopMode::Once),
            RecordingSink::default(),
        );
        let states: Vec<SessionState> = (0..6).map(|_| session.tick()).collect();
        assert_eq!(states[2], SessionState::Running);
        assert_eq!(states[3], SessionState::Closed);
        assert_eq!(bodies(session.sink()), vec!["A", "B", "C", "D"]);
        assert!(session.sink().closed);
    }

    #[test]
    fn cancel_at_every_tick_stops_emission() {
        for k in 0..3 {
            let mut session = Session::new(
                streamer(&["A", "B", "C"], LoopMode::Loop),
                RecordingSink::default(),
            );
            for _ in 0..k {
                session.tick();
            }
            assert_eq!(session.cancel(), SessionState::Closed);
            for _ in 0..5 {
                assert_eq!(session.tick(), SessionState::Closed);
            }
            assert_eq!(session.sink().chunks.len(), k);
            assert!(session.sink().closed);
        }
    }

    #[test]
    fn consumer_leaving_is_observed_before_emitting() {
        let mut session = Session::new(
            streamer(&["A", "B"], LoopMode::Loop),
            RecordingSink::default(),
        );
        session.tick();
        session.sink.consumer_gone = true;
        assert_eq!(session.tick(), SessionState::Closed);
        assert_eq!(session.sink().chunks.len(), 1);
        assert!(session.sink().failed.is_none());
    }

    #[test]
    fn failed_emission_errors_the_sink() {
        let sink = RecordingSink {
            fail_on: Some(2),
            ..RecordingSink::default()
        };
        let mut session = Session::new(streamer(&["A", "B"], LoopMode::Loop), sink);
        session.tick();
        session.tick();
        assert_eq!(session.tick(), SessionState::Errored);
        assert_eq!(session.tick(), SessionState::Errored);
        assert_eq!(session.sink().chunks.len(), 2);
        assert_eq!(session.sink().failed.as_deref(), Some("Stream error: write failed"));
        assert!(!session.sink().closed);
    }

    #[test]
    fn channel_sink_reports_dropped_receiver() {
        let (mut sink, rx) = channel(4);
        assert!(!sink.is_closed());
        drop(rx);
        assert!(sink.is_closed());
        assert!(matches!(sink.emit(Bytes::from_static(b"x")), Err(StreamError::Disconnected)));
    }

    #[test]
    fn channel_sink_keeps_a_slot_for_the_error() {
        let (mut sink, mut rx) = channel(3);
        sink.emit(Bytes::from_static(b"1")).unwrap();
        sink.emit(Bytes::from_static(b"2")).unwrap();
        let err = sink.emit(Bytes::from_static(b"3")).unwrap_err();
        assert!(matches!(err, StreamError::Emission(_)));
        sink.fail(err);
        assert_eq!(rx.try_recv().unwrap().unwrap(), Bytes::from_static(b"1"));
        assert_eq!(rx.try_recv().unwrap().unwrap(), Bytes::from_static(b"2"));
        assert!(rx.try_recv().unwrap().is_err());
        assert!(sink.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn driver_ticks_at_the_configured_period() {
        let (sink, mut rx) = channel(16);
        let session = Session::new(streamer(&["A", "B"], LoopMode::Loop), sink);
        let start = Instant::now();
        let handle = tokio::spawn(drive(session, Duration::from_millis(70)));

        let mut texts = Vec::new();
        for _ in 0..5 {
            let chunk = rx.recv().await.unwrap().unwrap();
            texts.push(String::from_utf8(chunk.to_vec()).unwrap());
        }
        assert!(start.elapsed() >= Duration::from_millis(350));
        let bodies: Vec<&str> = texts
            .iter()
            .map(|t| t.trim_start_matches(CLEAR_SCREEN).trim_end_matches('\n'))
            .collect();
        assert_eq!(bodies, vec!["A", "B", "A", "B", "A"]);

        drop(rx);
        assert_eq!(handle.await.unwrap(), SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_stops_when_receiver_dropped_between_ticks() {
        let (sink, mut rx) = channel(16);
        let session = Session::new(streamer(&["A", "B", "C"], LoopMode::Loop), sink);
        let handle = tokio::spawn(drive(session, Duration::from_millis(70)));

        rx.recv().await.unwrap().unwrap();
        drop(rx);
        let state = tokio::time::timeout(Duration::from_millis(10), handle)
            .await
            .expect("driver should stop before the next tick")
            .unwrap();
        assert_eq!(state, SessionState::Closed);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_closes_one_pass_stream() {
        let (sink, mut rx) = channel(16);
        let session = Session::new(streamer(&["A", "B", "C", "D"], LoopMode::Once), sink);
        let handle = tokio::spawn(drive(session, Duration::from_millis(70)));

        let mut count = 0;
        while let Some(chunk) = rx.recv().await {
            chunk.unwrap();
            count += 1;
        }
        assert_eq!(count, 4);
        assert_eq!(handle.await.unwrap(), SessionState::Closed);
    }
}
