//! Token-based cancellable timers. Arming spawns a sleep task that posts a
//! `TimerFired` event back into the owning room's channel; cancellation just
//! invalidates the token, so a late fire is a no-op at the handler.

use super::RoomEvent;
use crate::types::SessionId;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;

pub const START_GAME_DELAY: Duration = Duration::from_millis(500);
pub const WORD_PICK_TIMEOUT: Duration = Duration::from_secs(15);
pub const DRAW_TICK: Duration = Duration::from_secs(1);
pub const HINT_INTERVAL: Duration = Duration::from_secs(20);
pub const ROUND_END_DELAY: Duration = Duration::from_secs(5);
pub const RECONNECT_GRACE: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// 500ms pause between the host's start command and the first round
    StartDelay,
    /// 15s auto-pick while the drawer dawdles over word choices
    WordAutoPick,
    /// 1s countdown tick during the drawing phase
    DrawTick,
    /// 20s interval revealing one hint letter
    HintReveal,
    /// 5s pause on round-end before advancing
    RoundAdvance,
    /// 20s reconnection window after an unconsented disconnect
    Grace(SessionId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerToken {
    pub kind: TimerKind,
    seq: u64,
}

pub struct Timers {
    events: mpsc::UnboundedSender<RoomEvent>,
    next_seq: u64,
    armed: HashMap<TimerKind, u64>,
}

impl Timers {
    pub fn new(events: mpsc::UnboundedSender<RoomEvent>) -> Self {
        Self {
            events,
            next_seq: 0,
            armed: HashMap::new(),
        }
    }

    /// Arm (or re-arm) a timer of the given kind. A previously armed timer of
    /// the same kind is implicitly cancelled: its token goes stale.
    pub fn arm(&mut self, kind: TimerKind, delay: Duration) {
        self.next_seq += 1;
        self.armed.insert(kind.clone(), self.next_seq);
        let token = TimerToken {
            kind,
            seq: self.next_seq,
        };
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(RoomEvent::TimerFired(token));
        });
    }

    pub fn cancel(&mut self, kind: &TimerKind) {
        self.armed.remove(kind);
    }

    /// Cancel the word-select / drawing timers (auto-pick, tick, hint reveal)
    /// and any pending round advance.
    pub fn cancel_round_timers(&mut self) {
        self.cancel(&TimerKind::WordAutoPick);
        self.cancel(&TimerKind::DrawTick);
        self.cancel(&TimerKind::HintReveal);
        self.cancel(&TimerKind::RoundAdvance);
    }

    pub fn cancel_all(&mut self) {
        self.armed.clear();
    }

    /// Validate a fired token against the currently armed set. A valid token
    /// is consumed; recurring timers re-arm from their handler. Stale tokens
    /// (cancelled or superseded) return false.
    pub fn accept(&mut self, token: &TimerToken) -> bool {
        if self.armed.get(&token.kind) == Some(&token.seq) {
            self.armed.remove(&token.kind);
            true
        } else {
            false
        }
    }

    /// The token a fire of `kind` would currently have to carry. Exposed so
    /// tests can synthesize timer expirations without sleeping.
    pub fn current(&self, kind: &TimerKind) -> Option<TimerToken> {
        self.armed.get(kind).map(|&seq| TimerToken {
            kind: kind.clone(),
            seq,
        })
    }

    pub fn is_armed(&self, kind: &TimerKind) -> bool {
        self.armed.contains_key(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stale_token_is_rejected_after_rearm() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::DrawTick, Duration::from_secs(60));
        let first = timers.current(&TimerKind::DrawTick).unwrap();

        timers.arm(TimerKind::DrawTick, Duration::from_secs(60));
        let second = timers.current(&TimerKind::DrawTick).unwrap();

        assert!(!timers.accept(&first));
        assert!(timers.accept(&second));
        // consumed: a second delivery of the same token is also stale
        assert!(!timers.accept(&second));
    }

    #[tokio::test]
    async fn cancelled_token_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::WordAutoPick, Duration::from_secs(60));
        let token = timers.current(&TimerKind::WordAutoPick).unwrap();
        timers.cancel(&TimerKind::WordAutoPick);
        assert!(!timers.accept(&token));
    }

    #[tokio::test]
    async fn fired_timer_posts_back_into_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::StartDelay, Duration::from_millis(1));
        match rx.recv().await {
            Some(RoomEvent::TimerFired(token)) => {
                assert_eq!(token.kind, TimerKind::StartDelay);
                assert!(timers.accept(&token));
            }
            other => panic!("expected TimerFired, got {:?}", other.is_some()),
        }
    }

    #[tokio::test]
    async fn grace_timers_are_tracked_per_session() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut timers = Timers::new(tx);

        timers.arm(TimerKind::Grace("alice".into()), RECONNECT_GRACE);
        timers.arm(TimerKind::Grace("bob".into()), RECONNECT_GRACE);

        let alice = timers.current(&TimerKind::Grace("alice".into())).unwrap();
        timers.cancel(&TimerKind::Grace("bob".into()));

        assert!(timers.accept(&alice));
        assert!(!timers.is_armed(&TimerKind::Grace("bob".into())));
    }
}
