//! Event-driven input over a crossbeam channel and a wall clock.
//!
//! Anything that produces participant input (a UI thread, a simulated
//! participant, the Ctrl-C handler) holds an [`InputSender`]; the session
//! blocks on the receiving end instead of polling.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::experiment::io::{Clock, InputEvent, InputSource};

pub type InputSender = Sender<InputEvent>;

pub fn input_channel() -> (InputSender, ChannelInput) {
    let (tx, rx) = unbounded();
    (tx, ChannelInput { rx })
}

#[derive(Debug)]
pub struct ChannelInput {
    rx: Receiver<InputEvent>,
}

impl InputSource for ChannelInput {
    fn wait_event(&mut self, timeout: Option<Duration>) -> Option<InputEvent> {
        match timeout {
            None => self.rx.recv().ok(),
            Some(t) => match self.rx.recv_timeout(t) {
                Ok(ev) => Some(ev),
                Err(RecvTimeoutError::Timeout) => None,
                // Every producer is gone; timed holds still last their full length.
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(t);
                    None
                }
            },
        }
    }
}

/// Monotonic clock started at construction. Copies share the same origin,
/// so producers can stamp events on the session's time base.
#[derive(Clone, Copy, Debug)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for WallClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::layout::ScreenPos;

    #[test]
    fn timed_wait_elapses_without_events() {
        let (_tx, mut input) = input_channel();
        assert_eq!(input.wait_event(Some(Duration::from_millis(5))), None);
    }

    #[test]
    fn events_arrive_in_order() {
        let (tx, mut input) = input_channel();
        tx.send(InputEvent::Continue).unwrap();
        tx.send(InputEvent::Select {
            pos: ScreenPos::new(1.0, 2.0),
            time: Duration::from_millis(3),
        })
        .unwrap();
        assert_eq!(input.wait_event(None), Some(InputEvent::Continue));
        assert!(matches!(
            input.wait_event(Some(Duration::from_secs(1))),
            Some(InputEvent::Select { .. })
        ));
    }

    #[test]
    fn untimed_wait_ends_when_senders_drop() {
        let (tx, mut input) = input_channel();
        drop(tx);
        assert_eq!(input.wait_event(None), None);
    }

    #[test]
    fn wall_clock_advances() {
        let clock = WallClock::start();
        let a = clock.now();
        std::thread::sleep(Duration::from_millis(2));
        assert!(clock.now() > a);
    }
}
