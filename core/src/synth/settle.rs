use std::time::{Duration, Instant};

/// Holds back a value that changes at high frequency until it has been stable
/// for `delay`.
#[derive(Debug, Clone)]
pub struct Settler<T> {
  delay: Duration,
  live: T,
  settled: T,
  changed_at: Option<Instant>,
}

impl<T: Clone + PartialEq> Settler<T> {
  pub fn new(initial: T, delay: Duration) -> Settler<T> {
    Settler {
      delay,
      live: initial.clone(),
      settled: initial,
      changed_at: None,
    }
  }

  pub fn observe(&mut self, value: T, now: Instant) {
    if value != self.live {
      self.live = value;
      self.changed_at = Some(now);
    }
  }

  /// Returns true when the settled value changed.
  pub fn poll(&mut self, now: Instant) -> bool {
    match self.changed_at {
      Some(changed_at) if now.duration_since(changed_at) >= self.delay => {
        self.changed_at = None;
        if self.live != self.settled {
          self.settled = self.live.clone();
          true
        } else {
          false
        }
      }
      _ => false,
    }
  }

  pub fn live(&self) -> &T {
    &self.live
  }

  pub fn settled(&self) -> &T {
    &self.settled
  }

  pub fn is_pending(&self) -> bool {
    self.live != self.settled
  }

  /// When the current value settles if nothing else changes.
  pub fn deadline(&self) -> Option<Instant> {
    self.changed_at.map(|changed_at| changed_at + self.delay)
  }
}
