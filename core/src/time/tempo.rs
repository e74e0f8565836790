/// Beats per minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo(u32);

impl Tempo {
  pub fn new(value: u32) -> Tempo {
    Tempo(value)
  }

  pub fn get_value(&self) -> u32 {
    self.0
  }

  pub fn is_valid(&self) -> bool {
    self.0 > 0
  }
}

impl Default for Tempo {
  fn default() -> Tempo {
    Tempo(120)
  }
}
