use failure::Fail;
use log::debug;

use crate::song::note::{Note, NoteId, NoteUpdate, Octave, PitchClass};
use crate::synth::engine::EngineNote;
use crate::time::Beats;

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum TimelineError {
  #[fail(display = "Note [{}, {}) overlaps with {}", start, end, other)]
  Overlap {
    start: Beats,
    end: Beats,
    other: NoteId,
  },

  #[fail(display = "Note {} not found", id)]
  NotFound { id: NoteId },

  #[fail(display = "Invalid note: {}", cause)]
  InvalidNote { cause: String },
}

/// User placed notes plus the gap filled sequence derived from them.
///
/// Every committed mutation keeps the visible notes free of overlaps and
/// rebuilds the playable sequence from scratch.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
  visible: Vec<Note>,
  playable: Vec<Note>,
  selected: Option<NoteId>,
}

impl Timeline {
  pub fn new() -> Timeline {
    Timeline::default()
  }

  pub fn visible(&self) -> &[Note] {
    self.visible.as_slice()
  }

  pub fn playable(&self) -> &[Note] {
    self.playable.as_slice()
  }

  pub fn get(&self, id: NoteId) -> Option<&Note> {
    self.visible.iter().find(|note| note.id() == id)
  }

  pub fn len(&self) -> usize {
    self.visible.len()
  }

  pub fn is_empty(&self) -> bool {
    self.visible.is_empty()
  }

  pub fn selected(&self) -> Option<NoteId> {
    self.selected
  }

  pub fn select_note(&mut self, id: Option<NoteId>) {
    self.selected = id.filter(|id| self.get(*id).is_some());
  }

  /// End of the last note, in beats.
  pub fn end(&self) -> Beats {
    self.visible.iter().map(Note::end).fold(0.0, f64::max)
  }

  pub fn add_note(
    &mut self,
    octave: Octave,
    pitch_class: PitchClass,
    start: Beats,
    duration: Beats,
    amplitude: f64,
  ) -> Result<NoteId, TimelineError> {
    let note = Note::new(octave, pitch_class, start, duration, amplitude);
    self.check_candidate(&note).map_err(|err| {
      debug!("Rejected new note: {}", err);
      err
    })?;

    let id = note.id();
    debug!("Adding {} at [{}, {})", id, note.start(), note.end());
    self.visible.push(note);
    self.refresh();
    Ok(id)
  }

  /// Applies `update` to the note with `id` when the result fits between the
  /// other notes. When it doesn't and a `rollback` is given, the note is
  /// written back with the rollback fields applied instead, as long as that
  /// also fits. Otherwise the note stays as it is.
  pub fn update_note(
    &mut self,
    id: NoteId,
    update: NoteUpdate,
    rollback: Option<NoteUpdate>,
  ) -> Result<(), TimelineError> {
    let index = self.index_of(id)?;
    let current = &self.visible[index];
    let updated = current.with_update(&update);

    match self.check_candidate(&updated) {
      Ok(()) => {
        debug!("Updating {} to [{}, {})", id, updated.start(), updated.end());
        self.visible[index] = updated;
        self.refresh();
        Ok(())
      }
      Err(err) => {
        debug!("Rejected update of {}: {}", id, err);
        if let Some(rollback) = rollback {
          let reverted = current.with_update(&rollback);
          match self.check_candidate(&reverted) {
            Ok(()) => {
              debug!("Reverting {} to [{}, {})", id, reverted.start(), reverted.end());
              self.visible[index] = reverted;
              self.refresh();
            }
            Err(rollback_err) => debug!("Keeping {} as it is: {}", id, rollback_err),
          }
        }
        Err(err)
      }
    }
  }

  pub fn remove_note(&mut self, id: NoteId) {
    let before = self.visible.len();
    self.visible.retain(|note| note.id() != id);
    if self.visible.len() == before {
      return;
    }

    debug!("Removed {}", id);
    if self.selected == Some(id) {
      self.selected = None;
    }
    self.refresh();
  }

  /// Replaces every note at once. All notes must be valid and free of overlaps.
  pub fn replace_notes(&mut self, notes: Vec<Note>) -> Result<(), TimelineError> {
    let mut accepted = Timeline::new();
    for note in notes {
      accepted.check_candidate(&note)?;
      accepted.visible.push(note);
    }
    self.visible = accepted.visible;
    self.selected = None;
    self.refresh();
    Ok(())
  }

  /// Engine facing projection of the playable sequence.
  pub fn engine_notes(&self) -> Vec<EngineNote> {
    self.playable.iter().map(EngineNote::from).collect()
  }

  fn index_of(&self, id: NoteId) -> Result<usize, TimelineError> {
    self
      .visible
      .iter()
      .position(|note| note.id() == id)
      .ok_or(TimelineError::NotFound { id })
  }

  /// Checks `candidate` against every other visible note.
  fn check_candidate(&self, candidate: &Note) -> Result<(), TimelineError> {
    candidate
      .check_fields()
      .map_err(|cause| TimelineError::InvalidNote { cause })?;

    match self
      .visible
      .iter()
      .filter(|note| note.id() != candidate.id())
      .find(|note| note.overlaps(candidate))
    {
      Some(other) => Err(TimelineError::Overlap {
        start: candidate.start(),
        end: candidate.end(),
        other: other.id(),
      }),
      None => Ok(()),
    }
  }

  fn refresh(&mut self) {
    self.playable = fill_gaps(&self.visible);
  }
}

/// Sorts the notes by start and inserts a silence note into every gap between
/// consecutive notes. Less than two notes are returned as they are.
pub fn fill_gaps(notes: &[Note]) -> Vec<Note> {
  if notes.len() < 2 {
    return notes.to_vec();
  }

  let mut sorted = notes.to_vec();
  sorted.sort_by(|a, b| a.start().total_cmp(&b.start()));

  let mut sequence = Vec::with_capacity(sorted.len() * 2);
  let mut iter = sorted.into_iter().peekable();
  while let Some(note) = iter.next() {
    let end = note.end();
    sequence.push(note);
    if let Some(next) = iter.peek() {
      let gap = next.start() - end;
      if gap > 0.0 {
        sequence.push(Note::silence(end, gap));
      }
    }
  }
  sequence
}
