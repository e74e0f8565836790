use log::debug;

use crate::song::note::{NoteId, NoteUpdate, Octave, PitchClass};
use crate::song::timeline::{Timeline, TimelineError};
use crate::time::{snap_to_grid, Beats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
  /// Drags the start of the note.
  Move,
  /// Drags the end of the note, changing its duration.
  Resize,
}

/// Pointer gesture over a single note.
///
/// The snapshot of the dragged field is captured when the gesture starts.
/// Frames while dragging are only written when they fit, and the final commit
/// either lands on the pointer position or goes back to the snapshot.
#[derive(Debug, Clone)]
pub struct NoteGesture {
  id: NoteId,
  kind: GestureKind,
  grid: Beats,
  snapshot: NoteUpdate,
  live: Beats,
}

impl NoteGesture {
  pub fn start(
    timeline: &Timeline,
    id: NoteId,
    kind: GestureKind,
    grid: Beats,
  ) -> Result<NoteGesture, TimelineError> {
    let note = timeline.get(id).ok_or(TimelineError::NotFound { id })?;
    let (snapshot, live) = match kind {
      GestureKind::Move => (NoteUpdate::start(note.start()), note.start()),
      GestureKind::Resize => (NoteUpdate::duration(note.duration()), note.duration()),
    };

    debug!("Gesture {:?} started on {}", kind, id);
    Ok(NoteGesture {
      id,
      kind,
      grid,
      snapshot,
      live,
    })
  }

  /// Click and drag on an empty row: adds a one step note at the snapped
  /// position and keeps dragging its start.
  pub fn create(
    timeline: &mut Timeline,
    octave: Octave,
    pitch_class: PitchClass,
    at: Beats,
    amplitude: f64,
    grid: Beats,
  ) -> Result<NoteGesture, TimelineError> {
    let start = snap_to_grid(at, grid).max(0.0);
    let id = timeline.add_note(octave, pitch_class, start, grid, amplitude)?;
    NoteGesture::start(timeline, id, GestureKind::Move, grid)
  }

  pub fn id(&self) -> NoteId {
    self.id
  }

  pub fn kind(&self) -> GestureKind {
    self.kind
  }

  /// Pointer position of the last frame, snapped, even when it was rejected.
  pub fn live(&self) -> Beats {
    self.live
  }

  /// Returns whether the frame was written into the timeline.
  pub fn preview(&mut self, timeline: &mut Timeline, position: Beats) -> bool {
    self.live = self.snap(position);
    timeline
      .update_note(self.id, self.update(self.live), None)
      .is_ok()
  }

  pub fn commit(self, timeline: &mut Timeline, position: Beats) -> Result<(), TimelineError> {
    let target = self.snap(position);
    debug!("Gesture {:?} on {} ends at {}", self.kind, self.id, target);
    timeline.update_note(self.id, self.update(target), Some(self.snapshot))
  }

  /// Puts the note back to where it was when the gesture started.
  pub fn cancel(self, timeline: &mut Timeline) -> Result<(), TimelineError> {
    timeline.update_note(self.id, self.snapshot, None)
  }

  fn snap(&self, position: Beats) -> Beats {
    let snapped = snap_to_grid(position, self.grid);
    match self.kind {
      GestureKind::Move => snapped.max(0.0),
      GestureKind::Resize => snapped.max(self.grid),
    }
  }

  fn update(&self, value: Beats) -> NoteUpdate {
    match self.kind {
      GestureKind::Move => NoteUpdate::start(value),
      GestureKind::Resize => NoteUpdate::duration(value),
    }
  }
}
