//! Portable JSON form of a song.
//!
//! ```json
//! {
//!   "bpm": 120,
//!   "control_points": [0.5, -0.5, 0.0, 0.0],
//!   "notes": [{"id": 9, "beats": 1.0, "octave": 4, "amplitude": 0.8}],
//!   "_x": [0.25, 0.75]
//! }
//! ```
//!
//! `control_points` holds the normalized y of control A, control B, end and
//! start, in that order. `_x` holds the normalized x of both control points.
//! Documents without them only carry tempo and notes.

use failure::Fail;
use log::{debug, info};
use serde_derive::{Deserialize, Serialize};

use crate::song::note::{Note, Octave, PitchClass, PITCH_CLASSES};
use crate::song::Song;
use crate::synth::engine::EngineNote;
use crate::wave::{NormalizedCurve, NormalizedPoint};

/// Bytes to be saved by the host under a suggested file name.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedBuffer {
  pub name: String,
  pub bytes: Vec<u8>,
}

#[derive(Debug, Fail, Clone, PartialEq)]
pub enum InterchangeError {
  #[fail(display = "Malformed interchange input: {}", cause)]
  Malformed { cause: String },

  #[fail(display = "Failed to encode the song: {}", cause)]
  Encode { cause: String },
}

fn malformed<T: Into<String>>(cause: T) -> InterchangeError {
  InterchangeError::Malformed {
    cause: cause.into(),
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterchangeNote {
  #[serde(rename = "id")]
  pub pitch: PitchClass,
  pub beats: f64,
  pub octave: Octave,
  pub amplitude: f64,
}

impl<'a> From<&'a EngineNote> for InterchangeNote {
  fn from(note: &'a EngineNote) -> Self {
    InterchangeNote {
      pitch: note.pitch,
      beats: note.beats,
      octave: note.octave,
      amplitude: note.amplitude,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
  pub bpm: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub control_points: Option<[f64; 4]>,
  pub notes: Vec<InterchangeNote>,
  #[serde(rename = "_x", default, skip_serializing_if = "Option::is_none")]
  pub x: Option<[f64; 2]>,
}

impl Document {
  pub fn from_song(song: &Song) -> Document {
    let parameters = song.generate_parameters();
    let curve = song.curve().normalized();
    Document {
      bpm: parameters.bpm,
      control_points: Some([
        curve.control_a.y,
        curve.control_b.y,
        curve.end_y,
        curve.start_y,
      ]),
      notes: parameters.notes.iter().map(InterchangeNote::from).collect(),
      x: Some([curve.control_a.x, curve.control_b.x]),
    }
  }

  pub fn validate(&self) -> Result<(), InterchangeError> {
    if self.bpm == 0 {
      return Err(malformed("bpm must be greater than 0"));
    }

    for (index, note) in self.notes.iter().enumerate() {
      if note.pitch >= PITCH_CLASSES {
        return Err(malformed(format!(
          "note {}: id {} must be between 0 and 11",
          index, note.pitch
        )));
      }
      if !note.beats.is_finite() || note.beats <= 0.0 {
        return Err(malformed(format!(
          "note {}: beats {} must be greater than 0",
          index, note.beats
        )));
      }
      if !(0.0..=1.0).contains(&note.amplitude) {
        return Err(malformed(format!(
          "note {}: amplitude {} must be between 0.0 and 1.0",
          index, note.amplitude
        )));
      }
    }

    if let Some(control_points) = self.control_points {
      if let Some(y) = control_points.iter().find(|y| !(-1.0..=1.0).contains(*y)) {
        return Err(malformed(format!(
          "control point {} must be between -1.0 and 1.0",
          y
        )));
      }
    }

    if let Some(x) = self.x {
      if let Some(x) = x.iter().find(|x| !(0.0..=1.0).contains(*x)) {
        return Err(malformed(format!(
          "control point x {} must be between 0.0 and 1.0",
          x
        )));
      }
    }

    Ok(())
  }

  /// Curve described by the document, taking missing x values from `current`.
  pub fn curve(&self, current: &NormalizedCurve) -> Option<NormalizedCurve> {
    self.control_points.map(|[a_y, b_y, end_y, start_y]| {
      let [a_x, b_x] = self
        .x
        .unwrap_or([current.control_a.x, current.control_b.x]);
      NormalizedCurve {
        start_y,
        control_a: NormalizedPoint::new(a_x, a_y),
        control_b: NormalizedPoint::new(b_x, b_y),
        end_y,
      }
    })
  }

  /// Lays the notes back to back from beat 0. Silent notes only move the cursor.
  pub fn timeline_notes(&self) -> Vec<Note> {
    let mut cursor = 0.0;
    let mut notes = Vec::with_capacity(self.notes.len());
    for note in &self.notes {
      if note.amplitude > 0.0 {
        notes.push(Note::new(
          note.octave,
          note.pitch,
          cursor,
          note.beats,
          note.amplitude,
        ));
      }
      cursor += note.beats;
    }
    notes
  }
}

pub fn decode(bytes: &[u8]) -> Result<Document, InterchangeError> {
  let document: Document =
    serde_json::from_slice(bytes).map_err(|err| malformed(err.to_string()))?;
  document.validate()?;
  Ok(document)
}

pub fn encode(song: &Song) -> Result<Vec<u8>, InterchangeError> {
  serde_json::to_vec(&Document::from_song(song)).map_err(|err| InterchangeError::Encode {
    cause: err.to_string(),
  })
}

pub fn export_name(bpm: u32, unix_millis: u128) -> String {
  format!("orchestrator_{}bpm_{}.json", bpm, unix_millis)
}

pub fn export(song: &Song, unix_millis: u128) -> Result<NamedBuffer, InterchangeError> {
  let bytes = encode(song)?;
  let name = export_name(song.bpm(), unix_millis);
  info!("Exported {} ({} bytes)", name, bytes.len());
  Ok(NamedBuffer { name, bytes })
}

/// Applies a document to the song. Nothing changes unless all of it applies.
pub fn import(song: &mut Song, bytes: &[u8]) -> Result<(), InterchangeError> {
  let document = decode(bytes)?;

  let mut imported = song.clone();
  imported
    .set_bpm(document.bpm)
    .map_err(|err| malformed(err.to_string()))?;
  imported
    .timeline_mut()
    .replace_notes(document.timeline_notes())
    .map_err(|err| malformed(err.to_string()))?;

  match document.curve(&song.curve().normalized()) {
    Some(curve) => imported.curve_mut().apply_normalized(&curve),
    None => debug!("No curve in the document, keeping the current one"),
  }

  info!(
    "Imported {} notes at {} bpm",
    imported.timeline().len(),
    imported.bpm()
  );
  *song = imported;
  Ok(())
}

#[cfg(test)]
mod test {

  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::{decode, export, export_name, import, Document, InterchangeError, InterchangeNote};
  use crate::song::Song;
  use crate::wave::{CurvePoint, Point};

  fn song() -> Song {
    let mut song = Song::default();
    song.curve_mut().move_point(CurvePoint::ControlA, 100.0, 100.0);
    song.curve_mut().move_point(CurvePoint::ControlB, 300.0, 300.0);
    song.timeline_mut().add_note(4, 9, 0.0, 1.0, 0.8).unwrap();
    song.timeline_mut().add_note(5, 2, 2.0, 0.5, 1.0).unwrap();
    song
  }

  fn is_malformed(result: Result<(), InterchangeError>) -> bool {
    match result {
      Err(InterchangeError::Malformed { .. }) => true,
      _ => false,
    }
  }

  #[test]
  pub fn export_document() {
    let buffer = export(&song(), 1_700_000_000_000).unwrap();
    assert_eq!(buffer.name, "orchestrator_120bpm_1700000000000.json");

    let value: serde_json::Value = serde_json::from_slice(&buffer.bytes).unwrap();
    assert_eq!(
      value,
      json!({
        "bpm": 120,
        "control_points": [0.5, -0.5, 0.0, 0.0],
        "notes": [
          {"id": 9, "beats": 1.0, "octave": 4, "amplitude": 0.8},
          {"id": 0, "beats": 1.0, "octave": 0, "amplitude": 0.0},
          {"id": 2, "beats": 0.5, "octave": 5, "amplitude": 1.0}
        ],
        "_x": [0.25, 0.75]
      })
    );
  }

  #[test]
  pub fn export_key_order() {
    let buffer = export(&Song::default(), 0).unwrap();
    let text = String::from_utf8(buffer.bytes).unwrap();
    let positions: Vec<usize> = ["\"bpm\"", "\"control_points\"", "\"notes\"", "\"_x\""]
      .iter()
      .map(|key| text.find(key).unwrap())
      .collect();
    let mut sorted = positions.clone();
    sorted.sort();
    assert_eq!(positions, sorted);
  }

  #[test]
  /// Tempo and notes only, the curve stays as it was
  pub fn import_partial_document() {
    let mut song = song();
    let curve_before = song.curve().clone();

    import(&mut song, br#"{"bpm":100,"notes":[]}"#).unwrap();

    assert_eq!(song.bpm(), 100);
    assert!(song.timeline().is_empty());
    assert_eq!(song.curve(), &curve_before);
  }

  #[test]
  pub fn import_full_document() {
    let mut song = Song::default();
    let document = br#"{
      "bpm": 90,
      "control_points": [1.0, -1.0, 0.5, -0.5],
      "notes": [
        {"id": 4, "beats": 2.0, "octave": 3, "amplitude": 0.5},
        {"id": 0, "beats": 1.0, "octave": 0, "amplitude": 0.0},
        {"id": 11, "beats": 0.5, "octave": 6, "amplitude": 1.0}
      ],
      "_x": [0.25, 0.5]
    }"#;
    import(&mut song, document).unwrap();

    assert_eq!(song.bpm(), 90);
    let curve = song.curve();
    assert_eq!(curve.point(CurvePoint::ControlA), Point::new(100.0, 0.0));
    assert_eq!(curve.point(CurvePoint::ControlB), Point::new(200.0, 400.0));
    assert_eq!(curve.point(CurvePoint::End), Point::new(400.0, 100.0));
    assert_eq!(curve.point(CurvePoint::Start), Point::new(0.0, 300.0));

    let visible = song.timeline().visible();
    assert_eq!(visible.len(), 2);
    assert_eq!((visible[0].start(), visible[0].duration()), (0.0, 2.0));
    assert_eq!(visible[0].pitch_class(), 4);
    assert_eq!((visible[1].start(), visible[1].duration()), (3.0, 0.5));
    assert_eq!(visible[1].octave(), 6);
    assert_eq!(song.timeline().playable().len(), 3);
  }

  #[test]
  /// Exporting then importing keeps what the engine gets
  pub fn import_exported_song() {
    let original = song();
    let buffer = export(&original, 0).unwrap();

    let mut imported = Song::default();
    import(&mut imported, &buffer.bytes).unwrap();

    assert_eq!(imported.synthesis_parameters(), original.synthesis_parameters());
  }

  #[test]
  pub fn import_control_points_without_x() {
    let mut song = song();
    import(
      &mut song,
      br#"{"bpm":120,"control_points":[0.0,0.0,0.0,0.0],"notes":[]}"#,
    )
    .unwrap();
    assert_eq!(song.curve().point(CurvePoint::ControlA), Point::new(100.0, 200.0));
    assert_eq!(song.curve().point(CurvePoint::ControlB), Point::new(300.0, 200.0));
  }

  #[test]
  /// A rejected document leaves the song untouched
  pub fn import_malformed() {
    let documents = [
      "not json",
      r#"{"notes":[]}"#,
      r#"{"bpm":120}"#,
      r#"{"bpm":"fast","notes":[]}"#,
      r#"{"bpm":0,"notes":[]}"#,
      r#"{"bpm":-5,"notes":[]}"#,
      r#"{"bpm":120,"notes":[{"id":12,"beats":1.0,"octave":4,"amplitude":1.0}]}"#,
      r#"{"bpm":120,"notes":[{"id":1,"beats":0.0,"octave":4,"amplitude":1.0}]}"#,
      r#"{"bpm":120,"notes":[{"id":1,"beats":1.0,"octave":4,"amplitude":1.5}]}"#,
      r#"{"bpm":120,"notes":[{"id":1,"beats":1.0,"amplitude":1.0}]}"#,
      r#"{"bpm":120,"notes":[],"control_points":[0.0,0.0,0.0]}"#,
      r#"{"bpm":120,"notes":[],"control_points":[0.0,0.0,0.0,2.0]}"#,
      r#"{"bpm":120,"notes":[],"control_points":[0.0,0.0,0.0,0.0],"_x":[0.5,1.5]}"#,
    ];

    for document in documents.iter() {
      let mut song = song();
      let before = song.synthesis_parameters();
      let visible_before = song.timeline().visible().to_vec();
      assert!(
        is_malformed(import(&mut song, document.as_bytes())),
        "accepted {}",
        document
      );
      assert_eq!(song.synthesis_parameters(), before);
      assert_eq!(song.timeline().visible(), visible_before.as_slice());
    }
  }

  #[test]
  pub fn decode_document() {
    let document = decode(br#"{"bpm":100,"notes":[{"id":3,"beats":1.5,"octave":2,"amplitude":0.25}]}"#)
      .unwrap();
    assert_eq!(
      document,
      Document {
        bpm: 100,
        control_points: None,
        notes: vec![InterchangeNote {
          pitch: 3,
          beats: 1.5,
          octave: 2,
          amplitude: 0.25,
        }],
        x: None,
      }
    );
  }

  #[test]
  pub fn export_file_name() {
    assert_eq!(export_name(95, 42), "orchestrator_95bpm_42.json");
  }
}
