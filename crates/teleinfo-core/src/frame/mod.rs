//! Frame assembly over decoded lines.
//!
//! The assembler tracks whether a frame is open and turns each line into
//! events: frame boundaries, field records, or discards. It emits each field
//! as soon as it is parsed and buffers nothing, so a frame boundary is only a
//! state transition. Malformed input never fails; it produces a
//! `Discarded` event and leaves the state unchanged.
//!
//! Marker detection is containment: a marker byte anywhere in a line counts.
//! A line carrying markers never carries field data. Inside a frame an end
//! marker wins: the line closes the frame and nothing else on it is looked at,
//! so the `ETX STX` pair meters send between frames closes the current frame
//! and the next one opens on the following marker line. While awaiting a
//! start, a start marker wins over an end marker.
//!
//! Version française (résumé):
//! Machine à états `AttenteDébut` / `DansTrame`. Chaque ligne produit des
//! événements (début, champ, fin, rejet). Un STX reçu en cours de trame
//! resynchronise sans erreur ; les lignes mal formées sont ignorées.

use tracing::{debug, warn};

use crate::protocols::teleinfo::{DecodedLine, FieldRecord, FrameMarker, parse_field};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameState {
    #[default]
    AwaitingStart,
    /// A frame is open; `fields` counts records emitted since its start.
    InFrame { fields: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// Line seen before the first start marker.
    BeforeSync,
    /// End marker while no frame is open.
    OrphanEnd,
    /// In-frame line with fewer than two tokens.
    MalformedField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A frame opened. `resync` is set when it replaced an unfinished frame.
    Started { resync: bool },
    Field(FieldRecord),
    Completed { fields: usize },
    Discarded(DiscardReason),
}

#[derive(Debug, Default)]
pub struct FrameAssembler {
    state: FrameState,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = FrameState::AwaitingStart;
    }

    /// Feed one line in arrival order.
    ///
    /// Exactly one event per line. A line carrying a marker never carries
    /// field data.
    pub fn process(&mut self, line: &DecodedLine) -> FrameEvent {
        let has_start = line.contains(FrameMarker::StartOfFrame);
        let has_end = line.contains(FrameMarker::EndOfFrame);

        match self.state {
            FrameState::InFrame { fields } if has_end => {
                debug!(fields = fields, "end of frame");
                self.state = FrameState::AwaitingStart;
                FrameEvent::Completed { fields }
            }
            FrameState::InFrame { fields } if has_start => {
                warn!(abandoned_fields = fields, "start marker inside frame; resynchronizing");
                self.state = FrameState::InFrame { fields: 0 };
                FrameEvent::Started { resync: true }
            }
            FrameState::AwaitingStart if has_start => {
                debug!("start of frame");
                self.state = FrameState::InFrame { fields: 0 };
                FrameEvent::Started { resync: false }
            }
            FrameState::AwaitingStart if has_end => {
                debug!("end marker without open frame");
                FrameEvent::Discarded(DiscardReason::OrphanEnd)
            }
            FrameState::AwaitingStart => {
                debug!(line = %line, "discarding line before first start marker");
                FrameEvent::Discarded(DiscardReason::BeforeSync)
            }
            FrameState::InFrame { fields } => match parse_field(line) {
                Ok(record) => {
                    self.state = FrameState::InFrame { fields: fields + 1 };
                    debug!(name = %record.name, value = %record.value, "read field");
                    FrameEvent::Field(record)
                }
                Err(err) => {
                    debug!(line = %line, error = %err, "discarding malformed field");
                    FrameEvent::Discarded(DiscardReason::MalformedField)
                }
            },
        }
    }
}
