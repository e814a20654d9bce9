use crate::cell::Cell;
use crate::geometry::{Point, Segment};
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Stage of the insertion algorithm last published by the diagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    Starting,
    AddPointStart,
    GettingBisection,
    TrimmingBefore,
    TrimmingAfter,
    DoneWithoutBorder,
    JoiningWithBorder,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Starting => "STARTING",
            Phase::AddPointStart => "ADD_POINT_START",
            Phase::GettingBisection => "GETTING_BISECTION",
            Phase::TrimmingBefore => "TRIMMING_BEFORE",
            Phase::TrimmingAfter => "TRIMMING_AFTER",
            Phase::DoneWithoutBorder => "DONE_WITHOUT_BORDER",
            Phase::JoiningWithBorder => "JOINING_WITH_BORDER",
            Phase::Done => "DONE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Data attached to the current phase. Fields that do not apply are `None`.
#[derive(Clone, Debug, Default)]
pub struct PhasePayload {
    /// Chord just computed from a bisector.
    pub bisection: Option<Segment>,
    /// Existing cell about to be, or just, trimmed.
    pub trimming_cell: Option<Arc<Cell>>,
    /// Site being inserted.
    pub adding_point: Option<Point>,
    /// The new cell while it is being built.
    pub adding_cell: Option<Arc<Cell>>,
}

/// Notification sent to observers after every phase change.
#[derive(Clone, Debug)]
pub struct DiagramEvent {
    pub phase: Phase,
    pub payload: PhasePayload,
    pub node_count: usize,
    pub target_nodes: usize,
}

/// Receives diagram notifications synchronously on the builder thread.
pub trait Observer: Send {
    fn on_diagram_changed(&mut self, event: &DiagramEvent);
}

impl<F> Observer for F
where
    F: FnMut(&DiagramEvent) + Send,
{
    fn on_diagram_changed(&mut self, event: &DiagramEvent) {
        self(event)
    }
}

/// Observer that records every event it receives. Clones share the same log.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<DiagramEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Takes all recorded events, leaving the log empty.
    pub fn drain(&self) -> Vec<DiagramEvent> {
        let mut events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *events)
    }

    pub fn phases(&self) -> Vec<Phase> {
        let events = self.events.lock().unwrap_or_else(PoisonError::into_inner);
        events.iter().map(|e| e.phase).collect()
    }
}

impl Observer for EventLog {
    fn on_diagram_changed(&mut self, event: &DiagramEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(phase: Phase) -> DiagramEvent {
        DiagramEvent {
            phase,
            payload: PhasePayload::default(),
            node_count: 1,
            target_nodes: 0,
        }
    }

    #[test]
    fn test_event_log_shares_between_clones() {
        let log = EventLog::new();
        let mut writer = log.clone();
        writer.on_diagram_changed(&event(Phase::AddPointStart));
        writer.on_diagram_changed(&event(Phase::Done));

        assert_eq!(log.phases(), vec![Phase::AddPointStart, Phase::Done]);
        assert_eq!(log.drain().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_closure_observer() {
        let mut seen = Vec::new();
        {
            let mut observer = |e: &DiagramEvent| seen.push(e.phase);
            observer.on_diagram_changed(&event(Phase::GettingBisection));
        }
        assert_eq!(seen, vec![Phase::GettingBisection]);
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::DoneWithoutBorder.to_string(), "DONE_WITHOUT_BORDER");
        assert_eq!(serde_json::to_string(&Phase::AddPointStart).unwrap(), "\"ADD_POINT_START\"");
    }
}
