use tracing::debug;

/// Lifecycle of one upload request.
///
/// `Idle -> Parsing -> Validating -> Writing -> Resolved`, with `Failed`
/// reachable from any non-terminal phase. Parsing and validating alternate
/// while parts are read; there is no way back out of a terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadPhase {
    Idle,
    Parsing,
    Validating,
    Writing,
    Resolved,
    Failed,
}

impl UploadPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadPhase::Resolved | UploadPhase::Failed)
    }

    pub fn can_advance_to(&self, next: UploadPhase) -> bool {
        use UploadPhase::*;
        match (self, next) {
            (Resolved, _) | (Failed, _) => false,
            (_, Failed) => true,
            (Idle, Parsing)
            | (Parsing, Validating)
            | (Validating, Parsing)
            | (Validating, Writing)
            | (Writing, Resolved) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Parsing => "parsing",
            UploadPhase::Validating => "validating",
            UploadPhase::Writing => "writing",
            UploadPhase::Resolved => "resolved",
            UploadPhase::Failed => "failed",
        }
    }
}

/// Tracks the phase of a single request and refuses illegal transitions.
#[derive(Debug)]
pub struct PhaseTracker {
    request_id: String,
    phase: UploadPhase,
}

impl PhaseTracker {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            phase: UploadPhase::Idle,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    /// Move to `next`. Returns false and stays put if the move is not allowed.
    pub fn advance(&mut self, next: UploadPhase) -> bool {
        if !self.phase.can_advance_to(next) {
            debug!(
                request_id = %self.request_id,
                from = self.phase.as_str(),
                to = next.as_str(),
                "ignored illegal upload phase transition"
            );
            return false;
        }
        debug!(
            request_id = %self.request_id,
            from = self.phase.as_str(),
            to = next.as_str(),
            "upload phase"
        );
        self.phase = next;
        true
    }

    pub fn fail(&mut self) -> bool {
        self.advance(UploadPhase::Failed)
    }
}
