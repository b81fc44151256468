/// What became of a single record submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Spira answered. Any status counts, including errors.
    Responded { status: u16, body_bytes: usize },
    /// The request never produced a response.
    TransportFailed { message: String },
}

impl SubmitOutcome {
    pub fn is_response(&self) -> bool {
        matches!(self, SubmitOutcome::Responded { .. })
    }

    pub fn is_error_status(&self) -> bool {
        matches!(self, SubmitOutcome::Responded { status, .. } if *status >= 400)
    }
}
