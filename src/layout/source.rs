use async_trait::async_trait;

use crate::model::*;

#[derive(Debug)]
pub enum SourceError {
    Unavailable(String),
    Rejected { status: u16, message: String },
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unavailable(e) => write!(f, "source unavailable: {e}"),
            SourceError::Rejected { status, message } => {
                write!(f, "source rejected request ({status}): {message}")
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// Upstream provider of a user's appointments for one day
/// (favorited events, joined group activities, personal entries).
#[async_trait]
pub trait AppointmentSource: Send + Sync {
    fn name(&self) -> &str;

    async fn appointments(&self, user: UserId, window: Span) -> Result<Vec<Appointment>, SourceError>;
}

/// In-memory source returning a fixed list, filtered by window overlap.
pub struct StaticSource {
    name: String,
    appointments: Vec<Appointment>,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, appointments: Vec<Appointment>) -> Self {
        Self {
            name: name.into(),
            appointments,
        }
    }
}

#[async_trait]
impl AppointmentSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn appointments(&self, _user: UserId, window: Span) -> Result<Vec<Appointment>, SourceError> {
        Ok(self
            .appointments
            .iter()
            .filter(|a| a.span.start < window.end && a.span.end > window.start)
            .cloned()
            .collect())
    }
}
