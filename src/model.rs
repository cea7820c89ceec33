use serde::{Deserialize, Serialize};
use ulid::Ulid;
use uuid::Uuid;

/// Unix milliseconds. The only time type.
pub type Ms = i64;

pub const MINUTE_MS: Ms = 60_000;
pub const HOUR_MS: Ms = 3_600_000;

/// Half-open interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: Ms,
    pub end: Ms,
}

impl Span {
    pub fn new(start: Ms, end: Ms) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Build a span from upstream data without asserting ordering.
    /// Degenerate spans are legal here; the layout engine drops them.
    pub fn unchecked(start: Ms, end: Ms) -> Self {
        Self { start, end }
    }

    /// Saturates instead of overflowing on spans built from garbage input.
    pub fn duration_ms(&self) -> Ms {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Ms) -> bool {
        self.start <= t && t < self.end
    }

    /// Intersection with `other`, or `None` when they don't overlap.
    pub fn clamp_to(&self, other: &Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(Span { start, end })
    }
}

// ── Day planner ──────────────────────────────────────────────────

/// Where an appointment came from. Only affects display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Personal,
    GroupActivity,
    OfficialSchedule,
    ShadowSchedule,
    PhotographerAssignment,
}

impl Category {
    pub fn css_class(self) -> &'static str {
        match self {
            Category::Personal => "planner-personal",
            Category::GroupActivity => "planner-lfg",
            Category::OfficialSchedule => "planner-official",
            Category::ShadowSchedule => "planner-shadow",
            Category::PhotographerAssignment => "planner-photographer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub title: String,
    pub span: Span,
    pub category: Category,
    /// Opaque reference back to the originating entity.
    pub link: String,
}

impl Appointment {
    pub fn new(title: impl Into<String>, start: Ms, end: Ms, category: Category) -> Self {
        Self {
            title: title.into(),
            span: Span::unchecked(start, end),
            category,
            link: String::new(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = link.into();
        self
    }
}

/// Derived per-appointment layout. `index` points back into the slice
/// that was handed to the layout engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutSlot {
    pub index: usize,
    /// Span after minimum-duration extension and window clipping.
    pub span: Span,
    pub start_row: usize,
    pub row_span: usize,
    pub top_margin: u32,
    pub bottom_margin: u32,
    pub concurrent_count: usize,
    pub column_index: usize,
    pub column_width: u8,
}

impl LayoutSlot {
    pub fn end_row(&self) -> usize {
        self.start_row + self.row_span
    }
}

/// One cell emitted into a grid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    /// Index into `DayPlan::slots`.
    Appointment(usize),
    /// Placeholder keeping sparse rows aligned.
    Filter { width: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub time: Ms,
    pub cells: Vec<Cell>,
}

// ── Live chat ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatGroup(pub Uuid);

impl ChatGroup {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChatGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChatGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub Ulid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A posted chat message, as pushed to live connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Ulid,
    pub group: ChatGroup,
    pub author: UserId,
    pub author_name: String,
    pub text: String,
    pub posted_at: Ms,
}

impl ChatMessage {
    pub fn new(group: ChatGroup, author: UserId, author_name: impl Into<String>, text: impl Into<String>, posted_at: Ms) -> Self {
        Self {
            id: Ulid::new(),
            group,
            author,
            author_name: author_name.into(),
            text: text.into(),
            posted_at,
        }
    }
}

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as Ms)
        .unwrap_or(0)
}
