use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::model::{CourseId, ProblemSetId};

#[derive(Serialize, Deserialize, Getters, Debug, Clone, PartialEq, Eq, Hash)]
#[get = "pub"]
pub struct Course {
    id: CourseId,
    title: String,
}

impl Course {
    pub fn new(id: impl Into<CourseId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }
}

/// A time-windowed collection of problems (an assignment).
#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemSet {
    #[get = "pub"]
    id: ProblemSetId,
    #[get = "pub"]
    title: String,
    #[get_copy = "pub"]
    open: Option<DateTime<Utc>>,
    #[get_copy = "pub"]
    close: Option<DateTime<Utc>>,
}

impl ProblemSet {
    pub fn new(
        id: impl Into<ProblemSetId>,
        title: impl Into<String>,
        open: Option<DateTime<Utc>>,
        close: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            open,
            close,
        }
    }

    /// Whether submissions are accepted at `now`.
    ///
    /// A set without both bounds is never available.
    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        match (self.open, self.close) {
            (Some(open), Some(close)) => open <= now && now <= close,
            _ => false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.is_available_at(Utc::now())
    }
}
