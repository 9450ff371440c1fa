use anyhow::anyhow;
use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::model::{ProblemId, ProblemSetId, StatusKind};
use crate::Result;

#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Problem {
    #[get = "pub"]
    id: ProblemId,
    #[get = "pub"]
    set_id: ProblemSetId,
    /// 1-based position in the listing of the set.
    #[get_copy = "pub"]
    index: usize,
    #[get = "pub"]
    title: String,
    /// Last verdict of the user for this problem, if the listing reports one.
    #[get_copy = "pub"]
    status: Option<StatusKind>,
}

impl Problem {
    pub fn new(
        id: impl Into<ProblemId>,
        set_id: impl Into<ProblemSetId>,
        index: usize,
        title: impl Into<String>,
        status: Option<StatusKind>,
    ) -> Self {
        Self {
            id: id.into(),
            set_id: set_id.into(),
            index,
            title: title.into(),
            status,
        }
    }

    pub fn with_status(mut self, status: Option<StatusKind>) -> Self {
        self.status = status;
        self
    }
}

/// Fixed code surrounding the blank of a fill-in-the-blank problem.
#[derive(Serialize, Deserialize, Getters, Debug, Clone, PartialEq, Eq, Hash)]
#[get = "pub"]
pub struct CodeTemplate {
    prefix: String,
    suffix: String,
}

impl CodeTemplate {
    /// Line separating the prefix from the suffix in a template file.
    pub const BLANK_MARKER: &'static str = "@@ blank @@";

    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let text = text.replace('\r', "");
        let mut prefix = Vec::new();
        let mut lines = text.lines();
        lines
            .by_ref()
            .take_while(|line| !line.contains(Self::BLANK_MARKER))
            .for_each(|line| prefix.push(line));
        let suffix = lines.collect::<Vec<_>>();
        if prefix.len() == text.lines().count() {
            return Err(anyhow!(
                "Could not find a line containing {} in template",
                Self::BLANK_MARKER
            ));
        }
        Ok(Self::new(prefix.join("\n"), suffix.join("\n")))
    }

    /// Whether `source` keeps the prefix and, after it, the suffix.
    pub fn is_filled_by(&self, source: &str) -> bool {
        let source = source.replace('\r', "");
        let (prefix, suffix) = (self.prefix.trim(), self.suffix.trim());
        match source.find(prefix) {
            Some(pos) => source[pos + prefix.len()..].contains(suffix),
            None => false,
        }
    }
}

#[derive(Serialize, Deserialize, Getters, Debug, Clone, PartialEq, Eq, Hash)]
#[get = "pub"]
pub struct Submission {
    set_id: ProblemSetId,
    problem_id: ProblemId,
    source: String,
    template: Option<CodeTemplate>,
}

impl Submission {
    pub fn new(
        set_id: impl Into<ProblemSetId>,
        problem_id: impl Into<ProblemId>,
        source: impl Into<String>,
        template: Option<CodeTemplate>,
    ) -> Self {
        Self {
            set_id: set_id.into(),
            problem_id: problem_id.into(),
            source: source.into(),
            template,
        }
    }
}
