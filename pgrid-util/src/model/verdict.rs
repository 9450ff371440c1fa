use std::fmt;

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};

use crate::model::{ProblemSetId, SolutionId};
use crate::regex;

#[derive(
    Serialize,
    Deserialize,
    EnumVariantNames,
    IntoStaticStr,
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum StatusKind {
    Accepted,
    WrongAnswer,
    PresentationError,
    RuntimeError,
    CompileError,
    TimeLimitExceeded,
    MemoryLimitExceeded,
    OutputLimitExceeded,
    /// Not accepted, without further detail.
    Rejected,
    SystemError,
    /// Still being judged.
    Processing,
    Unknown,
}

impl StatusKind {
    /// Maps a status string reported by the portal.
    ///
    /// Accepts full verdict names ("Wrong Answer"), abbreviations ("WA") and
    /// the boolean style ("yes" / "no") used by problem listings. Anything else
    /// is `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        let key = raw
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "accepted" | "passed" | "pass" | "ac" | "yes" | "true" => Self::Accepted,
            "wronganswer" | "wa" => Self::WrongAnswer,
            "presentationerror" | "pe" => Self::PresentationError,
            "runtimeerror" | "re" => Self::RuntimeError,
            "compileerror" | "compilationerror" | "ce" => Self::CompileError,
            "timelimitexceeded" | "timelimitexceed" | "tle" => Self::TimeLimitExceeded,
            "memorylimitexceeded" | "memorylimitexceed" | "mle" => Self::MemoryLimitExceeded,
            "outputlimitexceeded" | "outputlimitexceed" | "ole" => Self::OutputLimitExceeded,
            "no" | "false" | "failed" | "unaccepted" => Self::Rejected,
            "systemerror" | "se" => Self::SystemError,
            "processing" | "pending" | "waiting" | "judging" | "compiling" | "running"
            | "queuing" => Self::Processing,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(self) -> bool {
        self != Self::Processing
    }

    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.into())
    }
}

/// Judge outcome of one solution.
#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Verdict {
    #[get_copy = "pub"]
    status: StatusKind,
    /// Status string exactly as reported.
    #[get = "pub"]
    raw_status: String,
    /// Free text details such as compiler output or per case results.
    #[get = "pub"]
    details: String,
}

impl Verdict {
    pub fn new(raw_status: impl Into<String>, details: impl Into<String>) -> Self {
        let raw_status = raw_status.into();
        Self {
            status: StatusKind::from_raw(&raw_status),
            raw_status,
            details: details.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn performance(&self) -> Performance {
        Performance::summarize(&self.details)
    }
}

/// Average time and memory over the cases listed in verdict details.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Performance {
    Measured { time_ms: u64, memory_kb: u64 },
    NotApplicable,
}

impl Performance {
    /// Scans lines like `Case 1: Time = 100ms, Memory = 200kB.` and averages them,
    /// rounding half up.
    pub fn summarize(details: &str) -> Self {
        let cases = regex!(r"(?m)^Case \d+: Time = (\d+)ms, Memory = (\d+)kB\.\r?$")
            .captures_iter(details)
            .filter_map(|caps| Some((caps[1].parse::<u64>().ok()?, caps[2].parse::<u64>().ok()?)))
            .collect::<Vec<_>>();
        if cases.is_empty() {
            return Self::NotApplicable;
        }
        // summed in u128, the mean of u64 values always fits back into u64
        let n = cases.len() as u128;
        let mean = |sum: u128| ((2 * sum + n) / (2 * n)) as u64;
        let (time_sum, memory_sum) = cases.iter().fold((0u128, 0u128), |(t, m), &(time, memory)| {
            (t + u128::from(time), m + u128::from(memory))
        });
        Self::Measured {
            time_ms: mean(time_sum),
            memory_kb: mean(memory_sum),
        }
    }
}

impl fmt::Display for Performance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Measured { time_ms, memory_kb } => write!(f, "{}ms/{}kB", time_ms, memory_kb),
            Self::NotApplicable => f.write_str("N/A"),
        }
    }
}

/// Final result of submitting a solution and waiting for its verdict.
#[derive(Serialize, Deserialize, Getters, CopyGetters, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Judgement {
    #[get = "pub"]
    solution_id: SolutionId,
    #[get = "pub"]
    verdict: Verdict,
    #[get_copy = "pub"]
    performance: Performance,
    /// Problem set whose listing is stale now that the status has changed.
    #[get = "pub"]
    refresh_set: ProblemSetId,
}

impl Judgement {
    pub fn new(solution_id: SolutionId, verdict: Verdict, refresh_set: ProblemSetId) -> Self {
        Self {
            solution_id,
            performance: verdict.performance(),
            verdict,
            refresh_set,
        }
    }
}
