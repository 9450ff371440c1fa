use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone as _, Utc};
use lazy_static::lazy_static;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::auth::Authenticate;
use crate::model::{
    Course, CourseId, Problem, ProblemDescription, ProblemId, ProblemSet, ProblemSetId,
    SolutionId, StatusKind, Verdict,
};
use crate::service::{PageRequest, RawResponse};
use crate::Result;

mod json;
mod legacy;

pub use json::JsonSchema;
pub use legacy::LegacySchema;

lazy_static! {
    pub static ref BASE_URL: Url = Url::parse("https://programming.pku.edu.cn").unwrap();
}

/// Joins a path that is known to be valid onto `BASE_URL`.
fn portal_url(path: &str) -> Result<Url> {
    Ok(BASE_URL.join(path)?)
}

/// Parses a time the portal prints without an offset, which is Beijing time.
fn parse_local_time(text: &str) -> Option<DateTime<Utc>> {
    let beijing = FixedOffset::east(8 * 3600);
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text.trim(), fmt).ok())
        .and_then(|naive| beijing.from_local_datetime(&naive).single())
        .map(|time| time.with_timezone(&Utc))
}

/// One version of the portal's wire format.
///
/// Every other part of the client deals with the records in `model` only; the
/// schema turns operations into requests and responses back into records.
pub trait Schema: Send + Sync {
    fn kind(&self) -> SchemaKind;

    fn authenticator(&self) -> &dyn Authenticate;

    /// Charset of pages that do not declare one.
    fn charset(&self) -> &'static str;

    /// Cookies sent with every request besides the session.
    fn fixed_cookies(&self) -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Whether a page response means the session is missing or expired.
    fn is_access_denied(&self, res: &RawResponse) -> bool;

    fn course_request(&self, course_id: &CourseId) -> Result<PageRequest>;

    fn decode_course(
        &self,
        course_id: &CourseId,
        res: &RawResponse,
    ) -> Result<(Course, Vec<ProblemSet>)>;

    fn problems_request(&self, course_id: &CourseId, set_id: &ProblemSetId)
        -> Result<PageRequest>;

    fn decode_problems(&self, set_id: &ProblemSetId, res: &RawResponse) -> Result<Vec<Problem>>;

    /// Separate request for the statuses of the user in a set, when the
    /// listing does not carry them.
    fn statuses_request(&self, _username: &str, _set_id: &ProblemSetId) -> Option<PageRequest> {
        None
    }

    fn decode_statuses(&self, _res: &RawResponse) -> Result<HashMap<ProblemId, StatusKind>> {
        Ok(HashMap::new())
    }

    fn description_request(&self, problem: &Problem) -> Result<PageRequest>;

    /// Statement with HTML sections still referencing remote images.
    fn decode_description(&self, res: &RawResponse) -> Result<ProblemDescription>;

    fn submit_request(
        &self,
        set_id: &ProblemSetId,
        problem_id: &ProblemId,
        source: &str,
        language: &str,
    ) -> Result<PageRequest>;

    fn decode_submit(&self, res: &RawResponse) -> Result<SolutionId>;

    fn solution_request(&self, solution_id: &SolutionId) -> Result<PageRequest>;

    fn decode_solution(&self, solution_id: &SolutionId, res: &RawResponse) -> Result<Verdict>;

    fn problem_page_url(&self, problem: &Problem) -> Result<Url>;
}

/// Selects the wire format used to talk to the portal.
#[derive(
    Serialize,
    Deserialize,
    EnumString,
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
pub enum SchemaKind {
    /// `?type=json` endpoints behind the IAAA single sign-on.
    Json,
    /// GBK encoded `/programming/*.do` pages with a login form.
    LegacyHtml,
}

impl SchemaKind {
    pub fn build(self) -> Box<dyn Schema> {
        match self {
            Self::Json => Box::new(JsonSchema::default()),
            Self::LegacyHtml => Box::new(LegacySchema::default()),
        }
    }
}

impl Default for SchemaKind {
    fn default() -> Self {
        Self::Json
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.into())
    }
}
