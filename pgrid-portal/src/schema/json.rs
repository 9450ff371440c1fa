use std::collections::HashMap;

use chrono::{DateTime, TimeZone as _, Utc};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{Authenticate, IaaaAuth};
use crate::model::{
    Course, CourseId, Problem, ProblemDescription, ProblemId, ProblemSet, ProblemSetId,
    SolutionId, StatusKind, Verdict,
};
use crate::schema::{parse_local_time, portal_url, Schema, SchemaKind};
use crate::service::scrape::fragment_to_text;
use crate::service::{PageRequest, RawResponse};
use crate::{PortalError, Result};

/// Portal pages served as JSON when asked with `?type=json`.
#[derive(Debug, Default, Clone)]
pub struct JsonSchema {
    auth: IaaaAuth,
}

impl JsonSchema {
    const RESULTS_PATH: &'static str = "/account/query.do";

    fn json_page(path: &str) -> Result<Url> {
        let mut url = portal_url(path)?;
        url.query_pairs_mut().append_pair("type", "json");
        Ok(url)
    }
}

fn parse<T: DeserializeOwned>(what: &str, res: &RawResponse) -> Result<T> {
    serde_json::from_slice(res.bytes()).map_err(|err| {
        PortalError::MalformedResponse(format!("{} from {} : {}", what, res.url(), err)).into()
    })
}

#[derive(Deserialize, Debug)]
struct StatusField {
    status: Option<String>,
}

/// Time as the portal writes it: epoch milliseconds or a date string.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    /// Strings without an offset are Beijing time.
    fn to_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(millis) => Utc.timestamp_millis_opt(*millis).single(),
            Self::Text(text) => {
                match DateTime::parse_from_rfc3339(text.trim()) {
                    Ok(time) => Some(time.with_timezone(&Utc)),
                    Err(_) => parse_local_time(text),
                }
            }
        }
    }
}

#[derive(Deserialize, Debug)]
struct CourseReply {
    course: Option<CourseBody>,
}

#[derive(Deserialize, Debug)]
struct CourseBody {
    title: String,
    #[serde(default)]
    problemlists: Vec<SetBody>,
}

#[derive(Deserialize, Debug)]
struct SetBody {
    id: String,
    title: String,
    assignment: Option<Assignment>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Assignment {
    open_time: Option<Timestamp>,
    close_time: Option<Timestamp>,
}

#[derive(Deserialize, Debug)]
struct ProblemsReply {
    problemlist: Option<ProblemList>,
}

#[derive(Deserialize, Debug)]
struct ProblemList {
    #[serde(default)]
    problems: Vec<ProblemEntry>,
}

#[derive(Deserialize, Debug)]
struct ProblemEntry {
    id: String,
    title: String,
}

#[derive(Deserialize, Debug)]
struct ResultsReply {
    status: Option<String>,
    #[serde(default)]
    results: Vec<ResultEntry>,
}

#[derive(Deserialize, Debug)]
struct ResultEntry {
    id: String,
    result: String,
}

#[derive(Deserialize, Debug)]
struct DescriptionReply {
    problem: Option<DescriptionBody>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, rename_all = "camelCase")]
struct DescriptionBody {
    title: String,
    description: String,
    about_input: String,
    about_output: String,
    hint: String,
    sample_input: String,
    sample_output: String,
}

#[derive(Deserialize, Debug)]
struct SubmitReply {
    solution: Option<SubmitBody>,
}

#[derive(Deserialize, Debug)]
struct SubmitBody {
    id: String,
}

#[derive(Deserialize, Debug)]
struct SolutionReply {
    solution: Option<SolutionBody>,
}

#[derive(Deserialize, Debug)]
struct SolutionBody {
    result: String,
    #[serde(default)]
    hint: Option<String>,
}

impl Schema for JsonSchema {
    fn kind(&self) -> SchemaKind {
        SchemaKind::Json
    }

    fn authenticator(&self) -> &dyn Authenticate {
        &self.auth
    }

    fn charset(&self) -> &'static str {
        "utf-8"
    }

    fn fixed_cookies(&self) -> &'static [(&'static str, &'static str)] {
        &[("PG_client", "vscode_ext")]
    }

    fn is_access_denied(&self, res: &RawResponse) -> bool {
        if res.status().is_redirection() || !res.is_json() {
            return true;
        }
        // a user without results gets a non-OK reply here
        if res.url().path() == Self::RESULTS_PATH {
            return false;
        }
        match serde_json::from_slice::<StatusField>(res.bytes()) {
            Ok(StatusField {
                status: Some(status),
            }) => status != "OK",
            _ => false,
        }
    }

    fn course_request(&self, course_id: &CourseId) -> Result<PageRequest> {
        Ok(PageRequest::get(Self::json_page(&format!(
            "/course/{}/",
            course_id
        ))?))
    }

    fn decode_course(
        &self,
        course_id: &CourseId,
        res: &RawResponse,
    ) -> Result<(Course, Vec<ProblemSet>)> {
        let reply: CourseReply = parse("course", res)?;
        let body = reply
            .course
            .ok_or_else(|| PortalError::MalformedResponse("course is missing".into()))?;
        let sets = body
            .problemlists
            .into_iter()
            .map(|set| {
                let (open, close) = match &set.assignment {
                    Some(assignment) => (
                        assignment.open_time.as_ref().and_then(Timestamp::to_utc),
                        assignment.close_time.as_ref().and_then(Timestamp::to_utc),
                    ),
                    None => (None, None),
                };
                ProblemSet::new(set.id, set.title, open, close)
            })
            .collect();
        Ok((Course::new(course_id.clone(), body.title), sets))
    }

    fn problems_request(
        &self,
        _course_id: &CourseId,
        set_id: &ProblemSetId,
    ) -> Result<PageRequest> {
        Ok(PageRequest::get(Self::json_page(&format!(
            "/probset/{}/",
            set_id
        ))?))
    }

    fn decode_problems(&self, set_id: &ProblemSetId, res: &RawResponse) -> Result<Vec<Problem>> {
        let reply: ProblemsReply = parse("problem list", res)?;
        let list = reply.problemlist.ok_or_else(|| {
            PortalError::MalformedResponse(format!("no permission to view problem set {}", set_id))
        })?;
        Ok(list
            .problems
            .into_iter()
            .enumerate()
            .map(|(i, p)| Problem::new(p.id, set_id.clone(), i + 1, p.title, None))
            .collect())
    }

    fn statuses_request(&self, username: &str, set_id: &ProblemSetId) -> Option<PageRequest> {
        let url = portal_url(Self::RESULTS_PATH).ok()?;
        let form = vec![
            ("query", "results"),
            ("username", username),
            ("probsetId", set_id.as_ref()),
        ];
        Some(PageRequest::post_form(url, form))
    }

    fn decode_statuses(&self, res: &RawResponse) -> Result<HashMap<ProblemId, StatusKind>> {
        let reply: ResultsReply = parse("results", res)?;
        if reply.status.as_deref() != Some("OK") {
            return Ok(HashMap::new());
        }
        Ok(reply
            .results
            .into_iter()
            .map(|entry| (ProblemId::from(entry.id), StatusKind::from_raw(&entry.result)))
            .collect())
    }

    fn description_request(&self, problem: &Problem) -> Result<PageRequest> {
        Ok(PageRequest::get(Self::json_page(&format!(
            "/probset/{}/{}/",
            problem.set_id(),
            problem.id()
        ))?))
    }

    fn decode_description(&self, res: &RawResponse) -> Result<ProblemDescription> {
        let reply: DescriptionReply = parse("problem", res)?;
        let body = reply
            .problem
            .ok_or_else(|| PortalError::MalformedResponse("problem is missing".into()))?;
        Ok(ProblemDescription::builder(body.title)
            .description(body.description)
            .about_input(body.about_input)
            .about_output(body.about_output)
            .hint(body.hint)
            .samples(
                fragment_to_text(&body.sample_input),
                fragment_to_text(&body.sample_output),
            )
            .build())
    }

    fn submit_request(
        &self,
        set_id: &ProblemSetId,
        problem_id: &ProblemId,
        source: &str,
        language: &str,
    ) -> Result<PageRequest> {
        let url = portal_url(&format!("/probset/{}/{}/submit.do", set_id, problem_id))?;
        let form = vec![
            ("sourceCode", source),
            ("programLanguage", language),
            ("type", "json"),
        ];
        Ok(PageRequest::post_form(url, form))
    }

    fn decode_submit(&self, res: &RawResponse) -> Result<SolutionId> {
        let reply: SubmitReply = parse("submission", res)?;
        reply
            .solution
            .map(|solution| SolutionId::from(solution.id))
            .ok_or_else(|| {
                PortalError::MalformedResponse("submission reply has no solution".into()).into()
            })
    }

    fn solution_request(&self, solution_id: &SolutionId) -> Result<PageRequest> {
        Ok(PageRequest::get(portal_url(&format!(
            "/solution/{}/status.do",
            solution_id
        ))?))
    }

    fn decode_solution(&self, solution_id: &SolutionId, res: &RawResponse) -> Result<Verdict> {
        let reply: SolutionReply = parse("solution", res)?;
        let body = reply
            .solution
            .ok_or_else(|| PortalError::JudgeUnavailable(solution_id.to_string()))?;
        Ok(Verdict::new(body.result, body.hint.unwrap_or_default()))
    }

    fn problem_page_url(&self, problem: &Problem) -> Result<Url> {
        portal_url(&format!("/probset/{}/{}/", problem.set_id(), problem.id()))
    }
}
