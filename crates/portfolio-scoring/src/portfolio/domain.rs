use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluation::SubmissionRef;
use crate::rubric::RubricContext;

/// Identifier wrapper for submitted portfolio content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One version of a teacher's task content. A changed submission is a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: SubmissionId,
    #[serde(default = "first_version")]
    pub version: u32,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
    pub content: Value,
}

fn first_version() -> u32 {
    1
}

impl Submission {
    pub fn reference(&self) -> SubmissionRef {
        SubmissionRef {
            id: self.id.clone(),
            version: self.version,
        }
    }
}

fn resolve<'a>(content: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(content, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index)),
            _ => None,
        })
        .filter(|value| !value.is_null())
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Renders the parts of `content` named by dotted `paths` as `### path:` blocks.
/// No declared paths means the whole payload; declared paths that resolve to
/// nothing yield an empty excerpt.
pub fn evidence_excerpt(content: &Value, paths: &[String]) -> String {
    if paths.is_empty() {
        return pretty(content);
    }

    paths
        .iter()
        .filter_map(|path| resolve(content, path).map(|value| (path, value)))
        .map(|(path, value)| format!("### {path}:\n{}", pretty(value)))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Year, level and subject shared by every rubric lookup of one teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub year: u16,
    pub education_level: String,
    pub subject: String,
}

impl TeacherProfile {
    pub fn context(&self, module: u8, task: Option<u8>) -> RubricContext {
        RubricContext {
            year: self.year,
            education_level: self.education_level.clone(),
            subject: self.subject.clone(),
            module,
            task,
        }
    }
}

/// Submission covering one task of a module, or the whole module when `task` is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSubmission {
    #[serde(default)]
    pub task: Option<u8>,
    pub submission_id: SubmissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorRequest {
    pub context: RubricContext,
    pub indicator_id: String,
    pub submission_id: SubmissionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRequest {
    pub profile: TeacherProfile,
    pub module: u8,
    pub submissions: Vec<TaskSubmission>,
    #[serde(default = "include_voluntary")]
    pub include_voluntary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSubmissions {
    pub module: u8,
    pub submissions: Vec<TaskSubmission>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioRequest {
    pub profile: TeacherProfile,
    pub modules: Vec<ModuleSubmissions>,
    #[serde(default = "include_voluntary")]
    pub include_voluntary: bool,
}

impl PortfolioRequest {
    pub fn module_requests(&self) -> Vec<ModuleRequest> {
        self.modules
            .iter()
            .map(|module| ModuleRequest {
                profile: self.profile.clone(),
                module: module.module,
                submissions: module.submissions.clone(),
                include_voluntary: self.include_voluntary,
            })
            .collect()
    }
}

fn include_voluntary() -> bool {
    true
}
