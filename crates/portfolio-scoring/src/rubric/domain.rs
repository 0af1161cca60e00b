use serde::{Deserialize, Serialize};
use std::fmt;

/// The four fixed achievement tiers of the MBE rubric, ordered by score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AchievementLevel {
    Insatisfactorio,
    #[serde(rename = "Básico", alias = "Basico")]
    Basico,
    Competente,
    Destacado,
}

impl AchievementLevel {
    /// Levels that carry conditions, in evaluation order.
    pub const fn top_down() -> [Self; 3] {
        [Self::Destacado, Self::Competente, Self::Basico]
    }

    pub const fn ordered() -> [Self; 4] {
        [
            Self::Insatisfactorio,
            Self::Basico,
            Self::Competente,
            Self::Destacado,
        ]
    }

    pub const fn score(self) -> f64 {
        match self {
            Self::Insatisfactorio => 1.0,
            Self::Basico => 2.0,
            Self::Competente => 3.0,
            Self::Destacado => 4.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Insatisfactorio => "Insatisfactorio",
            Self::Basico => "Básico",
            Self::Competente => "Competente",
            Self::Destacado => "Destacado",
        }
    }

    pub const fn next_higher(self) -> Option<Self> {
        match self {
            Self::Insatisfactorio => Some(Self::Basico),
            Self::Basico => Some(Self::Competente),
            Self::Competente => Some(Self::Destacado),
            Self::Destacado => None,
        }
    }

    /// Parses the labels the oracle tends to produce ("Básico", "basico", "BASICO").
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "destacado" => Some(Self::Destacado),
            "competente" => Some(Self::Competente),
            "básico" | "basico" => Some(Self::Basico),
            "insatisfactorio" => Some(Self::Insatisfactorio),
            _ => None,
        }
    }
}

impl fmt::Display for AchievementLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How the conditions of a level combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogicOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl LogicOperator {
    pub const fn label(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Multiplicity language found in a condition description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantifier {
    Todos,
    Mayoria,
    AlMenosUno,
    Ninguno,
}

/// Evidence hints attached to a condition. All fields are advisory for the oracle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceCriteria {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Atomic, checkable requirement within a level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub criteria: EvidenceCriteria,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantifier: Option<Quantifier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: AchievementLevel,
    pub score: f64,
    pub operator: LogicOperator,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Level {
    pub fn condition(&self, id: &str) -> Option<&Condition> {
        self.conditions.iter().find(|condition| condition.id == id)
    }

    pub fn owns(&self, condition_id: &str) -> bool {
        self.condition(condition_id).is_some()
    }
}

/// The four performance levels of an indicator, keyed by tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLadder {
    pub destacado: Level,
    pub competente: Level,
    pub basico: Level,
    pub insatisfactorio: Level,
}

impl LevelLadder {
    pub fn level(&self, name: AchievementLevel) -> &Level {
        match name {
            AchievementLevel::Destacado => &self.destacado,
            AchievementLevel::Competente => &self.competente,
            AchievementLevel::Basico => &self.basico,
            AchievementLevel::Insatisfactorio => &self.insatisfactorio,
        }
    }

    /// Conditioned levels, highest score first.
    pub fn top_down(&self) -> [&Level; 3] {
        [&self.destacado, &self.competente, &self.basico]
    }

    pub fn slots(&self) -> [(AchievementLevel, &Level); 4] {
        [
            (AchievementLevel::Destacado, &self.destacado),
            (AchievementLevel::Competente, &self.competente),
            (AchievementLevel::Basico, &self.basico),
            (AchievementLevel::Insatisfactorio, &self.insatisfactorio),
        ]
    }

    /// Finds the level that declares the given condition id.
    pub fn level_of(&self, condition_id: &str) -> Option<&Level> {
        self.top_down()
            .into_iter()
            .find(|level| level.owns(condition_id))
    }
}

/// Scored rubric criterion for one indicator within a module/task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rubric {
    pub indicator_id: String,
    pub indicator_name: String,
    pub description: String,
    pub year: u16,
    pub education_level: String,
    #[serde(default)]
    pub subject: Option<String>,
    pub module: u8,
    #[serde(default)]
    pub task: Option<u8>,
    /// Voluntary indicators count toward a module only when they raise its score.
    #[serde(default = "default_mandatory")]
    pub mandatory: bool,
    #[serde(default)]
    pub evidence_to_review: Vec<String>,
    #[serde(default)]
    pub weight_percentage: f64,
    #[serde(default)]
    pub clarifying_notes: Vec<String>,
    pub levels: LevelLadder,
}

fn default_mandatory() -> bool {
    true
}

/// Applicability filter used when loading rubrics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RubricContext {
    pub year: u16,
    pub education_level: String,
    pub subject: String,
    pub module: u8,
    #[serde(default)]
    pub task: Option<u8>,
}

impl RubricContext {
    /// Generalist rubrics (no subject) match every subject; the task filter
    /// applies only when the context names a task.
    pub fn matches(&self, rubric: &Rubric) -> bool {
        if rubric.year != self.year
            || rubric.module != self.module
            || !rubric
                .education_level
                .eq_ignore_ascii_case(&self.education_level)
        {
            return false;
        }

        let subject_matches = rubric
            .subject
            .as_deref()
            .map(|subject| subject.eq_ignore_ascii_case(&self.subject))
            .unwrap_or(true);
        if !subject_matches {
            return false;
        }

        match self.task {
            Some(task) => rubric.task == Some(task),
            None => true,
        }
    }

    pub fn with_task(&self, task: Option<u8>) -> Self {
        Self {
            task,
            ..self.clone()
        }
    }
}

impl fmt::Display for RubricContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} / {} / module {}",
            self.year, self.education_level, self.subject, self.module
        )?;
        if let Some(task) = self.task {
            write!(f, " task {task}")?;
        }
        Ok(())
    }
}
