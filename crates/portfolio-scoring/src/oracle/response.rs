//! Turns raw oracle text into domain values. Every failure is reported as
//! [`OracleError::Malformed`]; nothing here retries.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{JudgedAction, LevelJudgment, OracleError, RankedAction};
use crate::evaluation::{ConditionVerification, Priority};
use crate::rubric::AchievementLevel;

/// Removes markdown fences and `//` line comments outside of string literals.
pub fn clean_response(raw: &str) -> String {
    let unfenced = raw.replace("```json", "").replace("```", "");

    let mut cleaned = String::with_capacity(unfenced.len());
    let mut chars = unfenced.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(ch) = chars.next() {
        if in_string {
            cleaned.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '/' && chars.peek() == Some(&'/') {
            for skipped in chars.by_ref() {
                if skipped == '\n' {
                    cleaned.push('\n');
                    break;
                }
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        }
        cleaned.push(ch);
    }

    cleaned.trim().to_string()
}

/// Parses the span between the first `{` and the last `}`.
pub fn extract_object(raw: &str) -> Result<Value, OracleError> {
    let cleaned = clean_response(raw);
    let start = cleaned
        .find('{')
        .ok_or_else(|| OracleError::malformed("no JSON object in response"))?;
    let end = cleaned
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| OracleError::malformed("unterminated JSON object in response"))?;

    serde_json::from_str(&cleaned[start..=end])
        .map_err(|err| OracleError::malformed(format!("invalid JSON: {err}")))
}

fn validate(schema: &Value, document: &Value) -> Result<(), OracleError> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|err| OracleError::malformed(format!("response schema does not compile: {err}")))?;

    let errors: Vec<String> = validator
        .iter_errors(document)
        .map(|err| err.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(OracleError::malformed(errors.join("; ")))
    }
}

fn decode<T: DeserializeOwned>(schema: &Value, raw: &str) -> Result<T, OracleError> {
    let document = extract_object(raw)?;
    validate(schema, &document)?;
    serde_json::from_value(document)
        .map_err(|err| OracleError::malformed(format!("unexpected response shape: {err}")))
}

fn parse_priority(value: &str) -> Result<Priority, OracleError> {
    Priority::parse(value)
        .ok_or_else(|| OracleError::malformed(format!("unknown priority '{value}'")))
}

pub fn verification_schema() -> Value {
    json!({
        "type": "object",
        "required": ["cumple", "confianza"],
        "properties": {
            "cumple": { "type": "boolean" },
            "confianza": { "type": "number", "minimum": 0, "maximum": 1 },
            "evidencias_textuales": { "type": "array", "items": { "type": "string" } },
            "justificacion": { "type": "string" },
            "que_falta_si_no_cumple": { "type": ["string", "null"] }
        }
    })
}

pub fn judgment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["nivel_alcanzado", "condiciones_evaluadas"],
        "properties": {
            "nivel_alcanzado": { "type": "string" },
            "puntaje": { "type": ["number", "null"] },
            "condiciones_evaluadas": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["condicion_id", "cumple"],
                    "properties": {
                        "condicion_id": { "type": "string" },
                        "nivel": { "type": ["string", "null"] },
                        "cumple": { "type": "boolean" },
                        "confianza": { "type": "number", "minimum": 0, "maximum": 1 },
                        "evidencia_textual": { "type": ["string", "null"] },
                        "razon": { "type": ["string", "null"] }
                    }
                }
            },
            "justificacion": { "type": "string" },
            "para_siguiente_nivel": { "type": "string" },
            "fortalezas": { "type": "array", "items": { "type": "string" } },
            "recomendaciones": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["prioridad", "accion"],
                    "properties": {
                        "prioridad": { "type": "string" },
                        "accion": { "type": "string" },
                        "impacto": { "type": "string" }
                    }
                }
            },
            "evidencias_destacadas": { "type": "array", "items": { "type": "string" } }
        }
    })
}

pub fn prioritization_schema() -> Value {
    json!({
        "type": "object",
        "required": ["recomendaciones"],
        "properties": {
            "recomendaciones": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["prioridad", "indicador", "accion", "impacto_puntos"],
                    "properties": {
                        "prioridad": { "type": "string" },
                        "indicador": { "type": "string" },
                        "accion": { "type": "string" },
                        "impacto_puntos": { "type": "number" },
                        "tiempo_horas": { "type": ["number", "null"] },
                        "razon": { "type": ["string", "null"] }
                    }
                }
            }
        }
    })
}

#[derive(Deserialize)]
struct VerificationWire {
    cumple: bool,
    confianza: f64,
    #[serde(default)]
    evidencias_textuales: Vec<String>,
    #[serde(default)]
    justificacion: String,
    #[serde(default)]
    que_falta_si_no_cumple: Option<String>,
}

#[derive(Deserialize)]
struct JudgedConditionWire {
    condicion_id: String,
    #[serde(default)]
    nivel: Option<String>,
    cumple: bool,
    #[serde(default)]
    confianza: Option<f64>,
    #[serde(default)]
    evidencia_textual: Option<String>,
    #[serde(default)]
    razon: Option<String>,
}

#[derive(Deserialize)]
struct JudgedActionWire {
    prioridad: String,
    accion: String,
    #[serde(default)]
    impacto: String,
}

#[derive(Deserialize)]
struct JudgmentWire {
    nivel_alcanzado: String,
    #[serde(default)]
    puntaje: Option<f64>,
    condiciones_evaluadas: Vec<JudgedConditionWire>,
    #[serde(default)]
    justificacion: String,
    #[serde(default)]
    para_siguiente_nivel: String,
    #[serde(default)]
    fortalezas: Vec<String>,
    #[serde(default)]
    recomendaciones: Vec<JudgedActionWire>,
    #[serde(default)]
    evidencias_destacadas: Vec<String>,
}

#[derive(Deserialize)]
struct RankedActionWire {
    prioridad: String,
    indicador: String,
    accion: String,
    impacto_puntos: f64,
    #[serde(default)]
    tiempo_horas: Option<f64>,
    #[serde(default)]
    razon: Option<String>,
}

#[derive(Deserialize)]
struct PrioritizationWire {
    recomendaciones: Vec<RankedActionWire>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

/// The verdict carries no id on the wire; the caller supplies the one it asked about.
pub fn parse_verification(
    raw: &str,
    condition_id: &str,
) -> Result<ConditionVerification, OracleError> {
    let wire: VerificationWire = decode(&verification_schema(), raw)?;

    Ok(ConditionVerification {
        condition_id: condition_id.to_string(),
        level: None,
        satisfied: wire.cumple,
        confidence: wire.confianza,
        evidence: wire.evidencias_textuales,
        justification: wire.justificacion,
        missing: if wire.cumple {
            None
        } else {
            non_empty(wire.que_falta_si_no_cumple)
        },
    })
}

pub fn parse_judgment(raw: &str) -> Result<LevelJudgment, OracleError> {
    let wire: JudgmentWire = decode(&judgment_schema(), raw)?;

    let claimed_level = AchievementLevel::from_label(&wire.nivel_alcanzado).ok_or_else(|| {
        OracleError::malformed(format!("unknown level '{}'", wire.nivel_alcanzado))
    })?;

    let verifications = wire
        .condiciones_evaluadas
        .into_iter()
        .map(|condition| {
            let level = match non_empty(condition.nivel) {
                Some(label) => Some(AchievementLevel::from_label(&label).ok_or_else(|| {
                    OracleError::malformed(format!(
                        "unknown level '{label}' for condition {}",
                        condition.condicion_id
                    ))
                })?),
                None => None,
            };
            Ok(ConditionVerification {
                condition_id: condition.condicion_id,
                level,
                satisfied: condition.cumple,
                confidence: condition.confianza.unwrap_or(1.0),
                evidence: non_empty(condition.evidencia_textual).into_iter().collect(),
                justification: condition.razon.unwrap_or_default(),
                missing: None,
            })
        })
        .collect::<Result<Vec<_>, OracleError>>()?;

    let recommendations = wire
        .recomendaciones
        .into_iter()
        .map(|action| {
            Ok(JudgedAction {
                priority: parse_priority(&action.prioridad)?,
                action: action.accion,
                impact: action.impacto,
            })
        })
        .collect::<Result<Vec<_>, OracleError>>()?;

    Ok(LevelJudgment {
        claimed_level,
        claimed_score: wire.puntaje,
        verifications,
        justification: wire.justificacion,
        next_level_gap: wire.para_siguiente_nivel,
        strengths: wire.fortalezas,
        recommendations,
        highlighted_evidence: wire.evidencias_destacadas,
    })
}

pub fn parse_prioritization(raw: &str) -> Result<Vec<RankedAction>, OracleError> {
    let wire: PrioritizationWire = decode(&prioritization_schema(), raw)?;

    wire.recomendaciones
        .into_iter()
        .map(|action| {
            Ok(RankedAction {
                priority: parse_priority(&action.prioridad)?,
                indicator_id: action.indicador,
                action: action.accion,
                estimated_points: action.impacto_puntos,
                estimated_hours: action.tiempo_horas,
                rationale: non_empty(action.razon),
            })
        })
        .collect()
}
