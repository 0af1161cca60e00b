//! Spanish prompts for the condition oracle. Rubric content is Spanish, so
//! the instructions are too.

use std::fmt::Write as _;

use super::{ConditionRequest, JudgmentRequest, PrioritizationRequest};
use crate::rubric::{EvidenceCriteria, Level, Quantifier};

pub const VERIFIER_SYSTEM_PROMPT: &str = "Eres un evaluador riguroso del Sistema de Reconocimiento \
del Desarrollo Profesional Docente de Chile. Verificas si el contenido de un portafolio cumple \
criterios concretos de las rúbricas oficiales.

Reglas:
1. Marca una condición como cumplida solo con evidencia explícita y verificable.
2. Evalúa únicamente lo escrito, sin suponer intenciones.
3. Cita fragmentos textuales exactos como evidencia.
4. Usa las definiciones oficiales del MINEDUC.

Escala de confianza:
- 0.9 a 1.0: evidencia clara y explícita
- 0.7 a 0.89: evidencia clara pero poco específica
- 0.5 a 0.69: evidencia ambigua
- 0.3 a 0.49: evidencia débil o inferida
- 0.0 a 0.29: sin evidencia

Responde siempre con un único objeto JSON.";

pub const ANALYST_SYSTEM_PROMPT: &str =
    "Eres un analista experto en evaluación docente. Respondes solo con JSON.";

const NO_EVIDENCE: &str = "(La entrega no contiene las secciones que esta rúbrica revisa.)";

/// Advisory reading of a multiplicity word found in a condition.
pub fn quantifier_hint(quantifier: Quantifier) -> &'static str {
    match quantifier {
        Quantifier::Todos => {
            "\"todos\" significa el 100% de los elementos; si falta uno, la condición no se cumple."
        }
        Quantifier::Mayoria => "\"mayoría\" significa estrictamente más de la mitad.",
        Quantifier::AlMenosUno => {
            "\"al menos uno\" exige uno o más elementos que existan realmente en la evidencia."
        }
        Quantifier::Ninguno => "\"ninguno\" exige cero ocurrencias.",
    }
}

fn evidence_block(evidence: &str) -> &str {
    if evidence.trim().is_empty() {
        NO_EVIDENCE
    } else {
        evidence
    }
}

fn push_criteria(prompt: &mut String, criteria: &EvidenceCriteria) {
    if !criteria.keywords.is_empty() {
        let _ = writeln!(prompt, "- Palabras clave: {}", criteria.keywords.join(", "));
    }
    if !criteria.required_elements.is_empty() {
        let _ = writeln!(
            prompt,
            "- Elementos requeridos: {}",
            criteria.required_elements.join(", ")
        );
    }
    if let Some(length) = criteria.minimum_length {
        let _ = writeln!(prompt, "- Extensión mínima: {length} caracteres");
    }
    if let Some(pattern) = &criteria.pattern {
        let _ = writeln!(prompt, "- Patrón esperado: {pattern}");
    }
}

fn push_notes(prompt: &mut String, notes: &[String]) {
    if notes.is_empty() {
        return;
    }
    prompt.push_str("\n## NOTAS ACLARATORIAS\n");
    for note in notes {
        let _ = writeln!(prompt, "- {note}");
    }
}

pub fn condition_prompt(request: &ConditionRequest) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "# VERIFICACIÓN DE CONDICIÓN\n\nIndicador: {} ({})\nNivel: {} (operador {})\nDescripción del nivel: {}",
        request.indicator_name,
        request.indicator_id,
        request.level,
        request.operator.label(),
        request.level_description,
    );
    if let Some(notes) = &request.level_notes {
        let _ = writeln!(prompt, "Notas del nivel: {notes}");
    }

    let _ = writeln!(
        prompt,
        "\n## CONDICIÓN {}\n{}",
        request.condition_id, request.condition_description
    );
    push_criteria(&mut prompt, &request.criteria);
    if let Some(quantifier) = request.quantifier {
        let _ = writeln!(prompt, "\nCuantificador: {}", quantifier_hint(quantifier));
    }
    push_notes(&mut prompt, &request.clarifying_notes);

    let _ = write!(
        prompt,
        "\n## EVIDENCIA\n{}\n\n## FORMATO DE RESPUESTA\n\
{{\n  \"cumple\": true | false,\n  \"confianza\": 0.0-1.0,\n  \"evidencias_textuales\": [\"cita exacta\"],\n  \
\"justificacion\": \"explicación breve\",\n  \"que_falta_si_no_cumple\": \"qué falta, si no cumple\"\n}}",
        evidence_block(&request.evidence)
    );
    prompt
}

fn push_level(prompt: &mut String, level: &Level) {
    let _ = writeln!(
        prompt,
        "\n### {} ({:.1} puntos, operador {})\n{}",
        level.name,
        level.score,
        level.operator.label(),
        level.description
    );
    for condition in &level.conditions {
        let _ = write!(prompt, "- [{}] {}", condition.id, condition.description);
        if let Some(quantifier) = condition.quantifier {
            let _ = write!(prompt, " ({})", quantifier_hint(quantifier));
        }
        prompt.push('\n');
    }
    if let Some(notes) = &level.notes {
        let _ = writeln!(prompt, "Notas: {notes}");
    }
}

pub fn judgment_prompt(request: &JudgmentRequest) -> String {
    let rubric = &request.rubric;
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "# EVALUACIÓN DE INDICADOR\n\nIndicador: {} ({})\n{}\n\n## NIVELES",
        rubric.indicator_name, rubric.indicator_id, rubric.description
    );
    for level in rubric.levels.top_down() {
        push_level(&mut prompt, level);
    }
    let _ = writeln!(
        prompt,
        "\n### {}\n{}",
        rubric.levels.insatisfactorio.name, rubric.levels.insatisfactorio.description
    );
    push_notes(&mut prompt, &rubric.clarifying_notes);

    let _ = write!(
        prompt,
        "\n## EVIDENCIA\n{}\n\n## INSTRUCCIONES\n\
Evalúa cada condición de cada nivel por separado. Un nivel AND exige todas sus condiciones; \
un nivel OR exige al menos una. El nivel alcanzado es el más alto que se cumple. \
Un mismo identificador puede repetirse en distintos niveles: indica siempre el nivel de cada condición.\n\n\
## FORMATO DE RESPUESTA\n\
{{\n  \"nivel_alcanzado\": \"Destacado | Competente | Básico | Insatisfactorio\",\n  \"puntaje\": 1.0-4.0,\n  \
\"condiciones_evaluadas\": [{{\"condicion_id\": \"id\", \"nivel\": \"Destacado | Competente | Básico\", \"cumple\": true, \"confianza\": 0.0-1.0, \"evidencia_textual\": \"cita\", \"razon\": \"por qué\"}}],\n  \
\"justificacion\": \"texto\",\n  \"para_siguiente_nivel\": \"texto\",\n  \"fortalezas\": [\"texto\"],\n  \
\"recomendaciones\": [{{\"prioridad\": \"alta | media | baja\", \"accion\": \"texto\", \"impacto\": \"texto\"}}],\n  \
\"evidencias_destacadas\": [\"cita\"]\n}}",
        evidence_block(&request.evidence)
    );
    prompt
}

pub fn prioritization_prompt(request: &PrioritizationRequest) -> Result<String, serde_json::Error> {
    let situation = serde_json::to_string_pretty(&request.indicators)?;
    Ok(format!(
        "# PRIORIZACIÓN DE MEJORAS\n\n## SITUACIÓN ACTUAL\n{situation}\n\n## META\nAlcanzar puntaje de {:.1}\n\n\
Ordena las mejoras según su impacto en el puntaje, la facilidad de implementación \
y su efecto en varios indicadores a la vez. Usa exactamente los indicator_id entregados.\n\n\
## FORMATO DE RESPUESTA\n\
{{\n  \"recomendaciones\": [\n    {{\"prioridad\": \"alta | media | baja\", \"indicador\": \"indicator_id\", \
\"accion\": \"texto\", \"impacto_puntos\": 0.0, \"tiempo_horas\": 0.0, \"razon\": \"texto\"}}\n  ]\n}}",
        request.target_score
    ))
}
