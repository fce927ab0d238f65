//! Per-program answer aggregation

use epic_common::db::{AnswerValue, EvolutionTier, Program, QuestionKind, YesNo};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;

use crate::db::{answers, programs, questions};

/// Number of answers carrying one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tally {
    pub label: String,
    pub count: usize,
}

/// Non-empty justification texts given together with one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JustificationGroup {
    pub label: String,
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionReport {
    pub question_type: QuestionKind,
    pub id: i64,
    pub title: String,
    pub answers: usize,
    pub tallies: Vec<Tally>,
    pub justifications: Vec<JustificationGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramReport {
    pub id: i64,
    pub name: String,
    pub questions: Vec<QuestionReport>,
}

/// Aggregate the answers to one question
///
/// Yes/no and evolution questions tally every possible label, zero counts
/// included. Linkages questions tally only the programs actually selected,
/// by name; ids without a program are ignored.
pub fn summarize_question(
    kind: QuestionKind,
    id: i64,
    title: &str,
    answers: &[AnswerValue],
    program_names: &HashMap<i64, String>,
) -> QuestionReport {
    // (label, justification) per answer, or one label per selected program
    let mut labelled: Vec<(String, Option<&str>)> = Vec::new();
    let mut labels: Vec<String> = match kind {
        QuestionKind::NationalFramework | QuestionKind::KeyAgencyActions => {
            YesNo::ALL.iter().map(|v| v.as_str().to_string()).collect()
        }
        QuestionKind::Evolution => EvolutionTier::ALL
            .iter()
            .map(|t| t.as_str().to_string())
            .collect(),
        QuestionKind::Linkages => Vec::new(),
    };

    for answer in answers.iter().filter(|a| a.kind() == kind) {
        match answer {
            AnswerValue::NationalFramework {
                short_answer,
                justify_answer,
            }
            | AnswerValue::KeyAgencyActions {
                short_answer,
                justify_answer,
            } => labelled.push((short_answer.as_str().to_string(), Some(justify_answer.as_str()))),
            AnswerValue::Evolution {
                selected_tier,
                justify_answer,
            } => labelled.push((selected_tier.as_str().to_string(), Some(justify_answer.as_str()))),
            AnswerValue::Linkages { selected_programs } => {
                for name in selected_programs.iter().filter_map(|p| program_names.get(p)) {
                    labelled.push((name.clone(), None));
                }
            }
        }
    }

    if kind == QuestionKind::Linkages {
        labels = labelled.iter().map(|(label, _)| label.clone()).collect();
        labels.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        labels.dedup();
    }

    let tallies = labels
        .iter()
        .map(|label| Tally {
            label: label.clone(),
            count: labelled.iter().filter(|(l, _)| l == label).count(),
        })
        .collect();

    let justifications = labels
        .iter()
        .filter_map(|label| {
            let texts: Vec<String> = labelled
                .iter()
                .filter(|(l, _)| l == label)
                .filter_map(|(_, text)| *text)
                .filter(|text| !text.trim().is_empty())
                .map(str::to_string)
                .collect();
            (!texts.is_empty()).then(|| JustificationGroup {
                label: label.clone(),
                texts,
            })
        })
        .collect();

    QuestionReport {
        question_type: kind,
        id,
        title: title.to_string(),
        answers: answers.iter().filter(|a| a.kind() == kind).count(),
        tallies,
        justifications,
    }
}

/// Build the report data, programs ordered by name
///
/// `program` restricts the report to a single program.
pub async fn build_summary(
    pool: &SqlitePool,
    program: Option<i64>,
) -> sqlx::Result<Vec<ProgramReport>> {
    let all_programs = programs::list_programs_by_name(pool).await?;
    let program_names: HashMap<i64, String> = all_programs
        .iter()
        .map(|p| (p.id, p.name.clone()))
        .collect();

    let selected: Vec<&Program> = all_programs
        .iter()
        .filter(|p| program.map_or(true, |id| p.id == id))
        .collect();

    let mut reports = Vec::with_capacity(selected.len());
    for program in selected {
        let mut question_reports = Vec::new();
        for kind in QuestionKind::ALL {
            for header in questions::list_headers(pool, kind, Some(program.id)).await? {
                let values = answers::answers_for_question(pool, kind, header.id).await?;
                question_reports.push(summarize_question(
                    kind,
                    header.id,
                    &header.title,
                    &values,
                    &program_names,
                ));
            }
        }

        reports.push(ProgramReport {
            id: program.id,
            name: program.name.clone(),
            questions: question_reports,
        });
    }

    Ok(reports)
}
