//! Report document structure
//!
//! The report is a flat sequence of [`Flowable`]s that the PDF renderer lays
//! out top to bottom, breaking pages as needed.

use chrono::{DateTime, Utc};
use epic_common::time::format_timestamp;

use super::summary::{ProgramReport, QuestionReport};

/// Values drawn as one bar per label
#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub labels: Vec<String>,
    pub values: Vec<usize>,
}

impl BarChart {
    pub fn from_question(question: &QuestionReport) -> Self {
        Self {
            labels: question.tallies.iter().map(|t| t.label.clone()).collect(),
            values: question.tallies.iter().map(|t| t.count).collect(),
        }
    }

    /// Top of the value axis; never below 1
    pub fn axis_max(&self) -> usize {
        self.values.iter().sum::<usize>().max(1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flowable {
    /// Levels 1 and 2 appear in the table of contents
    Heading { level: u8, text: String },
    Paragraph(String),
    /// Vertical gap in points
    Spacer(f32),
    BarChart(BarChart),
    PageBreak,
    TableOfContents,
}

impl Flowable {
    fn heading(level: u8, text: impl Into<String>) -> Self {
        Flowable::Heading {
            level,
            text: text.into(),
        }
    }

    fn paragraph(text: impl Into<String>) -> Self {
        Flowable::Paragraph(text.into())
    }
}

/// Report-wide texts
#[derive(Debug, Clone)]
pub struct ReportMeta {
    pub title: String,
    pub subtitle: String,
    pub description: String,
    /// Username of whoever requested the report
    pub author: String,
    pub generated_at: DateTime<Utc>,
}

/// Lay out the whole report
///
/// The first page is left to the title; the renderer draws it.
pub fn build_flowables(meta: &ReportMeta, programs: &[ProgramReport]) -> Vec<Flowable> {
    let mut flowables = vec![
        Flowable::Spacer(36.0),
        Flowable::PageBreak,
        Flowable::heading(1, "Abstract"),
        Flowable::paragraph(meta.description.clone()),
        Flowable::paragraph(format!("Requested by: {}", meta.author)),
        Flowable::paragraph(format!(
            "Generated on: {}",
            format_timestamp(&meta.generated_at)
        )),
        Flowable::PageBreak,
        Flowable::TableOfContents,
        Flowable::PageBreak,
    ];

    for program in programs {
        flowables.push(Flowable::heading(1, format!("Program: {}", program.name)));

        if program.questions.is_empty() {
            flowables.push(Flowable::paragraph("No questions available."));
        }

        for question in &program.questions {
            flowables.extend(question_flowables(question));
        }

        flowables.push(Flowable::PageBreak);
    }

    flowables
}

fn question_flowables(question: &QuestionReport) -> Vec<Flowable> {
    let mut flowables = vec![Flowable::heading(2, question.title.clone())];

    if question.answers == 0 {
        flowables.push(Flowable::paragraph("No recorded answers."));
        return flowables;
    }

    flowables.push(Flowable::heading(3, "Answers:"));
    // Linkages answers may only name programs that are gone
    if !question.tallies.is_empty() {
        flowables.push(Flowable::BarChart(BarChart::from_question(question)));
    }

    flowables.push(Flowable::heading(3, "Justifications:"));
    for group in &question.justifications {
        flowables.push(Flowable::paragraph(format!("Justify {}:", group.label)));
        flowables.extend(group.texts.iter().cloned().map(Flowable::Paragraph));
    }

    flowables.push(Flowable::Spacer(12.0));
    flowables
}
