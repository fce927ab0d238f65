//! Database models
//!
//! The serde shapes of these types are the JSON representations served by
//! the REST API.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Area {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub area: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Program {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub group: i64,
}

/// Agency with the ids of the programs it takes part in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agency {
    pub id: i64,
    pub name: String,
    pub programs: Vec<i64>,
}

/// User account; credentials are never serialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EpicUser {
    pub id: i64,
    pub username: String,
    pub organization: Option<i64>,
    pub is_advisor: bool,
    pub is_staff: bool,
}

/// Question categories, one table each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    NationalFramework,
    KeyAgencyActions,
    Evolution,
    Linkages,
}

impl QuestionKind {
    /// Report order
    pub const ALL: [QuestionKind; 4] = [
        QuestionKind::NationalFramework,
        QuestionKind::KeyAgencyActions,
        QuestionKind::Evolution,
        QuestionKind::Linkages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::NationalFramework => "nationalframework",
            QuestionKind::KeyAgencyActions => "keyagencyactions",
            QuestionKind::Evolution => "evolution",
            QuestionKind::Linkages => "linkages",
        }
    }

    pub fn table(&self) -> &'static str {
        match self {
            QuestionKind::NationalFramework => "nationalframework_questions",
            QuestionKind::KeyAgencyActions => "keyagencyactions_questions",
            QuestionKind::Evolution => "evolution_questions",
            QuestionKind::Linkages => "linkages_questions",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            QuestionKind::NationalFramework => "National Framework",
            QuestionKind::KeyAgencyActions => "Key Agency Actions",
            QuestionKind::Evolution => "Evolution",
            QuestionKind::Linkages => "Linkages",
        }
    }

    /// National-Framework and Key-Agency-Actions share the Y/N + justify shape
    pub fn is_yes_no(&self) -> bool {
        matches!(
            self,
            QuestionKind::NationalFramework | QuestionKind::KeyAgencyActions
        )
    }
}

impl fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QuestionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown question type: {}", s)))
    }
}

/// National-Framework or Key-Agency-Actions question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct YesNoJustifyQuestion {
    pub id: i64,
    pub program: i64,
    pub title: String,
    pub description: String,
}

/// Question with four maturity-stage descriptions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct EvolutionQuestion {
    pub id: i64,
    pub program: i64,
    pub title: String,
    pub nascent_description: String,
    pub engaged_description: String,
    pub capable_description: String,
    pub effective_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LinkagesQuestion {
    pub id: i64,
    pub program: i64,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    #[serde(rename = "Y")]
    Yes,
    #[serde(rename = "N")]
    No,
}

impl YesNo {
    pub const ALL: [YesNo; 2] = [YesNo::Yes, YesNo::No];

    pub fn as_str(&self) -> &'static str {
        match self {
            YesNo::Yes => "Y",
            YesNo::No => "N",
        }
    }
}

impl FromStr for YesNo {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Y" => Ok(YesNo::Yes),
            "N" => Ok(YesNo::No),
            other => Err(Error::InvalidInput(format!("Invalid short answer: {}", other))),
        }
    }
}

/// Maturity stages of an evolution question, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvolutionTier {
    Nascent,
    Engaged,
    Capable,
    Effective,
}

impl EvolutionTier {
    pub const ALL: [EvolutionTier; 4] = [
        EvolutionTier::Nascent,
        EvolutionTier::Engaged,
        EvolutionTier::Capable,
        EvolutionTier::Effective,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EvolutionTier::Nascent => "nascent",
            EvolutionTier::Engaged => "engaged",
            EvolutionTier::Capable => "capable",
            EvolutionTier::Effective => "effective",
        }
    }
}

impl FromStr for EvolutionTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EvolutionTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Invalid evolution tier: {}", s)))
    }
}

/// Answer payload, tagged by the type of question it answers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "question_type", rename_all = "lowercase")]
pub enum AnswerValue {
    NationalFramework {
        short_answer: YesNo,
        #[serde(default)]
        justify_answer: String,
    },
    KeyAgencyActions {
        short_answer: YesNo,
        #[serde(default)]
        justify_answer: String,
    },
    Evolution {
        selected_tier: EvolutionTier,
        #[serde(default)]
        justify_answer: String,
    },
    Linkages {
        #[serde(default)]
        selected_programs: Vec<i64>,
    },
}

impl AnswerValue {
    pub fn kind(&self) -> QuestionKind {
        match self {
            AnswerValue::NationalFramework { .. } => QuestionKind::NationalFramework,
            AnswerValue::KeyAgencyActions { .. } => QuestionKind::KeyAgencyActions,
            AnswerValue::Evolution { .. } => QuestionKind::Evolution,
            AnswerValue::Linkages { .. } => QuestionKind::Linkages,
        }
    }

    pub fn justify_answer(&self) -> Option<&str> {
        match self {
            AnswerValue::NationalFramework { justify_answer, .. }
            | AnswerValue::KeyAgencyActions { justify_answer, .. }
            | AnswerValue::Evolution { justify_answer, .. } => Some(justify_answer),
            AnswerValue::Linkages { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub user: i64,
    pub question: i64,
    #[serde(flatten)]
    pub value: AnswerValue,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_evolution_question_serializes_all_stages() {
        let question = EvolutionQuestion {
            id: 1,
            program: 2,
            title: "Dimension".to_string(),
            nascent_description: String::new(),
            engaged_description: "engaged".to_string(),
            capable_description: String::new(),
            effective_description: String::new(),
        };

        let value = serde_json::to_value(&question).unwrap();
        for field in [
            "nascent_description",
            "engaged_description",
            "capable_description",
            "effective_description",
        ] {
            assert!(value.get(field).is_some(), "missing {}", field);
        }
    }

    #[test]
    fn test_user_never_serializes_credentials() {
        let user = EpicUser {
            id: 1,
            username: "alice".to_string(),
            organization: None,
            is_advisor: false,
            is_staff: true,
        };

        let value = serde_json::to_value(&user).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert!(keys.iter().all(|k| !k.contains("password")));
    }

    #[test]
    fn test_answer_flattens_question_type() {
        let answer = Answer {
            id: 3,
            user: 1,
            question: 9,
            value: AnswerValue::NationalFramework {
                short_answer: YesNo::Yes,
                justify_answer: "Because".to_string(),
            },
        };

        let value = serde_json::to_value(&answer).unwrap();
        assert_eq!(value["question_type"], "nationalframework");
        assert_eq!(value["short_answer"], "Y");
        assert_eq!(value["justify_answer"], "Because");
        assert_eq!(value["question"], 9);
    }

    #[test]
    fn test_answer_deserializes_linkages() {
        let answer: Answer = serde_json::from_value(json!({
            "id": 1,
            "user": 2,
            "question": 3,
            "question_type": "linkages",
            "selected_programs": [4, 5]
        }))
        .unwrap();

        assert_eq!(
            answer.value,
            AnswerValue::Linkages {
                selected_programs: vec![4, 5]
            }
        );
    }

    #[test]
    fn test_evolution_answer_rejects_unknown_tier() {
        let result: Result<AnswerValue, _> = serde_json::from_value(json!({
            "question_type": "evolution",
            "selected_tier": "legendary"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_question_kind_parsing() {
        assert_eq!(
            "keyagencyactions".parse::<QuestionKind>().unwrap(),
            QuestionKind::KeyAgencyActions
        );
        assert!("unknown".parse::<QuestionKind>().is_err());
        assert!(QuestionKind::NationalFramework.is_yes_no());
        assert!(!QuestionKind::Linkages.is_yes_no());
    }
}
