//! Typed entity records

use serde::Serialize;

use super::decode::{int_field, optional_text_field, text_field};
use super::{field, kind, reference};
use crate::error::{EngineError, EngineResult};
use crate::storage::{ObjectId, StoredObject};

fn expect_kind(object: &StoredObject, expected: &str) -> EngineResult<()> {
    if object.kind == expected {
        Ok(())
    } else {
        Err(EngineError::NotFound(format!(
            "{} {} (object is a {})",
            expected, object.id, object.kind
        )))
    }
}

/// A Prompt: instruction template + code fragment, with its rank.
#[derive(Debug, Clone, Serialize)]
pub struct PromptRecord {
    pub id: ObjectId,
    pub instruct: String,
    pub code: String,
    pub rank: i64,
    #[serde(rename = "gitURL")]
    pub git_url: Option<String>,
    /// Compare-and-swap token for rank updates
    #[serde(skip)]
    pub version: u64,
    /// `hasResponse` targets (exactly one once generation completed)
    pub response_ids: Vec<ObjectId>,
    /// `hasSemanticMeaning` targets (zero or one)
    pub semantic_meaning_ids: Vec<ObjectId>,
}

impl PromptRecord {
    pub fn from_object(object: &StoredObject) -> EngineResult<Self> {
        expect_kind(object, kind::PROMPT)?;
        Ok(Self {
            id: object.id.clone(),
            instruct: text_field(&object.properties, field::INSTRUCT)?,
            code: text_field(&object.properties, field::CODE)?,
            rank: int_field(&object.properties, field::RANK)?,
            git_url: optional_text_field(&object.properties, field::GIT_URL)?,
            version: object.version,
            response_ids: object.reference(reference::HAS_RESPONSE).to_vec(),
            semantic_meaning_ids: object.reference(reference::HAS_SEMANTIC_MEANING).to_vec(),
        })
    }

    /// The linked Response, or `MissingResponse` if generation never linked one.
    pub fn response_id(&self) -> EngineResult<&ObjectId> {
        self.response_ids
            .first()
            .ok_or_else(|| EngineError::MissingResponse(self.id.clone()))
    }
}

/// A generated explanation.
#[derive(Debug, Clone, Serialize)]
pub struct ResponseRecord {
    pub id: ObjectId,
    pub response: String,
}

impl ResponseRecord {
    pub fn from_object(object: &StoredObject) -> EngineResult<Self> {
        expect_kind(object, kind::RESPONSE)?;
        Ok(Self {
            id: object.id.clone(),
            response: text_field(&object.properties, field::RESPONSE)?,
        })
    }
}

/// A short summary of what a code fragment is for.
#[derive(Debug, Clone, Serialize)]
pub struct SemanticMeaningRecord {
    pub id: ObjectId,
    pub semantic_meaning: String,
    /// `hasPrompt` back-links
    pub prompt_ids: Vec<ObjectId>,
}

impl SemanticMeaningRecord {
    pub fn from_object(object: &StoredObject) -> EngineResult<Self> {
        expect_kind(object, kind::SEMANTIC_MEANING)?;
        Ok(Self {
            id: object.id.clone(),
            semantic_meaning: text_field(&object.properties, field::SEMANTIC_MEANING)?,
            prompt_ids: object.reference(reference::HAS_PROMPT).to_vec(),
        })
    }
}
