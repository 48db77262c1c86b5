use std::collections::HashMap;

use serde::Serialize;

use crate::db::BeneficiaryStore;
use crate::error::Result;
use crate::models::BeneficiaryDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchedBy {
    Phone,
    NameAndBirthdate,
}

impl MatchedBy {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::NameAndBirthdate => "name+birthdate",
        }
    }
}

/// Where the earlier copy of a duplicate lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExistingRef {
    Stored(i64),
    Batch(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateVerdict {
    Unique,
    DuplicateOf {
        existing: ExistingRef,
        matched_by: MatchedBy,
    },
}

impl DuplicateVerdict {
    pub fn describe(&self) -> Option<String> {
        match self {
            Self::Unique => None,
            Self::DuplicateOf {
                existing: ExistingRef::Stored(id),
                matched_by,
            } => Some(format!(
                "duplicate of beneficiary #{id} (matched by {}), row skipped",
                matched_by.label()
            )),
            Self::DuplicateOf {
                existing: ExistingRef::Batch(row),
                matched_by,
            } => Some(format!(
                "duplicate of row {row} in this file (matched by {}), row skipped",
                matched_by.label()
            )),
        }
    }
}

/// Phones of rows already accepted earlier in the same file.
#[derive(Debug, Clone, Default)]
pub struct SeenInBatch {
    phones: HashMap<String, usize>,
}

impl SeenInBatch {
    pub fn insert(&mut self, draft: &BeneficiaryDraft) {
        self.phones
            .entry(draft.phone.clone())
            .or_insert(draft.row_number);
    }

    pub fn row_for_phone(&self, phone: &str) -> Option<usize> {
        self.phones.get(phone).copied()
    }
}

/// First match wins: stored phone, stored name + birth date, batch phone.
pub fn check<S: BeneficiaryStore + ?Sized>(
    candidate: &BeneficiaryDraft,
    store: &S,
    seen: &SeenInBatch,
) -> Result<DuplicateVerdict> {
    if let Some(id) = store.find_by_phone(&candidate.phone)? {
        return Ok(DuplicateVerdict::DuplicateOf {
            existing: ExistingRef::Stored(id),
            matched_by: MatchedBy::Phone,
        });
    }
    if let Some(birth_date) = candidate.birth_date {
        if let Some(id) =
            store.find_by_identity(&candidate.last_name, &candidate.first_name, birth_date)?
        {
            return Ok(DuplicateVerdict::DuplicateOf {
                existing: ExistingRef::Stored(id),
                matched_by: MatchedBy::NameAndBirthdate,
            });
        }
    }
    if let Some(row) = seen.row_for_phone(&candidate.phone) {
        return Ok(DuplicateVerdict::DuplicateOf {
            existing: ExistingRef::Batch(row),
            matched_by: MatchedBy::Phone,
        });
    }
    Ok(DuplicateVerdict::Unique)
}
