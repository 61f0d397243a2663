// src/models/person.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Represents the 'da_personal_details' table in the database.
///
/// `email` carries no uniqueness constraint, so several rows can share one
/// address. The reconciler collapses those.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PersonRecord {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub essay1_answer: Option<String>,
    pub essay2_answer: Option<String>,
}

impl PersonRecord {
    pub fn essay(&self, field: EssayField) -> Option<&str> {
        let value = match field {
            EssayField::Essay1 => self.essay1_answer.as_deref(),
            EssayField::Essay2 => self.essay2_answer.as_deref(),
        };
        value.filter(|v| !v.is_empty())
    }

    pub fn set_essay(&mut self, field: EssayField, value: String) {
        match field {
            EssayField::Essay1 => self.essay1_answer = Some(value),
            EssayField::Essay2 => self.essay2_answer = Some(value),
        }
    }
}

/// The two free-text answers a person record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssayField {
    Essay1,
    Essay2,
}

impl EssayField {
    pub const ALL: [EssayField; 2] = [EssayField::Essay1, EssayField::Essay2];

    /// Ledger key and question id of the essay.
    pub fn key(self) -> &'static str {
        match self {
            EssayField::Essay1 => "essay1",
            EssayField::Essay2 => "essay2",
        }
    }
}

/// Insert payload for a new person record.
#[derive(Debug, Clone)]
pub struct NewPerson {
    pub name: String,
    pub email: String,
}

/// Partial update of a person record. `None` leaves a column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersonFieldsUpdate {
    pub essay1_answer: Option<String>,
    pub essay2_answer: Option<String>,
}

impl PersonFieldsUpdate {
    pub fn is_empty(&self) -> bool {
        self.essay1_answer.is_none() && self.essay2_answer.is_none()
    }

    pub fn set(&mut self, field: EssayField, value: String) {
        match field {
            EssayField::Essay1 => self.essay1_answer = Some(value),
            EssayField::Essay2 => self.essay2_answer = Some(value),
        }
    }

    pub fn get(&self, field: EssayField) -> Option<&str> {
        match field {
            EssayField::Essay1 => self.essay1_answer.as_deref(),
            EssayField::Essay2 => self.essay2_answer.as_deref(),
        }
    }

    /// Fields that carry a value, in column order.
    pub fn fields(&self) -> Vec<EssayField> {
        EssayField::ALL
            .into_iter()
            .filter(|f| self.get(*f).is_some())
            .collect()
    }
}

/// DTO for registering a participant.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name length must be between 1 and 100 characters."
    ))]
    pub name: String,
    #[validate(email(message = "A valid email address is required."))]
    pub email: String,
}

impl RegisterRequest {
    /// Emails are stored trimmed and lowercased at registration.
    pub fn into_new_person(self) -> NewPerson {
        NewPerson {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> PersonRecord {
        PersonRecord {
            id: Uuid::new_v4(),
            name: "Sari".to_string(),
            email: Some("sari@example.com".to_string()),
            created_at: Utc::now(),
            essay1_answer: Some(String::new()),
            essay2_answer: None,
        }
    }

    #[test]
    fn empty_essay_reads_as_absent() {
        let p = person();
        assert_eq!(p.essay(EssayField::Essay1), None);
        assert_eq!(p.essay(EssayField::Essay2), None);
    }

    #[test]
    fn update_lists_only_set_fields() {
        let mut update = PersonFieldsUpdate::default();
        assert!(update.is_empty());
        update.set(EssayField::Essay2, "text".to_string());
        assert_eq!(update.fields(), vec![EssayField::Essay2]);
    }

    #[test]
    fn register_request_normalizes_email() {
        let req = RegisterRequest {
            name: "  Budi ".to_string(),
            email: " Budi@Example.COM ".to_string(),
        };
        let new_person = req.into_new_person();
        assert_eq!(new_person.name, "Budi");
        assert_eq!(new_person.email, "budi@example.com");
    }

    #[test]
    fn register_request_rejects_bad_email() {
        let req = RegisterRequest {
            name: "Budi".to_string(),
            email: "not-an-email".to_string(),
        };
        assert!(req.validate().is_err());
    }
}
