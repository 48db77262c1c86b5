use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use crate::headers::Column;
use crate::models::{BeneficiaryDraft, Campaign, FieldError, NormalizedRow, Sex};

pub const MAX_NAME_LEN: usize = 255;
pub const MAX_ADDRESS_LEN: usize = 255;
pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NATIONAL_ID_LEN: usize = 20;
pub const AGE_OF_MAJORITY: u32 = 18;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|\+212)[5-7][0-9]{8}$").expect("valid regex"));

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    Accepted(BeneficiaryDraft),
    Rejected(Vec<FieldError>),
}

/// Whole years between `birth` and `today`.
pub fn age_on(birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

fn required_text<'a>(
    value: &'a Option<String>,
    column: Column,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match value.as_deref() {
        None => {
            errors.push(FieldError::new(column.key(), "is required"));
            None
        }
        Some(v) if v.chars().count() > max_len => {
            errors.push(FieldError::new(
                column.key(),
                format!("must not exceed {max_len} characters"),
            ));
            None
        }
        Some(v) => Some(v),
    }
}

fn optional_text(
    value: &Option<String>,
    column: Column,
    max_len: usize,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let v = value.as_ref()?;
    if v.chars().count() > max_len {
        errors.push(FieldError::new(
            column.key(),
            format!("must not exceed {max_len} characters"),
        ));
        return None;
    }
    Some(v.clone())
}

/// Apply base and assistance-type rules to one row. Errors accumulate.
pub fn validate(row: &NormalizedRow, campaign: &Campaign, today: NaiveDate) -> ValidationOutcome {
    let config = &campaign.assistance;
    let mut errors = Vec::new();

    let last_name = required_text(&row.last_name, Column::Nom, MAX_NAME_LEN, &mut errors);
    let first_name = required_text(&row.first_name, Column::Prenom, MAX_NAME_LEN, &mut errors);

    let sex = match row.sex.as_deref() {
        None => {
            errors.push(FieldError::new(Column::Sexe.key(), "is required"));
            None
        }
        Some(code) => {
            let sex = Sex::from_code(code);
            if sex.is_none() {
                errors.push(FieldError::new(
                    Column::Sexe.key(),
                    format!("must be M or F (got '{code}')"),
                ));
            }
            sex
        }
    };

    // A parse failure has already been reported; the minor check below must
    // not report the same date a second time.
    let mut birth_date_reported = false;
    let birth_date = match &row.birth_date {
        Ok(Some(date)) if *date >= today => {
            errors.push(FieldError::new(
                Column::DateNaissance.key(),
                "must be before today",
            ));
            birth_date_reported = true;
            None
        }
        Ok(date) => *date,
        Err(e) => {
            errors.push(FieldError::new(Column::DateNaissance.key(), e.to_string()));
            birth_date_reported = true;
            None
        }
    };

    let phone = match row.phone.as_deref() {
        None => {
            errors.push(FieldError::new(Column::Telephone.key(), "is required"));
            None
        }
        Some(p) if !PHONE_RE.is_match(p) => {
            errors.push(FieldError::new(
                Column::Telephone.key(),
                format!("'{p}' is not a valid mobile number (06/07/05 followed by 8 digits)"),
            ));
            None
        }
        Some(p) => Some(p.to_string()),
    };

    let email = match optional_text(&row.email, Column::Email, MAX_EMAIL_LEN, &mut errors) {
        Some(e) if !EMAIL_RE.is_match(&e) => {
            errors.push(FieldError::new(
                Column::Email.key(),
                format!("'{e}' is not a valid email address"),
            ));
            None
        }
        other => other,
    };
    let address = optional_text(&row.address, Column::Adresse, MAX_ADDRESS_LEN, &mut errors);
    let national_id =
        optional_text(&row.national_id, Column::Cin, MAX_NATIONAL_ID_LEN, &mut errors);

    let schooling = if config.schooling_required {
        match birth_date {
            Some(born) if age_on(born, today) < AGE_OF_MAJORITY => {
                if row.schooling.is_none() {
                    errors.push(FieldError::new(
                        Column::EnfantsScolarises.key(),
                        "is required for minors",
                    ));
                }
                row.schooling
            }
            Some(_) => row.schooling,
            None => {
                if !birth_date_reported {
                    errors.push(FieldError::new(
                        Column::DateNaissance.key(),
                        "birth date required to determine minor status",
                    ));
                }
                None
            }
        }
    } else {
        row.schooling
    };

    let laterality = if config.laterality_required {
        match &row.laterality {
            Ok(Some(l)) => Some(*l),
            Ok(None) => {
                errors.push(FieldError::new(Column::Laterality.key(), "is required"));
                None
            }
            Err(e) => {
                errors.push(FieldError::new(Column::Laterality.key(), e.to_string()));
                None
            }
        }
    } else {
        row.laterality.clone().ok().flatten()
    };

    match (errors.is_empty(), last_name, first_name, sex, phone) {
        (true, Some(last_name), Some(first_name), Some(sex), Some(phone)) => {
            ValidationOutcome::Accepted(BeneficiaryDraft {
                row_number: row.row_number,
                campaign_id: campaign.id,
                assistance_type_id: config.id,
                last_name: last_name.to_string(),
                first_name: first_name.to_string(),
                sex,
                birth_date,
                phone,
                email,
                address,
                national_id,
                laterality,
                schooling,
            })
        }
        _ => ValidationOutcome::Rejected(errors),
    }
}
