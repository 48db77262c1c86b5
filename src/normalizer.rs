use chrono::NaiveDate;

use crate::headers::Column;
use crate::models::{Laterality, Normalized, NormalizationError, NormalizedRow};
use crate::reader::RawRow;

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Replace Latin accented letters with their unaccented base letter.
pub fn fold_accents(raw: &str) -> String {
    raw.chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' => 'a',
            'À' | 'Á' | 'Â' | 'Ä' | 'Ã' => 'A',
            'ç' => 'c',
            'Ç' => 'C',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'È' | 'É' | 'Ê' | 'Ë' => 'E',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
            'ò' | 'ó' | 'ô' | 'ö' | 'õ' => 'o',
            'Ò' | 'Ó' | 'Ô' | 'Ö' | 'Õ' => 'O',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
            other => other,
        })
        .collect()
}

fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Sex
// ---------------------------------------------------------------------------

/// Map the sex vocabulary onto `M`/`F`. Unknown values come back uppercased
/// so the validator can reject them.
pub fn normalize_sex(raw: &str) -> String {
    let upper = fold_accents(raw.trim()).to_uppercase();
    match upper.as_str() {
        "M" | "H" | "MASCULIN" | "HOMME" | "MALE" => "M".to_string(),
        "F" | "FEMININ" | "FEMME" | "FEMALE" => "F".to_string(),
        _ => upper,
    }
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%y", "%d-%m-%y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M"];

pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    // Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug)
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(chrono::Duration::days(serial.trunc() as i64))
}

/// Parse a birth date cell. Empty input is "no value", not an error.
pub fn parse_date(raw: &str) -> Normalized<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            // Reject lenient matches such as "5/3/1985" against "%d/%m/%Y".
            if date.format(fmt).to_string() == raw {
                return Ok(Some(date));
            }
        }
    }
    parse_date_loose(raw)
        .map(Some)
        .ok_or_else(|| NormalizationError("invalid date format".to_string()))
}

fn parse_date_loose(raw: &str) -> Option<NaiveDate> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }

    // Day-first numeric dates with any separator and no zero padding.
    let parts: Vec<&str> = raw
        .split(|c: char| c == '/' || c == '-' || c == '.' || c == ' ')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() == 3 && parts.iter().all(|p| p.chars().all(|c| c.is_ascii_digit())) {
        let nums: Vec<u32> = parts.iter().filter_map(|p| p.parse().ok()).collect();
        if nums.len() == 3 {
            return if parts[0].len() == 4 {
                NaiveDate::from_ymd_opt(nums[0] as i32, nums[1], nums[2])
            } else {
                let year = match parts[2].len() {
                    4 => nums[2] as i32,
                    2 => expand_two_digit_year(nums[2]),
                    _ => return None,
                };
                NaiveDate::from_ymd_opt(year, nums[1], nums[0])
            };
        }
    }

    // Numeric spreadsheet cells holding an Excel serial day count. Bare years
    // such as "1985" fall below this range and stay invalid.
    let serial: f64 = raw.parse().ok()?;
    if (3000.0..=2_958_465.0).contains(&serial) {
        return excel_serial_to_date(serial);
    }
    None
}

/// Same pivot chrono applies to `%y`: 69-99 → 19xx, 00-68 → 20xx.
fn expand_two_digit_year(yy: u32) -> i32 {
    if yy >= 69 {
        1900 + yy as i32
    } else {
        2000 + yy as i32
    }
}

// ---------------------------------------------------------------------------
// Phone / email / identity
// ---------------------------------------------------------------------------

/// Canonical national phone format. Shape is not validated here.
pub fn normalize_phone(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        digits.insert(0, '+');
    }
    for prefix in ["+212", "00212", "212"] {
        if let Some(rest) = digits.strip_prefix(prefix) {
            if !rest.is_empty() {
                return format!("0{rest}");
            }
        }
    }
    // Numeric spreadsheet cells drop the leading zero of mobile numbers.
    if digits.len() == 9 && matches!(digits.as_bytes()[0], b'5' | b'6' | b'7') {
        return format!("0{digits}");
    }
    digits
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn normalize_national_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

// ---------------------------------------------------------------------------
// Assistance-specific enumerations
// ---------------------------------------------------------------------------

pub fn parse_laterality(raw: &str) -> Normalized<Laterality> {
    let key = fold_accents(raw.trim()).to_lowercase();
    match key.as_str() {
        "" => Ok(None),
        "unilaterale" | "unilateral" | "uni" => Ok(Some(Laterality::Unilaterale)),
        "bilaterale" | "bilateral" | "bi" => Ok(Some(Laterality::Bilaterale)),
        _ => Err(NormalizationError(
            "must be Unilatérale or Bilatérale".to_string(),
        )),
    }
}

/// Any non-empty answer counts as a schooling status. Negative words and
/// zero mean no; anything else (`oui`, a child count, ...) means yes.
pub fn parse_schooling(raw: &str) -> Option<bool> {
    let key = fold_accents(raw.trim()).to_lowercase();
    match key.as_str() {
        "" => None,
        "non" | "n" | "no" | "0" | "false" | "faux" | "aucun" => Some(false),
        _ => Some(true),
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

pub fn normalize_row(raw: &RawRow) -> NormalizedRow {
    NormalizedRow {
        row_number: raw.row_number,
        last_name: non_empty(raw.get(Column::Nom)),
        first_name: non_empty(raw.get(Column::Prenom)),
        sex: non_empty(raw.get(Column::Sexe)).map(|s| normalize_sex(&s)),
        birth_date: raw.get(Column::DateNaissance).map_or(Ok(None), parse_date),
        // A cell with no digits keeps its text so the validator can report it.
        phone: non_empty(raw.get(Column::Telephone)).map(|p| {
            let phone = normalize_phone(&p);
            if phone.is_empty() {
                p
            } else {
                phone
            }
        }),
        email: non_empty(raw.get(Column::Email)).map(|e| normalize_email(&e)),
        address: non_empty(raw.get(Column::Adresse)),
        national_id: non_empty(raw.get(Column::Cin)).map(|c| normalize_national_id(&c)),
        laterality: raw.get(Column::Laterality).map_or(Ok(None), parse_laterality),
        schooling: raw.get(Column::EnfantsScolarises).and_then(parse_schooling),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_normalize_sex_vocabulary() {
        assert_eq!(normalize_sex("m"), "M");
        assert_eq!(normalize_sex(" Masculin "), "M");
        assert_eq!(normalize_sex("homme"), "M");
        assert_eq!(normalize_sex("MALE"), "M");
        assert_eq!(normalize_sex("féminin"), "F");
        assert_eq!(normalize_sex("Femme"), "F");
        assert_eq!(normalize_sex("female"), "F");
    }

    #[test]
    fn test_normalize_sex_passes_unknown_through() {
        assert_eq!(normalize_sex("x"), "X");
        assert_eq!(normalize_sex("autre"), "AUTRE");
    }

    #[test]
    fn test_parse_date_strict_formats() {
        assert_eq!(parse_date("1985-03-15"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("15/03/1985"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("15-03-1985"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("1985/03/15"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("15/03/85"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("01-02-10"), Ok(Some(ymd(2010, 2, 1))));
    }

    #[test]
    fn test_parse_date_fallbacks() {
        assert_eq!(parse_date("5/3/1985"), Ok(Some(ymd(1985, 3, 5))));
        assert_eq!(parse_date("15.03.1985"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("1985-03-15 00:00:00"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("1985-03-15T10:30:00"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(parse_date("45667"), Ok(Some(ymd(2025, 1, 10))));
    }

    #[test]
    fn test_parse_date_empty_is_no_value() {
        assert_eq!(parse_date(""), Ok(None));
        assert_eq!(parse_date("   "), Ok(None));
    }

    #[test]
    fn test_parse_date_rejects_garbage_and_impossible_dates() {
        let err = Err(NormalizationError("invalid date format".to_string()));
        assert_eq!(parse_date("not a date"), err);
        assert_eq!(parse_date("1985"), err);
        assert_eq!(parse_date("31/02/1990"), err);
        assert_eq!(parse_date("15/13/1990"), err);
    }

    #[test]
    fn test_normalize_phone_international_prefixes() {
        assert_eq!(normalize_phone("+212612345678"), "0612345678");
        assert_eq!(normalize_phone("212612345678"), "0612345678");
        assert_eq!(normalize_phone("00212 6 12 34 56 78"), "0612345678");
        assert_eq!(normalize_phone("+212 (6) 12-34-56-78"), "0612345678");
    }

    #[test]
    fn test_normalize_phone_strips_formatting() {
        assert_eq!(normalize_phone("06.12.34.56.78"), "0612345678");
        assert_eq!(normalize_phone(" 06 12 34 56 78 "), "0612345678");
    }

    #[test]
    fn test_normalize_phone_restores_dropped_leading_zero() {
        assert_eq!(normalize_phone("612345678"), "0612345678");
        // Not a mobile prefix: left alone for the validator to reject.
        assert_eq!(normalize_phone("312345678"), "312345678");
    }

    #[test]
    fn test_normalize_phone_does_not_validate_shape() {
        assert_eq!(normalize_phone("12"), "12");
        assert_eq!(normalize_phone("abc"), "");
    }

    #[test]
    fn test_parse_laterality_accent_and_case_insensitive() {
        assert_eq!(parse_laterality("unilatérale"), Ok(Some(Laterality::Unilaterale)));
        assert_eq!(parse_laterality("UNILATERALE"), Ok(Some(Laterality::Unilaterale)));
        assert_eq!(parse_laterality("Bilatérale"), Ok(Some(Laterality::Bilaterale)));
        assert_eq!(parse_laterality("bilateral"), Ok(Some(Laterality::Bilaterale)));
        assert_eq!(parse_laterality(""), Ok(None));
        assert!(parse_laterality("gauche").is_err());
    }

    #[test]
    fn test_parse_schooling() {
        assert_eq!(parse_schooling("oui"), Some(true));
        assert_eq!(parse_schooling("Non"), Some(false));
        assert_eq!(parse_schooling("1"), Some(true));
        assert_eq!(parse_schooling("2"), Some(true));
        assert_eq!(parse_schooling("0"), Some(false));
        assert_eq!(parse_schooling("  "), None);
    }

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Prénom Féminin à Fès"), "Prenom Feminin a Fes");
    }

    #[test]
    fn test_persisted_values_are_fixed_points() {
        // Values as written to storage must normalize to themselves.
        assert_eq!(normalize_sex("M"), "M");
        assert_eq!(normalize_sex("F"), "F");
        assert_eq!(normalize_phone("0612345678"), "0612345678");
        assert_eq!(parse_date("1985-03-15"), Ok(Some(ymd(1985, 3, 15))));
        assert_eq!(
            parse_laterality(Laterality::Unilaterale.label()),
            Ok(Some(Laterality::Unilaterale))
        );
        assert_eq!(
            parse_laterality(Laterality::Bilaterale.label()),
            Ok(Some(Laterality::Bilaterale))
        );
        assert_eq!(normalize_email("a.b@example.ma"), "a.b@example.ma");
        assert_eq!(normalize_national_id("AB123456"), "AB123456");
    }

    #[test]
    fn test_normalize_row_keeps_unusable_phone_text() {
        let header: Vec<String> = ["nom", "telephone", "enfants_scolarises"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let map = crate::headers::map_headers(&header);
        let cells: Vec<String> = ["Alami", " abc ", "3"].iter().map(|s| s.to_string()).collect();
        let row = normalize_row(&RawRow::from_cells(2, &cells, &map));
        assert_eq!(row.phone.as_deref(), Some("abc"));
        assert_eq!(row.schooling, Some(true));
    }
}
