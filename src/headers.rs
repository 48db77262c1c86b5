use std::collections::HashMap;

use crate::error::{Result, UpasError};
use crate::models::AssistanceTypeConfig;
use crate::normalizer::fold_accents;

// ---------------------------------------------------------------------------
// Column vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Nom,
    Prenom,
    Sexe,
    DateNaissance,
    Telephone,
    Adresse,
    Email,
    Cin,
    Laterality,
    EnfantsScolarises,
}

/// Template order.
pub const ALL_COLUMNS: &[Column] = &[
    Column::Nom,
    Column::Prenom,
    Column::Sexe,
    Column::DateNaissance,
    Column::Telephone,
    Column::Adresse,
    Column::Email,
    Column::Cin,
    Column::Laterality,
    Column::EnfantsScolarises,
];

const BASE_REQUIRED: &[Column] = &[
    Column::Nom,
    Column::Prenom,
    Column::Sexe,
    Column::DateNaissance,
    Column::Telephone,
];

impl Column {
    /// Canonical header name; also the field name used in row errors.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Nom => "nom",
            Self::Prenom => "prenom",
            Self::Sexe => "sexe",
            Self::DateNaissance => "date_naissance",
            Self::Telephone => "telephone",
            Self::Adresse => "adresse",
            Self::Email => "email",
            Self::Cin => "cin",
            Self::Laterality => "laterality",
            Self::EnfantsScolarises => "enfants_scolarises",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Nom => &["surname", "last_name", "nom_de_famille"],
            Self::Prenom => &["first_name", "given_name"],
            Self::Sexe => &["sex", "genre", "gender"],
            Self::DateNaissance => &[
                "date_de_naissance",
                "birth_date",
                "birthdate",
                "date_of_birth",
                "ddn",
            ],
            Self::Telephone => &["tel", "phone", "gsm", "mobile", "numero_de_telephone"],
            Self::Adresse => &["address"],
            Self::Email => &["e_mail", "mail", "courriel"],
            Self::Cin => &["national_id", "cni"],
            Self::Laterality => &["lateralite"],
            Self::EnfantsScolarises => &["schooling_status", "scolarise", "enfant_scolarise"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Nom => "Family name",
            Self::Prenom => "Given name",
            Self::Sexe => "M or F (also accepts Masculin/Féminin, Homme/Femme)",
            Self::DateNaissance => "Birth date, e.g. 1985-03-15 or 15/03/1985",
            Self::Telephone => "Mobile number, e.g. 0612345678 or +212612345678",
            Self::Adresse => "Postal address",
            Self::Email => "Email address",
            Self::Cin => "National identity card number",
            Self::Laterality => "Unilatérale or Bilatérale",
            Self::EnfantsScolarises => "oui or non",
        }
    }

    pub fn from_header(cell: &str) -> Option<Column> {
        let key = normalize_header(cell);
        ALL_COLUMNS
            .iter()
            .find(|c| c.key() == key || c.aliases().contains(&key.as_str()))
            .copied()
    }
}

/// Trim, lowercase, drop accents and turn separators into underscores.
pub fn normalize_header(cell: &str) -> String {
    let folded = fold_accents(cell.trim()).to_lowercase();
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = if c == ' ' || c == '-' || c == '.' || c == '\'' { '_' } else { c };
        if c == '_' && (out.is_empty() || out.ends_with('_')) {
            continue;
        }
        out.push(c);
    }
    out.trim_end_matches('_').to_string()
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    RequiredForMinors,
    Optional,
}

impl Requirement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::RequiredForMinors => "required for minors",
            Self::Optional => "optional",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    pub column: Column,
    pub requirement: Requirement,
}

pub fn requirement_for(column: Column, config: &AssistanceTypeConfig) -> Requirement {
    match column {
        c if BASE_REQUIRED.contains(&c) => Requirement::Required,
        Column::Laterality if config.laterality_required => Requirement::Required,
        Column::EnfantsScolarises if config.schooling_required => Requirement::RequiredForMinors,
        _ => Requirement::Optional,
    }
}

/// Column contract for an assistance type; shared by the header gate and the
/// template generator.
pub fn template_columns(config: &AssistanceTypeConfig) -> Vec<ColumnSpec> {
    ALL_COLUMNS
        .iter()
        .map(|&column| ColumnSpec {
            column,
            requirement: requirement_for(column, config),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Header gate
// ---------------------------------------------------------------------------

/// Position of each recognised column in the header row.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    positions: HashMap<Column, usize>,
}

impl HeaderMap {
    pub fn index_of(&self, column: Column) -> Option<usize> {
        self.positions.get(&column).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = (Column, usize)> + '_ {
        self.positions.iter().map(|(c, i)| (*c, *i))
    }
}

pub fn map_headers(header_cells: &[String]) -> HeaderMap {
    let mut positions = HashMap::new();
    for (idx, cell) in header_cells.iter().enumerate() {
        match Column::from_header(cell) {
            Some(column) => {
                if positions.contains_key(&column) {
                    tracing::warn!(column = column.key(), position = idx + 1, "repeated column ignored");
                } else {
                    positions.insert(column, idx);
                }
            }
            None if !cell.trim().is_empty() => {
                tracing::debug!(header = %cell.trim(), "unknown column ignored");
            }
            None => {}
        }
    }
    HeaderMap { positions }
}

/// Fail fast when a mandatory column is absent from the header row.
pub fn check_headers(header_cells: &[String], config: &AssistanceTypeConfig) -> Result<HeaderMap> {
    let map = map_headers(header_cells);
    let missing: Vec<String> = template_columns(config)
        .into_iter()
        .filter(|spec| spec.requirement == Requirement::Required)
        .filter(|spec| map.index_of(spec.column).is_none())
        .map(|spec| spec.column.key().to_string())
        .collect();
    if missing.is_empty() {
        Ok(map)
    } else {
        Err(UpasError::MissingColumns(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(laterality: bool, schooling: bool) -> AssistanceTypeConfig {
        AssistanceTypeConfig {
            id: 1,
            name: "Test".into(),
            laterality_required: laterality,
            schooling_required: schooling,
        }
    }

    fn cells(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header("  Date de naissance "), "date_de_naissance");
        assert_eq!(normalize_header("PRÉNOM"), "prenom");
        assert_eq!(normalize_header("Téléphone"), "telephone");
        assert_eq!(normalize_header("e-mail"), "e_mail");
        assert_eq!(normalize_header("enfants  scolarisés"), "enfants_scolarises");
    }

    #[test]
    fn test_from_header_aliases() {
        assert_eq!(Column::from_header("Nom"), Some(Column::Nom));
        assert_eq!(Column::from_header("Surname"), Some(Column::Nom));
        assert_eq!(Column::from_header("Prénom"), Some(Column::Prenom));
        assert_eq!(Column::from_header("Date de naissance"), Some(Column::DateNaissance));
        assert_eq!(Column::from_header("GSM"), Some(Column::Telephone));
        assert_eq!(Column::from_header("Latéralité"), Some(Column::Laterality));
        assert_eq!(Column::from_header("laterality"), Some(Column::Laterality));
        assert_eq!(Column::from_header("Schooling status"), Some(Column::EnfantsScolarises));
        assert_eq!(Column::from_header("observations"), None);
    }

    #[test]
    fn test_check_headers_accepts_base_set() {
        let header = cells(&["nom", "prenom", "sexe", "date_naissance", "telephone", "adresse"]);
        let map = check_headers(&header, &config(false, false)).unwrap();
        assert_eq!(map.index_of(Column::Nom), Some(0));
        assert_eq!(map.index_of(Column::Adresse), Some(5));
        assert_eq!(map.index_of(Column::Email), None);
    }

    #[test]
    fn test_check_headers_reports_every_missing_column() {
        let header = cells(&["nom", "prenom"]);
        match check_headers(&header, &config(false, false)) {
            Err(UpasError::MissingColumns(missing)) => {
                assert_eq!(missing, vec!["sexe", "date_naissance", "telephone"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_laterality_column_required_when_configured() {
        let header = cells(&["nom", "prenom", "sexe", "date_naissance", "telephone"]);
        assert!(check_headers(&header, &config(false, false)).is_ok());
        match check_headers(&header, &config(true, false)) {
            Err(UpasError::MissingColumns(missing)) => assert_eq!(missing, vec!["laterality"]),
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }

    #[test]
    fn test_schooling_column_never_header_mandatory() {
        let header = cells(&["nom", "prenom", "sexe", "date_naissance", "telephone"]);
        assert!(check_headers(&header, &config(false, true)).is_ok());
    }

    #[test]
    fn test_repeated_column_keeps_first() {
        let header = cells(&["nom", "prenom", "nom", "sexe", "date_naissance", "telephone"]);
        let map = check_headers(&header, &config(false, false)).unwrap();
        assert_eq!(map.index_of(Column::Nom), Some(0));
    }

    #[test]
    fn test_template_columns_contract() {
        let specs = template_columns(&config(true, true));
        let req = |c: Column| specs.iter().find(|s| s.column == c).unwrap().requirement;
        assert_eq!(specs.len(), ALL_COLUMNS.len());
        assert_eq!(req(Column::Nom), Requirement::Required);
        assert_eq!(req(Column::Laterality), Requirement::Required);
        assert_eq!(req(Column::EnfantsScolarises), Requirement::RequiredForMinors);
        assert_eq!(req(Column::Email), Requirement::Optional);

        let plain = template_columns(&config(false, false));
        let req = |c: Column| plain.iter().find(|s| s.column == c).unwrap().requirement;
        assert_eq!(req(Column::Laterality), Requirement::Optional);
        assert_eq!(req(Column::EnfantsScolarises), Requirement::Optional);
    }
}
