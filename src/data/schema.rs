//! Source Schema Module
//! Column aliases for the three published datasets.

use serde::Serialize;
use std::collections::HashMap;

/// One of the three input datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Personnel,
    Enrollment,
    Ips,
}

/// A column the pipeline consumes, independent of how a source spells it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Commune,
    Department,
    Academie,
    Sector,
    Nature,
    Year,
    TeachingStaff,
    LifeStaff,
    AdminStaff,
    Students,
    Level6,
    Level5,
    Level4,
    Level3,
    Segpa,
    Ulis,
    Ips,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [
        SourceKind::Personnel,
        SourceKind::Enrollment,
        SourceKind::Ips,
    ];

    /// Human readable dataset name, used in errors and citations.
    pub fn label(&self) -> &'static str {
        match self {
            SourceKind::Personnel => "Indicateurs personnels",
            SourceKind::Enrollment => "Effectifs élèves",
            SourceKind::Ips => "Indice de position sociale",
        }
    }

    /// Short citation tag shown next to column headers.
    pub fn tag(&self) -> &'static str {
        match self {
            SourceKind::Personnel => "P",
            SourceKind::Enrollment => "E",
            SourceKind::Ips => "I",
        }
    }

    /// Known spellings of `field` in this source, most specific first.
    pub fn aliases(&self, field: Field) -> &'static [&'static str] {
        match (self, field) {
            (SourceKind::Personnel, Field::Id) => &[
                "Identifiant de l'établissement",
                "Identifiant de l'etablissement",
                "UAI",
                "Numéro UAI",
            ],
            (SourceKind::Personnel, Field::Name) => &[
                "Nom de l'établissement",
                "Nom de l'etablissement",
                "Appellation officielle",
            ],
            (SourceKind::Personnel, Field::Commune) => &["Commune", "Nom de la commune"],
            (SourceKind::Personnel, Field::Department) => &["Code département", "Code departement"],
            (SourceKind::Personnel, Field::Academie) => &["Libellé académie", "Académie"],
            (SourceKind::Personnel, Field::Sector) => &["Secteur"],
            (SourceKind::Personnel, Field::Nature) => &["Nature de l'établissement"],
            (SourceKind::Personnel, Field::Year) => &["Rentrée scolaire", "Année scolaire"],
            (SourceKind::Personnel, Field::TeachingStaff) => &[
                "ETP d'enseignants",
                "ETP des enseignants",
                "Nombre d'enseignants",
            ],
            (SourceKind::Personnel, Field::LifeStaff) => &[
                "ETP de personnels de vie scolaire",
                "ETP personnels de vie scolaire",
            ],
            (SourceKind::Personnel, Field::AdminStaff) => &[
                "ETP de personnels administratifs, techniques, sociaux et de santé",
                "ETP de personnels administratifs",
                "ETP de personnels ATSS",
            ],

            (SourceKind::Enrollment, Field::Id) => &[
                "Numero_d_etablissement",
                "Numéro d'établissement",
                "UAI",
            ],
            (SourceKind::Enrollment, Field::Name) => &[
                "Denomination_principale",
                "Patronyme",
                "Nom de l'établissement",
            ],
            (SourceKind::Enrollment, Field::Commune) => &[
                "localite_acheminement",
                "Commune",
                "Nom de la commune",
            ],
            (SourceKind::Enrollment, Field::Department) => &["Code_departement", "Code département"],
            (SourceKind::Enrollment, Field::Academie) => &["Academie", "Académie"],
            (SourceKind::Enrollment, Field::Sector) => &["Secteur_d_enseignement", "Secteur"],
            (SourceKind::Enrollment, Field::Nature) => &["Type_d_etablissement"],
            (SourceKind::Enrollment, Field::Year) => &["Annee_scolaire", "Rentrée scolaire"],
            (SourceKind::Enrollment, Field::Students) => &[
                "Nombre_d_eleves",
                "Nombre d'élèves",
                "Nombre d'élèves total",
            ],
            (SourceKind::Enrollment, Field::Level6) => &["Nombre_d_eleves_6eme", "6èmes total"],
            (SourceKind::Enrollment, Field::Level5) => &["Nombre_d_eleves_5eme", "5èmes total"],
            (SourceKind::Enrollment, Field::Level4) => &["Nombre_d_eleves_4eme", "4èmes total"],
            (SourceKind::Enrollment, Field::Level3) => &["Nombre_d_eleves_3eme", "3èmes total"],
            (SourceKind::Enrollment, Field::Segpa) => &[
                "Nombre_d_eleves_Segpa",
                "Nombre d'élèves en Segpa",
                "dont Segpa",
            ],
            (SourceKind::Enrollment, Field::Ulis) => &[
                "Nombre_d_eleves_ULIS",
                "Nombre d'élèves en ULIS",
                "dont ULIS",
            ],

            (SourceKind::Ips, Field::Id) => &["uai", "UAI"],
            (SourceKind::Ips, Field::Name) => &[
                "nom_de_l_etablissment",
                "nom_de_l_etablissement",
                "Nom de l'établissment",
                "Nom de l'établissement",
            ],
            (SourceKind::Ips, Field::Commune) => &["nom_de_la_commune", "Nom de la commune"],
            (SourceKind::Ips, Field::Department) => &["code_du_departement", "Code du département"],
            (SourceKind::Ips, Field::Academie) => &["academie", "Académie"],
            (SourceKind::Ips, Field::Sector) => &["secteur", "Secteur"],
            (SourceKind::Ips, Field::Year) => &["rentree_scolaire", "Rentrée scolaire"],
            (SourceKind::Ips, Field::Ips) => &["ips", "IPS", "Indice de position sociale"],

            _ => &[],
        }
    }
}

/// Resolved mapping from [`Field`] to the actual header of a loaded file.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    resolved: HashMap<Field, String>,
}

impl ColumnMap {
    const FIELDS: [Field; 19] = [
        Field::Id,
        Field::Name,
        Field::Commune,
        Field::Department,
        Field::Academie,
        Field::Sector,
        Field::Nature,
        Field::Year,
        Field::TeachingStaff,
        Field::LifeStaff,
        Field::AdminStaff,
        Field::Students,
        Field::Level6,
        Field::Level5,
        Field::Level4,
        Field::Level3,
        Field::Segpa,
        Field::Ulis,
        Field::Ips,
    ];

    /// Match `headers` against every alias of `kind`.
    pub fn resolve(kind: SourceKind, headers: &[String]) -> Self {
        let mut resolved = HashMap::new();
        for field in Self::FIELDS {
            let found = kind.aliases(field).iter().find_map(|alias| {
                headers
                    .iter()
                    .find(|h| h.trim().eq_ignore_ascii_case(alias))
            });
            if let Some(header) = found {
                resolved.insert(field, header.clone());
            }
        }
        Self { resolved }
    }

    /// Actual header name for `field`, if the file carries it.
    pub fn get(&self, field: Field) -> Option<&str> {
        self.resolved.get(&field).map(String::as_str)
    }

    pub fn has(&self, field: Field) -> bool {
        self.resolved.contains_key(&field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn resolves_first_alias_present() {
        let map = ColumnMap::resolve(
            SourceKind::Enrollment,
            &headers(&["Annee_scolaire", "UAI", "Nombre_d_eleves"]),
        );
        assert_eq!(map.get(Field::Id), Some("UAI"));
        assert_eq!(map.get(Field::Students), Some("Nombre_d_eleves"));
        assert!(!map.has(Field::Segpa));
    }

    #[test]
    fn matching_ignores_ascii_case_and_padding() {
        let map = ColumnMap::resolve(SourceKind::Ips, &headers(&[" UAI ", "IPS"]));
        assert_eq!(map.get(Field::Id), Some(" UAI "));
        assert_eq!(map.get(Field::Ips), Some("IPS"));
    }

    #[test]
    fn personnel_identifier_is_found() {
        let map = ColumnMap::resolve(
            SourceKind::Personnel,
            &headers(&["Identifiant de l'établissement", "ETP de personnels de vie scolaire"]),
        );
        assert!(map.has(Field::Id));
        assert!(map.has(Field::LifeStaff));
    }
}
