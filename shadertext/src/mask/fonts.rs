use std::collections::HashMap;

use fontdb::{Database, Family, Query, Weight};
use fontdue::{Font, FontSettings};
use log::debug;

use crate::warn_once;

/// The families the preview offers by name, with the named alternates and
/// generic family each one falls back to.
const KNOWN_FAMILIES: &[(&str, &[&str], Generic)] = &[
    ("Inter", &["-apple-system", "BlinkMacSystemFont"], Generic::SansSerif),
    ("Roboto", &[], Generic::SansSerif),
    ("Open Sans", &[], Generic::SansSerif),
    ("Lato", &[], Generic::SansSerif),
    ("Montserrat", &[], Generic::SansSerif),
    ("Oswald", &[], Generic::SansSerif),
    ("Raleway", &[], Generic::SansSerif),
    ("Nunito", &[], Generic::SansSerif),
    ("Merriweather", &[], Generic::Serif),
    ("Poppins", &[], Generic::SansSerif),
    ("Playfair Display", &[], Generic::Serif),
    ("Ubuntu", &[], Generic::SansSerif),
    ("Roboto Mono", &[], Generic::Monospace),
    ("Rubik", &[], Generic::SansSerif),
    ("Mukta", &[], Generic::SansSerif),
    ("Kanit", &[], Generic::SansSerif),
    ("PT Sans", &[], Generic::SansSerif),
    ("Work Sans", &[], Generic::SansSerif),
    ("Quicksand", &[], Generic::SansSerif),
    ("Fira Sans", &[], Generic::SansSerif),
    ("Alef", &["Arial Hebrew"], Generic::SansSerif),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generic {
    SansSerif,
    Serif,
    Monospace,
}

impl Generic {
    fn family(&self) -> Family<'static> {
        match self {
            Generic::SansSerif => Family::SansSerif,
            Generic::Serif => Family::Serif,
            Generic::Monospace => Family::Monospace,
        }
    }
}

/// Named candidates (the family itself first) and the generic fallback.
pub fn fallback_chain(family: &str) -> (Vec<&str>, Generic) {
    match KNOWN_FAMILIES.iter().find(|(name, _, _)| *name == family) {
        Some((name, alternates, generic)) => {
            let mut names = vec![*name];
            names.extend_from_slice(alternates);
            (names, *generic)
        }
        None => (vec![family], Generic::SansSerif),
    }
}

/// CSS weights are 1..=1000; anything else is clamped.
pub fn css_weight(weight: f32) -> u16 {
    if !weight.is_finite() {
        return Weight::NORMAL.0;
    }
    weight.round().clamp(1.0, 1000.0) as u16
}

/// System fonts resolved by family name and weight, parsed once per
/// (family, weight) pair.
pub struct FontBook {
    db: Database,
    cache: HashMap<(String, u16), Option<Font>>,
}

impl FontBook {
    pub fn system() -> Self {
        let mut db = Database::new();
        db.load_system_fonts();
        debug!("loaded {} system font faces", db.len());
        assign_generic_families(&mut db);
        Self::from_database(db)
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            cache: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }

    pub fn resolve(&mut self, family: &str, weight: u16) -> Option<&Font> {
        let key = (family.to_string(), weight);
        if !self.cache.contains_key(&key) {
            let font = self.load(family, weight);
            self.cache.insert(key.clone(), font);
        }
        self.cache.get(&key).and_then(Option::as_ref)
    }

    fn load(&self, family: &str, weight: u16) -> Option<Font> {
        if self.db.is_empty() {
            warn_once!("no font faces available; text masks will be empty");
            return None;
        }

        let (names, generic) = fallback_chain(family);
        let named: Vec<Family> = names.iter().map(|name| Family::Name(name)).collect();

        let id = self.query(&named, weight).or_else(|| {
            warn_once!(
                "font family '{}' unavailable; substituting {:?}",
                family,
                generic
            );
            self.query(&[generic.family()], weight)
        });

        let id = match id {
            Some(id) => id,
            None => {
                let first = self.db.faces().next()?;
                warn_once!(
                    "no {:?} face installed; using '{}'",
                    generic,
                    first
                        .families
                        .first()
                        .map(|(name, _)| name.as_str())
                        .unwrap_or("<unnamed>")
                );
                first.id
            }
        };

        let parsed = self.db.with_face_data(id, |data, index| {
            Font::from_bytes(
                data,
                FontSettings {
                    collection_index: index,
                    ..FontSettings::default()
                },
            )
        })?;

        match parsed {
            Ok(font) => Some(font),
            Err(err) => {
                warn_once!("failed to parse font for '{}': {}", family, err);
                None
            }
        }
    }

    fn query(&self, families: &[Family], weight: u16) -> Option<fontdb::ID> {
        self.db.query(&Query {
            families,
            weight: Weight(weight),
            ..Query::default()
        })
    }
}

const SANS_SERIF_CANDIDATES: &[&str] = &[
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
];
const SERIF_CANDIDATES: &[&str] = &[
    "Times New Roman",
    "Times",
    "DejaVu Serif",
    "Liberation Serif",
    "Noto Serif",
];
const MONOSPACE_CANDIDATES: &[&str] = &[
    "Courier New",
    "Menlo",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
];

/// Points fontdb's generic families at faces that are actually installed.
fn assign_generic_families(db: &mut Database) {
    if let Some(name) = first_installed(db, SANS_SERIF_CANDIDATES) {
        db.set_sans_serif_family(name);
    }
    if let Some(name) = first_installed(db, SERIF_CANDIDATES) {
        db.set_serif_family(name);
    }
    if let Some(name) = first_installed(db, MONOSPACE_CANDIDATES) {
        db.set_monospace_family(name);
    }
}

fn first_installed<'a>(db: &Database, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|name| {
        db.query(&Query {
            families: &[Family::Name(name)],
            ..Query::default()
        })
        .is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_families_carry_their_generic() {
        assert_eq!(fallback_chain("Merriweather").1, Generic::Serif);
        assert_eq!(fallback_chain("Playfair Display").1, Generic::Serif);
        assert_eq!(fallback_chain("Roboto Mono").1, Generic::Monospace);
        assert_eq!(fallback_chain("Quicksand").1, Generic::SansSerif);
    }

    #[test]
    fn alternates_follow_the_family() {
        assert_eq!(
            fallback_chain("Alef").0,
            vec!["Alef", "Arial Hebrew"]
        );
        assert_eq!(fallback_chain("Inter").0[0], "Inter");
        assert_eq!(fallback_chain("Inter").0.len(), 3);
    }

    #[test]
    fn unknown_families_fall_back_to_sans_serif() {
        let (names, generic) = fallback_chain("Comic Mono Deluxe");
        assert_eq!(names, vec!["Comic Mono Deluxe"]);
        assert_eq!(generic, Generic::SansSerif);
    }

    #[test]
    fn weights_are_clamped() {
        assert_eq!(css_weight(600.0), 600);
        assert_eq!(css_weight(0.0), 1);
        assert_eq!(css_weight(5000.0), 1000);
        assert_eq!(css_weight(f32::NAN), 400);
    }

    #[test]
    fn empty_database_resolves_nothing() {
        let mut book = FontBook::from_database(Database::new());
        assert!(book.is_empty());
        assert!(book.resolve("Quicksand", 600).is_none());
    }
}
