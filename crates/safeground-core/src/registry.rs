//! Canonical district registry with normalised-key lookup.
//!
//! Built once from the ~424-entry reference table and never mutated, so a
//! `&Registry` can be shared across resolver workers without locking.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::error::{KeyIndex, RegistryError};
use crate::model::DistrictRecord;
use crate::normalize::{NormalizedText, normalize};

/// One normalised lookup key and the district it points at.
#[derive(Debug, Clone)]
pub struct RegistryKey {
    pub key: NormalizedText,
    pub index: KeyIndex,
    district: usize,
}

/// Immutable set of known districts, indexed by normalised name and alias.
#[derive(Debug)]
pub struct Registry {
    records: Vec<DistrictRecord>,
    by_id: HashMap<String, usize>,
    name_index: HashMap<String, usize>,
    alias_index: HashMap<String, usize>,
    /// Every key in load order: names first, then aliases.
    keys: Vec<RegistryKey>,
    /// Gu-level areas (first token of multi-token names), longest first.
    areas: Vec<String>,
}

impl Registry {
    /// Build the registry and its two lookup indices.
    ///
    /// Fails if two distinct districts normalise to the same key, in the same
    /// index or across the name and alias indices. A colliding reference table
    /// would otherwise attribute incidents to whichever district loaded last.
    pub fn load(
        records: impl IntoIterator<Item = DistrictRecord>,
    ) -> Result<Self, RegistryError> {
        let records: Vec<DistrictRecord> = records.into_iter().collect();

        let mut by_id = HashMap::with_capacity(records.len());
        let mut name_index: HashMap<String, usize> = HashMap::with_capacity(records.len());
        let mut alias_index: HashMap<String, usize> = HashMap::new();
        let mut keys = Vec::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            if record.id.trim().is_empty() {
                return Err(RegistryError::EmptyId(record.name.clone()));
            }
            if by_id.insert(record.id.clone(), i).is_some() {
                return Err(RegistryError::DuplicateId(record.id.clone()));
            }

            let key = usable_key(record, &record.name, KeyIndex::Name)?;
            if let Some(&other) = name_index.get(key.as_str()) {
                return Err(duplicate(KeyIndex::Name, &key, &records[other], record));
            }
            name_index.insert(key.as_str().to_string(), i);
            keys.push(RegistryKey {
                key,
                index: KeyIndex::Name,
                district: i,
            });
        }

        for (i, record) in records.iter().enumerate() {
            for alias in &record.aliases {
                let key = usable_key(record, alias, KeyIndex::Alias)?;
                let owner = name_index
                    .get(key.as_str())
                    .or_else(|| alias_index.get(key.as_str()))
                    .copied();
                match owner {
                    Some(other) if other != i => {
                        return Err(duplicate(KeyIndex::Alias, &key, &records[other], record));
                    }
                    // Alias that normalises onto the district's own name or
                    // another of its aliases adds nothing.
                    Some(_) => continue,
                    None => {}
                }
                alias_index.insert(key.as_str().to_string(), i);
                keys.push(RegistryKey {
                    key,
                    index: KeyIndex::Alias,
                    district: i,
                });
            }
        }

        let mut areas: Vec<String> = keys
            .iter()
            .filter(|k| k.index == KeyIndex::Name)
            .filter_map(|k| area_of_key(&k.key))
            .map(str::to_string)
            .collect();
        areas.sort_unstable_by(|a, b| {
            b.chars()
                .count()
                .cmp(&a.chars().count())
                .then_with(|| a.cmp(b))
        });
        areas.dedup();

        info!(
            districts = records.len(),
            names = name_index.len(),
            aliases = alias_index.len(),
            areas = areas.len(),
            "loaded district registry"
        );

        Ok(Self {
            records,
            by_id,
            name_index,
            alias_index,
            keys,
            areas,
        })
    }

    /// Exact lookup of a normalised key; the alias index is consulted only
    /// when the name index misses.
    pub fn lookup_exact(&self, key: &NormalizedText) -> Option<&str> {
        self.name_index
            .get(key.as_str())
            .or_else(|| self.alias_index.get(key.as_str()))
            .map(|&i| self.records[i].id.as_str())
    }

    /// Gu-level areas the registry knows, longest first.
    pub fn areas(&self) -> &[String] {
        &self.areas
    }

    /// The single area named anywhere in `text`, if exactly one is.
    ///
    /// Within a token only the longest contained area counts, so `강서구`
    /// does not also name `서구`. Tokens may carry other text glued on
    /// (`서울강남구청앞`).
    pub fn area_hint(&self, text: &NormalizedText) -> Option<&str> {
        let mut found: Option<&str> = None;
        for token in text.tokens() {
            let mut in_token: Vec<&str> = Vec::new();
            for area in &self.areas {
                let area = area.as_str();
                if token.contains(area) && !in_token.iter().any(|t| t.contains(area)) {
                    in_token.push(area);
                }
            }
            for area in in_token {
                match found {
                    None => found = Some(area),
                    Some(prev) if prev == area => {}
                    Some(_) => return None,
                }
            }
        }
        found
    }

    /// All district ids, for fuzzy-candidate enumeration.
    pub fn all_ids(&self) -> BTreeSet<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Option<&DistrictRecord> {
        self.by_id.get(id).map(|&i| &self.records[i])
    }

    /// Every normalised key, names first, in load order.
    pub fn keys(&self) -> &[RegistryKey] {
        &self.keys
    }

    /// District id a key belongs to.
    pub fn district_of(&self, key: &RegistryKey) -> &str {
        &self.records[key.district].id
    }

    /// Records in load order.
    pub fn records(&self) -> &[DistrictRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn usable_key(
    record: &DistrictRecord,
    raw: &str,
    field: KeyIndex,
) -> Result<NormalizedText, RegistryError> {
    let key = normalize(raw);
    if key.is_empty() || !key.has_script_content() {
        return Err(RegistryError::EmptyKey {
            id: record.id.clone(),
            field,
            raw: raw.to_string(),
        });
    }
    Ok(key)
}

/// First token of a multi-token name key, when it is at least two characters.
fn area_of_key(key: &NormalizedText) -> Option<&str> {
    let mut tokens = key.tokens();
    let first = tokens.next()?;
    tokens.next()?;
    (first.chars().count() >= 2).then_some(first)
}

fn duplicate(
    index: KeyIndex,
    key: &NormalizedText,
    first: &DistrictRecord,
    second: &DistrictRecord,
) -> RegistryError {
    RegistryError::DuplicateKey {
        index,
        key: key.as_str().to_string(),
        first: first.id.clone(),
        second: second.id.clone(),
    }
}
