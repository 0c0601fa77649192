//! DTO field mapping.
//!
//! [`map_into`] copies the columns two [`Fields`] types share. The correspondence for
//! each (source, target) pair is computed once and kept for the life of the process.

use crate::entity::Fields;
use crate::error::QuarryError;
use crate::record::Record;
use once_cell::sync::Lazy;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Columns present on both sides of a mapping, in target order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    pub shared: Vec<&'static str>,
}

impl FieldMap {
    fn build(source: &[&'static str], target: &[&'static str]) -> Self {
        Self {
            shared: target
                .iter()
                .copied()
                .filter(|name| source.contains(name))
                .collect(),
        }
    }
}

type FieldMapCache = RwLock<HashMap<(TypeId, TypeId), Arc<FieldMap>>>;

static FIELD_MAPS: Lazy<FieldMapCache> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Cached field correspondence for `S -> T`.
pub fn field_map<S: Fields + 'static, T: Fields + 'static>() -> Arc<FieldMap> {
    let key = (TypeId::of::<S>(), TypeId::of::<T>());
    {
        let cache = FIELD_MAPS.read().unwrap_or_else(|p| p.into_inner());
        if let Some(map) = cache.get(&key) {
            return Arc::clone(map);
        }
    }

    let mut cache = FIELD_MAPS.write().unwrap_or_else(|p| p.into_inner());
    // Another writer may have populated it while we waited
    Arc::clone(
        cache
            .entry(key)
            .or_insert_with(|| Arc::new(FieldMap::build(S::field_names(), T::field_names()))),
    )
}

/// Convert `source` into `T` through the columns both types declare.
pub fn map_into<S: Fields + 'static, T: Fields + 'static>(source: &S) -> Result<T, QuarryError> {
    let map = field_map::<S, T>();
    let mut from = source.to_record();
    let mut record = Record::new();
    for name in &map.shared {
        if let Some(value) = from.remove(name) {
            record.set(*name, value);
        }
    }
    T::from_record(&record)
}

/// [`map_into`] over a slice.
pub fn map_all<S: Fields + 'static, T: Fields + 'static>(sources: &[S]) -> Result<Vec<T>, QuarryError> {
    sources.iter().map(map_into::<S, T>).collect()
}
