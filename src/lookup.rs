//! Typed key/value lookups and the fill-null-by-lookup primitive used by the
//! reconciliation passes.

use std::{borrow::Borrow, collections::HashMap, hash::Hash};

#[derive(Debug, Clone)]
pub struct Lookup<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V> Lookup<K, V> {
    /// Builds a lookup from pairs. A repeated key keeps its last value.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Pairs `keys` with `values` by position, stopping at the shorter side.
    pub fn zip<KI, VI>(keys: KI, values: VI) -> Self
    where
        KI: IntoIterator<Item = K>,
        VI: IntoIterator<Item = V>,
    {
        Self::from_pairs(keys.into_iter().zip(values))
    }

    /// The replacement for `key`, or `None` when the caller must keep its
    /// original value.
    pub fn lookup_or_keep_original<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// For every row whose target is null, replaces it with the lookup value for
/// the row's key. Rows with a present target, a null key, or a key absent
/// from the lookup are left unchanged. Returns the number of filled rows.
pub fn fill_nulls_by_lookup<R, K, Q, V, FK, FT>(
    rows: &mut [R],
    lookup: &Lookup<K, V>,
    key: FK,
    target: FT,
) -> usize
where
    K: Eq + Hash + Borrow<Q>,
    Q: Eq + Hash + ?Sized,
    V: Clone,
    FK: Fn(&R) -> Option<&Q>,
    FT: Fn(&mut R) -> &mut Option<V>,
{
    let mut filled = 0;
    for row in rows.iter_mut() {
        if target(&mut *row).is_some() {
            continue;
        }
        let Some(replacement) = key(&*row)
            .and_then(|k| lookup.lookup_or_keep_original(k))
            .cloned()
        else {
            continue;
        };
        *target(&mut *row) = Some(replacement);
        filled += 1;
    }
    filled
}
