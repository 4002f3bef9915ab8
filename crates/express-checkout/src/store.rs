//! Record Storage
//!
//! The client never saves anything itself; callers persist the records they
//! want to keep. Records are linked only by the provider token.

use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CheckoutError, Result};
use crate::record::{Checkout, Record};

/// Store-assigned record ID
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record together with its ID
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stored<R> {
    pub id: RecordId,
    pub record: R,
}

/// Record storage trait
pub trait RecordStore: Send + Sync {
    /// Insert a new record
    fn save<R: Record>(&self, record: &R) -> Result<RecordId>;

    /// Replace a previously saved record
    fn update<R: Record>(&self, id: RecordId, record: &R) -> Result<()>;

    /// Records of kind `R` whose field `name` equals `value`, in insertion order
    fn query_by_field<R: Record>(&self, name: &str, value: &str) -> Result<Vec<Stored<R>>>;
}

/// First checkout saved under `token`, if any
pub fn find_checkout_by_token<S: RecordStore>(
    store: &S,
    token: &str,
) -> Result<Option<Stored<Checkout>>> {
    Ok(store
        .query_by_field::<Checkout>("TOKEN", token)?
        .into_iter()
        .next())
}

/// In-memory record store (for development)
#[derive(Default)]
pub struct MemoryRecordStore {
    kinds: RwLock<HashMap<&'static str, Vec<(RecordId, serde_json::Value)>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records of kind `R`
    pub fn count<R: Record>(&self) -> Result<usize> {
        let kinds = self.kinds.read().map_err(poisoned)?;
        Ok(kinds.get(R::KIND).map_or(0, Vec::len))
    }
}

impl RecordStore for MemoryRecordStore {
    fn save<R: Record>(&self, record: &R) -> Result<RecordId> {
        let value = to_value(record)?;
        let id = RecordId::generate();

        let mut kinds = self.kinds.write().map_err(poisoned)?;
        kinds.entry(R::KIND).or_default().push((id, value));

        tracing::debug!(kind = R::KIND, id = %id, "Saved record");
        Ok(id)
    }

    fn update<R: Record>(&self, id: RecordId, record: &R) -> Result<()> {
        let value = to_value(record)?;

        let mut kinds = self.kinds.write().map_err(poisoned)?;
        let slot = kinds
            .get_mut(R::KIND)
            .and_then(|records| records.iter_mut().find(|(existing, _)| *existing == id))
            .ok_or_else(|| CheckoutError::Storage(format!("{} {id} not found", R::KIND)))?;
        slot.1 = value;

        tracing::debug!(kind = R::KIND, id = %id, "Updated record");
        Ok(())
    }

    fn query_by_field<R: Record>(&self, name: &str, value: &str) -> Result<Vec<Stored<R>>> {
        let kinds = self.kinds.read().map_err(poisoned)?;
        let Some(records) = kinds.get(R::KIND) else {
            return Ok(Vec::new());
        };

        let mut matches = Vec::new();
        for (id, stored) in records {
            let record: R = serde_json::from_value(stored.clone())
                .map_err(|e| CheckoutError::Storage(e.to_string()))?;
            if record.field(name) == Some(value) {
                matches.push(Stored { id: *id, record });
            }
        }
        Ok(matches)
    }
}

fn to_value<R: Record>(record: &R) -> Result<serde_json::Value> {
    serde_json::to_value(record).map_err(|e| CheckoutError::Storage(e.to_string()))
}

fn poisoned<T>(_: T) -> CheckoutError {
    CheckoutError::Storage("record store lock poisoned".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nvp::Fields;

    fn checkout(token: &str) -> Checkout {
        let fields: Fields = [
            ("TOKEN", token),
            ("TIMESTAMP", "2009-12-12T05:00:39Z"),
            ("CORRELATIONID", "6620813c42c5d"),
            ("ACK", "Success"),
            ("VERSION", "51.0"),
            ("BUILD", "1105502"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        Checkout::from_fields(format!("https://pay.test?token={token}"), fields).unwrap()
    }

    #[test]
    fn test_find_checkout_by_token() {
        let store = MemoryRecordStore::new();
        store.save(&checkout("EC-1")).unwrap();
        let id = store.save(&checkout("EC-2")).unwrap();

        let found = find_checkout_by_token(&store, "EC-2").unwrap().unwrap();
        assert_eq!(found.id, id);
        assert_eq!(found.record.token, "EC-2");

        assert!(find_checkout_by_token(&store, "EC-3").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_tokens_return_first() {
        let store = MemoryRecordStore::new();
        let first = store.save(&checkout("EC-1")).unwrap();
        store.save(&checkout("EC-1")).unwrap();

        let found = find_checkout_by_token(&store, "EC-1").unwrap().unwrap();
        assert_eq!(found.id, first);
        assert_eq!(store.count::<Checkout>().unwrap(), 2);
    }

    #[test]
    fn test_update_payer_id() {
        let store = MemoryRecordStore::new();
        let id = store.save(&checkout("EC-1")).unwrap();

        let mut stored = find_checkout_by_token(&store, "EC-1").unwrap().unwrap();
        stored.record.set_payer_id("PAYER1");
        store.update(stored.id, &stored.record).unwrap();

        let results = store.query_by_field::<Checkout>("PAYERID", "PAYER1").unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, id);
    }

    #[test]
    fn test_extras_named_like_record_keys() {
        let store = MemoryRecordStore::new();
        let mut record = checkout("EC-1");
        record.extra.insert("url".into(), "x".into());
        record.extra.insert("created".into(), "x".into());
        store.save(&record).unwrap();
        store.save(&checkout("EC-2")).unwrap();

        let found = find_checkout_by_token(&store, "EC-1").unwrap().unwrap();
        assert_eq!(found.record.redirect_url, "https://pay.test?token=EC-1");
        assert_eq!(found.record.extra["url"], "x");
        assert_eq!(found.record, record);

        assert!(find_checkout_by_token(&store, "EC-2").unwrap().is_some());
    }

    #[test]
    fn test_update_unknown_id() {
        let store = MemoryRecordStore::new();
        let result = store.update(RecordId::generate(), &checkout("EC-1"));
        assert!(matches!(result, Err(CheckoutError::Storage(_))));
    }
}
