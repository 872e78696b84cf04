//! Automerge-backed replica

use automerge::{
    transaction::Transactable, AutoCommit, AutomergeError, ObjId, ObjType, ReadDoc, ScalarValue,
    Value, ROOT,
};
use thiserror::Error;

use super::item::{
    date_from_millis, date_to_millis, parse_date, ItemRecord, DATE_FIELDS, TEXT_FIELDS,
};

/// Root key of the item list
pub const ITEMS_KEY: &str = "items";

/// Errors raised while loading or reading a document
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("Automerge error: {0}")]
    Automerge(#[from] AutomergeError),

    #[error("Document has no `items` list at its root")]
    MissingItems,
}

/// A single CRDT document
///
/// Mutating methods take `&mut self` because automerge closes its pending
/// transaction before saving, merging or reading heads.
#[derive(Debug)]
pub struct Replica {
    doc: AutoCommit,
}

impl Replica {
    /// New document with an empty `items` list
    pub fn init_empty() -> Self {
        let mut doc = AutoCommit::new();
        doc.put_object(ROOT, ITEMS_KEY, ObjType::List)
            .expect("putting a list on the root of a fresh document cannot fail");
        Self { doc }
    }

    /// Load a replica from its binary encoding
    ///
    /// Fails when the bytes are not an automerge document, or when the
    /// document does not carry an `items` list.
    pub fn decode(bytes: &[u8]) -> Result<Self, DocumentError> {
        let doc = AutoCommit::load(bytes)?;
        let replica = Self { doc };
        replica.items_list()?;
        Ok(replica)
    }

    /// Save the full document
    pub fn encode(&mut self) -> Vec<u8> {
        self.doc.save()
    }

    /// Merge every change of `remote` that this replica has not seen yet
    ///
    /// All or nothing: automerge can apply part of a batch before rejecting
    /// the rest, so the merge runs on a copy that only replaces this replica
    /// once every change went in.
    pub fn merge(&mut self, remote: &mut Replica) -> Result<(), DocumentError> {
        let mut merged = self.doc.clone();
        merged.merge(&mut remote.doc)?;
        self.doc = merged;
        Ok(())
    }

    /// Replace `items` wholesale
    ///
    /// This puts a brand new list object on the root, so every record loses
    /// whatever CRDT identity it had. Only rehydration from the table should
    /// call this.
    pub fn set_items(&mut self, records: &[ItemRecord]) -> Result<(), DocumentError> {
        let list = self.doc.put_object(ROOT, ITEMS_KEY, ObjType::List)?;
        for (index, record) in records.iter().enumerate() {
            self.insert_record(&list, index, record)?;
        }
        Ok(())
    }

    /// Append one record to the end of `items`
    ///
    /// The server never edits records itself; this is the client-side edit,
    /// used by tools and tests that act as a client.
    pub fn push_item(&mut self, record: &ItemRecord) -> Result<(), DocumentError> {
        let list = self.items_list()?;
        let index = self.doc.length(&list);
        self.insert_record(&list, index, record)
    }

    /// Project `items` into flat records, in list order
    ///
    /// Entries that are not maps are skipped.
    pub fn items(&self) -> Result<Vec<ItemRecord>, DocumentError> {
        let list = self.items_list()?;
        let len = self.doc.length(&list);
        let mut records = Vec::with_capacity(len);

        for index in 0..len {
            match self.doc.get(&list, index)? {
                Some((Value::Object(ObjType::Map), map)) => records.push(self.read_record(&map)?),
                _ => tracing::warn!("Skipping non-map entry {} in `{}`", index, ITEMS_KEY),
            }
        }

        Ok(records)
    }

    /// Independent copy with a fresh actor
    #[cfg(test)]
    pub fn fork(&mut self) -> Replica {
        Replica {
            doc: self.doc.fork(),
        }
    }

    /// Current heads, sorted
    #[cfg(test)]
    pub fn heads(&mut self) -> Vec<automerge::ChangeHash> {
        let mut heads = self.doc.get_heads();
        heads.sort();
        heads
    }

    fn items_list(&self) -> Result<ObjId, DocumentError> {
        match self.doc.get(ROOT, ITEMS_KEY)? {
            Some((Value::Object(ObjType::List), list)) => Ok(list),
            _ => Err(DocumentError::MissingItems),
        }
    }

    fn insert_record(
        &mut self,
        list: &ObjId,
        index: usize,
        record: &ItemRecord,
    ) -> Result<(), DocumentError> {
        let map = self.doc.insert_object(list, index, ObjType::Map)?;

        for (key, value) in record.text_fields() {
            if let Some(value) = value {
                self.doc.put(&map, key, value)?;
            }
        }
        // Timestamps surface as `Date` in the JS client
        for (key, value) in record.date_fields() {
            if let Some(date) = value {
                self.doc.put(&map, key, ScalarValue::Timestamp(date_to_millis(date)))?;
            }
        }

        Ok(())
    }

    fn read_record(&self, map: &ObjId) -> Result<ItemRecord, DocumentError> {
        let mut record = ItemRecord::default();

        for key in TEXT_FIELDS {
            record.set_text(key, self.read_string(map, key)?);
        }
        for key in DATE_FIELDS {
            let date = match self.doc.get(map, key)? {
                Some((Value::Scalar(scalar), _)) => match &*scalar {
                    ScalarValue::Timestamp(millis) => date_from_millis(*millis),
                    ScalarValue::Str(text) => parse_date(text),
                    _ => None,
                },
                Some((Value::Object(ObjType::Text), text)) => parse_date(&self.doc.text(&text)?),
                _ => None,
            };
            record.set_date(key, date);
        }

        Ok(record)
    }

    /// Read a string field stored either as a scalar or as a text object
    fn read_string(&self, map: &ObjId, key: &str) -> Result<Option<String>, DocumentError> {
        let value = match self.doc.get(map, key)? {
            Some((Value::Scalar(scalar), _)) => match &*scalar {
                ScalarValue::Str(text) => Some(text.to_string()),
                ScalarValue::Int(n) => Some(n.to_string()),
                ScalarValue::Uint(n) => Some(n.to_string()),
                ScalarValue::F64(n) => Some(n.to_string()),
                ScalarValue::Boolean(b) => Some(b.to_string()),
                ScalarValue::Timestamp(millis) => date_from_millis(*millis).map(|d| d.to_string()),
                _ => None,
            },
            Some((Value::Object(ObjType::Text), text)) => Some(self.doc.text(&text)?),
            _ => None,
        };
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn names(replica: &Replica) -> Vec<String> {
        replica
            .items()
            .unwrap()
            .into_iter()
            .filter_map(|r| r.first_name)
            .collect()
    }

    /// Replica holding Alice, plus two forks that each append one record
    fn diverged() -> (Replica, Replica, Replica) {
        let mut base = Replica::init_empty();
        base.push_item(&ItemRecord::named("Alice", "Lee")).unwrap();

        let mut a = base.fork();
        a.push_item(&ItemRecord::named("Bob", "Chan")).unwrap();
        let mut b = base.fork();
        b.push_item(&ItemRecord::named("Cara", "Diaz")).unwrap();

        (base, a, b)
    }

    fn merged(left: &mut Replica, right: &mut Replica) -> Replica {
        let mut out = left.fork();
        out.merge(right).unwrap();
        out
    }

    #[test]
    fn test_init_empty_has_empty_items() {
        let replica = Replica::init_empty();
        assert!(replica.items().unwrap().is_empty());
    }

    #[test]
    fn test_decode_encode_round_trip() {
        let mut replica = Replica::init_empty();
        let mut record = ItemRecord::named("Alice", "Lee");
        record.department = Some("Sales".to_string());
        record.hire_date = NaiveDate::from_ymd_opt(2021, 6, 15);
        replica.push_item(&record).unwrap();

        let mut decoded = Replica::decode(&replica.encode()).unwrap();
        assert_eq!(decoded.items().unwrap(), vec![record]);
        assert_eq!(decoded.heads(), replica.heads());
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = Replica::decode(&[0xde, 0xad, 0xbe, 0xef]);
        assert!(matches!(result, Err(DocumentError::Automerge(_))));
    }

    #[test]
    fn test_decode_rejects_document_without_items() {
        let mut doc = AutoCommit::new();
        doc.put(ROOT, "title", "no items here").unwrap();

        let result = Replica::decode(&doc.save());
        assert!(matches!(result, Err(DocumentError::MissingItems)));
    }

    #[test]
    fn test_merge_is_commutative() {
        let (_, mut a, mut b) = diverged();

        let mut ab = merged(&mut a, &mut b);
        let mut ba = merged(&mut b, &mut a);

        assert_eq!(ab.items().unwrap(), ba.items().unwrap());
        assert_eq!(ab.heads(), ba.heads());
        assert_eq!(ab.items().unwrap().len(), 3);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let (_, mut a, _) = diverged();
        let before = a.items().unwrap();
        let heads_before = a.heads();

        let mut same = a.fork();
        a.merge(&mut same).unwrap();

        assert_eq!(a.items().unwrap(), before);
        assert_eq!(a.heads(), heads_before);
    }

    #[test]
    fn test_merge_with_subsumed_replica_changes_nothing() {
        let (mut base, mut a, _) = diverged();
        let heads_before = a.heads();

        a.merge(&mut base).unwrap();

        assert_eq!(a.heads(), heads_before);
        assert_eq!(names(&a), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_merge_is_associative() {
        let (mut base, mut a, mut b) = diverged();
        let mut c = base.fork();
        c.push_item(&ItemRecord::named("Dan", "Eng")).unwrap();

        let mut ab = merged(&mut a, &mut b);
        let mut left = merged(&mut ab, &mut c);

        let mut bc = merged(&mut b, &mut c);
        let mut right = merged(&mut a, &mut bc);

        assert_eq!(left.items().unwrap(), right.items().unwrap());
        assert_eq!(left.heads(), right.heads());
        assert_eq!(left.items().unwrap().len(), 4);
    }

    #[test]
    fn test_rejected_merge_leaves_replica_unchanged() {
        use automerge::ActorId;

        let mut server = Replica::init_empty();
        server.push_item(&ItemRecord::named("Alice", "Lee")).unwrap();
        let baseline = server.encode();
        let shared = ActorId::from(&[0xaa; 16][..]);

        let mut first = Replica::decode(&baseline).unwrap();
        first.doc.set_actor(shared.clone());
        first.push_item(&ItemRecord::named("Bob", "Chan")).unwrap();
        server.merge(&mut first).unwrap();
        let heads_before = server.heads();

        // A valid change followed by one that reuses a sequence number
        let mut second = Replica::decode(&baseline).unwrap();
        second.push_item(&ItemRecord::named("Dan", "Eng")).unwrap();
        second.doc.set_actor(shared);
        second.push_item(&ItemRecord::named("Eve", "Fox")).unwrap();

        assert!(server.merge(&mut second).is_err());
        assert_eq!(names(&server), vec!["Alice", "Bob"]);
        assert_eq!(server.heads(), heads_before);
    }

    #[test]
    fn test_set_items_replaces_wholesale() {
        let mut replica = Replica::init_empty();
        replica.push_item(&ItemRecord::named("Old", "Row")).unwrap();

        replica
            .set_items(&[ItemRecord::named("Alice", "Lee"), ItemRecord::named("Bob", "Chan")])
            .unwrap();

        assert_eq!(names(&replica), vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_items_reads_text_objects_and_string_dates() {
        // Shape produced by a JS client: strings as text objects, dates as ISO text
        let mut doc = AutoCommit::new();
        let list = doc.put_object(ROOT, ITEMS_KEY, ObjType::List).unwrap();
        let map = doc.insert_object(&list, 0, ObjType::Map).unwrap();
        let name = doc.put_object(&map, "FirstName", ObjType::Text).unwrap();
        doc.splice_text(&name, 0, 0, "Cara").unwrap();
        doc.put(&map, "BirthDate", "1995-04-02T00:00:00.000Z").unwrap();
        doc.insert(&list, 1, "not a record").unwrap();

        let replica = Replica::decode(&doc.save()).unwrap();
        let items = replica.items().unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].first_name.as_deref(), Some("Cara"));
        assert_eq!(items[0].birth_date, NaiveDate::from_ymd_opt(1995, 4, 2));
        assert_eq!(items[0].last_name, None);
    }
}
