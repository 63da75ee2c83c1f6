use crate::domain::KycRecord;
use rusqlite::{params, Connection};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Key under which the validated identifier is persisted.
const IDENTIFIER_KEY: &str = "aadharNum";

/// Durable key/value persistence of the most recently extracted record.
/// The key set is fixed and flat; there is no versioning or migration.
/// All mutation of persisted state flows through this type.
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Opens (or creates) the store under `data_root`.
    pub fn open_at_root<P: AsRef<Path>>(data_root: P) -> rusqlite::Result<Self> {
        let db_path = data_root.as_ref().join("kyc_record.db");
        if let Some(parent) = db_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let conn = Connection::open(db_path)?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;
            CREATE TABLE IF NOT EXISTS kyc_record (
                key    TEXT PRIMARY KEY,
                value  TEXT NOT NULL
            );
            "#,
        )?;
        Ok(Self { conn })
    }

    /// Persists every field of the record, overwriting prior values. The
    /// writes run in one transaction so a reader never observes a half
    /// written record.
    pub fn save(&mut self, record: &KycRecord) -> rusqlite::Result<()> {
        let tx = self.conn.transaction()?;
        for (key, value) in record.persisted_fields() {
            tx.execute(
                "INSERT INTO kyc_record (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value=excluded.value",
                params![key, value],
            )?;
        }
        tx.commit()?;
        debug!("persisted KYC record");
        Ok(())
    }

    /// Reconstructs the record from the persisted key set. Missing keys
    /// become empty strings; a never-initialized store loads as the
    /// all-empty record.
    pub fn load(&self) -> rusqlite::Result<KycRecord> {
        let mut stmt = self.conn.prepare("SELECT key, value FROM kyc_record")?;
        let mut rows = stmt.query([])?;
        let mut fields = HashMap::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get(0)?;
            let value: String = row.get(1)?;
            fields.insert(key, value);
        }
        Ok(KycRecord::from_persisted(fields))
    }

    /// Writes the all-empty record over the existing state.
    pub fn reset(&mut self) -> rusqlite::Result<()> {
        self.save(&KycRecord::default())
    }

    /// Overwrites only the persisted identifier; used by the validation
    /// side-channel, which amends one field without touching the rest of
    /// the record.
    pub fn set_identifier(&mut self, value: &str) -> rusqlite::Result<()> {
        self.conn.execute(
            "INSERT INTO kyc_record (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value=excluded.value",
            params![IDENTIFIER_KEY, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Address;
    use tempfile::tempdir;

    fn sample_record() -> KycRecord {
        KycRecord {
            reference_id: "123420240101".to_string(),
            name: "Asha Kumari".to_string(),
            dob: "01-01-1990".to_string(),
            gender: "F".to_string(),
            address: Address {
                care_of: "D/O Ram Kumar".to_string(),
                country: "India".to_string(),
                district: "Pune".to_string(),
                house: "12A".to_string(),
                landmark: "Near Temple".to_string(),
                locality: "Shivaji Nagar".to_string(),
                pincode: "411005".to_string(),
                post_office: "Pune City".to_string(),
                state: "Maharashtra".to_string(),
                street: "MG Road".to_string(),
                sub_district: "Haveli".to_string(),
                vtc: "Pune".to_string(),
            },
            encoded_image: "aGVsbG8=".to_string(),
            identifier_number: "000000001234".to_string(),
        }
    }

    #[test]
    fn round_trip_reproduces_every_field_except_vtc() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open_at_root(dir.path()).unwrap();
        let record = sample_record();
        store.save(&record).unwrap();

        let loaded = store.load().unwrap();
        let mut expected = record.clone();
        expected.address.vtc = String::new();
        assert_eq!(loaded, expected);
        assert_ne!(loaded.address.vtc, record.address.vtc);
    }

    #[test]
    fn empty_store_loads_the_all_empty_record() {
        let dir = tempdir().unwrap();
        let store = RecordStore::open_at_root(dir.path()).unwrap();
        assert_eq!(store.load().unwrap(), KycRecord::default());
    }

    #[test]
    fn reset_is_idempotent_from_any_prior_state() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open_at_root(dir.path()).unwrap();
        store.save(&sample_record()).unwrap();

        store.reset().unwrap();
        assert_eq!(store.load().unwrap(), KycRecord::default());
        store.reset().unwrap();
        assert_eq!(store.load().unwrap(), KycRecord::default());
    }

    #[test]
    fn save_overwrites_without_merging() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open_at_root(dir.path()).unwrap();
        store.save(&sample_record()).unwrap();

        let second = KycRecord {
            reference_id: "5678refid".to_string(),
            name: "Second Person".to_string(),
            ..KycRecord::default()
        };
        store.save(&second).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.name, "Second Person");
        assert_eq!(loaded.address.district, "");
        assert_eq!(loaded.encoded_image, "");
    }

    #[test]
    fn set_identifier_touches_only_that_field() {
        let dir = tempdir().unwrap();
        let mut store = RecordStore::open_at_root(dir.path()).unwrap();
        store.save(&sample_record()).unwrap();

        store.set_identifier("").unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.identifier_number, "");
        assert_eq!(loaded.name, "Asha Kumari");

        store.set_identifier("999900001234").unwrap();
        assert_eq!(store.load().unwrap().identifier_number, "999900001234");
    }

    #[test]
    fn store_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let mut store = RecordStore::open_at_root(dir.path()).unwrap();
            store.save(&sample_record()).unwrap();
        }
        let store = RecordStore::open_at_root(dir.path()).unwrap();
        assert_eq!(store.load().unwrap().name, "Asha Kumari");
    }
}
