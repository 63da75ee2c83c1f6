use crate::archive::{self, ArchiveLimits};
use crate::config::Config;
use crate::domain::KycRecord;
use crate::error::{PipelineError, Result, ValidationError};
use crate::parser;
use crate::store::RecordStore;
use crate::validator;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, instrument, warn};

/// Pipeline coordinator for one logical KYC session. Sequences archive
/// extraction, XML member selection, parsing, and persistence, and
/// separately runs the identifier validation side-channel against the
/// stored record.
///
/// At most one pipeline run happens at a time; every stage failure aborts
/// the run and nothing partial is ever committed.
pub struct KycSession {
    store: RecordStore,
    limits: ArchiveLimits,
    record: KycRecord,
}

impl KycSession {
    pub fn open(config: &Config) -> Result<Self> {
        let store = RecordStore::open_at_root(&config.storage.data_dir)?;
        let record = store.load()?;
        Ok(Self {
            store,
            limits: config.archive_limits(),
            record,
        })
    }

    /// Consistent snapshot of the current record.
    pub fn record(&self) -> &KycRecord {
        &self.record
    }

    /// Runs the full extraction pipeline over raw archive bytes. On
    /// success the freshly parsed record fully replaces both the persisted
    /// and the in-memory state; on any failure prior state is untouched.
    #[instrument(skip(self, archive_bytes, password), fields(archive_bytes = archive_bytes.len()))]
    pub fn process_archive(&mut self, archive_bytes: &[u8], password: &str) -> Result<&KycRecord> {
        let digest = hex::encode(Sha256::digest(archive_bytes));
        info!(archive_sha256 = %digest, "starting extraction pipeline");

        let entries = archive::extract(archive_bytes, password, &self.limits)?;
        info!(members = entries.len(), "archive opened");

        let xml_member = entries
            .iter()
            .find(|entry| {
                Path::new(&entry.name)
                    .extension()
                    .and_then(|ext| ext.to_str())
                    == Some("xml")
            })
            .ok_or(PipelineError::NoXmlMember)?;
        info!(member = %xml_member.name, bytes = xml_member.bytes.len(), "located XML member");

        let record = parser::parse(&xml_member.bytes)?.ok_or(PipelineError::MissingRecord)?;

        self.store.save(&record)?;
        self.record = record;
        info!("record extracted and persisted");
        Ok(&self.record)
    }

    /// Validates a user-supplied identifier against the stored record's
    /// reference token. Success persists the identifier; a suffix mismatch
    /// clears any previously stored one rather than leaving stale data. A
    /// wrong-length input changes nothing.
    pub fn validate_identifier(&mut self, candidate: &str) -> Result<()> {
        match validator::validate(candidate, &self.record.reference_id) {
            Ok(valid) => {
                self.store.set_identifier(&valid)?;
                self.record.identifier_number = valid;
                info!("identifier validated and stored");
                Ok(())
            }
            Err(ValidationError::SuffixMismatch) => {
                self.store.set_identifier("")?;
                self.record.identifier_number.clear();
                warn!("identifier rejected: suffix mismatch; cleared stored identifier");
                Err(ValidationError::SuffixMismatch.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Returns both the persisted and in-memory state to the all-empty
    /// record.
    pub fn reset(&mut self) -> Result<()> {
        self.store.reset()?;
        self.record = KycRecord::default();
        info!("session reset");
        Ok(())
    }
}
