use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Postal address block of the credential. Every field is independently
/// optional in the source document; empty string is the "not present"
/// sentinel throughout, never an Option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub care_of: String,
    pub country: String,
    pub district: String,
    pub house: String,
    pub landmark: String,
    pub locality: String,
    pub pincode: String,
    pub post_office: String,
    pub state: String,
    pub street: String,
    pub sub_district: String,
    pub vtc: String,
}

/// The canonical extracted identity record. Fully replaced on every
/// successful extraction; `identifier_number` is the only field amended
/// after the fact, and only by a passing validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KycRecord {
    /// Opaque reference token from the document root; its first four
    /// characters are the fragment the identifier check binds against.
    pub reference_id: String,
    pub name: String,
    pub dob: String,
    pub gender: String,
    pub address: Address,
    /// Base64 portrait payload, kept as text until rendering time.
    pub encoded_image: String,
    /// 12-digit identifier supplied out-of-band by the user; empty until
    /// it passes validation.
    pub identifier_number: String,
}

impl KycRecord {
    /// Creates a record holding only the reference token, everything else
    /// empty. This is the shape the parser instantiates on entering the
    /// data container.
    pub fn with_reference_id(reference_id: String) -> Self {
        Self {
            reference_id,
            ..Self::default()
        }
    }

    /// Flat key/value view of the persisted fields, in stable key order.
    /// Note: `vtc` is decoded by the parser but was never written to the
    /// persistence layer in the original app; the gap is preserved here.
    pub fn persisted_fields(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("referenceId", self.reference_id.as_str()),
            ("name", self.name.as_str()),
            ("gender", self.gender.as_str()),
            ("dob", self.dob.as_str()),
            ("careof", self.address.care_of.as_str()),
            ("country", self.address.country.as_str()),
            ("dist", self.address.district.as_str()),
            ("house", self.address.house.as_str()),
            ("landmark", self.address.landmark.as_str()),
            ("loc", self.address.locality.as_str()),
            ("pc", self.address.pincode.as_str()),
            ("po", self.address.post_office.as_str()),
            ("state", self.address.state.as_str()),
            ("street", self.address.street.as_str()),
            ("subdist", self.address.sub_district.as_str()),
            ("encodedImage", self.encoded_image.as_str()),
            ("aadharNum", self.identifier_number.as_str()),
        ]
    }

    /// Rebuilds a record from the flat persisted key set. Missing keys
    /// become empty strings; the store is forgiving of never-initialized
    /// state.
    pub fn from_persisted(mut fields: HashMap<String, String>) -> Self {
        let mut take = |key: &str| fields.remove(key).unwrap_or_default();
        Self {
            reference_id: take("referenceId"),
            name: take("name"),
            gender: take("gender"),
            dob: take("dob"),
            address: Address {
                care_of: take("careof"),
                country: take("country"),
                district: take("dist"),
                house: take("house"),
                landmark: take("landmark"),
                locality: take("loc"),
                pincode: take("pc"),
                post_office: take("po"),
                state: take("state"),
                street: take("street"),
                sub_district: take("subdist"),
                vtc: String::new(),
            },
            encoded_image: take("encodedImage"),
            identifier_number: take("aadharNum"),
        }
    }

    /// The validated identifier grouped in blocks of four for display,
    /// e.g. `1234 5678 9012`. Empty when no identifier has been validated.
    pub fn formatted_identifier(&self) -> String {
        let mut out = String::new();
        for (index, ch) in self.identifier_number.chars().enumerate() {
            if index > 0 && index % 4 == 0 {
                out.push(' ');
            }
            out.push(ch);
        }
        out
    }

    /// Masked display form: only the reference fragment is shown,
    /// e.g. `XXXX XXXX 1234`.
    pub fn masked_identifier(&self) -> String {
        let fragment: String = self.reference_id.chars().take(4).collect();
        if fragment.is_empty() {
            "XXXX XXXX XXXX".to_string()
        } else {
            format!("XXXX XXXX {}", fragment)
        }
    }

    /// Decoded portrait bytes, or `None` when the payload is absent or is
    /// not valid base64 (a corrupted credential file).
    pub fn portrait_bytes(&self) -> Option<Vec<u8>> {
        if self.encoded_image.is_empty() {
            return None;
        }
        base64::engine::general_purpose::STANDARD
            .decode(self.encoded_image.as_bytes())
            .ok()
    }
}
