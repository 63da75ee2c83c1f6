use crate::domain::{Address, KycRecord};
use crate::error::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// Element vocabulary of the offline KYC document. Fixed and unversioned.
const ROOT_ELEMENT: &str = "OfflinePaperlessKyc";
const DATA_ELEMENT: &str = "UidData";
const IDENTITY_ELEMENT: &str = "Poi";
const ADDRESS_ELEMENT: &str = "Poa";
const PORTRAIT_ELEMENT: &str = "Pht";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Scanning for the document root; the reference token is captured
    /// here but no record exists yet.
    RootSeek,
    /// Inside the data container; a record is being populated.
    InDocument,
    /// Inside the portrait element, accumulating character data.
    InPortrait,
}

/// Streaming decoder for the KYC document, driven one element event at a
/// time. The state machine is explicit so transitions can be exercised in
/// tests without a live XML reader.
///
/// Unknown elements and attributes are silently ignored; the source format
/// treats everything as optional, and tolerance is the contract here.
pub struct RecordParser {
    state: State,
    reference_id: String,
    record: Option<KycRecord>,
    portrait: String,
    open_elements: Vec<String>,
}

impl RecordParser {
    pub fn new() -> Self {
        Self {
            state: State::RootSeek,
            reference_id: String::new(),
            record: None,
            portrait: String::new(),
            open_elements: Vec::new(),
        }
    }

    pub fn start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        self.open_elements.push(name.to_string());
        match name {
            ROOT_ELEMENT => {
                self.reference_id = attr_value(attrs, "referenceId");
            }
            DATA_ELEMENT => {
                // Entering the data container replaces any previous record
                // wholesale; no stale fields survive a re-parse.
                self.record = Some(KycRecord::with_reference_id(self.reference_id.clone()));
                self.state = State::InDocument;
            }
            IDENTITY_ELEMENT => {
                if let Some(record) = self.record.as_mut() {
                    record.name = attr_value(attrs, "name");
                    record.dob = attr_value(attrs, "dob");
                    record.gender = attr_value(attrs, "gender");
                }
            }
            ADDRESS_ELEMENT => {
                if let Some(record) = self.record.as_mut() {
                    record.address = Address {
                        care_of: attr_value(attrs, "careof"),
                        country: attr_value(attrs, "country"),
                        district: attr_value(attrs, "dist"),
                        house: attr_value(attrs, "house"),
                        landmark: attr_value(attrs, "landmark"),
                        locality: attr_value(attrs, "loc"),
                        pincode: attr_value(attrs, "pc"),
                        post_office: attr_value(attrs, "po"),
                        state: attr_value(attrs, "state"),
                        street: attr_value(attrs, "street"),
                        sub_district: attr_value(attrs, "subdist"),
                        vtc: attr_value(attrs, "vtc"),
                    };
                }
            }
            PORTRAIT_ELEMENT => {
                self.portrait.clear();
                self.state = State::InPortrait;
            }
            _ => {}
        }
    }

    pub fn text(&mut self, value: &str) -> Result<(), ParseError> {
        match self.state {
            State::InPortrait => self.portrait.push_str(value),
            State::RootSeek if self.open_elements.is_empty() && !value.trim().is_empty() => {
                return Err(ParseError::Malformed(
                    "character data outside of document root".to_string(),
                ));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn end_element(&mut self, name: &str) -> Result<(), ParseError> {
        match self.open_elements.pop() {
            Some(open) if open == name => {}
            _ => {
                return Err(ParseError::Malformed(format!(
                    "unexpected closing tag </{name}>"
                )));
            }
        }
        if name == PORTRAIT_ELEMENT && self.state == State::InPortrait {
            if let Some(record) = self.record.as_mut() {
                record.encoded_image = self.portrait.trim().to_string();
                self.state = State::InDocument;
            } else {
                self.state = State::RootSeek;
            }
        }
        Ok(())
    }

    /// Consumes the machine. `Ok(None)` means the document was well formed
    /// but never contained the data container; that is not an error.
    pub fn finish(self) -> Result<Option<KycRecord>, ParseError> {
        if !self.open_elements.is_empty() {
            return Err(ParseError::Malformed(format!(
                "document ended with <{}> still open",
                self.open_elements.last().map(String::as_str).unwrap_or("")
            )));
        }
        Ok(self.record)
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new()
    }
}

fn attr_value(attrs: &[(String, String)], key: &str) -> String {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.clone())
        .unwrap_or_default()
}

/// Decodes the document into a record. Given identical bytes the output is
/// always identical; malformed input never yields a partial record.
pub fn parse(xml: &[u8]) -> Result<Option<KycRecord>, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut parser = RecordParser::new();
    let mut buf = Vec::new();
    let mut saw_content = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                saw_content = true;
                let (name, attrs) = decode_start(&e)?;
                parser.start_element(&name, &attrs);
            }
            Ok(Event::Empty(e)) => {
                saw_content = true;
                let (name, attrs) = decode_start(&e)?;
                parser.start_element(&name, &attrs);
                parser.end_element(&name)?;
            }
            Ok(Event::End(e)) => {
                let name = decode_name(e.name().as_ref())?;
                parser.end_element(&name)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(ParseError::from)?;
                parser.text(&text)?;
            }
            Ok(Event::CData(t)) => {
                let inner = t.into_inner();
                let text = String::from_utf8_lossy(&inner).into_owned();
                parser.text(&text)?;
            }
            Ok(Event::Eof) => break,
            // Declarations, comments, doctypes and PIs carry no record data.
            Ok(_) => {}
            Err(e) => return Err(e.into()),
        }
        buf.clear();
    }
    if !saw_content {
        return Err(ParseError::Malformed(
            "input contains no XML elements".to_string(),
        ));
    }
    let record = parser.finish()?;
    debug!(
        record_present = record.is_some(),
        "finished decoding KYC document"
    );
    Ok(record)
}

fn decode_start(e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), ParseError> {
    let name = decode_name(e.name().as_ref())?;
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::Malformed(err.to_string()))?;
        let key = decode_name(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(ParseError::from)?
            .into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

fn decode_name(bytes: &[u8]) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| ParseError::Malformed(format!("non-UTF8 element name: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<OfflinePaperlessKyc referenceId="123420240101abcdef">
  <UidData>
    <Poi name="Asha Kumari" dob="01-01-1990" gender="F"/>
    <Poa careof="D/O Ram Kumar" country="India" dist="Pune" house="12A"
         landmark="Near Temple" loc="Shivaji Nagar" pc="411005" po="Pune City"
         state="Maharashtra" street="MG Road" subdist="Haveli" vtc="Pune"/>
    <Pht>
      aGVsbG8=
    </Pht>
  </UidData>
  <Signature>ignored</Signature>
</OfflinePaperlessKyc>"#;

    #[test]
    fn decodes_full_document() {
        let record = parse(FULL_DOC.as_bytes()).unwrap().unwrap();
        assert_eq!(record.reference_id, "123420240101abcdef");
        assert_eq!(record.name, "Asha Kumari");
        assert_eq!(record.dob, "01-01-1990");
        assert_eq!(record.gender, "F");
        assert_eq!(record.address.care_of, "D/O Ram Kumar");
        assert_eq!(record.address.district, "Pune");
        assert_eq!(record.address.pincode, "411005");
        assert_eq!(record.address.vtc, "Pune");
        assert_eq!(record.encoded_image, "aGVsbG8=");
        assert_eq!(record.identifier_number, "");
    }

    #[test]
    fn missing_address_yields_empty_address() {
        let doc = r#"<OfflinePaperlessKyc referenceId="9999">
            <UidData><Poi name="X" dob="" gender="M"/></UidData>
        </OfflinePaperlessKyc>"#;
        let record = parse(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(record.address, Address::default());
        assert_eq!(record.name, "X");
    }

    #[test]
    fn missing_attributes_become_empty_strings() {
        let doc = r#"<OfflinePaperlessKyc referenceId="1234">
            <UidData><Poi name="Only Name"/><Poa state="Kerala"/></UidData>
        </OfflinePaperlessKyc>"#;
        let record = parse(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(record.name, "Only Name");
        assert_eq!(record.dob, "");
        assert_eq!(record.gender, "");
        assert_eq!(record.address.state, "Kerala");
        assert_eq!(record.address.country, "");
    }

    #[test]
    fn document_without_data_container_is_absent_not_error() {
        let doc = r#"<OfflinePaperlessKyc referenceId="1234"><Other/></OfflinePaperlessKyc>"#;
        assert!(parse(doc.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn garbage_bytes_are_malformed() {
        assert!(matches!(
            parse(b"definitely not xml"),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(parse(b""), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn truncated_document_is_malformed() {
        let doc = r#"<OfflinePaperlessKyc referenceId="1234"><UidData><Poi name="X""#;
        assert!(matches!(
            parse(doc.as_bytes()),
            Err(ParseError::Malformed(_))
        ));

        let unclosed = r#"<OfflinePaperlessKyc referenceId="1234"><UidData>"#;
        assert!(matches!(
            parse(unclosed.as_bytes()),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        let doc = r#"<OfflinePaperlessKyc><UidData></OfflinePaperlessKyc></UidData>"#;
        assert!(matches!(
            parse(doc.as_bytes()),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn unknown_elements_are_ignored() {
        let doc = r#"<OfflinePaperlessKyc referenceId="abcd">
            <Mystery attr="1"><Deep/></Mystery>
            <UidData><Poi name="Y" dob="d" gender="F"/><Extra>text</Extra></UidData>
        </OfflinePaperlessKyc>"#;
        let record = parse(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(record.name, "Y");
        assert_eq!(record.reference_id, "abcd");
    }

    #[test]
    fn portrait_text_is_trimmed() {
        let doc = "<OfflinePaperlessKyc referenceId=\"r\"><UidData><Pht>\n  YWJj  \n</Pht></UidData></OfflinePaperlessKyc>";
        let record = parse(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(record.encoded_image, "YWJj");
    }

    #[test]
    fn reparse_replaces_record_wholesale() {
        // Two data containers in one document: the second wins completely.
        let doc = r#"<OfflinePaperlessKyc referenceId="r">
            <UidData><Poi name="First" dob="a" gender="F"/><Poa state="Goa"/></UidData>
            <UidData><Poi name="Second"/></UidData>
        </OfflinePaperlessKyc>"#;
        let record = parse(doc.as_bytes()).unwrap().unwrap();
        assert_eq!(record.name, "Second");
        assert_eq!(record.address.state, "");
    }

    #[test]
    fn state_machine_transitions_drive_cleanly_without_a_reader() {
        let mut fsm = RecordParser::new();
        fsm.start_element(
            "OfflinePaperlessKyc",
            &[("referenceId".to_string(), "5678ref".to_string())],
        );
        fsm.start_element("UidData", &[]);
        fsm.start_element("Poi", &[("name".to_string(), "Z".to_string())]);
        fsm.end_element("Poi").unwrap();
        fsm.start_element("Pht", &[]);
        fsm.text(" aW1n ").unwrap();
        fsm.end_element("Pht").unwrap();
        fsm.end_element("UidData").unwrap();
        fsm.end_element("OfflinePaperlessKyc").unwrap();
        let record = fsm.finish().unwrap().unwrap();
        assert_eq!(record.reference_id, "5678ref");
        assert_eq!(record.name, "Z");
        assert_eq!(record.encoded_image, "aW1n");
    }
}
