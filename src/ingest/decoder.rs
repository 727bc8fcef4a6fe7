//! Turns a framed item into a typed record.
//!
//! An item looks like
//!
//! ```text
//! <item><type>636f7265</type><code>6d696e6d</code><length>3</length>
//! <data encoding="base64">
//! Rm9v</data></item>
//! ```
//!
//! `type` and `code` are hex encoded ASCII, the optional `data` payload is
//! base64.

use std::{collections::BTreeMap, fmt::Display};

use base64::{Engine, engine::general_purpose::STANDARD};
use quick_xml::{Reader, events::Event};

use crate::{
    domain::code::FourCc,
    ingest::{
        error::{DecodeError, FrameError},
        framer::RawRecord,
    },
};

const ITEM: &str = "item";
const CODE: &str = "code";
const TYPE: &str = "type";
const DATA: &str = "data";
const ENCODING: &str = "encoding";
const BASE64: &str = "base64";

/// Payloads longer than this are summarized by length when displayed
const DISPLAY_LIMIT: usize = 32;

/// The `data` section of an item
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DataSection {
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
}

/// Generic key/value view of an item, before any decoding
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub fields: BTreeMap<String, String>,
    pub data: Option<DataSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
}

impl Payload {
    pub fn len(&self) -> usize {
        match self {
            Payload::Text(text) => text.len(),
            Payload::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Bytes(bytes) => bytes,
        }
    }

    /// Text content, replacing invalid UTF-8 sequences when the payload is binary
    pub fn to_text(&self) -> String {
        match self {
            Payload::Text(text) => text.clone(),
            Payload::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

/// One decoded metadata item. Fields that failed to decode are `None`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub code: Option<FourCc>,
    pub kind: Option<FourCc>,
    pub payload: Option<Payload>,
}

impl Display for DecodedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let or_unknown = |c: Option<FourCc>| c.map(|c| c.to_string()).unwrap_or("????".into());
        write!(f, "{}/{}", or_unknown(self.kind), or_unknown(self.code))?;
        match &self.payload {
            None => Ok(()),
            Some(p) if p.len() > DISPLAY_LIMIT => write!(f, ": {} bytes", p.len()),
            Some(Payload::Text(text)) => write!(f, ": {text:?}"),
            Some(Payload::Bytes(bytes)) => write!(f, ": {bytes:?}"),
        }
    }
}

/// Parses the item markup into a [`RawItem`] without interpreting any value
pub fn parse_item(record: &RawRecord) -> Result<RawItem, FrameError> {
    let mut reader = Reader::from_str(record.as_str());
    reader.trim_text(true);

    let mut item: Option<RawItem> = None;
    // name of the open child element of <item>, with its text so far
    let mut current: Option<(String, String)> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match depth {
                    1 if name == ITEM => item = Some(RawItem::default()),
                    1 => return Err(FrameError::Malformed(format!("unexpected <{name}>"))),
                    2 => {
                        if name == DATA {
                            let mut attributes = BTreeMap::new();
                            for attr in e.attributes() {
                                let attr = attr.map_err(quick_xml::Error::from)?;
                                attributes.insert(
                                    String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                                    attr.unescape_value()?.into_owned(),
                                );
                            }
                            if let Some(item) = item.as_mut() {
                                item.data = Some(DataSection {
                                    attributes,
                                    text: None,
                                });
                            }
                        }
                        current = Some((name, String::new()));
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if depth == 0 && name == ITEM {
                    return Ok(RawItem::default());
                }
            }
            Event::Text(t) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&t.unescape()?);
                }
            }
            Event::CData(c) => {
                if let Some((_, text)) = current.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let (Some(item), Some((name, text))) = (item.as_mut(), current.take()) {
                        if name == DATA {
                            if let Some(data) = item.data.as_mut() {
                                data.text = (!text.is_empty()).then_some(text);
                            }
                        } else {
                            item.fields.insert(name, text);
                        }
                    }
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if let Some(item) = item {
                        return Ok(item);
                    }
                }
            }
            Event::Eof => {
                return Err(match item {
                    Some(_) => FrameError::Malformed("item is not closed".into()),
                    None => FrameError::Malformed("no <item> element".into()),
                });
            }
            _ => {}
        }
    }
}

fn decode_code(field: &'static str, hex_text: &str) -> Result<FourCc, DecodeError> {
    let bytes = hex::decode(hex_text.trim()).map_err(|source| DecodeError::Hex { field, source })?;
    FourCc::from_slice(&bytes).ok_or(DecodeError::CodeLength {
        field,
        len: bytes.len(),
    })
}

fn decode_base64(text: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    Ok(STANDARD.decode(compact)?)
}

/// Valid UTF-8 becomes text, anything else stays raw bytes
pub fn interpret_payload(bytes: Vec<u8>) -> Payload {
    match String::from_utf8(bytes) {
        Ok(text) => Payload::Text(text),
        Err(e) => Payload::Bytes(e.into_bytes()),
    }
}

fn decode_payload(data: &DataSection) -> Result<Option<Payload>, DecodeError> {
    let is_base64 = data
        .attributes
        .get(ENCODING)
        .is_some_and(|enc| enc == BASE64);
    match (&data.text, is_base64) {
        (Some(text), true) => Ok(Some(interpret_payload(decode_base64(text)?))),
        _ => Ok(None),
    }
}

fn keep_decoded<T>(result: Result<T, DecodeError>, record: &RawRecord) -> Option<T> {
    result
        .map_err(|e| log::warn!("{e}, field dropped from {} byte item", record.as_str().len()))
        .ok()
}

/// Parses and decodes one framed item.
///
/// Only markup errors fail the whole record. A `code`, `type` or payload that
/// does not decode is logged and left out.
pub fn decode(record: &RawRecord) -> Result<DecodedRecord, FrameError> {
    let item = parse_item(record)?;

    let code = item
        .fields
        .get(CODE)
        .and_then(|hex| keep_decoded(decode_code(CODE, hex), record));
    let kind = item
        .fields
        .get(TYPE)
        .and_then(|hex| keep_decoded(decode_code(TYPE, hex), record));
    let payload = item
        .data
        .as_ref()
        .and_then(|data| keep_decoded(decode_payload(data), record))
        .flatten();

    Ok(DecodedRecord {
        code,
        kind,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use base64::{Engine, engine::general_purpose::STANDARD};

    use super::*;

    fn record(s: &str) -> RawRecord {
        RawRecord(s.to_string())
    }

    fn item(kind: &str, code: &str, data: Option<&[u8]>) -> RawRecord {
        let mut s = format!(
            "<item><type>{}</type><code>{}</code><length>{}</length>",
            hex::encode(kind),
            hex::encode(code),
            data.map(|d| d.len()).unwrap_or(0)
        );
        if let Some(data) = data {
            s.push_str(&format!(
                "\n<data encoding=\"base64\">\n{}</data>",
                STANDARD.encode(data)
            ));
        }
        s.push_str("</item>\n");
        RawRecord(s)
    }

    #[test]
    fn test_parse_item_collects_fields_and_data() {
        let raw = parse_item(&item("core", "minm", Some(b"Foo"))).unwrap();

        assert_eq!(raw.fields.get("type").unwrap(), "636f7265");
        assert_eq!(raw.fields.get("code").unwrap(), "6d696e6d");
        assert_eq!(raw.fields.get("length").unwrap(), "3");
        let data = raw.data.unwrap();
        assert_eq!(data.attributes.get("encoding").unwrap(), "base64");
        assert_eq!(data.text.as_deref(), Some("Rm9v"));
    }

    #[test]
    fn test_decodes_text_payload() {
        let decoded = decode(&item("core", "minm", Some("Ünïcode".as_bytes()))).unwrap();

        assert_eq!(decoded.code, Some(FourCc::TITLE));
        assert_eq!(decoded.kind, Some(FourCc(*b"core")));
        assert_eq!(decoded.payload, Some(Payload::Text("Ünïcode".to_string())));
    }

    #[test]
    fn test_invalid_utf8_payload_stays_bytes() {
        let png = b"\x89PNG\r\n\x1a\n\xff\x00".to_vec();
        let decoded = decode(&item("ssnc", "PICT", Some(&png))).unwrap();

        assert_eq!(decoded.code, Some(FourCc::PICTURE));
        assert_eq!(decoded.payload, Some(Payload::Bytes(png)));
    }

    #[test]
    fn test_item_without_data_has_no_payload() {
        let decoded = decode(&item("ssnc", "pbeg", None)).unwrap();
        assert_eq!(decoded.code, Some(FourCc(*b"pbeg")));
        assert_eq!(decoded.payload, None);
    }

    #[test]
    fn test_base64_may_span_lines() {
        let decoded = decode(&record(
            "<item><type>636f7265</type><code>61736172</code><length>6</length>\n\
<data encoding=\"base64\">\nU3Vn\nYXIg</data></item>\n",
        ))
        .unwrap();
        assert_eq!(decoded.payload, Some(Payload::Text("Sugar ".to_string())));
    }

    #[test]
    fn test_bad_hex_code_is_dropped_but_record_survives() {
        let decoded = decode(&record(
            "<item><type>636f7265</type><code>zz</code><data encoding=\"base64\">Rm9v</data></item>",
        ))
        .unwrap();

        assert_eq!(decoded.code, None);
        assert_eq!(decoded.kind, Some(FourCc(*b"core")));
        assert_eq!(decoded.payload, Some(Payload::Text("Foo".into())));
    }

    #[test]
    fn test_code_of_wrong_length_is_dropped() {
        let decoded = decode(&record("<item><code>6d696e</code></item>")).unwrap();
        assert_eq!(decoded.code, None);
    }

    #[test]
    fn test_bad_base64_is_dropped_but_code_survives() {
        let decoded = decode(&record(
            "<item><code>6d696e6d</code><data encoding=\"base64\">!!not base64!!</data></item>",
        ))
        .unwrap();

        assert_eq!(decoded.code, Some(FourCc::TITLE));
        assert_eq!(decoded.payload, None);
    }

    #[test]
    fn test_non_base64_data_is_ignored() {
        let decoded =
            decode(&record("<item><code>6d696e6d</code><data>plain</data></item>")).unwrap();
        assert_eq!(decoded.payload, None);
    }

    #[test]
    fn test_malformed_markup_is_a_frame_error() {
        assert!(matches!(
            decode(&record("<item><code>6d696e6d</type></item>")),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            decode(&record("just some text\n")),
            Err(FrameError::Malformed(_))
        ));
        assert!(matches!(
            decode(&record("<other><code>6d696e6d</code></other>")),
            Err(FrameError::Malformed(_))
        ));
    }

    #[test]
    fn test_display_summarizes_long_payloads() {
        let short = decode(&item("core", "minm", Some(b"Foo"))).unwrap();
        assert_eq!(short.to_string(), "core/minm: \"Foo\"");

        let long = decode(&item("ssnc", "PICT", Some(&[0xffu8; 64]))).unwrap();
        assert_eq!(long.to_string(), "ssnc/PICT: 64 bytes");

        assert_eq!(DecodedRecord::default().to_string(), "????/????");
    }
}
