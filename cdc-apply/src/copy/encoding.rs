use bytes::Bytes;

use crate::bail;
use crate::conversions::decode_binary;
use crate::error::{ApplyResult, ErrorKind};
use crate::types::{BinaryEncoding, ColumnSchema};

/// Field delimiter used on the copy channel.
pub const DELIMITER: char = ',';

/// Quote character used on the copy channel.
pub const QUOTE: char = '\'';

/// Row separator used on the copy channel.
pub const ROW_SEPARATOR: char = '\n';

/// Encodes one row of text field values into the exact byte representation
/// the copy channel expects.
///
/// Binary column values are decoded from the batch's text encoding and
/// re-encoded with the octal escape scheme of [`escape_bytes`], then all
/// fields get delimiter/quote escaping and the finished row is terminated
/// with the row separator. NUL bytes are stripped from the final row since a
/// NUL closes a copy-protocol text frame and always corrupts the row.
pub fn encode_row(
    row_data: &[Option<String>],
    columns: &[ColumnSchema],
    encoding: BinaryEncoding,
) -> ApplyResult<Bytes> {
    if row_data.len() != columns.len() {
        bail!(
            ErrorKind::EncodingError,
            "Row has a different number of fields than the target table has columns",
            format!(
                "row has {} fields, table has {} columns",
                row_data.len(),
                columns.len()
            )
        );
    }

    let mut row = String::new();

    for (i, (value, column)) in row_data.iter().zip(columns).enumerate() {
        if i > 0 {
            row.push(DELIMITER);
        }

        match value {
            Some(value) if column.is_binary() && encoding != BinaryEncoding::None => {
                let raw = decode_binary(value, encoding)?;
                push_field(&mut row, &escape_bytes(&raw));
            }
            Some(value) => push_field(&mut row, value),
            // SQL NULL travels as an empty, unquoted field.
            None => {}
        }
    }

    row.push(ROW_SEPARATOR);

    let bytes: Vec<u8> = row.bytes().filter(|b| *b != 0).collect();

    Ok(Bytes::from(bytes))
}

/// Appends one field value with delimiter/quote escaping.
///
/// A field is wrapped in quotes when it is empty (to distinguish the empty
/// string from NULL) or contains the delimiter, the quote character or a
/// line break; embedded quotes are doubled.
fn push_field(row: &mut String, value: &str) {
    let needs_quoting = value.is_empty()
        || value
            .chars()
            .any(|c| c == DELIMITER || c == QUOTE || c == '\n' || c == '\r');

    if !needs_quoting {
        row.push_str(value);
        return;
    }

    row.push(QUOTE);
    for c in value.chars() {
        if c == QUOTE {
            row.push(QUOTE);
        }
        row.push(c);
    }
    row.push(QUOTE);
}

/// Re-encodes raw bytes into the escape scheme the copy channel's text
/// parser can ingest without corrupting control bytes.
///
/// Bytes 0–7 become `\00<octal>`, bytes 8–31 become `\0<octal>`, byte 92
/// (backslash) and bytes >= 127 become `\<octal>`; everything else passes
/// through unchanged.
pub fn escape_bytes(data: &[u8]) -> String {
    let mut out = String::with_capacity(data.len());

    for &b in data {
        match b {
            0..=7 => out.push_str(&format!("\\00{:o}", b)),
            8..=31 => out.push_str(&format!("\\0{:o}", b)),
            92 | 127..=255 => out.push_str(&format!("\\{:o}", b)),
            _ => out.push(b as char),
        }
    }

    out
}
