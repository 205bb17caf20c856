// ── Bulk target lists ──
//
// Reads the CSV an operator uploads for a bulk update: one device per row,
// with its id and its address. A header row is optional; when present the
// columns are found by name (`Device ID`, `IP Address`, ...), otherwise the
// id is the first column and the address the second. The whole file is
// validated before any device is contacted.

use std::net::{IpAddr, SocketAddr};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::CoreError;
use crate::model::DeviceTarget;

const ADDRESS_TOKENS: &[&str] = &["ip", "address", "addr", "host"];
const ID_TOKENS: &[&str] = &["id", "name"];

/// Parse a target list. Any malformed row rejects the whole list.
pub fn parse_targets(csv: &str) -> Result<Vec<DeviceTarget>, CoreError> {
    let csv = csv.strip_prefix('\u{feff}').unwrap_or(csv);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(csv.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            let line_no = e.position().map_or(0, csv::Position::line);
            invalid(line_no, &e.to_string())
        })?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        let line_no = record.position().map_or(0, csv::Position::line);
        rows.push((line_no, record));
    }

    let mut rows = rows.into_iter().peekable();
    let columns = match rows.peek() {
        Some((line_no, first)) if is_header(first) => {
            let columns = Columns::from_header(first)
                .ok_or_else(|| invalid(*line_no, "header names no id and address columns"))?;
            rows.next();
            columns
        }
        _ => Columns { id: 0, address: 1 },
    };

    let targets = rows
        .map(|(line_no, record)| columns.target(line_no, &record))
        .collect::<Result<Vec<_>, _>>()?;

    if targets.is_empty() {
        return Err(CoreError::InvalidInput {
            message: "target list contains no devices".into(),
        });
    }
    Ok(targets)
}

struct Columns {
    id: usize,
    address: usize,
}

impl Columns {
    fn from_header(header: &StringRecord) -> Option<Self> {
        let find = |wanted: &[&str], skip: Option<usize>| {
            header
                .iter()
                .enumerate()
                .filter(|(idx, _)| Some(*idx) != skip)
                .find(|(_, name)| tokens(name).any(|t| wanted.contains(&t.as_str())))
                .map(|(idx, _)| idx)
        };
        let address = find(ADDRESS_TOKENS, None)?;
        let id = find(ID_TOKENS, Some(address))?;
        Some(Self { id, address })
    }

    fn target(&self, line_no: u64, record: &StringRecord) -> Result<DeviceTarget, CoreError> {
        let field = |idx: usize, what: &str| {
            record
                .get(idx)
                .filter(|f| !f.is_empty())
                .ok_or_else(|| invalid(line_no, &format!("missing device {what}")))
        };
        let id = field(self.id, "id")?;
        let address = field(self.address, "address")?;
        if !is_address(address) {
            return Err(invalid(line_no, &format!("'{address}' is not an IP address")));
        }
        Ok(DeviceTarget::new(address, id))
    }
}

/// A first row is a header when none of its cells is an address.
fn is_header(record: &StringRecord) -> bool {
    !record.iter().any(is_address)
}

fn is_address(value: &str) -> bool {
    value.parse::<IpAddr>().is_ok() || value.parse::<SocketAddr>().is_ok()
}

fn tokens(name: &str) -> impl Iterator<Item = String> + '_ {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
}

fn invalid(line_no: u64, reason: &str) -> CoreError {
    CoreError::InvalidInput {
        message: format!("target list line {line_no}: {reason}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn named_header_columns() {
        let csv = "Magewell IP,Magewell ID\r\n172.16.6.10,Encoder-10\r\n172.16.6.11,Encoder-11\r\n";
        assert_eq!(
            parse_targets(csv).unwrap(),
            vec![
                DeviceTarget::new("172.16.6.10", "Encoder-10"),
                DeviceTarget::new("172.16.6.11", "Encoder-11"),
            ]
        );
    }

    #[test]
    fn positional_without_header() {
        let csv = "Encoder-1, 10.0.0.1\n\nEncoder-2,10.0.0.2:8080\n";
        assert_eq!(
            parse_targets(csv).unwrap(),
            vec![
                DeviceTarget::new("10.0.0.1", "Encoder-1"),
                DeviceTarget::new("10.0.0.2:8080", "Encoder-2"),
            ]
        );
    }

    #[test]
    fn quoted_fields_and_bom() {
        let csv = "\u{feff}\"Device ID\",\"IP Address\"\n\"Stage, left\",10.0.0.3\n";
        assert_eq!(
            parse_targets(csv).unwrap(),
            vec![DeviceTarget::new("10.0.0.3", "Stage, left")]
        );
    }

    #[test]
    fn bad_address_names_the_line() {
        let csv = "id,ip\nEncoder-1,10.0.0.1\nEncoder-2,10.0.0.300\n";
        let err = parse_targets(csv).unwrap_err();
        assert!(err.to_string().contains("line 3"), "{err}");
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn missing_id_is_rejected() {
        let err = parse_targets("id,ip\n,10.0.0.1\n").unwrap_err();
        assert!(err.to_string().contains("missing device id"), "{err}");
    }

    #[test]
    fn header_without_usable_columns() {
        let err = parse_targets("foo,bar\nx,10.0.0.1\n").unwrap_err();
        assert!(err.to_string().contains("line 1"), "{err}");
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(parse_targets("").is_err());
        assert!(parse_targets("id,ip\n").is_err());
    }

    #[test]
    fn quoted_field_spanning_lines() {
        let csv = "Device ID,IP Address\n\"Stage\nleft\",10.0.0.3\nEncoder-2,10.0.0.2\n";
        assert_eq!(
            parse_targets(csv).unwrap(),
            vec![
                DeviceTarget::new("10.0.0.3", "Stage\nleft"),
                DeviceTarget::new("10.0.0.2", "Encoder-2"),
            ]
        );
    }

    #[test]
    fn line_numbers_follow_multiline_records() {
        let csv = "id,ip\n\"Stage\nleft\",10.0.0.3\nEncoder-2,not-an-ip\n";
        let err = parse_targets(csv).unwrap_err();
        assert!(err.to_string().contains("line 4"), "{err}");
    }
}
