//! CSV export formatting
//!
//! Output opens with a UTF-8 BOM so spreadsheet tools pick the right
//! encoding, and rows end with CRLF.

const BOM: &str = "\u{FEFF}";

/// Quote a field when it contains a separator, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Row-at-a-time CSV builder.
#[derive(Debug)]
pub struct CsvWriter {
    buf: String,
    columns: usize,
}

impl CsvWriter {
    pub fn new(header: &[&str]) -> Self {
        let mut writer = Self {
            buf: String::from(BOM),
            columns: header.len(),
        };
        writer.push_line(header.iter().copied());
        writer
    }

    /// Append one row. Short rows are padded with empty fields.
    pub fn row<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut fields: Vec<String> = fields.into_iter().map(|f| f.as_ref().to_string()).collect();
        if fields.len() < self.columns {
            fields.resize(self.columns, String::new());
        }
        self.push_line(fields.iter().map(String::as_str));
    }

    fn push_line<'a>(&mut self, fields: impl Iterator<Item = &'a str>) {
        let line: Vec<String> = fields.map(escape_field).collect();
        self.buf.push_str(&line.join(","));
        self.buf.push_str("\r\n");
    }

    pub fn finish(self) -> String {
        self.buf
    }
}

/// Render an optional value as a field.
pub fn opt<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Render epoch millis as an RFC 3339 UTC timestamp.
pub fn timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_field() {
        assert_eq!(escape_field("plain"), "plain");
        assert_eq!(escape_field("a,b"), "\"a,b\"");
        assert_eq!(escape_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_field("line\nbreak"), "\"line\nbreak\"");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn test_writer_bom_and_crlf() {
        let mut w = CsvWriter::new(&["code", "name"]);
        w.row(["1", "Pérez, Ana"]);
        w.row(["2"]);
        let out = w.finish();
        assert_eq!(out, "\u{FEFF}code,name\r\n1,\"Pérez, Ana\"\r\n2,\r\n");
    }

    #[test]
    fn test_helpers() {
        assert_eq!(opt(&Some(5)), "5");
        assert_eq!(opt::<i64>(&None), "");
        assert_eq!(timestamp(0), "1970-01-01T00:00:00Z");
    }
}
