use crate::{OutputRecord, ParseError};
use std::io::{BufRead, Write};

/// Serialize records as newline-delimited JSON, one object per line.
pub fn write_ndjson<'a, W, I>(records: I, mut out: W) -> Result<usize, ParseError>
where
    W: Write,
    I: IntoIterator<Item = &'a OutputRecord>,
{
    let mut count = 0;
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
        count += 1;
    }
    out.flush()?;
    Ok(count)
}

/// Read NDJSON records back, skipping blank lines.
pub fn parse_ndjson<R: BufRead>(reader: R) -> Result<Vec<OutputRecord>, ParseError> {
    let mut records = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        records.push(serde_json::from_str(line)?);
    }

    Ok(records)
}
