use std::collections::HashSet;
use std::io::Read;

use csv::ReaderBuilder;

use crate::error::Error;

// Pulls cif values out of an uploaded sheet. Every cell of every row is
// scanned; there is no reserved header row or cif column. A cell counts
// if, after trimming, it is exactly eight ascii digits. First occurrence
// wins, so the returned list is duplicate-free and keeps sheet order.
pub fn extract_cifs<R: Read>(input: R) -> Result<Vec<String>, Error> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(input);

    let mut seen = HashSet::new();
    let mut cifs = Vec::new();

    for record in reader.records() {
        let record = record.map_err(Error::MalformedSpreadsheet)?;
        for cell in record.iter() {
            let value = cell.trim();
            if is_cif(value) && !seen.contains(value) {
                seen.insert(value.to_string());
                cifs.push(value.to_string());
            }
        }
    }

    if cifs.is_empty() {
        return Err(Error::NoCifsFound);
    }

    Ok(cifs)
}

fn is_cif(value: &str) -> bool {
    value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit())
}
