//! The parse and filter stages of the CSV import.
//!
//! Records are read lazily from the source one at a time. The first line is
//! always treated as a header and skipped, whatever it contains.

use std::io::Read;

use csv::StringRecord;

use crate::Error;

const TITLE_COLUMN: usize = 0;
const TYPE_COLUMN: usize = 1;
const VALUE_COLUMN: usize = 2;
const CATEGORY_COLUMN: usize = 3;

/// One row of an imported CSV file, split into trimmed cells.
///
/// No validation has been done on the cells yet, missing cells are empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// The line in the source that the record starts on.
    pub line: u64,
    /// The transaction title.
    pub title: String,
    /// The transaction type, expected to be "income" or "outcome".
    pub transaction_type: String,
    /// The transaction value, expected to be a positive decimal number.
    pub value: String,
    /// The category title, may be empty.
    pub category: String,
}

impl CsvRecord {
    fn from_string_record(record: &StringRecord) -> Self {
        let cell = |index: usize| record.get(index).unwrap_or_default().to_owned();

        Self {
            line: record
                .position()
                .map(|position| position.line())
                .unwrap_or_default(),
            title: cell(TITLE_COLUMN),
            transaction_type: cell(TYPE_COLUMN),
            value: cell(VALUE_COLUMN),
            category: cell(CATEGORY_COLUMN),
        }
    }

    /// Whether the title, type and value cells all have text in them.
    ///
    /// The category is allowed to be empty.
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.transaction_type.is_empty() && !self.value.is_empty()
    }
}

/// Lazily parse comma separated records from `source`, skipping the header line.
///
/// Rows that cannot be decoded (e.g. invalid UTF-8) are skipped. Errors reading
/// from `source` are passed on, since the rest of the input cannot be trusted
/// after one.
pub fn parse_records<R: Read>(source: R) -> impl Iterator<Item = Result<CsvRecord, Error>> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(b',')
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source)
        .into_records()
        .filter_map(|result| match result {
            Ok(record) => Some(Ok(CsvRecord::from_string_record(&record))),
            Err(error) if error.is_io_error() => Some(Err(error.into())),
            Err(error) => {
                tracing::debug!("Skipping malformed CSV row: {error}");
                None
            }
        })
}

/// Drop records that are missing a title, type or value.
pub fn complete_records<I>(records: I) -> impl Iterator<Item = Result<CsvRecord, Error>>
where
    I: Iterator<Item = Result<CsvRecord, Error>>,
{
    records.filter(|result| match result {
        Ok(record) if !record.is_complete() => {
            tracing::debug!("Skipping incomplete CSV row on line {}", record.line);
            false
        }
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{self, Read};

    use crate::Error;

    use super::{CsvRecord, complete_records, parse_records};

    fn parse(text: &str) -> Vec<CsvRecord> {
        parse_records(text.as_bytes())
            .collect::<Result<Vec<_>, _>>()
            .expect("Could not parse CSV")
    }

    #[test]
    fn skips_header_line() {
        let records = parse("title, type, value, category\nSalary, income, 5000, Job");

        assert_eq!(
            records,
            vec![CsvRecord {
                line: 2,
                title: "Salary".to_owned(),
                transaction_type: "income".to_owned(),
                value: "5000".to_owned(),
                category: "Job".to_owned(),
            }]
        );
    }

    #[test]
    fn header_is_skipped_even_if_it_looks_like_data() {
        let records = parse("Salary,income,5000,Job\nRent,outcome,1200,Housing");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Rent");
    }

    #[test]
    fn trims_cells() {
        let records = parse("h1,h2,h3,h4\n   Loan  ,\tincome ,  1500 , Others  ");

        assert_eq!(records[0].title, "Loan");
        assert_eq!(records[0].transaction_type, "income");
        assert_eq!(records[0].value, "1500");
        assert_eq!(records[0].category, "Others");
    }

    #[test]
    fn quoted_cells_can_contain_commas() {
        let records = parse("h1,h2,h3,h4\n\"Rent, March\",outcome,1200,Housing");

        assert_eq!(records[0].title, "Rent, March");
    }

    #[test]
    fn missing_cells_are_empty() {
        let records = parse("h1,h2,h3,h4\nSalary,income");

        assert_eq!(records[0].value, "");
        assert_eq!(records[0].category, "");
    }

    #[test]
    fn header_only_yields_nothing() {
        assert_eq!(parse("title,type,value,category\n"), vec![]);
    }

    #[test]
    fn incomplete_records_are_dropped() {
        let text = "h1,h2,h3,h4\n\
            Salary,income,5000,Job\n\
            ,outcome,50,Misc\n\
            Rent,,1200,Housing\n\
            Coffee,outcome,,Food\n\
            Gift,income,20,";

        let titles: Vec<_> = complete_records(parse_records(text.as_bytes()))
            .map(|record| record.unwrap().title)
            .collect();

        assert_eq!(titles, vec!["Salary", "Gift"]);
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::other("the disk fell off"))
        }
    }

    #[test]
    fn read_errors_are_passed_on() {
        let first = parse_records(BrokenReader).next();

        assert_eq!(first, Some(Err(Error::Io("the disk fell off".to_owned()))));
    }
}
