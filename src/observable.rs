use crate::error::{DataError, Result};
use crate::prelude::*;
use csv;
use std::io::Read;

/// Column positions of the four family fields in a header row.
#[derive(Clone, Copy)]
struct Columns {
    name: usize,
    mother: usize,
    father: usize,
    has_trait: usize,
}

/// Produces `Record`s from delimited family data
///
/// `Csv` implements Iterator so it can be collected
/// directly and handed to `Family::new()`
pub struct Csv {
    records: std::iter::Enumerate<csv::StringRecordsIntoIter<Box<dyn Read>>>,
    columns: Columns,
}

impl Csv {
    fn new(records: csv::StringRecordsIntoIter<Box<dyn Read>>, columns: Columns) -> Self {
        Self {
            records: records.into_iter().enumerate(),
            columns,
        }
    }

    fn to_record(&self, row: usize, fields: &csv::StringRecord) -> Result<Record> {
        let field = |i: usize| fields.get(i).map(str::trim).unwrap_or("");
        let optional = |i: usize| match field(i) {
            "" => None,
            s => Some(s.to_owned()),
        };

        let name = field(self.columns.name);
        if name.is_empty() {
            return Err(DataError::BlankName { row }.into());
        }

        let has_trait = match field(self.columns.has_trait) {
            "1" => Some(true),
            "0" => Some(false),
            "" => None,
            other => {
                return Err(DataError::MalformedTrait {
                    row,
                    value: other.to_owned(),
                }
                .into())
            }
        };

        Ok(Record {
            name: name.to_owned(),
            mother: optional(self.columns.mother),
            father: optional(self.columns.father),
            has_trait,
        })
    }
}

impl Iterator for Csv {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        let (idx, row) = self.records.next()?;
        // Data rows are numbered from 1, after the header.
        let row_number = idx + 1;
        Some(match row {
            Ok(fields) => self.to_record(row_number, &fields),
            Err(e) => Err(e.into()),
        })
    }
}

pub struct CsvBuilder {
    delimiter: u8,
    name_field: String,
    mother_field: String,
    father_field: String,
    trait_field: String,
}

impl CsvBuilder {
    /// Construct a new Csv builder for `name,mother,father,trait` data
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            name_field: "name".to_owned(),
            mother_field: "mother".to_owned(),
            father_field: "father".to_owned(),
            trait_field: "trait".to_owned(),
        }
    }

    pub fn delimiter(&mut self, delimiter: u8) -> &mut Self {
        self.delimiter = delimiter;
        self
    }

    pub fn name_field(&mut self, name_field: &str) -> &mut Self {
        self.name_field = name_field.to_owned();
        self
    }

    pub fn mother_field(&mut self, mother_field: &str) -> &mut Self {
        self.mother_field = mother_field.to_owned();
        self
    }

    pub fn father_field(&mut self, father_field: &str) -> &mut Self {
        self.father_field = father_field.to_owned();
        self
    }

    pub fn trait_field(&mut self, trait_field: &str) -> &mut Self {
        self.trait_field = trait_field.to_owned();
        self
    }

    pub fn from_reader(&self, reader: Box<dyn Read>) -> Result<Csv> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(self.delimiter)
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let position = |field: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == field)
                .ok_or_else(|| DataError::MissingColumn(field.to_owned()).into())
        };

        let columns = Columns {
            name: position(&self.name_field)?,
            mother: position(&self.mother_field)?,
            father: position(&self.father_field)?,
            has_trait: position(&self.trait_field)?,
        };

        Ok(Csv::new(rdr.into_records(), columns))
    }
}

impl Default for CsvBuilder {
    fn default() -> Self {
        Self::new()
    }
}
