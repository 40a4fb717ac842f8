//! CSV reader/writer construction, delimiter resolution and input decoding.
//!
//! Every CSV the pipeline touches goes through here: the raw reservation
//! export, the competitor snapshot, and the tables written by the loader.
//! The `-` path means stdout for writers.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{EtlError, EtlResult};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> EtlResult<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| EtlError::parse(format!("unknown encoding '{value}'"))),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

/// Reading options shared by every CSV source.
#[derive(Debug, Clone, Copy)]
pub struct CsvSource {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
}

impl Default for CsvSource {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
        }
    }
}

impl CsvSource {
    pub fn new(delimiter: Option<u8>, encoding_label: Option<&str>) -> EtlResult<Self> {
        Ok(Self {
            delimiter,
            encoding: resolve_encoding(encoding_label)?,
        })
    }
}

/// Opens `path` for reading headers and records, reporting a missing file as
/// [`EtlError::InputNotFound`].
pub fn open_csv_reader(path: &Path, source: &CsvSource) -> EtlResult<csv::Reader<Box<dyn Read>>> {
    let file = File::open(path).map_err(|err| EtlError::from_open(path, err))?;
    let reader: Box<dyn Read> = Box::new(BufReader::new(file));
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(resolve_input_delimiter(path, source.delimiter))
        .double_quote(true)
        .flexible(false)
        .from_reader(reader))
}

pub fn open_csv_writer(path: Option<&Path>) -> EtlResult<csv::Writer<Box<dyn Write>>> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(File::create(p)?)),
        _ => Box::new(std::io::stdout()),
    };
    Ok(csv::WriterBuilder::new()
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .from_writer(sink))
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> EtlResult<Vec<String>> {
    record
        .iter()
        .map(|field| {
            let (text, _, had_errors) = encoding.decode(field);
            if had_errors {
                Err(EtlError::parse(format!(
                    "failed to decode text with encoding {}",
                    encoding.name()
                )))
            } else {
                Ok(text.into_owned())
            }
        })
        .collect()
}

pub fn reader_headers<R: Read>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> EtlResult<Vec<String>> {
    let headers = reader.byte_headers()?.clone();
    decode_record(&headers, encoding)
}

/// Decodes every data record, pairing it with its 1-based file line number.
pub fn read_records<R: Read>(
    reader: &mut csv::Reader<R>,
    encoding: &'static Encoding,
) -> EtlResult<Vec<(usize, Vec<String>)>> {
    reader
        .byte_records()
        .enumerate()
        .map(|(idx, record)| Ok((idx + 2, decode_record(&record?, encoding)?)))
        .collect()
}
