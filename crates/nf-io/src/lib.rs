#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim, WriterBuilder};
use nf_columnar::Column;
use nf_frame::{DataFrame, FrameError};
use nf_types::{ColumnType, ErrorKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Header field written in front of the column names when row names are
/// persisted.
pub const ROW_NAMES_HEADER: &str = "RowNames";

#[derive(Debug, Error)]
pub enum IoError {
    #[error("csv input has no headers")]
    MissingHeaders,
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("row {row}: cannot parse {value:?} in column {column:?} as a number")]
    Parse {
        row: usize,
        column: String,
        value: String,
    },
    #[error("row {row} has {actual} fields, expected {expected}")]
    FieldCount {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl IoError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingHeaders | Self::Parse { .. } | Self::FieldCount { .. } => {
                ErrorKind::Parse
            }
            Self::Csv(err) if err.is_io_error() => ErrorKind::Io,
            Self::Csv(_) | Self::Utf8(_) => ErrorKind::Parse,
            Self::Open { .. } | Self::Io(_) => ErrorKind::Io,
            Self::Frame(err) => err.kind(),
        }
    }
}

/// Shared reader/writer settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// The first field of every line holds the row name.
    pub row_names: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            row_names: false,
        }
    }
}

impl CsvOptions {
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    #[must_use]
    pub fn with_row_names(mut self, row_names: bool) -> Self {
        self.row_names = row_names;
        self
    }
}

pub fn read_csv_str(input: &str, options: &CsvOptions) -> Result<DataFrame, IoError> {
    read_csv_reader(input.as_bytes(), options)
}

pub fn read_csv(path: impl AsRef<Path>, options: &CsvOptions) -> Result<DataFrame, IoError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_csv_reader(file, options)
}

/// Parse delimited text into a frame of `Double` columns.
///
/// Every cell must parse as a number and every record must have exactly as
/// many fields as the header.
pub fn read_csv_reader<R: Read>(input: R, options: &CsvOptions) -> Result<DataFrame, IoError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(options.delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(IoError::MissingHeaders);
    }

    let skip = usize::from(options.row_names);
    let names: Vec<String> = headers.iter().skip(skip).map(str::to_owned).collect();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];
    let mut row_names = Vec::new();

    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != headers.len() {
            return Err(IoError::FieldCount {
                row,
                expected: headers.len(),
                actual: record.len(),
            });
        }

        let mut fields = record.iter();
        if options.row_names {
            row_names.push(fields.next().unwrap_or_default().to_owned());
        }
        for ((values, name), field) in columns.iter_mut().zip(&names).zip(fields) {
            let value = field.parse::<f64>().map_err(|_| IoError::Parse {
                row,
                column: name.clone(),
                value: field.to_owned(),
            })?;
            values.push(value);
        }
    }

    let named_columns = names
        .into_iter()
        .zip(columns)
        .map(|(name, values)| (name, Column::from_f64s(ColumnType::Double, &values)))
        .collect();
    let row_names = options.row_names.then_some(row_names);
    Ok(DataFrame::from_columns(named_columns, row_names)?)
}

pub fn write_csv_string(frame: &DataFrame, options: &CsvOptions) -> Result<String, IoError> {
    let bytes = write_csv_writer(frame, Vec::new(), options)?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_csv(
    frame: &DataFrame,
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<(), IoError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| IoError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv_writer(frame, file, options)?;
    Ok(())
}

/// Serialize `frame` as a header line followed by one record per row.
/// Returns the underlying writer once everything has been flushed.
pub fn write_csv_writer<W: Write>(
    frame: &DataFrame,
    output: W,
    options: &CsvOptions,
) -> Result<W, IoError> {
    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(output);

    let mut header = Vec::with_capacity(frame.n_cols() + 1);
    if options.row_names {
        header.push(ROW_NAMES_HEADER);
    }
    header.extend(frame.col_names().iter().map(String::as_str));
    writer.write_record(&header)?;

    for (position, row_name) in frame.row_names().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        if options.row_names {
            record.push(row_name.clone());
        }
        for value in frame.get_row(position)? {
            record.push(value.to_string());
        }
        writer.write_record(&record)?;
    }

    Ok(writer.into_inner().map_err(|err| err.into_error())?)
}

#[cfg(test)]
mod tests {
    use nf_frame::{DataFrame, FrameError};
    use nf_types::{ColumnType, ErrorKind};

    use super::{
        CsvOptions, IoError, read_csv, read_csv_str, write_csv, write_csv_string,
    };

    #[test]
    fn reads_header_and_default_row_names() {
        let frame = read_csv_str("A,B\n1,4\n2,5\n3,6\n", &CsvOptions::default()).expect("read");
        assert_eq!(frame.dim(), (3, 2));
        assert_eq!(frame.col_names(), &["A", "B"]);
        assert_eq!(frame.row_names(), &["R0", "R1", "R2"]);
        assert_eq!(frame.get_row(2_usize).expect("row"), vec![3.0, 6.0]);
        assert_eq!(frame.get_column_type("A").expect("type"), ColumnType::Double);
    }

    #[test]
    fn reads_row_names_from_first_field() {
        let options = CsvOptions::default().with_row_names(true);
        let frame = read_csv_str("id,x,y\na,1,2\nb,3,4\n", &options).expect("read");
        assert_eq!(frame.col_names(), &["x", "y"]);
        assert_eq!(frame.row_names(), &["a", "b"]);
        assert_eq!(frame.get("b", "y").expect("cell"), 4.0);
    }

    #[test]
    fn trims_fields_and_honors_delimiter() {
        let options = CsvOptions::default().with_delimiter(b';');
        let frame = read_csv_str(" A ; B \n 1.5 ; -2 \n", &options).expect("read");
        assert_eq!(frame.col_names(), &["A", "B"]);
        assert_eq!(frame.get_row(0_usize).expect("row"), vec![1.5, -2.0]);
    }

    #[test]
    fn header_only_gives_zero_rows() {
        let frame = read_csv_str("A,B\n", &CsvOptions::default()).expect("read");
        assert_eq!(frame.dim(), (0, 2));
        assert!(frame.is_empty());
    }

    #[test]
    fn empty_input_has_no_headers() {
        let err = read_csv_str("", &CsvOptions::default()).expect_err("must fail");
        assert!(matches!(err, IoError::MissingHeaders));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn non_numeric_cell_is_a_parse_failure() {
        let err = read_csv_str("A,B\n1,2\n3,abc\n", &CsvOptions::default())
            .expect_err("must fail");
        assert!(matches!(
            err,
            IoError::Parse { row: 1, ref column, ref value } if column == "B" && value == "abc"
        ));
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn wrong_field_count_is_a_parse_failure() {
        let too_many = read_csv_str("A,B\n1,2,3\n", &CsvOptions::default()).expect_err("many");
        assert!(matches!(
            too_many,
            IoError::FieldCount { row: 0, expected: 2, actual: 3 }
        ));

        let too_few = read_csv_str("A,B\n1,2\n4\n", &CsvOptions::default()).expect_err("few");
        assert!(matches!(
            too_few,
            IoError::FieldCount { row: 1, expected: 2, actual: 1 }
        ));
    }

    #[test]
    fn row_name_header_alone_has_no_columns() {
        let options = CsvOptions::default().with_row_names(true);
        let err = read_csv_str("id\na\n", &options).expect_err("must fail");
        assert!(matches!(err, IoError::Frame(FrameError::NoColumns)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn writes_header_and_values() {
        let frame = DataFrame::from_dict([("A", vec![1.0, 2.5]), ("B", vec![3.0, -4.0])])
            .expect("frame");
        let out = write_csv_string(&frame, &CsvOptions::default()).expect("write");
        assert_eq!(out, "A,B\n1,3\n2.5,-4\n");
    }

    #[test]
    fn writes_row_names_with_configured_delimiter() {
        let frame = DataFrame::from_dict([("A", vec![1.0]), ("B", vec![2.0])]).expect("frame");
        let options = CsvOptions::default().with_delimiter(b';').with_row_names(true);
        let out = write_csv_string(&frame, &options).expect("write");
        assert_eq!(out, "RowNames;A;B\nR0;1;2\n");
    }

    #[test]
    fn string_round_trip_preserves_frame() {
        let options = CsvOptions::default().with_row_names(true);
        let mut frame = DataFrame::from_dict([("x", vec![0.125, 2.0]), ("y", vec![-1.0, 1e6])])
            .expect("frame");
        frame
            .set_row_names(vec!["first".to_owned(), "second".to_owned()])
            .expect("rename");

        let text = write_csv_string(&frame, &options).expect("write");
        let back = read_csv_str(&text, &options).expect("read");
        assert_eq!(back, frame);
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.csv");
        let frame = DataFrame::from_dict([("A", vec![1.0, 2.0, 3.0]), ("B", vec![4.0, 5.0, 6.0])])
            .expect("frame");

        write_csv(&frame, &path, &CsvOptions::default()).expect("write");
        let back = read_csv(&path, &CsvOptions::default()).expect("read");
        assert_eq!(back, frame);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = read_csv(dir.path().join("absent.csv"), &CsvOptions::default())
            .expect_err("must fail");
        assert!(matches!(err, IoError::Open { .. }));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: CsvOptions = serde_json::from_str(r#"{"row_names": true}"#).expect("json");
        assert_eq!(options, CsvOptions::default().with_row_names(true));
        assert_eq!(options.delimiter, b',');
    }
}
