// crates/ndvi/src/io.rs

use std::fs::File;
use std::path::{Path, PathBuf};

use polars::io::parquet::write::{ParquetCompression, ParquetWriter, StatisticsOptions};
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableIoError {
    #[error("unsupported table format for {path}: expected .parquet or .csv")]
    UnsupportedFormat { path: PathBuf },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("polars failed on {path}: {source}")]
    Polars {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Parquet,
    Csv,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Result<Self, TableIoError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("parquet") | Some("pq") => Ok(TableFormat::Parquet),
            Some("csv") => Ok(TableFormat::Csv),
            _ => Err(TableIoError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

pub fn read_table(path: &Path) -> Result<DataFrame, TableIoError> {
    let format = TableFormat::from_path(path)?;
    let polars_err = |source| TableIoError::Polars {
        path: path.to_path_buf(),
        source,
    };

    match format {
        TableFormat::Parquet => {
            let file = File::open(path).map_err(|source| TableIoError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ParquetReader::new(file).finish().map_err(polars_err)
        }
        TableFormat::Csv => CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .and_then(|reader| reader.finish())
            .map_err(polars_err),
    }
}

pub fn write_table(df: &mut DataFrame, path: &Path) -> Result<(), TableIoError> {
    let format = TableFormat::from_path(path)?;
    let mut file = File::create(path).map_err(|source| TableIoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let written = match format {
        TableFormat::Parquet => ParquetWriter::new(&mut file)
            .with_compression(ParquetCompression::Zstd(None))
            .with_statistics(StatisticsOptions::default())
            .finish(df)
            .map(|_| ()),
        TableFormat::Csv => CsvWriter::new(&mut file).include_header(true).finish(df),
    };
    written.map_err(|source| TableIoError::Polars {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            TableFormat::from_path(Path::new("out/ndvi.PARQUET")).unwrap(),
            TableFormat::Parquet
        );
        assert_eq!(
            TableFormat::from_path(Path::new("raw.csv")).unwrap(),
            TableFormat::Csv
        );
        assert!(TableFormat::from_path(Path::new("raw.xlsx")).is_err());
        assert!(TableFormat::from_path(Path::new("raw")).is_err());
    }

    #[test]
    fn csv_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("table.csv");
        let mut df = df!["point" => [1i64, 2], "value" => [0.25, 0.5]].expect("df");

        write_table(&mut df, &path).expect("write");
        let back = read_table(&path).expect("read");
        assert_eq!(back.shape(), (2, 2));
        assert_eq!(back.column("point").unwrap().dtype(), &DataType::Int64);
    }
}
