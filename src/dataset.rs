//! CSVで表現された表形式データセット。
//!
//! セル値はすべて不透明な文字列として扱い、書き戻し時に加工しない。
//! 空のセルは欠損値（null）とみなす。
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV output: {0}")]
    Io(#[from] std::io::Error),
    #[error("dataset is missing required column '{0}'")]
    MissingColumn(String),
    #[error("dataset already contains column '{0}'")]
    DuplicateColumn(String),
}

/// ヘッダーと行からなるデータセット。すべての行はヘッダーと同じ幅を持つ。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Dataset {
    /// ヘッダーと行からデータセットを作成する。
    ///
    /// # Panics
    /// 行の幅がヘッダーと一致しない場合。
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        assert!(
            rows.iter().all(|row| row.len() == headers.len()),
            "every row must match the header width"
        );
        Self { headers, rows }
    }

    /// CSVファイルを読み込む。
    ///
    /// # Errors
    /// ファイルが開けない場合、またはCSVが不正（列数不一致を含む）な場合。
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Self::read_from(file)
    }

    /// 任意のリーダーからCSVを読み込む。
    ///
    /// # Errors
    /// CSVが不正な場合。
    pub fn read_from<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);

        let headers = rdr.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    /// CSVファイルとして書き出す。既存ファイルは上書きされる。
    ///
    /// # Errors
    /// ファイルの作成または書き込みに失敗した場合。
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| DatasetError::Open {
            path: path.display().to_string(),
            source,
        })?;
        self.write_to(file)
    }

    /// 任意のライターへCSVを書き出す。
    ///
    /// # Errors
    /// 書き込みに失敗した場合。
    pub fn write_to<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut wtr = WriterBuilder::new().from_writer(writer);
        wtr.write_record(&self.headers)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列名から列番号を引く。
    ///
    /// # Errors
    /// 列が存在しない場合は [`DatasetError::MissingColumn`]。
    pub fn column_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))
    }

    /// 指定列の値を行順に返す。空のセルは `None`。
    ///
    /// # Errors
    /// 列が存在しない場合は [`DatasetError::MissingColumn`]。
    pub fn column(&self, name: &str) -> Result<Vec<Option<&str>>, DatasetError> {
        let index = self.column_index(name)?;
        Ok(self
            .rows
            .iter()
            .map(|row| cell_value(&row[index]))
            .collect())
    }
}

/// 空のセルを欠損値として扱う。
#[must_use]
pub fn cell_value(cell: &str) -> Option<&str> {
    if cell.is_empty() { None } else { Some(cell) }
}
