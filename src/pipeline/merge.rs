use std::path::Path;

use anyhow::{Context, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use crate::classifier::UNKNOWN_LABEL;
use crate::dataset::{Dataset, DatasetError, cell_value};

use super::{COUNTRY_COLUMN, LOCATION_COLUMN, SOURCE_COLUMN};

/// マージ段階の実行結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    pub input_rows: usize,
    pub resolved_rows: usize,
    pub duplicate_rows: usize,
    pub written_rows: usize,
}

/// 元データセットと分類結果を結合し、所在国が確定した行だけを書き出す。
///
/// どちらかの入力が読めない場合は出力を一切作らずに失敗する。
///
/// # Errors
/// 入力の読み込み、必須列の欠落、または出力の書き込みに失敗した場合。
pub fn run_merge(dataset: &Path, locations: &Path, output: &Path) -> Result<MergeReport> {
    let data = Dataset::read_csv(dataset)
        .with_context(|| format!("failed to read dataset {}", dataset.display()))?;
    let labels = Dataset::read_csv(locations)
        .with_context(|| format!("failed to read publisher locations {}", locations.display()))?;

    let (enriched, report) = merge_locations(&data, &labels)?;

    enriched
        .write_csv(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(
        input_rows = report.input_rows,
        resolved_rows = report.resolved_rows,
        duplicate_rows = report.duplicate_rows,
        written_rows = report.written_rows,
        output = %output.display(),
        "wrote enriched dataset"
    );

    Ok(report)
}

/// `source` で左結合し、未解決行と完全重複行を取り除く。
///
/// 1. 分類結果を `source` ごとに最初の1件へ絞る（`final_country` は `location` として扱う）
/// 2. 元データの全行に `location` を付与する（一致しなければ null）
/// 3. `location` が null または `Unknown` の行を捨てる
/// 4. 完全に同一の行は最初の1件だけ残す
///
/// # Errors
/// 必須列の欠落、または元データに既に `location` 列がある場合。
pub fn merge_locations(
    data: &Dataset,
    labels: &Dataset,
) -> Result<(Dataset, MergeReport), DatasetError> {
    let data_source = data.column_index(SOURCE_COLUMN)?;
    if data.column_index(LOCATION_COLUMN).is_ok() {
        return Err(DatasetError::DuplicateColumn(LOCATION_COLUMN.to_string()));
    }

    let lookup = first_location_by_source(labels)?;

    let mut headers = data.headers().to_vec();
    headers.push(LOCATION_COLUMN.to_string());

    let mut resolved_rows = 0;
    let mut seen: FxHashSet<Vec<String>> = FxHashSet::default();
    let mut rows = Vec::new();

    for row in data.rows() {
        let location = cell_value(&row[data_source])
            .and_then(|source| lookup.get(source).copied().flatten());

        let Some(location) = location.filter(|location| *location != UNKNOWN_LABEL) else {
            continue;
        };
        resolved_rows += 1;

        let mut merged = row.clone();
        merged.push(location.to_string());
        if seen.insert(merged.clone()) {
            rows.push(merged);
        }
    }

    let report = MergeReport {
        input_rows: data.len(),
        resolved_rows,
        duplicate_rows: resolved_rows - rows.len(),
        written_rows: rows.len(),
    };
    debug!(?report, "merged publisher locations");

    Ok((Dataset::new(headers, rows), report))
}

/// `source` ごとに最初に現れた行のラベルを返す。ラベルが空なら `None`。
fn first_location_by_source(
    labels: &Dataset,
) -> Result<FxHashMap<&str, Option<&str>>, DatasetError> {
    let source = labels.column_index(SOURCE_COLUMN)?;
    let country = labels.column_index(COUNTRY_COLUMN)?;

    let mut lookup = FxHashMap::default();
    for row in labels.rows() {
        // A null source never takes part in the join.
        let Some(key) = cell_value(&row[source]) else {
            continue;
        };
        lookup.entry(key).or_insert_with(|| cell_value(&row[country]));
    }
    Ok(lookup)
}
