use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::classifier::{CountryOracle, PublisherClassifier, PublisherCountryMap};
use crate::dataset::Dataset;

use super::{COUNTRY_COLUMN, SOURCE_COLUMN};

/// 分類段階の実行結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationReport {
    pub rows: usize,
    pub null_sources: usize,
    pub unique_publishers: usize,
    pub resolved_publishers: usize,
}

/// 入力データセットを分類し、`source,final_country` の2列を書き出す。
///
/// `source` 列が無い場合はサービスへ一切問い合わせずに失敗する。
///
/// # Errors
/// 入力の読み込み、`source` 列の欠落、または出力の書き込みに失敗した場合。
pub async fn run_classification<O: CountryOracle>(
    input: &Path,
    output: &Path,
    classifier: &PublisherClassifier<O>,
) -> Result<ClassificationReport> {
    let dataset = Dataset::read_csv(input)
        .with_context(|| format!("failed to read dataset {}", input.display()))?;
    let sources = dataset
        .column(SOURCE_COLUMN)
        .with_context(|| format!("{} must contain a '{SOURCE_COLUMN}' column", input.display()))?;

    info!(rows = sources.len(), input = %input.display(), "loaded dataset");

    let map = classifier.classify_all(sources.iter().copied()).await;
    let locations = build_location_table(&sources, &map);

    locations
        .write_csv(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    let report = ClassificationReport {
        rows: sources.len(),
        null_sources: sources.iter().filter(|source| source.is_none()).count(),
        unique_publishers: map.len(),
        resolved_publishers: map.resolved_count(),
    };

    info!(
        rows = report.rows,
        null_sources = report.null_sources,
        unique_publishers = report.unique_publishers,
        resolved_publishers = report.resolved_publishers,
        output = %output.display(),
        "wrote publisher locations"
    );

    Ok(report)
}

/// 入力と同じ行数・行順で `source,final_country` 表を組み立てる。
pub(crate) fn build_location_table(
    sources: &[Option<&str>],
    map: &PublisherCountryMap,
) -> Dataset {
    let rows = sources
        .iter()
        .map(|source| {
            vec![
                source.unwrap_or_default().to_string(),
                map.label_for(*source).to_string(),
            ]
        })
        .collect();

    Dataset::new(
        vec![SOURCE_COLUMN.to_string(), COUNTRY_COLUMN.to_string()],
        rows,
    )
}
