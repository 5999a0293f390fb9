//! 分類段階とマージ段階。2つの段階は中間CSVファイルを介してのみ連携する。
pub mod classify;
pub mod merge;

pub use classify::{ClassificationReport, run_classification};
pub use merge::{MergeReport, merge_locations, run_merge};

/// パブリッシャー識別子の列名。
pub const SOURCE_COLUMN: &str = "source";
/// 分類結果ファイルのラベル列名。
pub const COUNTRY_COLUMN: &str = "final_country";
/// 最終データセットで付与されるラベル列名。
pub const LOCATION_COLUMN: &str = "location";
