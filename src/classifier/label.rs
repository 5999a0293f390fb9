use std::fmt;

/// 国を特定できなかったことを表すラベル。
pub const UNKNOWN_LABEL: &str = "Unknown";

/// パブリッシャーに付与される国ラベル。
///
/// `Known` は空白を含まない空でないトークンであることが保証される。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CountryLabel {
    Known(String),
    Unknown,
}

impl CountryLabel {
    /// モデルの生の応答をラベルに正規化する。
    ///
    /// 前後の空白を除去し、空または内部に空白を含む応答は `Unknown` に置き換える。
    /// 国名として妥当かどうかの意味的な検証は行わない。
    #[must_use]
    pub fn from_response(raw: &str) -> Self {
        let answer = raw.trim();
        if answer.is_empty() || answer.chars().any(char::is_whitespace) || answer == UNKNOWN_LABEL
        {
            return Self::Unknown;
        }
        Self::Known(answer.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(country) => country,
            Self::Unknown => UNKNOWN_LABEL,
        }
    }

    #[must_use]
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl fmt::Display for CountryLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
