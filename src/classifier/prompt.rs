/// 所在地抽出用のシステムプロンプト。
pub const SYSTEM_PROMPT: &str = "You are a location extraction assistant. \
Return exactly one word (no spaces) indicating the country where the given publisher is based. \
Use ISO short forms if applicable (e.g., 'USA', 'UK'). \
If the location is unknown, return 'Unknown'. Do not include any explanation.";

/// パブリッシャー名を埋め込んだユーザープロンプトを組み立てる。
#[must_use]
pub fn user_prompt(publisher: &str) -> String {
    format!(
        "Publisher: {publisher}\n\n\
         Return the country of this publisher in one word. If unknown, return 'Unknown'."
    )
}
