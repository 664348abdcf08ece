//! Directory Resolver - object key からコンテナ（ディレクトリ）を求める
//!
//! 同じ親パスを持つ key は必ず同じ文字列に解決されること。
//! BatchDedupSet と idempotency claim のキーになるため。

/// `knowledge_base/felix/file.txt` → `knowledge_base/felix/`
///
/// 結果は `source_prefix` で始まる。prefix 外の key と
/// 区切りを含まない key はそのまま返す。
pub fn resolve_directory(key: &str, source_prefix: &str) -> String {
    if !key.starts_with(source_prefix) {
        return key.to_string();
    }
    match key.rsplit_once('/') {
        Some((parent, _)) => format!("{parent}/"),
        None => key.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const PREFIX: &str = "knowledge_base/";

    #[rstest]
    #[case::file("knowledge_base/felix/file.txt", "knowledge_base/felix/")]
    #[case::nested("knowledge_base/a/b/c.md", "knowledge_base/a/b/")]
    #[case::directly_under_root("knowledge_base/readme.md", "knowledge_base/")]
    #[case::folder_marker("knowledge_base/felix/", "knowledge_base/felix/")]
    #[case::outside_prefix("other/x/y.txt", "other/x/y.txt")]
    fn resolves(#[case] key: &str, #[case] expected: &str) {
        assert_eq!(resolve_directory(key, PREFIX), expected);
    }

    #[test]
    fn single_segment_key_is_unchanged() {
        assert_eq!(resolve_directory("notes.txt", ""), "notes.txt");
    }

    #[test]
    fn siblings_share_a_directory() {
        let a = resolve_directory("knowledge_base/x/f1.txt", PREFIX);
        let b = resolve_directory("knowledge_base/x/f2.txt", PREFIX);
        let c = resolve_directory("knowledge_base/x/deeper/f3.txt", PREFIX);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with(PREFIX));
    }
}
