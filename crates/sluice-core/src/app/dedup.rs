//! Batch Deduplicator
//!
//! invocation ごとに空の状態から始まり、永続化しません。
//! セットにディレクトリがある ⇔ この invocation でそのディレクトリの dispatch を試みた。

use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct BatchDedupSet {
    seen: HashSet<String>,
}

impl BatchDedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 初見なら登録して true、既出なら何もせず false
    pub fn should_process(&mut self, directory: &str) -> bool {
        self.seen.insert(directory.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_sighting_is_rejected() {
        let mut set = BatchDedupSet::new();
        assert!(set.should_process("knowledge_base/x/"));
        assert!(!set.should_process("knowledge_base/x/"));
        assert!(set.should_process("knowledge_base/y/"));
    }

    #[test]
    fn only_first_sightings_pass() {
        let mut set = BatchDedupSet::new();
        let passed: Vec<&str> = ["b/", "a/", "b/", "c/", "a/"]
            .into_iter()
            .filter(|dir| set.should_process(dir))
            .collect();
        assert_eq!(passed, vec!["b/", "a/", "c/"]);
    }
}
