//! Homophone dictionary: a JSON list of string-lists, each inner list
//! a closed group of surface forms that share pronunciation.

use std::collections::HashMap;
use std::path::Path;
use talkie_foundation::GecError;

#[derive(Debug, Clone, Default)]
pub struct HomophoneDictionary {
    groups: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl HomophoneDictionary {
    pub fn from_groups(groups: Vec<Vec<String>>) -> Self {
        let mut index = HashMap::new();
        for (i, group) in groups.iter().enumerate() {
            for word in group {
                index.insert(word.to_lowercase(), i);
            }
        }
        Self { groups, index }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, GecError> {
        let contents = std::fs::read_to_string(path).map_err(|e| GecError::Tokenizer(format!("reading homophone dictionary: {e}")))?;
        let groups: Vec<Vec<String>> = serde_json::from_str(&contents)
            .map_err(|e| GecError::Tokenizer(format!("parsing homophone dictionary: {e}")))?;
        Ok(Self::from_groups(groups))
    }

    /// Group members for `word` (lowercase), including `word` itself,
    /// or `None` if it belongs to no group.
    pub fn group_for(&self, word: &str) -> Option<&[String]> {
        self.index
            .get(word)
            .map(|&i| self.groups[i].as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_any_member() {
        let dict = HomophoneDictionary::from_groups(vec![
            vec!["there".into(), "their".into(), "they're".into()],
            vec!["write".into(), "right".into()],
        ]);
        let group = dict.group_for("write").unwrap();
        assert!(group.contains(&"right".to_string()));
        assert!(dict.group_for("unrelated").is_none());
    }
}
