//! Resume text extraction (collaborator boundary) and catalog-driven skill
//! extraction.
//!
//! File parsing stays behind `ResumeTextExtractor`; the default implementation
//! handles PDF and plain text. Skill extraction itself is a phrase match of
//! catalog names/aliases against the normalized resume text — the same
//! catalog-driven matching the alias index serves everywhere else.

use std::collections::HashSet;

use uuid::Uuid;

use crate::errors::AppError;
use crate::ontology::models::CatalogSnapshot;

pub trait ResumeTextExtractor: Send + Sync {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, AppError>;
}

/// Default extractor: PDF via `pdf-extract`, UTF-8 passthrough for `.txt`/`.md`.
/// Other formats are rejected at the boundary.
pub struct FileTextExtractor;

impl ResumeTextExtractor for FileTextExtractor {
    fn extract_text(&self, filename: &str, bytes: &[u8]) -> Result<String, AppError> {
        let extension = filename
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match extension.as_str() {
            "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                AppError::BadRequest(format!("Could not extract text from PDF: {e}"))
            }),
            "txt" | "md" | "text" => Ok(String::from_utf8_lossy(bytes).into_owned()),
            _ => Err(AppError::BadRequest(
                "Unsupported file type. Please upload PDF or plain text".to_string(),
            )),
        }
    }
}

/// Normalizes free text into a space-padded token stream for whole-phrase
/// matching: lowercase, punctuation to spaces ('+' and '#' survive so C++ and
/// C# remain matchable).
fn token_stream(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in text.chars() {
        if c.is_alphanumeric() || c == '+' || c == '#' {
            for lower in c.to_lowercase() {
                out.push(lower);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

/// Extracts the set of catalog skills mentioned in the text by whole-token
/// phrase matching of every indexed alias.
pub fn extract_skills(text: &str, snapshot: &CatalogSnapshot) -> HashSet<Uuid> {
    let stream = token_stream(text);
    let mut found = HashSet::new();
    for (alias, skill_id) in snapshot.alias_index() {
        let needle = token_stream(alias);
        if needle.trim().is_empty() {
            continue;
        }
        if stream.contains(&needle) {
            found.insert(*skill_id);
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ontology::models::{Skill, SkillStatus};

    fn skill(name: &str, aliases: &[&str]) -> Skill {
        Skill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            skill_type: "technical".to_string(),
            status: SkillStatus::Active,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            learning_resources: vec![],
        }
    }

    #[test]
    fn test_extracts_by_name_case_insensitive() {
        let python = skill("Python", &[]);
        let id = python.id;
        let snapshot = CatalogSnapshot::new(vec![python], vec![]);
        let found = extract_skills("Experienced PYTHON developer.", &snapshot);
        assert_eq!(found, HashSet::from([id]));
    }

    #[test]
    fn test_extracts_by_alias() {
        let rust = skill("Rust", &["rustlang"]);
        let id = rust.id;
        let snapshot = CatalogSnapshot::new(vec![rust], vec![]);
        let found = extract_skills("Shipped services in rustlang since 2021", &snapshot);
        assert_eq!(found, HashSet::from([id]));
    }

    #[test]
    fn test_multiword_alias_matches_as_phrase() {
        let ml = skill("Machine Learning", &["ml"]);
        let id = ml.id;
        let snapshot = CatalogSnapshot::new(vec![ml], vec![]);
        let found = extract_skills(
            "Built machine-learning pipelines in production.",
            &snapshot,
        );
        assert_eq!(found, HashSet::from([id]));
    }

    #[test]
    fn test_no_substring_false_positives() {
        let r_lang = skill("R", &[]);
        let snapshot = CatalogSnapshot::new(vec![r_lang], vec![]);
        // "R" must match only as a standalone token, not inside "React".
        let found = extract_skills("React specialist", &snapshot);
        assert!(found.is_empty());
    }

    #[test]
    fn test_unknown_text_yields_empty_set() {
        let python = skill("Python", &[]);
        let snapshot = CatalogSnapshot::new(vec![python], vec![]);
        assert!(extract_skills("Professional watercolor artist", &snapshot).is_empty());
    }

    #[test]
    fn test_plain_text_extractor_passthrough() {
        let text = FileTextExtractor
            .extract_text("resume.txt", "Python and SQL".as_bytes())
            .unwrap();
        assert_eq!(text, "Python and SQL");
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = FileTextExtractor.extract_text("resume.docx", &[]);
        assert!(matches!(err, Err(AppError::BadRequest(_))));
    }
}
