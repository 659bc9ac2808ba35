//! Department classification
//!
//! Brigade classification is a pluggable policy. The stock policy matches
//! name keywords; whatever a classifier decides is written once and never
//! recomputed for that department value.

use crate::config::ClassificationConfig;
use crate::entities::Department;

pub trait DepartmentClassifier: Send + Sync {
    fn is_brigade(&self, department: &Department) -> bool;

    /// Fill `is_brigade` on the department and its children where unset
    fn classify(&self, mut department: Department) -> Department {
        if department.is_brigade.is_none() {
            department.is_brigade = Some(self.is_brigade(&department));
        }
        department.children = department
            .children
            .into_iter()
            .map(|child| self.classify(child))
            .collect();
        department
    }
}

/// Matches any keyword in the department name, ignoring case
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    keywords: Vec<String>,
}

impl KeywordClassifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|keyword| keyword.as_ref().to_uppercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ClassificationConfig) -> Self {
        Self::new(&config.brigade_keywords)
    }
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::from_config(&ClassificationConfig::default())
    }
}

impl DepartmentClassifier for KeywordClassifier {
    fn is_brigade(&self, department: &Department) -> bool {
        let name = department.name.to_uppercase();
        self.keywords.iter().any(|keyword| name.contains(keyword.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_match_case_insensitively() {
        let classifier = KeywordClassifier::default();

        assert!(classifier.is_brigade(&Department::new("d1", "Бригада №3")));
        assert!(classifier.is_brigade(&Department::new("d2", "производственный участок 12")));
        assert!(!classifier.is_brigade(&Department::new("d3", "Бухгалтерия")));
    }

    #[test]
    fn test_existing_flag_is_kept() {
        let classifier = KeywordClassifier::default();
        let mut department = Department::new("d1", "Бригада №3");
        department.is_brigade = Some(false);

        assert_eq!(classifier.classify(department).is_brigade, Some(false));
    }

    #[test]
    fn test_children_are_classified() {
        let classifier = KeywordClassifier::new(["crew"]);
        let mut top = Department::new("d1", "Plant");
        top.children = vec![Department::new("d2", "Night Crew")];

        let top = classifier.classify(top);
        assert_eq!(top.is_brigade, Some(false));
        assert_eq!(top.children[0].is_brigade, Some(true));
    }
}
