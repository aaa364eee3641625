use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Upper bound on placements per merchant; expanded offer IDs append a single
/// digit index, so the bound keeps them unique.
pub const MAX_PLACEMENTS_PER_MERCHANT: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementRule {
    pub check: String,
    pub replace_with: String,
}

/// Named device/gender bucket reported in `custom_label_3`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelGroup {
    pub name: String,
    pub placement_ids: Vec<String>,
}

/// The static placement taxonomy, keyed by merchant ID.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlacementsFile {
    #[serde(default)]
    pub placements: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub replacements: HashMap<String, Vec<ReplacementRule>>,
    #[serde(default)]
    pub label_groups: Vec<LabelGroup>,
}

/// Load and validate the placement taxonomy from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_placements(path: &Path) -> Result<PlacementsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlacementsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_placements(&content)
}

/// Parse and validate placement YAML already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_placements(content: &str) -> Result<PlacementsFile, ConfigError> {
    let placements_file: PlacementsFile =
        serde_yaml::from_str(content).map_err(ConfigError::PlacementsFileParse)?;

    validate_placements(&placements_file)?;

    Ok(placements_file)
}

fn validate_placements(file: &PlacementsFile) -> Result<(), ConfigError> {
    for (merchant_id, ids) in &file.placements {
        if ids.len() > MAX_PLACEMENTS_PER_MERCHANT {
            return Err(ConfigError::Validation(format!(
                "merchant '{merchant_id}' has {} placements; at most {MAX_PLACEMENTS_PER_MERCHANT} allowed",
                ids.len()
            )));
        }

        let mut seen = HashSet::new();
        for id in ids {
            if id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "merchant '{merchant_id}' has an empty placement id"
                )));
            }
            if !seen.insert(id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "merchant '{merchant_id}' lists placement '{id}' more than once"
                )));
            }
        }
    }

    for (merchant_id, rules) in &file.replacements {
        let mut seen = HashSet::new();
        for rule in rules {
            if !seen.insert(rule.check.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "merchant '{merchant_id}' has duplicate replacement for '{}'",
                    rule.check
                )));
            }
        }
    }

    let mut group_names = HashSet::new();
    let mut grouped: HashMap<&str, &str> = HashMap::new();
    for group in &file.label_groups {
        if group.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "label group name must be non-empty".to_string(),
            ));
        }
        if !group_names.insert(group.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate label group: '{}'",
                group.name
            )));
        }
        for id in &group.placement_ids {
            if let Some(previous) = grouped.insert(id.as_str(), group.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "placement '{id}' belongs to both '{previous}' and '{}'",
                    group.name
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_sections() {
        let yaml = r#"
placements:
  "24": ["913510000", "913410000"]
replacements:
  "28592":
    - check: "908530012"
      replace_with: "908530000"
label_groups:
  - name: Female_Desktop
    placement_ids: ["947510000"]
"#;
        let file = parse_placements(yaml).unwrap();
        assert_eq!(file.placements["24"], vec!["913510000", "913410000"]);
        assert_eq!(file.replacements["28592"][0].replace_with, "908530000");
        assert_eq!(file.label_groups[0].name, "Female_Desktop");
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let file = parse_placements("placements: {}\n").unwrap();
        assert!(file.replacements.is_empty());
        assert!(file.label_groups.is_empty());
    }

    #[test]
    fn rejects_too_many_placements() {
        let yaml = r#"
placements:
  "1": ["a", "b", "c", "d", "e"]
"#;
        let err = parse_placements(yaml).unwrap_err();
        assert!(err.to_string().contains("at most 4"));
    }

    #[test]
    fn rejects_duplicate_placement_within_merchant() {
        let yaml = r#"
placements:
  "1": ["a", "a"]
"#;
        let err = parse_placements(yaml).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_duplicate_replacement_check() {
        let yaml = r#"
replacements:
  "1":
    - check: "a"
      replace_with: "b"
    - check: "a"
      replace_with: "c"
"#;
        let err = parse_placements(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate replacement"));
    }

    #[test]
    fn rejects_placement_in_two_label_groups() {
        let yaml = r#"
label_groups:
  - name: Male_Desktop
    placement_ids: ["947530000"]
  - name: Male_Mobile
    placement_ids: ["947530000"]
"#;
        let err = parse_placements(yaml).unwrap_err();
        assert!(err.to_string().contains("belongs to both"));
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = parse_placements("placements: [not, a, map]").unwrap_err();
        assert!(matches!(err, ConfigError::PlacementsFileParse(_)));
    }

    #[test]
    fn load_placements_from_real_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("config")
            .join("placements.yaml");
        let result = load_placements(&path);
        assert!(result.is_ok(), "failed to load placements.yaml: {result:?}");
        let file = result.unwrap();
        assert_eq!(file.placements["24"].len(), 4);
        assert!(file.replacements.contains_key("190411"));
        assert_eq!(file.label_groups.len(), 6);
    }

    #[test]
    fn load_placements_reports_missing_file() {
        let err = load_placements(Path::new("/nonexistent/placements.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::PlacementsFileIo { .. }));
    }
}
