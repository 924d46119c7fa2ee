//! Priority resolution of label candidates.

use super::LabelCandidate;

/// Order candidates by descending priority and keep the first occurrence of
/// each label.
///
/// The sort is stable, so candidates of equal priority keep production
/// order. When the same label appears at several priorities its highest
/// priority occurrence wins the position.
pub fn resolve(mut candidates: Vec<LabelCandidate>) -> Vec<String> {
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut out: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !out.contains(&candidate.label) {
            out.push(candidate.label);
        }
    }
    out
}

/// Drop labels already present on the item, preserving order.
pub fn subtract_present(labels: Vec<String>, present: &[String]) -> Vec<String> {
    labels
        .into_iter()
        .filter(|label| !present.contains(label))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(label: &str, priority: u32) -> LabelCandidate {
        LabelCandidate::new(label, priority)
    }

    #[test]
    fn test_higher_priority_first() {
        let out = resolve(vec![c("bug", 1), c("priority: critical", 3), c("docs", 2)]);
        assert_eq!(out, vec!["priority: critical", "docs", "bug"]);
    }

    #[test]
    fn test_ties_keep_production_order() {
        let out = resolve(vec![c("rust", 1), c("documentation", 1), c("size: small", 1)]);
        assert_eq!(out, vec!["rust", "documentation", "size: small"]);
    }

    #[test]
    fn test_duplicates_collapse_to_highest_priority_position() {
        let out = resolve(vec![c("documentation", 1), c("bug", 2), c("documentation", 3)]);
        assert_eq!(out, vec!["documentation", "bug"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve(Vec::new()).is_empty());
    }

    #[test]
    fn test_subtract_present() {
        let present = vec!["bug".to_string()];
        let out = subtract_present(vec!["bug".into(), "rust".into()], &present);
        assert_eq!(out, vec!["rust"]);
    }
}
