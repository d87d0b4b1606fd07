//! Topic variation generator

/// Expand a topic into the lexical variants the keyword matcher searches for.
///
/// Order: lower-cased topic, `s`-plural (only when the topic does not already
/// end in `s`), then "about {t}", "{t} related" and "{t} content".
pub fn variations(topic: &str) -> Vec<String> {
    let base = topic.to_lowercase();
    let mut variants = Vec::with_capacity(5);

    variants.push(base.clone());
    if !topic.ends_with('s') {
        variants.push(format!("{}s", base));
    }
    variants.push(format!("about {}", base));
    variants.push(format!("{} related", base));
    variants.push(format!("{} content", base));

    variants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variations_with_plural() {
        assert_eq!(
            variations("Cooking"),
            vec![
                "cooking",
                "cookings",
                "about cooking",
                "cooking related",
                "cooking content"
            ]
        );
    }

    #[test]
    fn test_variations_already_plural() {
        assert_eq!(
            variations("cats"),
            vec!["cats", "about cats", "cats related", "cats content"]
        );
    }

    #[test]
    fn test_plural_rule_checks_original_case() {
        // Only a lower-case trailing 's' suppresses the plural
        assert_eq!(variations("GAS")[1], "gass");
    }
}
