// Pure string/number coercions applied to imported spreadsheet cells and form
// input before they reach the rest of the system.

pub mod text_format {
    use crate::models::ItemCodeValidation;

    const ITEM_CODE_SUGGESTION: &str =
        "Item codes may only contain letters, numbers, hyphens (-) and underscores (_)";

    fn collapse_whitespace(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Drops control characters, trims, and collapses whitespace runs to a single space.
    pub fn clean_text_value(s: &str) -> String {
        let visible: String = s
            .chars()
            .map(|c| if c.is_control() { ' ' } else { c })
            .collect();
        collapse_whitespace(&visible)
    }

    /// Parses loosely formatted numbers such as "₹1,234.56". Anything that is
    /// not a digit, '.' or '-' is stripped first; unparseable input yields 0.
    pub fn to_number(s: &str) -> f64 {
        let digits: String = s
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
            .collect();
        match digits.parse::<f64>() {
            Ok(n) if n.is_finite() => n,
            _ => 0.0,
        }
    }

    pub fn normalize_grn_number(s: &str) -> String {
        collapse_whitespace(s).to_uppercase()
    }

    pub fn is_item_code_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-'
    }

    pub fn validate_item_code(s: &str) -> ItemCodeValidation {
        let code = s.trim().to_uppercase();
        let is_valid = !code.is_empty() && code.chars().all(is_item_code_char);

        ItemCodeValidation {
            code,
            is_valid,
            suggestions: if is_valid {
                None
            } else {
                Some(vec![ITEM_CODE_SUGGESTION.to_string()])
            },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_to_number_strips_currency_and_grouping() {
            assert_eq!(to_number("₹1,234.56"), 1234.56);
            assert_eq!(to_number("  -42 kg"), -42.0);
            assert_eq!(to_number("12"), 12.0);
        }

        #[test]
        fn test_to_number_defaults_to_zero() {
            assert_eq!(to_number("abc"), 0.0);
            assert_eq!(to_number(""), 0.0);
            assert_eq!(to_number("1.2.3"), 0.0);
            assert_eq!(to_number("-"), 0.0);
        }

        #[test]
        fn test_clean_text_value() {
            assert_eq!(clean_text_value("  Steel \t rod\n 12mm  "), "Steel rod 12mm");
            assert_eq!(clean_text_value("a\u{0007}b"), "a b");
            assert_eq!(clean_text_value("   "), "");
        }

        #[test]
        fn test_normalize_grn_number() {
            assert_eq!(normalize_grn_number("  grn   2024 / 001 "), "GRN 2024 / 001");
            assert_eq!(normalize_grn_number("grn-17"), "GRN-17");
        }

        #[test]
        fn test_validate_item_code_rejects_space() {
            let result = validate_item_code("bop_650 kg");
            assert!(!result.is_valid);
            assert_eq!(result.code, "BOP_650 KG");
            assert_eq!(result.suggestions.as_ref().map(Vec::len), Some(1));
        }

        #[test]
        fn test_validate_item_code_accepts_conforming() {
            let result = validate_item_code("BOP-650");
            assert!(result.is_valid);
            assert_eq!(result.code, "BOP-650");
            assert!(result.suggestions.is_none());

            let lowered = validate_item_code("  rm_12-a ");
            assert!(lowered.is_valid);
            assert_eq!(lowered.code, "RM_12-A");
        }

        #[test]
        fn test_validate_item_code_empty_is_invalid() {
            let result = validate_item_code("   ");
            assert!(!result.is_valid);
            assert_eq!(result.code, "");
        }
    }
}
