//! Column name normalization.
//!
//! Every flattened key path (`purchaseDate.$date`, `UserID`, ...) is turned
//! into a lower snake_case identifier before it becomes a CSV header.

use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9]").expect("static regex is valid"));
static UNDERSCORE_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_+").expect("static regex is valid"));

/// Convert an arbitrary key into a snake_case column name.
///
/// Special characters become underscores, camelCase boundaries are split,
/// the result is lower-cased, underscore runs collapse to one and edge
/// underscores are stripped. Acronym runs stay together, so `UserID`
/// becomes `user_id` rather than `user_i_d`.
pub fn to_snake_case(name: &str) -> String {
    let replaced = NON_ALPHANUMERIC.replace_all(name, "_");
    let split = split_word_boundaries(&replaced).to_ascii_lowercase();
    UNDERSCORE_RUN
        .replace_all(&split, "_")
        .trim_matches('_')
        .to_string()
}

/// Insert `_` before each uppercase letter that starts a new word.
fn split_word_boundaries(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_is_lower)
            {
                out.push('_');
            }
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_case_keys() {
        assert_eq!(to_snake_case("pointsEarned"), "points_earned");
        assert_eq!(to_snake_case("rewardsReceiptItemList"), "rewards_receipt_item_list");
        assert_eq!(to_snake_case("PointsEarned"), "points_earned");
        assert_eq!(to_snake_case("item2Price"), "item2_price");
    }

    #[test]
    fn test_acronyms_stay_together() {
        assert_eq!(to_snake_case("UserID"), "user_id");
        assert_eq!(to_snake_case("HTTPServer"), "http_server");
        assert_eq!(to_snake_case("REWARDS_RECEIPT_ITEM_LIST"), "rewards_receipt_item_list");
    }

    #[test]
    fn test_mongo_key_paths() {
        assert_eq!(to_snake_case("_id.$oid"), "id_oid");
        assert_eq!(to_snake_case("purchaseDate.$date"), "purchase_date_date");
        assert_eq!(to_snake_case("cpg.$ref"), "cpg_ref");
    }

    #[test]
    fn test_special_characters_and_edges() {
        assert_eq!(to_snake_case(""), "");
        assert_eq!(to_snake_case("___"), "");
        assert_eq!(to_snake_case("  total spent!! "), "total_spent");
        assert_eq!(to_snake_case("a--b__c"), "a_b_c");
        assert_eq!(to_snake_case("prix€unité"), "prix_unit");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "UserID",
            "pointsEarned",
            "_id.$oid",
            "rewardsReceiptItemList.0.barcode",
            "ABCdef",
            "weird  Name--With $$ Stuff",
            "x",
        ];
        for input in inputs {
            let once = to_snake_case(input);
            assert_eq!(to_snake_case(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_output_charset() {
        let inputs = ["Hello World", "__a__B__", "$date", "ÄÖÜ", "fooBAR9Baz", "9Lives"];
        for input in inputs {
            let out = to_snake_case(input);
            assert!(
                out.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
                "unexpected character in {out:?}"
            );
            assert!(!out.starts_with('_') && !out.ends_with('_'), "edge underscore in {out:?}");
            assert!(!out.contains("__"), "doubled underscore in {out:?}");
        }
    }
}
