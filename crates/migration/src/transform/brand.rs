//! Splitting legacy food display strings into name and brand.

use std::sync::LazyLock;

use nutrilog_core::BrandParsing;
use nutrilog_core::constants::UNKNOWN_FOOD_NAME;
use regex::Regex;

#[allow(clippy::unwrap_used, reason = "pattern is a compile-time constant")]
static TRAILING_GROUP_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\(([^()]*)\)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub name: String,
    pub brand: Option<String>,
}

impl ParsedName {
    fn whole(name: &str) -> Self {
        Self { name: name.to_owned(), brand: None }
    }

    fn unknown() -> Self {
        Self::whole(UNKNOWN_FOOD_NAME)
    }
}

/// Heuristic that extracts a brand from a food's display string.
pub trait BrandParser: Send + Sync + std::fmt::Debug {
    fn parse(&self, raw: Option<&str>) -> ParsedName;
}

/// `"<name> (<brand>)"`: the last parenthesised group is the brand when both
/// parts are non-empty after trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrailingGroupParser;

impl BrandParser for TrailingGroupParser {
    fn parse(&self, raw: Option<&str>) -> ParsedName {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return ParsedName::unknown();
        }
        let Some(caps) = TRAILING_GROUP_REGEX.captures(trimmed) else {
            return ParsedName::whole(trimmed);
        };
        let name = caps.get(1).map_or("", |m| m.as_str().trim());
        let brand = caps.get(2).map_or("", |m| m.as_str().trim());
        if name.is_empty() || brand.is_empty() {
            return ParsedName::whole(trimmed);
        }
        ParsedName { name: name.to_owned(), brand: Some(brand.to_owned()) }
    }
}

/// Keeps the whole trimmed string as the name and never sets a brand.
#[derive(Debug, Clone, Copy, Default)]
pub struct WholeNameParser;

impl BrandParser for WholeNameParser {
    fn parse(&self, raw: Option<&str>) -> ParsedName {
        match raw.map(str::trim) {
            Some(name) if !name.is_empty() => ParsedName::whole(name),
            _ => ParsedName::unknown(),
        }
    }
}

/// Parser selected by configuration.
#[must_use]
pub fn parser_for(mode: BrandParsing) -> Box<dyn BrandParser> {
    match mode {
        BrandParsing::TrailingGroup => Box::new(TrailingGroupParser),
        BrandParsing::None => Box::new(WholeNameParser),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: Option<&str>) -> (String, Option<String>) {
        let parsed = TrailingGroupParser.parse(raw);
        (parsed.name, parsed.brand)
    }

    #[test]
    fn splits_trailing_brand() {
        assert_eq!(parse(Some("Chicken Breast (Perdue)")), ("Chicken Breast".into(), Some("Perdue".into())));
    }

    #[test]
    fn plain_name_has_no_brand() {
        assert_eq!(parse(Some("Tomato")), ("Tomato".into(), None));
        assert_eq!(parse(Some("  Tomato  ")), ("Tomato".into(), None));
    }

    #[test]
    fn empty_or_missing_is_unknown() {
        assert_eq!(parse(Some("")), (UNKNOWN_FOOD_NAME.into(), None));
        assert_eq!(parse(Some("   ")), (UNKNOWN_FOOD_NAME.into(), None));
        assert_eq!(parse(None), (UNKNOWN_FOOD_NAME.into(), None));
    }

    #[test]
    fn unbalanced_group_keeps_whole_string() {
        assert_eq!(parse(Some("Invalid Format (")), ("Invalid Format (".into(), None));
    }

    #[test]
    fn only_last_group_is_brand() {
        assert_eq!(
            parse(Some("Valid Food (Brand A) (Extra)")),
            ("Valid Food (Brand A)".into(), Some("Extra".into()))
        );
    }

    #[test]
    fn empty_parts_keep_whole_string() {
        assert_eq!(parse(Some("(Perdue)")), ("(Perdue)".into(), None));
        assert_eq!(parse(Some("Oats ( )")), ("Oats ( )".into(), None));
    }

    #[test]
    fn whole_name_parser_never_sets_brand() {
        let parsed = WholeNameParser.parse(Some(" Chicken Breast (Perdue) "));
        assert_eq!(parsed.name, "Chicken Breast (Perdue)");
        assert_eq!(parsed.brand, None);
        assert_eq!(WholeNameParser.parse(None).name, UNKNOWN_FOOD_NAME);
    }

    #[test]
    fn parser_for_follows_config() {
        assert_eq!(parser_for(BrandParsing::TrailingGroup).parse(Some("A (B)")).brand.as_deref(), Some("B"));
        assert_eq!(parser_for(BrandParsing::None).parse(Some("A (B)")).brand, None);
    }
}
