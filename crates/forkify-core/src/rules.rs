use std::borrow::Cow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use convert_case::{Case, Casing};
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::{ForkifyError, Result};

/// How a rule's pattern is located in its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchMode {
    /// Case-sensitive substring, anywhere in the input.
    #[default]
    Literal,
    /// Substring whose neighbouring characters are not alphanumeric.
    Word,
    /// A `regex` pattern; the replacement may reference capture groups.
    Regex,
}

/// Which half of a migration a rule takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleScope {
    Paths,
    Contents,
    #[default]
    Both,
}

impl RuleScope {
    pub fn covers_paths(self) -> bool {
        matches!(self, RuleScope::Paths | RuleScope::Both)
    }

    pub fn covers_contents(self) -> bool {
        matches!(self, RuleScope::Contents | RuleScope::Both)
    }
}

// Shapes generated for case-variant rules, in the order they are tried.
const CASE_SHAPES: [Case; 7] = [
    Case::Snake,
    Case::Camel,
    Case::Pascal,
    Case::Kebab,
    Case::Train,
    Case::ScreamingSnake,
    Case::Cobol,
];

#[derive(Debug, Clone)]
pub struct RenameRule {
    pattern: String,
    replacement: String,
    mode: MatchMode,
    scope: RuleScope,
    regex: Option<Regex>,
}

impl RenameRule {
    /// Builds a rule, compiling the pattern when `mode` is [`MatchMode::Regex`].
    pub fn new(pattern: &str, replacement: &str, mode: MatchMode) -> Result<Self> {
        if pattern.is_empty() {
            return Err(ForkifyError::InvalidRule {
                pattern: pattern.to_string(),
                reason: "pattern must not be empty".to_string(),
            });
        }

        let regex = match mode {
            MatchMode::Regex => Some(Regex::new(pattern).map_err(|source| {
                ForkifyError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                }
            })?),
            MatchMode::Literal | MatchMode::Word => None,
        };

        Ok(Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            mode,
            scope: RuleScope::Both,
            regex,
        })
    }

    /// Plain substring rule. An empty pattern never matches.
    pub fn literal(pattern: &str, replacement: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
            mode: MatchMode::Literal,
            scope: RuleScope::Both,
            regex: None,
        }
    }

    pub fn word(pattern: &str, replacement: &str) -> Result<Self> {
        Self::new(pattern, replacement, MatchMode::Word)
    }

    pub fn with_scope(mut self, scope: RuleScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn replacement(&self) -> &str {
        &self.replacement
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn scope(&self) -> RuleScope {
        self.scope
    }

    /// Replaces every non-overlapping occurrence, left to right.
    ///
    /// Returns [`Cow::Borrowed`] when the pattern does not occur.
    pub fn apply<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if self.pattern.is_empty() {
            return Cow::Borrowed(input);
        }

        match (&self.mode, &self.regex) {
            (MatchMode::Regex, Some(regex)) => regex.replace_all(input, self.replacement.as_str()),
            (MatchMode::Word, _) => replace_words(input, &self.pattern, &self.replacement),
            _ => {
                if input.contains(&self.pattern) {
                    Cow::Owned(input.replace(&self.pattern, &self.replacement))
                } else {
                    Cow::Borrowed(input)
                }
            }
        }
    }

    /// Expands this rule into one rule per distinct case shape of its pattern.
    ///
    /// `order-line -> room-type` yields `order_line -> room_type`,
    /// `orderLine -> roomType`, `OrderLine -> RoomType`, `ORDER_LINE -> ROOM_TYPE` and so
    /// on. The expansion is sorted longest pattern first so that a longer shape is never
    /// pre-empted by a shorter one it contains.
    pub fn case_variants(&self) -> Result<Vec<RenameRule>> {
        if self.mode == MatchMode::Regex {
            return Err(ForkifyError::InvalidRule {
                pattern: self.pattern.clone(),
                reason: "case variants cannot be generated for regex rules".to_string(),
            });
        }

        let mut seen = HashSet::new();
        let mut variants = Vec::new();

        for case in CASE_SHAPES {
            let pattern = self.pattern.to_case(case);
            if seen.insert(pattern.clone()) {
                let replacement = self.replacement.to_case(case);
                debug!("Case variant: '{}' -> '{}'", pattern, replacement);
                variants.push((pattern, replacement));
            }
        }

        // Keep the form as written, e.g. for tokens with spaces
        if seen.insert(self.pattern.clone()) {
            variants.push((self.pattern.clone(), self.replacement.clone()));
        }

        variants.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        variants
            .into_iter()
            .map(|(pattern, replacement)| {
                RenameRule::new(&pattern, &replacement, self.mode).map(|rule| rule.with_scope(self.scope))
            })
            .collect()
    }
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

fn replace_words<'a>(input: &'a str, word: &str, replacement: &str) -> Cow<'a, str> {
    let mut output = String::new();
    let mut last = 0;
    let mut replaced = false;

    for (start, _) in input.match_indices(word) {
        let end = start + word.len();
        let before = input[..start].chars().next_back();
        let after = input[end..].chars().next();
        if is_word_char(before) || is_word_char(after) {
            continue;
        }
        output.push_str(&input[last..start]);
        output.push_str(replacement);
        last = end;
        replaced = true;
    }

    if !replaced {
        return Cow::Borrowed(input);
    }

    output.push_str(&input[last..]);
    Cow::Owned(output)
}

/// An ordered rule table. Every rule sees the output of the rules before it.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<RenameRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<RenameRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: RenameRule) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> &[RenameRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Applies content-scoped rules. `None` when the text comes out unchanged.
    pub fn apply_to_contents(&self, content: &str) -> Option<String> {
        self.apply_scoped(content, RuleScope::covers_contents)
    }

    /// Applies path-scoped rules to a `/`-separated path string.
    pub fn apply_to_paths(&self, path: &str) -> Option<String> {
        self.apply_scoped(path, RuleScope::covers_paths)
    }

    /// Rewrites a path with the path-scoped rules. Pure; returns the input when nothing
    /// matches or the path is not valid UTF-8.
    pub fn rename_path(&self, path: &Path) -> PathBuf {
        let Some(path_str) = path.to_str() else {
            debug!("Leaving non UTF-8 path untouched: {:?}", path);
            return path.to_path_buf();
        };

        // Match against forward slashes so multi-segment patterns work on every host
        let normalized = if cfg!(windows) {
            Cow::Owned(path_str.replace('\\', "/"))
        } else {
            Cow::Borrowed(path_str)
        };

        match self.apply_to_paths(&normalized) {
            Some(renamed) => {
                debug!("Path rename: '{}' -> '{}'", path_str, renamed);
                PathBuf::from(renamed)
            }
            None => path.to_path_buf(),
        }
    }

    fn apply_scoped(&self, input: &str, selected: fn(RuleScope) -> bool) -> Option<String> {
        let mut current: Option<String> = None;

        for rule in self.rules.iter().filter(|rule| selected(rule.scope)) {
            let source = current.as_deref().unwrap_or(input);
            let next = match rule.apply(source) {
                Cow::Owned(next) => Some(next),
                Cow::Borrowed(_) => None,
            };
            if let Some(next) = next {
                debug!("Rule '{}' -> '{}' matched", rule.pattern, rule.replacement);
                current = Some(next);
            }
        }

        current.filter(|output| output != input)
    }
}

impl FromIterator<RenameRule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = RenameRule>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal_rules(pairs: &[(&str, &str)]) -> RuleSet {
        pairs
            .iter()
            .map(|(pattern, replacement)| RenameRule::literal(pattern, replacement))
            .collect()
    }

    #[test]
    fn test_content_replacement() {
        let rules = literal_rules(&[("product", "room")]);

        let result = rules.apply_to_contents("product list with product references");

        assert_eq!(result.as_deref(), Some("room list with room references"));
    }

    #[test]
    fn test_no_content_replacement() {
        let rules = literal_rules(&[("product", "room")]);

        assert!(rules.apply_to_contents("nothing to see here").is_none());
    }

    #[test]
    fn test_rules_compose_in_order() {
        let rules = literal_rules(&[("a", "b"), ("b", "c")]);

        assert_eq!(rules.apply_to_contents("a").as_deref(), Some("c"));
    }

    #[test]
    fn test_reverting_rules_report_no_change() {
        let rules = literal_rules(&[("a", "b"), ("b", "a")]);

        assert!(rules.apply_to_contents("a").is_none());
    }

    #[test]
    fn test_literal_matches_inside_longer_words() {
        let rules = literal_rules(&[("product", "room"), ("roomion", "production")]);

        assert_eq!(
            rules.apply_to_contents("production product").as_deref(),
            Some("production room")
        );
    }

    #[test]
    fn test_literal_is_case_sensitive() {
        let rules = literal_rules(&[("product", "room")]);

        assert!(rules.apply_to_contents("Product PRODUCT").is_none());
    }

    #[test]
    fn test_word_mode_respects_boundaries() {
        let rules = RuleSet::new(vec![RenameRule::word("product", "room").unwrap()]);

        let result = rules.apply_to_contents("product production products product_id my-product");

        assert_eq!(
            result.as_deref(),
            Some("room production products room_id my-room")
        );
    }

    #[test]
    fn test_word_mode_at_input_edges() {
        let rule = RenameRule::word("product", "room").unwrap();

        assert_eq!(rule.apply("product"), "room");
        assert_eq!(rule.apply("(product)"), "(room)");
        assert!(matches!(rule.apply("reproduct"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_regex_mode_expands_captures() {
        let rule = RenameRule::new(r"(\w+)_warehouse", "${1}_hotel", MatchMode::Regex).unwrap();

        assert_eq!(rule.apply("main_warehouse = 1"), "main_hotel = 1");
    }

    #[test]
    fn test_invalid_regex_is_rejected() {
        let result = RenameRule::new("(unclosed", "x", MatchMode::Regex);

        assert!(matches!(result, Err(ForkifyError::InvalidPattern { .. })));
    }

    #[test]
    fn test_empty_pattern_is_rejected() {
        assert!(RenameRule::new("", "x", MatchMode::Literal).is_err());
        assert!(matches!(RenameRule::literal("", "x").apply("abc"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_path_rename() {
        let rules = literal_rules(&[("product", "room"), ("saleor", "vanphong")]);

        let renamed = rules.rename_path(Path::new("saleor/product/models.py"));

        assert_eq!(renamed, PathBuf::from("vanphong/room/models.py"));
    }

    #[test]
    fn test_path_rename_identity_without_matches() {
        let rules = literal_rules(&[("product", "room")]);
        let path = Path::new("saleor/order/models.py");

        assert_eq!(rules.rename_path(path), path);
        assert_eq!(rules.rename_path(path), rules.rename_path(path));
    }

    #[test]
    fn test_multi_segment_path_pattern() {
        let rules = literal_rules(&[("graphql/product", "graphql/room")]);

        let renamed = rules.rename_path(Path::new("saleor/graphql/product/types.py"));

        assert_eq!(renamed, PathBuf::from("saleor/graphql/room/types.py"));
    }

    #[test]
    fn test_scopes_are_honoured() {
        let rules = RuleSet::new(vec![
            RenameRule::literal("product", "room").with_scope(RuleScope::Paths),
            RenameRule::literal("Product", "Room").with_scope(RuleScope::Contents),
        ]);

        assert_eq!(rules.apply_to_paths("product/Product").as_deref(), Some("room/Product"));
        assert_eq!(rules.apply_to_contents("product/Product").as_deref(), Some("product/Room"));
    }

    #[test]
    fn test_case_variants_for_single_word() {
        let variants = RenameRule::literal("product", "room").case_variants().unwrap();
        let pairs: Vec<_> = variants
            .iter()
            .map(|rule| (rule.pattern(), rule.replacement()))
            .collect();

        assert_eq!(
            pairs,
            vec![("product", "room"), ("Product", "Room"), ("PRODUCT", "ROOM")]
        );
    }

    #[test]
    fn test_case_variants_for_compound_word() {
        let variants = RenameRule::literal("product-type", "room-type")
            .with_scope(RuleScope::Contents)
            .case_variants()
            .unwrap();
        let rules = RuleSet::new(variants.clone());

        assert!(variants.iter().all(|rule| rule.scope() == RuleScope::Contents));
        assert_eq!(
            rules.apply_to_contents("class ProductType: product_type = PRODUCT_TYPE").as_deref(),
            Some("class RoomType: room_type = ROOM_TYPE")
        );
    }

    #[test]
    fn test_case_variants_reject_regex_rules() {
        let rule = RenameRule::new("prod.*", "room", MatchMode::Regex).unwrap();

        assert!(rule.case_variants().is_err());
    }
}
