//! Ordered, first-match-wins authorization rules.
//!
//! Rules are evaluated top to bottom; the first rule whose pattern matches the
//! request path decides. A rule with no roles is public. A path that matches no
//! rule is allowed for any authenticated principal and denied otherwise.
//!
//! Patterns follow the Ant style used by servlet security configs:
//!
//! - `/books` matches that path only
//! - `/books/*` matches one extra segment (`/books/7`)
//! - `/books/edit/**` matches `/books/edit` and anything below it
//!
//! `**` is only accepted as the last segment.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tracing::{debug, warn};

use super::error::PolicyError;
use super::model::{Principal, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// The operation being requested, independent of transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceDescriptor {
    path: String,
}

impl ResourceDescriptor {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Clone)]
pub struct ResourcePattern {
    source: String,
    regex: Regex,
}

impl ResourcePattern {
    /// Compile an Ant-style path pattern.
    ///
    /// # Errors
    /// Returns [`PolicyError::InvalidPattern`] for malformed patterns.
    pub fn parse(pattern: &str) -> Result<Self, PolicyError> {
        let invalid = |reason: &str| PolicyError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("must start with '/'"));
        };

        let mut expr = String::from("^");
        if rest.is_empty() {
            expr.push('/');
        } else {
            let segments: Vec<&str> = rest.split('/').collect();
            let last = segments.len() - 1;
            for (index, segment) in segments.iter().enumerate() {
                if segment.is_empty() {
                    return Err(invalid("empty path segment"));
                }
                if *segment == "**" {
                    if index != last {
                        return Err(invalid("'**' is only allowed as the last segment"));
                    }
                    expr.push_str("(?:/.*)?");
                    continue;
                }
                if segment.contains("**") {
                    return Err(invalid("'**' must be a whole segment"));
                }
                expr.push('/');
                let parts: Vec<String> = segment.split('*').map(regex::escape).collect();
                expr.push_str(&parts.join("[^/]*"));
            }
        }
        expr.push('$');

        let regex = Regex::new(&expr).map_err(|err| invalid(&err.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl fmt::Debug for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourcePattern").field(&self.source).finish()
    }
}

#[derive(Clone, Debug)]
pub struct AuthorizationRule {
    pattern: ResourcePattern,
    roles: Vec<Role>,
}

impl AuthorizationRule {
    #[must_use]
    pub fn new(pattern: ResourcePattern, roles: Vec<Role>) -> Self {
        Self { pattern, roles }
    }

    #[must_use]
    pub fn pattern(&self) -> &ResourcePattern {
        &self.pattern
    }

    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    #[must_use]
    pub fn is_public(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Serialized form of the rule table.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    pub rules: Vec<RuleConfig>,
}

/// One `requestMatchers(...)` style entry: several patterns sharing a role set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct RuleConfig {
    pub patterns: Vec<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        let rule = |patterns: &[&str], roles: &[&str]| RuleConfig {
            patterns: patterns.iter().map(ToString::to_string).collect(),
            roles: roles.iter().map(ToString::to_string).collect(),
        };
        Self {
            rules: vec![
                rule(&["/", "/books", "/login", "/logout"], &[]),
                rule(
                    &["/books/add", "/books/edit/**", "/books/delete/**"],
                    &["ADMIN"],
                ),
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthorizationRule>,
}

impl AuthorizationPolicy {
    /// Compile a rule table, preserving declaration order.
    ///
    /// # Errors
    /// Returns [`PolicyError`] for rules without patterns, malformed patterns, or
    /// unknown roles.
    pub fn from_config(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let mut rules: Vec<AuthorizationRule> = Vec::new();

        for (index, rule) in config.rules.iter().enumerate() {
            if rule.patterns.is_empty() {
                return Err(PolicyError::NoPatterns { index });
            }

            let roles = rule
                .roles
                .iter()
                .map(|role| {
                    role.parse::<Role>().map_err(|_| PolicyError::UnknownRole {
                        index,
                        role: role.clone(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            for pattern in &rule.patterns {
                let pattern = ResourcePattern::parse(pattern)?;
                if rules
                    .iter()
                    .any(|existing| existing.pattern.as_str() == pattern.as_str())
                {
                    warn!(
                        "Pattern {} in rule {index} is shadowed by an earlier rule",
                        pattern.as_str()
                    );
                }
                rules.push(AuthorizationRule::new(pattern, roles.clone()));
            }
        }

        Ok(Self { rules })
    }

    /// The built-in table: public catalogue and login pages, admin-only edits.
    ///
    /// # Errors
    /// Returns [`PolicyError`] if the built-in table fails to compile.
    pub fn builtin() -> Result<Self, PolicyError> {
        Self::from_config(&PolicyConfig::default())
    }

    /// Parse a JSON rule table.
    ///
    /// # Errors
    /// Returns [`PolicyError`] if the JSON or any rule is invalid.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let config: PolicyConfig = serde_json::from_str(json)?;
        Self::from_config(&config)
    }

    /// Load a JSON rule table from disk.
    ///
    /// # Errors
    /// Returns [`PolicyError`] if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let json = fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    /// Decide whether `principal` (or an anonymous caller) may access `resource`.
    #[must_use]
    pub fn authorize(
        &self,
        principal: Option<&Principal>,
        resource: &ResourceDescriptor,
    ) -> Decision {
        let Some(rule) = self
            .rules
            .iter()
            .find(|rule| rule.pattern.matches(resource.path()))
        else {
            debug!(path = resource.path(), "No rule matched, authentication required");
            return if principal.is_some() {
                Decision::Allow
            } else {
                Decision::Deny
            };
        };

        if rule.is_public() {
            return Decision::Allow;
        }

        match principal {
            Some(principal) if rule.roles.contains(&principal.role()) => Decision::Allow,
            _ => Decision::Deny,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> Principal {
        Principal::new("pedro".to_string(), role)
    }

    fn resource(path: &str) -> ResourceDescriptor {
        ResourceDescriptor::new(path)
    }

    #[test]
    fn pattern_literal_matches_exactly() {
        let pattern = ResourcePattern::parse("/books").unwrap();
        assert!(pattern.matches("/books"));
        assert!(!pattern.matches("/books/"));
        assert!(!pattern.matches("/books/1"));
        assert!(!pattern.matches("/bookshelf"));
    }

    #[test]
    fn pattern_root_matches_only_root() {
        let pattern = ResourcePattern::parse("/").unwrap();
        assert!(pattern.matches("/"));
        assert!(!pattern.matches("/books"));
        assert!(!pattern.matches(""));
    }

    #[test]
    fn pattern_double_star_matches_subtree() {
        let pattern = ResourcePattern::parse("/books/edit/**").unwrap();
        assert!(pattern.matches("/books/edit"));
        assert!(pattern.matches("/books/edit/5"));
        assert!(pattern.matches("/books/edit/5/extra"));
        assert!(!pattern.matches("/books/editor"));
        assert!(!pattern.matches("/books"));
    }

    #[test]
    fn pattern_single_star_matches_one_segment() {
        let pattern = ResourcePattern::parse("/books/*/cover").unwrap();
        assert!(pattern.matches("/books/5/cover"));
        assert!(!pattern.matches("/books/5/6/cover"));

        let prefix = ResourcePattern::parse("/books/draft-*").unwrap();
        assert!(prefix.matches("/books/draft-1"));
        assert!(!prefix.matches("/books/final-1"));
    }

    #[test]
    fn pattern_escapes_regex_characters() {
        let pattern = ResourcePattern::parse("/books.json").unwrap();
        assert!(pattern.matches("/books.json"));
        assert!(!pattern.matches("/booksXjson"));
    }

    #[test]
    fn malformed_patterns_are_rejected() {
        for bad in ["books", "", "/books//edit", "/books/", "/**/edit", "/books/a**"] {
            assert!(
                matches!(
                    ResourcePattern::parse(bad),
                    Err(PolicyError::InvalidPattern { .. })
                ),
                "pattern {bad:?} should be rejected"
            );
        }
    }

    /// Every declared pattern against representative paths, for each caller kind.
    #[test]
    fn default_rule_precedence_table() {
        use Decision::{Allow, Deny};

        let policy = AuthorizationPolicy::builtin().unwrap();
        let admin = principal(Role::Admin);
        let student = principal(Role::Student);

        // (path, anonymous, student, admin)
        let cases = [
            ("/", Allow, Allow, Allow),
            ("/books", Allow, Allow, Allow),
            ("/login", Allow, Allow, Allow),
            ("/logout", Allow, Allow, Allow),
            ("/books/add", Deny, Deny, Allow),
            ("/books/edit", Deny, Deny, Allow),
            ("/books/edit/5", Deny, Deny, Allow),
            ("/books/delete/5", Deny, Deny, Allow),
            ("/books/delete/5/confirm", Deny, Deny, Allow),
            ("/me", Deny, Allow, Allow),
            ("/books/", Deny, Allow, Allow),
            ("/admin", Deny, Allow, Allow),
        ];

        for (path, anonymous, as_student, as_admin) in cases {
            let resource = resource(path);
            assert_eq!(policy.authorize(None, &resource), anonymous, "anonymous {path}");
            assert_eq!(
                policy.authorize(Some(&student), &resource),
                as_student,
                "student {path}"
            );
            assert_eq!(
                policy.authorize(Some(&admin), &resource),
                as_admin,
                "admin {path}"
            );
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = AuthorizationPolicy::from_json(
            r#"{"rules": [
                {"patterns": ["/books/**"], "roles": []},
                {"patterns": ["/books/add"], "roles": ["ADMIN"]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(policy.authorize(None, &resource("/books/add")), Decision::Allow);

        let reversed = AuthorizationPolicy::from_json(
            r#"{"rules": [
                {"patterns": ["/books/add"], "roles": ["ADMIN"]},
                {"patterns": ["/books/**"], "roles": []}
            ]}"#,
        )
        .unwrap();
        assert_eq!(reversed.authorize(None, &resource("/books/add")), Decision::Deny);
        assert_eq!(reversed.authorize(None, &resource("/books/7")), Decision::Allow);
    }

    #[test]
    fn anonymous_allowed_only_when_first_match_is_public() {
        let policy = AuthorizationPolicy::builtin().unwrap();
        for rule in policy.rules() {
            let path = rule.pattern().as_str().trim_end_matches("/**");
            let path = if path.is_empty() { "/" } else { path };
            let expected = if rule.is_public() {
                Decision::Allow
            } else {
                Decision::Deny
            };
            assert_eq!(policy.authorize(None, &resource(path)), expected, "{path}");
        }
    }

    #[test]
    fn role_gated_rule_denies_other_roles() {
        let policy = AuthorizationPolicy::from_json(
            r#"{"rules": [{"patterns": ["/reports/**"], "roles": ["admin", "ROLE_STUDENT"]}]}"#,
        )
        .unwrap();
        let guest = principal(Role::Guest);
        let student = principal(Role::Student);

        assert_eq!(
            policy.authorize(Some(&guest), &resource("/reports/1")),
            Decision::Deny
        );
        assert_eq!(
            policy.authorize(Some(&student), &resource("/reports/1")),
            Decision::Allow
        );
    }

    #[test]
    fn unmatched_paths_require_authentication() {
        let policy = AuthorizationPolicy::from_config(&PolicyConfig { rules: Vec::new() }).unwrap();
        let guest = principal(Role::Guest);

        assert_eq!(policy.authorize(None, &resource("/anything")), Decision::Deny);
        assert_eq!(
            policy.authorize(Some(&guest), &resource("/anything")),
            Decision::Allow
        );
    }

    #[test]
    fn catalogue_access_scenarios() {
        let policy = AuthorizationPolicy::builtin().unwrap();
        let pedro = principal(Role::Admin);

        assert!(policy
            .authorize(Some(&pedro), &resource("/books/add"))
            .is_allowed());
        assert!(policy.authorize(None, &resource("/books")).is_allowed());
        assert!(!policy
            .authorize(None, &resource("/books/delete/5"))
            .is_allowed());
    }

    #[test]
    fn rule_without_patterns_is_rejected() {
        let result = AuthorizationPolicy::from_json(r#"{"rules": [{"patterns": [], "roles": []}]}"#);
        assert!(matches!(result, Err(PolicyError::NoPatterns { index: 0 })));
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result = AuthorizationPolicy::from_json(
            r#"{"rules": [{"patterns": ["/"]}, {"patterns": ["/x"], "roles": ["librarian"]}]}"#,
        );
        assert!(matches!(
            result,
            Err(PolicyError::UnknownRole { index: 1, .. })
        ));
    }

    #[test]
    fn invalid_json_is_rejected() {
        assert!(matches!(
            AuthorizationPolicy::from_json("{"),
            Err(PolicyError::Json(_))
        ));
    }

    #[test]
    fn missing_file_is_rejected() {
        let result = AuthorizationPolicy::load(Path::new("/nonexistent/bookstore-policy.json"));
        assert!(matches!(result, Err(PolicyError::Io { .. })));
    }
}
