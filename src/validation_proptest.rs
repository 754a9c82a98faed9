//! Property-based tests for input validation.
//!
//! Generated inputs check that hostile strings never get through, whatever
//! surrounds them.

#[cfg(test)]
mod proptest_tests {
    use crate::validation::{
        sanitize_argument_list, validate_alias, validate_branch_name, validate_path,
        MAX_ARGUMENTS,
    };
    use proptest::prelude::*;

    const METACHARACTERS: &[char] = &[';', '&', '|', '`', '$', '(', ')', '{', '}'];
    const BRANCH_KINDS: &[&str] = &["feature", "fix", "release"];

    proptest! {
        /// Any branch name containing a shell metacharacter is rejected.
        #[test]
        fn branch_with_metacharacter_is_rejected(
            prefix in "[a-z0-9]{0,12}",
            meta in prop::sample::select(METACHARACTERS),
            suffix in "[a-z0-9]{0,12}",
        ) {
            let name = format!("{}{}{}", prefix, meta, suffix);
            prop_assert!(validate_branch_name(&name).is_err(), "accepted '{}'", name);
        }

        /// Conventional branch names are accepted unchanged.
        #[test]
        fn conventional_branch_is_accepted(
            kind in prop::sample::select(BRANCH_KINDS),
            topic in "[a-z][a-z0-9-]{0,20}[a-z0-9]",
        ) {
            let name = format!("{}/{}", kind, topic);
            prop_assert_eq!(validate_branch_name(&name).unwrap(), name);
        }

        /// Validation is idempotent on accepted names.
        #[test]
        fn branch_validation_is_idempotent(name in "[A-Za-z0-9][A-Za-z0-9/_-]{0,30}[A-Za-z0-9]") {
            if let Ok(first) = validate_branch_name(&name) {
                prop_assert_eq!(validate_branch_name(&first).unwrap(), first);
            }
        }

        /// Paths containing a `..` segment never validate.
        #[test]
        fn path_with_parent_segment_is_rejected(
            head in prop::collection::vec("[a-z]{1,8}", 0..4),
            tail in prop::collection::vec("[a-z]{1,8}", 0..4),
        ) {
            let mut segments = head;
            segments.push("..".to_string());
            segments.extend(tail);
            let raw = format!("/{}", segments.join("/"));
            prop_assert!(validate_path(&raw).is_err(), "accepted '{}'", raw);
        }

        /// Accepted paths are absolute and free of `..`.
        #[test]
        fn accepted_paths_are_absolute(segments in prop::collection::vec("[a-z._]{1,8}", 1..5)) {
            let raw = segments.join("/");
            if let Ok(path) = validate_path(&raw) {
                prop_assert!(path.is_absolute());
                prop_assert!(!path.to_string_lossy().split('/').any(|s| s == ".."));
            }
        }

        /// Sanitized argument lists are bounded and contain only safe tokens.
        #[test]
        fn sanitized_arguments_are_bounded(raw in ".{0,400}") {
            let tokens = sanitize_argument_list(Some(&raw));
            prop_assert!(tokens.len() <= MAX_ARGUMENTS);
            for token in &tokens {
                prop_assert!(!token.contains(METACHARACTERS), "kept '{}'", token);
                prop_assert!(!token.contains('/'));
            }
        }

        /// Aliases never contain path separators.
        #[test]
        fn alias_never_contains_separator(raw in ".{0,40}") {
            if let Ok(alias) = validate_alias(&raw) {
                prop_assert!(!alias.contains('/'));
                prop_assert!(!alias.contains('\\'));
                prop_assert!(alias != "." && alias != "..");
            }
        }
    }
}
