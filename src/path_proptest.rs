//! Property-based tests for the gitignore to glob translation.
//!
//! These tests use proptest to generate random patterns and verify that the
//! translation rules hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{gitignore_to_glob, gitignore_to_globs};
    use proptest::prelude::*;

    proptest! {
        /// Property: unanchored, non-negated patterns only gain a `**/` prefix
        #[test]
        fn unanchored_patterns_gain_recursive_prefix(body in "[a-zA-Z0-9_.*?-][a-zA-Z0-9_./*?-]{0,30}") {
            prop_assume!(!body.starts_with('/') && !body.starts_with('!'));
            prop_assert_eq!(gitignore_to_glob(&body), format!("**/{}", body));
        }

        /// Property: anchored patterns lose exactly the leading slash
        #[test]
        fn anchored_patterns_strip_slash(body in "[a-zA-Z0-9_./*?-]{0,30}") {
            let pattern = format!("/{}", body);
            prop_assert_eq!(gitignore_to_glob(&pattern), body);
        }

        /// Property: negation stays in front of the translated body
        #[test]
        fn negation_round_trips_to_front(body in "/?[a-zA-Z0-9_.*-][a-zA-Z0-9_./*-]{0,30}") {
            let negated = gitignore_to_glob(&format!("!{}", body));
            let plain = gitignore_to_glob(&body);
            prop_assert_eq!(negated, format!("!{}", plain));
        }

        /// Property: translating a list preserves its length and order
        #[test]
        fn list_translation_is_elementwise(patterns in prop::collection::vec("!?/?[a-z*.]{1,12}", 0..10)) {
            let translated = gitignore_to_globs(&patterns);
            prop_assert_eq!(translated.len(), patterns.len());
            for (pattern, glob) in patterns.iter().zip(&translated) {
                prop_assert_eq!(glob, &gitignore_to_glob(pattern));
            }
        }

        /// Property: translation is deterministic
        #[test]
        fn translation_is_deterministic(pattern in ".*") {
            prop_assert_eq!(gitignore_to_glob(&pattern), gitignore_to_glob(&pattern));
        }
    }
}
