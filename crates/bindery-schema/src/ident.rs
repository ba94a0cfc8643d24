//! Identifier derivation helpers.

use convert_case::{Case, Casing};

/// Derive the default column or table identifier from a declared name.
/// Dotted member keys collapse into one flat identifier
/// (`homeAddress.city` becomes `home_address_city`).
#[must_use]
pub fn to_snake_case(name: &str) -> String {
    // Dots are not a casing boundary for convert_case; collapse them to
    // segment separators first.
    name.replace('.', "_").to_case(Case::Snake)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn derives_column_names() {
        assert_eq!(to_snake_case("FirstName"), "first_name");
        assert_eq!(to_snake_case("Id"), "id");
        assert_eq!(to_snake_case("CreatedBy"), "created_by");
        assert_eq!(to_snake_case("UserEntity"), "user_entity");
    }

    #[test]
    fn collapses_dotted_keys() {
        assert_eq!(to_snake_case("homeAddress.city"), "home_address_city");
        assert_eq!(to_snake_case("a.b.c"), "a_b_c");
    }

    proptest! {
        // Derivation must be stable: re-deriving an already derived name is
        // a no-op, so applying it before and after flattening agrees.
        #[test]
        fn derivation_is_idempotent(name in "[A-Za-z][A-Za-z0-9]{0,16}(\\.[A-Za-z][A-Za-z0-9]{0,8}){0,3}") {
            let once = to_snake_case(&name);
            prop_assert_eq!(to_snake_case(&once), once.clone());
            prop_assert!(!once.contains('.'));
            prop_assert!(!once.chars().any(char::is_uppercase));
        }
    }
}
