//! Role hierarchy used by declarative endpoint guards.
//!
//! Only direct edges are stored. Chained inclusion is computed on demand by
//! walking the table, so each stored pair stays independently checkable.

use std::collections::BTreeSet;

use crate::Role;

/// `(higher, lower)` pairs.
pub const HIERARCHY: &[(Role, Role)] = &[
    (Role::Admin, Role::Hr),
    (Role::Admin, Role::FinanceManager),
    (Role::Admin, Role::ItSupport),
    (Role::Hr, Role::Manager),
    (Role::Hr, Role::DepartmentHead),
    (Role::FinanceManager, Role::Manager),
    (Role::Manager, Role::Employee),
    (Role::DepartmentHead, Role::Employee),
    (Role::ItSupport, Role::Employee),
];

pub fn directly_dominates(higher: Role, lower: Role) -> bool {
    HIERARCHY.contains(&(higher, lower))
}

/// Roles strictly below `role`.
pub fn reachable(role: Role) -> BTreeSet<Role> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![role];
    while let Some(current) = stack.pop() {
        for (_, lower) in HIERARCHY.iter().filter(|(higher, _)| *higher == current) {
            if seen.insert(*lower) {
                stack.push(*lower);
            }
        }
    }
    seen
}

/// Whether `role` is at least `required`. Reflexive.
pub fn includes(role: Role, required: Role) -> bool {
    role == required || reachable(role).contains(&required)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_edge_is_individually_present() {
        let expected = [
            (Role::Admin, Role::Hr),
            (Role::Admin, Role::FinanceManager),
            (Role::Admin, Role::ItSupport),
            (Role::Hr, Role::Manager),
            (Role::Hr, Role::DepartmentHead),
            (Role::FinanceManager, Role::Manager),
            (Role::Manager, Role::Employee),
            (Role::DepartmentHead, Role::Employee),
            (Role::ItSupport, Role::Employee),
        ];
        for (higher, lower) in expected {
            assert!(directly_dominates(higher, lower), "{higher} > {lower}");
            assert!(!directly_dominates(lower, higher), "{lower} > {higher}");
        }
        assert_eq!(HIERARCHY.len(), expected.len());
    }

    #[test]
    fn chains_are_walked_not_stored() {
        assert!(!directly_dominates(Role::Admin, Role::Employee));
        assert!(!directly_dominates(Role::Admin, Role::DepartmentHead));
        assert!(includes(Role::Admin, Role::Hr));
        assert!(includes(Role::Hr, Role::DepartmentHead));
        assert!(includes(Role::DepartmentHead, Role::Employee));
        assert!(includes(Role::Admin, Role::Employee));
    }

    #[test]
    fn siblings_do_not_include_each_other() {
        assert!(!includes(Role::Hr, Role::FinanceManager));
        assert!(!includes(Role::ItSupport, Role::Manager));
        assert!(!includes(Role::Employee, Role::Manager));
    }

    #[test]
    fn super_admin_sits_outside_the_table() {
        assert!(reachable(Role::SuperAdmin).is_empty());
        assert!(includes(Role::SuperAdmin, Role::SuperAdmin));
        assert!(!includes(Role::Admin, Role::SuperAdmin));
    }

    #[test]
    fn reachable_from_admin_covers_all_but_super_admin() {
        let below = reachable(Role::Admin);
        let expected: BTreeSet<_> = Role::ALL
            .into_iter()
            .filter(|role| !matches!(role, Role::Admin | Role::SuperAdmin))
            .collect();
        assert_eq!(below, expected);
    }
}
