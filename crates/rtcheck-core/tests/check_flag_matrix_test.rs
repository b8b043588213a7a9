use rtcheck_core::check_flags::CATALOG;
use rtcheck_core::{Category, CheckFlags};

fn leaf_flag(name: &str) -> CheckFlags {
    CheckFlags::from_name(name).unwrap_or_else(|| panic!("{name} missing from catalog"))
}

#[test]
fn disabling_a_category_disables_each_of_its_leaves() {
    for category in Category::ALL {
        let disabled = category.flags();
        for leaf in disabled.leaves() {
            assert!(
                !leaf_flag(leaf.name).is_enabled_under(disabled),
                "{} still enabled with {} disabled",
                leaf.name,
                category.name()
            );
        }
        for leaf in (CheckFlags::ALL & !disabled).leaves() {
            assert!(
                leaf_flag(leaf.name).is_enabled_under(disabled),
                "{} disabled by unrelated category {}",
                leaf.name,
                category.name()
            );
        }
    }
}

#[test]
fn disabling_a_strict_subset_keeps_the_rest_enabled() {
    for category in Category::ALL {
        let leaves: Vec<_> = category.flags().leaves().collect();
        if leaves.len() < 2 {
            continue;
        }
        // Silence every leaf but the last.
        let mut disabled = CheckFlags::NONE;
        for leaf in &leaves[..leaves.len() - 1] {
            disabled |= leaf_flag(leaf.name);
        }
        let survivor = leaves[leaves.len() - 1];
        assert!(leaf_flag(survivor.name).is_enabled_under(disabled));
        assert!(category.flags().is_enabled_under(disabled));
        for leaf in &leaves[..leaves.len() - 1] {
            assert!(!leaf_flag(leaf.name).is_enabled_under(disabled));
        }
    }
}

#[test]
fn nothing_disabled_means_everything_enabled() {
    for leaf in CheckFlags::ALL.leaves() {
        assert!(leaf_flag(leaf.name).is_enabled_under(CheckFlags::NONE));
    }
}

#[test]
fn composites_only_combine_catalog_bits() {
    let mut known = 0u64;
    for leaf in CATALOG {
        known |= 1u64 << leaf.bit;
    }
    for category in Category::ALL {
        assert_eq!(category.flags().bits() & !known, 0);
        assert!(!category.flags().is_empty(), "{} is empty", category.name());
    }
    assert_eq!(CheckFlags::ALL.bits() & !known, 0);
}

#[test]
fn shared_leaves_keep_their_bit_on_every_platform() {
    let shared = [
        ("malloc", 0),
        ("free", 5),
        ("pthread_mutex_lock", 10),
        ("sleep", 24),
        ("nanosleep", 26),
        ("open", 29),
        ("openat", 31),
        ("syscall", 34),
        ("fcntl", 37),
    ];
    for (name, bit) in shared {
        assert_eq!(leaf_flag(name).bits(), 1u64 << bit, "{name}");
    }
}
