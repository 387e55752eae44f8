//! Package computation
//!
//! Pure, deterministic greedy fill: a product with ordered quantity N and
//! per-package capacity C yields ceil(N / C) packages of C units, the last
//! taking the remainder. Packages are never shared between products — each
//! emitted package holds exactly one product slice, which is what the
//! marketplace split endpoint expects.

use ozon_api::types::{Package, PackageProduct};

/// Input for one product line
#[derive(Debug, Clone)]
pub struct ProductPacking {
    /// Marketplace SKU
    pub sku: i64,
    /// Ordered quantity
    pub quantity: u32,
    /// Per-package unit capacity from the delivery parameters
    pub capacity: u32,
}

/// Distribute one product's quantity over packages.
///
/// A capacity of zero is treated as one unit per package rather than
/// looping forever.
pub fn pack(capacity: u32, total: u32, sku: i64) -> Vec<PackageProduct> {
    let capacity = capacity.max(1);
    let mut lines = Vec::new();
    let mut remaining = total;

    while remaining > 0 {
        let quantity = remaining.min(capacity);
        lines.push(PackageProduct {
            product_id: sku,
            quantity,
        });
        remaining -= quantity;
    }

    lines
}

/// Build the package list for a whole order, one package per emitted slice
pub fn build_packages(products: &[ProductPacking]) -> Vec<Package> {
    products
        .iter()
        .flat_map(|p| pack(p.capacity, p.quantity, p.sku))
        .map(|line| Package {
            products: vec![line],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Per product: quantities across packages sum to the ordered quantity
    /// and no slice exceeds the capacity except never (the remainder is
    /// always <= capacity)
    fn assert_invariants(lines: &[PackageProduct], capacity: u32, total: u32) {
        let sum: u32 = lines.iter().map(|l| l.quantity).sum();
        assert_eq!(sum, total, "quantities must sum to the ordered total");

        let capacity = capacity.max(1);
        for (i, line) in lines.iter().enumerate() {
            assert!(
                line.quantity <= capacity,
                "package {i} exceeds capacity: {} > {capacity}",
                line.quantity
            );
        }
        // Every slice but the last is exactly full
        for line in &lines[..lines.len().saturating_sub(1)] {
            assert_eq!(line.quantity, capacity);
        }
    }

    #[test]
    fn test_capacity_splits_with_remainder() {
        let lines = pack(4, 10, 42);
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines.iter().map(|l| l.quantity).collect::<Vec<_>>(),
            vec![4, 4, 2]
        );
        assert_invariants(&lines, 4, 10);
        assert!(lines.iter().all(|l| l.product_id == 42));
    }

    #[test]
    fn test_capacity_covering_total_yields_single_package() {
        let lines = pack(10, 7, 42);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 7);
        assert_invariants(&lines, 10, 7);
    }

    #[test]
    fn test_exact_multiple_has_no_remainder_package() {
        let lines = pack(3, 9, 42);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|l| l.quantity == 3));
        assert_invariants(&lines, 3, 9);
    }

    #[test]
    fn test_zero_capacity_degrades_to_unit_packages() {
        let lines = pack(0, 3, 42);
        assert_eq!(lines.len(), 3);
        assert_invariants(&lines, 0, 3);
    }

    #[test]
    fn test_zero_quantity_yields_nothing() {
        assert!(pack(5, 0, 42).is_empty());
    }

    #[test]
    fn test_invariants_over_grid() {
        for capacity in 0..=6u32 {
            for total in 1..=20u32 {
                let lines = pack(capacity, total, 7);
                assert_invariants(&lines, capacity, total);
            }
        }
    }

    #[test]
    fn test_build_packages_keeps_products_separate() {
        let packages = build_packages(&[
            ProductPacking {
                sku: 10,
                quantity: 5,
                capacity: 2,
            },
            ProductPacking {
                sku: 20,
                quantity: 1,
                capacity: 4,
            },
        ]);

        // 3 packages for sku 10 (2+2+1) and 1 for sku 20
        assert_eq!(packages.len(), 4);
        assert!(packages.iter().all(|p| p.products.len() == 1));

        let sku10_total: u32 = packages
            .iter()
            .flat_map(|p| &p.products)
            .filter(|l| l.product_id == 10)
            .map(|l| l.quantity)
            .sum();
        assert_eq!(sku10_total, 5);
    }
}
