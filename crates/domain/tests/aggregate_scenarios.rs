//! End-to-end scenarios across the cart and product aggregates.

use chrono::{Duration, Utc};
use common::{ProductId, UserId};
use domain::{Cart, CartItem, Category, DomainError, Money, Product, PurchaseStatus, Rating};

fn line(cents: i64, quantity: u32) -> CartItem {
    CartItem::new(ProductId::new(), quantity, Money::from_cents(cents)).unwrap()
}

mod cart_lifecycle {
    use super::*;

    #[test]
    fn delete_two_of_three_items() {
        let (p, q) = (1250, 3);
        let mut cart = Cart::new(UserId::new(), "Downtown");
        let (a, b, c) = (line(p, q), line(p, q), line(p, q));
        cart.add_items([a.clone(), b.clone(), c.clone()]);

        cart.delete_items(cart.bought_by(), &[a.id(), b.id()]);

        assert_eq!(cart.item_count(), 3);
        let statuses: Vec<_> = cart.items().iter().map(CartItem::purchase_status).collect();
        assert_eq!(
            statuses,
            vec![
                PurchaseStatus::Deleted,
                PurchaseStatus::Deleted,
                PurchaseStatus::Created
            ]
        );
        assert_eq!(cart.total_sale_amount().cents(), p * i64::from(q));
    }

    #[test]
    fn add_delete_then_add_again() {
        let mut cart = Cart::new(UserId::new(), "Downtown");
        let first = line(500, 2);
        cart.add_items([first.clone()]);
        cart.delete_items(cart.bought_by(), &[first.id()]);
        assert!(cart.total_sale_amount().is_zero());

        cart.add_items([line(300, 1)]);

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_sale_amount().cents(), 300);
    }

    #[test]
    fn cancel_then_delete() {
        let mut cart = Cart::new(UserId::new(), "Downtown");
        cart.add_items([line(500, 2), line(250, 4)]);
        let actor = UserId::new();

        cart.cancel(actor);
        cart.delete(Some(actor)).unwrap();

        assert_eq!(cart.purchase_status(), PurchaseStatus::Deleted);
        // Cancelled lines stay cancelled; the cascade only touches live lines.
        assert!(
            cart.items()
                .iter()
                .all(|i| i.purchase_status() == PurchaseStatus::Cancelled)
        );
        assert!(cart.total_sale_amount().is_zero());
    }

    #[test]
    fn unset_actor_is_rejected_whatever_the_arguments() {
        let mut cart = Cart::new(UserId::new(), "Downtown");
        for (offset, store) in [(0, ""), (-3600, "Airport"), (86_400, "Night shop")] {
            let result = cart.change(None, Utc::now() + Duration::seconds(offset), store);
            assert!(matches!(result, Err(DomainError::InvalidArgument { .. })));
        }
        assert!(matches!(
            cart.delete(None),
            Err(DomainError::InvalidArgument { .. })
        ));
    }
}

mod product {
    use super::*;

    #[test]
    fn category_name_differs_from_title() {
        let mut product = Product::new(
            "Desk lamp",
            Money::from_cents(2599),
            "LED lamp",
            "https://cdn.example.com/lamp.png",
            Rating::new(4.1, 12),
            None,
        );

        product.change(
            "X",
            Money::from_units(1),
            "d",
            "img",
            Rating::default(),
            Some(Category::new("Y")),
        );

        assert!(!product.same_category_name("X"));
    }

    #[test]
    fn validation_reports_instead_of_failing() {
        let result = Product::default().validate();
        assert!(!result.is_valid);
        assert!(!result.errors.is_empty());
    }
}
