//! Console rendering of published board state.

use mb_refresh::{BasisChange, RefreshView};

/// One summary line for a published view.
pub fn render_view(view: &RefreshView, no_tax: bool) -> String {
    let Some(key) = &view.key else {
        return "nothing selected".to_string();
    };

    let mut line = format!("[{key}]");

    match &view.snapshot {
        Some(snapshot) if snapshot.is_empty() => line.push_str(" no listings or sales"),
        Some(snapshot) => {
            line.push_str(&format!(
                " {} listings, {} sales",
                snapshot.listings.len(),
                snapshot.history.len()
            ));
            if let Some(cheapest) = snapshot.cheapest_listing() {
                let paid = if no_tax {
                    cheapest.total
                } else {
                    cheapest.total_with_tax()
                };
                line.push_str(&format!(
                    ", cheapest {} gil x{} on {} ({} total)",
                    cheapest.unit_price, cheapest.quantity, cheapest.world_name, paid
                ));
            }
        }
        None => line.push_str(" no data"),
    }

    if view.loading {
        line.push_str(" (loading)");
    }
    if let Some(failure) = &view.last_error {
        line.push_str(&format!(" error: {}", failure.message));
    }

    line
}

/// Console reply to a `notax` command. `None` when the refetch it started
/// will be rendered anyway.
pub fn basis_notice(change: &BasisChange, no_tax: bool) -> Option<String> {
    let basis = if no_tax { "on" } else { "off" };
    match change {
        BasisChange::Unchanged => Some(format!("no-tax already {basis}")),
        BasisChange::Changed(None) => Some(format!("no-tax {basis}, cache cleared")),
        BasisChange::Changed(Some(_)) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mb_core::{Listing, MarketData, MarketScope, Snapshot, SnapshotKey};
    use mb_refresh::FetchFailure;
    use std::sync::Arc;

    fn view_with(listings: Vec<Listing>) -> RefreshView {
        let snapshot = Snapshot::stamp(
            MarketData {
                item_id: 5057,
                listings,
                ..Default::default()
            },
            0,
        );
        RefreshView {
            key: Some(SnapshotKey::new(5057, MarketScope::new("Chaos"))),
            snapshot: Some(Arc::new(snapshot)),
            loading: false,
            last_error: None,
        }
    }

    fn listing(unit_price: u64) -> Listing {
        Listing {
            unit_price,
            quantity: 2,
            total: unit_price * 2,
            hq: false,
            retainer_name: "Retainer".to_string(),
            world_name: "Omega".to_string(),
            tax: unit_price / 10,
        }
    }

    #[test]
    fn test_render_nothing_selected() {
        assert_eq!(render_view(&RefreshView::default(), false), "nothing selected");
    }

    #[test]
    fn test_render_cheapest_with_and_without_tax() {
        let view = view_with(vec![listing(300), listing(100)]);

        let line = render_view(&view, false);
        assert!(line.starts_with("[5057@Chaos] 2 listings, 0 sales"));
        assert!(line.contains("cheapest 100 gil x2 on Omega (210 total)"));

        let line = render_view(&view, true);
        assert!(line.contains("(200 total)"));
    }

    #[test]
    fn test_render_loading_and_error() {
        let mut view = view_with(Vec::new());
        view.loading = true;
        assert_eq!(render_view(&view, false), "[5057@Chaos] no listings or sales (loading)");

        view.loading = false;
        view.snapshot = None;
        view.last_error = Some(FetchFailure {
            key: SnapshotKey::new(5057, MarketScope::new("Chaos")),
            message: "HTTP 503: ".to_string(),
            retryable: true,
        });
        assert_eq!(render_view(&view, false), "[5057@Chaos] no data error: HTTP 503: ");
    }

    #[test]
    fn test_basis_notice_tells_toggle_from_no_op() {
        assert_eq!(
            basis_notice(&BasisChange::Changed(None), true).as_deref(),
            Some("no-tax on, cache cleared")
        );
        assert_eq!(
            basis_notice(&BasisChange::Unchanged, true).as_deref(),
            Some("no-tax already on")
        );
        assert_eq!(
            basis_notice(&BasisChange::Unchanged, false).as_deref(),
            Some("no-tax already off")
        );
    }
}
