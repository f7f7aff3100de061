//! Read-only summary metrics over the ledger.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::accounting::round_money;
use super::error::LedgerError;
use super::item::{Item, ItemFilter, ListingStatus};
use super::sale::{PayoutStatus, Sale, SaleFilter};
use crate::ports::ledger_store::LedgerStore;

labelled_enum! {
    /// ROI bands used for the distribution report.
    pub enum RoiBucket {
        Loss => "<0%",
        Low => "0-25%",
        Medium => "25-50%",
        High => "50-100%",
        Exceptional => ">=100%",
    }
}

impl RoiBucket {
    pub fn for_roi(roi: Decimal) -> Self {
        if roi < Decimal::ZERO {
            Self::Loss
        } else if roi < Decimal::from(25) {
            Self::Low
        } else if roi < Decimal::from(50) {
            Self::Medium
        } else if roi < Decimal::ONE_HUNDRED {
            Self::High
        } else {
            Self::Exceptional
        }
    }
}

fn average(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        round_money(total / Decimal::from(count))
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ItemStats {
    pub total: usize,
    pub by_status: BTreeMap<ListingStatus, usize>,
    /// Items with a sale price; profit figures cover only these.
    pub priced: usize,
    pub total_profit: Decimal,
    pub average_profit: Decimal,
    pub roi_distribution: BTreeMap<RoiBucket, usize>,
}

impl ItemStats {
    pub fn from_items(items: &[Item]) -> Self {
        let mut stats = Self {
            total: items.len(),
            ..Self::default()
        };
        for item in items {
            *stats.by_status.entry(item.status).or_default() += 1;
            if item.sale_price.is_some() {
                stats.priced += 1;
                stats.total_profit += item.profit();
                *stats
                    .roi_distribution
                    .entry(RoiBucket::for_roi(item.roi_percent()))
                    .or_default() += 1;
            }
        }
        stats.average_profit = average(stats.total_profit, stats.priced);
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SalesStats {
    pub count: usize,
    pub by_payout: BTreeMap<PayoutStatus, usize>,
    pub revenue: Decimal,
    pub total_net_profit: Decimal,
    pub average_net_profit: Decimal,
}

impl SalesStats {
    pub fn from_sales(sales: &[Sale]) -> Self {
        let mut stats = Self {
            count: sales.len(),
            ..Self::default()
        };
        for sale in sales {
            *stats.by_payout.entry(sale.payout_status).or_default() += 1;
            stats.revenue += sale.sale_price;
            stats.total_net_profit += sale.net_profit();
        }
        stats.average_net_profit = average(stats.total_net_profit, stats.count);
        stats
    }
}

/// Sum of net profit over sales sold within `from..=to` (UTC dates).
pub fn net_profit_in_range(sales: &[Sale], from: NaiveDate, to: NaiveDate) -> Decimal {
    sales
        .iter()
        .filter(|s| {
            let day = s.sold_at.date_naive();
            day >= from && day <= to
        })
        .map(Sale::net_profit)
        .sum()
}

pub fn item_stats<S: LedgerStore + ?Sized>(store: &S) -> Result<ItemStats, LedgerError> {
    let items = store.list_items(&ItemFilter::default(), None)?;
    Ok(ItemStats::from_items(&items))
}

pub fn sales_stats<S: LedgerStore + ?Sized>(store: &S) -> Result<SalesStats, LedgerError> {
    let sales = store.list_sales(&SaleFilter::default(), None)?;
    Ok(SalesStats::from_sales(&sales))
}

pub fn net_profit_between<S: LedgerStore + ?Sized>(
    store: &S,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Decimal, LedgerError> {
    if from > to {
        return Err(LedgerError::validation(format!(
            "date range start {from} is after end {to}"
        )));
    }
    let sales = store.list_sales(&SaleFilter::default(), None)?;
    Ok(net_profit_in_range(&sales, from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::item::tests::sample_item;
    use crate::domain::sale::tests::sample_sale;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    #[test]
    fn empty_ledger_is_zeroed() {
        let items = ItemStats::from_items(&[]);
        assert_eq!(items.total, 0);
        assert_eq!(items.average_profit, Decimal::ZERO);
        assert!(items.by_status.is_empty());

        let sales = SalesStats::from_sales(&[]);
        assert_eq!(sales.count, 0);
        assert_eq!(sales.average_net_profit, Decimal::ZERO);
    }

    #[test]
    fn profit_covers_priced_items_only() {
        let priced = sample_item();
        let mut unpriced = sample_item();
        unpriced.sale_price = None;
        unpriced.status = ListingStatus::Listed;

        let stats = ItemStats::from_items(&[priced.clone(), unpriced]);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.priced, 1);
        assert_eq!(stats.total_profit, priced.profit());
        assert_eq!(stats.average_profit, dec!(31.50));
        assert_eq!(stats.by_status[&ListingStatus::Draft], 1);
        assert_eq!(stats.by_status[&ListingStatus::Listed], 1);
        assert_eq!(stats.roi_distribution[&RoiBucket::High], 1);
    }

    #[test]
    fn roi_buckets() {
        assert_eq!(RoiBucket::for_roi(dec!(-0.01)), RoiBucket::Loss);
        assert_eq!(RoiBucket::for_roi(Decimal::ZERO), RoiBucket::Low);
        assert_eq!(RoiBucket::for_roi(dec!(25)), RoiBucket::Medium);
        assert_eq!(RoiBucket::for_roi(dec!(99.99)), RoiBucket::High);
        assert_eq!(RoiBucket::for_roi(dec!(100)), RoiBucket::Exceptional);
    }

    #[test]
    fn range_is_inclusive() {
        let mut a = sample_sale();
        a.sold_at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut b = sample_sale();
        b.sold_at = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 0).unwrap();
        let mut c = sample_sale();
        c.sold_at = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        let from = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let total = net_profit_in_range(&[a.clone(), b.clone(), c], from, to);
        assert_eq!(total, a.net_profit() + b.net_profit());
    }

    #[test]
    fn sales_summary_groups_payouts() {
        let mut paid = sample_sale();
        paid.payout_status = PayoutStatus::Paid;
        let stats = SalesStats::from_sales(&[sample_sale(), paid]);
        assert_eq!(stats.count, 2);
        assert_eq!(stats.revenue, dec!(170.00));
        assert_eq!(stats.by_payout[&PayoutStatus::Pending], 1);
        assert_eq!(stats.by_payout[&PayoutStatus::Paid], 1);
        assert_eq!(stats.average_net_profit, dec!(76.50));
    }
}
