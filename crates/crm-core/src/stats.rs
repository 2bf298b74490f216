//! Read-side reports. Everything here is recomputed from the collections on
//! each call; nothing is cached.

use crate::application::{self, OpportunityApplication};
use crate::error::{CrmError, Result};
use crate::money::Amount;
use crate::opportunity::{self, Opportunity};
use crate::types::{OpportunityStage, OpportunityStatus, Period};
use crate::user::User;
use crate::visit::{self, VisitRecord};
use chrono::{NaiveDate, TimeZone};
use serde::Serialize;
use std::collections::BTreeMap;

/// `numerator / denominator` as a percentage, rounded half up. 0 when empty.
pub fn percent(numerator: usize, denominator: usize) -> u32 {
    if denominator == 0 {
        return 0;
    }
    ((200 * numerator + denominator) / (2 * denominator)) as u32
}

// ---------------------------------------------------------------------------
// Funnel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunnelRow {
    pub stage: OpportunityStage,
    pub count: usize,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funnel {
    pub rows: Vec<FunnelRow>,
    pub total_count: usize,
    pub total_amount: Amount,
    /// Stages carrying a non-zero amount.
    pub active_stages: usize,
}

pub fn funnel(opps: &[Opportunity], viewer: &User) -> Funnel {
    let mut rows: Vec<FunnelRow> = OpportunityStage::all()
        .iter()
        .map(|&stage| FunnelRow {
            stage,
            count: 0,
            amount: Amount::ZERO,
        })
        .collect();

    for opp in opportunity::visible_to(opps, viewer) {
        let row = &mut rows[opp.stage.order() - 1];
        row.count += 1;
        row.amount = row.amount + opp.amount;
    }

    Funnel {
        total_count: rows.iter().map(|r| r.count).sum(),
        total_amount: rows.iter().map(|r| r.amount).sum(),
        active_stages: rows.iter().filter(|r| r.amount > Amount::ZERO).count(),
        rows,
    }
}

// ---------------------------------------------------------------------------
// Visit conversion
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub period: Period,
    pub since: Option<NaiveDate>,
    pub visits: usize,
    pub applications: usize,
    /// Applications per hundred visits, rounded.
    pub rate: u32,
}

/// Visits and applications inside `period`, as seen by `viewer`.
///
/// `today` and application timestamps are both read in `tz`, so a period
/// starts at local midnight rather than UTC midnight.
pub fn conversion<Tz: TimeZone>(
    visits: &[VisitRecord],
    apps: &[OpportunityApplication],
    viewer: &User,
    period: Period,
    today: NaiveDate,
    tz: &Tz,
) -> Conversion {
    let since = period.start(today);
    let in_period = |date: NaiveDate| since.map_or(true, |start| date >= start);

    let visit_count = visit::visible_to(visits, viewer)
        .filter(|v| in_period(v.visit_date))
        .count();
    let app_count = application::visible_to(apps, viewer)
        .filter(|a| in_period(a.created_at.with_timezone(tz).date_naive()))
        .count();

    Conversion {
        period,
        since,
        visits: visit_count,
        applications: app_count,
        rate: percent(app_count, visit_count),
    }
}

// ---------------------------------------------------------------------------
// Sales leaderboard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesPerformance {
    pub salesperson: String,
    pub visits: usize,
    pub applications: usize,
    pub opportunities: usize,
    pub won: usize,
    pub pipeline_amount: Amount,
    pub won_amount: Amount,
    /// Won opportunities per hundred opportunities, rounded.
    pub win_rate: u32,
}

impl SalesPerformance {
    fn new(salesperson: &str) -> Self {
        Self {
            salesperson: salesperson.to_string(),
            visits: 0,
            applications: 0,
            opportunities: 0,
            won: 0,
            pipeline_amount: Amount::ZERO,
            won_amount: Amount::ZERO,
            win_rate: 0,
        }
    }
}

/// Manager-only ranking of salespeople by won amount, highest first.
///
/// Rows come from the visit log: a salesperson without visits is not ranked,
/// and their applications and opportunities are ignored. `win_rate` counts
/// deals (won / opportunities), not amounts.
pub fn leaderboard(
    visits: &[VisitRecord],
    apps: &[OpportunityApplication],
    opps: &[Opportunity],
    viewer: &User,
) -> Result<Vec<SalesPerformance>> {
    if !viewer.is_manager() {
        return Err(CrmError::ReportDenied);
    }

    let mut by_name: BTreeMap<&str, SalesPerformance> = BTreeMap::new();
    for v in visits {
        by_name
            .entry(v.salesperson.as_str())
            .or_insert_with(|| SalesPerformance::new(&v.salesperson))
            .visits += 1;
    }
    for a in apps {
        if let Some(row) = by_name.get_mut(a.applicant.as_str()) {
            row.applications += 1;
        }
    }
    for o in opps {
        if let Some(row) = by_name.get_mut(o.owner.as_str()) {
            row.opportunities += 1;
            row.pipeline_amount = row.pipeline_amount + o.amount;
            if o.status == OpportunityStatus::Won {
                row.won += 1;
                row.won_amount = row.won_amount + o.amount;
            }
        }
    }

    let mut rows: Vec<SalesPerformance> = by_name
        .into_values()
        .map(|mut row| {
            row.win_rate = percent(row.won, row.opportunities);
            row
        })
        .collect();
    // Stable: equal amounts keep name order from the BTreeMap.
    rows.sort_by(|a, b| b.won_amount.cmp(&a.won_amount));
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
