//! Rooftop solar ROI calculator

use serde::Serialize;
use thiserror::Error;

use super::company_data::PricingTable;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiError {
    #[error("Monthly bill must be a positive number, got {0}")]
    InvalidBill(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoiReport {
    pub currency: String,
    pub monthly_bill: f64,
    /// Canonical state name when it appears in the pricing tables
    pub state: Option<String>,
    pub tariff_per_unit: f64,
    pub monthly_units: f64,
    pub system_size_kw: f64,
    pub gross_cost: f64,
    pub subsidy: f64,
    pub net_cost: f64,
    pub monthly_savings: f64,
    pub annual_savings: f64,
    pub payback_years: f64,
    pub lifetime_years: u32,
    pub lifetime_savings: f64,
    pub roi_percent: f64,
}

pub fn calculate(
    monthly_bill: f64,
    state: Option<&str>,
    pricing: &PricingTable,
) -> Result<RoiReport, RoiError> {
    if !monthly_bill.is_finite() || monthly_bill <= 0.0 {
        return Err(RoiError::InvalidBill(monthly_bill));
    }

    let tariff = pricing.tariff_for(state);
    let monthly_units = monthly_bill / tariff;

    // Next half kW, within the sizes we install
    let raw_size = monthly_units / pricing.units_per_kw_per_month;
    let system_size_kw = ((raw_size * 2.0).ceil() / 2.0)
        .max(pricing.min_system_kw)
        .min(pricing.max_system_kw);

    let gross_cost = system_size_kw * pricing.cost_per_kw;
    let central = (system_size_kw * pricing.central_subsidy_per_kw).min(pricing.central_subsidy_cap);
    let subsidy = (central + system_size_kw * pricing.state_subsidy_for(state)).min(gross_cost);
    let net_cost = gross_cost - subsidy;

    // Cannot save more than the bill itself
    let generated_value = system_size_kw * pricing.units_per_kw_per_month * tariff;
    let monthly_savings = generated_value.min(monthly_bill);
    let annual_savings = monthly_savings * 12.0;

    let lifetime_years = pricing.system_lifetime_years;
    let lifetime_savings = annual_savings * f64::from(lifetime_years) - net_cost;

    let (payback_years, roi_percent) = if net_cost > 0.0 {
        (net_cost / annual_savings, lifetime_savings / net_cost * 100.0)
    } else {
        (0.0, 0.0)
    };

    Ok(RoiReport {
        currency: pricing.currency.clone(),
        monthly_bill: round2(monthly_bill),
        state: pricing.known_state(state).map(str::to_string),
        tariff_per_unit: round2(tariff),
        monthly_units: round2(monthly_units),
        system_size_kw,
        gross_cost: round2(gross_cost),
        subsidy: round2(subsidy),
        net_cost: round2(net_cost),
        monthly_savings: round2(monthly_savings),
        annual_savings: round2(annual_savings),
        payback_years: round2(payback_years),
        lifetime_years,
        lifetime_savings: round2(lifetime_savings),
        roi_percent: round2(roi_percent),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
