//! Static company facts and pricing tables.
//!
//! Loaded once at startup, either from a JSON file or from built-in defaults,
//! and shared read-only afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyData {
    pub name: String,
    pub tagline: String,
    pub description: String,
    pub contact: ContactInfo,
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub services: Vec<String>,
    pub pricing: PricingTable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
    pub website: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub capacity_kw: f64,
    pub price: f64,
    #[serde(default)]
    pub description: String,
}

/// Inputs for the ROI calculator. Money is in `currency`, energy in kWh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingTable {
    pub currency: String,
    /// Installed cost per kW before subsidy
    pub cost_per_kw: f64,
    /// Average generation of 1 kW of panels per month
    pub units_per_kw_per_month: f64,
    /// Tariff per kWh when the state has no entry
    pub default_tariff: f64,
    #[serde(default)]
    pub state_tariffs: BTreeMap<String, f64>,
    pub central_subsidy_per_kw: f64,
    pub central_subsidy_cap: f64,
    #[serde(default)]
    pub state_subsidy_per_kw: BTreeMap<String, f64>,
    pub min_system_kw: f64,
    pub max_system_kw: f64,
    pub system_lifetime_years: u32,
}

impl PricingTable {
    /// Tariff for `state` (case-insensitive), falling back to the default
    pub fn tariff_for(&self, state: Option<&str>) -> f64 {
        lookup(&self.state_tariffs, state).unwrap_or(self.default_tariff)
    }

    /// Additional state subsidy per kW, 0 when the state has none
    pub fn state_subsidy_for(&self, state: Option<&str>) -> f64 {
        lookup(&self.state_subsidy_per_kw, state).unwrap_or(0.0)
    }

    /// Canonical state name as written in the tariff table
    pub fn known_state(&self, state: Option<&str>) -> Option<&str> {
        let state = state?.trim();
        self.state_tariffs
            .keys()
            .chain(self.state_subsidy_per_kw.keys())
            .find(|k| k.eq_ignore_ascii_case(state))
            .map(String::as_str)
    }

    fn validate(&self) -> Result<()> {
        let positive = [
            ("costPerKw", self.cost_per_kw),
            ("unitsPerKwPerMonth", self.units_per_kw_per_month),
            ("defaultTariff", self.default_tariff),
            ("minSystemKw", self.min_system_kw),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                anyhow::bail!("pricing.{} must be a positive number, got {}", field, value);
            }
        }
        if let Some((state, tariff)) = self.state_tariffs.iter().find(|(_, t)| **t <= 0.0) {
            anyhow::bail!("pricing.stateTariffs.{} must be positive, got {}", state, tariff);
        }
        if self.max_system_kw < self.min_system_kw {
            anyhow::bail!(
                "pricing.maxSystemKw ({}) is below minSystemKw ({})",
                self.max_system_kw,
                self.min_system_kw
            );
        }
        Ok(())
    }
}

fn lookup(table: &BTreeMap<String, f64>, state: Option<&str>) -> Option<f64> {
    let state = state?.trim();
    table
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(state))
        .map(|(_, v)| *v)
}

impl CompanyData {
    pub fn builtin() -> Self {
        let state_tariffs = [
            ("Delhi", 7.5),
            ("Gujarat", 6.0),
            ("Karnataka", 7.0),
            ("Maharashtra", 9.5),
            ("Rajasthan", 7.2),
            ("Tamil Nadu", 6.5),
            ("Uttar Pradesh", 6.8),
        ];
        let state_subsidies = [("Delhi", 10_000.0), ("Uttar Pradesh", 15_000.0)];

        Self {
            name: "SunRise Solar Energy".to_string(),
            tagline: "Clean power, lower bills".to_string(),
            description: "Rooftop solar design, installation and maintenance for homes and small businesses."
                .to_string(),
            contact: ContactInfo {
                phone: "+91 98765 43210".to_string(),
                email: "hello@sunrisesolar.example".to_string(),
                website: "https://sunrisesolar.example".to_string(),
                address: None,
            },
            products: vec![
                Product {
                    name: "Home Basic".to_string(),
                    capacity_kw: 2.0,
                    price: 120_000.0,
                    description: "On-grid system for small homes".to_string(),
                },
                Product {
                    name: "Home Plus".to_string(),
                    capacity_kw: 3.0,
                    price: 180_000.0,
                    description: "On-grid system for 2-3 BHK homes".to_string(),
                },
                Product {
                    name: "Business".to_string(),
                    capacity_kw: 10.0,
                    price: 600_000.0,
                    description: "Commercial rooftop system".to_string(),
                },
            ],
            services: vec![
                "Site survey".to_string(),
                "Subsidy paperwork".to_string(),
                "Net metering application".to_string(),
                "Annual maintenance".to_string(),
            ],
            pricing: PricingTable {
                currency: "INR".to_string(),
                cost_per_kw: 60_000.0,
                units_per_kw_per_month: 120.0,
                default_tariff: 7.0,
                state_tariffs: state_tariffs
                    .into_iter()
                    .map(|(s, t)| (s.to_string(), t))
                    .collect(),
                central_subsidy_per_kw: 30_000.0,
                central_subsidy_cap: 78_000.0,
                state_subsidy_per_kw: state_subsidies
                    .into_iter()
                    .map(|(s, t)| (s.to_string(), t))
                    .collect(),
                min_system_kw: 1.0,
                max_system_kw: 10.0,
                system_lifetime_years: 25,
            },
        }
    }
}

/// Read-only provider of [`CompanyData`]
#[derive(Debug, Clone)]
pub struct CompanyDataService {
    data: Arc<CompanyData>,
}

impl CompanyDataService {
    pub fn new(data: CompanyData) -> Self {
        Self { data: Arc::new(data) }
    }

    /// Load from a JSON file, or built-in defaults when `path` is None
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let data = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read company data from {}", path.display()))?;
                let data: CompanyData = serde_json::from_str(&raw)
                    .with_context(|| format!("Invalid company data in {}", path.display()))?;
                info!("Loaded company data for '{}' from {}", data.name, path.display());
                data
            }
            None => {
                info!("Using built-in company data");
                CompanyData::builtin()
            }
        };

        data.pricing.validate()?;
        Ok(Self::new(data))
    }

    pub fn get(&self) -> Arc<CompanyData> {
        self.data.clone()
    }
}

impl Default for CompanyDataService {
    fn default() -> Self {
        Self::new(CompanyData::builtin())
    }
}
