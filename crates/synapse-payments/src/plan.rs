//! Subscription Plans
//!
//! The fixed catalogue of purchasable tiers and their prices.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PaymentError;

/// Purchasable plan selector
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Operative,
    Godmode,
}

/// Pricing information
#[derive(Clone, Debug)]
pub struct PlanPricing {
    /// Line item name shown on the hosted checkout page
    pub name: String,
    /// Payment link description
    pub description: String,
    /// Price in USD cents
    pub cents: i64,
}

impl Plan {
    pub const ALL: [Plan; 2] = [Plan::Operative, Plan::Godmode];

    /// Selector as sent by clients and stored in order metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Operative => "operative",
            Plan::Godmode => "godmode",
        }
    }

    /// Upper-cased name stored on the user record
    pub fn display_name(&self) -> &'static str {
        match self {
            Plan::Operative => "OPERATIVE",
            Plan::Godmode => "GODMODE",
        }
    }

    /// Price in minor currency units
    pub fn price_cents(&self) -> i64 {
        match self {
            Plan::Operative => 1999,
            Plan::Godmode => 9999,
        }
    }

    /// Get pricing for this plan
    pub fn pricing(&self) -> PlanPricing {
        let name = format!("{} Plan", self.display_name());
        PlanPricing {
            description: format!("SYNAPSE AI - {name}"),
            name,
            cents: self.price_cents(),
        }
    }
}

impl FromStr for Plan {
    type Err = PaymentError;

    /// Selectors are matched exactly; "Operative" is not a valid plan.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Plan::ALL
            .into_iter()
            .find(|plan| plan.as_str() == s)
            .ok_or_else(|| PaymentError::InvalidPlan(s.to_string()))
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_pricing() {
        assert_eq!(Plan::Operative.pricing().cents, 1999);
        assert_eq!(Plan::Godmode.pricing().cents, 9999);
    }

    #[test]
    fn test_pricing_names() {
        let pricing = Plan::Godmode.pricing();
        assert_eq!(pricing.name, "GODMODE Plan");
        assert_eq!(pricing.description, "SYNAPSE AI - GODMODE Plan");
    }

    #[test]
    fn test_parse_is_exact() {
        assert_eq!("operative".parse::<Plan>().unwrap(), Plan::Operative);
        assert_eq!("godmode".parse::<Plan>().unwrap(), Plan::Godmode);
        for bad in ["", "OPERATIVE", "Godmode", "free", " operative"] {
            assert!(bad.parse::<Plan>().is_err(), "{bad:?} should be rejected");
        }
    }
}
