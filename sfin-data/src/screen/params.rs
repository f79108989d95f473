//! Supported screening parameters.
//!
//! The registry of financial metrics a screen criterion may reference.
//! Parameter ids are what tool callers use; `query_name` is the spelling
//! the upstream query language expects.

use serde::Serialize;

/// Unit of a screening parameter's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    /// Indian crore rupees (market cap, sales)
    Crore,
    /// Rupees (prices)
    Rupee,
    /// Percentage
    Percent,
    /// Dimensionless ratio (PE, PB, debt to equity)
    Ratio,
}

/// One supported screening parameter.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScreenParameter {
    /// Stable id used in tool calls
    pub id: &'static str,
    /// Spelling in the upstream query language
    pub query_name: &'static str,
    /// Value unit
    pub unit: Unit,
    /// One-line description
    pub description: &'static str,
}

/// All supported parameters.
pub const PARAMETERS: &[ScreenParameter] = &[
    ScreenParameter {
        id: "market_cap",
        query_name: "Market Capitalization",
        unit: Unit::Crore,
        description: "Market capitalization in crore rupees",
    },
    ScreenParameter {
        id: "current_price",
        query_name: "Current price",
        unit: Unit::Rupee,
        description: "Latest traded price",
    },
    ScreenParameter {
        id: "pe",
        query_name: "Price to earning",
        unit: Unit::Ratio,
        description: "Price to earnings ratio (trailing)",
    },
    ScreenParameter {
        id: "pb",
        query_name: "Price to book value",
        unit: Unit::Ratio,
        description: "Price to book value ratio",
    },
    ScreenParameter {
        id: "roe",
        query_name: "Return on equity",
        unit: Unit::Percent,
        description: "Return on equity, latest annual",
    },
    ScreenParameter {
        id: "roce",
        query_name: "Return on capital employed",
        unit: Unit::Percent,
        description: "Return on capital employed, latest annual",
    },
    ScreenParameter {
        id: "debt_to_equity",
        query_name: "Debt to equity",
        unit: Unit::Ratio,
        description: "Total debt over shareholder equity",
    },
    ScreenParameter {
        id: "dividend_yield",
        query_name: "Dividend yield",
        unit: Unit::Percent,
        description: "Dividend yield at the current price",
    },
    ScreenParameter {
        id: "opm",
        query_name: "OPM",
        unit: Unit::Percent,
        description: "Operating profit margin",
    },
    ScreenParameter {
        id: "sales_growth_3y",
        query_name: "Sales growth 3Years",
        unit: Unit::Percent,
        description: "Compounded sales growth over three years",
    },
    ScreenParameter {
        id: "profit_growth_3y",
        query_name: "Profit growth 3Years",
        unit: Unit::Percent,
        description: "Compounded profit growth over three years",
    },
    ScreenParameter {
        id: "promoter_holding",
        query_name: "Promoter holding",
        unit: Unit::Percent,
        description: "Promoter shareholding percentage",
    },
];

/// Look up a parameter by id, case-insensitively.
pub fn find(id: &str) -> Option<&'static ScreenParameter> {
    let id = id.trim();
    PARAMETERS.iter().find(|p| p.id.eq_ignore_ascii_case(id))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = PARAMETERS.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PARAMETERS.len());
    }

    #[test]
    fn test_find_case_insensitive() {
        assert!(find("roe").is_some());
        assert!(find("ROE").is_some());
        assert!(find(" roe ").is_some());
        assert!(find("ebitda_margin").is_none());
    }

    #[test]
    fn test_query_names_nonempty() {
        for p in PARAMETERS {
            assert!(!p.query_name.is_empty(), "{} has no query name", p.id);
            assert!(!p.description.is_empty(), "{} has no description", p.id);
        }
    }
}
