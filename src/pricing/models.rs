use serde::{Deserialize, Serialize};

/// One material line item: quantity of a material at a unit cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_cost: f64,
}

impl MaterialLine {
    /// Derived cost of this line
    pub fn line_cost(&self) -> f64 {
        self.quantity * self.unit_cost
    }
}

/// One recurring business expense attributed to a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLine {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cost: f64,
}

/// The complete set of cost inputs for one pricing calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingInput {
    pub materials: Vec<MaterialLine>,
    pub hourly_rate: f64,
    pub hours_spent: f64,
    pub complexity_factor: f64,
    pub business_expenses: Vec<ExpenseLine>,
    pub profit_margin_percent: f64,
    pub shipping_cost: f64,
    pub tax_rate_percent: f64,
}

impl Default for PricingInput {
    fn default() -> Self {
        Self {
            materials: Vec::new(),
            hourly_rate: 0.0,
            hours_spent: 0.0,
            complexity_factor: 1.0,
            business_expenses: Vec::new(),
            profit_margin_percent: 0.0,
            shipping_cost: 0.0,
            tax_rate_percent: 0.0,
        }
    }
}

impl PricingInput {
    /// Produce a well-formed copy for the engine: non-finite or negative
    /// amounts become zero, and a non-finite or non-positive complexity
    /// factor falls back to 1.0. The engine itself never validates; every
    /// caller normalizes before computing.
    pub fn normalized(&self) -> Self {
        Self {
            materials: self
                .materials
                .iter()
                .map(|m| MaterialLine {
                    name: m.name.clone(),
                    quantity: sanitize_amount(m.quantity),
                    unit_cost: sanitize_amount(m.unit_cost),
                })
                .collect(),
            hourly_rate: sanitize_amount(self.hourly_rate),
            hours_spent: sanitize_amount(self.hours_spent),
            complexity_factor: sanitize_factor(self.complexity_factor),
            business_expenses: self
                .business_expenses
                .iter()
                .map(|e| ExpenseLine {
                    name: e.name.clone(),
                    cost: sanitize_amount(e.cost),
                })
                .collect(),
            profit_margin_percent: sanitize_amount(self.profit_margin_percent),
            shipping_cost: sanitize_amount(self.shipping_cost),
            tax_rate_percent: sanitize_amount(self.tax_rate_percent),
        }
    }
}

fn sanitize_amount(value: f64) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        0.0
    }
}

fn sanitize_factor(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

/// The layered cost/profit/price result of one engine evaluation.
/// Immutable once computed; internal values keep full float precision,
/// `rounded()` is the two-decimal presentation view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub materials_cost: f64,
    pub labor_cost: f64,
    pub business_cost: f64,
    pub base_cost: f64,
    pub profit_amount: f64,
    pub tax_amount: f64,
    pub wholesale_price: f64,
    pub retail_price: f64,
}

impl PricingBreakdown {
    /// Create an all-zero breakdown
    pub fn zero() -> Self {
        Self::default()
    }

    /// Currency-precision view used at the presentation and persistence
    /// boundary. Rounding only happens here so errors never compound
    /// across the derived fields.
    pub fn rounded(&self) -> Self {
        Self {
            materials_cost: round_currency(self.materials_cost),
            labor_cost: round_currency(self.labor_cost),
            business_cost: round_currency(self.business_cost),
            base_cost: round_currency(self.base_cost),
            profit_amount: round_currency(self.profit_amount),
            tax_amount: round_currency(self.tax_amount),
            wholesale_price: round_currency(self.wholesale_price),
            retail_price: round_currency(self.retail_price),
        }
    }
}

fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
