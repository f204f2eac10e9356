//! Unit-of-measure conversion table.

use crate::domain::Decimal;
use std::collections::HashMap;

/// A unit row as stored by the persistence layer.
///
/// `conversion_rate` is the number of base units (kilograms) one reported
/// unit represents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRow {
    pub code: String,
    pub base_unit: String,
    pub conversion_rate: Decimal,
}

/// Lookup table from a reported unit string to its kilogram factor.
///
/// Lookups are case-insensitive and whitespace-trimmed. The built-in
/// entries cover the vocabulary the four feeds actually use, including
/// historical country-specific units; rows loaded from the database
/// override built-ins with the same code.
#[derive(Debug, Clone)]
pub struct UnitTable {
    factors: HashMap<String, Decimal>,
}

impl UnitTable {
    /// Table with only the built-in entries.
    pub fn builtin() -> Self {
        let mut factors = HashMap::new();
        let lb = Decimal::one() / dec("2.205");
        let entries: [(&str, Decimal); 18] = [
            ("kg", Decimal::one()),
            ("100kg", dec("100")),
            ("100 kg", dec("100")),
            ("tonne", dec("1000")),
            ("ton", dec("1000")),
            ("mt", dec("1000")),
            ("g", dec("0.001")),
            ("gram", dec("0.001")),
            ("lb", lb),
            ("lbs", lb),
            ("pound", lb),
            // Liquids reported per liter are treated as kilogram-equivalent.
            ("liter", Decimal::one()),
            ("litre", Decimal::one()),
            // Piece-based goods (eggs).
            ("dozen", dec("12")),
            // Historical country-specific units.
            ("quintal (es)", dec("46")),
            ("spanish quintal", dec("46")),
            ("arroba (bo)", dec("11.5")),
            ("bolivian arroba", dec("11.5")),
        ];
        for (code, factor) in entries {
            factors.insert(code.to_string(), factor);
        }
        UnitTable { factors }
    }

    /// Merge database rows over the built-ins. Rows win on code collision.
    pub fn with_overrides(mut self, rows: Vec<UnitRow>) -> Self {
        for row in rows {
            self.factors.insert(normalize_code(&row.code), row.conversion_rate);
        }
        self
    }

    /// Exact-match factor lookup.
    pub fn factor(&self, unit: &str) -> Option<Decimal> {
        self.factors.get(&normalize_code(unit)).copied()
    }
}

fn normalize_code(unit: &str) -> String {
    unit.trim().to_lowercase()
}

fn dec(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).expect("valid decimal literal")
}

/// Fallback for units like `"15 kg"` or `"25kg"` that carry their own
/// kilogram count: a leading number immediately followed by `kg`.
///
/// A parsed zero is returned as-is so the caller's division guard can
/// reject it rather than silently falling back to factor 1.
pub fn numeric_prefix_kg(unit: &str) -> Option<Decimal> {
    let trimmed = unit.trim().to_lowercase();
    let digits: String = trimmed
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if digits.is_empty() {
        return None;
    }
    let rest = trimmed[digits.len()..].trim_start();
    if rest != "kg" {
        return None;
    }
    Decimal::from_str_canonical(&digits).ok()
}
