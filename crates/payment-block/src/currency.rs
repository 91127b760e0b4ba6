//! Currency Labels
//!
//! Renders a minor-unit amount as a human-readable label, e.g. `1999` USD
//! becomes `19.99$` and `500` CHF becomes `5 CHF`.

use std::collections::HashMap;

use rust_decimal::Decimal;

/// Currency code → display symbol table
#[derive(Clone, Debug)]
pub struct CurrencySymbols {
    symbols: HashMap<String, String>,
}

impl Default for CurrencySymbols {
    fn default() -> Self {
        let symbols = [
            ("USD", "$"),
            ("EUR", "€"),
            ("CRC", "₡"),
            ("GBP", "£"),
            ("ILS", "₪"),
            ("INR", "₹"),
            ("JPY", "¥"),
            ("KRW", "₩"),
            ("NGN", "₦"),
            ("PHP", "₱"),
            ("PLN", "zł"),
            ("PYG", "₲"),
            ("THB", "฿"),
            ("UAH", "₴"),
            ("VND", "₫"),
        ]
        .into_iter()
        .map(|(code, symbol)| (code.to_string(), symbol.to_string()))
        .collect();

        Self { symbols }
    }
}

impl CurrencySymbols {
    /// Empty table, every code renders as `"{amount} {code}"`
    pub fn empty() -> Self {
        Self { symbols: HashMap::new() }
    }

    /// Add or replace a symbol
    #[must_use]
    pub fn with_symbol(mut self, code: &str, symbol: impl Into<String>) -> Self {
        self.symbols.insert(code.to_string(), symbol.into());
        self
    }

    /// Symbol for `code`; lookup is exact, so `"usd"` is not `"USD"`
    pub fn symbol(&self, code: &str) -> Option<&str> {
        self.symbols.get(code).map(String::as_str)
    }

    /// Label for an amount given in minor units.
    ///
    /// Known codes get their symbol appended directly, unknown codes are
    /// appended after a space.
    pub fn label(&self, amount_minor: i64, currency: &str) -> String {
        let major = Decimal::new(amount_minor, 2).normalize();

        match self.symbol(currency) {
            Some(symbol) => format!("{major}{symbol}"),
            None => format!("{major} {currency}"),
        }
    }
}
