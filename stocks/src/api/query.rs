use crate::{api::error::ApiError, services::Lookup};

const MAX_SYMBOL_LEN: usize = 16;

/// Parameters of `GET /api/stock-prices`.
///
/// `stock` may repeat, so the raw query is decoded into pairs instead of a
/// struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockPricesQuery {
    pub lookup: Lookup,
    pub like: bool,
}

impl StockPricesQuery {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(raw)
            .map_err(|e| ApiError::BadRequest(format!("invalid query string: {e}")))?;

        let mut symbols = Vec::new();
        let mut like = false;

        for (key, value) in pairs {
            match key.as_str() {
                "stock" | "stock[]" => symbols.push(normalize_symbol(&value)?),
                "like" => like = is_truthy(&value),
                _ => {}
            }
        }

        let lookup = match symbols.len() {
            1 => Lookup::Single(symbols.swap_remove(0)),
            2 => {
                let second = symbols.swap_remove(1);
                let first = symbols.swap_remove(0);
                Lookup::Compare([first, second])
            }
            n => {
                return Err(ApiError::BadRequest(format!(
                    "expected one or two stock parameters, got {n}"
                )));
            }
        };

        Ok(Self { lookup, like })
    }
}

/// Ticker symbols are case-insensitive; records are keyed by the upper-case
/// form.
fn normalize_symbol(raw: &str) -> Result<String, ApiError> {
    let symbol = raw.trim().to_uppercase();

    if symbol.is_empty() {
        return Err(ApiError::BadRequest("stock symbol must not be empty".to_owned()));
    }
    if symbol.chars().count() > MAX_SYMBOL_LEN
        || symbol.chars().any(|c| c.is_whitespace() || c.is_control())
    {
        return Err(ApiError::BadRequest(format!("invalid stock symbol {raw:?}")));
    }

    Ok(symbol)
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1"
}
