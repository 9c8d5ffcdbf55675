use rust_decimal::Decimal;
use serde::Deserialize;

/// Body returned by the quote endpoint.
///
/// Known symbols produce a quote object; unknown ones produce a bare JSON
/// string such as `"Unknown symbol"`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum QuoteBody {
    Quote(Quote),
    Message(String),
}

/// Subset of the upstream quote we rely on.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub latest_price: Option<Decimal>,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_quote_body_object() {
        let body: QuoteBody =
            serde_json::from_str(r#"{"symbol":"GOOG","latestPrice":2781.35,"close":2780}"#)
                .unwrap();

        assert_eq!(
            body,
            QuoteBody::Quote(Quote {
                latest_price: Some(Decimal::from_str("2781.35").unwrap()),
            })
        );
    }

    #[test]
    fn test_quote_body_null_price() {
        let body: QuoteBody =
            serde_json::from_str(r#"{"symbol":"GOOG","latestPrice":null}"#).unwrap();

        assert!(matches!(body, QuoteBody::Quote(Quote { latest_price: None })));
    }

    #[test]
    fn test_quote_body_message() {
        let body: QuoteBody = serde_json::from_str(r#""Unknown symbol""#).unwrap();

        assert_eq!(body, QuoteBody::Message("Unknown symbol".to_owned()));
    }
}
