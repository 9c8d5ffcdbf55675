use std::env;

use tracing_subscriber::{
    EnvFilter, Layer, fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_LOG_LEVEL: &str = "debug";

/// Installs the global JSON log subscriber.
///
/// The level comes from `RUST_LOG` (default `debug`) and is applied to the
/// application crate as well. Chatty transport crates are held at `warn` or
/// above. Calling this twice is harmless: the second registration is ignored.
pub fn setup_tracing(name: &'static str) {
    let fmt_log_level = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_owned());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_span_events(FmtSpan::CLOSE)
        .with_thread_names(true)
        .json()
        .flatten_event(true)
        .with_level(true)
        .with_line_number(true)
        .with_filter(build_filter(name, &fmt_log_level));

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

fn build_filter(name: &str, level: &str) -> EnvFilter {
    let mut filter = EnvFilter::new(level);

    // Crate names use underscores in targets.
    let target = name.replace('-', "_");
    let directives = [
        format!("{target}={level}"),
        "reqwest=error".to_owned(),
        "hyper=warn".to_owned(),
        "hyper_util=warn".to_owned(),
        "tracing=error".to_owned(),
    ];

    for directive in directives {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("ignoring invalid log directive {directive:?}: {e}"),
        }
    }

    filter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_keeps_app_level() {
        let filter = build_filter("stock-checker", "info");
        let rendered = filter.to_string();

        assert!(rendered.contains("stock_checker=info"));
        assert!(rendered.contains("reqwest=error"));
    }

    #[test]
    fn test_setup_tracing_twice_does_not_panic() {
        setup_tracing("tools");
        setup_tracing("tools");
    }
}
