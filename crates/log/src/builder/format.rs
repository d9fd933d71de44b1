//! Format layer creation macros

/// Build a text fmt layer (`pretty` or `compact`) from a `DisplayConfig`.
macro_rules! create_fmt_layer {
    ($format:ident, $display:expr) => {{
        tracing_subscriber::fmt::layer()
            .$format()
            .with_writer(std::io::stderr)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids)
    }};
}

/// Build a JSON fmt layer from a `DisplayConfig`.
macro_rules! create_json_layer {
    ($display:expr) => {{
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .flatten_event($display.flatten)
            .with_ansi(false)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
            .with_thread_ids($display.thread_ids)
    }};
}

/// Install `$layer` over the filter, dropping timestamps when disabled.
macro_rules! install_with_time {
    ($filter:expr, $layer:expr, $time:expr) => {{
        let layer = $layer;
        if $time {
            install($filter, layer)
        } else {
            install($filter, layer.without_time())
        }
    }};
}
