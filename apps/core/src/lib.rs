pub mod action_executor;
pub mod config;
pub mod contract;
pub mod fuzzy;
pub mod history;
pub mod indexer;
pub mod logging;
pub mod model;
pub mod provider;
pub mod ranking;
pub mod runtime;
pub mod session;

#[cfg(test)]
mod tests {
    mod query_latency_test {
        include!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../tests/perf/query_latency_test.rs"
        ));
    }
}
