pub fn generate_starter_config() -> String {
    r#"# =============================================================================
# BATCHQ CONFIGURATION
# =============================================================================
# batchq accepts lists of ids over HTTP, splits them into small batches and
# hands the batches to a downstream work unit one at a time, highest priority
# first, no faster than the configured rate limit.
#
# Every setting has a default; delete anything you don't need to change.
#
# Config file locations (in order of precedence):
#   1. Path specified via --config argument
#   2. ~/.config/batchq/config.yml
#   3. /etc/batchq/config.yml
#
# Values may reference environment variables as $env{...}, with the
# variable name between the braces.
# Durations accept ms, s, m and h suffixes.

# =============================================================================
# DISPATCHER
# =============================================================================
dispatcher:
  # Maximum number of ids per batch
  batch_size: 3

  # Minimum time from the END of one batch to the START of the next.
  # Slow batches therefore stretch the spacing between starts.
  rate_limit: 5000ms

  # How often an idle dispatcher re-checks the queue
  poll_interval: 100ms

  # Pause after an unexpected error in the dispatch loop
  error_backoff: 1000ms

# =============================================================================
# WORK UNIT
# =============================================================================
# The built-in work unit simulates a downstream call per id with a random
# latency in [min_latency, max_latency).
work_unit:
  min_latency: 100ms
  max_latency: 500ms

  # Probability that a single call fails. A failed call abandons its batch,
  # which then stays 'triggered'. Leave at 0.0 outside of testing.
  failure_rate: 0.0

# =============================================================================
# WEB SERVER
# =============================================================================
web:
  listen: "0.0.0.0:3000"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;

    #[test]
    fn test_starter_config_matches_defaults() {
        let config = parse_config(&generate_starter_config()).unwrap();
        let defaults = crate::config::Config::default();
        assert_eq!(config.dispatcher.batch_size, defaults.dispatcher.batch_size);
        assert_eq!(config.dispatcher.rate_limit, defaults.dispatcher.rate_limit);
        assert_eq!(config.work_unit.max_latency, defaults.work_unit.max_latency);
        assert_eq!(config.web.listen, defaults.web.listen);
    }
}
