use std::time::Duration;

pub(super) fn default_runtime_url() -> String {
    "http://127.0.0.1:2375".to_string()
}

pub(super) const fn default_connect_timeout() -> Duration {
    Duration::from_secs(5)
}

pub(super) const fn default_reconnect_max_interval() -> Duration {
    Duration::from_secs(30)
}

pub(super) fn default_filter() -> Vec<String> {
    vec!["*".to_string()]
}

pub(super) const fn default_drain_interval() -> Duration {
    Duration::from_secs(1)
}

pub(super) const fn default_queue_bound() -> usize {
    256
}
