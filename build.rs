fn main() {
    // embuild sysenv propagation only matters for ESP-IDF target builds;
    // host-side test builds skip it.
    if std::env::var_os("CARGO_FEATURE_ESPIDF").is_some() {
        embuild::espidf::sysenv::output();
    }
}
