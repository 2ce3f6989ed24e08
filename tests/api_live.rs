//! Live API tests. Run with: `ESTAT_APP_ID=... cargo test --features online -- --nocapture`
#![cfg(feature = "online")]

use estat_market::credentials::{CredentialChain, EnvVar};
use estat_market::{AnnualSeries, Client, ClientConfig, Params, stats};

fn client() -> Client {
    let chain = CredentialChain::new().with(EnvVar::default());
    Client::from_credentials(&chain, ClientConfig::default()).expect("ESTAT_APP_ID must be set")
}

#[test]
fn fetch_metadata_has_dimensions() {
    let idx = client()
        .fetch_metadata("0003109558", &Params::new())
        .unwrap();
    assert!(!idx.is_empty());
}

#[test]
fn fetch_table_and_summarize() {
    let c = client();
    let rows = c.get("0003109558", &Params::new()).unwrap();
    assert!(!rows.is_empty());
    // second call is a cache hit and returns the same rows
    assert_eq!(c.get("0003109558", &Params::new()).unwrap(), rows);
    let series = AnnualSeries::from_records(&rows);
    if !series.is_empty() {
        assert!(stats::compute(&series).is_some());
    }
}
