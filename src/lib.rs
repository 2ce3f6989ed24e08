//! estat_market
//!
//! A small Rust library for turning e-Stat (Japanese official statistics)
//! tables into headline market indicators. Pairs with the `estat` CLI.
//!
//! ### Features
//! - Fetch `getStatsData` tables with retry/backoff and a one-hour response cache
//! - Resolve classification codes to labels and normalize rows into a tidy schema
//! - Aggregate into an annual series and nowcast the year after the latest release
//! - Latest value, year-over-year change, and CAGR with explicit "undefined" markers
//! - Rank free-text industry names against JSIC codes
//! - Named table presets (`statsDataId` + default query parameters)
//!
//! ### Example
//! ```no_run
//! use estat_market::{AnnualSeries, Client, ClientConfig, areas, nowcast, stats};
//!
//! let client = Client::new("my-app-id", ClientConfig::default())?;
//! let params = areas::prepare_params(&Default::default(), (2015, 2021), Some("13"));
//! let rows = client.get("0003109558", &params)?;
//! let series = AnnualSeries::from_records(&rows);
//! let series = nowcast::apply(&series, &[], nowcast::NowcastMethod::Smoothed, 0.3);
//! println!("{:#?}", stats::compute(&series));
//! let jsic = estat_market::industry::guess_jsic("カフェ", 5);
//! println!("{:#?}", jsic);
//! # Ok::<(), estat_market::EstatError>(())
//! ```

pub mod api;
pub mod areas;
pub mod cache;
pub mod classification;
pub mod credentials;
pub mod error;
pub mod industry;
pub mod models;
pub mod nowcast;
pub mod presets;
pub mod report;
pub mod series;
pub mod stats;
pub mod storage;

pub use api::{Client, ClientConfig};
pub use classification::ClassificationIndex;
pub use error::{EstatError, TransportError};
pub use models::{NormalizedRecord, Params, RawValueRecord};
pub use series::AnnualSeries;
pub use stats::KpiResult;
