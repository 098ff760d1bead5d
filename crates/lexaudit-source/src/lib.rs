//! Source layer: Parliament API, law page scraping, document download and
//! consultation discovery.

pub mod consultation;
pub mod error;
pub mod fetch;
pub mod http;
pub mod locator;
pub mod parliament;
pub mod scrape;

pub use consultation::{ConsultationConfig, ConsultationFinder, GoogleSearch, WebSearch};
pub use error::{FetchError, NotFound, SourceError};
pub use fetch::{DocumentSource, HttpFetcher, PageSource};
pub use http::HttpConfig;
pub use locator::{LawLocator, LocatorConfig, LocatorStrategy};
pub use parliament::{LawApi, ParliamentClient};
