///! Search state: query/page ownership, paginated fetches, bounded retry
///!
///! ## Main Components
///! - `SearchDataController`: owns the state and drives the fetch cycle
///! - `derive_pagination`: pagination metadata from one result page

mod controller;
mod pagination;

pub use controller::{ControllerOptions, SearchDataController, SearchSnapshot};
pub use pagination::{ASSUMED_MIN_PAGES, derive_pagination};
