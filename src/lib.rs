//! tablescope - query planning and filtering for index-oriented tables
//!
//! A request (filters, order, page window) is planned against a table
//! schema, served from the best matching index where possible, and
//! answered with one page of rows plus the total match count.

pub mod cancel;
pub mod cli;
pub mod config;
pub mod executor;
pub mod filter;
pub mod planner;
pub mod request;
pub mod schema;
pub mod selection;
pub mod store;
