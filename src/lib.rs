//! Backend for the Step Up Bhubaneswar workshop registration site.
//!
//! The marketing pages are static; everything stateful lives here. Visitors
//! register for a workshop run by picking a song package, the server quotes a
//! price from the run's configured policy, and an admin later marks payments
//! as received through the dashboard endpoints.

pub mod db;
pub mod error;
pub mod models;
pub mod pricing;
pub mod routes;
pub mod util;
pub mod workshop;
