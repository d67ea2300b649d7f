//! Universalis REST API endpoint constants.

/// Base URL for the Universalis REST API.
pub const UNIVERSALIS_BASE_URL: &str = "https://universalis.app/api";

/// Current listings for one or more items across the requested servers.
pub const LISTINGS: &str = "/extra";
