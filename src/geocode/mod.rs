// file: src/geocode/mod.rs
// description: geocoding module exports
// reference: internal module structure

pub mod client;
pub mod states;

pub use client::{GeoPoint, GeocodeFailure, GeocodeResult, GeocodingClient};
pub use states::expand_state_abbreviation;
