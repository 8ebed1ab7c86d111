//! Atmospheric state relevant to smoke transport.
//!
//! This module derives what the dispersion model needs from weather:
//! - Pasquill-Gifford stability class (Pasquill 1961, Turner 1964)
//! - Solar elevation for the day/night and insolation inputs
//! - Buoyant plume rise above the burn (Briggs 1975)
//!
//! # References
//!
//! - Pasquill, F. (1961). "The estimation of the dispersion of windborne material."
//! - Turner, D.B. (1964). "A diffusion model for an urban area." J. Appl. Meteor.
//! - Briggs, G.A. (1975). "Plume rise predictions." AMS.

pub mod plume_rise;
mod stability;

pub use plume_rise::{briggs_final_rise, buoyancy_flux, heat_release_from_consumption};
pub use stability::{
    solar_elevation_deg, Daylight, Insolation, StabilityClass, StabilityClassifier,
    StabilityInputs,
};
