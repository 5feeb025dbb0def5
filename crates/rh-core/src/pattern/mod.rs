mod aap;
mod aggressor;
mod hammering_pattern;

pub use aap::{AapSpec, AggressorAccessPattern};
pub use aggressor::Aggressor;
pub use hammering_pattern::HammeringPattern;
