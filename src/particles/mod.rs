//! Atmospheric particles: the snow simulator and its impact puffs.

pub mod snow;
