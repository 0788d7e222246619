//! Route handlers

pub mod alerts;
pub mod capture;
pub mod session;
