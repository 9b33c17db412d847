pub mod cohort;
pub mod transfer;
