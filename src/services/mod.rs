pub mod algorithm;
pub mod recommend;
