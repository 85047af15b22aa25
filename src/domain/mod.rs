pub mod recommend;
pub mod sounds;
pub mod survey;
