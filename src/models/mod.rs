// src/models/mod.rs

pub mod answer;
pub mod person;
pub mod score;
