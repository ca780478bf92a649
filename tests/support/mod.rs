#![allow(dead_code)]

pub mod assertions;
pub mod recording;
pub mod temp_db;
