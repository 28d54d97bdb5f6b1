#![deny(dead_code)]
#![deny(unused_imports)]

pub mod data;
pub mod describe;
pub mod split;

pub mod evaluate;
pub mod fit;
pub mod model;
pub mod report;
