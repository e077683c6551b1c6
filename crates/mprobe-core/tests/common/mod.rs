#![allow(dead_code)]

pub mod client;
pub mod mp4;
pub mod range_server;
