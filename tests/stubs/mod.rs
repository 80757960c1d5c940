#![allow(dead_code)]

pub mod csv;
