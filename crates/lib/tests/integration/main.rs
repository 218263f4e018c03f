#![cfg(unix)]

mod common;
mod engine_tests;
