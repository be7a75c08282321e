// ABOUTME: Library crate for the OmniCloud console exposing the terminal bridge for hosts and tests

pub mod app;
pub mod components;
pub mod config;
pub mod models;
pub mod terminal;
