mod common;

mod build_tests;
mod graph_tests;
mod hook_tests;
