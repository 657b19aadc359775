//! Query integration tests over the full database stack.

mod dimensions_test;
mod example_test;
mod trace_test;
