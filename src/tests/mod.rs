//! Test modules for the moisture monitor binary.

mod monitor_tests;
