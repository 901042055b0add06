//! Shared test harness modules for the pcidb CLI.

use super::*;

mod helpers;
mod unit;
