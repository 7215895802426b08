//! Compile-time defaults
//!
//! Generated by build.rs from the library defaults, with any values from
//! the file named by `UTHREAD_CONFIG_RS` merged over them.

include!(concat!(env!("OUT_DIR"), "/uthread_merged_config.rs"));
